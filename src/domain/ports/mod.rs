//! Domain ports (interfaces) for the Graphium control plane.

pub mod runtime_port;
pub mod store_port;
pub mod token_issuer;

pub use runtime_port::{ContainerInfo, ExecOptions, ExecResult, LogOptions, Runtime};
pub use store_port::{ListFilter, Store};
pub use token_issuer::{TokenClaims as IssuedTokenClaims, TokenIssuer};
