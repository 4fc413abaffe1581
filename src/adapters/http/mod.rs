//! HTTP adapters: handler functions meant to be mounted on an externally
//! owned `axum::Router` (the router, TLS termination, and graceful shutdown
//! live in the binary), an HMAC `TokenIssuer`, and the agent's HTTP client
//! for polling the server.

pub mod agent_client;
pub mod server_api;
pub mod sidecar_api;
pub mod token_issuer;

pub use agent_client::AgentClient;
pub use token_issuer::HmacTokenIssuer;
