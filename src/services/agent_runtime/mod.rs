//! Agent Runtime (§4.3): per-host executor, poll loop, and handler table.

pub mod handlers;
pub mod poll_loop;

pub use handlers::HandlerContext;
pub use poll_loop::{AgentPollLoop, AgentStats, TaskSource};
