//! CLI argument definitions: a thin dispatcher over the core services.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "graphium")]
#[command(about = "Multi-host container orchestration control plane", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON instead of a formatted table.
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the server: HTTP task API plus the Agent Process Supervisor.
    Server {
        #[arg(long)]
        bind_address: Option<String>,
    },

    /// Run an agent against a given server: poll loop plus sidecar HTTP.
    Agent {
        #[arg(long)]
        host_id: String,
        #[arg(long, env = "AGENT_URL")]
        api_url: String,
        #[arg(long)]
        runtime_endpoint: String,
        #[arg(long, env = "TOKEN")]
        token: String,
        #[arg(long, default_value = "8090")]
        sidecar_port: u16,
    },

    /// Stack lifecycle commands.
    #[command(subcommand)]
    Stack(StackCommands),

    /// Read-only queries over tasks and stacks.
    #[command(subcommand)]
    Query(QueryCommands),

    /// Mint bearer tokens.
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },

    /// Fleet integrity checks and repair.
    #[command(subcommand)]
    Integrity(IntegrityCommands),

    /// Configuration inspection.
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Validate a stack graph or task payload file without submitting it.
    Validate {
        /// "stack" or "task"
        kind: String,
        file: std::path::PathBuf,
    },
}

#[derive(Subcommand)]
pub enum StackCommands {
    /// Parse, plan, and roll out a stack graph file.
    Deploy {
        file: std::path::PathBuf,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        datacenter: Option<String>,
    },
    /// List known stacks.
    List,
    /// Show a stack's current deployment state.
    Status { stack_id: String },
    /// Stop every container in a stack.
    Stop { stack_id: String },
    /// Remove every container in a stack.
    Remove { stack_id: String },
}

#[derive(Subcommand)]
pub enum QueryCommands {
    /// List tasks or stacks, optionally filtered.
    List {
        /// "tasks" or "stacks"
        entity: String,
        #[arg(long)]
        host_id: Option<String>,
        #[arg(long)]
        status: Option<String>,
    },
    /// Walk the task dependency graph for a stack from a given task id.
    Traverse { stack_id: String, node: String },
    /// List the tasks that depend on a given task, transitively.
    Dependents { stack_id: String, node: String },
    /// Print a stack's wave-layered task topology.
    Topology { stack_id: String },
    /// Aggregate counts by status across all tasks.
    Stats,
}

#[derive(Subcommand)]
pub enum TokenCommands {
    /// Mint a bearer token bound to a host.
    Agent {
        host_id: String,
        #[arg(long, default_value = "8760")]
        expiration: i64,
        #[arg(long)]
        secret: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum IntegrityCommands {
    /// Probe every registered agent's liveness.
    Health,
    /// Full store scan for placements with no corresponding live agent.
    Scan,
    /// Dry-run diff of persisted state against live agent state.
    Plan,
    /// Issue corrective stop/delete tasks for the orphan set `scan` finds.
    Repair,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective merged configuration.
    Show,
    /// Write a default `.graphium/config.yaml`.
    Init {
        #[arg(long)]
        force: bool,
    },
}
