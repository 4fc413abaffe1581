//! Graphium CLI entry point.

use anyhow::Result;
use clap::Parser;

use graphium::cli::commands::{self, AppContext};
use graphium::cli::types::{Commands, ConfigCommands, IntegrityCommands, QueryCommands, StackCommands, TokenCommands};
use graphium::cli::Cli;
use graphium::infrastructure::{config::ConfigLoader, logging};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // `config init` scaffolds the file `ConfigLoader::load` would otherwise
    // fail to find, so it must run before configuration is loaded.
    if let Commands::Config(ConfigCommands::Init { force }) = &cli.command {
        return commands::config::handle_init(*force).await;
    }
    if let Commands::Config(ConfigCommands::Show) = &cli.command {
        return commands::config::handle_show(cli.json).await;
    }
    if let Commands::Validate { kind, file } = &cli.command {
        return commands::validate::handle(kind.clone(), file.clone()).await;
    }

    let config = ConfigLoader::load()?;
    let _logger_guard = logging::init(&config.logging)?;

    match cli.command {
        Commands::Server { bind_address } => {
            let ctx = AppContext::load().await?;
            commands::server::handle(ctx, bind_address).await
        }
        Commands::Agent { host_id, api_url, runtime_endpoint, token, sidecar_port } => {
            commands::agent::handle(host_id, api_url, runtime_endpoint, token, sidecar_port).await
        }
        Commands::Stack(stack_cmd) => {
            let ctx = AppContext::load().await?;
            match stack_cmd {
                StackCommands::Deploy { file, name, datacenter } => {
                    commands::stack::handle_deploy(ctx, file, name, datacenter, cli.json).await
                }
                StackCommands::List => commands::stack::handle_list(ctx, cli.json).await,
                StackCommands::Status { stack_id } => commands::stack::handle_status(ctx, stack_id, cli.json).await,
                StackCommands::Stop { stack_id } => commands::stack::handle_stop(ctx, stack_id, cli.json).await,
                StackCommands::Remove { stack_id } => commands::stack::handle_remove(ctx, stack_id, cli.json).await,
            }
        }
        Commands::Query(query_cmd) => {
            let ctx = AppContext::load().await?;
            match query_cmd {
                QueryCommands::List { entity, host_id, status } => {
                    commands::query::handle_list(ctx, entity, host_id, status, cli.json).await
                }
                QueryCommands::Traverse { stack_id, node } => commands::query::handle_traverse(ctx, stack_id, node, cli.json).await,
                QueryCommands::Dependents { stack_id, node } => commands::query::handle_dependents(ctx, stack_id, node, cli.json).await,
                QueryCommands::Topology { stack_id } => commands::query::handle_topology(ctx, stack_id, cli.json).await,
                QueryCommands::Stats => commands::query::handle_stats(ctx, cli.json).await,
            }
        }
        Commands::Token { command: TokenCommands::Agent { host_id, expiration, secret } } => {
            let ctx = AppContext::load().await?;
            commands::token::handle_agent(ctx, host_id, expiration, secret, cli.json).await
        }
        Commands::Integrity(integrity_cmd) => {
            let ctx = AppContext::load().await?;
            match integrity_cmd {
                IntegrityCommands::Health => commands::integrity::handle_health(ctx, cli.json).await,
                IntegrityCommands::Scan => commands::integrity::handle_scan(ctx, cli.json).await,
                IntegrityCommands::Plan => commands::integrity::handle_plan(ctx, cli.json).await,
                IntegrityCommands::Repair => commands::integrity::handle_repair(ctx, cli.json).await,
            }
        }
        Commands::Config(_) => unreachable!("config subcommands are handled before database setup"),
        Commands::Validate { .. } => unreachable!("validate is handled before database setup"),
    }
}
