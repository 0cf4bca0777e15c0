//! Recipe Agent - CLI and HTTP Server Entry Point
//!
//! Usage:
//!   recipe-agent [serve]                  Start the webhook server (default)
//!   recipe-agent swml [--base-url URL]    Print the SWML document
//!   recipe-agent tools                    List the agent's tools
//!   recipe-agent invoke NAME [--args JSON] [--dry-run]
//!                                         Run one tool locally

use anyhow::Context;
use clap::{Parser, Subcommand};
use recipe_agent::{
    agent::{build_recipe_agent, AgentDefinition},
    api,
    config::Config,
    swml,
    tools::{build_request, CallContext, DataMapExecutor},
};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "recipe-agent", version)]
#[command(about = "Chef Auguste, a voice recipe assistant served as a SWML agent")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the webhook server.
    Serve,

    /// Print the rendered SWML document.
    Swml {
        /// Public base URL used in webhook URLs.
        #[arg(long)]
        base_url: Option<String>,
    },

    /// List registered tools.
    Tools,

    /// Run a tool locally and print its result.
    Invoke {
        /// Tool name.
        name: String,

        /// Arguments as a JSON object.
        #[arg(long, default_value = "{}")]
        args: String,

        /// Print the outbound HTTP request instead of sending it.
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "recipe_agent=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Loaded configuration: recipe_api={} api_key_configured={}",
        config.recipe_api_base, config.api_key_configured
    );

    let executor = DataMapExecutor::new()?;
    let agent = build_recipe_agent(&config, executor)?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            info!("Starting {} on {}:{}", agent.name, config.host, config.port);
            api::serve(config, agent).await?;
        }
        Commands::Swml { base_url } => {
            let base = base_url
                .map(|b| b.trim_end_matches('/').to_string())
                .unwrap_or_else(|| swml::base_url(&config, None));
            let doc = swml::render(&agent, &config, &base);
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        Commands::Tools => print_tools(&agent),
        Commands::Invoke {
            name,
            args,
            dry_run,
        } => invoke(&agent, &name, &args, dry_run).await?,
    }

    Ok(())
}

fn print_tools(agent: &AgentDefinition) {
    for tool in agent.tools.list_tools() {
        let kind = if tool.declarative { "datamap" } else { "native" };
        println!("{:<32} {:<8} {}", tool.name, kind, tool.description);
    }
}

async fn invoke(agent: &AgentDefinition, name: &str, args: &str, dry_run: bool) -> anyhow::Result<()> {
    let args: Value = serde_json::from_str(args).context("--args must be a JSON object")?;
    if !args.is_object() {
        anyhow::bail!("--args must be a JSON object");
    }

    if dry_run {
        match agent.tools.data_map(name) {
            Some(map) => println!("{}", build_request(map, &args)?),
            None if agent.tools.contains(name) => {
                println!("{} is a native tool; it makes no outbound request", name)
            }
            None => anyhow::bail!("Unknown tool: {}", name),
        }
        return Ok(());
    }

    let call = CallContext {
        call_id: None,
        global_data: agent.global_data.clone(),
    };
    let result = agent.tools.execute(name, args, &call).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
