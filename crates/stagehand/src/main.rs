//! Operate a suite's imposters from the command line: provision a mock
//! server from a suite configuration, or wipe it clean.

use anyhow::Context;
use clap::{Parser, Subcommand};
use stagehand::{Harness, HttpTransport, SuiteConfig, Transport};

#[derive(Parser, Debug)]
#[command(name = "stagehand")]
#[command(about = "Provision and wipe Mountebank imposters from a suite configuration")]
struct Args {
    /// Suite configuration file
    #[arg(short, long, default_value = "stagehand.yaml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Wipe the mock server, then create every configured imposter and
    /// print the alias-to-port mapping
    Provision,
    /// Delete every imposter on the mock server
    Wipe,
    /// Bind aliases to the ports their contracts pin, then write each
    /// configured save path from the running mock server
    Save,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = SuiteConfig::from_file(&args.config)
        .with_context(|| format!("loading suite configuration from {}", args.config))?;

    match args.command {
        Command::Provision => {
            let mut harness = Harness::from_config(config);
            harness.on_suite_start().await?;
            let aliases: Vec<String> = harness.config().imposters.keys().cloned().collect();
            for alias in aliases {
                let port = harness.resolve_port(&alias)?;
                println!("{alias} -> {port}");
            }
        }
        Command::Wipe => {
            let transport = HttpTransport::new(&config.host, config.port);
            transport.wipe_all().await?;
            println!("wiped all imposters on {}:{}", config.host, config.port);
        }
        Command::Save => {
            let mut harness = Harness::from_config(config);
            harness.adopt_configured_ports().await?;
            harness.on_suite_end().await?;
        }
    }

    Ok(())
}
