mod database;
mod serve;

use anyhow::{Context, Result, bail};
use console::style;
use tracing::info;

use crate::config::AppConfig;
use crate::core::terminal::{self, GuideSection};

fn print_help() {
    terminal::print_banner();

    GuideSection::new("Server")
        .command("serve", "Start the API server (default)")
        .command("  --host <HOST>", "Bind address, overrides server.host")
        .command("  --port <PORT>", "Bind port, overrides server.port")
        .print();

    GuideSection::new("Database")
        .command("init-db", "Create the record collection and its indexes")
        .command("  --drop", "Drop the collection first")
        .command("  --sample", "Insert one sample record and print its id")
        .command("ping", "Check that the record store answers")
        .print();

    GuideSection::new("Configuration")
        .status("SHEETPATCH_CONFIG", "Config file (default ./sheetpatch.toml)")
        .status("SHEETPATCH_HOME", "Data directory (default ~/.sheetpatch)")
        .status("SHEETPATCH_LOG", "Log filter, e.g. debug or sheetpatch=trace")
        .print();

    println!(
        "\n {} {} <command> [options]\n",
        style("Usage:").bold(),
        style("sheetpatch").green()
    );
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Serve {
        host: Option<String>,
        port: Option<u16>,
    },
    InitDb {
        drop_existing: bool,
        with_sample: bool,
    },
    Ping,
    Help,
}

pub(crate) fn parse_args(args: &[String]) -> Result<Command> {
    let Some(cmd) = args.get(1) else {
        return Ok(Command::Serve {
            host: None,
            port: None,
        });
    };

    match cmd.as_str() {
        "serve" => {
            let mut host = None;
            let mut port = None;
            let mut i = 2;
            while i < args.len() {
                match args[i].as_str() {
                    "--host" => {
                        let value = args.get(i + 1).context("--host needs a value")?;
                        host = Some(value.clone());
                        i += 2;
                    }
                    "--port" => {
                        let value = args.get(i + 1).context("--port needs a value")?;
                        port = Some(
                            value
                                .parse()
                                .with_context(|| format!("invalid port '{value}'"))?,
                        );
                        i += 2;
                    }
                    other => bail!("Unknown option for serve: {other}"),
                }
            }
            Ok(Command::Serve { host, port })
        }
        "init-db" => {
            let mut drop_existing = false;
            let mut with_sample = false;
            for arg in &args[2..] {
                match arg.as_str() {
                    "--drop" => drop_existing = true,
                    "--sample" => with_sample = true,
                    other => bail!("Unknown option for init-db: {other}"),
                }
            }
            Ok(Command::InitDb {
                drop_existing,
                with_sample,
            })
        }
        "ping" => Ok(Command::Ping),
        "help" | "--help" | "-h" => Ok(Command::Help),
        other => bail!("Unknown command '{other}'. Run 'sheetpatch help' for usage."),
    }
}

pub async fn run_main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let command = parse_args(&args)?;
    if command == Command::Help {
        print_help();
        return Ok(());
    }

    let mut config = AppConfig::load().await?;
    crate::logging::init(&config.logging.level);
    match &config.source {
        Some(path) => info!("Loaded configuration from {}", path.display()),
        None => info!("No config file found, using default configuration."),
    }

    match command {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            serve::run_server(config).await
        }
        Command::InitDb {
            drop_existing,
            with_sample,
        } => database::init_db(&config, drop_existing, with_sample).await,
        Command::Ping => {
            if !database::ping(&config).await? {
                bail!("record store is unreachable");
            }
            Ok(())
        }
        Command::Help => Ok(()),
    }
}
