//! Outbox assistant: entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config
//!   3. Resolve effective log level (CLI `-v` flags > config)
//!   4. Init logger once
//!   5. Build comms state (LLM provider, outbox, session registry)
//!   6. Spawn Ctrl-C → shutdown signal watcher
//!   7. Run comms channels until shutdown

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use outbox_assistant::comms::{self, CommsState};
use outbox_assistant::config::{self, Config};
use outbox_assistant::error::AppError;
use outbox_assistant::logger;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // .env is optional.
    let _ = dotenvy::dotenv();

    let args = parse_cli_args();

    let mut config = config::load(args.config_path.as_deref())?;

    // The console channel reads stdin; only run it when asked.
    if args.interactive {
        config.comms.pty.enabled = true;
    }

    let effective_log_level = args.log_level.unwrap_or(config.log_level.as_str());
    logger::init(effective_log_level, args.log_level.is_some(), config.log_file.as_deref())?;

    info!(
        name = %config.name,
        work_dir = %config.work_dir.display(),
        outbox = %config.outbox.dir.display(),
        configured_log_level = %config.log_level,
        effective_log_level = %effective_log_level,
        interactive = %args.interactive,
        "config loaded"
    );

    let state = Arc::new(CommsState::from_config(&config)?);

    let shutdown = CancellationToken::new();
    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received; initiating shutdown");
            ctrlc_token.cancel();
        }
    });

    print_startup_summary(&config, state.provider_name());

    let handle = comms::start(&config, state, shutdown.clone());
    handle.join().await?;
    shutdown.cancel();

    if args.interactive {
        println!("\nBye :) ...");
    }
    Ok(())
}

fn print_startup_summary(config: &Config, provider: &str) {
    let fit = |text: String| -> String {
        const WIDTH: usize = 58;
        if text.chars().count() >= WIDTH {
            let mut out = text.chars().take(WIDTH - 1).collect::<String>();
            out.push('…');
            out
        } else {
            format!("{text:<WIDTH$}")
        }
    };

    let llm_line = format!(
        "provider={provider} model={} temp={} timeout={}s",
        config.llm.openai.model, config.llm.openai.temperature, config.llm.openai.timeout_seconds
    );
    let axum_line = if config.comms_axum_should_load() {
        format!("http: http://{}", config.comms.axum_channel.bind)
    } else {
        "http: disabled".to_string()
    };
    let pty_line = format!("pty: {}", if config.comms_pty_should_load() { "enabled" } else { "disabled" });

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║   {}║", fit(format!("Assistant: {}", config.name)));
    println!("╟──────────────────────────────────────────────────────────────╢");
    println!("║   {}║", fit(llm_line));
    println!("║   {}║", fit(format!("outbox: {}", config.outbox.dir.display())));
    println!("║   {}║", fit(axum_line));
    println!("║   {}║", fit(pty_line));
    println!("╚══════════════════════════════════════════════════════════════╝");
}

struct CliArgs {
    log_level: Option<&'static str>,
    interactive: bool,
    config_path: Option<String>,
}

fn parse_cli_args() -> CliArgs {
    parse_args(std::env::args().skip(1))
}

fn parse_args(args: impl IntoIterator<Item = String>) -> CliArgs {
    let mut verbosity = 0u8;
    let mut interactive = false;
    let mut config_path = None;

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        if arg == "--" {
            break;
        }

        match arg.as_str() {
            "-h" | "--help" => {
                println!("Usage: outbox-assistant [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -h, --help                 Print help");
                println!("  -i, --interactive          Enable the console channel");
                println!("  -f, --config <PATH>        Path to configuration file (default: config/default.toml)");
                println!("  -v, -vv, -vvv, -vvvv       Increase logging verbosity");
                std::process::exit(0);
            }
            "-i" | "--interactive" => interactive = true,
            "-f" | "--config" => {
                if let Some(path) = iter.next() {
                    config_path = Some(path);
                } else {
                    eprintln!("error: -f/--config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--verbose" => verbosity = verbosity.saturating_add(1),
            a if a.starts_with('-') && a.len() > 1 && a.chars().skip(1).all(|c| c == 'v') => {
                verbosity = verbosity.saturating_add(u8::try_from(a.len() - 1).unwrap_or(u8::MAX));
            }
            _ => {}
        }
    }

    //   -v → warn, -vv → info, -vvv → debug, -vvvv+ → trace
    let log_level = match verbosity {
        0 => None,
        1 => Some("warn"),
        2 => Some("info"),
        3 => Some("debug"),
        _ => Some("trace"),
    };

    CliArgs { log_level, interactive, config_path }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> CliArgs {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn flags_parse() {
        let a = args(&["-i", "-f", "config/groq.toml", "-vv"]);
        assert!(a.interactive);
        assert_eq!(a.config_path.as_deref(), Some("config/groq.toml"));
        assert_eq!(a.log_level, Some("info"));
        assert_eq!(args(&[]).log_level, None);
    }

    #[test]
    fn huge_verbosity_saturates() {
        let many = format!("-{}", "v".repeat(300));
        assert_eq!(args(&[many.as_str()]).log_level, Some("trace"));
        let exact = format!("-{}", "v".repeat(256));
        assert_eq!(args(&[exact.as_str()]).log_level, Some("trace"));
    }
}
