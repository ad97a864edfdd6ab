//! reverie entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config
//!   3. Resolve effective log level (CLI `-v` flags > env > config)
//!   4. Init logger once
//!   5. Build the LLM provider (or none: offline mode)
//!   6. Build the mind and the comms state, optionally greet
//!   7. Spawn Ctrl-C → shutdown signal watcher
//!   8. Start scheduler and comms channels
//!   9. Wait for comms to finish, cancel, join scheduler

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use reverie::config::{self, Config};
use reverie::error::AppError;
use reverie::llm::providers;
use reverie::logger;
use reverie::mind::Mind;
use reverie::subsystems::comms::{self, CommsEvent, CommsState};

/// Opening message sent once when `greet_on_start` is set.
const GREETING_PROMPT: &str = "Introduce yourself.";

struct CliArgs {
    log_level: Option<&'static str>,
    config_path: Option<String>,
    headless: bool,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Load .env if present; the file is optional.
    let _ = dotenvy::dotenv();

    let args = parse_cli_args();
    let mut config = config::load(args.config_path.as_deref())?;
    if args.headless {
        config.comms.pty.enabled = false;
    }

    let effective_log_level = args.log_level.unwrap_or(config.log_level.as_str());
    logger::init(effective_log_level, args.log_level.is_some(), config.log_file.as_deref())?;

    info!(
        bot_name = %config.bot_name,
        configured_log_level = %config.log_level,
        effective_log_level = %effective_log_level,
        provider = %config.llm.provider,
        "config loaded"
    );

    let provider = providers::build(&config.llm, config.llm_api_key.clone())?;
    let mind = Mind::new(provider, &config.mind);
    info!(
        provider = mind.provider_name(),
        api_configured = mind.is_api_configured(),
        seeded = config.mind.seed.is_some(),
        "mind ready"
    );

    let (event_tx, event_rx) = mpsc::channel::<CommsEvent>(comms::EVENT_BUFFER);
    let state = Arc::new(CommsState::new(&config, mind, event_tx));

    if config.mind.greet_on_start {
        state.greet(GREETING_PROMPT).await;
    }

    let shutdown = CancellationToken::new();

    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, initiating shutdown");
            ctrlc_token.cancel();
        }
    });

    print_startup_summary(&config, &state);

    #[cfg(feature = "subsystem-scheduler")]
    let scheduler =
        reverie::subsystems::scheduler::start(&config.scheduler, state.clone(), shutdown.clone());

    let channels = comms::start(&config, state, event_rx, shutdown.clone());
    let result = channels.join().await;

    // Comms may have exited on EOF or /quit rather than Ctrl-C.
    shutdown.cancel();

    #[cfg(feature = "subsystem-scheduler")]
    if let Some(handle) = scheduler {
        handle.join().await?;
    }

    result
}

fn print_startup_summary(config: &Config, state: &CommsState) {
    let mode = if state.api_configured() { "online" } else { "offline (templates)" };
    let http = if config.comms_http_should_load() {
        config.comms.http.bind.as_str()
    } else {
        "disabled"
    };
    let scheduler = if cfg!(feature = "subsystem-scheduler") && config.scheduler.enabled {
        format!(
            "thought {}s / {}s agitated, dream {}s",
            config.scheduler.thought_delay.as_secs(),
            config.scheduler.agitated_thought_delay.as_secs(),
            config.scheduler.dream_delay.as_secs()
        )
    } else {
        "disabled".to_string()
    };

    eprintln!("┌─ {} (pid {})", config.bot_name, std::process::id());
    eprintln!("│ llm        {} [{}]", state.provider_name(), mode);
    eprintln!("│ pty        {}", if config.comms_pty_should_load() { "enabled" } else { "disabled" });
    eprintln!("│ http       {http}");
    eprintln!("│ scheduler  {scheduler}");
    eprintln!("└─");
}

fn parse_cli_args() -> CliArgs {
    let mut verbosity = 0u8;
    let mut headless = false;
    let mut config_path = None;

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--" {
            break;
        }

        match arg.as_str() {
            "-h" | "--help" => {
                println!("Usage: reverie [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -h, --help                 Print help");
                println!("  -f, --config <PATH>        Configuration file (default: config/default.toml)");
                println!("      --headless             Disable the console channel");
                println!("  -v, -vv, -vvv, -vvvv       Increase logging verbosity");
                std::process::exit(0);
            }
            "--headless" => headless = true,
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
                verbosity = verbosity.saturating_add((a.len() - 1) as u8);
            }
            _ => {}
        }
    }

    //   -v      → warn
    //   -vv     → info
    //   -vvv    → debug
    //   -vvvv+  → trace  (request/response payloads)
    let log_level = match verbosity {
        0 => None,
        1 => Some("warn"),
        2 => Some("info"),
        3 => Some("debug"),
        _ => Some("trace"),
    };

    CliArgs { log_level, config_path, headless }
}
