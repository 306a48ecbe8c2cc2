// CLI entry point for the arcade display receiver.
//
// Binds the TCP gateway, attaches the configured game engine, and runs the
// session loop until every connected controller has gone away. Settings
// come from defaults, then an optional JSON config file, then flags.
//
// Logs go to stderr so that the stdout engine's JSON lines stay clean on
// stdout.

use std::path::PathBuf;

use anyhow::{Context, bail};
use arcade_cast_receiver::config::{EngineKind, ReceiverConfig};
use arcade_cast_receiver::{ShutdownReason, start_receiver};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Two-player arcade session receiver
#[derive(Parser, Debug)]
#[command(name = "receiver")]
#[command(version, about, long_about = None)]
struct Args {
    /// JSON config file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long)]
    bind: Option<String>,

    /// Port to listen on (0 picks a free port)
    #[arg(short, long)]
    port: Option<u16>,

    /// Game engine to attach
    #[arg(long, value_enum)]
    engine: Option<EngineKind>,

    /// Readiness reported by the stdout engine
    #[arg(long)]
    engine_ready: Option<bool>,

    /// End the game for everyone when a player leaves (bare flag means true)
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    end_game_on_leave: Option<bool>,

    /// Milliseconds a write to one controller may block before it is dropped
    #[arg(long)]
    write_timeout_ms: Option<u64>,

    /// Log filter, e.g. "debug" (defaults to RUST_LOG, then "info")
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_level.as_deref());

    let config = resolve_config(&args)?;
    let engine = config.build_engine();
    let (handle, addr) = start_receiver(&config, engine)
        .with_context(|| format!("failed to listen on {}:{}", config.bind, config.port))?;
    info!(%addr, engine = ?config.engine, "receiver listening");

    match handle.wait() {
        Some(ShutdownReason::ListenerFailed) => bail!("listener on {addr} stopped accepting"),
        Some(reason) => info!(?reason, "receiver stopped"),
        None => bail!("receiver loop panicked"),
    }
    Ok(())
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Defaults, then the config file, then flags.
fn resolve_config(args: &Args) -> anyhow::Result<ReceiverConfig> {
    let mut config = match &args.config {
        Some(path) => ReceiverConfig::load(path)?,
        None => ReceiverConfig::default(),
    };
    if let Some(bind) = &args.bind {
        config.bind = bind.clone();
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(engine) = args.engine {
        config.engine = engine;
    }
    if let Some(ready) = args.engine_ready {
        config.engine_ready = ready;
    }
    if let Some(end_game_on_leave) = args.end_game_on_leave {
        config.end_game_on_leave = end_game_on_leave;
    }
    if let Some(ms) = args.write_timeout_ms {
        config.write_timeout_ms = ms;
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"port": 9000, "engine": "stdout", "engine_ready": false}"#)
            .unwrap();
        let path = file.path().to_str().unwrap();

        let args = Args::parse_from(["receiver", "--config", path, "--port", "9001"]);
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.port, 9001);
        assert_eq!(config.engine, EngineKind::Stdout);
        assert!(!config.engine_ready);
        assert!(!config.end_game_on_leave);
    }

    #[test]
    fn flag_turns_off_end_game_on_leave_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"end_game_on_leave": true, "write_timeout_ms": 500}"#)
            .unwrap();
        let path = file.path().to_str().unwrap();

        let args = Args::parse_from(["receiver", "--config", path]);
        let config = resolve_config(&args).unwrap();
        assert!(config.end_game_on_leave);
        assert_eq!(config.write_timeout_ms, 500);

        let args = Args::parse_from([
            "receiver",
            "--config",
            path,
            "--end-game-on-leave",
            "false",
            "--write-timeout-ms",
            "250",
        ]);
        let config = resolve_config(&args).unwrap();
        assert!(!config.end_game_on_leave);
        assert_eq!(config.write_timeout_ms, 250);
    }

    #[test]
    fn defaults_without_file() {
        let args = Args::parse_from(["receiver", "--end-game-on-leave", "--engine-ready", "false"]);
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.port, ReceiverConfig::default().port);
        assert!(config.end_game_on_leave);
        assert!(!config.engine_ready);
    }

    #[test]
    fn args_definition_is_consistent() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
