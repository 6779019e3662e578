use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use carousel::{
    AlsaRegistry, BridgeService, CommandSpec, Config, DEFAULT_LABEL, DEFAULT_PORT, LogWriter,
    Orchestrator, Player, ProcessService, RestartPolicy, ServiceSpec, Subscribe,
};

/// carousel: keeps a synthesizer wired to a port and plays tracks through it forever.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Well-known port the player sends its events to.
    #[arg(long, default_value = DEFAULT_PORT)]
    port: String,

    /// Consecutive fast failures tolerated before giving up on the synthesizer.
    #[arg(long, default_value_t = 5)]
    max_restart: u32,

    /// Runs shorter than this many seconds count as fast failures.
    #[arg(long, default_value_t = 10)]
    fast_failure_secs: u64,

    /// Seconds to wait for everything to stop on shutdown.
    #[arg(long, default_value_t = 30)]
    grace_secs: u64,

    /// Synthesizer executable.
    #[arg(long, default_value = "timidity")]
    synth: String,

    /// Synthesizer argument (repeatable; replaces the defaults).
    #[arg(long = "synth-arg", default_values = ["-Os", "-iA"], allow_hyphen_values = true)]
    synth_args: Vec<String>,

    /// Player executable, invoked as `<player> --port <port> <track>`.
    #[arg(long, default_value = "aplaymidi")]
    player: String,

    /// Lighting connector executable, supervised next to the synthesizer.
    #[arg(long)]
    lights: Option<String>,

    /// Lighting connector argument (repeatable).
    #[arg(long = "lights-arg", requires = "lights", allow_hyphen_values = true)]
    lights_args: Vec<String>,

    /// Label the synthesizer's endpoint is listed under.
    #[arg(long, default_value = DEFAULT_LABEL)]
    label: String,

    /// Log at debug level (overrides RUST_LOG).
    #[arg(short, long)]
    verbose: bool,

    /// Tracks to play, in order, forever.
    tracks: Vec<PathBuf>,
}

impl Cli {
    fn lights_command(&self) -> Option<CommandSpec> {
        let program = self.lights.as_deref()?;
        Some(CommandSpec::new(program).args(&self.lights_args))
    }

    fn lighting(&self, cfg: &Config) -> Option<ServiceSpec> {
        let service = ProcessService::new("lights", self.lights_command()?);
        Some(ServiceSpec::with_defaults(
            Arc::new(service),
            self.port.as_str(),
            cfg,
        ))
    }

    fn config(&self) -> Config {
        Config {
            grace: Duration::from_secs(self.grace_secs),
            restart: RestartPolicy::default()
                .with_max_restarts(self.max_restart)
                .with_fast_failure(Duration::from_secs(self.fast_failure_secs)),
            ..Config::default()
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<u8> {
    ensure!(!cli.port.trim().is_empty(), "--port must not be empty");
    ensure!(!cli.label.is_empty(), "--label must not be empty");
    if cli.tracks.is_empty() {
        warn!("no tracks given; nothing to play");
    }

    let cfg = cli.config();
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let orch = Orchestrator::new(cfg.clone(), subs);

    let synth = CommandSpec::new(&cli.synth).args(&cli.synth_args);
    let bridge = BridgeService::new("synth", synth, Arc::new(AlsaRegistry::new()), &cli.label)
        .with_resolver(cfg.resolver);
    let spec = ServiceSpec::with_defaults(Arc::new(bridge), cli.port.as_str(), &cfg);

    let lights = cli.lighting(&cfg);
    let player = Player::new(spec.ready(), cli.port.as_str(), cli.tracks)
        .with_program(cli.player)
        .with_dependency(spec.name());

    let mut services = vec![spec];
    services.extend(lights);

    info!(port = %cli.port, synth = %cli.synth, lights = ?cli.lights, "show starting");
    let cause = orch
        .run(services, Arc::new(player))
        .await
        .context("supervision runtime failed")?;

    if cause.is_fatal() {
        error!(cause = %cause.describe(), "show stopped");
    } else {
        info!(cause = %cause.describe(), "show stopped");
    }
    Ok(cause.exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_the_show() {
        let cli = Cli::try_parse_from(["carousel", "a.mid", "b.mid"]).unwrap();
        assert_eq!(cli.port, "14:0");
        assert_eq!(cli.synth_args, vec!["-Os".to_string(), "-iA".to_string()]);
        assert_eq!(cli.label, ": 'TiMidity'");
        assert_eq!(cli.tracks.len(), 2);

        let cfg = cli.config();
        assert_eq!(cfg.restart.max_restarts, 5);
        assert_eq!(cfg.grace, Duration::from_secs(30));
        assert!(cli.lighting(&cfg).is_none());
    }

    #[test]
    fn lights_run_as_a_second_service() {
        let cli = Cli::try_parse_from([
            "carousel",
            "--lights",
            "piglow-connector",
            "--lights-arg",
            "-v",
            "a.mid",
        ])
        .unwrap();

        assert_eq!(
            cli.lights_command(),
            Some(CommandSpec::new("piglow-connector").arg("-v"))
        );
        let spec = cli.lighting(&cli.config()).expect("lighting service");
        assert_eq!(spec.name(), "lights");
        assert_eq!(cli.tracks, vec![PathBuf::from("a.mid")]);
    }

    #[test]
    fn lights_args_need_a_program() {
        assert!(Cli::try_parse_from(["carousel", "--lights-arg", "-v"]).is_err());
    }

    #[test]
    fn overrides_apply_to_config() {
        let cli = Cli::try_parse_from([
            "carousel",
            "--max-restart",
            "2",
            "--fast-failure-secs",
            "3",
            "--synth-arg",
            "-iA",
            "--synth-arg",
            "-c",
            "--synth-arg",
            "show.cfg",
        ])
        .unwrap();

        let cfg = cli.config();
        assert_eq!(cfg.restart.max_restarts, 2);
        assert_eq!(cfg.restart.fast_failure, Duration::from_secs(3));
        assert_eq!(cli.synth_args, vec!["-iA", "-c", "show.cfg"]);
    }
}
