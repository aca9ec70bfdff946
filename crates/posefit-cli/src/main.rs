//! `posefit-cli` – runs a simulated overlay session from the terminal.
//!
//! 1. Loads `~/.posefit/config.toml` (defaults when absent) plus `POSEFIT_*`
//!    overrides.
//! 2. Initialises tracing, with OTLP export when
//!    `OTEL_EXPORTER_OTLP_ENDPOINT` is set.
//! 3. Starts a [`Session`] backed by the simulated detector, scene and
//!    renderer, and logs the published transform once per second.
//! 4. Stops on **Ctrl-C** or after `--seconds N` (default 10).
//!
//! `--save-config` writes the effective configuration back to disk.

mod config;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use posefit_hal::Detector;
use posefit_hal::sim::{SimFrameSource, SimRenderer, SimScene, sim_detector_for};
use posefit_runtime::{Session, SessionConfig, SessionParts, init_tracing};
use posefit_types::StatusLevel;
use tracing::{info, warn};

const DEFAULT_SECONDS: u64 = 10;

#[derive(Debug, Clone, PartialEq)]
struct Args {
    seconds: u64,
    save_config: bool,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args, String> {
    let mut parsed = Args {
        seconds: DEFAULT_SECONDS,
        save_config: false,
    };
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--seconds" | "-s" => {
                let value = args.next().ok_or("--seconds needs a value")?;
                parsed.seconds = value
                    .parse()
                    .map_err(|_| format!("invalid --seconds value '{value}'"))?;
            }
            "--save-config" => parsed.save_config = true,
            other => return Err(format!("unknown argument '{other}'")),
        }
    }
    Ok(parsed)
}

fn main() -> ExitCode {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}: {e}", "error".red().bold());
            eprintln!("usage: posefit [--seconds N] [--save-config]");
            return ExitCode::from(2);
        }
    };

    // Before the runtime exists: the OTLP exporter is a simple one.
    let _guard = init_tracing("posefit");

    print_banner();

    let cfg = match config::load() {
        Ok(cfg) => {
            println!(
                "  Config: {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            config::Config::default()
        }
    };
    if args.save_config {
        match config::save(&cfg) {
            Ok(()) => println!("  {}", "Configuration saved.".green()),
            Err(e) => warn!(error = %e, "failed to save configuration"),
        }
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{}: failed to start runtime: {e}", "error".red().bold());
            return ExitCode::FAILURE;
        }
    };
    runtime.block_on(run(cfg, args.seconds))
}

async fn run(cfg: config::Config, seconds: u64) -> ExitCode {
    let frame = cfg.frame_size();
    let detector = sim_detector_for(cfg.detector).map(|d| Box::new(d) as Box<dyn Detector>);
    println!(
        "  Detector: {}   Frame: {}x{}   Pose: {} Hz   Render: {} Hz\n",
        cfg.detector.to_string().bold(),
        frame.width,
        frame.height,
        cfg.pose_hz,
        cfg.render_hz
    );

    let session = Session::start(
        SessionConfig {
            pose_hz: cfg.pose_hz,
            render_hz: cfg.render_hz,
            calibration: cfg.calibration,
            ..SessionConfig::default()
        },
        SessionParts {
            detector,
            source: Box::new(SimFrameSource::new(frame)),
            scene: Arc::new(SimScene::new(frame)),
            renderer: Box::new(SimRenderer::new()),
        },
    );

    let signal = session.stop_signal();
    if let Err(e) = ctrlc::set_handler(move || {
        if signal.trigger() {
            println!();
            println!("{}", "Ctrl-C received, stopping session…".yellow().bold());
        }
    }) {
        warn!(error = %e, "failed to install Ctrl-C handler");
    }

    let mut status = session.subscribe_status();
    let status_task = tokio::spawn(async move {
        while let Some(event) = status.recv().await {
            let line = match event.level {
                StatusLevel::Good => event.message.green(),
                StatusLevel::Warning => event.message.yellow(),
                StatusLevel::Error => event.message.red(),
            };
            println!("  [status] {line}");
        }
    });

    let reader = session.reader();
    let mut stop = session.stop_signal().subscribe();
    let mut report = tokio::time::interval(Duration::from_secs(1));
    let deadline = tokio::time::sleep(Duration::from_secs(seconds));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = posefit_runtime::lifecycle::stopped(&mut stop) => break,
            _ = &mut deadline => {
                info!(seconds, "run time elapsed");
                break;
            }
            _ = report.tick() => {
                let snapshot = reader.latest();
                let t = snapshot.transform;
                info!(
                    sequence = snapshot.sequence,
                    x = t.position.x,
                    y = t.position.y,
                    z = t.position.z,
                    scale_x = t.scale.x,
                    scale_y = t.scale.y,
                    rotation_z = t.rotation_z,
                    "published transform"
                );
            }
        }
    }

    let result = session.shutdown().await;
    status_task.abort();
    match result {
        Ok(summary) => {
            println!(
                "\n  {} {} pose ticks, {} frames drawn.",
                "✓".green(),
                summary.pose_ticks,
                summary.render_draws
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {e}", "error".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn print_banner() {
    println!();
    println!("{}", "  ╔══════════════════════════════════════╗".bold().cyan());
    println!("{}", "  ║   posefit · pose-driven overlay      ║".bold().cyan());
    println!("{}", "  ╚══════════════════════════════════════╝".bold().cyan());
    println!();
}
