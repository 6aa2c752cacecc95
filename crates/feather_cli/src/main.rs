//! Feather CLI
//!
//! Simulate animated scalars frame by frame, or watch one run in real time.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use feather_animation::{AnimatedScalar, BackgroundHost, FeatherConfig, FrameHost, ManualHost};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;

use config::MotionArgs;

#[derive(Parser)]
#[command(name = "feather")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Feather animation CLI", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Step a scalar through deterministic frames and print each one
    Simulate {
        #[command(flatten)]
        motion: MotionArgs,

        /// Milliseconds between frames
        #[arg(long, default_value = "16")]
        frame_ms: f64,

        /// Stop after this many frames even if still moving
        #[arg(long, default_value = "1000")]
        max_frames: usize,
    },

    /// Run a scalar in real time until it comes to rest
    Live {
        #[command(flatten)]
        motion: MotionArgs,

        /// Frames per second of the background host
        #[arg(long, default_value = "120")]
        fps: u32,

        /// Give up after this many milliseconds
        #[arg(long, default_value = "10000")]
        timeout_ms: u64,
    },

    /// Print the default configuration as TOML
    Defaults,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Simulate {
            motion,
            frame_ms,
            max_frames,
        } => cmd_simulate(&motion, frame_ms, max_frames),

        Commands::Live {
            motion,
            fps,
            timeout_ms,
        } => cmd_live(&motion, fps, Duration::from_millis(timeout_ms)),

        Commands::Defaults => cmd_defaults(),
    }
}

fn cmd_simulate(motion: &MotionArgs, frame_ms: f64, max_frames: usize) -> Result<()> {
    if frame_ms.is_nan() || frame_ms <= 0.0 {
        anyhow::bail!("--frame-ms must be positive, got {}", frame_ms);
    }

    let config = motion.resolve()?;
    debug!(?config, frame_ms, max_frames, "simulating");

    let host = Arc::new(ManualHost::new());
    let notifies = Arc::new(AtomicUsize::new(0));
    let counter = notifies.clone();
    let scalar = AnimatedScalar::builder(host.clone())
        .config(config)
        .on_notify(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .build();

    scalar.attach();
    retarget(&scalar, motion);

    println!(
        "{:>6} {:>10} {:>14} {:>14}",
        "frame", "t_ms", "value", "velocity"
    );
    print_frame(0, 0.0, &scalar, notifies.swap(0, Ordering::SeqCst));

    let mut frame = 0;
    while frame < max_frames && (host.pending_frames() > 0 || host.pending_timers() > 0) {
        host.step_frame(frame_ms);
        frame += 1;
        print_frame(
            frame,
            host.now(),
            &scalar,
            notifies.swap(0, Ordering::SeqCst),
        );
    }

    if scalar.is_at_rest() && !scalar.has_pending_target() {
        info!("At rest at {} after {} frames", scalar.value(), frame);
    } else {
        warn!("Still moving after {} frames", frame);
    }

    Ok(())
}

fn cmd_live(motion: &MotionArgs, fps: u32, timeout: Duration) -> Result<()> {
    let config = motion.resolve()?;

    let host = Arc::new(BackgroundHost::with_fps(fps));
    host.start();

    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    let started = Instant::now();
    let scalar = AnimatedScalar::builder(host.clone())
        .config(config)
        .on_value(move |value| {
            println!("{:>10.1} {:>14.4}", started.elapsed().as_secs_f64() * 1000.0, value);
        })
        .on_notify(move || {
            if let Ok(tx) = tx.lock() {
                let _ = tx.send(());
            }
        })
        .build();

    scalar.attach();
    retarget(&scalar, motion);

    let deadline = started + timeout;
    loop {
        if scalar.is_at_rest() && !scalar.has_pending_target() {
            info!(
                "At rest at {} after {:.0}ms",
                scalar.value(),
                started.elapsed().as_secs_f64() * 1000.0
            );
            break;
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            warn!("Timed out after {}ms, value {}", timeout.as_millis(), scalar.value());
            break;
        }

        // Notify wakes us on rest; the timeout covers a missed wake-up
        let _ = rx.recv_timeout(remaining.min(Duration::from_millis(100)));
    }

    scalar.stop();
    host.stop();
    Ok(())
}

fn cmd_defaults() -> Result<()> {
    let toml = FeatherConfig::default()
        .to_toml_string()
        .context("Failed to serialize default configuration")?;
    print!("{}", toml);
    Ok(())
}

fn retarget(scalar: &AnimatedScalar, motion: &MotionArgs) {
    match motion.delay() {
        Some(delay) => {
            info!("Targeting {} after {}ms", motion.to, delay.as_millis());
            scalar.set_target_delayed(motion.to, delay);
        }
        None => {
            info!("Targeting {}", motion.to);
            scalar.set_target(motion.to);
        }
    }
}

fn print_frame(frame: usize, t_ms: f64, scalar: &AnimatedScalar, notifies: usize) {
    let marker = if notifies > 0 { "  notify" } else { "" };
    println!(
        "{:>6} {:>10.1} {:>14.4} {:>14.4}{}",
        frame,
        t_ms,
        scalar.value(),
        scalar.velocity(),
        marker
    );
}
