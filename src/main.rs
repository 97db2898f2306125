//! EMG Gesture Agent CLI
//!
//! Streams armband samples through the gesture pipeline and forwards haptic
//! feedback commands.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use emg_gesture_agent::{
    config::Config,
    core::{
        BackendPreference, Classifier, GestureLabel, GesturePipeline, ModelArtifact,
        ScalerParams, Standardizer, TickOutcome,
    },
    feedback::{ChannelDispatcher, FeedbackCommand},
    source::{spawn_acquisition, ChannelSource, SyntheticArmband},
    telemetry::create_shared_telemetry,
    VERSION,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Readings the simulated armband holds each scripted gesture for (~2 s).
const SAMPLES_PER_GESTURE: usize = 140;

/// Raw frames buffered between the acquisition thread and the pipeline.
const ACQUISITION_QUEUE: usize = 64;

#[derive(Parser)]
#[command(name = "emg-gesture")]
#[command(version = VERSION)]
#[command(about = "Streaming EMG hand-gesture recognition", long_about = None)]
struct Cli {
    /// Enable debug-level logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline against the simulated armband
    Run {
        /// Model artifact (overrides the configured path)
        #[arg(long)]
        model: Option<PathBuf>,

        /// Scaler parameters (overrides the configured path)
        #[arg(long)]
        scaler: Option<PathBuf>,

        /// Inference backend (auto, accelerated, or portable)
        #[arg(long)]
        backend: Option<BackendPreference>,

        /// Stop after this many ticks instead of waiting for Ctrl+C
        #[arg(long)]
        ticks: Option<u64>,

        /// Comma-separated gestures for the simulated armband to perform
        #[arg(long, default_value = "resting,grasp,resting,pinch")]
        script: String,

        /// Noise seed for the simulated armband
        #[arg(long, default_value = "7")]
        seed: u64,
    },

    /// Load the model and scaler and report the selected backend
    Check {
        #[arg(long)]
        model: Option<PathBuf>,

        #[arg(long)]
        scaler: Option<PathBuf>,
    },

    /// Show configuration
    Config,

    /// Write the default configuration file
    InitConfig,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Commands::Run {
            model,
            scaler,
            backend,
            ticks,
            script,
            seed,
        } => cmd_run(model, scaler, backend, ticks, &script, seed),
        Commands::Check { model, scaler } => cmd_check(model, scaler),
        Commands::Config => cmd_config(),
        Commands::InitConfig => cmd_init_config(),
    }
}

fn load_config() -> anyhow::Result<Config> {
    Config::load().with_context(|| format!("loading {:?}", Config::config_path()))
}

fn load_model(path: Option<PathBuf>) -> anyhow::Result<ModelArtifact> {
    let Some(path) = path else {
        bail!("no model artifact configured; pass --model or set model_path");
    };
    ModelArtifact::load(&path).with_context(|| format!("loading model {path:?}"))
}

fn parse_script(script: &str) -> anyhow::Result<Vec<GestureLabel>> {
    script
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.parse::<GestureLabel>().map_err(anyhow::Error::msg))
        .collect()
}

fn cmd_run(
    model: Option<PathBuf>,
    scaler: Option<PathBuf>,
    backend: Option<BackendPreference>,
    ticks: Option<u64>,
    script: &str,
    seed: u64,
) -> anyhow::Result<()> {
    println!("EMG Gesture Agent v{VERSION}");
    println!();

    let config = load_config()?;
    if let Err(e) = config.ensure_directories() {
        tracing::warn!("could not create data directory: {e}");
    }

    let model = load_model(model.or_else(|| config.model_path.clone()))?;
    let script = parse_script(script)?;
    let telemetry = create_shared_telemetry();

    let scaler_path = scaler.or_else(|| config.scaler_path.clone());
    let loaded = ScalerParams::load_or_identity(scaler_path.as_deref());
    if loaded.is_fallback() {
        telemetry.record_scaler_fallback();
    }
    let standardizer = Standardizer::new(loaded.params).context("invalid scaler parameters")?;

    let classifier = Classifier::new(&model, backend.unwrap_or(config.backend))
        .context("no inference backend could be initialized")?;

    let (dispatcher, commands) = ChannelDispatcher::new(config.feedback_capacity);
    let mut pipeline = GesturePipeline::new(
        classifier,
        standardizer,
        config.thresholds,
        Box::new(dispatcher),
        Arc::clone(&telemetry),
    );

    println!("  Backend: {}", pipeline.status().backend.selected);
    println!("  Tick interval: {}ms", config.tick_interval.as_millis());
    println!("  Instance ID: {}", telemetry.instance_id());
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(Arc::clone(&running))?;

    // Actuator side: consumes feedback commands until the pipeline goes away
    let actuator = thread::spawn(move || {
        for FeedbackCommand { label, issued_at } in commands.iter() {
            tracing::debug!(%label, %issued_at, "actuator command");
        }
    });

    let mut armband = SyntheticArmband::new(script, SAMPLES_PER_GESTURE, seed);
    let (sender, mut source) = ChannelSource::new(ACQUISITION_QUEUE);
    let acquisition = spawn_acquisition(
        move || Some(armband.next_frame()),
        sender,
        config.tick_interval,
        Arc::clone(&running),
    );

    let ticker = crossbeam_channel::tick(config.tick_interval);
    let mut tick_count: u64 = 0;
    let mut shown: Option<GestureLabel> = None;

    while running.load(Ordering::SeqCst) {
        match ticker.recv_timeout(Duration::from_millis(100)) {
            Ok(_) => {}
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
        }

        if let TickOutcome::Candidate {
            stable: Some(stable),
            ..
        } = pipeline.tick(&mut source)
        {
            if shown != Some(stable.label) {
                println!(
                    "[{}] {} ({:.2})",
                    stable.updated_at.format("%H:%M:%S%.3f"),
                    stable.label,
                    stable.confidence
                );
                shown = Some(stable.label);
            }
        }

        tick_count += 1;
        if ticks.is_some_and(|limit| tick_count >= limit) {
            break;
        }
    }

    println!();
    println!("Shutting down...");
    running.store(false, Ordering::SeqCst);
    pipeline.shutdown();
    drop(pipeline);

    if acquisition.join().is_err() {
        tracing::warn!("acquisition thread panicked");
    }
    if actuator.join().is_err() {
        tracing::warn!("actuator thread panicked");
    }

    println!();
    println!("{}", telemetry.summary());

    let path = config.telemetry_path();
    match telemetry.save(&path) {
        Ok(()) => println!("Telemetry written to {path:?}"),
        Err(e) => tracing::warn!("could not write telemetry: {e}"),
    }

    Ok(())
}

fn cmd_check(model: Option<PathBuf>, scaler: Option<PathBuf>) -> anyhow::Result<()> {
    let config = load_config()?;
    config.validate().context("invalid configuration")?;

    let model = load_model(model.or_else(|| config.model_path.clone()))?;
    println!("Model");
    println!(
        "  Tensors: {} {:?} -> {} {:?}",
        model.input_name, model.input_shape, model.output_name, model.output_shape
    );
    println!("  Layers: {}", model.layers.len());
    println!("  Parameters: {}", model.parameter_count());

    let scaler_path = scaler.or_else(|| config.scaler_path.clone());
    let loaded = ScalerParams::load_or_identity(scaler_path.as_deref());
    println!("Scaler");
    match &loaded.fallback {
        None => println!("  Loaded ({} features)", loaded.params.mean.len()),
        Some(reason) => println!("  Identity fallback: {reason}"),
    }

    let mut classifier =
        Classifier::new(&model, config.backend).context("no inference backend available")?;
    let selection = classifier.selection().clone();
    println!("Backend");
    println!("  Selected: {}", selection.selected);
    if let Some(reason) = &selection.fallback_reason {
        println!("  Fallback reason: {reason}");
    }
    classifier.shutdown();

    Ok(())
}

fn cmd_config() -> anyhow::Result<()> {
    let config = load_config()?;

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).context("serializing configuration")?
    );
    Ok(())
}

fn cmd_init_config() -> anyhow::Result<()> {
    let path = Config::config_path();
    if path.exists() {
        println!("Configuration already exists at {path:?}");
        return Ok(());
    }
    Config::default().save().context("writing default configuration")?;
    println!("Wrote default configuration to {path:?}");
    Ok(())
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) -> anyhow::Result<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .context("setting Ctrl+C handler")
}
