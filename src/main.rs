//! modelsanity - batch front end for the mesh/UV sanity checks
//!
//! # Overview
//!
//! Loads a scene snapshot (YAML), runs the registered checks over the
//! expanded object set, optionally fixes until converged, and prints a
//! per-check report. It initializes:
//! - Logging infrastructure (file rotation, console output in debug mode)
//! - Settings from `Sanity Data/Sanity Settings.yaml` plus `MODELSANITY_*`
//!   environment overrides ([`ConfigManager`])
//! - A small tokio runtime whose only task prints runner events as they arrive
//!
//! # Exit status
//!
//! 0 when no check is `bad` or `failed` (warnings allowed), 1 otherwise.

use anyhow::{Context, Result, bail};
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use modelsanity::metrics::Metrics;
use modelsanity::{
    APP_NAME, CheckRegistry, CheckRunner, CheckStatus, ConfigManager, InMemoryScene, Locator,
    RunnerEvent, Settings, UvIndexCompactor, VERSION,
};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

#[derive(Parser)]
#[command(name = "modelsanity")]
#[command(about = "Check meshes and UVs for authoring defects and fix them", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory holding `Sanity Settings.yaml`
    #[arg(long, global = true, default_value = "Sanity Data")]
    config_dir: Utf8PathBuf,

    /// Debug logging, also echoed to the console
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the registered checks
    List,

    /// Run checks over a scene snapshot
    Check {
        /// Path to the scene snapshot
        scene: Utf8PathBuf,

        /// Root to expand (repeatable); defaults to the snapshot's selection
        #[arg(long = "root")]
        roots: Vec<String>,

        /// Only run the named check (repeatable)
        #[arg(long = "check")]
        checks: Vec<String>,

        /// Fix until converged after checking
        #[arg(long)]
        fix: bool,

        /// Write the (possibly fixed) snapshot here
        #[arg(long)]
        write: Option<Utf8PathBuf>,
    },

    /// Remove ghost UVs from one mesh
    Compact {
        /// Path to the scene snapshot
        scene: Utf8PathBuf,

        /// Mesh shape to compact
        #[arg(long)]
        mesh: String,

        /// Write the compacted snapshot here
        #[arg(long)]
        write: Option<Utf8PathBuf>,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config_manager = ConfigManager::new(&cli.config_dir)?;
    let settings = config_manager.load_layered_settings()?;
    let debug = cli.debug || settings.debug_mode;

    let _guard =
        modelsanity::logging::setup_logging_with_console(&settings.log_directory, APP_NAME, debug, debug)?;
    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    match cli.command {
        Commands::List => {
            list_checks(&settings);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check {
            scene,
            roots,
            checks,
            fix,
            write,
        } => run_checks(&settings, scene, roots, checks, fix, write),
        Commands::Compact { scene, mesh, write } => {
            compact_mesh(scene, Locator::new(mesh), write)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn list_checks(settings: &Settings) {
    let registry = CheckRegistry::with_default_checks();

    for descriptor in registry.descriptors() {
        let mut flags = Vec::new();
        if descriptor.is_warning {
            flags.push("warning");
        }
        if descriptor.is_fixable {
            flags.push("fixable");
        }
        if !descriptor.is_enabled || settings.is_disabled(&descriptor.name) {
            flags.push("disabled");
        }
        println!("{:<12} {:<28} {}", descriptor.category, descriptor.name, flags.join(", "));
    }
}

fn print_event(event: &RunnerEvent) {
    match event {
        RunnerEvent::CheckFailed { name, error } => println!("  [{}] could not run: {}", name, error),
        RunnerEvent::FixApplied { name, targets } => println!("  [{}] fixed {} objects", name, targets),
        RunnerEvent::FixFailed { name, error } => println!("  [{}] fix failed: {}", name, error),
        RunnerEvent::CheckStarted { .. } | RunnerEvent::StatusChanged { .. } => {}
    }
}

fn run_checks(
    settings: &Settings,
    scene_path: Utf8PathBuf,
    roots: Vec<String>,
    only: Vec<String>,
    fix: bool,
    write: Option<Utf8PathBuf>,
) -> Result<ExitCode> {
    let mut scene = InMemoryScene::load(&scene_path)?;

    let metrics = Arc::new(Metrics::new());
    let mut runner = CheckRunner::new(CheckRegistry::with_default_checks()).with_metrics(metrics.clone());
    runner.apply_settings(settings);

    if !only.is_empty() {
        let names: Vec<String> = runner.names().map(String::from).collect();
        for name in &names {
            runner.set_enabled(name, false)?;
        }
        for name in &only {
            runner
                .set_enabled(name, true)
                .with_context(|| format!("Unknown check '{}' (see `modelsanity list`)", name))?;
        }
    }

    let objects = if roots.is_empty() {
        CheckRunner::expand_selection(&scene)
    } else {
        let roots: Vec<Locator> = roots.into_iter().map(Locator::new).collect();
        CheckRunner::expand_roots(&scene, &roots)
    };
    if objects.is_empty() {
        bail!("Nothing to check: pass --root or save a selection in {}", scene_path);
    }

    // Print progress events from a listener task while the checks run on this thread
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(1)
        .thread_name("modelsanity-events")
        .build()
        .context("Failed to create event runtime")?;
    let mut events = runner.subscribe();
    let listener = runtime.spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => print_event(&event),
                Err(RecvError::Lagged(missed)) => tracing::warn!("Dropped {} runner events", missed),
                Err(RecvError::Closed) => break,
            }
        }
    });

    println!("Checking {} objects from {}", objects.len(), scene_path);
    let mut summary = runner.run_all(&scene, &objects, &settings.parameters);

    if fix {
        let report = runner.fix_until_converged(&mut scene, settings.max_fix_rounds as usize);
        println!(
            "Fix results ({} round(s)): {} defective objects remain{}",
            report.rounds,
            report.remaining,
            if report.stalled { ", no further progress" } else { "" }
        );
        summary = runner.summary();
    }

    print_report(&runner)?;
    println!("\n{}", summary);

    if let Some(out) = write {
        scene.save(&out)?;
        println!("Wrote {}", out);
    }

    // Closing the channel ends the listener once it has drained the backlog
    drop(runner);
    runtime.block_on(listener).context("Event listener panicked")?;
    runtime.shutdown_timeout(std::time::Duration::from_secs(1));

    metrics.log_summary();
    Ok(if summary.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

fn print_report(runner: &CheckRunner) -> Result<()> {
    let mut category = String::new();

    for name in runner.names() {
        let status = runner.status(name)?;
        if status == CheckStatus::Unevaluated {
            continue;
        }

        let unit = runner.unit(name)?;
        if unit.descriptor().category != category {
            category = unit.descriptor().category.clone();
            println!("\n{}", category);
        }

        println!("  {:<28} {}", name, status);
        if let Some(error) = runner.last_error(name)? {
            println!("      {}", error);
        }
        for result in runner.last_results(name)? {
            println!("      {}", result.label());
        }
    }
    Ok(())
}

fn compact_mesh(scene_path: Utf8PathBuf, mesh: Locator, write: Option<Utf8PathBuf>) -> Result<()> {
    let mut scene = InMemoryScene::load(&scene_path)?;

    let report = UvIndexCompactor::new()
        .compact_in_scene(&mut scene, &mesh)
        .with_context(|| format!("Failed to compact UVs of {}", mesh))?;

    println!(
        "{}: {} -> {} UVs ({} removed)",
        report.target,
        report.before,
        report.after,
        report.removed()
    );

    if let Some(out) = write {
        scene.save(&out)?;
        println!("Wrote {}", out);
    }
    Ok(())
}
