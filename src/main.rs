//! stemintake CLI entry point

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use stemintake::config::{Cli, PreferenceStore, Settings};
use stemintake::discovery;
use stemintake::model::{LinearBackend, ModelEvent, ModelManager};
use stemintake::pipeline::{BatchSummary, IntakePipeline, PipelineEvent};
use stemintake::visualization::{peak_columns, terminal, WaveformView};
use stemintake::IntakeResult;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Columns and rows of the `--plot` output
const PLOT_WIDTH: usize = 72;
const PLOT_HEIGHT: usize = 9;

const MODEL_TIMEOUT: Duration = Duration::from_secs(30);

fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    init_logging(&cli);

    // Validate inputs
    if let Err(e) = validate_inputs(&cli) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    apply_preferences(&cli);

    let settings = Settings::from_cli(&cli);
    let pipeline = match IntakePipeline::from_settings(&settings) {
        Ok(p) => Arc::new(p),
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let files = discovery::expand_inputs(&cli.paths, settings.recursive);
    if files.is_empty() {
        eprintln!("Error: no files found in the given paths");
        return ExitCode::FAILURE;
    }

    let models = match cli.model.as_deref() {
        Some(name) => match start_model(name) {
            Ok(m) => Some(m),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => None,
    };

    let pb = if settings.show_progress {
        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        Some(pb)
    } else {
        None
    };

    let batch = pipeline.submit(files);
    let mut summary = BatchSummary::default();

    for event in batch.events() {
        match event {
            PipelineEvent::Progress { path, progress, .. } => {
                if let Some(ref pb) = pb {
                    let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
                    pb.set_message(format!("{} {}% {}", name, progress.percent, progress.message));
                }
            }
            PipelineEvent::Delivered { result, .. } => {
                let report = describe(&cli, *result, models.as_ref());
                match pb {
                    Some(ref pb) => {
                        pb.println(report);
                        pb.inc(1);
                    }
                    None => println!("{}", report),
                }
            }
            PipelineEvent::Failed { error, .. } => {
                match pb {
                    Some(ref pb) => {
                        pb.println(format!("Error: {}", error));
                        pb.inc(1);
                    }
                    None => eprintln!("Error: {}", error),
                }
            }
            PipelineEvent::Cancelled { path, .. } => {
                info!("Cancelled {}", path.display());
                if let Some(ref pb) = pb {
                    pb.inc(1);
                }
            }
            PipelineEvent::BatchFinished(s) => summary = s,
        }
    }

    if let Some(pb) = pb {
        pb.finish_with_message("Intake complete");
    }

    println!();
    println!(
        "Summary: {} delivered, {} failed, {} cancelled (of {} total)",
        summary.delivered, summary.failed, summary.cancelled, summary.total
    );

    if summary.failed > 0 {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}

fn init_logging(cli: &Cli) {
    let filter = cli.log_level().to_string().to_lowercase();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}

fn validate_inputs(cli: &Cli) -> Result<(), String> {
    for path in &cli.paths {
        if !path.exists() {
            return Err(format!(
                "Input path does not exist: {}\n\n  Tip: Check the path is correct and accessible.\n  Examples:\n    stemintake ~/Music/song.mp3\n    stemintake -r ~/Music/Sessions",
                path.display()
            ));
        }
    }

    if let Some(Err(e)) = cli.selection() {
        return Err(format!("Invalid --select value: {}", e));
    }

    Ok(())
}

fn apply_preferences(cli: &Cli) {
    let mut prefs = match PreferenceStore::open_default() {
        Ok(p) => p,
        Err(e) => {
            warn!("Preferences unavailable: {}", e);
            return;
        }
    };

    if let Some(ref theme) = cli.theme {
        if let Err(e) = prefs.set_theme(theme) {
            warn!("{}", e);
        }
    }
    info!("Theme: {}", prefs.theme());
}

fn start_model(name: &str) -> stemintake::Result<ModelManager> {
    let manager = ModelManager::new(LinearBackend::new())?;
    let request = manager.build_model(name)?;
    match manager.wait_for(request, MODEL_TIMEOUT)? {
        ModelEvent::Loaded { name, .. } => {
            info!("Loaded model {}", name);
            Ok(manager)
        }
        ModelEvent::Error { error, .. } => Err(error),
        ModelEvent::InferenceFinished { .. } => Err(stemintake::IntakeError::ModelUnavailable {
            name: name.to_string(),
        }),
    }
}

/// One report block for a delivered file
fn describe(cli: &Cli, result: IntakeResult, models: Option<&ModelManager>) -> String {
    let mut lines = vec![format!(
        "{} -> {} ({:.2}s, {} Hz, {} ch, {} kbps)",
        result.source.display(),
        result.normalized.display(),
        result.waveform.duration_seconds(),
        result.waveform.sample_rate(),
        result.waveform.channel_count(),
        result.metadata.bitrate_bps / 1000
    )];

    let mut view = WaveformView::from_result(result);

    if let Some(Ok((start, end))) = cli.selection() {
        match view.select(start, end) {
            Ok(range) => lines.push(format!(
                "  selection {:.3}s..{:.3}s",
                range.start_seconds(),
                range.end_seconds()
            )),
            Err(e) => lines.push(format!("  {}", e)),
        }
    }

    if cli.plot {
        let selection = view.selection();
        let peaks = peak_columns(
            view.waveform(),
            None,
            selection.start_seconds(),
            selection.end_seconds(),
            PLOT_WIDTH,
        );
        lines.extend(terminal::render_ascii(&peaks, PLOT_HEIGHT));
    }

    if let Some(manager) = models {
        let features = LinearBackend::features(view.waveform());
        let outcome = manager
            .run_model(features)
            .and_then(|request| manager.wait_for(request, MODEL_TIMEOUT));
        match outcome {
            Ok(ModelEvent::InferenceFinished { model, output, .. }) => {
                let value = output.iter().next().copied().unwrap_or_default();
                lines.push(format!("  {} output {:.4}", model, value));
            }
            Ok(ModelEvent::Error { error, .. }) | Err(error) => lines.push(format!("  {}", error)),
            Ok(ModelEvent::Loaded { .. }) => {}
        }
    }

    lines.join("\n")
}
