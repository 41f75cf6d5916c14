use hit_time_filter::io::{event_to_json, load_events, load_steering, save_events};
use hit_time_filter::{Processor, RunHeader, PROCESSOR_REGISTRY};
use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use std::sync::PoisonError;

/// Runs event processors over a JSON event file
#[derive(Parser, Debug)]
#[command(name = "hit-time-filter")]
#[command(about = "Run the processors of a steering file over a JSON event file")]
struct Args {
    /// Steering file listing the processors and their parameters
    steering: PathBuf,

    /// Input event file
    events: PathBuf,

    /// Where to write the processed events (not written if omitted)
    output: Option<PathBuf>,
}

fn run(
    steering_path: PathBuf,
    events_path: PathBuf,
    output_path: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let steering = load_steering(&steering_path)?;

    let mut processors: Vec<Box<dyn Processor>> = Vec::new();
    {
        let registry = PROCESSOR_REGISTRY
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for entry in &steering.processors {
            let mut processor = registry.create(&entry.processor_type).ok_or_else(|| {
                format!(
                    "unknown processor `{}`, available: {}",
                    entry.processor_type,
                    registry.names().join(", ")
                )
            })?;
            processor.init(&entry.parameters)?;
            processors.push(processor);
        }
    }

    let records = load_events(&events_path)?;
    log::info!("processing {} events from {}", records.len(), events_path.display());

    let mut current_run = None;
    let mut outputs = Vec::with_capacity(records.len());
    for record in records {
        let mut event = record.into_event()?;
        if current_run != Some(event.run_number) {
            current_run = Some(event.run_number);
            let header = RunHeader {
                run_number: event.run_number,
                ..Default::default()
            };
            for processor in processors.iter_mut() {
                processor.process_run_header(&header);
            }
        }
        for processor in processors.iter_mut() {
            processor.process_event(&mut event);
            processor.check(&event);
        }
        if output_path.is_some() {
            outputs.push(event_to_json(&event)?);
        }
    }

    for processor in processors.iter_mut() {
        processor.end()?;
    }

    if let Some(path) = output_path {
        save_events(&path, &outputs)?;
        log::info!("wrote {} events to {}", outputs.len(), path.display());
    }
    Ok(())
}

// --- Main ---
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if let Err(err) = run(args.steering, args.events, args.output) {
        log::error!("{err}");
        std::process::exit(1);
    }
}
