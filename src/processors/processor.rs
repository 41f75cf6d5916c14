//! This module provides the `Processor` trait, the lifecycle every event processor follows, and a
//! global registry of processor types that hosts use to instantiate processors by name.

use crate::config::{ConfigError, ProcessorParameters};
use crate::diagnostics::DiagnosticsError;
use crate::event::{Event, RunHeader};
#[allow(unused_imports)] // this dependency is required by the `register_processor` macro
use ctor::ctor;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

/// Errors a processor reports back to its host from the lifecycle calls.
#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("diagnostics: {0}")]
    Diagnostics(#[from] DiagnosticsError),
}

/// The `Processor` trait defines the lifecycle of an event processor driven by a host.
///
/// The host calls, in order:
/// - `init` once, with the steering parameters of this processor instance.
/// - `process_run_header` whenever a new run starts.
/// - `process_event` and then `check` for every event, strictly one event at a time.
/// - `end` once after the last event.
///
/// Processors never schedule themselves. Implementations are registered with the
/// `register_processor` macro so hosts can create them by name:
///
/// ```ignore
/// #[register_processor]
/// #[derive(Debug)]
/// pub struct ExampleProcessor;
///
/// impl Processor for ExampleProcessor {
///     fn new() -> Self { ExampleProcessor }
///     fn config(&self) -> ProcessorConfig {
///         ProcessorConfig {
///             name: "ExampleProcessor".to_string(),
///             description: "Does nothing.".to_string(),
///         }
///     }
///     fn init(&mut self, _parameters: &ProcessorParameters) -> Result<(), ProcessorError> { Ok(()) }
///     fn process_run_header(&mut self, _run: &RunHeader) {}
///     fn process_event(&mut self, _event: &mut Event) {}
///     fn end(&mut self) -> Result<(), ProcessorError> { Ok(()) }
/// }
/// ```
pub trait Processor: Debug {
    /// Creates a new instance with default parameters.
    fn new() -> Self
    where
        Self: Sized;

    /// Returns the processor metadata.
    fn config(&self) -> ProcessorConfig;

    /// Reads and validates the steering parameters. An error here aborts the job.
    fn init(&mut self, parameters: &ProcessorParameters) -> Result<(), ProcessorError>;

    /// Called at the start of every run.
    fn process_run_header(&mut self, run: &RunHeader);

    /// Called once per event. Anomalies in the event are logged, never returned.
    fn process_event(&mut self, event: &mut Event);

    /// Called after `process_event` with the same event. Optional.
    fn check(&mut self, _event: &Event) {}

    /// Called once after the last event.
    fn end(&mut self) -> Result<(), ProcessorError>;
}

/// Name and description of a processor type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorConfig {
    /// The name of the processor type, used to create it from a steering file.
    pub name: String,
    /// A description of what the processor does.
    pub description: String,
}

type ProcessorFactory = fn() -> Box<dyn Processor>;

fn make_processor<P: Processor + 'static>() -> Box<dyn Processor> {
    Box::new(P::new())
}

/// A registry of processor factories keyed by processor name.
#[derive(Debug, Default)]
pub struct ProcessorRegistry {
    factories: HashMap<String, ProcessorFactory>,
}

impl ProcessorRegistry {
    /// Registers the processor type `P` into the global `PROCESSOR_REGISTRY`.
    pub fn register_processor<P: Processor + 'static>() {
        let name = P::new().config().name;
        PROCESSOR_REGISTRY
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .factories
            .insert(name, make_processor::<P>);
    }

    /// Creates a fresh instance of the processor registered under `name`.
    pub fn create(&self, name: &str) -> Option<Box<dyn Processor>> {
        self.factories.get(name).map(|factory| factory())
    }

    /// Names of all registered processors, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }
}

/// The global processor registry, filled at program start by `register_processor`.
pub static PROCESSOR_REGISTRY: Lazy<Mutex<ProcessorRegistry>> =
    Lazy::new(|| Mutex::new(ProcessorRegistry::default()));
