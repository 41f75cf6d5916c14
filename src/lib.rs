//! Time-of-flight corrected time window selection of tracker hits.
//!
//! The crate provides the `FilterTimeHits` event processor together with the small host-side model
//! it runs in: record kinds, typed event collections, steering parameters and the processor
//! lifecycle.

pub mod config;
pub mod diagnostics;
pub mod duplicate;
pub mod edm;
pub mod event;
pub mod io;
pub mod processors;
pub mod time_of_flight;

pub use config::{ConfigError, ParameterValue, ProcessorParameters};
pub use edm::{LcRelation, McParticleId, Record, SimTrackerHit, TrackerHitPlane};
pub use event::{Collection, Event, EventError, LcCollection, RunHeader};
pub use processors::filter_time_hits::{CollectionGroup, FilterTimeHits, HitCounters, TimeWindow};
pub use processors::processor::{
    Processor, ProcessorConfig, ProcessorError, ProcessorRegistry, PROCESSOR_REGISTRY,
};
