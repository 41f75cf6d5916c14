//! Event processors.
//!
//! Each processor implements the `Processor` trait defined in the `processor` module and is
//! registered in the global processor registry, so a host can create it by name from a steering
//! file.

/// Core processor interfaces and the processor registry.
pub mod processor;

/// Time window selection of tracker hits after time-of-flight correction.
/// Propagates the selection to the linked simulated hits and relations.
pub mod filter_time_hits;
