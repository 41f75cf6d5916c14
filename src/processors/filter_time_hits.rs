//! This module implements `FilterTimeHits`, a processor that keeps only the tracker hits whose
//! time-of-flight corrected time lies inside a configured window, together with the simulated
//! hits and relations linked to them.
//!
//! Hits are processed in collection groups: an input hit collection, optionally its simulated hit
//! and relation collections, optionally the constituents of clustered hits, and the output names
//! for each of them. For every retained hit a copy is appended to the output hit collection and
//! every relation of that hit is re-created between the copied hit and a copy of its simulated
//! hit, so the outputs stay aligned in creation order.

use crate::config::{ConfigError, ProcessorParameters};
use crate::diagnostics::DiagnosticsRecorder;
use crate::duplicate::{copy_sim_tracker_hit, copy_tracker_hit_plane};
use crate::edm::{LcRelation, SimTrackerHit, TrackerHitPlane};
use crate::event::{Collection, Event, EventError, LcCollection, RunHeader};
use crate::processors::processor::{Processor, ProcessorConfig, ProcessorError};
use crate::time_of_flight::corrected_time;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use processor_macros::register_processor;
use std::collections::HashMap;
use std::path::PathBuf;

pub const INPUT_HITS: &str = "TrackerHitInputCollections";
pub const INPUT_CONSTITUENTS: &str = "TrackerHitConstituentsInputCollections";
pub const INPUT_SIM_HITS: &str = "TrackerSimHitInputCollections";
pub const INPUT_RELATIONS: &str = "TrackerHitInputRelations";
pub const OUTPUT_HITS: &str = "TrackerHitOutputCollections";
pub const OUTPUT_CONSTITUENTS: &str = "TrackerHitConstituentsOutputCollections";
pub const OUTPUT_SIM_HITS: &str = "TrackerSimHitOutputCollections";
pub const OUTPUT_RELATIONS: &str = "TrackerHitOutputRelations";
pub const TARGET_BETA: &str = "TargetBeta";
pub const TIME_LOWER_LIMIT: &str = "TimeLowerLimit";
pub const TIME_UPPER_LIMIT: &str = "TimeUpperLimit";
pub const FILL_HISTOGRAMS: &str = "FillHistograms";
pub const HISTOGRAM_OUTPUT_PATH: &str = "HistogramOutputPath";

const DEFAULT_BETA: f64 = 1.0;
const DEFAULT_TIME_MIN: f64 = -90.0;
const DEFAULT_TIME_MAX: f64 = 90.0;

/// Input and output names of the simulated hits and relations of a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationLinkage {
    pub input_sim_hits: String,
    pub input_relations: String,
    pub output_sim_hits: String,
    pub output_relations: String,
}

/// Input and output names of the constituents of clustered hits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstituentLinkage {
    pub input: String,
    pub output: String,
}

/// One filtering unit: a hit collection and everything linked to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionGroup {
    pub input_hits: String,
    pub output_hits: String,
    pub linkage: Option<RelationLinkage>,
    pub constituents: Option<ConstituentLinkage>,
}

impl CollectionGroup {
    /// Zips the parallel name lists of the steering parameters into group descriptors.
    ///
    /// The simulated hit, relation and constituent lists may be shorter than the hit list; groups
    /// past their end have no such linkage. Every input name needs an output name at the same
    /// position.
    pub fn from_parameters(
        parameters: &ProcessorParameters,
    ) -> Result<Vec<CollectionGroup>, ConfigError> {
        let input_hits = parameters.string_list(INPUT_HITS)?;
        let output_hits = parameters.string_list(OUTPUT_HITS)?;
        let input_sim_hits = parameters.string_list(INPUT_SIM_HITS)?;
        let output_sim_hits = parameters.string_list(OUTPUT_SIM_HITS)?;
        let input_relations = parameters.string_list(INPUT_RELATIONS)?;
        let output_relations = parameters.string_list(OUTPUT_RELATIONS)?;
        let input_constituents = parameters.string_list(INPUT_CONSTITUENTS)?;
        let output_constituents = parameters.string_list(OUTPUT_CONSTITUENTS)?;

        require_outputs(INPUT_HITS, OUTPUT_HITS, &input_hits, &output_hits)?;
        require_outputs(INPUT_SIM_HITS, OUTPUT_SIM_HITS, &input_sim_hits, &output_sim_hits)?;
        require_outputs(INPUT_RELATIONS, OUTPUT_RELATIONS, &input_relations, &output_relations)?;
        require_outputs(
            INPUT_CONSTITUENTS,
            OUTPUT_CONSTITUENTS,
            &input_constituents,
            &output_constituents,
        )?;

        for (name, list) in [
            (INPUT_SIM_HITS, &input_sim_hits),
            (INPUT_RELATIONS, &input_relations),
            (INPUT_CONSTITUENTS, &input_constituents),
        ] {
            if list.len() > input_hits.len() {
                warn!(
                    "{name} lists {} collections but only {} hit collections are configured, ignoring the rest",
                    list.len(),
                    input_hits.len()
                );
            }
        }

        let groups = input_hits
            .iter()
            .zip(&output_hits)
            .enumerate()
            .map(|(i, (input, output))| {
                let linkage = match (input_sim_hits.get(i), input_relations.get(i)) {
                    (Some(sim_hits), Some(relations)) => Some(RelationLinkage {
                        input_sim_hits: sim_hits.clone(),
                        input_relations: relations.clone(),
                        output_sim_hits: output_sim_hits[i].clone(),
                        output_relations: output_relations[i].clone(),
                    }),
                    (None, None) => None,
                    (Some(_), None) | (None, Some(_)) => {
                        warn!(
                            "collection group `{input}` needs both simulated hits and relations, running without them"
                        );
                        None
                    }
                };
                let constituents = input_constituents.get(i).map(|c| ConstituentLinkage {
                    input: c.clone(),
                    output: output_constituents[i].clone(),
                });
                CollectionGroup {
                    input_hits: input.clone(),
                    output_hits: output.clone(),
                    linkage,
                    constituents,
                }
            })
            .collect();

        Ok(groups)
    }

    /// Names of every output collection this group writes.
    pub fn output_names(&self) -> Vec<&str> {
        let mut names = vec![self.output_hits.as_str()];
        if let Some(linkage) = &self.linkage {
            names.push(&linkage.output_sim_hits);
            names.push(&linkage.output_relations);
        }
        if let Some(constituents) = &self.constituents {
            names.push(&constituents.output);
        }
        names
    }
}

fn require_outputs(
    inputs_name: &'static str,
    outputs_name: &'static str,
    inputs: &[String],
    outputs: &[String],
) -> Result<(), ConfigError> {
    if outputs.len() < inputs.len() {
        return Err(ConfigError::MissingOutputNames {
            inputs: inputs_name,
            outputs: outputs_name,
            needed: inputs.len(),
            found: outputs.len(),
        });
    }
    Ok(())
}

/// Closed interval of accepted corrected times, in ns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    pub min: f64,
    pub max: f64,
}

impl TimeWindow {
    pub fn contains(&self, time: f64) -> bool {
        time >= self.min && time <= self.max
    }
}

/// Hit counters, kept per run and for the whole job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HitCounters {
    pub events: u64,
    pub processed: u64,
    pub retained: u64,
    pub malformed: u64,
}

impl HitCounters {
    fn add(&mut self, other: &HitCounters) {
        self.events += other.events;
        self.processed += other.processed;
        self.retained += other.retained;
        self.malformed += other.malformed;
    }
}

/// Output collections of one group for one event.
#[derive(Debug)]
struct GroupOutput {
    hits: Collection<TrackerHitPlane>,
    linked: Option<(Collection<SimTrackerHit>, Collection<LcRelation>)>,
    constituents: Option<Collection<TrackerHitPlane>>,
    counters: HitCounters,
}

/// Resolved input collections linked to a group's hits.
struct LinkedInputs<'a> {
    sim_hits: &'a Collection<SimTrackerHit>,
    /// hit index -> (sim hit index, weight), in relation order
    by_hit: HashMap<usize, Vec<(usize, f32)>>,
}

#[register_processor]
#[derive(Debug)]
pub struct FilterTimeHits {
    groups: Vec<CollectionGroup>,
    beta: f64,
    window: TimeWindow,
    histogram_path: Option<PathBuf>,
    diagnostics: Option<DiagnosticsRecorder>,
    n_run: u64,
    run_counters: HitCounters,
    total_counters: HitCounters,
    started: Option<DateTime<Utc>>,
}

impl FilterTimeHits {
    pub fn groups(&self) -> &[CollectionGroup] {
        &self.groups
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }

    /// The diagnostic histograms, when `FillHistograms` is enabled.
    pub fn diagnostics(&self) -> Option<&DiagnosticsRecorder> {
        self.diagnostics.as_ref()
    }

    /// Counters since the last run header.
    pub fn run_counters(&self) -> HitCounters {
        self.run_counters
    }

    /// Counters over all runs.
    pub fn total_counters(&self) -> HitCounters {
        self.total_counters
    }

    /// Checks that the outputs of every group present in `event` are aligned: one relation per
    /// copied simulated hit, each pointing at an existing hit and simulated hit.
    ///
    /// Returns a description of every problem found.
    pub fn output_problems(&self, event: &Event) -> Vec<String> {
        let mut problems = Vec::new();
        for group in &self.groups {
            let Some(linkage) = &group.linkage else {
                continue;
            };
            let (Ok(hits), Ok(sim_hits), Ok(relations)) = (
                event.get::<TrackerHitPlane>(&group.output_hits),
                event.get::<SimTrackerHit>(&linkage.output_sim_hits),
                event.get::<LcRelation>(&linkage.output_relations),
            ) else {
                continue;
            };
            if relations.len() != sim_hits.len() {
                problems.push(format!(
                    "`{}` has {} relations for {} simulated hits",
                    linkage.output_relations,
                    relations.len(),
                    sim_hits.len()
                ));
            }
            for (i, relation) in relations.iter().enumerate() {
                if relation.from >= hits.len() || relation.to >= sim_hits.len() {
                    problems.push(format!(
                        "relation {i} of `{}` points outside its collections ({} -> {})",
                        linkage.output_relations, relation.from, relation.to
                    ));
                }
            }
        }
        problems
    }

    fn select_group(&mut self, event: &Event, group_index: usize) -> Option<GroupOutput> {
        let group = &self.groups[group_index];
        let hits = match event.get::<TrackerHitPlane>(&group.input_hits) {
            Ok(hits) => hits,
            Err(EventError::NotFound(name)) => {
                debug!(
                    "event {}: collection `{name}` not found, skipping group",
                    event.event_number
                );
                return None;
            }
            Err(err) => {
                warn!("event {}: {err}, skipping group", event.event_number);
                return None;
            }
        };

        let output_names = group.output_names();
        let taken: Vec<&str> = output_names
            .iter()
            .enumerate()
            .filter(|&(i, name)| event.contains(name) || output_names[..i].contains(name))
            .map(|(_, name)| *name)
            .collect();
        if !taken.is_empty() {
            error!(
                "event {}: output collection(s) {} of group `{}` already taken, skipping group",
                event.event_number,
                taken.join(", "),
                group.input_hits
            );
            return None;
        }

        let linked_inputs = group
            .linkage
            .as_ref()
            .and_then(|linkage| resolve_linkage(event, linkage, hits.len()));
        let constituents_in = group.constituents.as_ref().and_then(|constituents| {
            match event.get::<TrackerHitPlane>(&constituents.input) {
                Ok(collection) => Some(collection),
                Err(err) => {
                    debug!("event {}: {err}, constituents are not propagated", event.event_number);
                    None
                }
            }
        });

        let mut output = GroupOutput {
            hits: Collection::with_flags(hits.flags()),
            linked: group.linkage.as_ref().map(|_| {
                let flags = linked_inputs.as_ref().map_or(0, |l| l.sim_hits.flags());
                (Collection::with_flags(flags), Collection::new())
            }),
            constituents: group.constituents.as_ref().map(|_| {
                Collection::with_flags(constituents_in.map_or(0, |c| c.flags()))
            }),
            counters: HitCounters::default(),
        };

        for (index, hit) in hits.iter().enumerate() {
            output.counters.processed += 1;

            let time = corrected_time(hit, self.beta);
            if !time.is_finite() {
                output.counters.malformed += 1;
                warn!(
                    "event {}: hit {index} of `{}` has no usable position or time, rejecting it",
                    event.event_number, group.input_hits
                );
                continue;
            }

            if let Some(diagnostics) = self.diagnostics.as_mut() {
                diagnostics.record_before(time);
            }
            if !self.window.contains(time) {
                continue;
            }
            if let Some(diagnostics) = self.diagnostics.as_mut() {
                diagnostics.record_after(time);
            }

            let mut copy = copy_tracker_hit_plane(hit);
            if let (Some(source), Some(target)) = (constituents_in, output.constituents.as_mut()) {
                copy.raw_hits = hit
                    .raw_hits
                    .iter()
                    .filter_map(|&i| match source.get(i) {
                        Some(constituent) => Some(target.push(copy_tracker_hit_plane(constituent))),
                        None => {
                            warn!(
                                "event {}: hit {index} of `{}` refers to missing constituent {i}",
                                event.event_number, group.input_hits
                            );
                            None
                        }
                    })
                    .collect();
            }
            let new_hit = output.hits.push(copy);
            output.counters.retained += 1;

            if let (Some(inputs), Some((sim_hits, relations))) =
                (linked_inputs.as_ref(), output.linked.as_mut())
            {
                for &(sim_index, weight) in inputs.by_hit.get(&index).into_iter().flatten() {
                    // indices were validated while building the lookup
                    if let Some(sim_hit) = inputs.sim_hits.get(sim_index) {
                        let new_sim_hit = sim_hits.push(copy_sim_tracker_hit(sim_hit));
                        relations.push(LcRelation {
                            from: new_hit,
                            to: new_sim_hit,
                            weight,
                        });
                    }
                }
            }
        }

        Some(output)
    }
}

/// Looks up the simulated hits and relations of a group and indexes the relations by hit.
///
/// Returns `None` when either collection is missing from the event; the group then runs
/// without linkage for this event.
fn resolve_linkage<'a>(
    event: &'a Event,
    linkage: &RelationLinkage,
    n_hits: usize,
) -> Option<LinkedInputs<'a>> {
    let relations = match event.get::<LcRelation>(&linkage.input_relations) {
        Ok(relations) => relations,
        Err(err) => {
            debug!("event {}: {err}, hits are filtered without relations", event.event_number);
            return None;
        }
    };
    let sim_hits = match event.get::<SimTrackerHit>(&linkage.input_sim_hits) {
        Ok(sim_hits) => sim_hits,
        Err(err) => {
            warn!(
                "event {}: relations `{}` present but {err}, hits are filtered without relations",
                event.event_number, linkage.input_relations
            );
            return None;
        }
    };

    let mut by_hit: HashMap<usize, Vec<(usize, f32)>> = HashMap::new();
    for (i, relation) in relations.iter().enumerate() {
        if relation.from >= n_hits || relation.to >= sim_hits.len() {
            warn!(
                "event {}: relation {i} of `{}` points outside its collections ({} -> {}), ignoring it",
                event.event_number, linkage.input_relations, relation.from, relation.to
            );
            continue;
        }
        by_hit
            .entry(relation.from)
            .or_default()
            .push((relation.to, relation.weight));
    }

    Some(LinkedInputs { sim_hits, by_hit })
}

fn add_output<T: crate::edm::Record>(
    event: &mut Event,
    name: &str,
    collection: Collection<T>,
) {
    if let Err(err) = event.add_collection(name, collection) {
        error!(
            "event {}: could not add output collection: {err}",
            event.event_number
        );
    }
}

impl Processor for FilterTimeHits {
    fn new() -> Self
    where
        Self: Sized,
    {
        FilterTimeHits {
            groups: vec![],
            beta: DEFAULT_BETA,
            window: TimeWindow {
                min: DEFAULT_TIME_MIN,
                max: DEFAULT_TIME_MAX,
            },
            histogram_path: None,
            diagnostics: None,
            n_run: 0,
            run_counters: HitCounters::default(),
            total_counters: HitCounters::default(),
            started: None,
        }
    }

    fn config(&self) -> ProcessorConfig {
        ProcessorConfig {
            name: "FilterTimeHits".to_string(),
            description: "Selects tracker hits with a time-of-flight corrected time inside a window, \
                          together with their simulated hits and relations."
                .to_string(),
        }
    }

    fn init(&mut self, parameters: &ProcessorParameters) -> Result<(), ProcessorError> {
        let beta = parameters.float_or(TARGET_BETA, DEFAULT_BETA)?;
        if !(beta > 0.0 && beta <= 1.0) {
            return Err(ConfigError::OutOfRange {
                name: TARGET_BETA.to_string(),
                reason: format!("{beta} is not in (0, 1]"),
            }
            .into());
        }

        let min = parameters.float_or(TIME_LOWER_LIMIT, DEFAULT_TIME_MIN)?;
        let max = parameters.float_or(TIME_UPPER_LIMIT, DEFAULT_TIME_MAX)?;
        if min.is_nan() || max.is_nan() || min > max {
            return Err(ConfigError::OutOfRange {
                name: TIME_LOWER_LIMIT.to_string(),
                reason: format!("window [{min}, {max}] is empty"),
            }
            .into());
        }

        let groups = CollectionGroup::from_parameters(parameters)?;
        let fill_histograms = parameters.bool_or(FILL_HISTOGRAMS, false)?;
        let histogram_path = parameters.string_opt(HISTOGRAM_OUTPUT_PATH)?.map(PathBuf::from);
        if histogram_path.is_some() && !fill_histograms {
            warn!("{HISTOGRAM_OUTPUT_PATH} is set but {FILL_HISTOGRAMS} is false, no histograms will be written");
        }

        self.groups = groups;
        self.beta = beta;
        self.window = TimeWindow { min, max };
        self.histogram_path = histogram_path;
        self.diagnostics = fill_histograms.then(DiagnosticsRecorder::new);
        self.n_run = 0;
        self.run_counters = HitCounters::default();
        self.total_counters = HitCounters::default();
        self.started = Some(Utc::now());

        info!(
            "FilterTimeHits: {} collection group(s), beta = {}, window = [{}, {}] ns, histograms {}",
            self.groups.len(),
            self.beta,
            self.window.min,
            self.window.max,
            if fill_histograms { "on" } else { "off" }
        );
        Ok(())
    }

    fn process_run_header(&mut self, run: &RunHeader) {
        if self.run_counters.events > 0 {
            info!(
                "FilterTimeHits: previous run kept {} of {} hits in {} events",
                self.run_counters.retained, self.run_counters.processed, self.run_counters.events
            );
        }
        self.run_counters = HitCounters::default();
        self.n_run += 1;
        debug!("FilterTimeHits: starting run {}", run.run_number);
    }

    fn process_event(&mut self, event: &mut Event) {
        let mut event_counters = HitCounters {
            events: 1,
            ..Default::default()
        };

        for group_index in 0..self.groups.len() {
            let Some(output) = self.select_group(event, group_index) else {
                continue;
            };
            let group = &self.groups[group_index];

            debug!(
                "event {}: kept {} of {} hits from `{}`",
                event.event_number,
                output.counters.retained,
                output.counters.processed,
                group.input_hits
            );
            event_counters.processed += output.counters.processed;
            event_counters.retained += output.counters.retained;
            event_counters.malformed += output.counters.malformed;

            add_output(event, &group.output_hits, output.hits);
            if let (Some(linkage), Some((sim_hits, relations))) = (&group.linkage, output.linked) {
                add_output(event, &linkage.output_sim_hits, sim_hits);
                add_output(event, &linkage.output_relations, relations);
            }
            if let (Some(constituents), Some(collection)) = (&group.constituents, output.constituents)
            {
                add_output(event, &constituents.output, collection);
            }
        }

        self.run_counters.add(&event_counters);
        self.total_counters.add(&event_counters);
    }

    fn check(&mut self, event: &Event) {
        for problem in self.output_problems(event) {
            warn!("event {}: {problem}", event.event_number);
        }
    }

    fn end(&mut self) -> Result<(), ProcessorError> {
        let elapsed = self
            .started
            .map(|started| (Utc::now() - started).num_milliseconds())
            .unwrap_or_default();
        info!(
            "FilterTimeHits: {} run(s), {} events, kept {} of {} hits ({} malformed) in {elapsed} ms",
            self.n_run,
            self.total_counters.events,
            self.total_counters.retained,
            self.total_counters.processed,
            self.total_counters.malformed
        );

        if let Some(diagnostics) = &self.diagnostics {
            for histogram in [&diagnostics.before, &diagnostics.after] {
                info!(
                    "FilterTimeHits: {}: {} entries, mean {}",
                    histogram.title,
                    histogram.entries(),
                    histogram
                        .mean()
                        .map_or_else(|| "n/a".to_string(), |mean| format!("{mean:.3} ns"))
                );
            }
            if let Some(path) = &self.histogram_path {
                diagnostics.save(path)?;
                info!("FilterTimeHits: histograms written to {}", path.display());
            }
        }
        Ok(())
    }
}
