//! JSON file formats used by the bundled host: the steering file listing the processors to run
//! and the event file holding the input collections of every event.

use crate::config::ProcessorParameters;
use crate::edm::{LcRelation, SimTrackerHit, TrackerHitPlane};
use crate::event::{Collection, Event, EventError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid event: {0}")]
    Event(#[from] EventError),
}

/// The processors to run, in order, with their parameters.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SteeringFile {
    pub processors: Vec<ProcessorSteering>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProcessorSteering {
    /// Registered processor name, e.g. `FilterTimeHits`.
    #[serde(rename = "type")]
    pub processor_type: String,
    #[serde(default)]
    pub parameters: ProcessorParameters,
}

/// One event as stored in an event file, collections grouped by record kind.
#[derive(Debug, Default, Deserialize)]
pub struct EventRecord {
    pub run: i32,
    pub event: i32,
    #[serde(default)]
    pub tracker_hits: BTreeMap<String, Vec<TrackerHitPlane>>,
    #[serde(default)]
    pub sim_tracker_hits: BTreeMap<String, Vec<SimTrackerHit>>,
    #[serde(default)]
    pub relations: BTreeMap<String, Vec<LcRelation>>,
}

impl EventRecord {
    pub fn into_event(self) -> Result<Event, EventError> {
        let mut event = Event::new(self.run, self.event);
        for (name, hits) in self.tracker_hits {
            event.add_collection(&name, Collection::from(hits))?;
        }
        for (name, sim_hits) in self.sim_tracker_hits {
            event.add_collection(&name, Collection::from(sim_hits))?;
        }
        for (name, relations) in self.relations {
            event.add_collection(&name, Collection::from(relations))?;
        }
        Ok(event)
    }
}

/// Serialises every collection of `event` into the event file layout.
pub fn event_to_json(event: &Event) -> Result<Value, serde_json::Error> {
    let mut tracker_hits = Map::new();
    let mut sim_tracker_hits = Map::new();
    let mut relations = Map::new();

    for name in event.collection_names() {
        if let Ok(collection) = event.get::<TrackerHitPlane>(name) {
            tracker_hits.insert(name.to_string(), serde_json::to_value(collection.elements())?);
        } else if let Ok(collection) = event.get::<SimTrackerHit>(name) {
            sim_tracker_hits.insert(name.to_string(), serde_json::to_value(collection.elements())?);
        } else if let Ok(collection) = event.get::<LcRelation>(name) {
            relations.insert(name.to_string(), serde_json::to_value(collection.elements())?);
        }
    }

    let mut record = Map::new();
    record.insert("run".to_string(), Value::from(event.run_number));
    record.insert("event".to_string(), Value::from(event.event_number));
    record.insert("tracker_hits".to_string(), Value::Object(tracker_hits));
    record.insert("sim_tracker_hits".to_string(), Value::Object(sim_tracker_hits));
    record.insert("relations".to_string(), Value::Object(relations));
    Ok(Value::Object(record))
}

pub fn load_steering(path: &Path) -> Result<SteeringFile, IoError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

pub fn load_events(path: &Path) -> Result<Vec<EventRecord>, IoError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

pub fn save_events(path: &Path, events: &[Value]) -> Result<(), IoError> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, events)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::LcCollection;

    const EVENT: &str = r#"{
        "run": 3,
        "event": 17,
        "tracker_hits": {
            "VBTrackerHits": [
                {"cell_id0": 1, "cell_id1": 0, "hit_type": 0, "position": [0.0, 0.0, 300.0],
                 "cov_matrix": [0, 0, 0, 0, 0, 0], "dedx": 0, "edep": 0.0001, "edep_error": 0,
                 "time": 5.0, "quality": 0, "u": [0, 0], "v": [0, 0], "du": 0.005, "dv": 0.005}
            ]
        },
        "sim_tracker_hits": {
            "VertexBarrelCollection": [
                {"cell_id0": 1, "cell_id1": 0, "position": [0.0, 0.0, 300.0], "momentum": [0, 0, 1],
                 "path_length": 0.05, "edep": 0.0001, "time": 4.9, "quality": 0, "mc_particle": 8}
            ]
        },
        "relations": {
            "VBTrackerHitsRelations": [{"from": 0, "to": 0, "weight": 1.0}]
        }
    }"#;

    #[test]
    fn test_event_record_into_event() {
        let record: EventRecord = serde_json::from_str(EVENT).unwrap();
        let event = record.into_event().unwrap();

        assert_eq!((event.run_number, event.event_number), (3, 17));
        assert_eq!(event.get::<TrackerHitPlane>("VBTrackerHits").unwrap().len(), 1);
        let sim = event.get::<SimTrackerHit>("VertexBarrelCollection").unwrap();
        assert_eq!(sim.get(0).unwrap().mc_particle, Some(crate::edm::McParticleId(8)));
        assert!(event.get::<LcRelation>("VBTrackerHitsRelations").is_ok());
    }

    #[test]
    fn test_event_to_json_groups_collections_by_kind() {
        let record: EventRecord = serde_json::from_str(EVENT).unwrap();
        let event = record.into_event().unwrap();
        let json = event_to_json(&event).unwrap();

        assert_eq!(json["event"], 17);
        assert_eq!(json["tracker_hits"]["VBTrackerHits"][0]["time"], 5.0);
        assert_eq!(json["relations"]["VBTrackerHitsRelations"][0]["weight"], 1.0);

        let reparsed: EventRecord = serde_json::from_value(json).unwrap();
        assert_eq!(reparsed.sim_tracker_hits["VertexBarrelCollection"].len(), 1);
    }
}
