//! Named, typed record collections and the per-event container that holds them.
//!
//! Collections are stored type-erased as `Box<dyn LcCollection>` and recovered with a checked
//! downcast, so an event can carry hits, deposits and relations side by side.

use crate::edm::Record;
use downcast_rs::{impl_downcast, Downcast};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised when looking up or inserting collections.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventError {
    #[error("collection `{0}` not found in event")]
    NotFound(String),
    #[error("collection `{name}` holds {found}, expected {expected}")]
    WrongType {
        name: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("collection `{0}` already exists in event")]
    DuplicateName(String),
}

/// Type-erased view of a collection.
pub trait LcCollection: Downcast + std::fmt::Debug {
    /// Name of the record kind held by this collection.
    fn type_name(&self) -> &'static str;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Collection flag word.
    fn flags(&self) -> u32;
}
impl_downcast!(LcCollection);

/// An ordered collection of records of one kind.
#[derive(Debug, PartialEq)]
pub struct Collection<T: Record> {
    elements: Vec<T>,
    flags: u32,
}

impl<T: Record> Default for Collection<T> {
    fn default() -> Self {
        Self {
            elements: Vec::new(),
            flags: 0,
        }
    }
}

impl<T: Record> Collection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_flags(flags: u32) -> Self {
        Self {
            elements: Vec::new(),
            flags,
        }
    }

    /// Appends a record and returns its index.
    pub fn push(&mut self, element: T) -> usize {
        self.elements.push(element);
        self.elements.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.elements.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.elements.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.elements.iter()
    }

    pub fn elements(&self) -> &[T] {
        &self.elements
    }
}

impl<T: Record> From<Vec<T>> for Collection<T> {
    fn from(elements: Vec<T>) -> Self {
        Self { elements, flags: 0 }
    }
}

impl<T: Record> LcCollection for Collection<T> {
    fn type_name(&self) -> &'static str {
        T::TYPE_NAME
    }

    fn len(&self) -> usize {
        self.elements.len()
    }

    fn flags(&self) -> u32 {
        self.flags
    }
}

/// Run-level information handed to processors when a new run starts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunHeader {
    pub run_number: i32,
    pub detector_name: String,
}

/// A single event: run/event numbers and the named collections it carries.
#[derive(Debug, Default)]
pub struct Event {
    pub run_number: i32,
    pub event_number: i32,
    collections: BTreeMap<String, Box<dyn LcCollection>>,
}

impl Event {
    pub fn new(run_number: i32, event_number: i32) -> Self {
        Self {
            run_number,
            event_number,
            collections: BTreeMap::new(),
        }
    }

    /// Looks up a collection by name and checks its record kind.
    pub fn get<T: Record>(&self, name: &str) -> Result<&Collection<T>, EventError> {
        let collection = self
            .get_any(name)
            .ok_or_else(|| EventError::NotFound(name.to_string()))?;
        collection
            .downcast_ref::<Collection<T>>()
            .ok_or_else(|| EventError::WrongType {
                name: name.to_string(),
                expected: T::TYPE_NAME,
                found: collection.type_name(),
            })
    }

    pub fn get_mut<T: Record>(&mut self, name: &str) -> Result<&mut Collection<T>, EventError> {
        let collection = self
            .collections
            .get_mut(name)
            .ok_or_else(|| EventError::NotFound(name.to_string()))?;
        let found = collection.type_name();
        collection
            .downcast_mut::<Collection<T>>()
            .ok_or_else(|| EventError::WrongType {
                name: name.to_string(),
                expected: T::TYPE_NAME,
                found,
            })
    }

    /// Type-erased lookup, for hosts that handle collections generically.
    pub fn get_any(&self, name: &str) -> Option<&(dyn LcCollection + 'static)> {
        self.collections.get(name).map(|c| c.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.collections.contains_key(name)
    }

    /// Inserts a new collection. Existing collections are never replaced.
    pub fn add_collection<T: Record>(
        &mut self,
        name: &str,
        collection: Collection<T>,
    ) -> Result<(), EventError> {
        if self.collections.contains_key(name) {
            return Err(EventError::DuplicateName(name.to_string()));
        }
        self.collections
            .insert(name.to_string(), Box::new(collection));
        Ok(())
    }

    /// Names of all collections in the event, in sorted order.
    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edm::{LcRelation, TrackerHitPlane};

    #[test]
    fn test_typed_lookup() {
        let mut event = Event::new(1, 2);
        let hits: Collection<TrackerHitPlane> = vec![TrackerHitPlane::default()].into();
        event.add_collection("VXDHits", hits).unwrap();

        assert_eq!(event.get::<TrackerHitPlane>("VXDHits").unwrap().len(), 1);
        assert_eq!(
            event.get::<LcRelation>("VXDHits").unwrap_err(),
            EventError::WrongType {
                name: "VXDHits".to_string(),
                expected: "LCRelation",
                found: "TrackerHitPlane",
            }
        );
        assert_eq!(
            event.get::<TrackerHitPlane>("Missing").unwrap_err(),
            EventError::NotFound("Missing".to_string())
        );
    }

    #[test]
    fn test_duplicate_name_is_rejected() {
        let mut event = Event::new(0, 0);
        event
            .add_collection("Rel", Collection::<LcRelation>::new())
            .unwrap();
        let err = event
            .add_collection("Rel", Collection::<LcRelation>::new())
            .unwrap_err();
        assert_eq!(err, EventError::DuplicateName("Rel".to_string()));
    }
}
