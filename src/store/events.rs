//! Ordered, persisted list of marked replay events

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use super::{persist, read_json, FORMAT_VERSION};
use crate::error::{ReplayError, Result};
use crate::replay::ReplayEvent;

#[derive(Serialize)]
struct EventsDocumentRef<'a> {
    version: u32,
    events: &'a [ReplayEvent],
}

#[derive(Deserialize)]
struct EventsDocument {
    #[allow(dead_code)]
    version: u32,
    events: Vec<ReplayEvent>,
}

/// Versioned document, or the bare array written by older installs
#[derive(Deserialize)]
#[serde(untagged)]
enum EventsFile {
    Versioned(EventsDocument),
    Legacy(Vec<ReplayEvent>),
}

impl EventsFile {
    fn into_events(self) -> Vec<ReplayEvent> {
        match self {
            EventsFile::Versioned(doc) => doc.events,
            EventsFile::Legacy(events) => events,
        }
    }
}

/// Insertion-ordered event list backed by a JSON file.
///
/// Position in the list is the only link between a local index and an
/// event, so `local_index` is kept dense (0..len) at all times.
pub struct EventStore {
    path: PathBuf,
    events: Vec<ReplayEvent>,
}

impl EventStore {
    /// Open the store at `path` and load its contents
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let mut store = Self {
            path: path.into(),
            events: Vec::new(),
        };
        store.load();
        store
    }

    /// Re-read the persisted list.
    ///
    /// A missing file is initialized with an empty list; an unreadable one
    /// falls back to an empty in-memory list rather than blocking startup.
    pub fn load(&mut self) -> &[ReplayEvent] {
        match read_json::<EventsFile>(&self.path) {
            Ok(Some(file)) => {
                self.events = file.into_events();
                renumber(&mut self.events);
                info!("Loaded {} replay events from {:?}", self.events.len(), self.path);
            }
            Ok(None) => {
                self.events = Vec::new();
                self.persist();
            }
            Err(e) => {
                error!("Failed to load replay events, starting empty: {:#}", e);
                self.events = Vec::new();
            }
        }
        &self.events
    }

    /// Replace the whole list and persist it. Returns false on I/O failure.
    pub fn save(&mut self, events: Vec<ReplayEvent>) -> bool {
        self.events = events;
        renumber(&mut self.events);
        self.persist()
    }

    /// Add an event at the end and return its local index
    pub fn append(&mut self, mut event: ReplayEvent) -> usize {
        let index = self.events.len();
        if event.local_index != index {
            warn!(
                "Event {:?} created with index {} but stored at {}",
                event.name, event.local_index, index
            );
            event.local_index = index;
        }
        self.events.push(event);
        self.persist();
        index
    }

    /// Remove the event at `index`, renumber the survivors and persist
    pub fn delete_at(&mut self, index: usize) -> Result<(ReplayEvent, Vec<ReplayEvent>)> {
        if index >= self.events.len() {
            return Err(ReplayError::IndexOutOfRange {
                index,
                len: self.events.len(),
            });
        }

        let removed = self.events.remove(index);
        renumber(&mut self.events);
        self.persist();
        Ok((removed, self.events.clone()))
    }

    pub fn events(&self) -> &[ReplayEvent] {
        &self.events
    }

    pub fn get(&self, index: usize) -> Option<&ReplayEvent> {
        self.events.get(index)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> bool {
        let doc = EventsDocumentRef {
            version: FORMAT_VERSION,
            events: &self.events,
        };
        persist(&self.path, &doc)
    }
}

fn renumber(events: &mut [ReplayEvent]) {
    for (i, event) in events.iter_mut().enumerate() {
        event.local_index = i;
    }
}
