//! Versioned envelopes for persisting entity snapshots.

use serde::{Deserialize, Serialize};

use crate::agents::Agent;
use crate::network::NetworkPair;
use crate::tasks::Task;
use crate::Id;

/// Current envelope layout version.
pub const SCHEMA_VERSION: u32 = 1;

/// A keyed, versioned snapshot ready for any serde format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<T> {
    pub schema_version: u32,
    pub id: Id,
    pub data: T,
}

impl<T> Record<T> {
    pub fn new(id: impl Into<Id>, data: T) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            id: id.into(),
            data,
        }
    }

    /// True if this record was written with the current layout.
    pub fn is_current(&self) -> bool {
        self.schema_version == SCHEMA_VERSION
    }
}

/// Entities that carry their own identifier.
pub trait Keyed: Clone {
    fn key(&self) -> &str;

    fn to_record(&self) -> Record<Self> {
        Record::new(self.key(), self.clone())
    }
}

impl Keyed for Agent {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for Task {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for NetworkPair {
    fn key(&self) -> &str {
        self.id()
    }
}
