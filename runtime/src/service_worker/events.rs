//! Service Worker Events
//!
//! Events delivered by the host and what handling them produced.

use super::fetch::Request;
use super::partitions::PruneReport;
use super::strategy::Served;

/// Event type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Install,
    Activate,
    Fetch,
    Sync,
}

/// An event routed to the worker
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    Install,
    Activate,
    Fetch(Request),
    /// Background sync fired for a tag
    Sync(String),
}

impl WorkerEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            Self::Install => EventType::Install,
            Self::Activate => EventType::Activate,
            Self::Fetch(_) => EventType::Fetch,
            Self::Sync(_) => EventType::Sync,
        }
    }
}

/// Result of handling one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// Shell entries stored
    Installed(usize),
    Activated(PruneReport),
    Response(Served),
    /// Whether a handler ran for the tag
    Synced(bool),
}

impl EventOutcome {
    /// The response of a fetch outcome
    pub fn into_served(self) -> Option<Served> {
        match self {
            Self::Response(served) => Some(served),
            _ => None,
        }
    }
}
