// Copyright 2026 MelhorCarro Contributors
// SPDX-License-Identifier: Apache-2.0

//! Run event bus — typed events from the scraping pipeline.
//!
//! The bus is a `tokio::sync::broadcast` channel carrying [`RunEvent`]
//! values. Any consumer — the stdout line printer, a UI bridge, tests —
//! subscribes independently. When no subscribers exist, events are silently
//! dropped.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::record::CanonicalRecord;

/// Every event a run emits, in emission order: zero or more `Record`s, at
/// most one `ExportSaved`, then exactly one `Finished`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RunEvent {
    /// One listing finished normalization (and detail capture, if enabled).
    Record { record: CanonicalRecord },
    /// The run's records were persisted to a spreadsheet file.
    ExportSaved { filename: String },
    /// The run is over. Carries every record collected, in discovery order;
    /// empty when the run produced nothing or failed early.
    Finished { records: Vec<CanonicalRecord> },
}

/// Broadcast bus connecting the aggregator to its consumers.
pub struct EventBus {
    sender: broadcast::Sender<RunEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event to all subscribers. Silently ignores if no subscribers.
    pub fn emit(&self, event: RunEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.sender.subscribe()
    }
}
