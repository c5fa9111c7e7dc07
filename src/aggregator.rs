//! Run orchestration: portals in fixed order, one shared page source.
//!
//! Error containment is per portal: an adapter failure is logged and the
//! run moves to the next portal. Whatever happens — failures, zero results,
//! cancellation — the run ends with a `Finished` event carrying every
//! record collected so far.

use std::path::Path;

use tracing::{error, info, warn};

use crate::acquisition;
use crate::cancel::CancelToken;
use crate::events::{EventBus, RunEvent};
use crate::export;
use crate::filters::FilterSpec;
use crate::portals::registry;
use crate::portals::traversal::run_portal;
use crate::record::CanonicalRecord;

/// Run all enabled portals sequentially and return the collected records.
pub async fn run(filters: &FilterSpec, bus: &EventBus, cancel: &CancelToken) -> Vec<CanonicalRecord> {
    let mut records: Vec<CanonicalRecord> = Vec::new();

    let mut source = match acquisition::source_for(filters).await {
        Ok(source) => source,
        Err(e) => {
            error!(error = %e, "could not set up a page source");
            bus.emit(RunEvent::Finished { records: vec![] });
            return vec![];
        }
    };
    info!(strategy = source.label(), "acquisition strategy selected");

    for portal in registry() {
        if cancel.is_cancelled() {
            info!("run cancelled, skipping remaining portals");
            break;
        }
        if !filters.portal_enabled(portal.name) {
            info!(portal = portal.name, "portal disabled by filters");
            continue;
        }

        let mut on_record = |record: CanonicalRecord| {
            bus.emit(RunEvent::Record {
                record: record.clone(),
            });
            records.push(record);
        };

        match run_portal(portal, filters, source.as_mut(), cancel, &mut on_record).await {
            Ok(count) => info!(portal = portal.name, records = count, "portal done"),
            Err(e) => error!(portal = portal.name, error = %e, "portal failed, continuing"),
        }
    }

    if let Err(e) = source.shutdown().await {
        warn!(error = %e, "page source shutdown failed");
    }

    if !records.is_empty() {
        match export::write_csv(&records, Path::new(export::EXPORT_FILENAME)) {
            Ok(()) => bus.emit(RunEvent::ExportSaved {
                filename: export::EXPORT_FILENAME.to_string(),
            }),
            Err(e) => warn!(error = %e, "spreadsheet export failed"),
        }
    }

    bus.emit(RunEvent::Finished {
        records: records.clone(),
    });
    records
}
