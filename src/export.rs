//! Spreadsheet export of a run's records.
//!
//! Written once, after traversal and before the terminal result line, and
//! announced through an `ExportSaved` event. Plain RFC 4180 CSV: every
//! spreadsheet tool the downstream users have opens it directly.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::record::CanonicalRecord;

pub const EXPORT_FILENAME: &str = "anuncios_carros.csv";

const HEADER: &[&str] = &[
    "title",
    "price",
    "mileage",
    "location",
    "year",
    "engine_displacement",
    "horsepower",
    "door_count",
    "steering_type",
    "transmission",
    "fuel_type",
    "color",
    "source_name",
    "detail_url",
    "image_url",
    "description",
    "forbidden_word_matches",
];

/// Quote a field when it contains a separator, a quote or a line break;
/// embedded quotes are doubled.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn row(record: &CanonicalRecord) -> String {
    let matches = record
        .forbidden_word_matches
        .iter()
        .cloned()
        .collect::<Vec<_>>()
        .join("; ");
    let fields = [
        &record.title,
        &record.price,
        &record.mileage,
        &record.location,
        &record.year,
        &record.engine_displacement,
        &record.horsepower,
        &record.door_count,
        &record.steering_type,
        &record.transmission,
        &record.fuel_type,
        &record.color,
        &record.source_name,
        &record.detail_url,
        &record.image_url,
        &record.description,
        &matches,
    ];
    fields
        .iter()
        .map(|f| csv_field(f))
        .collect::<Vec<_>>()
        .join(",")
}

/// Write all records to `path`.
pub fn write_csv(records: &[CanonicalRecord], path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("creating export file {}", path.display()))?;
    let mut out = BufWriter::new(file);

    writeln!(out, "{}", HEADER.join(","))?;
    for record in records {
        writeln!(out, "{}", row(record))?;
    }
    out.flush()?;
    Ok(())
}
