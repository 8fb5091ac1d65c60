//! CSV export of a junction's activity log.

use junction_types::ActivityEntry;

/// Header of the exported activity log.
pub const ACTIVITY_CSV_HEADER: [&str; 6] = ["sequence", "at", "kind", "lane", "vehicle", "message"];

/// Errors raised while rendering an export.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// A record could not be written.
    #[error("failed to write CSV record: {0}")]
    Csv(#[from] csv::Error),

    /// The in-memory buffer could not be recovered from the writer.
    #[error("failed to finish CSV export: {0}")]
    Buffer(String),
}

/// Render `entries` as CSV, oldest first.
pub fn activity_csv(entries: &[ActivityEntry]) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(ACTIVITY_CSV_HEADER)?;
    for entry in entries {
        writer.write_record([
            entry.sequence.to_string(),
            entry.at.to_rfc3339(),
            entry.kind.as_str().to_owned(),
            entry.lane.as_ref().map(ToString::to_string).unwrap_or_default(),
            entry.vehicle.as_ref().map(ToString::to_string).unwrap_or_default(),
            entry.message.clone(),
        ])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| ExportError::Buffer(err.to_string()))?;
    String::from_utf8(bytes).map_err(|err| ExportError::Buffer(err.to_string()))
}
