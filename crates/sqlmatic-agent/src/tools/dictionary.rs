//! Data dictionary lookup over an external CSV reference table.
//!
//! The table is re-read on every call so edits to the reference file are
//! visible immediately; no caching is assumed.

use serde::Serialize;
use tracing::debug;

use crate::config::DictionarySettings;
use crate::error::DictionaryError;
use crate::observability::AgentEvent;

/// One dictionary entry matched for a field name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DictionaryEntry {
    pub field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

/// Human-authored field documentation keyed by column name.
#[derive(Clone)]
pub struct DataDictionary {
    settings: DictionarySettings,
}

impl DataDictionary {
    pub fn new(settings: DictionarySettings) -> Self {
        Self { settings }
    }

    /// Case-insensitive substring match of `field_name` against the
    /// configured field column. An empty match is an `Ok` empty sequence,
    /// not an error. Results are capped at `max_results`.
    pub fn lookup(&self, field_name: &str) -> Result<Vec<DictionaryEntry>, DictionaryError> {
        let path = &self.settings.file_path;
        let read_error = |source: csv::Error| DictionaryError::Read {
            path: path.clone(),
            source,
        };
        let mut reader = csv::Reader::from_path(path).map_err(read_error)?;
        let headers = reader.headers().map_err(read_error)?.clone();

        let field_idx = column_index(&headers, &self.settings.field_column).ok_or_else(|| {
            DictionaryError::MissingColumn {
                path: path.clone(),
                column: self.settings.field_column.clone(),
            }
        })?;
        let description_idx =
            column_index(&headers, &self.settings.description_column).ok_or_else(|| {
                DictionaryError::MissingColumn {
                    path: path.clone(),
                    column: self.settings.description_column.clone(),
                }
            })?;
        let metadata_idx = match self.settings.metadata_column.as_deref() {
            Some(column) => Some(column_index(&headers, column).ok_or_else(|| {
                DictionaryError::MissingColumn {
                    path: path.clone(),
                    column: column.to_string(),
                }
            })?),
            None => None,
        };

        let needle = field_name.to_lowercase();
        let mut entries = Vec::new();
        for record in reader.records() {
            let record = record.map_err(read_error)?;
            let field = record.get(field_idx).unwrap_or_default();
            if !field.to_lowercase().contains(&needle) {
                continue;
            }
            entries.push(DictionaryEntry {
                field: field.to_string(),
                description: record
                    .get(description_idx)
                    .filter(|text| !text.is_empty())
                    .map(ToString::to_string),
                metadata: metadata_idx
                    .and_then(|idx| record.get(idx))
                    .filter(|text| !text.is_empty())
                    .map(ToString::to_string),
            });
            if entries.len() >= self.settings.max_results {
                break;
            }
        }
        debug!(
            event = AgentEvent::DictionaryQueried.as_str(),
            field_name,
            matches = entries.len(),
            "data dictionary queried"
        );
        Ok(entries)
    }
}

fn column_index(headers: &csv::StringRecord, column: &str) -> Option<usize> {
    headers.iter().position(|header| header == column)
}
