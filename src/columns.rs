//! Column label normalization.
//!
//! Labels are lowercased and each space becomes an underscore, so
//! `"Discount Percent"` turns into `"discount_percent"`. Nothing else is
//! touched; applying the rewrite twice gives the same labels.

use log::{debug, info};

use crate::records::RecordTable;

pub fn normalize_column_name(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

pub fn normalize_columns(table: RecordTable) -> RecordTable {
    let table = table.rename_columns(|name| {
        let normalized = normalize_column_name(name);
        if normalized != name {
            debug!("Renaming column '{name}' -> '{normalized}'");
        }
        normalized
    });
    info!("Normalized {} column label(s)", table.column_count());
    table
}
