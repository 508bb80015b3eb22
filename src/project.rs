use log::info;

use crate::{
    derive::{COST_PRICE, DISCOUNT_PERCENT, LIST_PRICE},
    error::Result,
    records::RecordTable,
};

/// Source columns folded into the derived metrics.
pub const FOLDED_COLUMNS: &[&str] = &[LIST_PRICE, COST_PRICE, DISCOUNT_PERCENT];

pub fn drop_folded_columns(table: RecordTable) -> Result<RecordTable> {
    let table = table.without_columns(FOLDED_COLUMNS)?;
    info!(
        "Dropped {} column(s); {} remain",
        FOLDED_COLUMNS.len(),
        table.column_count()
    );
    Ok(table)
}
