//! Pricing metrics derived from the list price, cost price, and discount.
//!
//! ```text
//! discount   = list_price * discount_percent / 100
//! sale_price = list_price - discount
//! profit     = round(sale_price - cost_price, 2)
//! ```
//!
//! Arithmetic is exact decimal. `profit` uses banker's rounding
//! (half-to-even). A null in any input yields nulls in all three outputs
//! for that row. A result outside the decimal range is a type error for
//! that row.

use log::info;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::{
    data::{ColumnType, Value},
    error::{EtlError, Result},
    records::{ColumnMeta, RecordTable, Row},
};

pub const LIST_PRICE: &str = "list_price";
pub const COST_PRICE: &str = "cost_price";
pub const DISCOUNT_PERCENT: &str = "discount_percent";
pub const DISCOUNT: &str = "discount";
pub const SALE_PRICE: &str = "sale_price";
pub const PROFIT: &str = "profit";

pub const PROFIT_SCALE: u32 = 2;
pub const PROFIT_ROUNDING: RoundingStrategy = RoundingStrategy::MidpointNearestEven;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metrics {
    pub discount: Decimal,
    pub sale_price: Decimal,
    pub profit: Decimal,
}

impl Metrics {
    /// `row` is 1-based and only used to report an overflow.
    pub fn compute(
        row: usize,
        list_price: Decimal,
        cost_price: Decimal,
        discount_percent: Decimal,
    ) -> Result<Self> {
        let overflow = |metric: &'static str| EtlError::Overflow { metric, row };
        let discount = list_price
            .checked_mul(discount_percent)
            .and_then(|d| d.checked_div(Decimal::ONE_HUNDRED))
            .ok_or_else(|| overflow(DISCOUNT))?;
        let sale_price = list_price
            .checked_sub(discount)
            .ok_or_else(|| overflow(SALE_PRICE))?;
        let profit = sale_price
            .checked_sub(cost_price)
            .ok_or_else(|| overflow(PROFIT))?
            .round_dp_with_strategy(PROFIT_SCALE, PROFIT_ROUNDING);
        Ok(Self {
            discount,
            sale_price,
            profit,
        })
    }
}

struct Inputs {
    list_price: usize,
    cost_price: usize,
    discount_percent: usize,
}

impl Inputs {
    fn resolve(table: &RecordTable) -> Result<Self> {
        Ok(Self {
            list_price: table.require(LIST_PRICE)?,
            cost_price: table.require(COST_PRICE)?,
            discount_percent: table.require(DISCOUNT_PERCENT)?,
        })
    }

    fn metrics(&self, row_idx: usize, row: &Row) -> Result<Option<Metrics>> {
        let list_price = numeric_cell(row, self.list_price, LIST_PRICE, row_idx)?;
        let cost_price = numeric_cell(row, self.cost_price, COST_PRICE, row_idx)?;
        let discount_percent =
            numeric_cell(row, self.discount_percent, DISCOUNT_PERCENT, row_idx)?;
        match (list_price, cost_price, discount_percent) {
            (Some(list), Some(cost), Some(percent)) => {
                Metrics::compute(row_idx + 1, list, cost, percent).map(Some)
            }
            _ => Ok(None),
        }
    }
}

fn numeric_cell(row: &Row, idx: usize, column: &str, row_idx: usize) -> Result<Option<Decimal>> {
    match &row[idx] {
        None => Ok(None),
        Some(value) => value
            .as_decimal()
            .map(Some)
            .ok_or_else(|| EtlError::NotNumeric {
                column: column.to_string(),
                row: row_idx + 1,
                value: value.as_display(),
            }),
    }
}

/// Appends `discount`, `sale_price`, and `profit`.
pub fn derive_metrics(table: RecordTable) -> Result<RecordTable> {
    let inputs = Inputs::resolve(&table)?;
    let metrics = table
        .rows()
        .iter()
        .enumerate()
        .map(|(idx, row)| inputs.metrics(idx, row))
        .collect::<Result<Vec<_>>>()?;
    let nulls = metrics.iter().filter(|m| m.is_none()).count();

    let table = append_metric(table, DISCOUNT, &metrics, |m| m.discount)?;
    let table = append_metric(table, SALE_PRICE, &metrics, |m| m.sale_price)?;
    let table = append_metric(table, PROFIT, &metrics, |m| m.profit)?;
    info!(
        "Derived {DISCOUNT}, {SALE_PRICE}, {PROFIT} for {} row(s) ({nulls} with null inputs)",
        table.row_count()
    );
    Ok(table)
}

fn append_metric<F>(
    table: RecordTable,
    name: &str,
    metrics: &[Option<Metrics>],
    pick: F,
) -> Result<RecordTable>
where
    F: Fn(&Metrics) -> Decimal,
{
    table.with_column(ColumnMeta::new(name, ColumnType::Decimal), |idx, _| {
        Ok(metrics[idx].as_ref().map(|m| Value::Decimal(pick(m))))
    })
}
