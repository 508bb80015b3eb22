use orders_etl::{
    columns::normalize_column_name,
    derive::Metrics,
    io_utils,
    load::{LoadOptions, load_reader},
    pipeline::transform,
};
use proptest::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};

fn price() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000, 0u32..=4).prop_map(|(mantissa, scale)| Decimal::new(mantissa, scale))
}

proptest! {
    #[test]
    fn normalizing_a_label_twice_changes_nothing(label in "[A-Za-z0-9 _-]{0,24}") {
        let once = normalize_column_name(&label);
        prop_assert_eq!(normalize_column_name(&once), once.clone());
        prop_assert!(!once.contains(' '));
        prop_assert_eq!(once.to_lowercase(), once);
    }

    #[test]
    fn sale_price_and_profit_follow_the_formulas(
        list_price in price(),
        cost_price in price(),
        discount_percent in (0i64..=10_000).prop_map(|p| Decimal::new(p, 2)),
    ) {
        let metrics = Metrics::compute(1, list_price, cost_price, discount_percent).unwrap();
        let discount = list_price * discount_percent / Decimal::ONE_HUNDRED;
        prop_assert_eq!(metrics.discount, discount);
        prop_assert_eq!(metrics.sale_price, list_price - discount);
        prop_assert_eq!(
            metrics.profit,
            (metrics.sale_price - cost_price)
                .round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
        );
        prop_assert!(metrics.profit.scale() <= 2);
    }

    #[test]
    fn sentinels_never_survive_and_rows_are_preserved(
        cells in proptest::collection::vec(
            prop_oneof![
                Just("Not Available".to_string()),
                Just("unknown".to_string()),
                "[a-z]{1,6}",
            ],
            0..40,
        )
    ) {
        let mut input = String::from("Order Date,Note,List Price,cost price,Discount Percent\n");
        for cell in &cells {
            input.push_str(&format!("2022-01-01,{cell},100,60,10\n"));
        }
        let options = LoadOptions::default();
        let mut reader = io_utils::open_csv_reader(input.as_bytes(), options.delimiter);
        let loaded = load_reader(&mut reader, &options).unwrap();
        prop_assert_eq!(loaded.table.row_count(), cells.len());

        let table = transform(loaded.table).unwrap();
        prop_assert_eq!(table.row_count(), cells.len());
        let note = table.position("note").unwrap();
        for row in table.rows() {
            if let Some(value) = &row[note] {
                let text = value.as_display();
                prop_assert!(text != "Not Available" && text != "unknown");
            }
        }
    }
}
