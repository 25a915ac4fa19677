//! Columnar stages of the aggregation pipeline: raw records -> DataFrame ->
//! per-date series -> optional merge -> output rows.
//!
//! `Data` is a polars `Date` column throughout; window bounds are compared
//! against typed `NaiveDate` literals.

use chrono::NaiveDate;
use polars::df;
use polars::lazy::dsl::*;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::denomination::{normalize_label, Denomination};
use crate::error::Result;
use crate::upstream::{DailyCashRecord, DailySettlementRecord};
use crate::window::{parse_upstream_date, DateWindow, SortOrder};

pub const COL_DATE: &str = "Data";
pub const COL_DENOMINATION: &str = "Denominacao";
pub const COL_QUANTITY: &str = "Quantidade";
pub const COL_VALUE: &str = "Valor";
pub const COL_TOTAL: &str = "Total";
pub const COL_AVERAGE: &str = "Media";
pub const COL_TOTAL_CASH: &str = "Total Dinheiro";
pub const COL_TOTAL_SETTLEMENT: &str = "Total Pix";

/// Settlement money fields are published in thousands of reais.
pub const SETTLEMENT_SCALE: f64 = 1000.0;

/// One output row of the totals pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedRow {
    #[serde(rename = "Data")]
    pub date: NaiveDate,
    #[serde(rename = "Total Dinheiro")]
    pub total_cash: f64,
    #[serde(
        rename = "Total Pix",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub total_settlement: Option<f64>,
}

fn within(window: &DateWindow) -> Expr {
    col(COL_DATE)
        .gt_eq(lit(window.start()))
        .and(col(COL_DATE).lt_eq(lit(window.end())))
}

fn sort_by_date(order: SortOrder) -> SortMultipleOptions {
    SortMultipleOptions::default().with_order_descending(order.is_descending())
}

/// Builds the ungrouped cash frame (`Data`, `Denominacao`, `Quantidade`,
/// `Valor`). When `denominations` is non-empty only those denominations are kept.
pub fn cash_frame(records: &[DailyCashRecord], denominations: &[Denomination]) -> Result<DataFrame> {
    let mut dates: Vec<NaiveDate> = Vec::with_capacity(records.len());
    let mut labels: Vec<String> = Vec::with_capacity(records.len());
    let mut quantities: Vec<i64> = Vec::with_capacity(records.len());
    let mut values: Vec<f64> = Vec::with_capacity(records.len());

    for record in records {
        let label = normalize_label(&record.denomination);
        if !denominations.is_empty() && !denominations.iter().any(|d| d.matches(&record.denomination)) {
            continue;
        }
        dates.push(parse_upstream_date(&record.date)?);
        labels.push(label);
        quantities.push(record.quantity);
        values.push(record.value);
    }

    let frame = df![
        COL_DATE => dates,
        COL_DENOMINATION => labels,
        COL_QUANTITY => quantities,
        COL_VALUE => values,
    ]?;
    log_missing_values("cash", &frame);
    Ok(frame)
}

/// Builds the settlement frame (`Data`, `Total`, `Media`, `Quantidade`).
/// `Total` and `Media` are converted from thousands of reais to reais here.
pub fn settlement_frame(records: &[DailySettlementRecord]) -> Result<DataFrame> {
    let mut dates: Vec<NaiveDate> = Vec::with_capacity(records.len());
    let mut totals: Vec<f64> = Vec::with_capacity(records.len());
    let mut averages: Vec<f64> = Vec::with_capacity(records.len());
    let mut counts: Vec<i64> = Vec::with_capacity(records.len());

    for record in records {
        dates.push(parse_upstream_date(&record.date)?);
        totals.push(record.total * SETTLEMENT_SCALE);
        averages.push(record.average * SETTLEMENT_SCALE);
        counts.push(record.count);
    }

    let frame = df![
        COL_DATE => dates,
        COL_TOTAL => totals,
        COL_AVERAGE => averages,
        COL_QUANTITY => counts,
    ]?;
    log_missing_values("settlement", &frame);
    Ok(frame)
}

/// Daily cash totals inside the window: denominations summed per date, the
/// summed quantity dropped, `Valor` renamed `Total Dinheiro`.
pub fn normalize_cash(frame: DataFrame, window: &DateWindow) -> LazyFrame {
    frame
        .lazy()
        .group_by([col(COL_DATE)])
        .agg([col(COL_QUANTITY).sum(), col(COL_VALUE).sum()])
        .select([col(COL_DATE), col(COL_VALUE).alias(COL_TOTAL_CASH)])
        .filter(within(window))
        .sort([COL_DATE], sort_by_date(window.order()))
}

/// Daily settlement totals inside the window, sorted ascending regardless
/// of the requested order.
pub fn normalize_settlement(frame: DataFrame, window: &DateWindow) -> LazyFrame {
    frame
        .lazy()
        .select([col(COL_DATE), col(COL_TOTAL).alias(COL_TOTAL_SETTLEMENT)])
        // one row per date even if upstream repeats a day
        .group_by([col(COL_DATE)])
        .agg([col(COL_TOTAL_SETTLEMENT).sum()])
        .sort([COL_DATE], sort_by_date(SortOrder::Ascending))
        .filter(within(window))
}

/// Full outer join on date. Dates missing from one side get 0 in that side's
/// column; the fill happens after the join only.
pub fn merge_settlement(cash: LazyFrame, settlement: LazyFrame, order: SortOrder) -> LazyFrame {
    cash.join(
        settlement,
        [col(COL_DATE)],
        [col(COL_DATE)],
        JoinArgs::new(JoinType::Full).with_coalesce(JoinCoalesce::CoalesceColumns),
    )
    .with_columns([
        col(COL_TOTAL_CASH).fill_null(lit(0.0)),
        col(COL_TOTAL_SETTLEMENT).fill_null(lit(0.0)),
    ])
    .sort([COL_DATE], sort_by_date(order))
}

/// Reads the collected totals frame back into rows. `Total Pix` is only
/// populated when the frame carries that column.
pub fn rows_from_frame(frame: &DataFrame) -> Result<Vec<AggregatedRow>> {
    let dates = frame.column(COL_DATE)?.date()?;
    let cash = frame.column(COL_TOTAL_CASH)?.f64()?;
    let settlement = match frame.column(COL_TOTAL_SETTLEMENT) {
        Ok(column) => Some(column.f64()?),
        Err(_) => None,
    };

    let mut rows = Vec::with_capacity(frame.height());
    for (idx, date) in dates.as_date_iter().enumerate() {
        let Some(date) = date else {
            continue;
        };
        rows.push(AggregatedRow {
            date,
            total_cash: cash.get(idx).unwrap_or(0.0),
            total_settlement: settlement.map(|values| values.get(idx).unwrap_or(0.0)),
        });
    }
    Ok(rows)
}

/// Reads a `(Data, value)` frame into dated points, dropping rows without a
/// date or value.
pub fn dated_values(frame: &DataFrame, value_column: &str) -> Result<Vec<(NaiveDate, f64)>> {
    let dates = frame.column(COL_DATE)?.date()?;
    let values = frame.column(value_column)?.f64()?;

    Ok(dates
        .as_date_iter()
        .zip(values.iter())
        .filter_map(|(date, value)| Some((date?, value?)))
        .collect())
}

/// Quantity per date for one denomination inside the window, ascending.
pub fn denomination_quantities(
    frame: &DataFrame,
    denomination: &Denomination,
    window: &DateWindow,
) -> Result<Vec<(NaiveDate, f64)>> {
    let series = frame
        .clone()
        .lazy()
        .filter(
            col(COL_DENOMINATION)
                .eq(lit(denomination.label()))
                .and(within(window)),
        )
        .group_by([col(COL_DATE)])
        .agg([col(COL_QUANTITY).cast(DataType::Float64).sum()])
        .sort([COL_DATE], sort_by_date(SortOrder::Ascending))
        .collect()?;
    dated_values(&series, COL_QUANTITY)
}

/// Mean daily quantity per denomination inside the window, ordered by face value.
pub fn mean_quantity_by_denomination(
    frame: &DataFrame,
    window: &DateWindow,
) -> Result<Vec<(String, f64)>> {
    let grouped = frame
        .clone()
        .lazy()
        .filter(within(window))
        .group_by([col(COL_DENOMINATION)])
        .agg([col(COL_QUANTITY).cast(DataType::Float64).mean()])
        .collect()?;

    let labels = grouped.column(COL_DENOMINATION)?.str()?;
    let means = grouped.column(COL_QUANTITY)?.f64()?;

    let mut bars: Vec<(String, f64)> = Vec::with_capacity(grouped.height());
    for idx in 0..grouped.height() {
        if let (Some(label), Some(mean)) = (labels.get(idx), means.get(idx)) {
            bars.push((label.to_string(), mean));
        }
    }
    bars.sort_by(|(a, _), (b, _)| face_value(a).total_cmp(&face_value(b)).then_with(|| a.cmp(b)));
    Ok(bars)
}

fn face_value(label: &str) -> f64 {
    label.parse::<f64>().unwrap_or(f64::INFINITY)
}

/// Integrity check: debug-logs the frame size and warns about columns that
/// carry missing values.
pub fn log_missing_values(label: &str, frame: &DataFrame) {
    debug!(frame = label, rows = frame.height(), "frame built");
    for column in frame.get_columns() {
        let nulls = column.null_count();
        if nulls > 0 {
            warn!(
                frame = label,
                column = column.name().as_str(),
                nulls,
                "missing values in frame"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn cash(date: &str, denomination: &str, quantity: i64, value: f64) -> DailyCashRecord {
        DailyCashRecord {
            date: date.to_string(),
            denomination: denomination.to_string(),
            quantity,
            value,
            kind: None,
        }
    }

    #[test]
    fn date_column_is_temporal() {
        let frame = cash_frame(&[cash("2022-09-15", "2.00", 1, 2.0)], &[]).unwrap();
        assert_eq!(frame.column(COL_DATE).unwrap().dtype(), &DataType::Date);
    }

    #[test]
    fn settlement_money_is_converted_to_reais() {
        let records = vec![DailySettlementRecord {
            date: "2022-01-02".to_string(),
            total: 5.0,
            average: 0.25,
            count: 20,
        }];
        let frame = settlement_frame(&records).unwrap();
        assert_eq!(frame.column(COL_TOTAL).unwrap().f64().unwrap().get(0), Some(5000.0));
        assert_eq!(frame.column(COL_AVERAGE).unwrap().f64().unwrap().get(0), Some(250.0));
        assert_eq!(frame.column(COL_QUANTITY).unwrap().i64().unwrap().get(0), Some(20));
    }

    #[test]
    fn window_filter_keeps_only_inner_dates() {
        let records = vec![
            cash("2022-01-01", "2.00", 1, 1.0),
            cash("2022-01-02", "2.00", 1, 2.0),
            cash("2022-01-03", "2.00", 1, 3.0),
        ];
        let window = DateWindow::single_day(day(2022, 1, 2), SortOrder::Ascending);
        let totals = normalize_cash(cash_frame(&records, &[]).unwrap(), &window)
            .collect()
            .unwrap();
        assert_eq!(
            dated_values(&totals, COL_TOTAL_CASH).unwrap(),
            vec![(day(2022, 1, 2), 2.0)]
        );
    }

    #[test]
    fn cash_frame_applies_denomination_filter() {
        let records = vec![
            cash("2022-01-01", "2.00", 5, 10.0),
            cash("2022-01-01", "50.00", 1, 50.0),
            cash("2022-01-01", "0.05", 100, 5.0),
        ];
        let filter = vec![Denomination::from_face_value(2.0), Denomination::from_face_value(0.05)];
        let frame = cash_frame(&records, &filter).unwrap();
        assert_eq!(frame.height(), 2);

        let everything = cash_frame(&records, &[]).unwrap();
        assert_eq!(everything.height(), 3);
    }

    #[test]
    fn bad_upstream_date_fails_the_frame() {
        let records = vec![cash("not-a-date", "2.00", 1, 2.0)];
        assert!(cash_frame(&records, &[]).is_err());
    }

    #[test]
    fn barplot_means_are_ordered_by_face_value() {
        let records = vec![
            cash("2022-01-01", "100.00", 4, 400.0),
            cash("2022-01-02", "100.00", 6, 600.0),
            cash("2022-01-01", "2.00", 10, 20.0),
            cash("2022-01-02", "2.00", 20, 40.0),
        ];
        let frame = cash_frame(&records, &[]).unwrap();
        let window = DateWindow::new(day(2022, 1, 1), day(2022, 1, 2), SortOrder::Ascending).unwrap();
        let bars = mean_quantity_by_denomination(&frame, &window).unwrap();
        assert_eq!(
            bars,
            vec![("2.00".to_string(), 15.0), ("100.00".to_string(), 5.0)]
        );
    }
}
