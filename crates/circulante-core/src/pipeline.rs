//! Request-scoped orchestration: size the upstream queries, fetch, normalize,
//! optionally merge, and hand back rows or chart series.

use tracing::info;

use crate::charts::{ChartData, ChartKind, DenominationPanel};
use crate::denomination::Denomination;
use crate::error::{CirculanteError, Result};
use crate::frames::{
    self, cash_frame, merge_settlement, normalize_cash, normalize_settlement, rows_from_frame,
    settlement_frame, AggregatedRow, COL_TOTAL_CASH, COL_TOTAL_SETTLEMENT,
};
use crate::rolling::rolling_points;
use crate::upstream::DataSource;
use crate::window::{DateWindow, SortOrder};

/// Records to request from the cash series: one per denomination per day.
pub fn cash_request_size(window: &DateWindow, denomination_count: usize) -> usize {
    denomination_count * window.days()
}

/// Records to request from the settlement series: one per day.
pub fn settlement_request_size(window: &DateWindow) -> usize {
    window.days()
}

#[derive(Debug, Clone)]
pub struct TotalsRequest {
    pub window: DateWindow,
    pub include_settlement: bool,
    pub denominations: Vec<Denomination>,
}

#[derive(Debug, Clone)]
pub struct ChartRequest {
    pub kind: ChartKind,
    pub window: DateWindow,
    pub rolling: usize,
    pub denominations: Vec<Denomination>,
}

/// Daily totals for the window in the requested order. With
/// `include_settlement` the Pix series is joined in and zero-filled.
pub async fn aggregate_totals(
    source: &dyn DataSource,
    request: &TotalsRequest,
    denomination_count: usize,
) -> Result<Vec<AggregatedRow>> {
    let window = &request.window;
    info!(
        start = %window.start(),
        end = %window.end(),
        sort = %window.order(),
        pix = request.include_settlement,
        "aggregating totals"
    );

    let cash_records = source
        .fetch_cash(cash_request_size(window, denomination_count))
        .await?;
    let cash = normalize_cash(cash_frame(&cash_records, &request.denominations)?, window);

    let table = if request.include_settlement {
        let settlement_records = source
            .fetch_settlement(settlement_request_size(window))
            .await?;
        let settlement = normalize_settlement(settlement_frame(&settlement_records)?, window);
        merge_settlement(cash, settlement, window.order())
    } else {
        cash
    };

    let collected = table.collect()?;
    frames::log_missing_values("totals", &collected);
    rows_from_frame(&collected)
}

/// Fetches and shapes the series a chart of `request.kind` needs. Rolling
/// means are applied per series over ascending dates.
pub async fn prepare_chart(
    source: &dyn DataSource,
    request: &ChartRequest,
    denomination_count: usize,
) -> Result<ChartData> {
    if request.rolling == 0 {
        return Err(CirculanteError::InvalidRollingWindow(request.rolling));
    }

    let window = request.window.with_order(SortOrder::Ascending);
    info!(
        kind = %request.kind,
        start = %window.start(),
        end = %window.end(),
        rolling = request.rolling,
        "preparing chart data"
    );

    let cash_records = source
        .fetch_cash(cash_request_size(&window, denomination_count))
        .await?;

    match request.kind {
        ChartKind::Temporal => {
            let cash = normalize_cash(cash_frame(&cash_records, &[])?, &window).collect()?;
            let settlement_records = source
                .fetch_settlement(settlement_request_size(&window))
                .await?;
            let settlement =
                normalize_settlement(settlement_frame(&settlement_records)?, &window).collect()?;

            Ok(ChartData::Temporal {
                window,
                rolling: request.rolling,
                cash: rolling_points(
                    &frames::dated_values(&cash, COL_TOTAL_CASH)?,
                    request.rolling,
                )?,
                settlement: rolling_points(
                    &frames::dated_values(&settlement, COL_TOTAL_SETTLEMENT)?,
                    request.rolling,
                )?,
            })
        }
        ChartKind::Barplot => {
            let frame = cash_frame(&cash_records, &[])?;
            Ok(ChartData::Barplot {
                window,
                bars: frames::mean_quantity_by_denomination(&frame, &window)?,
            })
        }
        ChartKind::Series => {
            let frame = cash_frame(&cash_records, &request.denominations)?;
            let mut panels = Vec::with_capacity(request.denominations.len());
            for denomination in &request.denominations {
                let quantities = frames::denomination_quantities(&frame, denomination, &window)?;
                panels.push(DenominationPanel {
                    denomination: denomination.clone(),
                    points: rolling_points(&quantities, request.rolling)?,
                });
            }
            Ok(ChartData::Series {
                window,
                rolling: request.rolling,
                panels,
            })
        }
    }
}
