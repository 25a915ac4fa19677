use chrono::{Days, NaiveDate};
use circulante_core::upstream::{DailyCashRecord, DailySettlementRecord};
use circulante_core::{
    prepare_chart, render_chart, ChartData, ChartKind, ChartRequest, CirculanteError, DateWindow,
    Denomination, SortOrder, StaticSource,
};
use tempfile::tempdir;

const DENOMINATIONS: [&str; 3] = ["2.00", "50.00", "100.00"];

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 1, 1).unwrap()
}

fn source(days: u64) -> StaticSource {
    let mut cash = Vec::new();
    let mut settlement = Vec::new();
    for offset in 0..days {
        let date = (start() + Days::new(offset)).format("%Y-%m-%d").to_string();
        for (idx, denomination) in DENOMINATIONS.iter().enumerate() {
            let quantity = (offset as i64 + 1) * (idx as i64 + 1);
            cash.push(DailyCashRecord {
                date: date.clone(),
                denomination: denomination.to_string(),
                quantity,
                value: quantity as f64 * denomination.parse::<f64>().unwrap(),
                kind: None,
            });
        }
        settlement.push(DailySettlementRecord {
            date,
            total: 100.0 + offset as f64,
            average: 1.0,
            count: 100,
        });
    }
    StaticSource::new(cash, settlement)
}

fn request(kind: ChartKind, days: u64, rolling: usize) -> ChartRequest {
    let end = start() + Days::new(days - 1);
    ChartRequest {
        kind,
        window: DateWindow::new(start(), end, SortOrder::Descending).unwrap(),
        rolling,
        denominations: vec![
            Denomination::from_face_value(2.0),
            Denomination::from_face_value(100.0),
        ],
    }
}

#[tokio::test]
async fn temporal_series_are_rolled_in_ascending_order() {
    let source = source(10);
    let data = prepare_chart(&source, &request(ChartKind::Temporal, 10, 3), 3)
        .await
        .unwrap();

    let ChartData::Temporal {
        window,
        cash,
        settlement,
        ..
    } = &data
    else {
        panic!("expected temporal data, got {data:?}");
    };
    assert_eq!(window.order(), SortOrder::Ascending);
    assert_eq!(cash.len(), 10);
    assert_eq!(settlement.len(), 10);
    assert!(cash.windows(2).all(|pair| pair[0].date < pair[1].date));
    assert_eq!(cash[0].value, None);
    assert_eq!(cash[1].value, None);
    assert!(cash[2].value.is_some());
    // settlement totals 100, 101, 102 in thousands
    assert_eq!(settlement[2].value, Some(101_000.0));
}

#[tokio::test]
async fn barplot_covers_every_denomination() {
    let source = source(4);
    let data = prepare_chart(&source, &request(ChartKind::Barplot, 4, 30), 3)
        .await
        .unwrap();

    let ChartData::Barplot { bars, .. } = &data else {
        panic!("expected barplot data, got {data:?}");
    };
    let labels: Vec<&str> = bars.iter().map(|(label, _)| label.as_str()).collect();
    assert_eq!(labels, DENOMINATIONS.to_vec());
    // quantities 1..=4 for the first denomination
    assert_eq!(bars[0].1, 2.5);
}

#[tokio::test]
async fn series_has_one_panel_per_requested_denomination() {
    let source = source(5);
    let data = prepare_chart(&source, &request(ChartKind::Series, 5, 2), 3)
        .await
        .unwrap();

    let ChartData::Series { panels, .. } = &data else {
        panic!("expected series data, got {data:?}");
    };
    assert_eq!(panels.len(), 2);
    assert_eq!(panels[0].denomination.label(), "2.00");
    assert_eq!(panels[1].denomination.label(), "100.00");
    assert_eq!(panels[0].points.len(), 5);
    assert_eq!(panels[0].points[1].value, Some(1.5));
}

#[tokio::test]
async fn zero_rolling_window_is_rejected_before_fetching() {
    let source = source(3);
    let err = prepare_chart(&source, &request(ChartKind::Temporal, 3, 0), 3)
        .await
        .unwrap_err();
    assert!(matches!(err, CirculanteError::InvalidRollingWindow(0)));
    assert!(err.is_client_error());
    assert!(source.requests().is_empty());
}

#[tokio::test]
async fn every_chart_kind_renders_to_svg() {
    let dir = tempdir().unwrap();
    let source = source(12);

    for kind in [ChartKind::Temporal, ChartKind::Barplot, ChartKind::Series] {
        let data = prepare_chart(&source, &request(kind, 12, 3), 3).await.unwrap();
        let path = render_chart(&data, dir.path()).unwrap();

        assert_eq!(path, dir.path().join(kind.file_name()));
        let body = std::fs::read_to_string(&path).unwrap();
        assert!(body.contains("<svg"), "{kind} output is not svg");
    }
}

#[tokio::test]
async fn empty_window_still_renders() {
    let dir = tempdir().unwrap();
    let source = StaticSource::new(Vec::new(), Vec::new());
    let data = prepare_chart(&source, &request(ChartKind::Temporal, 7, 30), 14)
        .await
        .unwrap();

    let path = render_chart(&data, &dir.path().join("nested")).unwrap();
    assert!(path.exists());
}
