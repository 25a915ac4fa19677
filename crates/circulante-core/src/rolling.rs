use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{CirculanteError, Result};

/// A chart point. `value` is `None` where the trailing window is not yet full.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

/// Trailing simple moving average. The first `window - 1` entries are `None`.
pub fn rolling_mean(values: &[f64], window: usize) -> Result<Vec<Option<f64>>> {
    if window == 0 {
        return Err(CirculanteError::InvalidRollingWindow(window));
    }

    let mut means = vec![None; (window - 1).min(values.len())];
    means.extend(
        values
            .windows(window)
            .map(|slice| Some(slice.iter().sum::<f64>() / window as f64)),
    );
    Ok(means)
}

/// Applies [`rolling_mean`] to an ascending dated series.
pub fn rolling_points(series: &[(NaiveDate, f64)], window: usize) -> Result<Vec<DailyPoint>> {
    let values: Vec<f64> = series.iter().map(|(_, value)| *value).collect();
    let means = rolling_mean(&values, window)?;
    Ok(series
        .iter()
        .zip(means)
        .map(|((date, _), value)| DailyPoint { date: *date, value })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_points_are_undefined() {
        let means = rolling_mean(&[1.0, 2.0, 3.0, 4.0, 5.0], 3).unwrap();
        assert_eq!(means, vec![None, None, Some(2.0), Some(3.0), Some(4.0)]);
    }

    #[test]
    fn window_of_one_is_identity() {
        let means = rolling_mean(&[7.0, 9.0], 1).unwrap();
        assert_eq!(means, vec![Some(7.0), Some(9.0)]);
    }

    #[test]
    fn short_series_has_no_defined_mean() {
        let means = rolling_mean(&[1.0, 2.0], 30).unwrap();
        assert_eq!(means, vec![None, None]);
    }

    #[test]
    fn zero_window_is_rejected() {
        assert!(matches!(
            rolling_mean(&[1.0], 0),
            Err(CirculanteError::InvalidRollingWindow(0))
        ));
    }

    #[test]
    fn points_keep_their_dates() {
        let d1 = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2022, 1, 2).unwrap();
        let points = rolling_points(&[(d1, 10.0), (d2, 20.0)], 2).unwrap();
        assert_eq!(
            points,
            vec![
                DailyPoint { date: d1, value: None },
                DailyPoint { date: d2, value: Some(15.0) },
            ]
        );
    }
}
