//! Query-string shapes for the service endpoints and their conversion into
//! pipeline requests.

use chrono::NaiveDate;
use circulante_core::{
    ChartKind, ChartRequest, DateWindow, Denomination, Settings, SortOrder, TotalsRequest,
};
use serde::Deserialize;

use crate::error::ApiError;

#[derive(Debug, Default, Clone, Deserialize)]
pub struct TotalsParams {
    pub pix: Option<String>,
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,
    pub sort: Option<String>,
    pub denoms: Option<String>,
    /// Accepted and ignored: totals are never smoothed.
    pub rolling: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct GraphicParams {
    pub graph_type: Option<String>,
    pub rolling: Option<usize>,
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,
    pub denoms: Option<String>,
}

impl TotalsParams {
    pub fn into_request(self, settings: &Settings, today: NaiveDate) -> Result<TotalsRequest, ApiError> {
        let order = match self.sort.as_deref().map(str::trim) {
            None | Some("") => settings.default_sort,
            Some(raw) => raw.parse::<SortOrder>().map_err(ApiError::BadRequest)?,
        };
        let window = DateWindow::resolve(
            self.start_date.as_deref(),
            self.end_date.as_deref(),
            order,
            today,
        )?;

        Ok(TotalsRequest {
            window,
            include_settlement: flag(self.pix.as_deref())?,
            denominations: denominations(self.denoms.as_deref())?,
        })
    }
}

impl GraphicParams {
    pub fn into_request(self, settings: &Settings, today: NaiveDate) -> Result<ChartRequest, ApiError> {
        let kind = self
            .graph_type
            .as_deref()
            .ok_or_else(|| ApiError::BadRequest("missing graph_type".to_string()))?
            .parse::<ChartKind>()
            .map_err(ApiError::BadRequest)?;
        let window = DateWindow::resolve(
            self.start_date.as_deref(),
            self.end_date.as_deref(),
            SortOrder::Ascending,
            today,
        )?;

        let mut requested = denominations(self.denoms.as_deref())?;
        if requested.is_empty() {
            requested = settings.chart_defaults.denominations.clone();
        }

        Ok(ChartRequest {
            kind,
            window,
            rolling: self.rolling.unwrap_or(settings.chart_defaults.rolling),
            denominations: requested,
        })
    }
}

/// A present but empty flag (`?pix`) counts as set.
fn flag(raw: Option<&str>) -> Result<bool, ApiError> {
    let Some(raw) = raw else {
        return Ok(false);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(ApiError::BadRequest(format!(
            "invalid boolean '{other}' for pix"
        ))),
    }
}

fn denominations(raw: Option<&str>) -> Result<Vec<Denomination>, ApiError> {
    match raw {
        Some(list) => Ok(Denomination::parse_list(list)?),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn totals_defaults_to_today_descending_without_pix() {
        let today = day(2022, 9, 15);
        let request = TotalsParams::default()
            .into_request(&Settings::default(), today)
            .unwrap();

        assert_eq!(request.window.start(), today);
        assert_eq!(request.window.end(), today);
        assert_eq!(request.window.order(), SortOrder::Descending);
        assert!(!request.include_settlement);
        assert!(request.denominations.is_empty());
    }

    #[test]
    fn pix_flag_accepts_bare_and_boolean_values() {
        assert!(flag(Some("")).unwrap());
        assert!(flag(Some("True")).unwrap());
        assert!(!flag(Some("false")).unwrap());
        assert!(!flag(None).unwrap());
        assert!(flag(Some("maybe")).is_err());
    }

    #[test]
    fn reversed_range_is_a_client_error() {
        let params = TotalsParams {
            start_date: Some("2022-01-10".into()),
            end_date: Some("2022-01-01".into()),
            ..TotalsParams::default()
        };
        let err = params
            .into_request(&Settings::default(), day(2022, 9, 15))
            .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn graphic_falls_back_to_chart_defaults() {
        let params = GraphicParams {
            graph_type: Some("Series".into()),
            start_date: Some("2022-01-01".into()),
            end_date: Some("2022-03-01".into()),
            ..GraphicParams::default()
        };
        let settings = Settings::default();
        let request = params.into_request(&settings, day(2022, 9, 15)).unwrap();

        assert_eq!(request.kind, ChartKind::Series);
        assert_eq!(request.rolling, 30);
        assert_eq!(request.denominations, settings.chart_defaults.denominations);
        assert_eq!(request.window.order(), SortOrder::Ascending);
    }

    #[test]
    fn graphic_requires_a_known_kind() {
        let settings = Settings::default();
        let missing = GraphicParams::default().into_request(&settings, day(2022, 1, 1));
        assert!(matches!(missing, Err(ApiError::BadRequest(_))));

        let unknown = GraphicParams {
            graph_type: Some("Pie".into()),
            ..GraphicParams::default()
        }
        .into_request(&settings, day(2022, 1, 1));
        assert!(matches!(unknown, Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn bad_denomination_is_rejected() {
        let params = TotalsParams {
            denoms: Some("2,abc".into()),
            ..TotalsParams::default()
        };
        let err = params
            .into_request(&Settings::default(), day(2022, 1, 1))
            .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }
}
