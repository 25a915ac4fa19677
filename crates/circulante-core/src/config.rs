use std::path::PathBuf;
use std::time::Duration;

use crate::denomination::Denomination;
use crate::error::{CirculanteError, Result};
use crate::window::SortOrder;

pub const DEFAULT_CASH_URL: &str = "https://olinda.bcb.gov.br/olinda/servico/mecir_dinheiro_em_circulacao/versao/v1/odata/informacoes_diarias";
pub const DEFAULT_SETTLEMENT_URL: &str =
    "https://olinda.bcb.gov.br/olinda/servico/SPI/versao/v1/odata/PixLiquidadosAtual";

/// Number of banknote and coin denominations the cash series reports per day.
pub const DENOMINATION_COUNT: usize = 14;

/// Defaults applied to chart requests that omit a parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartDefaults {
    pub rolling: usize,
    pub denominations: Vec<Denomination>,
}

impl Default for ChartDefaults {
    fn default() -> Self {
        Self {
            rolling: 30,
            denominations: [0.50, 2.00, 20.00, 50.00, 100.00, 200.00]
                .into_iter()
                .map(Denomination::from_face_value)
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_addr: String,
    pub cash_url: String,
    pub settlement_url: String,
    pub denomination_count: usize,
    pub http_timeout: Duration,
    pub chart_dir: PathBuf,
    pub default_sort: SortOrder,
    pub chart_defaults: ChartDefaults,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            cash_url: DEFAULT_CASH_URL.to_string(),
            settlement_url: DEFAULT_SETTLEMENT_URL.to_string(),
            denomination_count: DENOMINATION_COUNT,
            http_timeout: Duration::from_secs(30),
            chart_dir: PathBuf::from("."),
            default_sort: SortOrder::Descending,
            chart_defaults: ChartDefaults::default(),
        }
    }
}

impl Settings {
    /// Reads `CIRCULANTE_*` variables from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup, starting from the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(addr) = get("CIRCULANTE_BIND_ADDR") {
            settings.bind_addr = addr;
        }
        if let Some(url) = get("CIRCULANTE_CASH_URL") {
            settings.cash_url = url;
        }
        if let Some(url) = get("CIRCULANTE_SETTLEMENT_URL") {
            settings.settlement_url = url;
        }
        if let Some(raw) = get("CIRCULANTE_DENOMINATION_COUNT") {
            settings.denomination_count = parse_positive("CIRCULANTE_DENOMINATION_COUNT", &raw)?;
        }
        if let Some(raw) = get("CIRCULANTE_HTTP_TIMEOUT_SECS") {
            let secs = parse_positive("CIRCULANTE_HTTP_TIMEOUT_SECS", &raw)?;
            settings.http_timeout = Duration::from_secs(secs as u64);
        }
        if let Some(dir) = get("CIRCULANTE_CHART_DIR") {
            settings.chart_dir = PathBuf::from(dir);
        }
        if let Some(raw) = get("CIRCULANTE_DEFAULT_SORT") {
            settings.default_sort = raw.parse().map_err(CirculanteError::Config)?;
        }
        if let Some(raw) = get("CIRCULANTE_CHART_ROLLING") {
            settings.chart_defaults.rolling = parse_positive("CIRCULANTE_CHART_ROLLING", &raw)?;
        }
        if let Some(raw) = get("CIRCULANTE_CHART_DENOMS") {
            settings.chart_defaults.denominations = Denomination::parse_list(&raw)?;
        }

        Ok(settings)
    }
}

fn parse_positive(key: &str, raw: &str) -> Result<usize> {
    match raw.trim().parse::<usize>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(CirculanteError::Config(format!(
            "{key} must be a positive integer, got '{raw}'"
        ))),
    }
}
