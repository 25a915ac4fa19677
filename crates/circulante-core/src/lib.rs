pub mod charts;
pub mod config;
pub mod denomination;
pub mod error;
pub mod frames;
pub mod pipeline;
pub mod rolling;
pub mod upstream;
pub mod window;

pub use charts::{render_chart, ChartData, ChartKind};
pub use config::{ChartDefaults, Settings};
pub use denomination::Denomination;
pub use error::{CirculanteError, Result};
pub use frames::AggregatedRow;
pub use pipeline::{aggregate_totals, prepare_chart, ChartRequest, TotalsRequest};
pub use upstream::{DataSource, OlindaClient, StaticSource};
pub use window::{DateWindow, SortOrder};
