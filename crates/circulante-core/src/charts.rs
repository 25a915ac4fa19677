//! SVG chart rendering for the cash and settlement series.

use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{Days, NaiveDate};
use plotters::coord::Shift;
use plotters::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::denomination::Denomination;
use crate::error::{CirculanteError, Result};
use crate::rolling::DailyPoint;
use crate::window::DateWindow;

const CHART_SIZE: (u32, u32) = (1600, 900);
const SEA_GREEN: RGBColor = RGBColor(46, 139, 87);
const FONT: &str = "sans-serif";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChartKind {
    Temporal,
    Barplot,
    Series,
}

impl ChartKind {
    pub fn file_name(self) -> &'static str {
        match self {
            ChartKind::Temporal => "Temporal.svg",
            ChartKind::Barplot => "Barplot.svg",
            ChartKind::Series => "Series.svg",
        }
    }
}

impl FromStr for ChartKind {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "temporal" => Ok(ChartKind::Temporal),
            "barplot" => Ok(ChartKind::Barplot),
            "series" => Ok(ChartKind::Series),
            other => Err(format!(
                "unknown graph type '{other}', expected Temporal, Barplot or Series"
            )),
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChartKind::Temporal => "Temporal",
            ChartKind::Barplot => "Barplot",
            ChartKind::Series => "Series",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DenominationPanel {
    pub denomination: Denomination,
    pub points: Vec<DailyPoint>,
}

/// Series shaped for one chart kind, ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartData {
    Temporal {
        window: DateWindow,
        rolling: usize,
        cash: Vec<DailyPoint>,
        settlement: Vec<DailyPoint>,
    },
    Barplot {
        window: DateWindow,
        bars: Vec<(String, f64)>,
    },
    Series {
        window: DateWindow,
        rolling: usize,
        panels: Vec<DenominationPanel>,
    },
}

impl ChartData {
    pub fn kind(&self) -> ChartKind {
        match self {
            ChartData::Temporal { .. } => ChartKind::Temporal,
            ChartData::Barplot { .. } => ChartKind::Barplot,
            ChartData::Series { .. } => ChartKind::Series,
        }
    }
}

fn chart_err<E: fmt::Display>(err: E) -> CirculanteError {
    CirculanteError::Chart(err.to_string())
}

/// Writes `<Kind>.svg` into `dir` (created if missing) and returns its path.
pub fn render_chart(data: &ChartData, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(data.kind().file_name());

    {
        let root = SVGBackend::new(&path, CHART_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(chart_err)?;

        match data {
            ChartData::Temporal {
                window,
                rolling,
                cash,
                settlement,
            } => {
                let panels = root.split_evenly((2, 1));
                let x_range = date_range(window);
                draw_line_panel(
                    &panels[0],
                    &format!("Dinheiro corrente: média móvel de {rolling} dias"),
                    None,
                    x_range.clone(),
                    cash,
                    SEA_GREEN.stroke_width(2),
                )?;
                draw_line_panel(
                    &panels[1],
                    &format!("Transações SPI: média móvel de {rolling} dias"),
                    None,
                    x_range,
                    settlement,
                    BLUE.stroke_width(2),
                )?;
            }
            ChartData::Barplot { bars, .. } => draw_barplot(&root, bars)?,
            ChartData::Series {
                window,
                rolling,
                panels,
            } => {
                let areas = root.split_evenly((panels.len().max(1), 1));
                let x_range = date_range(window);
                for (idx, (area, panel)) in areas.iter().zip(panels).enumerate() {
                    let caption = (idx == 0)
                        .then(|| format!("Quantidade por denominação: média móvel de {rolling} dias"));
                    draw_line_panel(
                        area,
                        caption.as_deref().unwrap_or(""),
                        Some(panel.denomination.label()),
                        x_range.clone(),
                        &panel.points,
                        Palette99::pick(idx).stroke_width(2),
                    )?;
                }
            }
        }

        root.present().map_err(chart_err)?;
    }

    info!(path = %path.display(), kind = %data.kind(), "chart written");
    Ok(path)
}

/// Half-open axis range covering every day of the window.
fn date_range(window: &DateWindow) -> Range<NaiveDate> {
    let end = window.end();
    window.start()..end.checked_add_days(Days::new(1)).unwrap_or(end)
}

fn value_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() || !max.is_finite() {
        return 0.0..1.0;
    }
    let pad = ((max - min) * 0.05).max(max.abs() * 0.01).max(1.0);
    (min - pad)..(max + pad)
}

fn format_day(day: &NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

fn format_value(value: &f64) -> String {
    let magnitude = value.abs();
    if magnitude >= 1e9 {
        format!("{:.1}B", value / 1e9)
    } else if magnitude >= 1e6 {
        format!("{:.1}M", value / 1e6)
    } else if magnitude >= 1e3 {
        format!("{:.1}k", value / 1e3)
    } else {
        format!("{value:.1}")
    }
}

fn draw_line_panel(
    area: &DrawingArea<SVGBackend<'_>, Shift>,
    caption: &str,
    y_desc: Option<&str>,
    x_range: Range<NaiveDate>,
    points: &[DailyPoint],
    style: ShapeStyle,
) -> Result<()> {
    // undefined leading rolling values are simply not drawn
    let defined: Vec<(NaiveDate, f64)> = points
        .iter()
        .filter_map(|point| point.value.map(|value| (point.date, value)))
        .collect();

    let mut builder = ChartBuilder::on(area);
    builder
        .margin(12)
        .x_label_area_size(32)
        .y_label_area_size(72);
    if !caption.is_empty() {
        builder.caption(caption, (FONT, 22));
    }
    let mut chart = builder
        .build_cartesian_2d(x_range, value_range(defined.iter().map(|(_, v)| *v)))
        .map_err(chart_err)?;

    let mut mesh = chart.configure_mesh();
    mesh.x_labels(8)
        .x_label_formatter(&format_day)
        .y_label_formatter(&format_value);
    if let Some(desc) = y_desc {
        mesh.y_desc(desc);
    }
    mesh.draw().map_err(chart_err)?;

    chart
        .draw_series(LineSeries::new(defined, style))
        .map_err(chart_err)?;
    Ok(())
}

fn draw_barplot(area: &DrawingArea<SVGBackend<'_>, Shift>, bars: &[(String, f64)]) -> Result<()> {
    let count = bars.len().max(1) as i32;
    let top = bars
        .iter()
        .map(|(_, mean)| *mean)
        .fold(0.0_f64, f64::max)
        .max(1.0)
        * 1.1;

    let mut chart = ChartBuilder::on(area)
        .caption("Quantidade média por denominação", (FONT, 22))
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(72)
        .build_cartesian_2d((0..count).into_segmented(), 0.0..top)
        .map_err(chart_err)?;

    let label_at = |value: &SegmentValue<i32>| match value {
        SegmentValue::CenterOf(idx) => bars
            .get(*idx as usize)
            .map(|(label, _)| label.clone())
            .unwrap_or_default(),
        _ => String::new(),
    };

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(bars.len().max(1))
        .x_label_formatter(&label_at)
        .y_label_formatter(&format_value)
        .x_desc("Denominacao")
        .y_desc("Quantidade")
        .draw()
        .map_err(chart_err)?;

    chart
        .draw_series(bars.iter().enumerate().map(|(idx, (_, mean))| {
            let idx = idx as i32;
            Rectangle::new(
                [(SegmentValue::Exact(idx), 0.0), (SegmentValue::Exact(idx + 1), *mean)],
                SEA_GREEN.mix(0.8).filled(),
            )
        }))
        .map_err(chart_err)?;
    Ok(())
}
