use std::path::PathBuf;

use anyhow::{Context, Result};
use circulante_api::AppState;
use circulante_core::{
    aggregate_totals, prepare_chart, render_chart, AggregatedRow, ChartKind, ChartRequest,
    DateWindow, Denomination, OlindaClient, Settings, SortOrder, TotalsRequest,
};
use clap::{Args, Parser, Subcommand};
use comfy_table::Table;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Brazilian currency-in-circulation and Pix settlement totals", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service
    Serve(ServeArgs),
    /// Print daily totals for a date window
    Totals(TotalsArgs),
    /// Render a chart to the chart directory
    Graphic(GraphicArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Address to bind, overrides CIRCULANTE_BIND_ADDR
    #[arg(long)]
    bind: Option<String>,
}

#[derive(Args, Debug, Default)]
struct WindowArgs {
    /// First day of the window (YYYY-MM-DD), defaults to today
    #[arg(long)]
    start: Option<String>,
    /// Last day of the window (YYYY-MM-DD), defaults to today
    #[arg(long)]
    end: Option<String>,
    /// Comma separated face values, e.g. 2,50,100
    #[arg(long)]
    denoms: Option<String>,
}

#[derive(Args, Debug, Default)]
struct TotalsArgs {
    #[command(flatten)]
    window: WindowArgs,
    /// Merge the Pix settlement totals in
    #[arg(long)]
    pix: bool,
    /// asc or desc
    #[arg(long)]
    sort: Option<SortOrder>,
}

#[derive(Args, Debug)]
struct GraphicArgs {
    /// temporal, barplot or series
    kind: ChartKind,
    #[command(flatten)]
    window: WindowArgs,
    /// Rolling mean window in days
    #[arg(long)]
    rolling: Option<usize>,
    /// Directory the chart is written to, overrides CIRCULANTE_CHART_DIR
    #[arg(long)]
    out: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let settings = Settings::from_env().context("failed to read CIRCULANTE_* settings")?;

    match cli.command {
        Command::Serve(args) => handle_serve(settings, args).await,
        Command::Totals(args) => handle_totals(settings, args).await,
        Command::Graphic(args) => handle_graphic(settings, args).await,
    }
}

async fn handle_serve(mut settings: Settings, args: ServeArgs) -> Result<()> {
    if let Some(bind) = args.bind {
        settings.bind_addr = bind;
    }

    let listener = TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_addr))?;
    let state = AppState::connect(settings).context("failed to build upstream client")?;

    circulante_api::serve(listener, state).await?;
    Ok(())
}

async fn handle_totals(settings: Settings, args: TotalsArgs) -> Result<()> {
    let order = args.sort.unwrap_or(settings.default_sort);
    let request = TotalsRequest {
        window: resolve_window(&args.window, order)?,
        include_settlement: args.pix,
        denominations: denominations(&args.window)?,
    };

    let client = OlindaClient::new(&settings)?;
    let rows = aggregate_totals(&client, &request, settings.denomination_count)
        .await
        .context("failed to aggregate totals")?;

    info!(rows = rows.len(), "totals aggregated");
    println!("{}", totals_table(&rows, request.include_settlement));
    Ok(())
}

async fn handle_graphic(mut settings: Settings, args: GraphicArgs) -> Result<()> {
    if let Some(out) = args.out {
        settings.chart_dir = out;
    }

    let mut requested = denominations(&args.window)?;
    if requested.is_empty() {
        requested = settings.chart_defaults.denominations.clone();
    }
    let request = ChartRequest {
        kind: args.kind,
        window: resolve_window(&args.window, SortOrder::Ascending)?,
        rolling: args.rolling.unwrap_or(settings.chart_defaults.rolling),
        denominations: requested,
    };

    let client = OlindaClient::new(&settings)?;
    let data = prepare_chart(&client, &request, settings.denomination_count)
        .await
        .context("failed to prepare chart data")?;

    let dir = settings.chart_dir.clone();
    let path = tokio::task::spawn_blocking(move || render_chart(&data, &dir))
        .await
        .context("chart task panicked")?
        .context("failed to render chart")?;

    println!("{}", path.display());
    Ok(())
}

fn resolve_window(args: &WindowArgs, order: SortOrder) -> Result<DateWindow> {
    DateWindow::resolve_today(args.start.as_deref(), args.end.as_deref(), order)
        .context("invalid date window")
}

fn denominations(args: &WindowArgs) -> Result<Vec<Denomination>> {
    match args.denoms.as_deref() {
        Some(list) => Denomination::parse_list(list).context("invalid --denoms"),
        None => Ok(Vec::new()),
    }
}

fn totals_table(rows: &[AggregatedRow], include_settlement: bool) -> Table {
    let mut table = Table::new();
    if include_settlement {
        table.set_header(vec!["Data", "Total Dinheiro", "Total Pix"]);
    } else {
        table.set_header(vec!["Data", "Total Dinheiro"]);
    }

    for row in rows {
        let mut cells = vec![row.date.to_string(), format!("{:.2}", row.total_cash)];
        if let Some(settlement) = row.total_settlement {
            cells.push(format!("{settlement:.2}"));
        }
        table.add_row(cells);
    }
    table
}
