mod error;
mod params;
mod routes;
mod state;

use axum::{
    routing::{get, put},
    Router,
};
use tokio::net::TcpListener;
use tracing::info;

pub use error::ApiError;
pub use params::{GraphicParams, TotalsParams};
pub use state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::root))
        .route("/totals", get(routes::totals))
        .route("/graphic", put(routes::graphic))
        .with_state(state)
}

/// Serves the router on an already bound listener until the process stops.
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state).into_make_service()).await
}
