use axum::Router;
use axum::routing::get;

pub mod liveness;

#[tracing::instrument(level = "debug", skip_all)]
pub fn router() -> Router {
    Router::new().route("/", get(liveness::get_liveness))
}
