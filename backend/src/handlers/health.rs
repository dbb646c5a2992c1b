use axum::{extract::State, http::StatusCode, Json};

use crate::{
    services::persistence::{HealthReport, HealthStatus},
    state::AppState,
};

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let report = state.store.health().await;
    let status = match report.status {
        HealthStatus::Up => StatusCode::OK,
        HealthStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(report))
}
