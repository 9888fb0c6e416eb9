//! Experimental report endpoints for connected locations.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use super::handlers::{api_error, gateway_failure, storage_failure, ApiError, AppState};
use crate::google::{ActiveVisitorsQuery, Report, ReporterError};

/// Most active visitors of the Analytics view behind a location
pub async fn active_visitors(
    State(state): State<Arc<AppState>>,
    Path(location_id): Path<i64>,
    Query(query): Query<ActiveVisitorsQuery>,
) -> Result<Json<Report>, ApiError> {
    let location = state
        .storage
        .get_location(location_id)
        .await
        .map_err(|e| storage_failure("Failed to load location", e))?;
    if location.is_none() {
        return Err(api_error(
            StatusCode::NOT_FOUND,
            format!("Location {location_id} not found"),
        ));
    }

    let reporter = state
        .reports
        .connect_by_location(state.storage.as_ref(), location_id)
        .await
        .map_err(reporter_failure)?;

    reporter
        .most_active_visitors(&query)
        .await
        .map(Json)
        .map_err(gateway_failure)
}

fn reporter_failure(e: ReporterError) -> ApiError {
    match e {
        ReporterError::MissingToken(_) | ReporterError::MissingProfile(_) => {
            api_error(StatusCode::NOT_FOUND, e.to_string())
        }
        ReporterError::MissingApplication(_) | ReporterError::Storage(_) => {
            storage_failure("Failed to load report credentials", e)
        }
        ReporterError::Gateway(e) => gateway_failure(e),
    }
}
