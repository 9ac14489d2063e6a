use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use shared::shared_wheel_game::{ConfigUpdateRequest, GameConfig, PageSwitchRequest, SpinHistory};

use crate::error::{AppError, AppJson};
use crate::models::{PageSwitchResponse, ResetResponse, SpinResponse, SpinStatus};
use crate::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/config", get(get_config).post(update_config))
        .route("/spin", post(spin_wheel))
        .route("/spin-status", get(spin_status))
        .route("/history", get(get_history))
        .route("/reset", post(reset_game))
        .route("/switch-page", post(switch_page))
}

async fn get_config(State(state): State<AppState>) -> Result<Json<GameConfig>, AppError> {
    Ok(Json(state.storage.get_config().await?))
}

async fn update_config(
    State(state): State<AppState>,
    AppJson(update): AppJson<ConfigUpdateRequest>,
) -> Result<Json<GameConfig>, AppError> {
    Ok(Json(state.coordinator.update_config(update).await?))
}

async fn spin_wheel(State(state): State<AppState>) -> Result<Json<SpinResponse>, AppError> {
    Ok(Json(state.coordinator.spin().await?))
}

async fn spin_status(State(state): State<AppState>) -> Json<SpinStatus> {
    let elapsed = state.coordinator.spinning_for().await;
    Json(SpinStatus {
        is_spinning: elapsed.is_some(),
        spin_time: elapsed.map(|e| e.as_secs_f64()).unwrap_or(0.0),
    })
}

async fn get_history(State(state): State<AppState>) -> Result<Json<SpinHistory>, AppError> {
    Ok(Json(state.storage.get_history().await?))
}

async fn reset_game(State(state): State<AppState>) -> Result<Json<ResetResponse>, AppError> {
    let config = state.coordinator.reset().await?;
    Ok(Json(ResetResponse {
        message: "Game reset successfully".to_string(),
        config,
    }))
}

async fn switch_page(
    State(state): State<AppState>,
    AppJson(request): AppJson<PageSwitchRequest>,
) -> Result<Json<PageSwitchResponse>, AppError> {
    let page = state.coordinator.switch_page(request).await?;
    Ok(Json(PageSwitchResponse {
        message: "Page switched successfully".to_string(),
        page,
    }))
}
