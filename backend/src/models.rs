use serde::{Deserialize, Serialize};
use shared::shared_wheel_game::{GameConfig, Page, SpinResult};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SpinResponse {
    pub result: SpinResult,
    pub config: GameConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResetResponse {
    pub message: String,
    pub config: GameConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PageSwitchResponse {
    pub message: String,
    pub page: Page,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SpinStatus {
    pub is_spinning: bool,
    /// Seconds since the current spin started, `0.0` when idle.
    pub spin_time: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}
