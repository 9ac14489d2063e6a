use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::restaurant::{Advertisement, MenuItem, Recommendation, RestaurantConfig};
use crate::shared_wheel_game::{GameConfig, Page, SpinResult};

/// Every message the server pushes to displays, framed as `{type, data}`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    Connected {
        message: String,
        is_spinning: bool,
    },
    Pong(Value),
    SpinStarted {
        player: i32,
        is_spinning: bool,
    },
    SpinCompleted {
        result: SpinResult,
        config: GameConfig,
        /// Stays `true` so displays keep animating until the lock clears.
        is_spinning: bool,
    },
    SpinLockCleared {
        is_spinning: bool,
    },
    SpinLockRecovered {
        is_spinning: bool,
        recovered: bool,
    },
    ConfigUpdated(GameConfig),
    PageSwitched {
        page: Page,
        config: GameConfig,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        auto: Option<bool>,
    },
    StateUpdated(GameConfig),
    RestaurantConfigUpdated(RestaurantConfig),
    AdvertisementAdded(Advertisement),
    AdvertisementUpdated(Advertisement),
    AdvertisementDeleted {
        id: String,
    },
    MenuItemUpdated(MenuItem),
    RecommendationAdded(Recommendation),
    RecommendationUpdated(Recommendation),
    RecommendationDeleted {
        id: String,
    },
}

impl ServerEvent {
    /// The `type` tag as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerEvent::Connected { .. } => "connected",
            ServerEvent::Pong(_) => "pong",
            ServerEvent::SpinStarted { .. } => "spin_started",
            ServerEvent::SpinCompleted { .. } => "spin_completed",
            ServerEvent::SpinLockCleared { .. } => "spin_lock_cleared",
            ServerEvent::SpinLockRecovered { .. } => "spin_lock_recovered",
            ServerEvent::ConfigUpdated(_) => "config_updated",
            ServerEvent::PageSwitched { .. } => "page_switched",
            ServerEvent::StateUpdated(_) => "state_updated",
            ServerEvent::RestaurantConfigUpdated(_) => "restaurant_config_updated",
            ServerEvent::AdvertisementAdded(_) => "advertisement_added",
            ServerEvent::AdvertisementUpdated(_) => "advertisement_updated",
            ServerEvent::AdvertisementDeleted { .. } => "advertisement_deleted",
            ServerEvent::MenuItemUpdated(_) => "menu_item_updated",
            ServerEvent::RecommendationAdded(_) => "recommendation_added",
            ServerEvent::RecommendationUpdated(_) => "recommendation_updated",
            ServerEvent::RecommendationDeleted { .. } => "recommendation_deleted",
        }
    }
}

/// Message sent by a display. Only `ping` is acted on.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClientMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}
