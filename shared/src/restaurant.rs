use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Validate)]
pub struct RestaurantConfig {
    #[validate(length(min = 1, message = "restaurant name cannot be empty"))]
    pub name: String,
    /// Seconds each advertisement stays on screen.
    #[validate(range(min = 1, message = "rotation time must be at least 1 second"))]
    pub ad_rotation_time: u32,
    /// Seconds the advertisement page stays up after a spin before the wheel returns.
    pub auto_switch_time: u32,
    pub enable_auto_switch: bool,
}

impl Default for RestaurantConfig {
    fn default() -> Self {
        Self {
            name: "幸运餐厅".to_string(),
            ad_rotation_time: 5,
            auto_switch_time: 30,
            enable_auto_switch: false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Advertisement {
    pub id: String,
    pub filename: String,
    pub name: String,
    pub active: bool,
    pub order: i64,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct AdvertisementUpdate {
    #[validate(length(min = 1, message = "advertisement name cannot be empty"))]
    pub name: String,
    pub active: bool,
    pub order: i64,
}

impl AdvertisementUpdate {
    pub fn apply_to(self, ad: &mut Advertisement) {
        ad.name = self.name;
        ad.active = self.active;
        ad.order = self.order;
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Validate)]
pub struct MenuItem {
    #[serde(default)]
    pub id: String,
    #[validate(length(min = 1, message = "menu item name cannot be empty"))]
    pub name: String,
    #[validate(range(min = 0.0, message = "price cannot be negative"))]
    pub price: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub available: bool,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub image_url: String,
}

impl MenuItem {
    fn new(id: &str, name: &str, price: f64, category: &str, order: i32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            price,
            description: String::new(),
            category: category.to_string(),
            available: true,
            order,
            image_url: String::new(),
        }
    }
}

/// Body of a new or edited recommendation; id and date are assigned server-side.
#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct RecommendationInput {
    #[validate(length(min = 1, message = "recommendation name cannot be empty"))]
    pub name: String,
    #[validate(range(min = 0.0, message = "price cannot be negative"))]
    pub price: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub special: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub order: i32,
}

fn default_true() -> bool {
    true
}

impl RecommendationInput {
    pub fn into_recommendation(self, id: String, date: DateTime<Utc>) -> Recommendation {
        Recommendation {
            id,
            name: self.name,
            price: self.price,
            description: self.description,
            special: self.special,
            active: self.active,
            order: self.order,
            date,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Recommendation {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub description: String,
    pub special: String,
    pub active: bool,
    pub order: i32,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RestaurantData {
    pub config: RestaurantConfig,
    pub advertisements: Vec<Advertisement>,
    pub menu_items: Vec<MenuItem>,
    pub recommendations: Vec<Recommendation>,
}

impl Default for RestaurantData {
    fn default() -> Self {
        Self {
            config: RestaurantConfig::default(),
            advertisements: Vec::new(),
            menu_items: vec![
                MenuItem::new("menu_1", "宫保鸡丁", 38.0, "热菜", 1),
                MenuItem::new("menu_2", "麻婆豆腐", 26.0, "热菜", 2),
                MenuItem::new("menu_3", "酸辣汤", 18.0, "汤品", 3),
                MenuItem::new("menu_4", "扬州炒饭", 22.0, "主食", 4),
            ],
            recommendations: Vec::new(),
        }
    }
}
