//! File-backed persistence for the game config, spin history and restaurant data.
//!
//! Each record is guarded by its own reader/writer lock. Writes to different
//! records are independent; there are no cross-record transactions.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared::restaurant::{
    Advertisement, AdvertisementUpdate, MenuItem, Recommendation, RecommendationInput,
    RestaurantConfig, RestaurantData,
};
use shared::shared_wheel_game::{GameConfig, SpinHistory, SpinResult};
use shared::constants::{DEFAULT_PLAYER, DEFAULT_REMAINING_SPINS};
use shared::validation::message_of;
use tokio::sync::RwLock;
use tracing::{info, warn};

pub mod records;

use records::{FileRecordStore, RecordKey, RecordStore};

#[derive(Debug)]
pub enum StorageError {
    Io { context: String, source: std::io::Error },
    Serialization { context: String, source: serde_json::Error },
    Invalid(String),
    NotFound { kind: &'static str, id: String },
}

impl StorageError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io { context: context.into(), source }
    }

    fn serialization(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization { context: context.into(), source }
    }

    fn not_found(kind: &'static str, id: &str) -> Self {
        Self::NotFound { kind, id: id.to_string() }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { context, source } => write!(f, "{}: {}", context, source),
            Self::Serialization { context, source } => write!(f, "{}: {}", context, source),
            Self::Invalid(message) => write!(f, "invalid config: {}", message),
            Self::NotFound { kind, id } => write!(f, "{} with ID {} not found", kind, id),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Serialization { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub struct Storage {
    records: Arc<dyn RecordStore>,
    uploads_dir: PathBuf,
    config_lock: RwLock<()>,
    history_lock: RwLock<()>,
    restaurant_lock: RwLock<()>,
}

impl Storage {
    /// Opens the JSON files under `data_dir`, creating defaults for any that are missing.
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let data_dir = data_dir.as_ref();
        tokio::fs::create_dir_all(data_dir)
            .await
            .map_err(|e| StorageError::io("failed to create data directory", e))?;
        let uploads_dir = data_dir.join("uploads");
        tokio::fs::create_dir_all(&uploads_dir)
            .await
            .map_err(|e| StorageError::io("failed to create uploads directory", e))?;

        let records = FileRecordStore::new(data_dir);
        info!("📁 Using data directory {}", records.data_dir().display());
        Self::with_records(Arc::new(records), uploads_dir).await
    }

    pub async fn with_records(
        records: Arc<dyn RecordStore>,
        uploads_dir: PathBuf,
    ) -> Result<Self, StorageError> {
        let storage = Self {
            records,
            uploads_dir,
            config_lock: RwLock::new(()),
            history_lock: RwLock::new(()),
            restaurant_lock: RwLock::new(()),
        };
        storage.initialize::<GameConfig>(RecordKey::Config).await?;
        storage.initialize::<SpinHistory>(RecordKey::History).await?;
        storage.initialize::<RestaurantData>(RecordKey::Restaurant).await?;
        Ok(storage)
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    async fn initialize<T: Serialize + Default>(&self, key: RecordKey) -> Result<(), StorageError> {
        if self.records.read(key).await?.is_none() {
            info!("Creating default {}", key.file_name());
            self.save(key, &T::default()).await?;
        }
        Ok(())
    }

    async fn load<T: DeserializeOwned + Default>(&self, key: RecordKey) -> Result<T, StorageError> {
        match self.records.read(key).await? {
            Some(contents) => serde_json::from_str(&contents)
                .map_err(|e| StorageError::serialization(format!("failed to parse {}", key.file_name()), e)),
            None => Ok(T::default()),
        }
    }

    async fn save<T: Serialize>(&self, key: RecordKey, value: &T) -> Result<(), StorageError> {
        let mut contents = serde_json::to_string_pretty(value)
            .map_err(|e| StorageError::serialization(format!("failed to encode {}", key.file_name()), e))?;
        contents.push('\n');
        self.records.write(key, &contents).await
    }

    // --- game config ---

    pub async fn get_config(&self) -> Result<GameConfig, StorageError> {
        let _guard = self.config_lock.read().await;
        self.load(RecordKey::Config).await
    }

    pub async fn save_config(&self, config: &GameConfig) -> Result<(), StorageError> {
        config
            .validate_config()
            .map_err(|e| StorageError::Invalid(message_of(&e)))?;
        let _guard = self.config_lock.write().await;
        self.save(RecordKey::Config, config).await
    }

    // --- history ---

    /// Results from the last 48 hours.
    pub async fn get_history(&self) -> Result<SpinHistory, StorageError> {
        let _guard = self.history_lock.read().await;
        let mut history: SpinHistory = self.load(RecordKey::History).await?;
        history.retain_recent(Utc::now());
        Ok(history)
    }

    pub async fn add_spin_result(&self, result: SpinResult) -> Result<(), StorageError> {
        let _guard = self.history_lock.write().await;
        let mut history: SpinHistory = self.load(RecordKey::History).await?;
        history.results.push(result);
        history.retain_recent(Utc::now());
        self.save(RecordKey::History, &history).await
    }

    /// Restores player and spin counters, then clears history as a second write.
    pub async fn reset_game(&self) -> Result<GameConfig, StorageError> {
        let config = {
            let _guard = self.config_lock.write().await;
            let mut config: GameConfig = self.load(RecordKey::Config).await?;
            config.current_player = DEFAULT_PLAYER;
            config.remaining_spins = DEFAULT_REMAINING_SPINS;
            config.total_spins = 0;
            self.save(RecordKey::Config, &config).await?;
            config
        };

        let _guard = self.history_lock.write().await;
        self.save(RecordKey::History, &SpinHistory::default()).await?;
        Ok(config)
    }

    // --- restaurant data ---

    pub async fn get_restaurant_data(&self) -> Result<RestaurantData, StorageError> {
        let _guard = self.restaurant_lock.read().await;
        self.load(RecordKey::Restaurant).await
    }

    /// Read-modify-write of the restaurant record under its write lock.
    /// Nothing is saved when `change` fails.
    async fn update_restaurant<R>(
        &self,
        change: impl FnOnce(&mut RestaurantData) -> Result<R, StorageError>,
    ) -> Result<R, StorageError> {
        let _guard = self.restaurant_lock.write().await;
        let mut data: RestaurantData = self.load(RecordKey::Restaurant).await?;
        let out = change(&mut data)?;
        self.save(RecordKey::Restaurant, &data).await?;
        Ok(out)
    }

    pub async fn save_restaurant_config(&self, config: RestaurantConfig) -> Result<RestaurantConfig, StorageError> {
        self.update_restaurant(|data| {
            data.config = config.clone();
            Ok(config)
        })
        .await
    }

    pub async fn add_advertisement(&self, ad: Advertisement) -> Result<Advertisement, StorageError> {
        self.update_restaurant(|data| {
            data.advertisements.push(ad.clone());
            Ok(ad)
        })
        .await
    }

    pub async fn update_advertisement(
        &self,
        id: &str,
        update: AdvertisementUpdate,
    ) -> Result<Advertisement, StorageError> {
        self.update_restaurant(|data| {
            let ad = data
                .advertisements
                .iter_mut()
                .find(|ad| ad.id == id)
                .ok_or_else(|| StorageError::not_found("advertisement", id))?;
            update.apply_to(ad);
            Ok(ad.clone())
        })
        .await
    }

    /// Removes the record, then its image file. A missing image is only logged.
    pub async fn delete_advertisement(&self, id: &str) -> Result<Advertisement, StorageError> {
        let removed = self
            .update_restaurant(|data| {
                let pos = data
                    .advertisements
                    .iter()
                    .position(|ad| ad.id == id)
                    .ok_or_else(|| StorageError::not_found("advertisement", id))?;
                Ok(data.advertisements.remove(pos))
            })
            .await?;

        let image = self.uploads_dir.join(&removed.filename);
        if let Err(e) = tokio::fs::remove_file(&image).await {
            warn!("Could not remove advertisement image {}: {}", image.display(), e);
        }
        Ok(removed)
    }

    pub async fn update_menu_item(&self, id: &str, mut item: MenuItem) -> Result<MenuItem, StorageError> {
        item.id = id.to_string();
        self.update_restaurant(|data| {
            let slot = data
                .menu_items
                .iter_mut()
                .find(|existing| existing.id == id)
                .ok_or_else(|| StorageError::not_found("menu item", id))?;
            *slot = item.clone();
            Ok(item)
        })
        .await
    }

    pub async fn add_recommendation(&self, rec: Recommendation) -> Result<Recommendation, StorageError> {
        self.update_restaurant(|data| {
            data.recommendations.push(rec.clone());
            Ok(rec)
        })
        .await
    }

    /// Replaces the editable fields; the original creation date is kept.
    pub async fn update_recommendation(
        &self,
        id: &str,
        input: RecommendationInput,
    ) -> Result<Recommendation, StorageError> {
        self.update_restaurant(|data| {
            let slot = data
                .recommendations
                .iter_mut()
                .find(|rec| rec.id == id)
                .ok_or_else(|| StorageError::not_found("recommendation", id))?;
            *slot = input.into_recommendation(slot.id.clone(), slot.date);
            Ok(slot.clone())
        })
        .await
    }

    pub async fn delete_recommendation(&self, id: &str) -> Result<Recommendation, StorageError> {
        self.update_restaurant(|data| {
            let pos = data
                .recommendations
                .iter()
                .position(|rec| rec.id == id)
                .ok_or_else(|| StorageError::not_found("recommendation", id))?;
            Ok(data.recommendations.remove(pos))
        })
        .await
    }
}
