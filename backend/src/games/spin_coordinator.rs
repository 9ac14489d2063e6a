//! Serializes spins and the configuration changes that must not overlap them.
//!
//! One mutex guards the in-memory spin lock. `spin` holds it across the whole
//! check, draw, persist and broadcast sequence, so two requests can never both
//! pass the remaining-spins check. The delayed unlock, the staleness sweep and
//! the auto page switch go through the same mutex.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use shared::constants::{SPIN_ANIMATION, STALE_LOCK_AFTER, STALE_LOCK_SWEEP};
use shared::events::ServerEvent;
use shared::prize_selector;
use shared::shared_wheel_game::{ConfigUpdateRequest, GameConfig, Page, PageSwitchRequest, SpinResult};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use validator::Validate;

use crate::broadcast::Broadcaster;
use crate::error::{AppError, LockedAction};
use crate::models::SpinResponse;
use crate::shutdown::ShutdownSignal;
use crate::storage::{Storage, StorageError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpinTimings {
    /// How long the wheel animates; the lock is released after this.
    pub animation: Duration,
    /// A lock older than this is considered lost and force-cleared.
    pub stale_after: Duration,
}

impl Default for SpinTimings {
    fn default() -> Self {
        Self {
            animation: SPIN_ANIMATION,
            stale_after: STALE_LOCK_AFTER,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LockState {
    Idle,
    Spinning { spin_id: u64, since: Instant },
}

struct SpinLock {
    state: LockState,
    next_spin_id: u64,
}

impl SpinLock {
    fn new() -> Self {
        Self { state: LockState::Idle, next_spin_id: 0 }
    }

    fn begin(&mut self, now: Instant) -> u64 {
        self.next_spin_id += 1;
        self.state = LockState::Spinning { spin_id: self.next_spin_id, since: now };
        self.next_spin_id
    }

    fn elapsed(&self) -> Option<Duration> {
        match self.state {
            LockState::Spinning { since, .. } => Some(since.elapsed()),
            LockState::Idle => None,
        }
    }

    /// Clears the lock only if it still belongs to `spin_id`.
    fn release(&mut self, spin_id: u64) -> bool {
        match self.state {
            LockState::Spinning { spin_id: current, .. } if current == spin_id => {
                self.state = LockState::Idle;
                true
            }
            _ => false,
        }
    }

    fn release_if_stale(&mut self, stale_after: Duration) -> Option<Duration> {
        let elapsed = self.elapsed().filter(|elapsed| *elapsed > stale_after)?;
        self.state = LockState::Idle;
        Some(elapsed)
    }
}

struct Inner {
    storage: Arc<Storage>,
    events: Arc<dyn Broadcaster>,
    timings: SpinTimings,
    lock: Mutex<SpinLock>,
    shutdown: ShutdownSignal,
}

/// Cheap to clone; every clone drives the same lock.
#[derive(Clone)]
pub struct SpinCoordinator {
    inner: Arc<Inner>,
}

impl SpinCoordinator {
    pub fn new(
        storage: Arc<Storage>,
        events: Arc<dyn Broadcaster>,
        timings: SpinTimings,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                storage,
                events,
                timings,
                lock: Mutex::new(SpinLock::new()),
                shutdown,
            }),
        }
    }

    fn publish(&self, event: ServerEvent) {
        self.inner.events.publish(&event);
    }

    pub async fn spin(&self) -> Result<SpinResponse, AppError> {
        let mut lock = self.inner.lock.lock().await;
        self.recover_stale(&mut lock);
        if lock.elapsed().is_some() {
            return Err(AppError::SpinAlreadyInProgress);
        }

        let config = self.inner.storage.get_config().await?;
        if config.remaining_spins <= 0 {
            return Err(AppError::NoSpinsRemaining);
        }

        let spin_id = lock.begin(Instant::now());
        self.publish(ServerEvent::SpinStarted {
            player: config.current_player,
            is_spinning: true,
        });

        match self.draw_and_record(config).await {
            Ok(outcome) => {
                info!(
                    "🎡 Player {} landed on segment {}: {} ({} spins left)",
                    outcome.result.player, outcome.result.index, outcome.result.prize, outcome.config.remaining_spins
                );
                self.publish(ServerEvent::SpinCompleted {
                    result: outcome.result.clone(),
                    config: outcome.config.clone(),
                    is_spinning: true,
                });
                self.schedule_unlock(spin_id);
                self.schedule_auto_switch();
                Ok(outcome)
            }
            Err(e) => {
                lock.release(spin_id);
                error!("Spin failed, releasing lock: {}", e);
                self.publish(ServerEvent::SpinLockCleared { is_spinning: false });
                Err(e)
            }
        }
    }

    async fn draw_and_record(&self, mut config: GameConfig) -> Result<SpinResponse, AppError> {
        let selection = {
            let mut rng = rand::thread_rng();
            prize_selector::select(&config, &mut rng)
        }
        .ok_or_else(|| AppError::Validation("No prize option has a positive probability".to_string()))?;

        let result = SpinResult {
            player: config.current_player,
            prize: selection.label,
            index: selection.index,
            timestamp: Utc::now(),
            mode: config.mode,
        };
        self.inner.storage.add_spin_result(result.clone()).await?;

        config.remaining_spins -= 1;
        config.total_spins += 1;
        self.inner.storage.save_config(&config).await?;

        Ok(SpinResponse { result, config })
    }

    fn schedule_unlock(&self, spin_id: u64) {
        let this = self.clone();
        tokio::spawn(async move {
            let mut shutdown = this.inner.shutdown.clone();
            if !shutdown.sleep(this.inner.timings.animation).await {
                return;
            }
            let mut lock = this.inner.lock.lock().await;
            if lock.release(spin_id) {
                debug!("Spin {} finished animating", spin_id);
                this.publish(ServerEvent::SpinLockCleared { is_spinning: false });
            }
        });
    }

    fn schedule_auto_switch(&self) {
        let this = self.clone();
        tokio::spawn(async move {
            if let Err(e) = this.run_auto_switch().await {
                warn!("Auto page switch aborted: {}", e);
            }
        });
    }

    /// Shows the advertisement page once the wheel stops, then returns to the
    /// lottery page of the active mode after the configured ad time.
    async fn run_auto_switch(&self) -> Result<(), StorageError> {
        let restaurant = self.inner.storage.get_restaurant_data().await?.config;
        if !restaurant.enable_auto_switch {
            return Ok(());
        }

        let mut shutdown = self.inner.shutdown.clone();
        if !shutdown.sleep(self.inner.timings.animation).await {
            return Ok(());
        }
        self.auto_show(Some(Page::Advertisement)).await?;

        if restaurant.auto_switch_time == 0 {
            return Ok(());
        }
        let ad_time = Duration::from_secs(u64::from(restaurant.auto_switch_time));
        if !shutdown.sleep(ad_time).await {
            return Ok(());
        }
        self.auto_show(None).await
    }

    /// `None` means the lottery page matching the stored mode.
    async fn auto_show(&self, target: Option<Page>) -> Result<(), StorageError> {
        // Reloading under the lock keeps spin counters written since the spin.
        let _lock = self.inner.lock.lock().await;
        let mut config = self.inner.storage.get_config().await?;
        let page = target.unwrap_or_else(|| Page::lottery_for(config.mode));
        config.show_page(page);
        self.inner.storage.save_config(&config).await?;

        info!("🔀 Auto-switched display to {}", page);
        self.publish(ServerEvent::PageSwitched { page, config, auto: Some(true) });
        Ok(())
    }

    fn recover_stale(&self, lock: &mut SpinLock) -> bool {
        match lock.release_if_stale(self.inner.timings.stale_after) {
            Some(elapsed) => {
                warn!("Recovering stale spin lock held for {:.1}s", elapsed.as_secs_f64());
                self.publish(ServerEvent::SpinLockRecovered {
                    is_spinning: false,
                    recovered: true,
                });
                true
            }
            None => false,
        }
    }

    /// Force-clears a lock held past the staleness threshold.
    pub async fn recover_stale_lock(&self) -> bool {
        let mut lock = self.inner.lock.lock().await;
        self.recover_stale(&mut lock)
    }

    pub fn spawn_stale_lock_sweep(&self, period: Duration) -> JoinHandle<()> {
        let period = if period.is_zero() {
            warn!("Zero spin lock sweep period, using {}s", STALE_LOCK_SWEEP.as_secs());
            STALE_LOCK_SWEEP
        } else {
            period
        };
        let this = self.clone();
        tokio::spawn(async move {
            let mut shutdown = this.inner.shutdown.clone();
            let mut interval = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        this.recover_stale_lock().await;
                    }
                    _ = shutdown.wait() => break,
                }
            }
            debug!("Spin lock sweep stopped");
        })
    }

    fn ensure_idle(&self, lock: &mut SpinLock, action: LockedAction) -> Result<(), AppError> {
        self.recover_stale(lock);
        match lock.elapsed() {
            Some(elapsed) => Err(AppError::SpinInProgress { action, elapsed }),
            None => Ok(()),
        }
    }

    /// Time since the current spin started, `None` when idle.
    pub async fn spinning_for(&self) -> Option<Duration> {
        self.inner.lock.lock().await.elapsed()
    }

    pub async fn is_spinning(&self) -> bool {
        self.spinning_for().await.is_some()
    }

    pub async fn update_config(&self, update: ConfigUpdateRequest) -> Result<GameConfig, AppError> {
        let mut lock = self.inner.lock.lock().await;
        self.ensure_idle(&mut lock, LockedAction::UpdateConfig)?;

        let mut config = self.inner.storage.get_config().await?;
        update.apply_to(&mut config);
        self.inner.storage.save_config(&config).await?;

        info!("⚙️ Game configuration updated (mode {})", u8::from(config.mode));
        self.publish(ServerEvent::ConfigUpdated(config.clone()));
        Ok(config)
    }

    pub async fn switch_page(&self, request: PageSwitchRequest) -> Result<Page, AppError> {
        let mut lock = self.inner.lock.lock().await;
        self.ensure_idle(&mut lock, LockedAction::SwitchPage)?;

        request.validate()?;
        let page: Page = request
            .page
            .parse()
            .map_err(|_| AppError::Validation(format!("Invalid page: {}", request.page)))?;

        let mut config = self.inner.storage.get_config().await?;
        config.show_page(page);
        self.inner.storage.save_config(&config).await?;

        info!("🔀 Display switched to {}", page);
        self.publish(ServerEvent::PageSwitched { page, config, auto: None });
        Ok(page)
    }

    pub async fn reset(&self) -> Result<GameConfig, AppError> {
        let mut lock = self.inner.lock.lock().await;
        self.ensure_idle(&mut lock, LockedAction::Reset)?;

        let config = self.inner.storage.reset_game().await?;
        info!("🔄 Game reset");
        self.publish(ServerEvent::StateUpdated(config.clone()));
        Ok(config)
    }

    /// Marks the wheel as spinning without scheduling the unlock, as if the
    /// timer had been lost.
    #[cfg(test)]
    pub(crate) async fn force_spinning(&self) {
        self.inner.lock.lock().await.begin(Instant::now());
    }
}
