use std::time::Duration;

/// How long the display wheel animates after a spin is accepted.
pub const SPIN_ANIMATION: Duration = Duration::from_secs(8);
/// A lock older than this is treated as abandoned (animation + 4s margin).
pub const STALE_LOCK_AFTER: Duration = Duration::from_secs(12);
/// How often the server looks for an abandoned lock.
pub const STALE_LOCK_SWEEP: Duration = Duration::from_secs(2);
/// Spin results older than this are dropped from history.
pub const HISTORY_RETENTION_HOURS: i64 = 48;

pub const SEGMENT_COUNT: usize = 12;
/// Segment the display layout reserves for a mode 2 win.
pub const WIN_INDEX: usize = 11;
pub const PROBABILITY_TOLERANCE: f64 = 0.01;

pub const DEFAULT_PLAYER: i32 = 1;
pub const DEFAULT_REMAINING_SPINS: i32 = 100;
pub const DEFAULT_MODE2_WIN_RATE: f64 = 5.0;
pub const DEFAULT_MODE2_WIN_TEXT: &str = "中奖了!";
pub const DEFAULT_MODE2_LOSE_TEXT: &str = "没中奖";

pub const SPIN_ALREADY_IN_PROGRESS_ERROR: &str = "Spin already in progress";
pub const NO_SPINS_REMAINING_ERROR: &str = "No spins remaining";
pub const UPDATE_CONFIG_LOCKED_ERROR: &str = "Cannot update configuration while spin is in progress";
pub const RESET_LOCKED_ERROR: &str = "Cannot reset game while spin is in progress";
pub const SWITCH_PAGE_LOCKED_ERROR: &str = "Cannot switch pages while spin is in progress";
pub const INVALID_IMAGE_ERROR: &str = "Invalid file type. Only JPG, PNG, and GIF are allowed.";
