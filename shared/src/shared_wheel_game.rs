use std::convert::TryFrom;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use validator::{Validate, ValidationError};

use crate::constants::*;
use crate::validation::{invalid, validate_page, validate_probability};

/// Which selection algorithm the wheel uses.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(try_from = "u8", into = "u8")]
pub enum GameMode {
    /// Twelve weighted prize options.
    #[default]
    Weighted,
    /// Single win rate with fixed win/lose labels.
    WinRate,
}

impl TryFrom<u8> for GameMode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Weighted),
            2 => Ok(Self::WinRate),
            other => Err(format!("invalid mode {}: must be 1 or 2", other)),
        }
    }
}

impl From<GameMode> for u8 {
    fn from(mode: GameMode) -> Self {
        match mode {
            GameMode::Weighted => 1,
            GameMode::WinRate => 2,
        }
    }
}

/// Page currently shown on the kiosk display.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Page {
    #[default]
    Lottery1,
    Lottery2,
    Advertisement,
}

impl Page {
    /// The lottery page that renders `mode`.
    pub fn lottery_for(mode: GameMode) -> Self {
        match mode {
            GameMode::Weighted => Page::Lottery1,
            GameMode::WinRate => Page::Lottery2,
        }
    }

    /// The mode a lottery page implies, if any.
    pub fn mode(self) -> Option<GameMode> {
        match self {
            Page::Lottery1 => Some(GameMode::Weighted),
            Page::Lottery2 => Some(GameMode::WinRate),
            Page::Advertisement => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PrizeOption {
    pub text: String,
    pub probability: f64,
}

impl PrizeOption {
    pub fn new(text: impl Into<String>, probability: f64) -> Self {
        Self { text: text.into(), probability }
    }
}

/// Persistent game configuration shared by the spin endpoint and the displays.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct GameConfig {
    pub mode: GameMode,
    pub mode1_options: Vec<PrizeOption>,
    pub mode2_win_text: String,
    pub mode2_lose_text: String,
    pub mode2_win_rate: f64,
    pub current_player: i32,
    pub remaining_spins: i32,
    pub total_spins: i32,
    pub current_page: Page,
}

impl Default for GameConfig {
    fn default() -> Self {
        let mut mode1_options: Vec<PrizeOption> = (1..SEGMENT_COUNT)
            .map(|n| PrizeOption::new(format!("奖品{}", n), 8.33))
            .collect();
        // The last slot absorbs the rounding so the sum is exactly 100.
        mode1_options.push(PrizeOption::new(format!("奖品{}", SEGMENT_COUNT), 8.37));

        Self {
            mode: GameMode::Weighted,
            mode1_options,
            mode2_win_text: DEFAULT_MODE2_WIN_TEXT.to_string(),
            mode2_lose_text: DEFAULT_MODE2_LOSE_TEXT.to_string(),
            mode2_win_rate: DEFAULT_MODE2_WIN_RATE,
            current_player: DEFAULT_PLAYER,
            remaining_spins: DEFAULT_REMAINING_SPINS,
            total_spins: 0,
            current_page: Page::Lottery1,
        }
    }
}

impl GameConfig {
    pub fn validate_config(&self) -> Result<(), ValidationError> {
        if self.current_player < 1 {
            return Err(invalid("invalid_player", "current player must be positive"));
        }
        if self.remaining_spins < 0 {
            return Err(invalid("invalid_remaining", "remaining spins cannot be negative"));
        }

        match self.mode {
            GameMode::Weighted => {
                if self.mode1_options.len() != SEGMENT_COUNT {
                    return Err(invalid(
                        "invalid_options",
                        format!("mode 1 must have exactly {} options", SEGMENT_COUNT),
                    ));
                }
                for (i, option) in self.mode1_options.iter().enumerate() {
                    if option.text.trim().is_empty() {
                        return Err(invalid(
                            "invalid_option",
                            format!("option {} text cannot be empty", i + 1),
                        ));
                    }
                    if validate_probability(option.probability).is_err() {
                        return Err(invalid(
                            "invalid_option",
                            format!("option {} probability must be between 0 and 100", i + 1),
                        ));
                    }
                }
                let total = self.total_probability();
                if (total - 100.0).abs() > PROBABILITY_TOLERANCE {
                    return Err(invalid(
                        "invalid_total",
                        format!("total probability must equal 100%, got {:.2}%", total),
                    ));
                }
            }
            GameMode::WinRate => {
                validate_probability(self.mode2_win_rate)
                    .map_err(|_| invalid("invalid_win_rate", "win rate must be between 0 and 100"))?;
                if self.mode2_win_text.trim().is_empty() || self.mode2_lose_text.trim().is_empty() {
                    return Err(invalid("invalid_mode2_text", "mode 2 win and lose text cannot be empty"));
                }
            }
        }

        Ok(())
    }

    pub fn total_probability(&self) -> f64 {
        self.mode1_options.iter().map(|o| o.probability).sum()
    }

    /// Shows `page` and aligns the mode with it when it is a lottery page.
    pub fn show_page(&mut self, page: Page) {
        self.current_page = page;
        if let Some(mode) = page.mode() {
            self.mode = mode;
        }
    }
}

/// Partial update: omitted fields keep their current value.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ConfigUpdateRequest {
    pub mode: Option<GameMode>,
    pub mode1_options: Option<Vec<PrizeOption>>,
    pub mode2_win_text: Option<String>,
    pub mode2_lose_text: Option<String>,
    pub mode2_win_rate: Option<f64>,
    pub current_player: Option<i32>,
    pub remaining_spins: Option<i32>,
}

impl ConfigUpdateRequest {
    pub fn apply_to(self, config: &mut GameConfig) {
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(options) = self.mode1_options {
            config.mode1_options = options;
        }
        if let Some(text) = self.mode2_win_text {
            config.mode2_win_text = text;
        }
        if let Some(text) = self.mode2_lose_text {
            config.mode2_lose_text = text;
        }
        if let Some(rate) = self.mode2_win_rate {
            config.mode2_win_rate = rate;
        }
        if let Some(player) = self.current_player {
            config.current_player = player;
        }
        if let Some(remaining) = self.remaining_spins {
            config.remaining_spins = remaining;
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct PageSwitchRequest {
    #[validate(custom = "validate_page")]
    pub page: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SpinResult {
    pub player: i32,
    pub prize: String,
    pub index: usize,
    pub timestamp: DateTime<Utc>,
    pub mode: GameMode,
}

impl SpinResult {
    pub fn is_within_retention(&self, now: DateTime<Utc>) -> bool {
        self.timestamp > now - Duration::hours(HISTORY_RETENTION_HOURS)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct SpinHistory {
    pub results: Vec<SpinResult>,
}

impl SpinHistory {
    /// Drops results that fell out of the retention window.
    pub fn retain_recent(&mut self, now: DateTime<Utc>) {
        self.results.retain(|r| r.is_within_retention(now));
    }
}
