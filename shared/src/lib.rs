pub mod constants;
pub mod events;
pub mod prize_selector;
pub mod restaurant;
pub mod shared_wheel_game;
pub mod validation;
