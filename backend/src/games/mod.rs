pub mod backend_wheel_game;
pub mod spin_coordinator;
