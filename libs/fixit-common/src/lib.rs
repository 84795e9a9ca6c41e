pub mod config;
pub mod error;
pub mod game;
pub mod progress;
pub mod redis;
pub mod types;
