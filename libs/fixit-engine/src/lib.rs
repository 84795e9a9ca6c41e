pub mod engine;
pub mod evaluator;
pub mod executor;
pub mod validator;

mod engine_tests;

pub use engine::{EngineConfig, EngineError};
pub use executor::Executor;
pub use validator::validate;
