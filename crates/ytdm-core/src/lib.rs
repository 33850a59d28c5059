pub mod admission;
pub mod config;
pub mod engine;
pub mod error;
pub mod info;
pub mod logging;
pub mod parser;
pub mod registry;
pub mod request;
pub mod supervisor;

pub use engine::Engine;
pub use error::EngineError;
