pub mod config;
pub mod error;
pub mod generate;
pub mod plan;
pub mod render;
pub mod storage;

pub use error::GenError;
