pub mod catalog;
pub mod settings;

pub use catalog::{Catalog, ChunkedDataTypeConfig, DataTypeConfig, DEFAULT_CHUNK_SIZE};
pub use settings::{RunSettings, SampleSelection};
