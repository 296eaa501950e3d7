//! Renderers for exported entities.

pub mod delimited;
pub mod json;

pub use delimited::CsvRenderer;
pub use json::JsonRenderer;
