pub mod config;
pub mod consumer;
pub mod error;
pub mod formatter;
pub mod message;
pub mod metadata;
pub mod pool;
pub mod producer;
pub mod stream;
pub mod value;

pub use mux_api_derive::ConfigParams;
