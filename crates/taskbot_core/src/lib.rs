pub mod bot;
pub mod config;
pub mod error;
pub mod handlers;
pub mod message;
pub mod model;
pub mod pending;
pub mod storage;
pub mod task_store;

pub use bot::Bot;
