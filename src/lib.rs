mod error;
pub use error::*;

pub mod api;
pub mod config;
pub mod context;
pub mod crypto;
pub mod database;
pub mod models;
pub mod schema;
pub(crate) mod time_utils;
