pub mod config;
pub mod data_loader;
pub mod error;
pub mod filter;
pub mod fusion;
pub mod text_util;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
