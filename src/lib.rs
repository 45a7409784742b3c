pub mod config;
pub mod error;
pub mod generator;
pub mod harness;
pub mod io;
pub mod path;
pub mod types;

pub use error::{Error, Result};
