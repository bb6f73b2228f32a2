pub mod api;
pub mod args;
pub mod commands;
mod config;
mod error;
pub mod model;
pub mod sync;
pub mod tree;
mod utils;
mod workspace;

pub use api::Mode;
pub use config::Config;
pub use error::{Error, Result, TreeError, TreeResult};
pub use workspace::Snapshot;
