pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod page;

pub use threadtrim_core::{config, preferences};
