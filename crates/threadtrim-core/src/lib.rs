// Container detection and content windowing for long conversation pages.

pub mod command;
pub mod config;
pub mod debug;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod locator;
pub mod navigation;
pub mod placeholder;
pub mod preferences;
pub mod resolver;
pub mod restore;
pub mod runtime;
pub mod scheduler;
pub mod session;
pub mod status;
pub mod test_utils;
pub mod window;

pub use command::{Request, Response};
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{Error, Result};
pub use preferences::{PreferenceStore, Preferences};
pub use status::{StatusEvent, StatusSink};
