pub mod config;
pub mod error;
pub mod types;

pub use config::{Settings, SettingsHandle};
pub use error::{Result, TweekError};
pub use types::*;
