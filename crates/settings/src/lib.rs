pub mod settings;

pub use settings::{expand_home, QuerySettings, Settings, SettingsError, SettingsStore};
