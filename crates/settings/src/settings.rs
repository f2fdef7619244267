//! Indexer settings and their JSON store.
//! （索引器設定與其 JSON 儲存。）
//!
//! Every key has a default, so partial files and unknown keys load cleanly.
//! Out-of-range values are clamped by [`Settings::sanitize`].

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const SETTINGS_VERSION: u32 = 1;

/// Failures while loading or persisting the settings file.
/// （載入或儲存設定檔時的失敗。）
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("settings file {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl SettingsError {
    fn io(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn json(path: &Path) -> impl FnOnce(serde_json::Error) -> Self + '_ {
        move |source| Self::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Indexer configuration, one key per externally configurable constant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default = "default_install_path")]
    pub odin_install_path: String,
    /// Overrides `<install>/core`.
    #[serde(default)]
    pub core_root: Option<String>,
    /// Overrides `<install>/shared`.
    #[serde(default)]
    pub shared_root: Option<String>,
    /// Overrides `<install>/base/builtin/builtin.odin`.
    #[serde(default)]
    pub builtin_file: Option<String>,
    #[serde(default = "default_full_reindex_interval")]
    pub full_reindex_interval_secs: u64,
    #[serde(default = "default_save_reindex_min_interval")]
    pub save_reindex_min_interval_secs: u64,
    /// Zero keeps cached completions until they are invalidated explicitly.
    #[serde(default)]
    pub completion_cache_ttl_secs: u64,
    #[serde(default = "default_true")]
    pub strip_comments: bool,
    #[serde(default)]
    pub odin_query: QuerySettings,
}

fn default_version() -> u32 {
    SETTINGS_VERSION
}

fn default_install_path() -> String {
    "~/odin".to_string()
}

fn default_full_reindex_interval() -> u64 {
    600
}

fn default_save_reindex_min_interval() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            odin_install_path: default_install_path(),
            core_root: None,
            shared_root: None,
            builtin_file: None,
            full_reindex_interval_secs: default_full_reindex_interval(),
            save_reindex_min_interval_secs: default_save_reindex_min_interval(),
            completion_cache_ttl_secs: 0,
            strip_comments: true,
            odin_query: QuerySettings::default(),
        }
    }
}

impl Settings {
    pub fn sanitize(&mut self) {
        if self.version == 0 {
            self.version = SETTINGS_VERSION;
        }
        if self.odin_install_path.trim().is_empty() {
            self.odin_install_path = default_install_path();
        }
        for root in [
            &mut self.core_root,
            &mut self.shared_root,
            &mut self.builtin_file,
        ] {
            if root.as_deref().is_some_and(|value| value.trim().is_empty()) {
                *root = None;
            }
        }
        if self.full_reindex_interval_secs == 0 {
            self.full_reindex_interval_secs = default_full_reindex_interval();
        }
        self.odin_query.sanitize();
    }

    pub fn install_path(&self) -> PathBuf {
        expand_home(&self.odin_install_path)
    }

    /// Root of the bundled `core:` collection.
    pub fn core_root(&self) -> PathBuf {
        self.core_root
            .as_deref()
            .map(expand_home)
            .unwrap_or_else(|| self.install_path().join("core"))
    }

    /// Root of the `shared:` collection.
    pub fn shared_root(&self) -> PathBuf {
        self.shared_root
            .as_deref()
            .map(expand_home)
            .unwrap_or_else(|| self.install_path().join("shared"))
    }

    /// File whose definitions are offered on every naked completion.
    pub fn builtin_file(&self) -> PathBuf {
        self.builtin_file
            .as_deref()
            .map(expand_home)
            .unwrap_or_else(|| {
                self.install_path()
                    .join("base")
                    .join("builtin")
                    .join("builtin.odin")
            })
    }

    pub fn full_reindex_interval(&self) -> Duration {
        Duration::from_secs(self.full_reindex_interval_secs)
    }

    pub fn save_reindex_min_interval(&self) -> Duration {
        Duration::from_secs(self.save_reindex_min_interval_secs)
    }

    pub fn completion_cache_ttl(&self) -> Option<Duration> {
        (self.completion_cache_ttl_secs > 0)
            .then(|| Duration::from_secs(self.completion_cache_ttl_secs))
    }
}

/// Settings for the optional `odin query` indexing path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_executable")]
    pub executable: String,
    #[serde(default = "default_query_timeout")]
    pub timeout_ms: u64,
}

fn default_executable() -> String {
    "odin".to_string()
}

fn default_query_timeout() -> u64 {
    5_000
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            executable: default_executable(),
            timeout_ms: default_query_timeout(),
        }
    }
}

impl QuerySettings {
    fn sanitize(&mut self) {
        if self.executable.trim().is_empty() {
            self.executable = default_executable();
        }
        self.timeout_ms = self.timeout_ms.clamp(100, 120_000);
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Expands a leading `~` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    let rest = if path == "~" {
        Some("")
    } else {
        path.strip_prefix("~/")
            .or_else(|| path.strip_prefix("~\\"))
    };
    match (rest, dirs::home_dir()) {
        (Some(rest), Some(home)) if rest.is_empty() => home,
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

/// Settings bound to the JSON file they were loaded from.
/// （與來源 JSON 檔案綁定的設定。）
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    data: Settings,
}

impl SettingsStore {
    /// Reads `path`; a missing file yields sanitized defaults without creating it.
    /// （讀取 `path`；檔案不存在時回傳預設值且不建立檔案。）
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref().to_path_buf();
        let mut data = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(SettingsError::json(&path))?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => Settings::default(),
            Err(err) => return Err(SettingsError::io(&path)(err)),
        };
        data.sanitize();
        Ok(Self { path, data })
    }

    pub fn settings(&self) -> &Settings {
        &self.data
    }

    pub fn into_settings(self) -> Settings {
        self.data
    }

    /// Applies `op`, re-sanitizes and writes the file through a temporary sibling.
    /// （套用 `op` 後重新整理數值，並經由暫存檔寫回。）
    pub fn update<F>(&mut self, op: F) -> Result<(), SettingsError>
    where
        F: FnOnce(&mut Settings),
    {
        op(&mut self.data);
        self.data.sanitize();
        self.persist()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(SettingsError::io(parent))?;
        }
        let payload =
            serde_json::to_vec_pretty(&self.data).map_err(SettingsError::json(&self.path))?;
        let staging = self.path.with_extension("tmp");
        fs::write(&staging, payload).map_err(SettingsError::io(&staging))?;
        fs::rename(&staging, &self.path).map_err(SettingsError::io(&self.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::load(dir.path().join("odinsense.json")).unwrap();
        let settings = store.settings();
        assert_eq!(settings.odin_install_path, "~/odin");
        assert_eq!(settings.full_reindex_interval_secs, 600);
        assert_eq!(settings.save_reindex_min_interval_secs, 60);
        assert!(settings.completion_cache_ttl().is_none());
        assert!(!settings.odin_query.enabled);
    }

    #[test]
    fn partial_file_fills_remaining_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("odinsense.json");
        fs::write(
            &path,
            r#"{ "odin_install_path": "/opt/odin", "shared_root": "", "odin_query": { "enabled": true } }"#,
        )
        .unwrap();

        let settings = SettingsStore::load(&path).unwrap().into_settings();
        assert_eq!(settings.core_root(), PathBuf::from("/opt/odin/core"));
        assert_eq!(settings.shared_root, None);
        assert_eq!(settings.shared_root(), PathBuf::from("/opt/odin/shared"));
        assert_eq!(
            settings.builtin_file(),
            PathBuf::from("/opt/odin/base/builtin/builtin.odin")
        );
        assert!(settings.odin_query.enabled);
        assert_eq!(settings.odin_query.executable, "odin");
    }

    #[test]
    fn explicit_roots_override_install_path() {
        let settings = Settings {
            odin_install_path: "/opt/odin".into(),
            core_root: Some("/src/odin-core".into()),
            shared_root: Some("/src/libs".into()),
            ..Settings::default()
        };
        assert_eq!(settings.core_root(), PathBuf::from("/src/odin-core"));
        assert_eq!(settings.shared_root(), PathBuf::from("/src/libs"));
    }

    #[test]
    fn update_persists_and_sanitizes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("odinsense.json");
        let mut store = SettingsStore::load(&path).unwrap();
        store
            .update(|settings| {
                settings.full_reindex_interval_secs = 0;
                settings.completion_cache_ttl_secs = 30;
            })
            .unwrap();

        let reloaded = SettingsStore::load(&path).unwrap();
        assert_eq!(reloaded.settings().full_reindex_interval_secs, 600);
        assert_eq!(
            reloaded.settings().completion_cache_ttl(),
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn malformed_file_reports_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("odinsense.json");
        fs::write(&path, "{ not json").unwrap();
        let err = SettingsStore::load(&path).unwrap_err();
        assert!(matches!(err, SettingsError::Json { .. }));
    }

    #[test]
    fn home_expansion_only_touches_leading_tilde() {
        assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
        assert_eq!(expand_home("rel/~/x"), PathBuf::from("rel/~/x"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/odin"), home.join("odin"));
            assert_eq!(expand_home("~"), home);
        }
    }
}
