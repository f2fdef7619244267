//! Editor seam: buffers, project folders and user-facing notices.
//! （編輯器介面：緩衝區、專案資料夾與使用者提示。）

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::package_index::ImportSuggestion;
use crate::IndexerError;

/// Services the indexer asks of the editor hosting it.
/// （索引器向宿主編輯器要求的服務。）
pub trait EditorHost {
    /// Unsaved contents of an open buffer, if the host has one for `path`.
    fn buffer_text(&self, _path: &Path) -> Option<String> {
        None
    }

    fn project_folders(&self) -> Vec<PathBuf> {
        Vec::new()
    }

    fn show_status_message(&self, _message: &str) {}

    fn offer_quick_fix(&self, _suggestion: &ImportSuggestion) {}
}

/// Reads `path` from the host's buffer, falling back to disk.
pub fn read_source(host: &dyn EditorHost, path: &Path) -> Result<String, IndexerError> {
    if let Some(text) = host.buffer_text(path) {
        return Ok(text);
    }
    fs::read_to_string(path).map_err(|source| IndexerError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Host backed by the filesystem alone. Status messages go to the log and
/// are kept, as are offered quick fixes.
/// （僅以檔案系統為後端的宿主。）
#[derive(Debug, Default)]
pub struct FileSystemHost {
    folders: Vec<PathBuf>,
    buffers: HashMap<PathBuf, String>,
    messages: RefCell<Vec<String>>,
    quick_fixes: RefCell<Vec<ImportSuggestion>>,
}

impl FileSystemHost {
    pub fn new(folders: Vec<PathBuf>) -> Self {
        Self {
            folders,
            ..Self::default()
        }
    }

    /// Serves `text` instead of the file on disk.
    pub fn with_buffer(mut self, path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        self.buffers.insert(path.into(), text.into());
        self
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.borrow().clone()
    }

    pub fn quick_fixes(&self) -> Vec<ImportSuggestion> {
        self.quick_fixes.borrow().clone()
    }
}

impl EditorHost for FileSystemHost {
    fn buffer_text(&self, path: &Path) -> Option<String> {
        self.buffers.get(path).cloned()
    }

    fn project_folders(&self) -> Vec<PathBuf> {
        self.folders.clone()
    }

    fn show_status_message(&self, message: &str) {
        info!(target: "odinsense::status", "{message}");
        self.messages.borrow_mut().push(message.to_string());
    }

    fn offer_quick_fix(&self, suggestion: &ImportSuggestion) {
        info!(
            target: "odinsense::status",
            package = %suggestion.package,
            "quick fix available: {}",
            suggestion.label()
        );
        self.quick_fixes.borrow_mut().push(suggestion.clone());
    }
}
