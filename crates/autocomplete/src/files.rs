//! Chooses which source files feed a completion request.
//! （決定哪些原始檔提供本次補全的定義。）

use std::fs;
use std::path::{Path, PathBuf};

use odinsense_settings::Settings;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::imports::{AliasMap, BufferImports, Namespace};

const SOURCE_EXTENSION: &str = "odin";
const VCS_DIRS: &[&str] = &[".git", ".hg", ".svn"];

/// Filesystem roots the selector searches.
/// （選擇器搜尋的檔案系統根目錄。）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRoots {
    pub core: PathBuf,
    pub shared: PathBuf,
    pub builtin: PathBuf,
}

impl SearchRoots {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            core: settings.core_root(),
            shared: settings.shared_root(),
            builtin: settings.builtin_file(),
        }
    }
}

/// What the token before the dot refers to.
/// （點號前的識別字所指的對象。）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// No dot: the file's own scope.
    Naked,
    Package {
        namespace: Namespace,
        package: String,
        /// Import path as written, without its collection prefix.
        import_path: String,
    },
    /// A dot after something that is not an imported package.
    FieldAccess { receiver: String },
}

/// Resolves the word before the dot. Core imports win over shared ones,
/// shared over local.
pub fn resolve_target(word: Option<&str>, aliases: &AliasMap, imports: &BufferImports) -> Target {
    let Some(word) = word else {
        return Target::Naked;
    };
    let package = aliases.resolve(word);
    for namespace in [Namespace::Core, Namespace::Shared, Namespace::Local] {
        if let Some(import) = imports
            .in_namespace(namespace)
            .find(|import| import.package == package)
        {
            return Target::Package {
                namespace,
                package: package.to_string(),
                import_path: import.path.clone(),
            };
        }
    }
    Target::FieldAccess {
        receiver: word.to_string(),
    }
}

/// The builtin file when it exists, and the `.odin` files beside the
/// active file (the active file is always included).
pub fn naked_files(active_file: &Path, roots: &SearchRoots) -> (Option<PathBuf>, Vec<PathBuf>) {
    let builtin = roots.builtin.is_file().then(|| roots.builtin.clone());
    let mut local = active_file
        .parent()
        .map(odin_files_in)
        .unwrap_or_default();
    if !local.iter().any(|path| path == active_file) {
        local.push(active_file.to_path_buf());
    }
    (builtin, local)
}

/// Files of `package` under the namespace's root.
/// （在命名空間根目錄下收集套件的檔案。）
///
/// A file belongs to the package when its immediate parent folder is
/// named after it. Local imports that live outside the active folder's
/// tree are looked up through their relative import path instead.
pub fn package_files(
    active_file: &Path,
    namespace: Namespace,
    package: &str,
    import_path: &str,
    roots: &SearchRoots,
) -> Vec<PathBuf> {
    let active_dir = active_file.parent().unwrap_or_else(|| Path::new("."));
    let root = match namespace {
        Namespace::Local => active_dir,
        Namespace::Core => roots.core.as_path(),
        Namespace::Shared => roots.shared.as_path(),
    };
    let mut files = collect_package_files(root, package);
    if files.is_empty() && namespace == Namespace::Local {
        let direct = active_dir.join(import_path);
        debug!(dir = %direct.display(), package, "falling back to relative import path");
        files = odin_files_in(&direct)
            .into_iter()
            .filter(|file| package != "os" || is_os_file(file))
            .collect();
    }
    files
}

pub fn collect_package_files(root: &Path, package: &str) -> Vec<PathBuf> {
    odin_files_recursive(root)
        .into_iter()
        .filter(|file| parent_name(file) == Some(package))
        .filter(|file| package != "os" || is_os_file(file))
        .collect()
}

/// `os` is split per platform; only the shared file and the current
/// platform's file are read.
fn is_os_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };
    name == "os.odin" || name == format!("os_{}.odin", platform_name())
}

/// Platform suffix used by Odin's per-platform source files.
pub fn platform_name() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
}

fn parent_name(path: &Path) -> Option<&str> {
    path.parent()?.file_name()?.to_str()
}

pub fn is_odin_file(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some(SOURCE_EXTENSION)
}

fn is_vcs_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map(|name| VCS_DIRS.contains(&name))
            .unwrap_or(false)
}

/// Every `.odin` file below `root`, sorted, skipping VCS metadata.
pub fn odin_files_recursive(root: &Path) -> Vec<PathBuf> {
    if !root.is_dir() {
        debug!(root = %root.display(), "search root does not exist");
        return Vec::new();
    }
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_vcs_dir(entry))
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && is_odin_file(entry.path()))
        .map(DirEntry::into_path)
        .collect()
}

/// `.odin` files directly inside `dir`, sorted.
pub fn odin_files_in(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_odin_file(path))
        .collect();
    files.sort();
    files
}
