//! Package name to folder index used for import quick fixes.
//! （套件名稱到資料夾的索引，用於 import 快速修正。）

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::files::odin_files_recursive;
use crate::imports::Namespace;

/// Where an indexed package lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageLocation {
    pub namespace: Namespace,
    /// `/`-separated path below the namespace root.
    pub relative: String,
    pub dir: PathBuf,
}

impl PackageLocation {
    /// `core:a/b`, `shared:x` or a project-relative path.
    pub fn reference(&self) -> String {
        match self.namespace {
            Namespace::Core => format!("core:{}", self.relative),
            Namespace::Shared => format!("shared:{}", self.relative),
            Namespace::Local => self.relative.clone(),
        }
    }

    /// Import path as it must be written in a file living in `from_dir`.
    pub fn import_path(&self, from_dir: Option<&Path>) -> String {
        match self.namespace {
            Namespace::Local => from_dir
                .and_then(|from| relative_path(from, &self.dir))
                .unwrap_or_else(|| self.relative.clone()),
            _ => self.reference(),
        }
    }
}

/// Import the host may offer to add for an unresolved receiver.
/// （可供宿主提示加入的 import 建議。）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSuggestion {
    pub package: String,
    pub location: PackageLocation,
    /// Full statement, e.g. `import "core:math/linalg"`.
    pub statement: String,
}

impl ImportSuggestion {
    pub fn label(&self) -> String {
        format!("Add {}", self.statement)
    }
}

/// Folders scanned by a rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexRoots {
    pub core: PathBuf,
    pub shared: PathBuf,
    pub project_folders: Vec<PathBuf>,
}

/// Basename of every package folder under the core, shared and project
/// roots. The first folder seen for a basename wins.
/// （核心、共享與專案根目錄下所有套件資料夾的索引。）
#[derive(Debug, Clone, Default)]
pub struct PackageIndex {
    packages: BTreeMap<String, PackageLocation>,
    built_at: Option<Instant>,
}

impl PackageIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans the roots without touching any index.
    pub fn build(roots: &IndexRoots) -> BTreeMap<String, PackageLocation> {
        let mut packages = BTreeMap::new();
        scan_root(&roots.core, Namespace::Core, &mut packages);
        scan_root(&roots.shared, Namespace::Shared, &mut packages);
        for folder in &roots.project_folders {
            if is_within(folder, &roots.shared) {
                debug!(folder = %folder.display(), "project folder already covered by shared root");
                continue;
            }
            scan_root(folder, Namespace::Local, &mut packages);
        }
        packages
    }

    /// Replaces the whole index.
    pub fn rebuild(&mut self, roots: &IndexRoots, now: Instant) {
        let started = Instant::now();
        self.packages = Self::build(roots);
        self.built_at = Some(now);
        info!(
            packages = self.packages.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "package index rebuilt"
        );
    }

    pub fn built_at(&self) -> Option<Instant> {
        self.built_at
    }

    /// True when never built, or built at least `max_age` before `now`.
    pub fn is_stale(&self, now: Instant, max_age: Duration) -> bool {
        match self.built_at {
            None => true,
            Some(built) => now.saturating_duration_since(built) >= max_age,
        }
    }

    pub fn get(&self, package: &str) -> Option<&PackageLocation> {
        self.packages.get(package)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PackageLocation)> {
        self.packages
            .iter()
            .map(|(name, location)| (name.as_str(), location))
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn suggest_import(&self, package: &str, from_dir: Option<&Path>) -> Option<ImportSuggestion> {
        let location = self.get(package)?;
        Some(ImportSuggestion {
            package: package.to_string(),
            statement: format!("import \"{}\"", location.import_path(from_dir)),
            location: location.clone(),
        })
    }
}

fn scan_root(root: &Path, namespace: Namespace, packages: &mut BTreeMap<String, PackageLocation>) {
    let mut seen = HashSet::new();
    for file in odin_files_recursive(root) {
        let Some(dir) = file.parent() else {
            continue;
        };
        if dir == root || !seen.insert(dir.to_path_buf()) {
            continue;
        }
        let Some(name) = dir.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        let Ok(relative) = dir.strip_prefix(root) else {
            continue;
        };
        packages
            .entry(name.to_string())
            .or_insert_with(|| PackageLocation {
                namespace,
                relative: slash_join(relative.components()),
                dir: dir.to_path_buf(),
            });
    }
}

fn slash_join<'a>(components: impl Iterator<Item = Component<'a>>) -> String {
    components
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn is_within(path: &Path, root: &Path) -> bool {
    let path = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let root = fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
    path.starts_with(root)
}

/// `/`-separated path leading from `from` to `to`, if they share a root.
pub fn relative_path(from: &Path, to: &Path) -> Option<String> {
    let from: Vec<Component<'_>> = from.components().collect();
    let to: Vec<Component<'_>> = to.components().collect();
    let common = from
        .iter()
        .zip(&to)
        .take_while(|(left, right)| left == right)
        .count();
    if common == 0 {
        return None;
    }
    let mut parts: Vec<String> = vec!["..".to_string(); from.len() - common];
    parts.extend(
        to[common..]
            .iter()
            .map(|component| component.as_os_str().to_string_lossy().into_owned()),
    );
    Some(if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    })
}
