//! The indexer: answers completion requests and reacts to saves.
//! （索引器：回應補全請求並處理存檔事件。）

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use odinsense_query::{OdinQuery, QueryError};
use odinsense_settings::Settings;
use odinsense_symbols::NormalizeOptions;
use thiserror::Error;
use tracing::{debug, warn};

use crate::cache::CompletionCache;
use crate::completion::{module_completion, Completion, PackageCompletions};
use crate::context::{word_before_dot, CursorScope};
use crate::external;
use crate::files::{naked_files, package_files, resolve_target, SearchRoots, Target};
use crate::host::{read_source, EditorHost};
use crate::imports::{AliasMap, BufferImports, Namespace};
use crate::package_index::{IndexRoots, PackageIndex};

#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Query(#[from] QueryError),
}

/// One completion request from the editor.
/// （編輯器送出的單次補全請求。）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub path: PathBuf,
    /// Text of the cursor's line.
    pub line_text: String,
    /// Byte offset of the cursor within `line_text`.
    pub cursor: usize,
    pub scope: CursorScope,
}

impl CompletionRequest {
    pub fn new(path: impl Into<PathBuf>, line_text: impl Into<String>, cursor: usize) -> Self {
        Self {
            path: path.into(),
            line_text: line_text.into(),
            cursor,
            scope: CursorScope::default(),
        }
    }

    /// Request with the cursor at the end of `line_text`.
    pub fn at_line_end(path: impl Into<PathBuf>, line_text: impl Into<String>) -> Self {
        let line_text = line_text.into();
        let cursor = line_text.len();
        Self::new(path, line_text, cursor)
    }

    pub fn with_scope(mut self, scope: CursorScope) -> Self {
        self.scope = scope;
        self
    }
}

/// Long-lived indexer state, owned by a single editor session.
/// （單一編輯器工作階段持有的長期索引狀態。）
#[derive(Debug)]
pub struct Indexer {
    settings: Settings,
    roots: SearchRoots,
    normalize: NormalizeOptions,
    cache: CompletionCache,
    aliases: AliasMap,
    packages: PackageIndex,
}

impl Indexer {
    pub fn new(settings: Settings) -> Self {
        Self {
            roots: SearchRoots::from_settings(&settings),
            normalize: NormalizeOptions {
                strip_comments: settings.strip_comments,
            },
            cache: CompletionCache::with_max_age(settings.completion_cache_ttl()),
            aliases: AliasMap::new(),
            packages: PackageIndex::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn roots(&self) -> &SearchRoots {
        &self.roots
    }

    pub fn cache(&self) -> &CompletionCache {
        &self.cache
    }

    /// Aliases of the buffer seen by the latest request.
    pub fn aliases(&self) -> &AliasMap {
        &self.aliases
    }

    pub fn package_index(&self) -> &PackageIndex {
        &self.packages
    }

    pub fn on_completion_request(
        &mut self,
        host: &dyn EditorHost,
        request: &CompletionRequest,
    ) -> Vec<Completion> {
        self.on_completion_request_at(host, request, Instant::now())
    }

    /// Produces the completions for `request`, treating `now` as the
    /// current time for cache ageing and reindex scheduling.
    pub fn on_completion_request_at(
        &mut self,
        host: &dyn EditorHost,
        request: &CompletionRequest,
        now: Instant,
    ) -> Vec<Completion> {
        if !request.scope.allows_completion() {
            debug!(path = %request.path.display(), "completion suppressed inside comment or string");
            return Vec::new();
        }
        let started = Instant::now();

        let text = match read_source(host, &request.path) {
            Ok(text) => text,
            Err(err) => {
                warn!(error = %err, "cannot read active file");
                host.show_status_message(&format!("Odin autocompletion failed: {err}"));
                return Vec::new();
            }
        };
        let imports = BufferImports::parse(&text);
        self.aliases.rebuild(&imports);
        let own_key = cache_key(imports.package.as_deref(), &request.path);
        self.cache.invalidate(&own_key);

        if self
            .packages
            .is_stale(now, self.settings.full_reindex_interval())
        {
            self.reindex(host, request.path.parent(), now);
        }

        let word = word_before_dot(&request.line_text, request.cursor);
        let mut completions = Vec::new();
        let mut paths = 0;
        match resolve_target(word, &self.aliases, &imports) {
            Target::Naked => {
                completions.extend(
                    self.aliases
                        .iter()
                        .map(|(alias, package)| module_completion(alias, package)),
                );
                let (builtin, local) = naked_files(&request.path, &self.roots);
                if let Some(builtin) = builtin {
                    paths += 1;
                    let key = builtin.display().to_string();
                    let list = self.cached_completions(host, &key, &[builtin], Some("builtin"), now);
                    completions.extend(list.iter().cloned());
                }
                paths += local.len();
                let list = self.cached_completions(host, &own_key, &local, None, now);
                completions.extend(list.iter().cloned());
            }
            Target::Package { .. } | Target::FieldAccess { .. } if imports.package.is_none() => {
                debug!(path = %request.path.display(), "no package declaration; package lookups disabled");
            }
            Target::Package {
                namespace,
                package,
                import_path,
            } => {
                let (list, read) = self.package_completions(
                    host,
                    &request.path,
                    imports.package.as_deref(),
                    namespace,
                    &package,
                    &import_path,
                    now,
                );
                paths += read;
                completions.extend(list.iter().cloned());
            }
            Target::FieldAccess { receiver } => {
                if let Some(suggestion) = self
                    .packages
                    .suggest_import(&receiver, request.path.parent())
                {
                    host.offer_quick_fix(&suggestion);
                }
            }
        }

        host.show_status_message(&format!(
            "Odin autocompletion took {}ms. Completions: {}. Paths: {}",
            started.elapsed().as_millis(),
            completions.len(),
            paths
        ));
        completions
    }

    pub fn on_save(&mut self, host: &dyn EditorHost, path: &Path, folder: Option<&Path>) -> bool {
        self.on_save_at(host, path, folder, Instant::now())
    }

    /// Drops the saved file's package from the cache and rebuilds the
    /// package index unless it was rebuilt recently. Returns whether a
    /// rebuild happened.
    /// （存檔時清除該套件快取，並視需要重建套件索引。）
    pub fn on_save_at(
        &mut self,
        host: &dyn EditorHost,
        path: &Path,
        folder: Option<&Path>,
        now: Instant,
    ) -> bool {
        let package = read_source(host, path)
            .ok()
            .and_then(|text| BufferImports::parse(&text).package);
        self.cache.invalidate(&cache_key(package.as_deref(), path));

        if !self
            .packages
            .is_stale(now, self.settings.save_reindex_min_interval())
        {
            debug!(path = %path.display(), "package index rebuilt recently; skipping");
            return false;
        }
        self.reindex(host, folder.or_else(|| path.parent()), now);
        true
    }

    /// Forgets the cached completions of `package`.
    pub fn invalidate(&mut self, package: &str) -> bool {
        self.cache.invalidate(package)
    }

    /// Rebuilds the package index from the roots, the host's project
    /// folders and `extra_folder`.
    pub fn reindex(&mut self, host: &dyn EditorHost, extra_folder: Option<&Path>, now: Instant) {
        let mut project_folders = host.project_folders();
        if let Some(folder) = extra_folder.filter(|folder| !folder.as_os_str().is_empty()) {
            if !project_folders.iter().any(|known| known == folder) {
                project_folders.push(folder.to_path_buf());
            }
        }
        let roots = IndexRoots {
            core: self.roots.core.clone(),
            shared: self.roots.shared.clone(),
            project_folders,
        };
        self.packages.rebuild(&roots, now);
    }

    #[allow(clippy::too_many_arguments)]
    fn package_completions(
        &mut self,
        host: &dyn EditorHost,
        active: &Path,
        own_package: Option<&str>,
        namespace: Namespace,
        package: &str,
        import_path: &str,
        now: Instant,
    ) -> (Arc<Vec<Completion>>, usize) {
        if let Some(hit) = self.cache.get_at(package, now) {
            return (hit, 0);
        }
        if self.settings.odin_query.enabled {
            match self.run_query(active, own_package, now) {
                Ok(stored) => {
                    debug!(stored, "odin query populated the cache");
                    if let Some(hit) = self.cache.get_at(package, now) {
                        return (hit, 0);
                    }
                }
                Err(err) => {
                    warn!(error = %err, "odin query failed; falling back to pattern extraction");
                    host.show_status_message(&format!(
                        "odin query failed, using pattern index: {err}"
                    ));
                }
            }
        }
        let files = package_files(active, namespace, package, import_path, &self.roots);
        let read = files.len();
        (
            self.cached_completions(host, package, &files, Some(package), now),
            read,
        )
    }

    /// Stores the completions of every package the report mentions,
    /// except the active one, and returns how many were stored.
    fn run_query(
        &mut self,
        active: &Path,
        own_package: Option<&str>,
        now: Instant,
    ) -> Result<usize, IndexerError> {
        let query = OdinQuery::new(
            self.settings.odin_query.executable.clone(),
            self.settings.odin_query.timeout(),
        );
        let output = query.run(active)?;
        let mut stored = 0;
        for package in &output.packages {
            if Some(package.name.as_str()) == own_package {
                continue;
            }
            let completions = external::package_completions(&output, &package.name);
            self.cache.insert_at(package.name.clone(), completions, now);
            stored += 1;
        }
        Ok(stored)
    }

    fn cached_completions(
        &mut self,
        host: &dyn EditorHost,
        key: &str,
        files: &[PathBuf],
        provenance: Option<&str>,
        now: Instant,
    ) -> Arc<Vec<Completion>> {
        let options = self.normalize;
        self.cache.get_or_compute_at(key, now, || {
            completions_for_files(host, files, provenance, &options)
        })
    }
}

/// Package name when the file declares one, else the file path.
fn cache_key(package: Option<&str>, path: &Path) -> String {
    package
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}

/// Completions of `files` in order, as one package. Unreadable files are
/// skipped; without a fixed provenance each file is labelled by its name.
fn completions_for_files(
    host: &dyn EditorHost,
    files: &[PathBuf],
    provenance: Option<&str>,
    options: &NormalizeOptions,
) -> Vec<Completion> {
    let mut package = PackageCompletions::new();
    for file in files {
        let text = match read_source(host, file) {
            Ok(text) => text,
            Err(err) => {
                debug!(error = %err, "skipping unreadable file");
                continue;
            }
        };
        let label = provenance.map(str::to_string).unwrap_or_else(|| {
            file.file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default()
        });
        package.add_source(&text, &label, options);
    }
    package.finish()
}
