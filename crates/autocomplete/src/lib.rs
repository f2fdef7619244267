//! Completion indexing for Odin sources: file selection, caching and the
//! request/save entry points an editor drives.
//! （Odin 原始碼的補全索引：檔案選擇、快取與編輯器呼叫的進入點。）

mod cache;
mod completion;
mod context;
mod external;
mod files;
mod host;
mod imports;
mod package_index;
mod ranking;
mod service;

pub use cache::CompletionCache;
pub use completion::{
    completions_from_definitions, completions_from_source, constant_completion,
    definition_completion, expand_overload_group, module_completion, procedure_completion,
    type_completion, Completion, CompletionKind, PackageCompletions,
};
pub use context::{is_identifier_char, typed_prefix, word_before_dot, CursorScope};
pub use external::{completion_from_query, package_completions};
pub use files::{
    collect_package_files, is_odin_file, naked_files, odin_files_in, odin_files_recursive,
    package_files, platform_name, resolve_target, SearchRoots, Target,
};
pub use host::{read_source, EditorHost, FileSystemHost};
pub use imports::{insert_import, AliasMap, BufferImports, Import, Namespace};
pub use package_index::{
    relative_path, ImportSuggestion, IndexRoots, PackageIndex, PackageLocation,
};
pub use ranking::{match_quality, rank_completions};
pub use service::{CompletionRequest, Indexer, IndexerError};
