//! Package declaration and import parsing plus alias resolution.
//! （解析套件宣告與 import，並解析別名。）

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static PACKAGE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*package[ \t]+([A-Za-z_]\w*)").expect("package pattern must compile")
});

static IMPORT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^[ \t]*import[ \t]+(?:([A-Za-z_]\w*)[ \t]+)?"([^"\r\n]+)""#)
        .expect("import pattern must compile")
});

/// Where an imported package lives.
/// （被匯入套件所在的命名空間。）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Namespace {
    /// Relative to the importing file's folder.
    Local,
    Core,
    Shared,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Local => "local",
            Namespace::Core => "core",
            Namespace::Shared => "shared",
        }
    }
}

/// One `import` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub alias: Option<String>,
    /// Canonical package name: the last segment of the import path.
    pub package: String,
    /// Import path without its collection prefix.
    pub path: String,
    pub namespace: Namespace,
}

impl Import {
    /// Name the importing file refers to the package by.
    pub fn local_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.package)
    }
}

/// Everything the import parser learns from one buffer.
/// （單一緩衝區的套件宣告與 import 清單。）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferImports {
    pub package: Option<String>,
    /// Imports in source order.
    pub imports: Vec<Import>,
}

impl BufferImports {
    pub fn parse(text: &str) -> Self {
        let package = PACKAGE_PATTERN
            .captures(text)
            .and_then(|captures| captures.get(1))
            .map(|name| name.as_str().to_string());

        let imports = IMPORT_PATTERN
            .captures_iter(text)
            .filter_map(|captures| {
                let alias = captures.get(1).map(|alias| alias.as_str().to_string());
                let raw = captures.get(2)?.as_str();
                parse_import_path(raw, alias)
            })
            .collect();

        Self { package, imports }
    }

    pub fn in_namespace(&self, namespace: Namespace) -> impl Iterator<Item = &Import> {
        self.imports
            .iter()
            .filter(move |import| import.namespace == namespace)
    }

    /// First import of the canonical package `package`, if any.
    pub fn find(&self, package: &str) -> Option<&Import> {
        self.imports.iter().find(|import| import.package == package)
    }
}

fn parse_import_path(raw: &str, alias: Option<String>) -> Option<Import> {
    let (namespace, path) = match raw.split_once(':') {
        Some(("core", path)) => (Namespace::Core, path),
        Some(("shared", path)) => (Namespace::Shared, path),
        Some((collection, _)) => {
            debug!(import = raw, collection, "skipping import from unindexed collection");
            return None;
        }
        None => (Namespace::Local, raw),
    };
    let path = path.replace('\\', "/");
    let package = path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..")?
        .to_string();
    Some(Import {
        alias,
        package,
        path,
        namespace,
    })
}

/// Alias to canonical package name, in first-insertion order.
/// （別名到套件名稱的對應，保留首次插入順序。）
///
/// Re-inserting an alias replaces its package but keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasMap {
    entries: Vec<(String, String)>,
}

impl AliasMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_imports(imports: &BufferImports) -> Self {
        let mut map = Self::new();
        map.rebuild(imports);
        map
    }

    /// Replaces every entry with the aliases declared by `imports`.
    pub fn rebuild(&mut self, imports: &BufferImports) {
        self.entries.clear();
        for import in &imports.imports {
            self.insert(import.local_name(), &import.package);
        }
    }

    pub fn insert(&mut self, alias: &str, package: &str) {
        match self.entries.iter_mut().find(|(existing, _)| existing == alias) {
            Some(entry) => entry.1 = package.to_string(),
            None => self.entries.push((alias.to_string(), package.to_string())),
        }
    }

    pub fn get(&self, alias: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == alias)
            .map(|(_, package)| package.as_str())
    }

    /// Canonical package for `token`, or the token itself when it is no alias.
    pub fn resolve<'a>(&'a self, token: &'a str) -> &'a str {
        self.get(token).unwrap_or(token)
    }

    /// First alias that maps to `package`, or `package` itself.
    pub fn alias_for_package<'a>(&'a self, package: &'a str) -> &'a str {
        self.entries
            .iter()
            .find(|(_, target)| target == package)
            .map_or(package, |(alias, _)| alias.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(alias, package)| (alias.as_str(), package.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Inserts `statement` after the last import line, or after the package
/// declaration when the file has no imports yet.
/// （在最後一個 import 之後插入新的 import 敘述。）
pub fn insert_import(text: &str, statement: &str) -> String {
    let anchor = IMPORT_PATTERN
        .find_iter(text)
        .last()
        .or_else(|| PACKAGE_PATTERN.find(text))
        .map(|found| line_end(text, found.end()));

    let mut output = String::with_capacity(text.len() + statement.len() + 2);
    match anchor {
        Some(at) => {
            output.push_str(&text[..at]);
            if !output.ends_with('\n') {
                output.push('\n');
            }
            output.push_str(statement);
            output.push('\n');
            output.push_str(&text[at..]);
        }
        None => {
            output.push_str(statement);
            output.push('\n');
            output.push_str(text);
        }
    }
    output
}

fn line_end(text: &str, from: usize) -> usize {
    text[from..]
        .find('\n')
        .map_or(text.len(), |offset| from + offset + 1)
}
