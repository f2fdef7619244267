//! Turns extracted definitions into editor completion entries.
//! （將擷取到的定義轉換成編輯器補全項目。）

use odinsense_symbols::{extract_definitions, normalize, Definition, DefinitionKind, NormalizeOptions};
use serde::Serialize;

/// Type of symbol a completion inserts.
/// （補全項目所插入符號的類型。）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionKind {
    Type,
    Constant,
    Procedure,
    ProcedureGroup,
    Variable,
    Module,
}

impl From<DefinitionKind> for CompletionKind {
    fn from(kind: DefinitionKind) -> Self {
        match kind {
            DefinitionKind::Type => CompletionKind::Type,
            DefinitionKind::Constant => CompletionKind::Constant,
            DefinitionKind::Procedure => CompletionKind::Procedure,
            DefinitionKind::ProcedureGroup => CompletionKind::ProcedureGroup,
        }
    }
}

/// Single completion entry. The label carries a tab-separated annotation.
/// （單一補全項目，標籤以 tab 分隔附註。）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Completion {
    pub label: String,
    pub insert_text: String,
    pub kind: CompletionKind,
}

impl Completion {
    pub fn new(label: impl Into<String>, insert_text: impl Into<String>, kind: CompletionKind) -> Self {
        Self {
            label: label.into(),
            insert_text: insert_text.into(),
            kind,
        }
    }

    /// Symbol name the entry completes, without signature or annotation.
    pub fn name(&self) -> &str {
        let end = self
            .label
            .find(|ch| ch == '(' || ch == '\t')
            .unwrap_or(self.label.len());
        &self.label[..end]
    }

    /// Annotation shown after the tab, if any.
    pub fn annotation(&self) -> Option<&str> {
        self.label.split_once('\t').map(|(_, annotation)| annotation)
    }

    /// Clones the entry under another name when both its label and its
    /// insert text start with `from`.
    fn renamed(&self, from: &str, to: &str, kind: CompletionKind) -> Option<Self> {
        let label = self.label.strip_prefix(from)?;
        let insert_text = self.insert_text.strip_prefix(from)?;
        Some(Self::new(
            format!("{to}{label}"),
            format!("{to}{insert_text}"),
            kind,
        ))
    }
}

/// Builds `name(p1, p2) -> R` with one tab stop per parameter.
/// （建立程序補全：每個參數對應一個 tab stop。）
pub fn procedure_completion(
    name: &str,
    params: &[String],
    return_type: Option<&str>,
    provenance: &str,
) -> Completion {
    let mut label = format!("{name}({})", params.join(", "));
    if let Some(ret) = return_type.filter(|ret| !ret.is_empty()) {
        label.push_str(" -> ");
        label.push_str(ret);
    }
    label.push('\t');
    label.push_str(provenance);

    let stops: Vec<String> = params
        .iter()
        .enumerate()
        .map(|(index, param)| format!("${{{}:{}}}", index + 1, escape_placeholder(param)))
        .collect();
    let insert_text = format!("{name}({})", stops.join(", "));
    Completion::new(label, insert_text, CompletionKind::Procedure)
}

/// Snippet syntax reserves `$`, `}` and `\` inside placeholders.
fn escape_placeholder(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '$' | '}' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

pub fn type_completion(name: &str, keyword: &str, provenance: &str) -> Completion {
    Completion::new(
        format!("{name}\t{keyword} {provenance}"),
        name,
        CompletionKind::Type,
    )
}

pub fn constant_completion(name: &str, provenance: &str) -> Completion {
    Completion::new(
        format!("{name}\tconstant {provenance}"),
        name,
        CompletionKind::Constant,
    )
}

/// Entry offered for an imported package alias.
pub fn module_completion(alias: &str, package: &str) -> Completion {
    Completion::new(
        format!("{alias}\tpackage {package}"),
        alias,
        CompletionKind::Module,
    )
}

/// Completion for a non-group definition; overload groups need their
/// members' entries and are expanded separately.
pub fn definition_completion(definition: &Definition, provenance: &str) -> Option<Completion> {
    match definition.kind {
        DefinitionKind::Type => Some(type_completion(
            &definition.name,
            definition.detail.as_deref().unwrap_or("type"),
            provenance,
        )),
        DefinitionKind::Constant => Some(constant_completion(&definition.name, provenance)),
        DefinitionKind::Procedure => {
            let signature = definition.signature.as_ref()?;
            Some(procedure_completion(
                &definition.name,
                &signature.parameters(),
                signature.return_type.as_deref(),
                provenance,
            ))
        }
        DefinitionKind::ProcedureGroup => None,
    }
}

/// Expands an overload group against the entries already produced for
/// its members.
/// （依成員既有的補全項目展開多載群組。）
///
/// Every entry whose label starts with `member(` is cloned under the group
/// name, member by member in declaration order, and a final entry lets the
/// user pick a variant by hand.
pub fn expand_overload_group(
    group: &str,
    members: &[String],
    existing: &[Completion],
    provenance: &str,
) -> Vec<Completion> {
    let target = format!("{group}(");
    let mut expanded = Vec::new();
    for member in members {
        let prefix = format!("{member}(");
        expanded.extend(existing.iter().filter_map(|completion| {
            completion.renamed(&prefix, &target, CompletionKind::ProcedureGroup)
        }));
    }
    expanded.push(Completion::new(
        format!("{group}(..)\tproc group {provenance}"),
        format!("{group}(${{1:{}}})", escape_placeholder(&members.join(" | "))),
        CompletionKind::ProcedureGroup,
    ));
    expanded
}

/// Completions of one package, accumulated file by file.
/// （逐檔累積的單一套件補全項目。）
///
/// Overload groups are held back until [`finish`](Self::finish), so a group
/// declared in one file still picks up members declared in a sibling.
#[derive(Debug, Default)]
pub struct PackageCompletions {
    entries: Vec<Completion>,
    groups: Vec<PendingGroup>,
}

#[derive(Debug)]
struct PendingGroup {
    name: String,
    members: Vec<String>,
    provenance: String,
}

impl PackageCompletions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_definitions(&mut self, definitions: &[Definition], provenance: &str) {
        for definition in definitions {
            if definition.kind == DefinitionKind::ProcedureGroup {
                self.groups.push(PendingGroup {
                    name: definition.name.clone(),
                    members: definition.members.clone(),
                    provenance: provenance.to_string(),
                });
            } else if let Some(completion) = definition_completion(definition, provenance) {
                self.entries.push(completion);
            }
        }
    }

    /// Normalizes raw file text and adds its definitions.
    pub fn add_source(&mut self, text: &str, provenance: &str, options: &NormalizeOptions) {
        let normalized = normalize(text, options);
        self.add_definitions(&extract_definitions(&normalized), provenance);
    }

    /// Every entry in file order, followed by the expansion of each group.
    pub fn finish(self) -> Vec<Completion> {
        let mut completions = self.entries;
        for group in self.groups {
            let expanded =
                expand_overload_group(&group.name, &group.members, &completions, &group.provenance);
            completions.extend(expanded);
        }
        completions
    }
}

/// Converts one file's definitions, in order, followed by the expansion
/// of each overload group it declares.
pub fn completions_from_definitions(definitions: &[Definition], provenance: &str) -> Vec<Completion> {
    let mut package = PackageCompletions::new();
    package.add_definitions(definitions, provenance);
    package.finish()
}

/// Normalizes raw file text and returns its completions.
/// （正規化原始檔案文字並回傳其補全項目。）
pub fn completions_from_source(
    text: &str,
    provenance: &str,
    options: &NormalizeOptions,
) -> Vec<Completion> {
    let mut package = PackageCompletions::new();
    package.add_source(text, provenance, options);
    package.finish()
}
