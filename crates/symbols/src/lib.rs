//! Pattern-based definition extraction for Odin source text.
//! （以樣式比對擷取 Odin 原始碼中的定義。）
//!
//! Nothing here builds a syntax tree. Each symbol class owns one compiled
//! pattern plus a refinement function that turns a match into a [`Definition`];
//! anything a refinement cannot make sense of is dropped silently.

mod normalize;
mod params;
pub mod patterns;

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

pub use normalize::{normalize, strip_comments, strip_imports, NormalizeOptions};
pub use params::split_params;
pub use patterns::procedure_type_signature;

/// Byte range corresponding to a definition inside the scanned text.
/// （對應文字中定義的位元組區間資訊。）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Classifies the symbol a definition declares.
/// （定義所宣告符號的類型分類。）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DefinitionKind {
    Type,
    Constant,
    Procedure,
    ProcedureGroup,
}

impl DefinitionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DefinitionKind::Type => "type",
            DefinitionKind::Constant => "constant",
            DefinitionKind::Procedure => "procedure",
            DefinitionKind::ProcedureGroup => "procedure group",
        }
    }
}

/// Raw parameter list and return type of a procedure declaration.
/// （程序宣告的原始參數清單與回傳型別。）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Text between the outer parentheses, untouched.
    pub params: String,
    pub return_type: Option<String>,
}

impl Signature {
    /// Splits [`Signature::params`] into individual parameters.
    /// （將參數文字拆成個別參數。）
    pub fn parameters(&self) -> Vec<String> {
        split_params(&self.params)
    }
}

/// A symbol found in source text.
/// （在原始碼中找到的單一符號定義。）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub name: String,
    pub kind: DefinitionKind,
    /// Declaration keyword for types (`struct`, `enum`, ...) or the value text of a constant.
    pub detail: Option<String>,
    pub signature: Option<Signature>,
    /// Member procedure names of an overload group, in declaration order.
    pub members: Vec<String>,
    pub range: TextRange,
    /// The matched declaration text; definitions are unique by this value.
    pub text: String,
}

impl Definition {
    pub fn new(
        name: impl Into<String>,
        kind: DefinitionKind,
        range: TextRange,
        source: &str,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            detail: None,
            signature: None,
            members: Vec::new(),
            text: source[range.start..range.end].to_string(),
            range,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signature = Some(signature);
        self
    }

    pub fn with_members(mut self, members: Vec<String>) -> Self {
        self.members = members;
        self
    }
}

/// Trait implemented by definition extractors.
/// （所有定義擷取器需實作的 trait。）
pub trait DefinitionParser: Send + Sync {
    fn parse(&self, source: &str) -> Vec<Definition>;
}

/// Turns one pattern match into a definition, or rejects it.
pub type Refine = fn(source: &str, captures: &Captures<'_>) -> Option<Definition>;

/// Pattern plus the refinement that interprets its captures.
/// （樣式與解讀其擷取群組的精煉函式。）
#[derive(Clone)]
pub struct RegexRule {
    pub regex: Regex,
    pub kind: DefinitionKind,
    refine: Refine,
}

impl RegexRule {
    pub fn new(pattern: &str, kind: DefinitionKind, refine: Refine) -> Result<Self, regex::Error> {
        Ok(Self::from_regex(Regex::new(pattern)?, kind, refine))
    }

    pub fn from_regex(regex: Regex, kind: DefinitionKind, refine: Refine) -> Self {
        Self {
            regex,
            kind,
            refine,
        }
    }

    /// Runs this rule alone over `source`.
    /// （僅以此規則掃描文字。）
    pub fn extract(&self, source: &str) -> Vec<Definition> {
        self.regex
            .captures_iter(source)
            .filter_map(|captures| (self.refine)(source, &captures))
            .collect()
    }
}

/// Parser that derives definitions using a table of regex rules.
/// （使用一組正規表示式規則擷取定義的解析器。）
pub struct RegexParser {
    rules: Vec<RegexRule>,
}

impl RegexParser {
    pub fn new(rules: Vec<RegexRule>) -> Self {
        Self { rules }
    }

    /// The Odin rule table: types, constants, procedures and overload groups.
    /// （Odin 規則表：型別、常數、程序與多載群組。）
    pub fn odin() -> Self {
        Self::new(vec![
            patterns::type_rule(),
            patterns::constant_rule(),
            patterns::procedure_rule(),
            patterns::procedure_group_rule(),
        ])
    }

    pub fn push_rule(&mut self, rule: RegexRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[RegexRule] {
        &self.rules
    }
}

impl Default for RegexParser {
    fn default() -> Self {
        Self::odin()
    }
}

impl DefinitionParser for RegexParser {
    fn parse(&self, source: &str) -> Vec<Definition> {
        let mut entries: Vec<Definition> = self
            .rules
            .iter()
            .flat_map(|rule| rule.extract(source))
            .collect();
        entries.sort_by_key(|entry| (entry.range.start, entry.kind));

        let mut seen = HashSet::new();
        entries.retain(|entry| seen.insert(entry.text.clone()));
        entries
    }
}

static ODIN_PARSER: Lazy<RegexParser> = Lazy::new(RegexParser::odin);

/// Extracts every Odin definition from already-normalized text.
/// （從已正規化的文字擷取所有 Odin 定義。）
pub fn extract_definitions(source: &str) -> Vec<Definition> {
    ODIN_PARSER.parse(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
Vec2 :: struct {
    x, y: f32,
}

MAX_ENTITIES :: 1024;

length :: proc(v: Vec2) -> f32 {
    return 0
}

add_int :: proc(a: int) -> int { return a }
add_float :: proc(a: f32) -> f32 { return a }
add :: proc{add_int, add_float};
"#;

    #[test]
    fn extracts_each_symbol_class_in_source_order() {
        let defs = extract_definitions(SAMPLE);
        let names: Vec<_> = defs
            .iter()
            .map(|def| (def.name.as_str(), def.kind))
            .collect();
        assert_eq!(
            names,
            vec![
                ("Vec2", DefinitionKind::Type),
                ("MAX_ENTITIES", DefinitionKind::Constant),
                ("length", DefinitionKind::Procedure),
                ("add_int", DefinitionKind::Procedure),
                ("add_float", DefinitionKind::Procedure),
                ("add", DefinitionKind::ProcedureGroup),
            ]
        );

        let length = &defs[2];
        let signature = length.signature.as_ref().unwrap();
        assert_eq!(signature.params, "v: Vec2");
        assert_eq!(signature.return_type.as_deref(), Some("f32"));
        assert_eq!(defs[0].detail.as_deref(), Some("struct"));
        assert_eq!(defs[5].members, vec!["add_int", "add_float"]);
    }

    #[test]
    fn extraction_is_idempotent() {
        let first = extract_definitions(SAMPLE);
        let second = extract_definitions(SAMPLE);
        let as_set = |defs: &[Definition]| {
            defs.iter()
                .map(|def| def.text.clone())
                .collect::<HashSet<_>>()
        };
        assert_eq!(as_set(&first), as_set(&second));
    }

    #[test]
    fn duplicate_declarations_collapse_to_one() {
        let source = "foo :: proc() {}\nfoo :: proc() {}\n";
        let defs = extract_definitions(source);
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].range.start, 0);
    }

    #[test]
    fn custom_rule_can_be_pushed() {
        let mut parser = RegexParser::new(Vec::new());
        parser.push_rule(
            RegexRule::new(
                r"(?m)^(?P<name>\w+)\s*::\s*#config",
                DefinitionKind::Constant,
                |source, captures| {
                    let whole = captures.get(0)?;
                    let name = captures.name("name")?.as_str();
                    Some(Definition::new(
                        name,
                        DefinitionKind::Constant,
                        TextRange::new(whole.start(), whole.end()),
                        source,
                    ))
                },
            )
            .unwrap(),
        );
        let defs = parser.parse("DEBUG :: #config(DEBUG, false)\n");
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "DEBUG");
        assert_eq!(parser.rules().len(), 1);
    }
}
