//! Compiled declaration patterns and their refinements.
//! （已編譯的宣告樣式與對應的精煉函式。）

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::{Definition, DefinitionKind, RegexRule, Signature, TextRange};

/// `name :: struct|union|enum|bit_field|bit_set|distinct`
pub static TYPE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([A-Za-z_]\w*)\s*::\s*(struct|union|enum|bit_field|bit_set|distinct)\b")
        .expect("type pattern must compile")
});

/// `NAME :: value` terminated by `;` or the end of the line.
pub static CONSTANT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*([A-Z_][A-Z0-9_]*)[ \t]*::[ \t]*([^;\r\n]+?)[ \t]*(?:;|\r?$)")
        .expect("constant pattern must compile")
});

/// Head of a procedure declaration, up to and including the opening parenthesis.
pub static PROCEDURE_HEAD_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"\b([A-Za-z_]\w*)\s*::\s*(?:(?:inline|no_inline|#force_inline|#force_no_inline)\s+)?proc\s*(?:"\w+"\s*)?\("#,
    )
    .expect("procedure head pattern must compile")
});

/// What may follow the closing parenthesis of a procedure's parameter list.
pub static PROCEDURE_TAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:->\s*([^{;\n]*?)\s*)?(?:\{|---|;|where\b)")
        .expect("procedure tail pattern must compile")
});

/// `name :: proc { a, b, c }`
pub static PROCEDURE_GROUP_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([A-Za-z_]\w*)\s*::\s*proc\s*\{([^}]*)\}")
        .expect("procedure group pattern must compile")
});

/// Leading words that make a `NAME :: ...` line something other than a constant.
const NON_CONSTANT_KEYWORDS: &[&str] = &[
    "proc",
    "struct",
    "union",
    "enum",
    "bit_field",
    "bit_set",
    "distinct",
    "inline",
    "no_inline",
    "#force_inline",
    "#force_no_inline",
    "#type",
];

pub fn type_rule() -> RegexRule {
    RegexRule::from_regex(TYPE_PATTERN.clone(), DefinitionKind::Type, refine_type)
}

pub fn constant_rule() -> RegexRule {
    RegexRule::from_regex(
        CONSTANT_PATTERN.clone(),
        DefinitionKind::Constant,
        refine_constant,
    )
}

pub fn procedure_rule() -> RegexRule {
    RegexRule::from_regex(
        PROCEDURE_HEAD_PATTERN.clone(),
        DefinitionKind::Procedure,
        refine_procedure,
    )
}

pub fn procedure_group_rule() -> RegexRule {
    RegexRule::from_regex(
        PROCEDURE_GROUP_PATTERN.clone(),
        DefinitionKind::ProcedureGroup,
        refine_procedure_group,
    )
}

fn whole_range(captures: &Captures<'_>) -> Option<TextRange> {
    let whole = captures.get(0)?;
    Some(TextRange::new(whole.start(), whole.end()))
}

fn refine_type(source: &str, captures: &Captures<'_>) -> Option<Definition> {
    let name = captures.get(1)?.as_str();
    let keyword = captures.get(2)?.as_str();
    Some(
        Definition::new(name, DefinitionKind::Type, whole_range(captures)?, source)
            .with_detail(keyword),
    )
}

fn refine_constant(source: &str, captures: &Captures<'_>) -> Option<Definition> {
    let name = captures.get(1)?.as_str();
    let value = captures.get(2)?.as_str().trim();
    if value.is_empty() || starts_with_non_constant_keyword(value) {
        return None;
    }
    Some(
        Definition::new(name, DefinitionKind::Constant, whole_range(captures)?, source)
            .with_detail(value),
    )
}

fn starts_with_non_constant_keyword(value: &str) -> bool {
    let first = value
        .split(|ch: char| ch.is_whitespace() || ch == '(' || ch == '{')
        .next()
        .unwrap_or_default();
    NON_CONSTANT_KEYWORDS.contains(&first)
}

fn refine_procedure(source: &str, captures: &Captures<'_>) -> Option<Definition> {
    let head = captures.get(0)?;
    let name = captures.get(1)?.as_str();
    let params_start = head.end();
    let params_end = find_closing_paren(source, params_start)?;

    let rest = &source[params_end + 1..];
    let tail = PROCEDURE_TAIL_PATTERN.captures(rest)?;
    let tail_end = params_end + 1 + tail.get(0)?.end();
    let return_type = tail
        .get(1)
        .map(|ret| ret.as_str().trim())
        .filter(|ret| !ret.is_empty())
        .map(str::to_string);

    let signature = Signature {
        params: source[params_start..params_end].trim().to_string(),
        return_type,
    };
    Some(
        Definition::new(
            name,
            DefinitionKind::Procedure,
            TextRange::new(head.start(), tail_end),
            source,
        )
        .with_signature(signature),
    )
}

/// Returns the offset of the `)` that closes the parenthesis opened just before `start`.
fn find_closing_paren(source: &str, start: usize) -> Option<usize> {
    let mut depth = 1usize;
    for (offset, byte) in source.as_bytes()[start..].iter().enumerate() {
        match byte {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parses a bare procedure type such as `proc "c" (a: int) -> bool`.
/// （解析程序型別文字，例如 `proc(a: int) -> bool`。）
pub fn procedure_type_signature(ty: &str) -> Option<Signature> {
    let rest = ty.trim_start().strip_prefix("proc")?;
    let open = rest.find('(')?;
    if !rest[..open]
        .trim()
        .trim_matches('"')
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
    {
        return None;
    }
    let close = find_closing_paren(rest, open + 1)?;
    let return_type = rest[close + 1..]
        .trim()
        .strip_prefix("->")
        .map(str::trim)
        .filter(|ret| !ret.is_empty())
        .map(str::to_string);
    Some(Signature {
        params: rest[open + 1..close].trim().to_string(),
        return_type,
    })
}

fn refine_procedure_group(source: &str, captures: &Captures<'_>) -> Option<Definition> {
    let name = captures.get(1)?.as_str();
    let members: Vec<String> = captures
        .get(2)?
        .as_str()
        .split(',')
        .map(str::trim)
        .filter(|member| !member.is_empty())
        .map(str::to_string)
        .collect();
    if members.is_empty() {
        return None;
    }
    Some(
        Definition::new(
            name,
            DefinitionKind::ProcedureGroup,
            whole_range(captures)?,
            source,
        )
        .with_members(members),
    )
}
