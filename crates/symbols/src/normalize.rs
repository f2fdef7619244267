//! Input cleanup applied before pattern extraction.
//! （擷取樣式前的輸入清理。）

use once_cell::sync::Lazy;
use regex::Regex;

static IMPORT_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:foreign[ \t]+)?import\b[^\n]*\n?")
        .expect("import line pattern must compile")
});

/// Options controlling [`normalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    pub strip_comments: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            strip_comments: true,
        }
    }
}

/// Removes import statements and, when requested, comments.
/// （移除 import 敘述，並可選擇移除註解。）
pub fn normalize(text: &str, options: &NormalizeOptions) -> String {
    let without_imports = strip_imports(text);
    if options.strip_comments {
        strip_comments(&without_imports)
    } else {
        without_imports
    }
}

pub fn strip_imports(text: &str) -> String {
    IMPORT_LINE.replace_all(text, "").into_owned()
}

/// Removes `//` line comments and nested `/* */` block comments.
///
/// String, rune and raw-string literals are skipped so delimiters inside them
/// survive. Newlines inside removed block comments are kept to preserve line
/// structure for the line-anchored patterns.
pub fn strip_comments(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut copied_from = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' | b'`' => i = skip_literal(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                out.push_str(&text[copied_from..i]);
                let end = bytes[i..]
                    .iter()
                    .position(|&b| b == b'\n')
                    .map_or(bytes.len(), |offset| i + offset);
                i = end;
                copied_from = end;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                out.push_str(&text[copied_from..i]);
                let (end, newlines) = skip_block_comment(bytes, i);
                out.extend(std::iter::repeat('\n').take(newlines));
                i = end;
                copied_from = end;
            }
            _ => i += 1,
        }
    }

    out.push_str(&text[copied_from..]);
    out
}

fn skip_literal(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let raw = quote == b'`';
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if !raw => i += 2,
            b'\n' if !raw => return i,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn skip_block_comment(bytes: &[u8], start: usize) -> (usize, usize) {
    let mut depth = 0usize;
    let mut newlines = 0;
    let mut i = start;
    while i < bytes.len() {
        if bytes[i] == b'/' && bytes.get(i + 1) == Some(&b'*') {
            depth += 1;
            i += 2;
        } else if bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/') {
            depth -= 1;
            i += 2;
            if depth == 0 {
                return (i, newlines);
            }
        } else {
            if bytes[i] == b'\n' {
                newlines += 1;
            }
            i += 1;
        }
    }
    (bytes.len(), newlines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_import_lines_only() {
        let text = "package demo\n\nimport \"core:fmt\"\nimport m \"core:math\"\nforeign import libc \"system:c\"\nmain :: proc() {}\n";
        assert_eq!(strip_imports(text), "package demo\n\nmain :: proc() {}\n");
    }

    #[test]
    fn nested_block_comments_are_removed_whole() {
        let text = "a :: 1\n/* outer /* inner */ still comment\n*/b :: 2\n";
        assert_eq!(strip_comments(text), "a :: 1\n\nb :: 2\n");
    }

    #[test]
    fn line_comments_keep_the_newline() {
        let text = "// hidden :: proc() {}\nvisible :: proc() {}";
        assert_eq!(strip_comments(text), "\nvisible :: proc() {}");
    }

    #[test]
    fn comment_markers_inside_strings_survive() {
        let text = "URL :: \"http://odin-lang.org\" // trailing\nRAW :: `/* not a comment */`\n";
        assert_eq!(
            strip_comments(text),
            "URL :: \"http://odin-lang.org\" \nRAW :: `/* not a comment */`\n"
        );
    }

    #[test]
    fn normalize_can_leave_comments_in_place() {
        let text = "import \"core:fmt\"\n// keep me\n";
        let options = NormalizeOptions {
            strip_comments: false,
        };
        assert_eq!(normalize(text, &options), "// keep me\n");
        assert_eq!(normalize(text, &NormalizeOptions::default()), "\n");
    }
}
