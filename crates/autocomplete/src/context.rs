//! Cursor context: where a completion request was made.
//! （游標情境：判斷補全請求發生的位置。）

/// Scope flags reported by the host for the cursor position.
/// （宿主回報的游標所在範圍旗標。）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CursorScope {
    pub in_comment: bool,
    pub in_string: bool,
}

impl CursorScope {
    pub fn allows_completion(&self) -> bool {
        !self.in_comment && !self.in_string
    }
}

pub fn is_identifier_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

/// Identifier token immediately before the `.` being completed after.
/// （取得游標前方 `.` 左側的識別字。）
///
/// The cursor may sit right after the dot or after a partially typed
/// member (`fmt.pri|`). Returns `None` when the cursor is inside an
/// identifier, when no dot precedes the typed part, or when the dot has
/// no identifier on its left.
pub fn word_before_dot(line: &str, cursor: usize) -> Option<&str> {
    let cursor = char_boundary(line, cursor);
    if line[cursor..].chars().next().is_some_and(is_identifier_char) {
        return None;
    }
    let typed_start = identifier_start(line, cursor);
    let receiver = line[..typed_start].strip_suffix('.')?;
    let word = &receiver[identifier_start(receiver, receiver.len())..];
    (!word.is_empty()).then_some(word)
}

/// Identifier characters typed immediately before the cursor.
pub fn typed_prefix(line: &str, cursor: usize) -> &str {
    let cursor = char_boundary(line, cursor);
    &line[identifier_start(line, cursor)..cursor]
}

fn identifier_start(text: &str, end: usize) -> usize {
    text[..end]
        .char_indices()
        .rev()
        .take_while(|(_, ch)| is_identifier_char(*ch))
        .last()
        .map_or(end, |(index, _)| index)
}

fn char_boundary(text: &str, offset: usize) -> usize {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_at_cursor_yields_receiver() {
        let line = "    fmt.";
        assert_eq!(word_before_dot(line, line.len()), Some("fmt"));
    }

    #[test]
    fn partially_typed_member_still_resolves() {
        let line = "x := strings.spl";
        assert_eq!(word_before_dot(line, line.len()), Some("strings"));
        assert_eq!(typed_prefix(line, line.len()), "spl");
    }

    #[test]
    fn no_dot_means_naked_request() {
        assert_eq!(word_before_dot("    pri", 7), None);
        assert_eq!(typed_prefix("    pri", 7), "pri");
    }

    #[test]
    fn cursor_inside_identifier_is_not_a_boundary() {
        let line = "fmt.println";
        assert_eq!(word_before_dot(line, 4), None);
        assert_eq!(word_before_dot(line, line.len()), Some("fmt"));
    }

    #[test]
    fn dot_without_receiver_is_rejected() {
        assert_eq!(word_before_dot("x := .", 6), None);
        assert_eq!(word_before_dot(".", 1), None);
        assert_eq!(word_before_dot("(a).", 4), None);
    }

    #[test]
    fn cursor_past_end_or_mid_char_is_clamped() {
        assert_eq!(word_before_dot("os.", 99), Some("os"));
        assert_eq!(word_before_dot("é.", 1), None);
    }

    #[test]
    fn scope_flags_block_completion() {
        assert!(CursorScope::default().allows_completion());
        assert!(!CursorScope {
            in_comment: true,
            in_string: false
        }
        .allows_completion());
    }
}
