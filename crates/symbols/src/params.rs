/// Splits the text inside a procedure's outer parentheses into parameters.
/// （將程序外層括號內的文字拆成個別參數。）
///
/// A comma separates parameters only when every `(` before it has been closed,
/// so a parameter typed as `proc(a: int, b: int)` stays whole. Empty pieces
/// (trailing commas, blank lists) are dropped and runs of whitespace collapse
/// to a single space.
pub fn split_params(text: &str) -> Vec<String> {
    let mut params = Vec::new();
    let mut depth: i32 = 0;
    let mut start = 0;

    for (idx, ch) in text.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => {
                push_param(&mut params, &text[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    push_param(&mut params, &text[start..]);
    params
}

fn push_param(params: &mut Vec<String>, raw: &str) {
    let param = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if !param.is_empty() {
        params.push(param);
    }
}
