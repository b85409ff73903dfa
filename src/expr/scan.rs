//! Low-level scanners over formula text.
//!
//! Every scanner takes an immutable slice starting at the current position and
//! returns how many bytes it consumed alongside what it recognized.

/// Length of the leading run of arithmetic operators, digits, parentheses and
/// whitespace.
pub fn math_run(input: &str) -> usize {
    input
        .char_indices()
        .find(|&(_, c)| !is_math_char(c))
        .map(|(i, _)| i)
        .unwrap_or(input.len())
}

fn is_math_char(c: char) -> bool {
    c.is_ascii_digit() || c.is_whitespace() || matches!(c, '+' | '-' | '*' | '/' | '^' | '(' | ')' | '.')
}

/// Case-insensitive check that `input` starts with `prefix`.
pub fn starts_with_keyword(input: &str, prefix: &str) -> bool {
    input
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Arguments of a call whose `(` is at byte `open`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallArgs<'a> {
    pub args: Vec<&'a str>,
    /// Byte index of the matching `)`.
    pub close: usize,
}

/// Split the arguments of the call opened at `open` on top-level commas, up to
/// the matching close paren. Brackets, quoted table names and string literals
/// are skipped over. Returns `None` when the call is not closed.
pub fn split_args(input: &str, open: usize) -> Option<CallArgs<'_>> {
    let bytes = input.as_bytes();
    if bytes.get(open) != Some(&b'(') {
        return None;
    }

    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut start = open + 1;
    let mut i = open + 1;

    while i < bytes.len() {
        match bytes[i] {
            b'[' => i = skip_delimited(bytes, i, b']')?,
            b'\'' => i = skip_delimited(bytes, i, b'\'')?,
            b'"' => i = skip_delimited(bytes, i, b'"')?,
            b'(' => depth += 1,
            b')' if depth == 0 => {
                args.push(&input[start..i]);
                return Some(CallArgs { args, close: i });
            }
            b')' => depth -= 1,
            b',' if depth == 0 => {
                args.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Index of the closing delimiter of a region opened at `open`. A doubled
/// closing delimiter is an escape and does not end the region.
fn skip_delimited(bytes: &[u8], open: usize, close: u8) -> Option<usize> {
    let mut i = open + 1;
    while i < bytes.len() {
        if bytes[i] == close {
            if bytes.get(i + 1) == Some(&close) {
                i += 2;
                continue;
            }
            return Some(i);
        }
        i += 1;
    }
    None
}

/// A bracketed name such as `[Total Sales]` at the start of `input`.
/// Returns the bytes consumed and the unescaped name.
pub fn bracket_name(input: &str) -> Option<(usize, String)> {
    if !input.starts_with('[') {
        return None;
    }
    let close = skip_delimited(input.as_bytes(), 0, b']')?;
    Some((close + 1, input[1..close].replace("]]", "]")))
}

/// Strip single quotes from a table name: `'Sales Data'` → `Sales Data`.
pub fn unquote_table(name: &str) -> String {
    let name = name.trim();
    match name.strip_prefix('\'').and_then(|n| n.strip_suffix('\'')) {
        Some(inner) => inner.replace("''", "'"),
        None => name.to_string(),
    }
}

/// A `table[column]` or `'table'[column]` reference making up all of `text`.
pub fn column_ref(text: &str) -> Option<(String, String)> {
    let text = text.trim();
    let open = text.find('[')?;
    let (consumed, column) = bracket_name(&text[open..])?;
    if open + consumed != text.len() {
        return None;
    }
    let table = unquote_table(&text[..open]);
    if table.is_empty() || table.contains(['[', ']', '(', ')']) {
        return None;
    }
    Some((table, column))
}

/// Remove line comments, collapse whitespace and strip redundant outer
/// parentheses.
pub fn normalize(input: &str) -> String {
    let without_comments: Vec<&str> = input
        .lines()
        .map(|line| {
            let cut = [line.find("//"), line.find("--")]
                .into_iter()
                .flatten()
                .min()
                .unwrap_or(line.len());
            &line[..cut]
        })
        .collect();
    let mut text = without_comments
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    while is_wrapped(&text) {
        text = text[1..text.len() - 1].trim().to_string();
    }
    text
}

/// Whether `text` is one parenthesized group: `(...)` whose `(` matches the final `)`.
pub fn is_wrapped(text: &str) -> bool {
    text.starts_with('(')
        && split_args(text, 0).is_some_and(|call| call.close == text.len() - 1)
}
