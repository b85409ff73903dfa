//! Source extraction from Power Query (M) partition expressions.
//!
//! M is not parsed. A handful of shapes produced by the standard connectors
//! are recognized textually:
//!
//! - `Value.NativeQuery(source, "SELECT ...", ...)`
//! - `Sql.Database("server", "db", [Query = "SELECT ..."])`
//! - navigation steps such as `Source{[Schema = "dbo", Item = "Sales"]}[Data]`
//! - `Table.RenameColumns(step, {{"old", "new"}, ...})`

use std::sync::LazyLock;

use regex::Regex;

static NAVIGATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\{\s*\[\s*(?:Schema\s*=\s*"((?:[^"]|"")*)"\s*,\s*)?Item\s*=\s*"((?:[^"]|"")*)""#,
    )
    .expect("valid navigation regex")
});

static QUERY_OPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Query\s*=\s*").expect("valid query option regex"));

/// Where an M expression reads its rows from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MSource {
    /// SQL text embedded in the expression.
    Sql(String),
    /// A table reached by navigation.
    Table { schema: Option<String>, item: String },
}

/// Recognize the source of an M expression.
///
/// Native queries win over `Sql.Database` query options, which win over
/// navigation.
pub fn extract(expression: &str) -> Option<MSource> {
    native_query(expression)
        .or_else(|| database_query(expression))
        .map(MSource::Sql)
        .or_else(|| navigation(expression))
}

fn native_query(expression: &str) -> Option<String> {
    let start = expression.find("Value.NativeQuery")?;
    let open = start + expression[start..].find('(')?;
    let args = split_args(expression, open)?;
    string_literal(args.get(1)?.trim()).map(|(_, sql)| sql)
}

fn database_query(expression: &str) -> Option<String> {
    let start = expression.find("Sql.Database")?;
    let open = start + expression[start..].find('(')?;
    let args = split_args(expression, open)?;
    let options = args.get(2)?;
    let found = QUERY_OPTION.find(options)?;
    string_literal(&options[found.end()..]).map(|(_, sql)| sql)
}

fn navigation(expression: &str) -> Option<MSource> {
    let captures = NAVIGATION.captures(expression)?;
    let schema = captures.get(1).map(|m| m.as_str().replace("\"\"", "\""));
    let item = captures.get(2)?.as_str().replace("\"\"", "\"");
    Some(MSource::Table { schema, item })
}

/// Column renames applied by `Table.RenameColumns` steps, as
/// `(original, final)` pairs with chained renames collapsed.
///
/// Returns `Ok(None)` when there is no rename step and `Err(())` when a rename
/// list cannot be read.
pub(crate) fn renames(expression: &str) -> Result<Option<Vec<(String, String)>>, ()> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    let mut found = false;
    let mut rest = expression;

    while let Some(start) = rest.find("Table.RenameColumns") {
        found = true;
        let after = &rest[start..];
        let open = after.find('{').ok_or(())?;
        let close = matching_brace(after, open).ok_or(())?;
        for (old, new) in rename_list(&after[open + 1..close]).ok_or(())? {
            match pairs.iter_mut().find(|(_, current)| *current == old) {
                Some(pair) => pair.1 = new,
                None => pairs.push((old, new)),
            }
        }
        rest = &after[close + 1..];
    }

    Ok(found.then_some(pairs))
}

/// Parse `{"a", "b"}, {"c", "d"}`.
fn rename_list(body: &str) -> Option<Vec<(String, String)>> {
    let mut pairs = Vec::new();
    let mut rest = body.trim_start();
    while !rest.is_empty() {
        rest = rest.strip_prefix('{')?.trim_start();
        let (consumed, old) = string_literal(rest)?;
        rest = rest[consumed..].trim_start().strip_prefix(',')?.trim_start();
        let (consumed, new) = string_literal(rest)?;
        rest = rest[consumed..].trim_start().strip_prefix('}')?.trim_start();
        pairs.push((old, new));
        rest = rest.strip_prefix(',').unwrap_or(rest).trim_start();
    }
    Some(pairs)
}

/// An M string literal at the start of `input`: bytes consumed and decoded text.
///
/// Handles `""` escapes and the `#(cr)`, `#(lf)`, `#(tab)` and `#(#)` escapes.
pub fn string_literal(input: &str) -> Option<(usize, String)> {
    let bytes = input.as_bytes();
    if bytes.first() != Some(&b'"') {
        return None;
    }
    let mut i = 1;
    while i < bytes.len() {
        if bytes[i] == b'"' {
            if bytes.get(i + 1) == Some(&b'"') {
                i += 2;
                continue;
            }
            return Some((i + 1, unescape(&input[1..i])));
        }
        i += 1;
    }
    None
}

fn unescape(raw: &str) -> String {
    raw.replace("\"\"", "\"")
        .replace("#(cr,lf)", "\r\n")
        .replace("#(lf)", "\n")
        .replace("#(cr)", "\r")
        .replace("#(tab)", "\t")
        .replace("#(#)", "#")
}

/// Split call arguments on top-level commas. Strings, records, lists and
/// nested calls may contain commas.
fn split_args(input: &str, open: usize) -> Option<Vec<&str>> {
    let bytes = input.as_bytes();
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut start = open + 1;
    let mut i = open + 1;

    while i < bytes.len() {
        match bytes[i] {
            b'"' => i += string_literal(&input[i..])?.0 - 1,
            b'(' | b'[' | b'{' => depth += 1,
            b')' if depth == 0 => {
                args.push(&input[start..i]);
                return Some(args);
            }
            b')' | b']' | b'}' => depth = depth.checked_sub(1)?,
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

fn matching_brace(input: &str, open: usize) -> Option<usize> {
    let bytes = input.as_bytes();
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => i += string_literal(&input[i..])?.0 - 1,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}
