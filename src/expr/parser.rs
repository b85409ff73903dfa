//! Recursive-descent translation of measure formulas.
//!
//! There is no grammar for the full formula language; the parser recognizes a
//! fixed set of shapes and stops at the first token it does not understand:
//!
//! ```text
//! formula   := (math-run | divide | measure | aggregate)*
//! divide    := DIVIDE "(" formula "," formula ")"
//! measure   := "[" name "]"
//! aggregate := AGGFN "(" table "[" column "]" ")" | COUNTROWS "(" table ")"
//! ```
//!
//! Each step returns `(consumed, translated)` over an immutable slice.

use super::scan::{self, bracket_name, column_ref, math_run, split_args, starts_with_keyword};
use super::{AggregateCall, AggregateFunction, MeasureSource};

/// Outcome of translating a formula.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translation {
    /// The whole formula was translated.
    Complete(String),
    /// Translation stopped at `remainder`; `translated` covers the prefix.
    Incomplete { translated: String, remainder: String },
}

impl Translation {
    pub fn is_complete(&self) -> bool {
        matches!(self, Translation::Complete(_))
    }

    pub fn complete(self) -> Option<String> {
        match self {
            Translation::Complete(expression) => Some(expression),
            Translation::Incomplete { .. } => None,
        }
    }
}

/// Render a metric identifier as a reference usable in a calculated metric.
pub fn measure_reference(identifier: &str) -> String {
    format!("[Measures].[{}]", identifier)
}

/// Translate `input`, creating referenced metrics through `source`.
pub fn translate(input: &str, source: &mut dyn MeasureSource) -> Translation {
    let trimmed = input.trim();
    let (consumed, translated) = parse_sequence(trimmed, source);
    if consumed == trimmed.len() {
        Translation::Complete(translated.trim().to_string())
    } else {
        Translation::Incomplete {
            translated: translated.trim().to_string(),
            remainder: trimmed[consumed..].to_string(),
        }
    }
}

/// Whether the whole formula is a single `DIVIDE(...)` call.
pub fn is_ratio(input: &str) -> bool {
    let trimmed = input.trim();
    starts_with_keyword(trimmed, "divide(")
        && split_args(trimmed, "divide".len()).is_some_and(|call| call.close == trimmed.len() - 1)
}

/// The aggregation making up the whole of `input`, if it is exactly one
/// `AGGFN(table[column])` or `COUNTROWS(table)` call.
pub fn single_aggregate(input: &str) -> Option<AggregateCall> {
    struct Capture(Option<AggregateCall>);

    impl MeasureSource for Capture {
        fn aggregate(&mut self, call: &AggregateCall) -> Option<String> {
            self.0 = Some(call.clone());
            Some(String::new())
        }

        fn measure(&mut self, _name: &str) -> Option<String> {
            None
        }
    }

    let text = scan::normalize(input);
    let mut capture = Capture(None);
    let (consumed, _) = parse_aggregate(&text, &mut capture)?;
    if consumed != text.len() {
        return None;
    }
    capture.0
}

/// Translate as much of `input` as possible, left to right.
fn parse_sequence(input: &str, source: &mut dyn MeasureSource) -> (usize, String) {
    let mut pos = 0;
    let mut out = String::new();

    loop {
        let run = math_run(&input[pos..]);
        out.push_str(&input[pos..pos + run]);
        pos += run;
        if pos == input.len() {
            break;
        }

        let rest = &input[pos..];
        let step = parse_divide(rest, source)
            .or_else(|| parse_measure(rest, source))
            .or_else(|| parse_aggregate(rest, source));

        match step {
            Some((consumed, translated)) => {
                out.push_str(&translated);
                pos += consumed;
            }
            None => break,
        }
    }

    (pos, out)
}

/// Translate the whole of `input` or nothing.
fn parse_exact(input: &str, source: &mut dyn MeasureSource) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    let (consumed, translated) = parse_sequence(trimmed, source);
    (consumed == trimmed.len()).then(|| translated.trim().to_string())
}

/// `DIVIDE(numerator, denominator)` → `numerator / denominator`.
fn parse_divide(input: &str, source: &mut dyn MeasureSource) -> Option<(usize, String)> {
    if !starts_with_keyword(input, "divide(") {
        return None;
    }
    let call = split_args(input, "divide".len())?;
    let [numerator, denominator] = call.args.as_slice() else {
        return None;
    };

    let numerator = parse_exact(numerator, source)?;
    let denominator = parse_exact(denominator, source)?;
    Some((
        call.close + 1,
        format!("{} / {}", parenthesize(&numerator), parenthesize(&denominator)),
    ))
}

/// `[Measure Name]` → reference to the measure's identifier.
fn parse_measure(input: &str, source: &mut dyn MeasureSource) -> Option<(usize, String)> {
    let (consumed, name) = bracket_name(input)?;
    let identifier = source.measure(&name)?;
    Some((consumed, measure_reference(&identifier)))
}

/// `AGGFN(table[column])` or `COUNTROWS(table)` → reference to a metric.
fn parse_aggregate(input: &str, source: &mut dyn MeasureSource) -> Option<(usize, String)> {
    let function = AggregateFunction::ALL
        .into_iter()
        .find(|f| starts_with_keyword(input, &format!("{}(", f.keyword())))?;

    let open = function.keyword().len();
    let close = open + input[open..].find(')')?;
    let body = &input[open + 1..close];
    if body.contains('(') {
        return None;
    }

    let call = if function == AggregateFunction::CountRows {
        if body.contains(['[', ']']) {
            return None;
        }
        let table = scan::unquote_table(body);
        if table.is_empty() {
            return None;
        }
        AggregateCall {
            function,
            table,
            column: None,
        }
    } else {
        if body.matches('[').count() != 1 || body.matches(']').count() != 1 {
            return None;
        }
        let (table, column) = column_ref(body)?;
        AggregateCall {
            function,
            table,
            column: Some(column),
        }
    };

    let identifier = source.aggregate(&call)?;
    Some((close + 1, measure_reference(&identifier)))
}

/// Wrap compound sub-expressions in parentheses.
fn parenthesize(expression: &str) -> String {
    let expression = expression.trim();
    let is_reference = expression.starts_with("[Measures].[")
        && expression.ends_with(']')
        && expression.matches("].[").count() == 1;
    if is_reference || expression.parse::<f64>().is_ok() || scan::is_wrapped(expression) {
        expression.to_string()
    } else {
        format!("({})", expression)
    }
}
