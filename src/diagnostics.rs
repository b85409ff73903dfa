//! Advisory messages recorded during a conversion.
//!
//! Heuristic decisions and fallbacks never abort a conversion; they are
//! recorded here, in order, and returned with the result. Each message is
//! also emitted as a `tracing` event so a subscriber installed by the caller
//! sees them as they happen.

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// A heuristic failed in a way the output cannot represent faithfully.
    Error,
    /// A fallback was applied; the output needs manual follow-up.
    Warning,
    /// An automatic decision was taken (renames, skipped objects).
    Info,
}

/// A message about one source object.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Source object the message is about, e.g. `Sales[Amount]`.
    pub object: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn error(object: Option<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            object,
            message: message.into(),
        }
    }

    pub fn warning(object: Option<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            object,
            message: message.into(),
        }
    }

    pub fn info(object: Option<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            object,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        };
        match &self.object {
            Some(object) => write!(f, "{}: {}: {}", level, object, self.message),
            None => write!(f, "{}: {}", level, self.message),
        }
    }
}

/// Ordered diagnostic log.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        let object = diagnostic.object.as_deref().unwrap_or("-");
        match diagnostic.severity {
            Severity::Error => tracing::error!(object, "{}", diagnostic.message),
            Severity::Warning => tracing::warn!(object, "{}", diagnostic.message),
            Severity::Info => tracing::info!(object, "{}", diagnostic.message),
        }
        self.entries.push(diagnostic);
    }

    pub fn error(&mut self, object: impl Into<String>, message: impl Into<String>) {
        self.push(Diagnostic::error(Some(object.into()), message));
    }

    pub fn warning(&mut self, object: impl Into<String>, message: impl Into<String>) {
        self.push(Diagnostic::warning(Some(object.into()), message));
    }

    pub fn info(&mut self, object: impl Into<String>, message: impl Into<String>) {
        self.push(Diagnostic::info(Some(object.into()), message));
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}
