//! Diagnostic collection
//!
//! Scan and syntax errors are recovered from locally, semantic errors and warnings come out of
//! validation after the whole grammar was read. All of them are accumulated here and reported
//! together once compilation finishes. Only errors make a grammar invalid; warnings never do.

use crate::sapcc::range::Location;
use serde::Serialize;
use std::fmt;

/// Diagnostic severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// Which stage found the problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticKind {
    Scan,
    Syntax,
    Semantic,
    Fatal,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::Scan => write!(f, "scanner"),
            DiagnosticKind::Syntax => write!(f, "syntax"),
            DiagnosticKind::Semantic => write!(f, "semantic"),
            DiagnosticKind::Fatal => write!(f, "fatal"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub location: Option<Location>,
    pub message: String,
}

impl Diagnostic {
    pub fn error(kind: DiagnosticKind, location: Option<Location>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            kind,
            location,
            message: message.into(),
        }
    }

    pub fn warning(kind: DiagnosticKind, location: Option<Location>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            location,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: ", self.kind, self.severity)?;
        if let Some(location) = &self.location {
            write!(f, "{}: ", location)?;
        }
        write!(f, "{}", self.message)
    }
}

/// Accumulates diagnostics in the order they were reported
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
    errors: usize,
    warnings: usize,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => self.errors += 1,
            Severity::Warning => self.warnings += 1,
        }
        tracing::debug!(%diagnostic, "reported");
        self.items.push(diagnostic);
    }

    pub fn error(&mut self, kind: DiagnosticKind, location: Option<Location>, message: impl Into<String>) {
        self.push(Diagnostic::error(kind, location, message));
    }

    pub fn warning(&mut self, kind: DiagnosticKind, location: Option<Location>, message: impl Into<String>) {
        self.push(Diagnostic::warning(kind, location, message));
    }

    pub fn error_count(&self) -> usize {
        self.errors
    }

    pub fn warning_count(&self) -> usize {
        self.warnings
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    /// Errors of one kind, in report order
    pub fn errors_of(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.items
            .iter()
            .filter(move |d| d.is_error() && d.kind == kind)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| !d.is_error())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// One-line summary for the end of a run
    pub fn summary(&self) -> String {
        format!("{} error(s), {} warning(s)", self.errors, self.warnings)
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for diagnostic in &self.items {
            writeln!(f, "{}", diagnostic)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sapcc::range::Position;
    use std::sync::Arc;

    #[test]
    fn test_counts_by_severity() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.error(DiagnosticKind::Syntax, None, "one");
        diagnostics.warning(DiagnosticKind::Semantic, None, "two");
        diagnostics.error(DiagnosticKind::Semantic, None, "three");

        assert_eq!(diagnostics.error_count(), 2);
        assert_eq!(diagnostics.warning_count(), 1);
        assert_eq!(diagnostics.errors_of(DiagnosticKind::Semantic).count(), 1);
        assert_eq!(diagnostics.summary(), "2 error(s), 1 warning(s)");
    }

    #[test]
    fn test_display_with_location() {
        let location = Location::new(Arc::from("g.sapcc"), Position::new(4, 2));
        let diagnostic = Diagnostic::error(DiagnosticKind::Syntax, Some(location), "expected a ':'");
        assert_eq!(
            diagnostic.to_string(),
            "syntax error: g.sapcc:4:2: expected a ':'"
        );
    }

    #[test]
    fn test_display_without_location() {
        let diagnostic = Diagnostic::warning(DiagnosticKind::Semantic, None, "unused");
        assert_eq!(diagnostic.to_string(), "semantic warning: unused");
    }
}
