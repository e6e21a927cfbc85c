// diag.rs — Diagnostic codes and translation errors
//
// Provides the shared error type used by every translation phase: the
// markup reader, the hybrid-automaton reader, the per-kind assemblers and
// the network driver.
//
// Preconditions: none (types only).
// Postconditions: none (types only).
// Failure modes: none.
// Side effects: none.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

// ── Diagnostic code ──────────────────────────────────────────────────────

/// A stable diagnostic code (e.g., `E0100`, `E0200`).
///
/// Codes are `&'static str` constants defined in the `codes` module.
/// Once assigned, a code must never be reassigned to a different meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiagCode(pub &'static str);

impl fmt::Display for DiagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable code registry.
///
/// - `E00xx`: document loading
/// - `E01xx`: configuration (malformed or wrong-kind input)
/// - `E02xx`: reference (unknown regime or population)
/// - `E03xx`: unsupported construct
pub mod codes {
    use super::DiagCode;

    pub const E0001: DiagCode = DiagCode("E0001"); // markup parse failure
    pub const E0002: DiagCode = DiagCode("E0002"); // file could not be read

    pub const E0100: DiagCode = DiagCode("E0100"); // unexpected document root
    pub const E0101: DiagCode = DiagCode("E0101"); // ComponentClass missing or wrong kind
    pub const E0102: DiagCode = DiagCode("E0102"); // Dynamics missing
    pub const E0103: DiagCode = DiagCode("E0103"); // OnCondition without trigger
    pub const E0104: DiagCode = DiagCode("E0104"); // single-regime transition leaves regime
    pub const E0105: DiagCode = DiagCode("E0105"); // required attribute missing
    pub const E0106: DiagCode = DiagCode("E0106"); // required child node missing
    pub const E0107: DiagCode = DiagCode("E0107"); // connection without Delay
    pub const E0108: DiagCode = DiagCode("E0108"); // malformed numeric attribute
    pub const E0109: DiagCode = DiagCode("E0109"); // regime name declared twice
    pub const E0110: DiagCode = DiagCode("E0110"); // timestep not positive and finite

    pub const E0200: DiagCode = DiagCode("E0200"); // unknown target regime
    pub const E0201: DiagCode = DiagCode("E0201"); // unknown population

    pub const E0300: DiagCode = DiagCode("E0300"); // delay is not a single fixed value
    pub const E0301: DiagCode = DiagCode("E0301"); // transition kind has no policy for model kind
    pub const E0302: DiagCode = DiagCode("E0302"); // no supported connection type
    pub const E0303: DiagCode = DiagCode("E0303"); // more than one neuron analogue input
}

// ── Error category ───────────────────────────────────────────────────────

/// Coarse error taxonomy. Every category is fail-fast and non-retryable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Reference,
    Unsupported,
    Parse,
    Io,
}

// ── Translation error ────────────────────────────────────────────────────

/// Error raised by any translation phase.
///
/// `context` locates the offending fragment (component URL, node name or
/// both, joined with `: `).
#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("configuration error[{code}]: {context}: {message}")]
    Configuration {
        code: DiagCode,
        context: String,
        message: String,
    },
    #[error("reference error[{code}]: {context}: {message}")]
    Reference {
        code: DiagCode,
        context: String,
        message: String,
    },
    #[error("unsupported feature[{code}]: {context}: {message}")]
    Unsupported {
        code: DiagCode,
        context: String,
        message: String,
    },
    #[error("parse error[E0001]: {path}: {}", .errors.join("; "))]
    Parse { path: String, errors: Vec<String> },
    #[error("io error[E0002]: {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, TranslateError>;

impl TranslateError {
    pub fn configuration(
        code: DiagCode,
        context: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        TranslateError::Configuration {
            code,
            context: context.into(),
            message: message.into(),
        }
    }

    pub fn reference(
        code: DiagCode,
        context: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        TranslateError::Reference {
            code,
            context: context.into(),
            message: message.into(),
        }
    }

    pub fn unsupported(
        code: DiagCode,
        context: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        TranslateError::Unsupported {
            code,
            context: context.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TranslateError::Configuration { .. } => ErrorKind::Configuration,
            TranslateError::Reference { .. } => ErrorKind::Reference,
            TranslateError::Unsupported { .. } => ErrorKind::Unsupported,
            TranslateError::Parse { .. } => ErrorKind::Parse,
            TranslateError::Io { .. } => ErrorKind::Io,
        }
    }

    pub fn code(&self) -> DiagCode {
        match self {
            TranslateError::Configuration { code, .. }
            | TranslateError::Reference { code, .. }
            | TranslateError::Unsupported { code, .. } => *code,
            TranslateError::Parse { .. } => codes::E0001,
            TranslateError::Io { .. } => codes::E0002,
        }
    }

    /// Prefix the error context with an outer location, e.g. the URL of the
    /// component document the failing node belongs to.
    pub fn within(mut self, outer: &str) -> Self {
        match &mut self {
            TranslateError::Configuration { context, .. }
            | TranslateError::Reference { context, .. }
            | TranslateError::Unsupported { context, .. } => {
                *context = format!("{}: {}", outer, context);
            }
            TranslateError::Parse { .. } | TranslateError::Io { .. } => {}
        }
        self
    }
}
