/// The kind of failure a [`ParseError`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// The input did not conform to the record grammar.
    Syntax,
    /// Parsing exceeded its configured wall-time cap.
    Timeout,
}

/// An error produced while parsing record-format text.
#[derive(Debug, Clone, thiserror::Error)]
#[error("record parse error at offset {offset}: {message}")]
pub struct ParseError {
    /// Byte offset into the input where the error was detected.
    pub offset: usize,
    /// Human-readable description.
    pub message: String,
    /// Whether this was a syntax error or a timeout.
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub(crate) fn syntax(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
            kind: ParseErrorKind::Syntax,
        }
    }

    pub(crate) fn timeout(offset: usize) -> Self {
        Self {
            offset,
            message: "parse exceeded its wall-time cap".to_string(),
            kind: ParseErrorKind::Timeout,
        }
    }
}

/// Convenience alias for parser results.
pub type ParseResult<T> = Result<T, ParseError>;
