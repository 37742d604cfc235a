//! Parser configuration.

/// Configuration for the api parser.
#[derive(Debug, Clone, Default)]
pub struct ParserConfig {
    /// Label used in diagnostics for content parsed without a file name.
    /// Files read from disk are always labelled with their base name.
    pub line_prefix: Option<String>,

    /// Log failed parses at error level before returning them.
    pub debug: bool,
}

impl ParserConfig {
    /// Sets the diagnostic label for in-memory content.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.line_prefix = Some(prefix.into());
        self
    }

    /// Enables debug logging of parse failures.
    pub fn with_debug(mut self) -> Self {
        self.debug = true;
        self
    }
}
