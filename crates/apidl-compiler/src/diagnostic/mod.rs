//! Diagnostic types for error reporting.

mod error;
mod span;

pub use error::{CompilerError, DeclKind, ErrorKind};
pub use span::{Location, Span};
