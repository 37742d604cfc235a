//! Compiler error types.
#![allow(unused_assignments)]

use std::fmt;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use super::span::Location;

/// Broad classification of a [`CompilerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A root or imported file could not be read.
    Io,
    /// Malformed token stream.
    Syntax,
    /// A name, key or route declared more than once.
    DuplicateDeclaration,
    /// Files that cannot be combined, or a route without a handler.
    Structural,
    /// A type reference that does not resolve.
    UnresolvedReference,
}

/// What kind of declaration a duplicate refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Syntax,
    Import,
    ImportAlias,
    Info,
    InfoKey,
    Type,
    Field,
    ServerKey,
    DocKey,
    Handler,
    Route,
}

impl fmt::Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Syntax => "syntax declaration",
            Self::Import => "import",
            Self::ImportAlias => "import alias",
            Self::Info => "info declaration",
            Self::InfoKey => "key",
            Self::Type => "type declaration",
            Self::Field => "field",
            Self::ServerKey => "key",
            Self::DocKey => "key",
            Self::Handler => "handler",
            Self::Route => "route",
        };
        f.write_str(text)
    }
}

/// Errors that can occur while parsing and validating api files.
#[allow(unused_assignments)]
#[derive(Error, Diagnostic, Debug)]
pub enum CompilerError {
    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("Failed to read file '{}': {message}", path.display())]
    #[diagnostic(code(apidl::io::read_error))]
    IoError {
        path: PathBuf,
        message: String,
    },

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("{at} {message}")]
    #[diagnostic(code(apidl::parse::syntax_error))]
    SyntaxError {
        at: Location,
        message: String,
    },

    // =========================================================================
    // Duplicate Declarations
    // =========================================================================
    #[error("{at} duplicate {kind}: {name}")]
    #[diagnostic(
        code(apidl::duplicate::declaration),
        help("Names must be unique across the root file and every file it imports without an alias.")
    )]
    DuplicateDeclaration {
        at: Location,
        kind: DeclKind,
        name: String,
    },

    // =========================================================================
    // Structure Errors
    // =========================================================================
    #[error("{at} the nested api does not support import")]
    #[diagnostic(
        code(apidl::structure::nested_import),
        help("Only the root file may import other files. Move the import into the root file.")
    )]
    NestedImport {
        at: Location,
    },

    #[error("{at} multiple syntax declaration, expecting syntax '{expected}', but found '{found}'")]
    #[diagnostic(code(apidl::structure::syntax_mismatch))]
    SyntaxMismatch {
        at: Location,
        expected: String,
        found: String,
    },

    #[error("{at} multiple service name declaration, expecting service name '{expected}', but found '{found}'")]
    #[diagnostic(
        code(apidl::structure::service_mismatch),
        help("All service blocks merged into one api must use the same service name.")
    )]
    ServiceMismatch {
        at: Location,
        expected: String,
        found: String,
    },

    #[error("{at} missing handler for route '{route}'")]
    #[diagnostic(
        code(apidl::structure::missing_handler),
        help("Declare the handler with `@handler Name` or `@server(handler: Name)`.")
    )]
    MissingHandler {
        at: Location,
        route: String,
    },

    #[error("{at} can not resolve import path '{path}': {message}")]
    #[diagnostic(code(apidl::structure::import_path))]
    ImportPath {
        at: Location,
        path: String,
        message: String,
    },

    // =========================================================================
    // Reference Errors
    // =========================================================================
    #[error("{at} can not find declaration '{name}' in context")]
    #[diagnostic(code(apidl::types::unknown_reference))]
    UnresolvedType {
        at: Location,
        name: String,
    },

    #[error("{at} package '{package}' is not defined in imports")]
    #[diagnostic(
        code(apidl::types::unknown_package),
        help("Import the file with `import \"file.api\" as {package}`.")
    )]
    UndefinedPackage {
        at: Location,
        package: String,
    },

    #[error("{at} can not find declaration '{name}' in import '{imports}'")]
    #[diagnostic(code(apidl::types::unknown_import_reference))]
    UnresolvedImportType {
        at: Location,
        name: String,
        imports: String,
    },
}

impl CompilerError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::IoError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a syntax error.
    pub fn syntax(at: Location, message: impl Into<String>) -> Self {
        Self::SyntaxError {
            at,
            message: message.into(),
        }
    }

    /// Creates a duplicate declaration error.
    pub fn duplicate(at: Location, kind: DeclKind, name: impl Into<String>) -> Self {
        Self::DuplicateDeclaration {
            at,
            kind,
            name: name.into(),
        }
    }

    /// Returns the category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::IoError { .. } => ErrorKind::Io,
            Self::SyntaxError { .. } => ErrorKind::Syntax,
            Self::DuplicateDeclaration { .. } => ErrorKind::DuplicateDeclaration,
            Self::NestedImport { .. }
            | Self::SyntaxMismatch { .. }
            | Self::ServiceMismatch { .. }
            | Self::MissingHandler { .. }
            | Self::ImportPath { .. } => ErrorKind::Structural,
            Self::UnresolvedType { .. }
            | Self::UndefinedPackage { .. }
            | Self::UnresolvedImportType { .. } => ErrorKind::UnresolvedReference,
        }
    }

    /// Returns the source location, if the error points into a file.
    pub fn location(&self) -> Option<&Location> {
        match self {
            Self::IoError { .. } => None,
            Self::SyntaxError { at, .. }
            | Self::DuplicateDeclaration { at, .. }
            | Self::NestedImport { at }
            | Self::SyntaxMismatch { at, .. }
            | Self::ServiceMismatch { at, .. }
            | Self::MissingHandler { at, .. }
            | Self::ImportPath { at, .. }
            | Self::UnresolvedType { at, .. }
            | Self::UndefinedPackage { at, .. }
            | Self::UnresolvedImportType { at, .. } => Some(at),
        }
    }
}
