//! Source frontend: text to productions.
//!
//! The frontend is responsible for:
//! 1. Loading api source text through a [`SourceLoader`]
//! 2. Tokenizing it with the `logos` lexer
//! 3. Parsing the tokens into top-level [`Production`]s
//!
//! Productions are folded into an [`Api`](crate::ast::Api) by the
//! [`builder`](crate::ast::builder).

pub mod lexer;
pub mod parser;
pub mod token;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::ast::{ImportExpr, InfoExpr, Service, SyntaxExpr, TypeExpr};
use crate::diagnostic::CompilerError;

/// One top-level rule of an api file, in source order.
#[derive(Debug, Clone, PartialEq)]
pub enum Production {
    Syntax(SyntaxExpr),
    /// A single import or an import group.
    Import(Vec<ImportExpr>),
    Info(InfoExpr),
    /// A single type or a type group.
    Type(Vec<TypeExpr>),
    Service(Service),
}

/// Tokenizes and parses `source`. `prefix` labels diagnostics.
pub fn parse_source(source: &str, prefix: &str) -> Result<Vec<Production>, CompilerError> {
    let tokens = lexer::lex(source, prefix)?;
    tracing::trace!(prefix, tokens = tokens.len(), "tokenized api source");
    parser::Parser::new(source, &tokens, prefix).parse()
}

/// Where api source text comes from.
pub trait SourceLoader {
    /// Reads the file at `path`.
    fn load(&self, path: &Path) -> Result<String, CompilerError>;
}

/// Reads api files from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSystemLoader;

impl SourceLoader for FileSystemLoader {
    fn load(&self, path: &Path) -> Result<String, CompilerError> {
        std::fs::read_to_string(path).map_err(|e| CompilerError::io(path, e.to_string()))
    }
}

/// Serves api files from memory. Paths must match exactly.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    files: HashMap<PathBuf, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }
}

impl SourceLoader for MemoryLoader {
    fn load(&self, path: &Path) -> Result<String, CompilerError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| CompilerError::io(path, "No such file or directory"))
    }
}

impl<L: SourceLoader + ?Sized> SourceLoader for &L {
    fn load(&self, path: &Path) -> Result<String, CompilerError> {
        (**self).load(path)
    }
}

/// Collects every `*.api` file under `dir`, sorted by path.
pub fn discover_api_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "api"))
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_productions_in_source_order() {
        let productions = parse_source(
            "syntax = \"v1\"\ninfo(title: demo)\ntype Foo int\nservice a {\n@handler a\nget /a\n}",
            "",
        )
        .unwrap();
        assert!(matches!(productions[0], Production::Syntax(_)));
        assert!(matches!(productions[1], Production::Info(_)));
        assert!(matches!(productions[2], Production::Type(_)));
        assert!(matches!(productions[3], Production::Service(_)));
    }

    #[test]
    fn test_memory_loader_missing_file() {
        let loader = MemoryLoader::new().with_file("/api/a.api", "type A int");
        assert_eq!(loader.load(Path::new("/api/a.api")).unwrap(), "type A int");
        let err = loader.load(Path::new("/api/b.api")).unwrap_err();
        assert!(err.to_string().contains("/api/b.api"));
    }

    #[test]
    fn test_discover_api_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("b.api"), "").unwrap();
        std::fs::write(dir.path().join("nested/a.api"), "").unwrap();
        std::fs::write(dir.path().join("readme.md"), "").unwrap();

        let files = discover_api_files(dir.path());
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.extension().unwrap() == "api"));
    }
}
