//! # apidl compiler
//!
//! This crate parses `.api` service definition files into a validated,
//! merged AST that code generators consume.
//!
//! ## Architecture
//!
//! ```text
//! root .api file
//!        │
//!        ▼
//! ┌──────────────┐
//! │   Frontend   │  logos lexer + recursive descent
//! │ (text → AST) │  one Api per file, local duplicates
//! └──────┬───────┘
//!        │
//!        ▼
//! ┌──────────────┐
//! │   Resolve    │  load imports into an arena,
//! │  (imports)   │  register aliased imports
//! └──────┬───────┘
//!        │
//!        ▼
//! ┌──────────────┐
//! │   Validate   │  cross-file duplicates, nested imports,
//! │ (cross-file) │  syntax / service consistency
//! └──────┬───────┘
//!        │
//!        ▼
//! ┌──────────────┐
//! │    Merge     │  root header + all types and services
//! └──────┬───────┘
//!        │
//!        ▼
//! ┌──────────────┐
//! │   Validate   │  every type reference resolves
//! │ (references) │
//! └──────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use apidl_compiler::{ApiParser, ParserConfig};
//!
//! let parser = ApiParser::new(ParserConfig::default());
//! let api = parser.parse("service/user.api")?;
//! for route in api.routes() {
//!     println!("{}", route.route.key());
//! }
//! ```

pub mod ast;
pub mod config;
pub mod diagnostic;
pub mod frontend;
pub mod merge;
pub mod resolve;
pub mod validate;

use std::path::{Path, PathBuf};

pub use ast::{is_basic_type, Api, BASIC_TYPES};
pub use config::ParserConfig;
pub use diagnostic::{CompilerError, ErrorKind};
pub use frontend::{discover_api_files, FileSystemLoader, MemoryLoader, SourceLoader};

use resolve::{ImportGraph, Resolver};
use validate::CrossFileValidator;

/// Parses api files and everything they import.
///
/// A parser holds only its configuration and loader; every call starts from
/// empty symbol tables.
pub struct ApiParser<L: SourceLoader = FileSystemLoader> {
    config: ParserConfig,
    loader: L,
}

impl ApiParser {
    /// Creates a parser that reads from disk.
    pub fn new(config: ParserConfig) -> Self {
        Self::with_loader(config, FileSystemLoader)
    }
}

impl<L: SourceLoader> ApiParser<L> {
    pub fn with_loader(config: ParserConfig, loader: L) -> Self {
        Self { config, loader }
    }

    /// Parses the file at `path`. Imports resolve against its directory and
    /// diagnostics are labelled with its base name.
    pub fn parse(&self, path: impl AsRef<Path>) -> Result<Api, CompilerError> {
        let path = path.as_ref();
        let result = absolute(path).and_then(|abs| {
            let content = self.loader.load(&abs)?;
            let work_dir = abs.parent().map(Path::to_path_buf).unwrap_or_default();
            let prefix = resolve::line_prefix(&path.to_string_lossy());
            self.run(Some(abs), &prefix, &content, &work_dir)
        });
        self.report(result)
    }

    /// Parses in-memory `content`. Imports resolve against `work_dir`.
    pub fn parse_content(
        &self,
        content: &str,
        work_dir: impl AsRef<Path>,
    ) -> Result<Api, CompilerError> {
        let prefix = self.config.line_prefix.clone().unwrap_or_default();
        let result = absolute(work_dir.as_ref())
            .and_then(|work_dir| self.run(None, &prefix, content, &work_dir));
        self.report(result)
    }

    fn run(
        &self,
        root_path: Option<PathBuf>,
        prefix: &str,
        content: &str,
        work_dir: &Path,
    ) -> Result<Api, CompilerError> {
        tracing::debug!(prefix, "building root ast");
        let root = ast::builder::build_source(content, prefix)?;

        let mut graph = ImportGraph::new(root, root_path);
        let resolver = Resolver::new(&self.loader, work_dir);
        let mut validator = CrossFileValidator::new(graph.root());

        let imports = graph.root().imports.clone();
        tracing::debug!(imports = imports.len(), work_dir = %work_dir.display(), "resolving imports");
        for import in &imports {
            let index = resolver.load(&mut graph, import)?;
            validator.check_nested(graph.root(), graph.file(index))?;
        }
        validator.finish(&graph)?;

        tracing::debug!(files = graph.len(), "merging");
        let api = merge::merge(&graph);

        tracing::debug!(types = api.types.len(), "checking type references");
        validate::check_references(&graph)?;

        Ok(api)
    }

    fn report(&self, result: Result<Api, CompilerError>) -> Result<Api, CompilerError> {
        if let Err(err) = &result {
            if self.config.debug {
                tracing::error!(kind = ?err.kind(), "{err}");
            }
        }
        result
    }
}

/// Absolute and lexically clean, so leading `../` imports pop real
/// directories.
fn absolute(path: &Path) -> Result<PathBuf, CompilerError> {
    std::path::absolute(path)
        .map(|abs| resolve::normalize(&abs))
        .map_err(|e| CompilerError::io(path, e.to_string()))
}
