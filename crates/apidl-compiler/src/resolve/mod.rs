//! Import resolution.
//!
//! Every file reachable from the root is loaded once into an [`ImportGraph`],
//! an arena keyed by resolved path. Aliased imports are recorded in the
//! graph's [`ImportRegistry`] and stay out of the merged namespace.

mod path;

pub use path::{line_prefix, normalize, resolve_import_path};

use std::collections::HashMap;
use std::path::PathBuf;

use crate::ast::builder::build_source;
use crate::ast::{Api, ImportExpr, ImportInfo, ImportRegistry};
use crate::diagnostic::{CompilerError, DeclKind, Location};
use crate::frontend::SourceLoader;

/// One loaded api file.
#[derive(Debug, Clone)]
pub struct LoadedFile {
    /// Resolved path. `None` for a root parsed from in-memory content.
    pub path: Option<PathBuf>,
    /// Alias the file was imported under.
    pub alias: Option<String>,
    pub api: Api,
}

impl LoadedFile {
    /// Whether the file's declarations join the root namespace.
    pub fn is_merged(&self) -> bool {
        self.alias.is_none()
    }
}

/// Arena of loaded files. Index 0 is the root.
#[derive(Debug)]
pub struct ImportGraph {
    files: Vec<LoadedFile>,
    by_path: HashMap<PathBuf, usize>,
    registry: ImportRegistry,
}

impl ImportGraph {
    pub fn new(root: Api, root_path: Option<PathBuf>) -> Self {
        let mut by_path = HashMap::new();
        if let Some(path) = &root_path {
            by_path.insert(path.clone(), 0);
        }
        Self {
            files: vec![LoadedFile {
                path: root_path,
                alias: None,
                api: root,
            }],
            by_path,
            registry: ImportRegistry::new(),
        }
    }

    pub fn root(&self) -> &Api {
        &self.files[0].api
    }

    pub fn file(&self, index: usize) -> &LoadedFile {
        &self.files[index]
    }

    /// Imported files in visitation order.
    pub fn imported(&self) -> impl Iterator<Item = &LoadedFile> {
        self.files.iter().skip(1)
    }

    /// The root followed by every unaliased import.
    pub fn merged(&self) -> impl Iterator<Item = &LoadedFile> {
        self.files.iter().filter(|f| f.is_merged())
    }

    pub fn registry(&self) -> &ImportRegistry {
        &self.registry
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn push(&mut self, path: PathBuf, alias: Option<String>, api: Api) -> usize {
        let index = self.files.len();
        self.by_path.insert(path.clone(), index);
        self.files.push(LoadedFile {
            path: Some(path),
            alias,
            api,
        });
        index
    }
}

/// Loads imported files through a [`SourceLoader`].
pub struct Resolver<'l, L: SourceLoader + ?Sized> {
    loader: &'l L,
    work_dir: PathBuf,
}

impl<'l, L: SourceLoader + ?Sized> Resolver<'l, L> {
    /// `work_dir` is the directory of the root file.
    pub fn new(loader: &'l L, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            loader,
            work_dir: work_dir.into(),
        }
    }

    /// Loads and builds the file behind `import`, returning its arena index.
    pub fn load(
        &self,
        graph: &mut ImportGraph,
        import: &ImportExpr,
    ) -> Result<usize, CompilerError> {
        let root_prefix = graph.root().line_prefix.clone();
        let at = Location::new(root_prefix, import.path.span);

        let path = resolve_import_path(&self.work_dir, &import.path.text).map_err(|message| {
            CompilerError::ImportPath {
                at: at.clone(),
                path: import.path.text.clone(),
                message,
            }
        })?;

        if graph.by_path.contains_key(&path) {
            return Err(CompilerError::duplicate(
                at,
                DeclKind::Import,
                import.path.text.clone(),
            ));
        }

        let source = self.loader.load(&path)?;
        let api = build_source(&source, &line_prefix(&import.path.text))?;
        tracing::trace!(
            import = %import.path,
            resolved = %path.display(),
            types = api.types.len(),
            "loaded import"
        );

        let alias = import.alias.as_ref().map(|a| a.text.clone());
        if let Some(alias) = &alias {
            graph.registry.entry(alias.clone()).or_default().push(ImportInfo {
                path: import.path.text.clone(),
                alias: alias.clone(),
                types: api
                    .types
                    .iter()
                    .map(|ty| (ty.name().text.clone(), ty.clone()))
                    .collect(),
            });
        }

        Ok(graph.push(path, alias, api))
    }
}
