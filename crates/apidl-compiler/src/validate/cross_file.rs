//! Rules that span the root file and its imports.

use std::collections::HashSet;

use crate::ast::{Api, Ident};
use crate::diagnostic::{CompilerError, DeclKind, Location, Span};
use crate::resolve::{ImportGraph, LoadedFile};

/// Checks each imported file against the root as it is loaded, then runs a
/// final pass over everything that gets merged.
pub struct CrossFileValidator {
    root_types: HashSet<String>,
    root_handlers: HashSet<String>,
    root_routes: HashSet<String>,
    /// Root types plus every nested type seen so far, keyed `alias.Name`
    /// for aliased imports.
    types: HashSet<String>,
}

impl CrossFileValidator {
    /// Starts from the uniqueness sets the builder filled for `root`.
    pub fn new(root: &Api) -> Self {
        let symbols = &root.symbols;
        Self {
            root_types: symbols.types.clone(),
            root_handlers: symbols.handlers.clone(),
            root_routes: symbols.routes.clone(),
            types: symbols.types.clone(),
        }
    }

    /// Validates one imported file against the root.
    pub fn check_nested(&mut self, root: &Api, nested: &LoadedFile) -> Result<(), CompilerError> {
        let api = &nested.api;
        let at = |span: Span| Location::new(api.line_prefix.as_str(), span);

        if let Some(import) = api.imports.first() {
            return Err(CompilerError::NestedImport {
                at: at(import.keyword.span),
            });
        }

        if let (Some(expected), Some(found)) = (&root.syntax, &api.syntax) {
            if expected.version != found.version {
                return Err(CompilerError::SyntaxMismatch {
                    at: at(found.keyword.span),
                    expected: expected.version.text.clone(),
                    found: found.version.text.clone(),
                });
            }
        }

        if let Some(expected) = root.service_name() {
            check_service_names(api, expected)?;
        }

        for item in api.routes() {
            let route = &item.route;
            let Some(handler) = item.handler() else {
                return Err(CompilerError::MissingHandler {
                    at: at(route.method.span),
                    route: route.key(),
                });
            };
            if self.root_handlers.contains(&handler.text) {
                return Err(CompilerError::duplicate(
                    at(handler.span),
                    DeclKind::Handler,
                    handler.text.clone(),
                ));
            }
            if self.root_routes.contains(&route.key()) {
                return Err(CompilerError::duplicate(
                    at(route.method.span),
                    DeclKind::Route,
                    route.key(),
                ));
            }
        }

        for ty in &api.types {
            let name = ty.name();

            // Root names are compared unqualified, even for aliased imports.
            if self.root_types.contains(&name.text) {
                return Err(CompilerError::duplicate(at(name.span), DeclKind::Type, name.text.clone()));
            }

            let key = match &nested.alias {
                Some(alias) => format!("{alias}.{}", name.text),
                None => name.text.clone(),
            };
            if !self.types.insert(key) {
                return Err(CompilerError::duplicate(at(name.span), DeclKind::Type, name.text.clone()));
            }
        }

        Ok(())
    }

    /// Re-checks every merged file against the others once all imports are
    /// loaded, including sibling imports that the root never declared.
    pub fn finish(&self, graph: &ImportGraph) -> Result<(), CompilerError> {
        let mut types = HashSet::new();
        let mut handlers = HashSet::new();
        let mut routes = HashSet::new();
        let mut service: Option<&Ident> = None;
        let mut syntax: Option<&Ident> = None;

        for file in graph.merged() {
            let api = &file.api;
            let at = |span: Span| Location::new(api.line_prefix.as_str(), span);

            if let Some(found) = &api.syntax {
                match syntax {
                    Some(expected) if *expected != found.version => {
                        return Err(CompilerError::SyntaxMismatch {
                            at: at(found.keyword.span),
                            expected: expected.text.clone(),
                            found: found.version.text.clone(),
                        })
                    }
                    Some(_) => {}
                    None => syntax = Some(&found.version),
                }
            }

            match service {
                Some(expected) => check_service_names(api, expected)?,
                None => service = api.service_name(),
            }

            for ty in &api.types {
                let name = ty.name();
                if !types.insert(name.text.as_str()) {
                    return Err(CompilerError::duplicate(at(name.span), DeclKind::Type, name.text.clone()));
                }
            }

            for item in api.routes() {
                if let Some(handler) = item.handler() {
                    if !handlers.insert(handler.text.as_str()) {
                        return Err(CompilerError::duplicate(
                            at(handler.span),
                            DeclKind::Handler,
                            handler.text.clone(),
                        ));
                    }
                }
                let key = item.route.key();
                if routes.contains(&key) {
                    return Err(CompilerError::duplicate(at(item.route.method.span), DeclKind::Route, key));
                }
                routes.insert(key);
            }
        }

        Ok(())
    }
}

fn check_service_names(api: &Api, expected: &Ident) -> Result<(), CompilerError> {
    match api.services.iter().find(|s| s.name != *expected) {
        Some(service) => Err(CompilerError::ServiceMismatch {
            at: Location::new(api.line_prefix.as_str(), service.name.span),
            expected: expected.text.clone(),
            found: service.name.text.clone(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::builder::build_source;
    use crate::diagnostic::ErrorKind;
    use crate::frontend::MemoryLoader;
    use crate::resolve::Resolver;

    fn graph(root: &str, files: &[(&str, &str)]) -> Result<ImportGraph, CompilerError> {
        let mut loader = MemoryLoader::new();
        for (path, content) in files {
            loader = loader.with_file(format!("/api/{path}"), *content);
        }
        let api = build_source(root, "main.api")?;
        let mut graph = ImportGraph::new(api, Some("/api/main.api".into()));
        let resolver = Resolver::new(&loader, "/api");
        let imports = graph.root().imports.clone();
        for import in &imports {
            resolver.load(&mut graph, import)?;
        }
        Ok(graph)
    }

    fn validate(root: &str, files: &[(&str, &str)]) -> Result<(), CompilerError> {
        let graph = graph(root, files)?;
        let mut validator = CrossFileValidator::new(graph.root());
        for file in graph.imported() {
            validator.check_nested(graph.root(), file)?;
        }
        validator.finish(&graph)
    }

    #[test]
    fn test_nested_import_rejected() {
        let err = validate(
            "import \"a.api\"",
            &[("a.api", "import \"b.api\""), ("b.api", "")],
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "a.api line 1:1 the nested api does not support import");
    }

    #[test]
    fn test_sibling_syntax_mismatch() {
        let err = validate(
            "import \"a.api\"\nimport \"b.api\"",
            &[("a.api", "syntax = \"v1\""), ("b.api", "syntax = \"v2\"")],
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Structural);
        assert!(err.to_string().starts_with("b.api line 1:1"));
    }

    #[test]
    fn test_sibling_handlers_collide() {
        let err = validate(
            "import \"a.api\"\nimport \"b.api\"",
            &[
                ("a.api", "service s {\n@handler h\nget /a\n}"),
                ("b.api", "service s {\n@handler h\nget /b\n}"),
            ],
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "b.api line 2:10 duplicate handler: h");
    }

    #[test]
    fn test_nested_route_collides_with_root() {
        let err = validate(
            "import \"a.api\"\nservice s {\n@handler root\nget /a\n}",
            &[("a.api", "service s {\n@handler other\nget /a\n}")],
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "a.api line 3:1 duplicate route: get /a");
    }

    #[test]
    fn test_root_type_collides_with_aliased_import() {
        let err = validate(
            "import \"a.api\" as a\ntype Foo int",
            &[("a.api", "type Foo int")],
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateDeclaration);
    }

    #[test]
    fn test_distinct_aliases_do_not_collide() {
        validate(
            "import \"a.api\" as a\nimport \"b.api\" as b",
            &[("a.api", "type Foo int"), ("b.api", "type Foo int")],
        )
        .unwrap();
    }
}
