//! Folds the productions of one file into an [`Api`].
//!
//! Every check here is local to the file being built. Cross-file rules live
//! in [`crate::validate`].

use std::collections::HashSet;

use super::{Api, AtDoc, AtServer, ImportExpr, InfoExpr, KvExpr, Service, SyntaxExpr, TypeExpr};
use crate::diagnostic::{CompilerError, DeclKind, Location, Span};
use crate::frontend::{self, Production};

/// Builds an [`Api`] from parsed productions, failing on the first
/// duplicate or missing handler.
pub struct ApiBuilder {
    prefix: String,
    api: Api,
    import_paths: HashSet<String>,
    import_aliases: HashSet<String>,
}

impl ApiBuilder {
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self {
            api: Api {
                line_prefix: prefix.clone(),
                ..Api::default()
            },
            prefix,
            import_paths: HashSet::new(),
            import_aliases: HashSet::new(),
        }
    }

    /// Folds one production into the api under construction.
    pub fn accept(&mut self, production: Production) -> Result<(), CompilerError> {
        match production {
            Production::Syntax(syntax) => self.accept_syntax(syntax),
            Production::Import(imports) => imports
                .into_iter()
                .try_for_each(|import| self.accept_import(import)),
            Production::Info(info) => self.accept_info(info),
            Production::Type(types) => types.into_iter().try_for_each(|ty| self.accept_type(ty)),
            Production::Service(service) => self.accept_service(service),
        }
    }

    pub fn finish(self) -> Api {
        self.api
    }

    fn at(&self, span: Span) -> Location {
        Location::new(self.prefix.as_str(), span)
    }

    fn accept_syntax(&mut self, syntax: SyntaxExpr) -> Result<(), CompilerError> {
        if self.api.syntax.is_some() {
            return Err(CompilerError::duplicate(
                self.at(syntax.keyword.span),
                DeclKind::Syntax,
                syntax.version.text,
            ));
        }
        self.api.syntax = Some(syntax);
        Ok(())
    }

    fn accept_import(&mut self, import: ImportExpr) -> Result<(), CompilerError> {
        if !self.import_paths.insert(import.path.text.clone()) {
            return Err(CompilerError::duplicate(
                self.at(import.path.span),
                DeclKind::Import,
                import.path.text,
            ));
        }

        if let Some(alias) = &import.alias {
            if !self.import_aliases.insert(alias.text.clone()) {
                return Err(CompilerError::duplicate(
                    self.at(alias.span),
                    DeclKind::ImportAlias,
                    alias.text.clone(),
                ));
            }
        }

        self.api.imports.push(import);
        Ok(())
    }

    fn accept_info(&mut self, info: InfoExpr) -> Result<(), CompilerError> {
        if self.api.info.is_some() {
            return Err(CompilerError::duplicate(
                self.at(info.keyword.span),
                DeclKind::Info,
                "info",
            ));
        }
        self.unique_keys(&info.kvs, DeclKind::InfoKey)?;
        self.api.info = Some(info);
        Ok(())
    }

    fn accept_type(&mut self, ty: TypeExpr) -> Result<(), CompilerError> {
        let name = ty.name();
        if !self.api.symbols.types.insert(name.text.clone()) {
            return Err(CompilerError::duplicate(
                self.at(name.span),
                DeclKind::Type,
                name.text.clone(),
            ));
        }

        if let TypeExpr::Struct(st) = &ty {
            let mut fields = HashSet::new();
            for field in st.fields.iter().filter(|f| !f.anonymous) {
                if !fields.insert(field.name.text.as_str()) {
                    return Err(CompilerError::duplicate(
                        self.at(field.name.span),
                        DeclKind::Field,
                        field.name.text.clone(),
                    ));
                }
            }
        }

        self.api.types.push(ty);
        Ok(())
    }

    fn accept_service(&mut self, service: Service) -> Result<(), CompilerError> {
        if let Some(expected) = self.api.service_name() {
            if *expected != service.name {
                return Err(CompilerError::ServiceMismatch {
                    at: self.at(service.name.span),
                    expected: expected.text.clone(),
                    found: service.name.text.clone(),
                });
            }
        }

        if let Some(server) = &service.at_server {
            self.unique_server_keys(server)?;
        }

        for item in &service.routes {
            let route = &item.route;
            if !self.api.symbols.routes.insert(route.key()) {
                return Err(CompilerError::duplicate(
                    self.at(route.method.span),
                    DeclKind::Route,
                    route.key(),
                ));
            }

            if let Some(server) = &item.at_server {
                self.unique_server_keys(server)?;
            }
            if let Some(AtDoc::Block(kvs)) = &item.doc {
                self.unique_keys(kvs, DeclKind::DocKey)?;
            }

            let Some(handler) = item.handler() else {
                return Err(CompilerError::MissingHandler {
                    at: self.at(route.method.span),
                    route: route.key(),
                });
            };
            if !self.api.symbols.handlers.insert(handler.text.clone()) {
                return Err(CompilerError::duplicate(
                    self.at(handler.span),
                    DeclKind::Handler,
                    handler.text.clone(),
                ));
            }
        }

        self.api.services.push(service);
        Ok(())
    }

    fn unique_server_keys(&self, server: &AtServer) -> Result<(), CompilerError> {
        self.unique_keys(&server.kvs, DeclKind::ServerKey)
    }

    fn unique_keys(&self, kvs: &[KvExpr], kind: DeclKind) -> Result<(), CompilerError> {
        let mut seen = HashSet::new();
        for kv in kvs {
            if !seen.insert(kv.key.text.as_str()) {
                return Err(CompilerError::duplicate(
                    self.at(kv.key.span),
                    kind,
                    kv.key.text.clone(),
                ));
            }
        }
        Ok(())
    }
}

/// Folds `productions` in source order.
pub fn build(productions: Vec<Production>, prefix: &str) -> Result<Api, CompilerError> {
    let mut builder = ApiBuilder::new(prefix);
    for production in productions {
        builder.accept(production)?;
    }
    Ok(builder.finish())
}

/// Parses and builds one file's source text.
pub fn build_source(source: &str, prefix: &str) -> Result<Api, CompilerError> {
    build(frontend::parse_source(source, prefix)?, prefix)
}
