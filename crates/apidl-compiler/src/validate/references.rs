//! Type reference checking.
//!
//! Every field type, alias target, request and response of the merged files
//! must name a basic type, a merged declaration, or a declaration reachable
//! through an import alias.

use std::collections::HashSet;

use crate::ast::{is_basic_type, Api, DataType, ImportRegistry, Literal, TypeExpr};
use crate::diagnostic::{CompilerError, Location};
use crate::resolve::ImportGraph;

/// Resolves type references against one merged symbol table.
pub struct ReferenceChecker<'g> {
    types: HashSet<&'g str>,
    registry: &'g ImportRegistry,
}

impl<'g> ReferenceChecker<'g> {
    pub fn new(graph: &'g ImportGraph) -> Self {
        let types = graph
            .merged()
            .flat_map(|file| file.api.types.iter())
            .map(|ty| ty.name().text.as_str())
            .collect();
        Self {
            types,
            registry: graph.registry(),
        }
    }

    /// Checks every reference in one file. Errors carry that file's prefix.
    pub fn check_api(&self, api: &Api) -> Result<(), CompilerError> {
        let prefix = api.line_prefix.as_str();

        for ty in &api.types {
            match ty {
                TypeExpr::Struct(st) => {
                    for field in &st.fields {
                        self.check(prefix, &field.data_type)?;
                    }
                }
                TypeExpr::Alias(alias) => self.check(prefix, &alias.data_type)?,
            }
        }

        for item in api.routes() {
            if let Some(request) = &item.route.request {
                self.check(prefix, request)?;
            }
            if let Some(response) = &item.route.response {
                self.check(prefix, response)?;
            }
        }

        Ok(())
    }

    fn check(&self, prefix: &str, data_type: &DataType) -> Result<(), CompilerError> {
        match data_type {
            DataType::Literal(lit) | DataType::Pointer(lit) => self.check_literal(prefix, lit),
            DataType::Map { value, .. } => self.check(prefix, value),
            DataType::Array(element) => self.check(prefix, element),
            DataType::Interface(_) | DataType::Time(_) => Ok(()),
        }
    }

    fn check_literal(&self, prefix: &str, lit: &Literal) -> Result<(), CompilerError> {
        let name = lit.name.as_str();
        if is_basic_type(name) {
            return Ok(());
        }

        let Some(package) = &lit.package else {
            if self.types.contains(name) {
                return Ok(());
            }
            return Err(CompilerError::UnresolvedType {
                at: Location::new(prefix, lit.name.span),
                name: name.to_string(),
            });
        };

        let Some(imports) = self.registry.get(&package.text) else {
            // `*time.Time` and `[]time.Time` parse as plain qualified names.
            if package.text == "time" && name == "Time" {
                return Ok(());
            }
            return Err(CompilerError::UndefinedPackage {
                at: Location::new(prefix, lit.span()),
                package: package.text.clone(),
            });
        };

        if imports.iter().any(|info| info.types.contains_key(name)) {
            return Ok(());
        }

        Err(CompilerError::UnresolvedImportType {
            at: Location::new(prefix, lit.span()),
            name: name.to_string(),
            imports: imports
                .iter()
                .map(|info| info.path.as_str())
                .collect::<Vec<_>>()
                .join(" and "),
        })
    }
}

/// Checks every merged file of `graph`.
pub fn check_references(graph: &ImportGraph) -> Result<(), CompilerError> {
    let checker = ReferenceChecker::new(graph);
    for file in graph.merged() {
        checker.check_api(&file.api)?;
    }
    Ok(())
}
