//! Combines the loaded files into the api handed to callers.

use crate::ast::Api;
use crate::resolve::ImportGraph;

/// Builds the final [`Api`]: syntax, info and imports from the root; types
/// and services from every merged file in visitation order.
pub fn merge(graph: &ImportGraph) -> Api {
    let root = graph.root();
    let mut api = Api {
        line_prefix: root.line_prefix.clone(),
        syntax: root.syntax.clone(),
        imports: root.imports.clone(),
        info: root.info.clone(),
        import_info: graph.registry().clone(),
        ..Api::default()
    };

    for file in graph.merged() {
        api.types.extend(file.api.types.iter().cloned());
        api.services.extend(file.api.services.iter().cloned());
    }

    api
}
