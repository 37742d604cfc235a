//! Api abstract syntax tree.
//!
//! One [`Api`] is produced per file by the [`builder`]; the resolver then
//! merges the root file with its imports into the final value handed to
//! generators. Every leaf that came from source text is an [`Ident`], which
//! remembers its [`Span`] but compares by text alone, so parsed trees can be
//! checked against hand-built ones.

pub mod builder;
mod builtin;

pub use builtin::{is_basic_type, BASIC_TYPES};

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::Serialize;

use crate::diagnostic::Span;

/// A piece of source text with its position.
#[derive(Debug, Clone, Serialize)]
pub struct Ident {
    pub text: String,
    pub span: Span,
}

impl Ident {
    /// Creates an identifier without a source position.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            span: Span::default(),
        }
    }

    pub fn with_span(text: impl Into<String>, span: Span) -> Self {
        Self {
            text: text.into(),
            span,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl PartialEq for Ident {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for Ident {}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

// =============================================================================
// Root
// =============================================================================

/// Aliased imports, keyed by alias.
pub type ImportRegistry = BTreeMap<String, Vec<ImportInfo>>;

/// The root AST node.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Api {
    /// Diagnostic label of the file this value was built from.
    #[serde(skip)]
    pub line_prefix: String,
    pub syntax: Option<SyntaxExpr>,
    pub imports: Vec<ImportExpr>,
    pub info: Option<InfoExpr>,
    pub types: Vec<TypeExpr>,
    pub services: Vec<Service>,
    /// Aliased imports of the merged api. Empty on per-file values.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub import_info: ImportRegistry,
    #[serde(skip)]
    pub symbols: LocalSymbols,
}

/// Uniqueness sets filled while building one file. Empty on the merged api.
#[derive(Debug, Clone, Default)]
pub struct LocalSymbols {
    pub types: HashSet<String>,
    pub handlers: HashSet<String>,
    pub routes: HashSet<String>,
}

impl Api {
    /// Name of the first declared service, if any.
    pub fn service_name(&self) -> Option<&Ident> {
        self.services.first().map(|s| &s.name)
    }

    /// Iterates over every route of every service block.
    pub fn routes(&self) -> impl Iterator<Item = &ServiceRoute> {
        self.services.iter().flat_map(|s| s.routes.iter())
    }

    pub fn find_type(&self, name: &str) -> Option<&TypeExpr> {
        self.types.iter().find(|t| t.name().text == name)
    }
}

/// Structural equality: imports and types compare as sets, services in order.
/// Positions, line prefixes and resolution bookkeeping are ignored.
impl PartialEq for Api {
    fn eq(&self, other: &Self) -> bool {
        if self.syntax != other.syntax || self.info != other.info {
            return false;
        }

        if self.imports.len() != other.imports.len() || self.types.len() != other.types.len() {
            return false;
        }

        let mut expected_imports: Vec<_> = self.imports.iter().collect();
        let mut actual_imports: Vec<_> = other.imports.iter().collect();
        expected_imports.sort_by(|a, b| a.path.text.cmp(&b.path.text));
        actual_imports.sort_by(|a, b| a.path.text.cmp(&b.path.text));
        if expected_imports != actual_imports {
            return false;
        }

        let mut expected_types: Vec<_> = self.types.iter().collect();
        let mut actual_types: Vec<_> = other.types.iter().collect();
        expected_types.sort_by(|a, b| a.name().text.cmp(&b.name().text));
        actual_types.sort_by(|a, b| a.name().text.cmp(&b.name().text));
        if expected_types != actual_types {
            return false;
        }

        self.services == other.services
    }
}

// =============================================================================
// Header declarations
// =============================================================================

/// `syntax = "v1"`. The version is stored without quotes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyntaxExpr {
    pub keyword: Ident,
    pub version: Ident,
}

/// `import "path"` or `import "path" as alias`. The path is stored without quotes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportExpr {
    pub keyword: Ident,
    pub path: Ident,
    pub alias: Option<Ident>,
}

/// `info ( key: value ... )`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfoExpr {
    pub keyword: Ident,
    pub kvs: Vec<KvExpr>,
}

/// One `key: value` pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KvExpr {
    pub key: Ident,
    pub value: Ident,
}

impl KvExpr {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: Ident::new(key),
            value: Ident::new(value),
        }
    }
}

/// Information about an aliased import.
#[derive(Debug, Clone, Serialize)]
pub struct ImportInfo {
    /// Import path as written in the importing file.
    pub path: String,
    pub alias: String,
    /// Types declared by the imported file, keyed by unqualified name.
    pub types: BTreeMap<String, TypeExpr>,
}

// =============================================================================
// Types
// =============================================================================

/// A type declaration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeExpr {
    /// `type Name { fields }` or `type Name struct { fields }`
    Struct(TypeStruct),
    /// `type Name int`
    Alias(TypeAlias),
}

impl TypeExpr {
    pub fn name(&self) -> &Ident {
        match self {
            Self::Struct(s) => &s.name,
            Self::Alias(a) => &a.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeStruct {
    pub name: Ident,
    pub fields: Vec<TypeField>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeAlias {
    pub name: Ident,
    pub data_type: DataType,
}

/// A struct field. Anonymous (embedded) fields are named after their type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeField {
    pub name: Ident,
    pub data_type: DataType,
    /// Raw tag text without the surrounding back quotes.
    pub tag: Option<Ident>,
    pub anonymous: bool,
}

impl TypeField {
    pub fn named(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: Ident::new(name),
            data_type,
            tag: None,
            anonymous: false,
        }
    }
}

/// The type of a field, request or response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "of", rename_all = "snake_case")]
pub enum DataType {
    /// `Name` or `pkg.Name`
    Literal(Literal),
    /// `*Name` or `*pkg.Name`
    Pointer(Literal),
    /// `map[key]Value`
    Map { key: Ident, value: Box<DataType> },
    /// `[]Element`
    Array(Box<DataType>),
    /// `interface{}`
    Interface(Ident),
    /// `time.Time`
    Time(Ident),
}

impl DataType {
    /// Unqualified literal, handy for building expected trees.
    pub fn literal(name: impl Into<String>) -> Self {
        Self::Literal(Literal::new(name))
    }

    pub fn array(element: DataType) -> Self {
        Self::Array(Box::new(element))
    }

    /// Position of the first token of this type.
    pub fn span(&self) -> Span {
        match self {
            Self::Literal(lit) | Self::Pointer(lit) => lit.span(),
            Self::Map { key, .. } => key.span,
            Self::Array(element) => element.span(),
            Self::Interface(ident) | Self::Time(ident) => ident.span,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(lit) => write!(f, "{lit}"),
            Self::Pointer(lit) => write!(f, "*{lit}"),
            Self::Map { key, value } => write!(f, "map[{key}]{value}"),
            Self::Array(element) => write!(f, "[]{element}"),
            Self::Interface(_) => f.write_str("interface{}"),
            Self::Time(_) => f.write_str("time.Time"),
        }
    }
}

/// A possibly package-qualified type name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Literal {
    pub package: Option<Ident>,
    pub name: Ident,
}

impl Literal {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            package: None,
            name: Ident::new(name),
        }
    }

    pub fn qualified(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package: Some(Ident::new(package)),
            name: Ident::new(name),
        }
    }

    pub fn span(&self) -> Span {
        self.package.as_ref().map_or(self.name.span, |p| p.span)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.package {
            Some(package) => write!(f, "{}.{}", package, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

// =============================================================================
// Services
// =============================================================================

/// One `service Name { ... }` block with its optional `@server` annotation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Service {
    pub at_server: Option<AtServer>,
    pub name: Ident,
    pub routes: Vec<ServiceRoute>,
}

/// `@server( key: value ... )`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AtServer {
    pub kvs: Vec<KvExpr>,
}

impl AtServer {
    pub fn get(&self, key: &str) -> Option<&Ident> {
        self.kvs.iter().find(|kv| kv.key.text == key).map(|kv| &kv.value)
    }
}

/// `@doc("text")` or `@doc( key: value ... )`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AtDoc {
    Line(Ident),
    Block(Vec<KvExpr>),
}

/// A route together with its annotations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceRoute {
    pub doc: Option<AtDoc>,
    pub at_server: Option<AtServer>,
    pub at_handler: Option<Ident>,
    pub route: Route,
}

impl ServiceRoute {
    /// The handler bound to this route. `@handler` wins over `@server(handler: ...)`.
    pub fn handler(&self) -> Option<&Ident> {
        self.at_handler
            .as_ref()
            .or_else(|| self.at_server.as_ref().and_then(|s| s.get("handler")))
    }
}

/// `method /path (Request) returns (Response)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    pub method: Ident,
    pub path: Ident,
    pub request: Option<DataType>,
    pub response: Option<DataType>,
}

impl Route {
    /// Key used for `(method, path)` uniqueness.
    pub fn key(&self) -> String {
        format!("{} {}", self.method.text, self.path.text)
    }
}
