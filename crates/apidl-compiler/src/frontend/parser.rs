//! Recursive-descent parser for api files.
//!
//! The parser emits one [`Production`] per top-level rule and performs no
//! semantic checks; duplicates and cross-references are the builder's and
//! validator's business.

use super::lexer::Lexeme;
use super::token::Token;
use super::Production;
use crate::ast::*;
use crate::diagnostic::{CompilerError, Location, Span};

/// Methods accepted in route declarations.
pub const HTTP_METHODS: &[&str] = &[
    "get", "head", "post", "put", "patch", "delete", "connect", "options", "trace",
];

/// Api parser over a token slice.
pub struct Parser<'a> {
    source: &'a str,
    tokens: &'a [Lexeme],
    pos: usize,
    prefix: &'a str,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str, tokens: &'a [Lexeme], prefix: &'a str) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
            prefix,
        }
    }

    /// Parses the whole token stream.
    pub fn parse(&mut self) -> Result<Vec<Production>, CompilerError> {
        let mut productions = Vec::new();

        while let Some(lexeme) = self.peek() {
            let production = match (lexeme.token, self.text(lexeme)) {
                (Token::Ident, "syntax") => Production::Syntax(self.parse_syntax()?),
                (Token::Ident, "import") => Production::Import(self.parse_import()?),
                (Token::Ident, "info") => Production::Info(self.parse_info()?),
                (Token::Ident, "type") => Production::Type(self.parse_type()?),
                (Token::Ident, "service") | (Token::AtIdent, "@server") => {
                    Production::Service(self.parse_service()?)
                }
                _ => {
                    return Err(self.unexpected(
                        lexeme,
                        "expecting 'syntax', 'import', 'info', 'type' or 'service'",
                    ))
                }
            };
            productions.push(production);
        }

        Ok(productions)
    }

    // =========================================================================
    // Header declarations
    // =========================================================================

    fn parse_syntax(&mut self) -> Result<SyntaxExpr, CompilerError> {
        let keyword = self.expect_keyword("syntax")?;
        self.expect(Token::Eq)?;
        let version = self.expect_string()?;
        Ok(SyntaxExpr { keyword, version })
    }

    fn parse_import(&mut self) -> Result<Vec<ImportExpr>, CompilerError> {
        let keyword = self.expect_keyword("import")?;
        let mut imports = Vec::new();

        if self.eat(Token::LParen).is_some() {
            while !self.check(Token::RParen) {
                imports.push(self.parse_import_value(&keyword)?);
            }
            self.expect(Token::RParen)?;
        } else {
            imports.push(self.parse_import_value(&keyword)?);
        }

        Ok(imports)
    }

    fn parse_import_value(&mut self, keyword: &Ident) -> Result<ImportExpr, CompilerError> {
        let path = self.expect_string()?;
        let alias = if self.check_ident("as") {
            self.pos += 1;
            Some(self.expect_ident()?)
        } else {
            None
        };

        Ok(ImportExpr {
            keyword: keyword.clone(),
            path,
            alias,
        })
    }

    fn parse_info(&mut self) -> Result<InfoExpr, CompilerError> {
        let keyword = self.expect_keyword("info")?;
        self.expect(Token::LParen)?;
        let kvs = self.parse_kvs()?;
        Ok(InfoExpr { keyword, kvs })
    }

    /// Parses `key: value` lines up to and including the closing `)`.
    fn parse_kvs(&mut self) -> Result<Vec<KvExpr>, CompilerError> {
        let mut kvs = Vec::new();
        while !self.check(Token::RParen) {
            kvs.push(self.parse_kv()?);
        }
        self.expect(Token::RParen)?;
        Ok(kvs)
    }

    fn parse_kv(&mut self) -> Result<KvExpr, CompilerError> {
        let key = self.expect_ident()?;
        let colon = self.expect(Token::Colon)?;

        if let Some(lexeme) = self.peek() {
            if lexeme.token == Token::String && same_line(colon, lexeme) {
                self.pos += 1;
                let value = Ident::with_span(unquote(self.text(lexeme)), lexeme.span);
                return Ok(KvExpr { key, value });
            }
        }

        // Anything else is the raw rest of the line, up to an unbalanced `)`.
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(lexeme) = self.peek() {
            if !same_line(colon, lexeme) {
                break;
            }
            match lexeme.token {
                Token::LParen => depth += 1,
                Token::RParen if depth == 0 => break,
                Token::RParen => depth -= 1,
                _ => {}
            }
            self.pos += 1;
        }

        if self.pos == start {
            return Err(CompilerError::syntax(
                Location::new(self.prefix, colon.span),
                format!("missing value for key '{}'", key),
            ));
        }

        let first = &self.tokens[start];
        let last = &self.tokens[self.pos - 1];
        let value = Ident::with_span(
            &self.source[first.range.start..last.range.end],
            join(first.span, last.span),
        );
        Ok(KvExpr { key, value })
    }

    // =========================================================================
    // Types
    // =========================================================================

    fn parse_type(&mut self) -> Result<Vec<TypeExpr>, CompilerError> {
        self.expect_keyword("type")?;
        let mut types = Vec::new();

        if self.eat(Token::LParen).is_some() {
            while !self.check(Token::RParen) {
                types.push(self.parse_type_body()?);
            }
            self.expect(Token::RParen)?;
        } else {
            types.push(self.parse_type_body()?);
        }

        Ok(types)
    }

    fn parse_type_body(&mut self) -> Result<TypeExpr, CompilerError> {
        let name = self.expect_ident()?;

        if self.check_ident("struct") && self.peek_nth(1).is_some_and(|l| l.token == Token::LBrace) {
            self.pos += 1;
        }

        if self.check(Token::LBrace) {
            let fields = self.parse_fields()?;
            return Ok(TypeExpr::Struct(TypeStruct { name, fields }));
        }

        self.eat(Token::Eq);
        let data_type = self.parse_data_type()?;
        Ok(TypeExpr::Alias(TypeAlias { name, data_type }))
    }

    fn parse_fields(&mut self) -> Result<Vec<TypeField>, CompilerError> {
        self.expect(Token::LBrace)?;
        let mut fields = Vec::new();
        while !self.check(Token::RBrace) {
            fields.push(self.parse_field()?);
        }
        self.expect(Token::RBrace)?;
        Ok(fields)
    }

    fn parse_field(&mut self) -> Result<TypeField, CompilerError> {
        let Some(first) = self.peek() else {
            return Err(self.eof("expecting '}'"));
        };

        let (name, data_type, anonymous) = match first.token {
            Token::Star => {
                let data_type = self.parse_data_type()?;
                (embedded_name(&data_type), data_type, true)
            }
            Token::Ident => {
                // `Name Type` when a type follows on the same line, otherwise
                // an embedded `Type` or `pkg.Type`.
                let named = self.peek_nth(1).is_some_and(|next| {
                    same_line(first, next)
                        && matches!(next.token, Token::Ident | Token::Star | Token::LBracket)
                });
                if named {
                    self.pos += 1;
                    (self.ident(first), self.parse_data_type()?, false)
                } else {
                    let data_type = self.parse_data_type()?;
                    (embedded_name(&data_type), data_type, true)
                }
            }
            _ => return Err(self.unexpected(first, "expecting field")),
        };

        let tag = match self.peek() {
            Some(lexeme) if lexeme.token == Token::RawString => {
                self.pos += 1;
                let raw = self.text(lexeme);
                Some(Ident::with_span(&raw[1..raw.len() - 1], lexeme.span))
            }
            _ => None,
        };

        Ok(TypeField {
            name,
            data_type,
            tag,
            anonymous,
        })
    }

    fn parse_data_type(&mut self) -> Result<DataType, CompilerError> {
        let Some(lexeme) = self.peek() else {
            return Err(self.eof("expecting type"));
        };

        match lexeme.token {
            Token::Star => {
                self.pos += 1;
                Ok(DataType::Pointer(self.parse_qualified()?))
            }
            Token::LBracket => {
                self.pos += 1;
                self.expect(Token::RBracket)?;
                Ok(DataType::Array(Box::new(self.parse_data_type()?)))
            }
            Token::Ident => {
                let next = self.peek_nth(1).map(|l| l.token);
                match (self.text(lexeme), next) {
                    ("map", Some(Token::LBracket)) => {
                        self.pos += 2;
                        let key = self.expect_ident()?;
                        self.expect(Token::RBracket)?;
                        let value = self.parse_data_type()?;
                        Ok(DataType::Map {
                            key,
                            value: Box::new(value),
                        })
                    }
                    ("interface", Some(Token::LBrace)) => {
                        self.pos += 2;
                        self.expect(Token::RBrace)?;
                        Ok(DataType::Interface(Ident::with_span("interface{}", lexeme.span)))
                    }
                    ("time", Some(Token::Dot))
                        if self
                            .peek_nth(2)
                            .is_some_and(|l| l.token == Token::Ident && self.text(l) == "Time") =>
                    {
                        self.pos += 3;
                        Ok(DataType::Time(Ident::with_span("time.Time", lexeme.span)))
                    }
                    _ => Ok(DataType::Literal(self.parse_qualified()?)),
                }
            }
            _ => Err(self.unexpected(lexeme, "expecting type")),
        }
    }

    fn parse_qualified(&mut self) -> Result<Literal, CompilerError> {
        let first = self.expect_ident()?;
        if self.eat(Token::Dot).is_some() {
            let name = self.expect_ident()?;
            return Ok(Literal {
                package: Some(first),
                name,
            });
        }
        Ok(Literal {
            package: None,
            name: first,
        })
    }

    // =========================================================================
    // Services
    // =========================================================================

    fn parse_service(&mut self) -> Result<Service, CompilerError> {
        let at_server = if self.check_at("@server") {
            Some(self.parse_at_server()?)
        } else {
            None
        };

        self.expect_keyword("service")?;
        let name = self.expect_ident()?;
        self.expect(Token::LBrace)?;

        let mut routes = Vec::new();
        while !self.check(Token::RBrace) {
            routes.push(self.parse_service_route()?);
        }
        self.expect(Token::RBrace)?;

        Ok(Service {
            at_server,
            name,
            routes,
        })
    }

    fn parse_at_server(&mut self) -> Result<AtServer, CompilerError> {
        self.pos += 1;
        self.expect(Token::LParen)?;
        Ok(AtServer {
            kvs: self.parse_kvs()?,
        })
    }

    fn parse_at_doc(&mut self) -> Result<AtDoc, CompilerError> {
        self.pos += 1;
        if let Some(lexeme) = self.eat(Token::String) {
            return Ok(AtDoc::Line(self.string_ident(lexeme)));
        }

        self.expect(Token::LParen)?;
        if let Some(lexeme) = self.eat(Token::String) {
            self.expect(Token::RParen)?;
            return Ok(AtDoc::Line(self.string_ident(lexeme)));
        }
        Ok(AtDoc::Block(self.parse_kvs()?))
    }

    fn parse_service_route(&mut self) -> Result<ServiceRoute, CompilerError> {
        let mut doc = None;
        let mut at_server = None;
        let mut at_handler = None;

        while let Some(lexeme) = self.peek() {
            if lexeme.token != Token::AtIdent {
                break;
            }
            match self.text(lexeme) {
                "@doc" if doc.is_none() => doc = Some(self.parse_at_doc()?),
                "@server" if at_server.is_none() => at_server = Some(self.parse_at_server()?),
                "@handler" if at_handler.is_none() => {
                    self.pos += 1;
                    at_handler = Some(self.expect_ident()?);
                }
                other => {
                    return Err(CompilerError::syntax(
                        Location::new(self.prefix, lexeme.span),
                        format!("unexpected annotation '{other}'"),
                    ))
                }
            }
        }

        Ok(ServiceRoute {
            doc,
            at_server,
            at_handler,
            route: self.parse_route()?,
        })
    }

    fn parse_route(&mut self) -> Result<Route, CompilerError> {
        let method = self.expect_ident()?;
        if !HTTP_METHODS.contains(&method.text.as_str()) {
            return Err(CompilerError::syntax(
                Location::new(self.prefix, method.span),
                format!("expecting http method, found '{}'", method),
            ));
        }

        let path = self.parse_path()?;
        let request = if self.check(Token::LParen) {
            self.parse_body()?
        } else {
            None
        };
        let response = if self.check_ident("returns") {
            self.pos += 1;
            self.parse_body()?
        } else {
            None
        };

        Ok(Route {
            method,
            path,
            request,
            response,
        })
    }

    /// A path is a run of adjacent `/`, segment, `:`, `-` and `.` tokens.
    fn parse_path(&mut self) -> Result<Ident, CompilerError> {
        let first = self.expect(Token::Slash)?;
        let mut last = first;

        while let Some(lexeme) = self.peek() {
            if lexeme.range.start != last.range.end {
                break;
            }
            match lexeme.token {
                Token::Colon if last.token != Token::Slash => {
                    return Err(CompilerError::syntax(
                        Location::new(self.prefix, lexeme.span),
                        "path variable must start a segment",
                    ))
                }
                Token::Slash | Token::Ident | Token::Colon | Token::Number | Token::Minus
                | Token::Dot => {}
                _ => break,
            }
            last = lexeme;
            self.pos += 1;
        }

        if last.token == Token::Colon {
            return Err(CompilerError::syntax(
                Location::new(self.prefix, last.span),
                "missing path variable name",
            ));
        }

        Ok(Ident::with_span(
            &self.source[first.range.start..last.range.end],
            join(first.span, last.span),
        ))
    }

    fn parse_body(&mut self) -> Result<Option<DataType>, CompilerError> {
        self.expect(Token::LParen)?;
        if self.eat(Token::RParen).is_some() {
            return Ok(None);
        }
        let data_type = self.parse_data_type()?;
        self.expect(Token::RParen)?;
        Ok(Some(data_type))
    }

    // =========================================================================
    // Token helpers
    // =========================================================================

    fn peek(&self) -> Option<&'a Lexeme> {
        self.tokens.get(self.pos)
    }

    fn peek_nth(&self, n: usize) -> Option<&'a Lexeme> {
        self.tokens.get(self.pos + n)
    }

    fn text(&self, lexeme: &Lexeme) -> &'a str {
        &self.source[lexeme.range.clone()]
    }

    fn ident(&self, lexeme: &Lexeme) -> Ident {
        Ident::with_span(self.text(lexeme), lexeme.span)
    }

    fn string_ident(&self, lexeme: &Lexeme) -> Ident {
        Ident::with_span(unquote(self.text(lexeme)), lexeme.span)
    }

    fn check(&self, token: Token) -> bool {
        self.peek().is_some_and(|l| l.token == token)
    }

    fn check_ident(&self, text: &str) -> bool {
        self.peek()
            .is_some_and(|l| l.token == Token::Ident && self.text(l) == text)
    }

    fn check_at(&self, text: &str) -> bool {
        self.peek()
            .is_some_and(|l| l.token == Token::AtIdent && self.text(l) == text)
    }

    fn eat(&mut self, token: Token) -> Option<&'a Lexeme> {
        let lexeme = self.peek().filter(|l| l.token == token)?;
        self.pos += 1;
        Some(lexeme)
    }

    fn expect(&mut self, token: Token) -> Result<&'a Lexeme, CompilerError> {
        match self.peek() {
            Some(lexeme) if lexeme.token == token => {
                self.pos += 1;
                Ok(lexeme)
            }
            Some(lexeme) => Err(self.unexpected(lexeme, &format!("expecting {token}"))),
            None => Err(self.eof(&format!("expecting {token}"))),
        }
    }

    fn expect_ident(&mut self) -> Result<Ident, CompilerError> {
        let lexeme = self.expect(Token::Ident)?;
        Ok(self.ident(lexeme))
    }

    fn expect_string(&mut self) -> Result<Ident, CompilerError> {
        let lexeme = self.expect(Token::String)?;
        Ok(self.string_ident(lexeme))
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<Ident, CompilerError> {
        if self.check_ident(keyword) {
            return self.expect_ident();
        }
        match self.peek() {
            Some(lexeme) => Err(self.unexpected(lexeme, &format!("expecting '{keyword}'"))),
            None => Err(self.eof(&format!("expecting '{keyword}'"))),
        }
    }

    fn unexpected(&self, lexeme: &Lexeme, expecting: &str) -> CompilerError {
        CompilerError::syntax(
            Location::new(self.prefix, lexeme.span),
            format!("mismatched input '{}' {}", self.text(lexeme), expecting),
        )
    }

    fn eof(&self, expecting: &str) -> CompilerError {
        let span = self
            .tokens
            .last()
            .map(|l| Span::new(l.span.end_line, l.span.end_col, l.span.end_line, l.span.end_col))
            .unwrap_or_else(|| Span::new(1, 1, 1, 1));
        CompilerError::syntax(
            Location::new(self.prefix, span),
            format!("unexpected end of input {expecting}"),
        )
    }
}

fn same_line(a: &Lexeme, b: &Lexeme) -> bool {
    a.span.end_line == b.span.start_line
}

fn join(first: Span, last: Span) -> Span {
    Span::new(first.start_line, first.start_col, last.end_line, last.end_col)
}

/// Embedded fields are named after the type they embed.
fn embedded_name(data_type: &DataType) -> Ident {
    match data_type {
        DataType::Literal(lit) | DataType::Pointer(lit) => lit.name.clone(),
        DataType::Time(ident) => Ident::with_span("Time", ident.span),
        other => Ident::with_span(other.to_string(), other.span()),
    }
}

/// Strips the quotes of a string literal and resolves simple escapes.
fn unquote(raw: &str) -> String {
    let inner = &raw[1..raw.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parse_source;
    use pretty_assertions::assert_eq;

    fn single_type(source: &str) -> TypeExpr {
        match parse_source(source, "").unwrap().remove(0) {
            Production::Type(mut types) => types.remove(0),
            other => panic!("expected type production, got {other:?}"),
        }
    }

    fn single_service(source: &str) -> Service {
        match parse_source(source, "").unwrap().remove(0) {
            Production::Service(service) => service,
            other => panic!("expected service production, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_struct_with_tags_and_embedded_fields() {
        let ty = single_type(
            r#"type User struct {
                Base
                *Audit `json:"audit"`
                Name string `json:"name"`
                Tags []string
                Meta map[string]*shared.Meta
                Created time.Time
                Extra interface{}
            }"#,
        );

        let TypeExpr::Struct(st) = ty else {
            panic!("expected struct");
        };
        assert_eq!(st.name, Ident::new("User"));
        assert_eq!(st.fields.len(), 7);

        assert!(st.fields[0].anonymous);
        assert_eq!(st.fields[0].name, Ident::new("Base"));
        assert!(st.fields[1].anonymous);
        assert_eq!(st.fields[1].data_type, DataType::Pointer(Literal::new("Audit")));
        assert_eq!(st.fields[1].tag, Some(Ident::new(r#"json:"audit""#)));

        assert_eq!(st.fields[2], TypeField {
            name: Ident::new("Name"),
            data_type: DataType::literal("string"),
            tag: Some(Ident::new(r#"json:"name""#)),
            anonymous: false,
        });
        assert_eq!(st.fields[3].data_type, DataType::array(DataType::literal("string")));
        assert_eq!(
            st.fields[4].data_type,
            DataType::Map {
                key: Ident::new("string"),
                value: Box::new(DataType::Pointer(Literal::qualified("shared", "Meta"))),
            }
        );
        assert_eq!(st.fields[5].data_type, DataType::Time(Ident::new("time.Time")));
        assert_eq!(st.fields[6].data_type, DataType::Interface(Ident::new("interface{}")));
    }

    #[test]
    fn test_parse_type_group_and_alias() {
        let productions = parse_source("type (\n  Id int64\n  Empty {}\n  Name = string\n)", "").unwrap();
        let Production::Type(types) = &productions[0] else {
            panic!("expected type production");
        };
        assert_eq!(types.len(), 3);
        assert!(matches!(&types[0], TypeExpr::Alias(a) if a.data_type == DataType::literal("int64")));
        assert!(matches!(&types[1], TypeExpr::Struct(s) if s.fields.is_empty()));
        assert!(matches!(&types[2], TypeExpr::Alias(a) if a.name.text == "Name"));
    }

    #[test]
    fn test_parse_imports() {
        let productions = parse_source(
            "import \"base.api\"\nimport (\n  \"user.api\" as user\n  \"../shared/page.api\"\n)",
            "",
        )
        .unwrap();
        assert_eq!(productions.len(), 2);
        let Production::Import(block) = &productions[1] else {
            panic!("expected import production");
        };
        assert_eq!(block[0].path.text, "user.api");
        assert_eq!(block[0].alias, Some(Ident::new("user")));
        assert_eq!(block[1].path.text, "../shared/page.api");
        assert_eq!(block[1].alias, None);
    }

    #[test]
    fn test_parse_service_routes() {
        let service = single_service(
            r#"@server(
                jwt: Auth
                prefix: /v1/users
            )
            service user-api {
                @doc "login"
                @handler login
                post /user/login (LoginReq) returns (LoginReply)

                @server(
                    handler: GetUserHandler
                )
                get /user/:id-card/info.json returns ([]*User)

                @doc(
                    summary: "list users"
                )
                @handler list
                get /users
            }"#,
        );

        assert_eq!(service.name.text, "user-api");
        let server = service.at_server.as_ref().unwrap();
        assert_eq!(server.get("prefix").map(Ident::as_str), Some("/v1/users"));
        assert_eq!(service.routes.len(), 3);

        let login = &service.routes[0];
        assert_eq!(login.doc, Some(AtDoc::Line(Ident::new("login"))));
        assert_eq!(login.handler().map(Ident::as_str), Some("login"));
        assert_eq!(login.route.key(), "post /user/login");
        assert_eq!(login.route.request, Some(DataType::literal("LoginReq")));

        let info = &service.routes[1];
        assert_eq!(info.handler().map(Ident::as_str), Some("GetUserHandler"));
        assert_eq!(info.route.path.text, "/user/:id-card/info.json");
        assert_eq!(info.route.request, None);
        assert_eq!(
            info.route.response,
            Some(DataType::array(DataType::Pointer(Literal::new("User"))))
        );

        let list = &service.routes[2];
        assert_eq!(list.doc, Some(AtDoc::Block(vec![KvExpr::new("summary", "list users")])));
        assert_eq!(list.route.response, None);
    }

    #[test]
    fn test_parse_single_line_server_block() {
        let service = single_service("@server(handler: Foo)\nservice a { get /a }");
        assert_eq!(service.at_server.unwrap().get("handler").map(Ident::as_str), Some("Foo"));
    }

    #[test]
    fn test_info_values_keep_raw_line() {
        let productions = parse_source(
            "info (\n  author: jane doe (maintainer)\n  email: jane@example.com\n  title: \"User API\"\n)",
            "",
        )
        .unwrap();
        let Production::Info(info) = &productions[0] else {
            panic!("expected info production");
        };
        assert_eq!(info.kvs[0].value.text, "jane doe (maintainer)");
        assert_eq!(info.kvs[1].value.text, "jane@example.com");
        assert_eq!(info.kvs[2].value.text, "User API");
    }

    #[test]
    fn test_import_alias_requires_name() {
        let err = parse_source("import \"foo.api\" as", "").unwrap_err();
        assert!(err.to_string().contains("unexpected end of input"));
    }

    #[test]
    fn test_unknown_method_is_rejected() {
        let err = parse_source("service a {\n  @handler a\n  fetch /a\n}", "a.api").unwrap_err();
        assert_eq!(err.to_string(), "a.api line 3:3 expecting http method, found 'fetch'");
    }

    #[test]
    fn test_mismatched_input_position() {
        let err = parse_source("type Foo {\n  Bar int\n", "").unwrap_err();
        assert!(err.to_string().starts_with("line 2:"), "{err}");

        let err = parse_source("info foo", "x.api").unwrap_err();
        assert_eq!(err.to_string(), "x.api line 1:6 mismatched input 'foo' expecting '('");
    }
}
