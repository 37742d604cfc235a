use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use rstest::rstest;
use tempfile::TempDir;

use apidl_compiler::ast::*;
use apidl_compiler::diagnostic::{CompilerError, ErrorKind};
use apidl_compiler::{ApiParser, ParserConfig};

const NORMAL_API: &str = r#"
	syntax="v1"

	info (
		foo: bar
	)

	type Foo {
		Bar int
	}

	@server(
		foo: bar
	)
	service foo-api{
		@doc("foo")
		@handler foo
		post /foo (Foo) returns ([]int)
	}
"#;

fn parser() -> ApiParser {
    ApiParser::new(ParserConfig::default())
}

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

/// Writes `content` to `dir/name` and returns the absolute path as a string.
fn write_api(dir: &TempDir, name: &str, content: &str) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path.to_string_lossy().into_owned()
}

fn parse_err(content: &str, dir: &TempDir) -> CompilerError {
    parser().parse_content(content, dir.path()).unwrap_err()
}

#[test]
fn normal_api_matches_hand_built_ast() {
    let dir = TempDir::new().unwrap();
    let api = parser().parse_content(NORMAL_API, dir.path()).unwrap();

    let expected = Api {
        syntax: Some(SyntaxExpr {
            keyword: Ident::new("syntax"),
            version: Ident::new("v1"),
        }),
        info: Some(InfoExpr {
            keyword: Ident::new("info"),
            kvs: vec![KvExpr::new("foo", "bar")],
        }),
        types: vec![TypeExpr::Struct(TypeStruct {
            name: Ident::new("Foo"),
            fields: vec![TypeField::named("Bar", DataType::literal("int"))],
        })],
        services: vec![Service {
            at_server: Some(AtServer {
                kvs: vec![KvExpr::new("foo", "bar")],
            }),
            name: Ident::new("foo-api"),
            routes: vec![ServiceRoute {
                doc: Some(AtDoc::Line(Ident::new("foo"))),
                at_server: None,
                at_handler: Some(Ident::new("foo")),
                route: Route {
                    method: Ident::new("post"),
                    path: Ident::new("/foo"),
                    request: Some(DataType::literal("Foo")),
                    response: Some(DataType::array(DataType::literal("int"))),
                },
            }],
        }],
        ..Api::default()
    };

    assert_eq!(api, expected);
    assert_eq!(api.types.len(), 1);
    assert_eq!(api.services.len(), 1);
    assert_eq!(api.routes().count(), 1);
}

#[test]
fn positions_are_recorded() {
    let dir = TempDir::new().unwrap();
    let api = parser().parse_content(NORMAL_API, dir.path()).unwrap();
    let name = api.types[0].name();
    assert_eq!((name.span.start_line, name.span.start_col), (8, 7));
}

#[rstest]
#[case::reply("service foo-api{\n@handler foo\npost /foo (Foo) returns (Foo)\n}")]
#[case::array("service foo-api{\n@handler foo\npost /foo returns ([]Foo)\n}")]
#[case::array_of_pointers("service foo-api{\n@handler foo\npost /foo returns ([]*Foo)\n}")]
fn missing_declaration(#[case] content: &str) {
    let dir = TempDir::new().unwrap();
    let err = parse_err(content, &dir);
    assert_eq!(err.kind(), ErrorKind::UnresolvedReference);
    assert!(err.to_string().contains("'Foo'"), "{err}");
}

#[test]
fn missing_reply_cites_reply_position() {
    let dir = TempDir::new().unwrap();
    let content = "type Req {}\nservice foo-api {\n  @handler foo\n  post /foo (Req) returns (Reply)\n}";
    let err = parse_err(content, &dir);
    assert_eq!(err.to_string(), "line 4:28 can not find declaration 'Reply' in context");
}

#[test]
fn duplicate_handler_in_one_file() {
    let dir = TempDir::new().unwrap();
    let err = parse_err(
        "service foo-api{\n\t@handler foo\n\tpost /foo\n\n\t@handler foo\n\tpost /bar\n}",
        &dir,
    );
    assert_eq!(err.kind(), ErrorKind::DuplicateDeclaration);
    assert_eq!(err.to_string(), "line 5:11 duplicate handler: foo");
}

#[test]
fn duplicate_handler_across_import() {
    let dir = TempDir::new().unwrap();
    let file = write_api(&dir, "foo.api", "service bar-api{\n\t@handler foo\n\tpost /foo\n}");
    let err = parse_err(
        &format!("import \"{file}\"\nservice bar-api{{\n\t@handler foo\n\tpost /bar\n}}"),
        &dir,
    );
    assert_eq!(err.kind(), ErrorKind::DuplicateDeclaration);
    assert_eq!(err.to_string(), "foo.api line 2:11 duplicate handler: foo");
}

#[test]
fn duplicate_route_across_import() {
    let dir = TempDir::new().unwrap();
    let file = write_api(&dir, "foo.api", "service bar-api{\n\t@handler bar\n\tpost /foo\n}");
    let err = parse_err(
        &format!("import \"{file}\"\nservice bar-api{{\n\t@handler foo\n\tpost /foo\n}}"),
        &dir,
    );
    assert_eq!(err.kind(), ErrorKind::DuplicateDeclaration);
    assert!(err.to_string().contains("duplicate route: post /foo"));
}

#[test]
fn nested_import_is_structural_error() {
    let dir = TempDir::new().unwrap();
    let file = write_api(&dir, "foo.api", "\timport \"bar.api\"\n");
    let err = parse_err(&format!("import \"{file}\""), &dir);
    assert_eq!(err.kind(), ErrorKind::Structural);
    assert_eq!(err.to_string(), "foo.api line 1:2 the nested api does not support import");
}

#[test]
fn ambiguous_syntax_names_both_versions() {
    let dir = TempDir::new().unwrap();
    let file = write_api(&dir, "foo.api", "syntax = \"v2\"\n");
    let err = parse_err(&format!("syntax = \"v1\"\nimport \"{file}\""), &dir);
    assert_eq!(err.kind(), ErrorKind::Structural);
    assert_eq!(
        err.to_string(),
        "foo.api line 1:1 multiple syntax declaration, expecting syntax 'v1', but found 'v2'"
    );
}

#[test]
fn ambiguous_service_name() {
    let dir = TempDir::new().unwrap();
    let file = write_api(&dir, "foo.api", "service bar-api{\n\t@handler foo\n\tpost /foo\n}");
    let err = parse_err(
        &format!("import \"{file}\"\n\nservice foo-api{{\n\t@handler foo\n\tpost /foo\n}}"),
        &dir,
    );
    assert!(matches!(
        err,
        CompilerError::ServiceMismatch { ref expected, ref found, .. }
            if expected == "foo-api" && found == "bar-api"
    ));
}

#[rstest]
#[case::path("import \"foo.api\"\nimport \"foo.api\"", "line 2:8 duplicate import: foo.api")]
#[case::alias(
    "import \"foo.api\" as foo\nimport \"bar.api\" as foo",
    "line 2:21 duplicate import alias: foo"
)]
#[case::info_key("info (\n\tfoo: bar\n\tfoo: bar\n)", "line 3:2 duplicate key: foo")]
#[case::type_name("type Foo int\ntype Foo bool", "line 2:6 duplicate type declaration: Foo")]
#[case::field("type Foo {\n\tFoo int\n\tFoo string\n}", "line 3:2 duplicate field: Foo")]
fn duplicate_in_one_file(#[case] content: &str, #[case] message: &str) {
    let dir = TempDir::new().unwrap();
    let err = parse_err(content, &dir);
    assert_eq!(err.kind(), ErrorKind::DuplicateDeclaration);
    assert_eq!(err.to_string(), message);
}

#[test]
fn import_alias_requires_name() {
    let dir = TempDir::new().unwrap();
    let err = parse_err("import \"foo.api\" as", &dir);
    assert_eq!(err.kind(), ErrorKind::Syntax);
}

#[test]
fn duplicate_type_across_unaliased_import() {
    let dir = TempDir::new().unwrap();
    let file = write_api(&dir, "foo.api", "type Foo int\n");
    let err = parse_err(&format!("import \"{file}\"\n\ntype Foo bool"), &dir);
    assert_eq!(err.kind(), ErrorKind::DuplicateDeclaration);
    assert_eq!(err.to_string(), "foo.api line 1:6 duplicate type declaration: Foo");
}

#[test]
fn distinct_aliases_keep_namespaces_apart() {
    let dir = TempDir::new().unwrap();
    write_api(&dir, "a.api", "type Foo int\n");
    write_api(&dir, "b.api", "type Foo int\n");

    let api = parser()
        .parse_content(
            "import \"a.api\" as a\nimport \"b.api\" as b\n\ntype Pair {\n\tLeft a.Foo\n\tRight *b.Foo\n}",
            dir.path(),
        )
        .unwrap();

    assert_eq!(api.types.len(), 1);
    assert_eq!(api.import_info.len(), 2);
    assert!(api.import_info["a"][0].types.contains_key("Foo"));
}

#[test]
fn relative_parent_imports_resolve() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("service")).unwrap();
    std::fs::create_dir_all(dir.path().join("shared")).unwrap();
    write_api(&dir, "shared/base.api", "type Base { Id int64 }\n");
    let root = write_api(
        &dir,
        "service/user.api",
        "import \"../shared/base.api\"\ntype User {\n\tBase\n\tName string\n}",
    );

    let api = parser().parse(&root).unwrap();
    assert_eq!(api.types.len(), 2);
    assert_eq!(api.imports[0].path.text, "../shared/base.api");
}

#[test]
fn work_dir_containing_parent_segment() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("api/x")).unwrap();
    std::fs::create_dir_all(dir.path().join("shared")).unwrap();
    write_api(&dir, "shared/base.api", "type Base { Id int64 }\n");

    let api = parser()
        .parse_content(
            "import \"../shared/base.api\"\ntype U { B Base }",
            dir.path().join("api/x/.."),
        )
        .unwrap();
    assert_eq!(api.types.len(), 2);
    assert!(api.find_type("Base").is_some());
}

#[test]
fn missing_root_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err = parser().parse(dir.path().join("nope.api")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
    assert!(err.to_string().contains("nope.api"));
}

#[test]
fn fixture_media_api_parses() {
    let api = parser().parse(fixtures().join("media/media.api")).unwrap();

    assert_eq!(api.syntax.as_ref().map(|s| s.version.as_str()), Some("v1"));
    assert_eq!(api.imports.len(), 2);
    assert_eq!(api.types.len(), 5);
    assert_eq!(api.services.len(), 2);
    assert_eq!(api.routes().count(), 4);
    assert!(api.find_type("Media").is_some());
    assert!(api.find_type("PageReq").is_none());
    assert_eq!(api.import_info["page"][0].path, "../shared/page.api");

    let handlers: Vec<_> = api
        .routes()
        .filter_map(|r| r.handler())
        .map(|h| h.as_str())
        .collect();
    assert_eq!(handlers, ["upload", "list", "GetMediaHandler", "deleteMedia"]);

    let info = api.info.as_ref().unwrap();
    assert_eq!(info.kvs[0].value.as_str(), "media service");
    assert_eq!(info.kvs[2].value.as_str(), "1.2");
}

#[test]
fn fixture_media_err_api_fails() {
    let err = parser().parse(fixtures().join("media/media_err.api")).unwrap_err();
    assert_eq!(
        err.to_string(),
        "media_err.api line 7:9 can not find declaration 'Cursor' in context"
    );
}

#[test]
fn ast_serializes_to_json() {
    let dir = TempDir::new().unwrap();
    let api = parser().parse_content(NORMAL_API, dir.path()).unwrap();
    let json = serde_json::to_value(&api).unwrap();
    assert_eq!(json["services"][0]["name"]["text"], "foo-api");
    assert_eq!(json["types"][0]["kind"], "struct");
    assert!(json.get("import_info").is_none());
}
