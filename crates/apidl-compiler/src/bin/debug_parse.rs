//! Debug script to see what the parser produces.
//!
//! Usage: `debug_parse [file.api]`. Without an argument a built-in sample is
//! parsed.

use apidl_compiler::frontend::{lexer, parse_source, Production};

fn main() {
    let sample = r#"
syntax = "v1"

type LoginReq {
    Username string `json:"username"`
    Password string `json:"password"`
}

@server(
    prefix: /v1
)
service user-api {
    @handler login
    post /user/login (LoginReq) returns (LoginReq)
}
"#;

    let (prefix, source) = match std::env::args().nth(1) {
        Some(path) => match std::fs::read_to_string(&path) {
            Ok(source) => (path, source),
            Err(e) => {
                eprintln!("Error: failed to read {path}: {e}");
                std::process::exit(1);
            }
        },
        None => ("sample.api".to_string(), sample.to_string()),
    };

    match lexer::lex(&source, &prefix) {
        Ok(tokens) => println!("Tokens: {}", tokens.len()),
        Err(e) => {
            println!("Error: {e}");
            return;
        }
    }

    match parse_source(&source, &prefix) {
        Ok(productions) => {
            for production in &productions {
                match production {
                    Production::Syntax(syntax) => println!("\nSyntax: {}", syntax.version),
                    Production::Import(imports) => {
                        println!("\nImports:");
                        for import in imports {
                            println!("  {} (alias: {:?})", import.path, import.alias.as_ref().map(|a| a.as_str()));
                        }
                    }
                    Production::Info(info) => {
                        println!("\nInfo:");
                        for kv in &info.kvs {
                            println!("  {}: {}", kv.key, kv.value);
                        }
                    }
                    Production::Type(types) => {
                        println!("\nTypes:");
                        for ty in types {
                            println!("  {}", ty.name());
                            println!("    {:?}", ty);
                        }
                    }
                    Production::Service(service) => {
                        println!("\nService {}:", service.name);
                        for item in &service.routes {
                            println!(
                                "  {} -> {:?}",
                                item.route.key(),
                                item.handler().map(|h| h.as_str())
                            );
                        }
                    }
                }
            }
        }
        Err(e) => {
            println!("Error: {e}");
        }
    }
}
