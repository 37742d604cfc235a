//! apidl CLI.
//!
//! Validates `.api` service definitions, dumps their merged AST as JSON, and
//! re-validates on change.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use miette::IntoDiagnostic;
use notify_debouncer_mini::{new_debouncer, notify::RecursiveMode, DebounceEventResult};

use apidl_compiler::{discover_api_files, Api, ApiParser, CompilerError, ParserConfig};

mod ui;

#[derive(Parser)]
#[command(name = "apidl")]
#[command(about = "apidl - validate and inspect .api service definitions")]
struct Cli {
    /// Log pipeline stages and failed parses
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an api file, or every .api file under a directory
    Validate {
        /// File or directory
        path: PathBuf,
    },

    /// Print the merged AST of an api file as JSON
    Ast {
        file: PathBuf,

        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Re-validate whenever an .api file changes
    Watch {
        /// File or directory
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let config = if cli.debug {
        ParserConfig::default().with_debug()
    } else {
        ParserConfig::default()
    };

    match cli.command {
        Commands::Validate { path } => run_validate(&path, config),
        Commands::Ast { file, pretty } => run_ast(&file, config, pretty),
        Commands::Watch { path } => run_watch(&path, config).await,
    }
}

fn init_tracing(debug: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug {
            EnvFilter::new("apidl_compiler=debug,apidl=debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Files to validate for `path`: the file itself, or every `.api` file
/// below a directory.
fn api_files(path: &Path) -> Vec<PathBuf> {
    if path.is_dir() {
        discover_api_files(path)
    } else {
        vec![path.to_path_buf()]
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn print_summary(path: &Path, api: &Api) {
    ui::api_line(&display_name(path), api.types.len(), api.routes().count());
}

/// Prints a failed parse, linking to the offending line when it is in `path`.
fn print_failure(path: &Path, err: &CompilerError) {
    ui::error(&err.to_string());
    if let Some(location) = err.location() {
        if location.prefix == display_name(path) {
            ui::dim(&format!("at {}", ui::file_link(path, location.line)));
        }
    }
}

fn run_validate(path: &Path, config: ParserConfig) -> miette::Result<()> {
    let start = Instant::now();
    let files = api_files(path);
    if files.is_empty() {
        return Err(miette::miette!("no .api files found under {}", path.display()));
    }

    let parser = ApiParser::new(config);
    let spinner = ui::spinner("Validating...");

    if let [file] = files.as_slice() {
        let result = parser.parse(file);
        spinner.finish_and_clear();
        return match result {
            Ok(api) => {
                print_summary(file, &api);
                ui::success("api format ok");
                Ok(())
            }
            Err(err) => {
                ui::failed_summary(1, 1);
                Err(err.into())
            }
        };
    }

    let mut results = Vec::with_capacity(files.len());
    for file in &files {
        results.push((file, parser.parse(file)));
    }
    spinner.finish_and_clear();

    let mut failed = 0;
    for (file, result) in &results {
        match result {
            Ok(api) => print_summary(file, api),
            Err(err) => {
                failed += 1;
                print_failure(file, err);
            }
        }
    }

    if failed > 0 {
        ui::failed_summary(failed, files.len());
        return Err(miette::miette!("validation failed"));
    }

    ui::timing(&format!("Validated {} files", files.len()), start.elapsed().as_millis());
    ui::success("api format ok");
    Ok(())
}

fn run_ast(file: &Path, config: ParserConfig, pretty: bool) -> miette::Result<()> {
    let api = ApiParser::new(config).parse(file)?;
    let json = if pretty {
        serde_json::to_string_pretty(&api)
    } else {
        serde_json::to_string(&api)
    }
    .into_diagnostic()?;
    println!("{json}");
    Ok(())
}

fn is_api_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "api")
}

/// Directory to watch for `path`.
fn watch_root(path: &Path) -> PathBuf {
    if path.is_dir() {
        return path.to_path_buf();
    }
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Validates every file once, printing results without failing the loop.
/// Returns the failed and total file counts.
fn validate_pass(parser: &ApiParser, path: &Path) -> (usize, usize) {
    let files = api_files(path);
    let mut failed = 0;
    for file in &files {
        match parser.parse(file) {
            Ok(api) => print_summary(file, &api),
            Err(err) => {
                failed += 1;
                print_failure(file, &err);
            }
        }
    }
    (failed, files.len())
}

async fn run_watch(path: &Path, config: ParserConfig) -> miette::Result<()> {
    let (tx, mut rx) = tokio::sync::mpsc::channel::<()>(1);

    let mut debouncer = new_debouncer(
        Duration::from_millis(300),
        move |result: DebounceEventResult| match result {
            Ok(events) => {
                if events.iter().any(|e| is_api_file(&e.path)) {
                    let _ = tx.try_send(());
                }
            }
            Err(e) => tracing::warn!(error = %e, "file watcher error"),
        },
    )
    .into_diagnostic()?;

    let root = watch_root(path);
    debouncer
        .watcher()
        .watch(&root, RecursiveMode::Recursive)
        .into_diagnostic()?;
    tracing::debug!(root = %root.display(), "watching");

    let parser = ApiParser::new(config);
    validate_pass(&parser, path);
    println!();
    ui::info("Watching for changes...");

    loop {
        tokio::select! {
            Some(()) = rx.recv() => {
                println!();
                ui::rule("revalidate");

                let start = Instant::now();
                match validate_pass(&parser, path) {
                    (0, _) => ui::timing("api format ok", start.elapsed().as_millis()),
                    (failed, total) => ui::failed_summary(failed, total),
                }

                println!();
                ui::info("Watching for changes...");
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                ui::dim("Shutting down...");
                break;
            }
        }
    }

    Ok(())
}
