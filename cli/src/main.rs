use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use luma_core::Engine;
use luma_core::rt::RuntimeError;

#[cfg(test)]
mod main_test;
mod repl;

#[derive(Debug, Parser)]
#[command(
    name = "luma",
    author,
    version,
    about = "CLI for Luma",
    long_about = None
)]
struct CliArgs {
    /// Source file to run; starts a REPL when omitted
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Print the parsed AST as JSON instead of executing
    #[arg(long)]
    dump_ast: bool,

    /// Evaluate an expression and print its value
    #[arg(short = 'e', value_name = "EXPR", conflicts_with = "file")]
    eval: Option<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env("LUMA_LOG").unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = CliArgs::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

fn report(err: &anyhow::Error) {
    match err.downcast_ref::<RuntimeError>() {
        Some(rt) => eprintln!("luma: {}", rt.full_message()),
        None => eprintln!("luma: {}", err),
    }
}

fn run(args: CliArgs) -> Result<()> {
    if let Some(expr) = args.eval {
        let mut engine = Engine::new();
        let value = engine.eval_expr(&expr)?;
        println!("{}", value);
        return Ok(());
    }

    let Some(file) = args.file else {
        return repl::run();
    };

    let source = fs::read_to_string(&file)?;
    let chunk = chunk_name(&file);

    if args.dump_ast {
        let program = Engine::parse_program(&source, &chunk)?;
        println!("{}", serde_json::to_string_pretty(&program)?);
        return Ok(());
    }

    let mut engine = Engine::new();
    engine.exec_named(&source, &chunk)?;
    Ok(())
}

fn chunk_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("input")
        .to_string()
}
