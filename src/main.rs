//! Verifier CLI
//!
//! Main entry point for the `nqpv` command.

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use nqpv::session::{CommandOutcome, Session};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "nqpv")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Nondeterministic quantum program verifier",
    long_about = "Verifies partial-correctness Hoare judgements for nondeterministic quantum programs\nagainst Hermitian assertion sets, using weakest liberal preconditions."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a verification source file
    Verify {
        /// Input file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Print the proof outline of every proof, not only failures
        #[arg(long)]
        outlines: bool,
    },

    /// Parse a source file without running it
    Check {
        /// Input file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Show the parsed AST as JSON
        #[arg(long)]
        show_ast: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if cli.verbose {
        tracing::info!("verbose mode enabled");
    }

    match cli.command {
        Commands::Verify { input, outlines } => verify(&input, outlines),
        Commands::Check { input, show_ast } => check(&input, show_ast),
    }
}

fn verify(input: &Path, outlines: bool) -> Result<()> {
    let source = std::fs::read_to_string(input).into_diagnostic()?;
    let base_dir = input
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let mut session = Session::new(base_dir);
    let results = session.run(&source)?;

    let silent = session.scope().settings().silent;
    for outcome in &results {
        match outcome {
            CommandOutcome::Defined { name, kind } => {
                if !silent {
                    println!("defined {kind} '{name}'");
                }
            }
            CommandOutcome::Verified {
                name,
                verdict,
                outline,
            } => {
                println!("proof '{name}': {verdict}");
                if outlines || *verdict != nqpv::Verdict::Holds {
                    println!("{outline}");
                }
            }
            CommandOutcome::Shown { name, text } => {
                println!("{name} =\n{text}");
            }
            CommandOutcome::Saved { name, file } => {
                println!("saved '{name}' to {file}");
            }
            CommandOutcome::SettingChanged { key } => {
                if !silent {
                    println!("setting {key} updated");
                }
            }
            CommandOutcome::Failed { name, error } => match name {
                Some(name) => eprintln!("error in '{name}': {error}"),
                None => eprintln!("error: {error}"),
            },
        }
    }
    Ok(())
}

fn check(input: &Path, show_ast: bool) -> Result<()> {
    let source = std::fs::read_to_string(input).into_diagnostic()?;
    let tokens = nqpv::lexer::lex(&source)?;
    let ast = nqpv::parser::parse(&tokens)?;
    println!("syntactic analysis passed ({} commands)", ast.commands.len());
    if show_ast {
        let json = serde_json::to_string_pretty(&ast).into_diagnostic()?;
        println!("{json}");
    }
    Ok(())
}
