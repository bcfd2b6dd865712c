//! Command-line interface for sapcc
//! This binary compiles grammar files into parse tables and runs the table-driven matcher over
//! token traces, so a grammar can be exercised without a generated scanner.
//!
//! Usage:
//!   sapcc compile `<grammar>` [--format c|json|words] [--table-name `<name>`]  - Emit the parse table
//!   sapcc check `<grammar>`                                                 - Report diagnostics only
//!   sapcc dump `<grammar>`                                                  - Print the grammar model
//!   sapcc parse `<grammar>` `<trace>` [--json]                                - Match a token trace

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use sapcc_config::{Loader, SapccConfig, TableFormat};
use sapcc_parser::sapcc::encoding::render;
use sapcc_parser::sapcc::{compile_file, encode, trace_stream, Grammar, Matcher};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Looked up in the working directory when no `--config` is given
const LOCAL_CONFIG: &str = "sapcc.toml";

#[derive(Parser, Debug)]
#[command(name = "sapcc", version, about = "A compiler-compiler for table-driven parsers")]
#[command(arg_required_else_help = true)]
struct Cli {
    /// Log more (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file layered over the built-in defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Give up compiling after this many errors
    #[arg(long, global = true)]
    max_errors: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a grammar and print its parse table
    Compile {
        grammar: PathBuf,

        /// Table output format
        #[arg(short, long, value_parser = ["c", "json", "words"])]
        format: Option<String>,

        /// Name of the generated C array
        #[arg(long)]
        table_name: Option<String>,

        /// Write raw ids instead of symbol names and leave out the C enums
        #[arg(long)]
        numeric: bool,

        /// Write the table to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compile a grammar and report its diagnostics
    Check { grammar: PathBuf },
    /// Print the compiled grammar model
    Dump { grammar: PathBuf },
    /// Match a file of terminal names against a grammar and print the AST
    Parse {
        grammar: PathBuf,
        trace: PathBuf,

        /// Print the AST as JSON
        #[arg(long)]
        json: bool,

        /// Accept a match of the start symbol that leaves input behind
        #[arg(long)]
        partial: bool,

        /// Deepest rule nesting to follow
        #[arg(long)]
        max_depth: Option<u32>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(cli.verbose, &config);

    match &cli.command {
        Command::Compile {
            grammar,
            numeric,
            output,
            ..
        } => handle_compile(grammar, *numeric, output.as_deref(), &config),
        Command::Check { grammar } => handle_check(grammar, &config),
        Command::Dump { grammar } => {
            print!("{}", compile_grammar(grammar, &config)?.dump());
            Ok(())
        }
        Command::Parse {
            grammar,
            trace,
            json,
            partial,
            ..
        } => handle_parse(grammar, trace, *json, *partial, &config),
    }
}

/// Defaults, then the config file, then command-line flags
fn load_config(cli: &Cli) -> Result<SapccConfig> {
    let mut loader = match &cli.config {
        Some(path) => Loader::new().with_file(path),
        None => Loader::new().with_optional_file(LOCAL_CONFIG),
    };

    if let Some(max_errors) = cli.max_errors {
        loader = loader.set_override("compiler.max_errors", i64::from(max_errors))?;
    }
    match &cli.command {
        Command::Compile {
            format, table_name, ..
        } => {
            if let Some(format) = format {
                loader = loader.set_override("output.format", format.as_str())?;
            }
            if let Some(name) = table_name {
                loader = loader.set_override("output.table_name", name.as_str())?;
            }
        }
        Command::Parse {
            max_depth: Some(depth),
            ..
        } => {
            loader = loader.set_override("matcher.max_depth", i64::from(*depth))?;
        }
        _ => {}
    }

    loader.build().context("invalid configuration")
}

fn init_logging(verbose: u8, config: &SapccConfig) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Compile a grammar file, printing its diagnostics to stderr
fn compile_grammar(path: &Path, config: &SapccConfig) -> Result<Grammar> {
    tracing::info!(grammar = %path.display(), "compiling grammar");
    let compilation = compile_file(path, &config.compile_options())
        .with_context(|| format!("cannot compile {}", path.display()))?;

    if !compilation.diagnostics.is_empty() {
        eprint!("{}", compilation.diagnostics);
        eprintln!("{}", compilation.diagnostics.summary());
    }
    Ok(compilation.into_grammar()?)
}

fn handle_compile(
    path: &Path,
    numeric: bool,
    output: Option<&Path>,
    config: &SapccConfig,
) -> Result<()> {
    let grammar = compile_grammar(path, config)?;
    let table = encode(&grammar)?;
    let names = (!numeric).then_some(&grammar);

    let text = match config.output.format {
        TableFormat::C => {
            let array = render::c_array(&table, names, &config.output.table_name);
            match names {
                Some(grammar) => format!("{}\n{}", render::symbol_enums(grammar), array),
                None => array,
            }
        }
        TableFormat::Json => render::json(&table, names)? + "\n",
        TableFormat::Words => render::plain_words(&table),
    };

    match output {
        Some(out) => {
            fs::write(out, text).with_context(|| format!("cannot write {}", out.display()))?;
            tracing::info!(output = %out.display(), words = table.words().len(), "wrote table");
        }
        None => print!("{}", text),
    }
    Ok(())
}

fn handle_check(path: &Path, config: &SapccConfig) -> Result<()> {
    let grammar = compile_grammar(path, config)?;
    println!(
        "{}: {} terminal(s), {} non-terminal(s)",
        path.display(),
        grammar.terminals().len(),
        grammar.non_terminals().len()
    );
    Ok(())
}

fn handle_parse(
    grammar_path: &Path,
    trace_path: &Path,
    json: bool,
    partial: bool,
    config: &SapccConfig,
) -> Result<()> {
    let grammar = compile_grammar(grammar_path, config)?;
    let table = encode(&grammar)?;

    let text = fs::read_to_string(trace_path)
        .with_context(|| format!("cannot read {}", trace_path.display()))?;
    let mut stream = trace_stream(&trace_path.display().to_string(), &text, &grammar)?;

    let matcher = Matcher::new(&table)
        .with_grammar(&grammar)
        .with_options(config.match_options());
    let ast = if partial {
        matcher.parse(&mut stream)?
    } else {
        matcher.parse_complete(&mut stream)?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&ast)?);
    } else {
        print!("{}", matcher.render(&ast));
    }
    Ok(())
}
