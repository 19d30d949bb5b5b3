//! SPL Compiler CLI
//!
//! Command-line interface for compiling .spl programs to HD6309 assembly.
//! Address-valued options take a plain number (decimal or `0x` hex); the
//! full literal grammar with signs and storage qualifiers is deliberately
//! not accepted here.

use clap::Parser as ClapParser;
use splc::config::{CompilerOptions, SearchPaths};
use splc::literal;
use std::process;

#[derive(ClapParser)]
#[command(name = "splc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "SPL compiler - compile SPL programs to HD6309 assembly", long_about = None)]
struct Cli {
    /// Input source files (.spl appended when absent)
    #[arg(required = true)]
    files: Vec<String>,

    /// Base name for output files, no extension
    #[arg(short, long, default_value = "out")]
    output: String,

    /// Output file type: asm (hex and s19 are assembled externally)
    #[arg(short = 't', long = "type", default_value = "asm")]
    output_type: String,

    /// Code origin address (decimal or 0x hex)
    #[arg(long, value_name = "ADDR", allow_hyphen_values = true)]
    org: Option<String>,

    /// Top of the variable region; variables grow down from here
    #[arg(long, value_name = "ADDR", allow_hyphen_values = true)]
    var: Option<String>,

    /// User stack base; the stack grows down from here
    #[arg(long, value_name = "ADDR", allow_hyphen_values = true)]
    stack: Option<String>,

    /// Use the fixed system code origin
    #[arg(long)]
    sys: bool,

    /// Enable warnings
    #[arg(long)]
    warn: bool,

    /// Emit commentary into the generated assembly
    #[arg(long)]
    verbose: bool,

    /// Trace compilation on stderr
    #[arg(long)]
    debug: bool,
}

fn main() {
    let cli = Cli::parse();
    let opts = match build_options(cli) {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = splc::compile_files(&opts) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn build_options(cli: Cli) -> Result<CompilerOptions, String> {
    let mut opts = CompilerOptions::new(cli.files);
    opts.output_name = cli.output;
    opts.output_type = cli.output_type;
    opts.sys = cli.sys;
    opts.warn = cli.warn;
    opts.verbose = cli.verbose;
    opts.debug = cli.debug;
    opts.paths = SearchPaths::from_env();

    if let Some(org) = cli.org {
        opts.origin = Some(parse_address("origin", &org)?);
    }
    if let Some(var) = cli.var {
        opts.var_top = parse_address("variable top", &var)?;
    }
    if let Some(stack) = cli.stack {
        opts.stack_base = parse_address("stack base", &stack)?;
    }
    Ok(opts)
}

fn parse_address(what: &str, text: &str) -> Result<u32, String> {
    literal::simple_number(text)
        .filter(|n| *n <= 0xFFFF)
        .map(|n| n as u32)
        .ok_or(format!("Illegal {} address: {}", what, text))
}
