//! Compiler CLI.
//!
//! `mycc -0|-1|-2|-3|-4 <input>` selects which phase's output is
//! materialized. The input path's final two characters are its extension;
//! `<base>` is the path with those two characters removed. On any error
//! the diagnostic goes to stderr, the mode's partially-written output file
//! is removed, and the process exits nonzero.

use clap::{ArgGroup, Parser};
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "mycc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compiler for a small C subset targeting JVM assembly", long_about = None)]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .args(["version_info", "lex", "parse", "types", "codegen"])
))]
struct Cli {
    /// Print version information
    #[arg(short = '0')]
    version_info: bool,

    /// Phase 1: lex only, writing the token listing to <base>.lexer
    #[arg(short = '1')]
    lex: bool,

    /// Phase 2: parse, writing the declaration trace to <base>.parser
    #[arg(short = '2')]
    parse: bool,

    /// Phase 3: type check, writing expression types to <base>.types
    #[arg(short = '3')]
    types: bool,

    /// Phase 4: generate JVM assembly into <base>.j
    #[arg(short = '4')]
    codegen: bool,

    /// Input source file; its final two characters are the extension
    input: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    if cli.version_info {
        show_version();
        return;
    }

    let input = match &cli.input {
        Some(path) => path.clone(),
        None => {
            eprintln!("Error: no input file provided");
            process::exit(1);
        }
    };

    let result = if cli.lex {
        run_phase(&input, ".lexer", "lexing", mycc::lex_listing)
    } else if cli.parse {
        run_phase(&input, ".parser", "parsing", mycc::parse_listing)
    } else if cli.types {
        run_phase(&input, ".types", "type checking", mycc::types_listing)
    } else {
        run_phase(&input, ".j", "code generation", mycc::compile_to_assembly)
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        process::exit(1);
    }
}

/// `<base><suffix>` where `<base>` is the input path minus its
/// two-character extension.
fn output_path(input: &Path, suffix: &str) -> Result<PathBuf, String> {
    let name = input.to_string_lossy();
    let cut = name.len().saturating_sub(2);
    if cut == 0 || !name.is_char_boundary(cut) {
        return Err(format!(
            "Error: input file {} has no two-character extension",
            name
        ));
    }
    Ok(PathBuf::from(format!("{}{}", &name[..cut], suffix)))
}

fn run_phase(
    input: &Path,
    suffix: &str,
    phase: &str,
    produce: fn(&Path) -> Result<String, String>,
) -> Result<(), String> {
    let out_path = output_path(input, suffix)?;
    match produce(input) {
        Ok(text) => {
            std::fs::write(&out_path, text)
                .map_err(|e| format!("Error: cannot write {}: {}", out_path.display(), e))?;
            println!(
                "Completed {}. Check {} for details",
                phase,
                out_path.display()
            );
            Ok(())
        }
        Err(e) => {
            let _ = std::fs::remove_file(&out_path);
            Err(e)
        }
    }
}

fn show_version() {
    println!("mycc: a compiler for a small C subset targeting the JVM");
    println!("Version {}", env!("CARGO_PKG_VERSION"));
}
