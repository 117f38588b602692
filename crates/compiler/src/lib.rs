//! Compiler library.
//!
//! Four phases over one source file: lexing, parsing with on-the-fly type
//! checking, a type listing pass, and JVM assembly emission. Each phase
//! has a file-based entry point used by the CLI driver plus a string-based
//! variant for tests and embedding. Diagnostics are returned as fully
//! formatted single-line messages; nothing in the library prints or
//! terminates the process.
//!
//! ```rust,ignore
//! let asm = mycc::assemble_source("hello.c", "int main() { return 0; }")?;
//! assert!(asm.contains(".class public hello"));
//! ```

pub mod ast;
pub mod codegen;
pub mod config;
pub mod lexer;
pub mod parser;
pub mod symbols;
pub mod token;
pub mod typecheck;
pub mod types;

pub use ast::Program;
pub use codegen::{CodeGen, CodeGenError};
pub use config::{CompilerConfig, RuntimeBuiltin};
pub use lexer::{Lexer, TokenStream};
pub use parser::Parser;

use std::fmt::Write as _;
use std::path::Path;
use token::TokenKind;

/// The emitted class name: the input file name (without directories)
/// minus its two-character extension.
pub fn class_name_for(input: &Path) -> Result<String, String> {
    let name = input
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| format!("Error: invalid input file name {}", input.display()))?;
    let cut = name.len().saturating_sub(2);
    if cut == 0 || !name.is_char_boundary(cut) {
        return Err(format!(
            "Error: input file name {} has no two-character extension",
            name
        ));
    }
    Ok(name[..cut].to_string())
}

/// Phase 1: one line per token, includes expanded inline.
pub fn lex_listing(input: &Path) -> Result<String, String> {
    let lexer = Lexer::from_file(input)?;
    render_lex_listing(lexer)
}

/// Phase 1 on an in-memory buffer.
pub fn lex_listing_source(name: &str, source: &str) -> Result<String, String> {
    render_lex_listing(Lexer::from_source(name, source))
}

fn render_lex_listing(mut lexer: Lexer) -> Result<String, String> {
    let mut out = String::new();
    loop {
        let tok = lexer.next_token()?;
        if tok.kind == TokenKind::End {
            return Ok(out);
        }
        writeln!(
            out,
            "File {} Line {} Token {} Text {}",
            tok.file,
            tok.line,
            tok.kind.code(),
            tok
        )
        .map_err(|e| e.to_string())?;
    }
}

/// Parse a file with the default runtime configuration.
pub fn parse_file(input: &Path) -> Result<Program, String> {
    parse_file_with_config(input, &CompilerConfig::default())
}

pub fn parse_file_with_config(input: &Path, config: &CompilerConfig) -> Result<Program, String> {
    let lexer = Lexer::from_file(input)?;
    Parser::new(TokenStream::new(lexer), config).parse()
}

/// Parse an in-memory buffer under the given file name.
pub fn parse_source(name: &str, source: &str) -> Result<Program, String> {
    let lexer = Lexer::from_source(name, source);
    Parser::new(TokenStream::new(lexer), &CompilerConfig::default()).parse()
}

/// Phase 2: one line per declaration-like event, in source order.
pub fn parse_listing(input: &Path) -> Result<String, String> {
    let program = parse_file(input)?;
    Ok(render_parse_listing(&program))
}

pub fn render_parse_listing(program: &Program) -> String {
    let mut out = String::new();
    for record in &program.records {
        let _ = writeln!(
            out,
            "File {} Line {}: {} {}",
            record.file, record.line, record.kind, record.name
        );
    }
    out
}

/// Phase 3: one line per expression node with its computed type.
pub fn types_listing(input: &Path) -> Result<String, String> {
    let program = parse_file(input)?;
    Ok(typecheck::type_listing(&program))
}

/// Phase 4: the full Krakatau-style `.j` text.
pub fn compile_to_assembly(input: &Path) -> Result<String, String> {
    let config = CompilerConfig::default();
    let program = parse_file_with_config(input, &config)?;
    let class_name = class_name_for(input)?;
    let source_file = input.to_string_lossy().into_owned();
    let mut codegen = CodeGen::new(&program.symbols, &config, class_name, source_file);
    codegen
        .generate(&program)
        .map_err(|e| format!("Code generation error in file {}: {}", input.display(), e))
}

/// Phase 4 on an in-memory buffer under the given file name.
pub fn assemble_source(name: &str, source: &str) -> Result<String, String> {
    let config = CompilerConfig::default();
    let lexer = Lexer::from_source(name, source);
    let program = Parser::new(TokenStream::new(lexer), &config).parse()?;
    let class_name = class_name_for(Path::new(name))?;
    let mut codegen = CodeGen::new(&program.symbols, &config, class_name, name);
    codegen
        .generate(&program)
        .map_err(|e| format!("Code generation error in file {}: {}", name, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_name_strips_two_characters() {
        assert_eq!(class_name_for(Path::new("foo.c")).unwrap(), "foo");
        assert_eq!(class_name_for(Path::new("dir/prog.c")).unwrap(), "prog");
    }

    #[test]
    fn test_class_name_requires_extension_room() {
        assert!(class_name_for(Path::new(".c")).is_err());
    }

    #[test]
    fn test_lex_listing_source_format() {
        let out = lex_listing_source("t.c", "int x;").unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "File t.c Line 1 Token 301 Text int");
        assert_eq!(lines[1], "File t.c Line 1 Token 306 Text x");
        assert_eq!(lines[2], "File t.c Line 1 Token 59 Text ;");
    }

    #[test]
    fn test_lex_listing_string_has_quotes() {
        let out = lex_listing_source("t.c", "\"hi\\n\"").unwrap();
        assert_eq!(out.trim_end(), "File t.c Line 1 Token 305 Text \"hi\\n\"");
    }

    #[test]
    fn test_parse_listing_kinds() {
        let program = parse_source(
            "t.c",
            "int g;\nstruct pair { int a; };\nint f(int p) { int l; return p; }\n",
        )
        .unwrap();
        let out = render_parse_listing(&program);
        assert!(out.contains("File t.c Line 1: global variable g"), "{}", out);
        assert!(out.contains("File t.c Line 2: struct pair"), "{}", out);
        assert!(out.contains("File t.c Line 2: member a"), "{}", out);
        assert!(out.contains("File t.c Line 3: function f"), "{}", out);
        assert!(out.contains("File t.c Line 3: parameter p"), "{}", out);
        assert!(out.contains("File t.c Line 3: local variable l"), "{}", out);
    }

    #[test]
    fn test_assemble_source_hello() {
        let asm = assemble_source("hello.c", "int main() { return 0; }").unwrap();
        assert!(asm.contains(".class public hello"), "{}", asm);
        assert!(asm.contains("invokestatic Method hello main ()I"), "{}", asm);
    }

    #[test]
    fn test_errors_are_single_line_messages() {
        let err = parse_source("t.c", "int main() { const int x = 1; x = 2; return 0; }")
            .unwrap_err();
        assert_eq!(err.lines().count(), 1, "{}", err);
        assert!(
            err.starts_with("Type checking error in file t.c line 1:"),
            "{}",
            err
        );
    }
}
