//! Hand-written lexer.
//!
//! The lexer reads one source file plus any files pulled in through
//! `#include "path"`. Includes are handled with a stack of source frames:
//! the included file's tokens appear inline in the stream, carrying their
//! own file name and line numbers, then lexing resumes in the including
//! file. All diagnostics are fatal to the compilation and are returned as
//! fully formatted single-line messages.

use crate::token::{is_type_name, keyword_kind, Token, TokenKind};
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::rc::Rc;

const MAX_LEXEME: usize = 47;
const MAX_STRING: usize = 1023;

struct SourceFrame {
    file: Rc<str>,
    chars: Vec<char>,
    pos: usize,
    line: u32,
}

impl SourceFrame {
    fn new(file: Rc<str>, source: &str) -> Self {
        SourceFrame {
            file,
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
        }
    }

    fn cur(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }
}

pub struct Lexer {
    frames: Vec<SourceFrame>,
    root_file: Rc<str>,
    last_line: u32,
    finished: bool,
}

impl Lexer {
    /// Lex a file on disk. The file name is used verbatim in listings and
    /// diagnostics.
    pub fn from_file(path: &Path) -> Result<Lexer, String> {
        let name = path.to_string_lossy().into_owned();
        let source = fs::read_to_string(path)
            .map_err(|e| format!("Error: cannot open input file {}: {}", name, e))?;
        Ok(Lexer::from_source(&name, &source))
    }

    /// Lex an in-memory buffer under the given file name.
    pub fn from_source(name: &str, source: &str) -> Lexer {
        let file: Rc<str> = Rc::from(name);
        Lexer {
            frames: vec![SourceFrame::new(file.clone(), source)],
            root_file: file,
            last_line: 1,
            finished: false,
        }
    }

    fn cur(&self) -> Option<char> {
        self.frames.last().and_then(|f| f.cur())
    }

    fn peek(&self) -> Option<char> {
        self.frames.last().and_then(|f| f.peek())
    }

    fn bump(&mut self) {
        if let Some(f) = self.frames.last_mut() {
            f.bump();
        }
    }

    fn line(&self) -> u32 {
        self.frames.last().map(|f| f.line).unwrap_or(self.last_line)
    }

    fn file(&self) -> Rc<str> {
        self.frames
            .last()
            .map(|f| f.file.clone())
            .unwrap_or_else(|| self.root_file.clone())
    }

    fn newline(&mut self) {
        if let Some(f) = self.frames.last_mut() {
            f.line += 1;
            f.bump();
        }
    }

    fn error(&self, text: &str, message: &str) -> String {
        if text.is_empty() {
            format!(
                "Lexer error in file {} line {}: {}",
                self.file(),
                self.line(),
                message
            )
        } else {
            format!(
                "Lexer error in file {} line {} at text {}: {}",
                self.file(),
                self.line(),
                text,
                message
            )
        }
    }

    /// Produce the next token, or the END token (exactly once meaningful,
    /// then repeated) at end of input.
    pub fn next_token(&mut self) -> Result<Token, String> {
        if self.finished {
            return Ok(Token::new(
                TokenKind::End,
                "",
                self.last_line,
                self.root_file.clone(),
            ));
        }

        loop {
            let c = match self.cur() {
                Some(c) => c,
                None => {
                    let frame = self.frames.pop().expect("at least one frame");
                    if self.frames.is_empty() {
                        self.last_line = frame.line;
                        self.finished = true;
                        return Ok(Token::new(
                            TokenKind::End,
                            "",
                            self.last_line,
                            self.root_file.clone(),
                        ));
                    }
                    continue;
                }
            };

            match c {
                ' ' | '\t' | '\r' => self.bump(),
                '\n' => self.newline(),
                '/' if self.peek() == Some('/') => {
                    while let Some(c) = self.cur() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                '/' if self.peek() == Some('*') => {
                    self.bump();
                    self.bump();
                    self.skip_block_comment()?;
                }
                '#' => self.directive()?,
                _ => return self.lex_token(c),
            }
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), String> {
        loop {
            match self.cur() {
                None => return Err(self.error("", "Unterminated block comment")),
                Some('\n') => self.newline(),
                Some('*') if self.peek() == Some('/') => {
                    self.bump();
                    self.bump();
                    return Ok(());
                }
                Some(_) => self.bump(),
            }
        }
    }

    /// `#include "path"` pushes a source frame; any other `#...` line is
    /// skipped to end of line.
    fn directive(&mut self) -> Result<(), String> {
        self.bump();
        let mut word = String::new();
        while let Some(c) = self.cur() {
            if c.is_ascii_alphanumeric() {
                word.push(c);
                self.bump();
            } else {
                break;
            }
        }

        if word != "include" {
            while let Some(c) = self.cur() {
                if c == '\n' {
                    break;
                }
                self.bump();
            }
            return Ok(());
        }

        while matches!(self.cur(), Some(' ') | Some('\t')) {
            self.bump();
        }
        if self.cur() != Some('"') {
            return Err(self.error("", "Malformed #include directive"));
        }
        self.bump();
        let mut path = String::new();
        loop {
            match self.cur() {
                Some('"') => {
                    self.bump();
                    break;
                }
                Some('\n') | None => {
                    return Err(self.error(&path, "Unterminated #include path"));
                }
                Some(c) => {
                    path.push(c);
                    self.bump();
                }
            }
        }

        let source = fs::read_to_string(&path)
            .map_err(|_| self.error(&path, "Cannot open include file"))?;
        self.frames
            .push(SourceFrame::new(Rc::from(path.as_str()), &source));
        Ok(())
    }

    fn lex_token(&mut self, c: char) -> Result<Token, String> {
        let line = self.line();
        let file = self.file();

        match c {
            '"' => self.lex_string(line, file),
            '\'' => self.lex_char(line, file),
            _ if c.is_ascii_digit() => self.lex_number(line, file),
            _ if c.is_ascii_alphabetic() || c == '_' => self.lex_identifier(line, file),
            _ => self.lex_operator(c, line, file),
        }
    }

    fn lex_string(&mut self, line: u32, file: Rc<str>) -> Result<Token, String> {
        self.bump();
        let mut text = String::new();
        loop {
            match self.cur() {
                None => return Err(self.error(&text, "Unterminated string literal")),
                Some('"') => {
                    self.bump();
                    break;
                }
                Some('\n') => {
                    text.push('\n');
                    self.newline();
                }
                Some('\\') => {
                    self.bump();
                    match self.cur() {
                        Some(e @ ('n' | 't' | 'r' | 'a' | 'b' | '\\' | '"')) => {
                            text.push('\\');
                            text.push(e);
                            self.bump();
                        }
                        _ => return Err(self.error(&text, "Invalid escape sequence")),
                    }
                }
                Some(c) => {
                    text.push(c);
                    self.bump();
                }
            }
            if text.len() > MAX_STRING {
                return Err(self.error(&text, "String literal too long"));
            }
        }
        Ok(Token::new(TokenKind::StringLit, text, line, file))
    }

    fn lex_char(&mut self, line: u32, file: Rc<str>) -> Result<Token, String> {
        self.bump();
        let mut text = String::new();
        match self.cur() {
            None => return Err(self.error(&text, "Unterminated char literal")),
            Some('\\') => {
                text.push('\\');
                self.bump();
                match self.cur() {
                    Some(e @ ('a' | 'b' | 'n' | 'r' | '\\' | '\'')) => {
                        text.push(e);
                        self.bump();
                    }
                    _ => return Err(self.error(&text, "Invalid escape sequence")),
                }
            }
            Some(c) => {
                text.push(c);
                self.bump();
            }
        }
        if self.cur() != Some('\'') {
            return Err(self.error(&text, "Unterminated char literal"));
        }
        self.bump();
        Ok(Token::new(TokenKind::CharLit, text, line, file))
    }

    fn lex_number(&mut self, line: u32, file: Rc<str>) -> Result<Token, String> {
        let mut text = String::new();
        let first = self.cur().expect("digit");
        text.push(first);
        self.bump();

        if first == '0' && matches!(self.cur(), Some('x') | Some('X')) {
            text.push(self.cur().expect("x"));
            self.bump();
            let mut digits = 0;
            while let Some(c) = self.cur() {
                if c.is_ascii_hexdigit() {
                    text.push(c);
                    self.bump();
                    digits += 1;
                } else {
                    break;
                }
            }
            if digits == 0 {
                return Err(self.error(&text, "Hex literal requires at least one digit"));
            }
            if text.len() > MAX_LEXEME {
                return Err(self.error(&text, "Numeric literal too long"));
            }
            return Ok(Token::new(TokenKind::HexLit, text, line, file));
        }

        while let Some(c) = self.cur() {
            if c.is_ascii_digit() {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }

        let mut is_real = false;
        if self.cur() == Some('.') {
            is_real = true;
            text.push('.');
            self.bump();
            while let Some(c) = self.cur() {
                if c.is_ascii_digit() {
                    text.push(c);
                    self.bump();
                } else {
                    break;
                }
            }
        }
        if matches!(self.cur(), Some('e') | Some('E')) {
            is_real = true;
            text.push(self.cur().expect("e"));
            self.bump();
            if matches!(self.cur(), Some('+') | Some('-')) {
                text.push(self.cur().expect("sign"));
                self.bump();
            }
            let mut digits = 0;
            while let Some(c) = self.cur() {
                if c.is_ascii_digit() {
                    text.push(c);
                    self.bump();
                    digits += 1;
                } else {
                    break;
                }
            }
            if digits == 0 {
                return Err(self.error(&text, "Malformed exponent in numeric literal"));
            }
        }

        if text.len() > MAX_LEXEME {
            return Err(self.error(&text, "Numeric literal too long"));
        }
        let kind = if is_real {
            TokenKind::RealLit
        } else {
            TokenKind::IntLit
        };
        Ok(Token::new(kind, text, line, file))
    }

    fn lex_identifier(&mut self, line: u32, file: Rc<str>) -> Result<Token, String> {
        let mut text = String::new();
        while let Some(c) = self.cur() {
            if c.is_ascii_alphanumeric() || c == '_' {
                text.push(c);
                self.bump();
                if text.len() > MAX_LEXEME {
                    return Err(self.error(&text, "Identifier too long"));
                }
            } else {
                break;
            }
        }
        let kind = if let Some(k) = keyword_kind(&text) {
            k
        } else if is_type_name(&text) {
            TokenKind::TypeName
        } else {
            TokenKind::Ident
        };
        Ok(Token::new(kind, text, line, file))
    }

    fn lex_operator(&mut self, c: char, line: u32, file: Rc<str>) -> Result<Token, String> {
        let two = match (c, self.peek()) {
            ('=', Some('=')) => Some(TokenKind::EqEq),
            ('!', Some('=')) => Some(TokenKind::NotEq),
            ('>', Some('=')) => Some(TokenKind::GreaterEq),
            ('<', Some('=')) => Some(TokenKind::LessEq),
            ('+', Some('+')) => Some(TokenKind::PlusPlus),
            ('+', Some('=')) => Some(TokenKind::PlusAssign),
            ('-', Some('-')) => Some(TokenKind::MinusMinus),
            ('-', Some('=')) => Some(TokenKind::MinusAssign),
            ('|', Some('|')) => Some(TokenKind::OrOr),
            ('&', Some('&')) => Some(TokenKind::AndAnd),
            ('*', Some('=')) => Some(TokenKind::StarAssign),
            ('/', Some('=')) => Some(TokenKind::SlashAssign),
            _ => None,
        };
        if let Some(kind) = two {
            let mut text = String::new();
            text.push(c);
            text.push(self.peek().expect("second operator char"));
            self.bump();
            self.bump();
            return Ok(Token::new(kind, text, line, file));
        }

        let kind = match c {
            '!' => TokenKind::Bang,
            '%' => TokenKind::Percent,
            '&' => TokenKind::Amp,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '*' => TokenKind::Star,
            '+' => TokenKind::Plus,
            ',' => TokenKind::Comma,
            '-' => TokenKind::Minus,
            '.' => TokenKind::Dot,
            '/' => TokenKind::Slash,
            ':' => TokenKind::Colon,
            ';' => TokenKind::Semicolon,
            '<' => TokenKind::Less,
            '=' => TokenKind::Equal,
            '>' => TokenKind::Greater,
            '?' => TokenKind::Question,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '|' => TokenKind::Pipe,
            '~' => TokenKind::Tilde,
            _ => return Err(self.error(&c.to_string(), "Unknown character")),
        };
        self.bump();
        Ok(Token::new(kind, c.to_string(), line, file))
    }
}

/// Peekable token stream with a bounded ring buffer.
///
/// The parser needs up to three tokens of lookahead to disambiguate
/// top-level forms after `type identifier`.
pub struct TokenStream {
    lexer: Lexer,
    buffer: VecDeque<Token>,
}

impl TokenStream {
    pub fn new(lexer: Lexer) -> TokenStream {
        TokenStream {
            lexer,
            buffer: VecDeque::new(),
        }
    }

    /// Look at the k-th upcoming token without consuming it.
    pub fn peek(&mut self, k: usize) -> Result<&Token, String> {
        while self.buffer.len() <= k {
            let tok = self.lexer.next_token()?;
            self.buffer.push_back(tok);
        }
        Ok(&self.buffer[k])
    }

    pub fn advance(&mut self) -> Result<Token, String> {
        if let Some(tok) = self.buffer.pop_front() {
            Ok(tok)
        } else {
            self.lexer.next_token()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_all(source: &str) -> Vec<Token> {
        let mut lexer = Lexer::from_source("test.c", source);
        let mut out = Vec::new();
        loop {
            let tok = lexer.next_token().unwrap();
            if tok.kind == TokenKind::End {
                break;
            }
            out.push(tok);
        }
        out
    }

    fn lex_err(source: &str) -> String {
        let mut lexer = Lexer::from_source("test.c", source);
        loop {
            match lexer.next_token() {
                Ok(tok) if tok.kind == TokenKind::End => panic!("expected lexer error"),
                Ok(_) => continue,
                Err(e) => return e,
            }
        }
    }

    #[test]
    fn test_simple_declaration() {
        let toks = lex_all("int x = 5;");
        let kinds: Vec<TokenKind> = toks.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::TypeName,
                TokenKind::Ident,
                TokenKind::Equal,
                TokenKind::IntLit,
                TokenKind::Semicolon
            ]
        );
        assert_eq!(toks[3].text, "5");
    }

    #[test]
    fn test_two_char_operators() {
        let toks = lex_all("== != >= <= ++ -- || && += -= *= /=");
        let codes: Vec<u32> = toks.iter().map(|t| t.kind.code()).collect();
        assert_eq!(codes, vec![351, 352, 353, 354, 355, 356, 357, 358, 361, 362, 363, 364]);
    }

    #[test]
    fn test_operator_putback() {
        let toks = lex_all("a=b<c");
        let kinds: Vec<TokenKind> = toks.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Ident,
                TokenKind::Equal,
                TokenKind::Ident,
                TokenKind::Less,
                TokenKind::Ident
            ]
        );
    }

    #[test]
    fn test_line_tracking_and_comments() {
        let toks = lex_all("int a;\n// comment\n/* multi\nline */ float b;");
        assert_eq!(toks[0].line, 1);
        let b = toks.iter().find(|t| t.text == "b").unwrap();
        assert_eq!(b.line, 4);
    }

    #[test]
    fn test_keywords_and_types() {
        let toks = lex_all("while int foo const");
        assert_eq!(toks[0].kind, TokenKind::While);
        assert_eq!(toks[1].kind, TokenKind::TypeName);
        assert_eq!(toks[2].kind, TokenKind::Ident);
        assert_eq!(toks[3].kind, TokenKind::Const);
    }

    #[test]
    fn test_numeric_literals() {
        let toks = lex_all("42 3.14 0x1F 2e10 1.5e-3");
        let kinds: Vec<TokenKind> = toks.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::IntLit,
                TokenKind::RealLit,
                TokenKind::HexLit,
                TokenKind::RealLit,
                TokenKind::RealLit
            ]
        );
        assert_eq!(toks[2].text, "0x1F");
    }

    #[test]
    fn test_string_keeps_escapes_in_source_form() {
        let toks = lex_all("\"hi\\n\\t\\\\\"");
        assert_eq!(toks[0].kind, TokenKind::StringLit);
        assert_eq!(toks[0].text, "hi\\n\\t\\\\");
    }

    #[test]
    fn test_char_literals() {
        let toks = lex_all("'a' '\\n'");
        assert_eq!(toks[0].kind, TokenKind::CharLit);
        assert_eq!(toks[0].text, "a");
        assert_eq!(toks[1].text, "\\n");
    }

    #[test]
    fn test_dot_is_member_operator() {
        let toks = lex_all("p.a");
        let kinds: Vec<TokenKind> = toks.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TokenKind::Ident, TokenKind::Dot, TokenKind::Ident]);
    }

    #[test]
    fn test_unterminated_string_is_fatal() {
        let err = lex_err("\"abc");
        assert!(err.contains("Unterminated string literal"), "{}", err);
    }

    #[test]
    fn test_invalid_escape_is_fatal() {
        let err = lex_err("\"\\q\"");
        assert!(err.contains("Invalid escape sequence"), "{}", err);
    }

    #[test]
    fn test_unterminated_block_comment_is_fatal() {
        let err = lex_err("int a; /* oops");
        assert!(err.contains("Unterminated block comment"), "{}", err);
    }

    #[test]
    fn test_unknown_character_is_fatal() {
        let err = lex_err("int a @ b;");
        assert!(err.contains("Unknown character"), "{}", err);
        assert!(err.contains("at text @"), "{}", err);
    }

    #[test]
    fn test_identifier_length_limit() {
        let long = "a".repeat(48);
        let err = lex_err(&long);
        assert!(err.contains("Identifier too long"), "{}", err);
    }

    #[test]
    fn test_hex_requires_digits() {
        let err = lex_err("0x;");
        assert!(err.contains("Hex literal requires at least one digit"), "{}", err);
    }

    #[test]
    fn test_non_include_directive_is_skipped() {
        let toks = lex_all("#pragma once\nint a;");
        assert_eq!(toks[0].kind, TokenKind::TypeName);
        assert_eq!(toks[0].line, 2);
    }

    #[test]
    fn test_end_is_sticky() {
        let mut lexer = Lexer::from_source("test.c", "x");
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Ident);
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::End);
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::End);
    }

    #[test]
    fn test_token_stream_peek_does_not_consume() {
        let lexer = Lexer::from_source("test.c", "int x ;");
        let mut stream = TokenStream::new(lexer);
        assert_eq!(stream.peek(0).unwrap().kind, TokenKind::TypeName);
        assert_eq!(stream.peek(2).unwrap().kind, TokenKind::Semicolon);
        assert_eq!(stream.advance().unwrap().kind, TokenKind::TypeName);
        assert_eq!(stream.peek(0).unwrap().kind, TokenKind::Ident);
    }

    #[test]
    fn test_include_tokens_carry_their_own_file() {
        let dir = std::env::temp_dir().join("mycc_lexer_include_test");
        std::fs::create_dir_all(&dir).unwrap();
        let inc = dir.join("inc.h");
        std::fs::write(&inc, "int shared;\n").unwrap();

        let source = format!("#include \"{}\"\nint own;\n", inc.display());
        let toks = lex_all(&source);
        let shared = toks.iter().find(|t| t.text == "shared").unwrap();
        assert_eq!(&*shared.file, inc.display().to_string().as_str());
        assert_eq!(shared.line, 1);
        let own = toks.iter().find(|t| t.text == "own").unwrap();
        assert_eq!(&*own.file, "test.c");
        assert_eq!(own.line, 2);
    }
}
