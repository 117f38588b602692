//! Recursive-descent parser with on-the-fly type checking.
//!
//! The parser consumes a peekable token stream (up to three tokens of
//! lookahead for top-level disambiguation), builds the typed AST, and
//! populates the symbol table as it goes. Every expression node gets its
//! type at construction; implicit widenings are materialized as `Cast`
//! nodes so later phases never re-derive conversion sites. Local slot
//! indices are assigned while the owning function body is parsed:
//! parameters take `0..n`, other locals the next free index in declaration
//! order.
//!
//! Syntax problems report as `Parser error ...`, type violations as
//! `Type checking error ...`; both are fatal to the compilation.

use crate::ast::{
    BinaryOp, DeclKind, DeclRecord, Declaration, ExprKind, Expression, Item, Program, Statement,
    UnaryOp,
};
use crate::config::CompilerConfig;
use crate::lexer::TokenStream;
use crate::symbols::{Function, Param, StructDef, SymbolTable, VarSymbol};
use crate::token::{Token, TokenKind};
use crate::types::{BaseType, Type};
use std::rc::Rc;

pub struct Parser {
    tokens: TokenStream,
    symbols: SymbolTable,
    items: Vec<Item>,
    records: Vec<DeclRecord>,
    /// Locals of the function currently being parsed, in slot order.
    current_locals: Vec<VarSymbol>,
    next_slot: u16,
    current_return: Option<Type>,
    loop_depth: u32,
}

impl Parser {
    pub fn new(tokens: TokenStream, config: &CompilerConfig) -> Parser {
        let mut symbols = SymbolTable::new();
        for builtin in &config.builtins {
            let func = Function {
                name: builtin.name.clone(),
                return_type: builtin.return_type.clone(),
                params: builtin
                    .params
                    .iter()
                    .map(|ty| Param {
                        name: None,
                        ty: ty.clone(),
                    })
                    .collect(),
                locals: Vec::new(),
                body: None,
                defined: true,
                builtin: true,
                line: 0,
            };
            symbols
                .declare_function(func)
                .expect("preloaded builtins are unique");
        }
        Parser {
            tokens,
            symbols,
            items: Vec::new(),
            records: Vec::new(),
            current_locals: Vec::new(),
            next_slot: 0,
            current_return: None,
            loop_depth: 0,
        }
    }

    pub fn parse(mut self) -> Result<Program, String> {
        loop {
            let tok = self.tokens.peek(0)?.clone();
            match tok.kind {
                TokenKind::End => break,
                TokenKind::Struct => {
                    if self.tokens.peek(2)?.kind == TokenKind::LBrace {
                        self.parse_struct_def()?;
                    } else {
                        self.parse_top_level_decl()?;
                    }
                }
                TokenKind::Const | TokenKind::TypeName => self.parse_top_level_decl()?,
                _ => {
                    return Err(self.syntax_error(&tok, "declaration or function definition"));
                }
            }
        }
        Ok(Program {
            symbols: self.symbols,
            items: self.items,
            records: self.records,
        })
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    fn syntax_error(&self, tok: &Token, expected: &str) -> String {
        if tok.kind == TokenKind::End {
            format!(
                "Parser error in file {} line {}: Expected {}, but saw end of input",
                tok.file, tok.line, expected
            )
        } else {
            format!(
                "Parser error in file {} line {} at text {}: Expected {}",
                tok.file, tok.line, tok, expected
            )
        }
    }

    fn parser_error(&self, tok: &Token, message: &str) -> String {
        format!(
            "Parser error in file {} line {}: {}",
            tok.file, tok.line, message
        )
    }

    fn type_error(&self, file: &Rc<str>, line: u32, message: &str) -> String {
        format!(
            "Type checking error in file {} line {}: {}",
            file, line, message
        )
    }

    // =========================================================================
    // Token helpers
    // =========================================================================

    fn peek_kind(&mut self, k: usize) -> Result<TokenKind, String> {
        Ok(self.tokens.peek(k)?.kind)
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<Token, String> {
        let tok = self.tokens.advance()?;
        if tok.kind == kind {
            Ok(tok)
        } else {
            Err(self.syntax_error(&tok, expected))
        }
    }

    fn eat(&mut self, kind: TokenKind) -> Result<Option<Token>, String> {
        if self.peek_kind(0)? == kind {
            Ok(Some(self.tokens.advance()?))
        } else {
            Ok(None)
        }
    }

    fn record(&mut self, tok: &Token, kind: DeclKind, name: &str) {
        self.records.push(DeclRecord {
            file: tok.file.clone(),
            line: tok.line,
            kind,
            name: name.to_string(),
        });
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    /// `'const'? (TYPE | 'struct' IDENT) 'const'?`
    fn parse_type_spec(&mut self) -> Result<Type, String> {
        let is_const_pre = self.eat(TokenKind::Const)?.is_some();
        let tok = self.tokens.advance()?;
        let mut ty = match tok.kind {
            TokenKind::TypeName => match tok.text.as_str() {
                "void" => Type::scalar(BaseType::Void),
                "char" => Type::scalar(BaseType::Char),
                "int" => Type::scalar(BaseType::Int),
                "float" => Type::scalar(BaseType::Float),
                _ => return Err(self.syntax_error(&tok, "type specifier")),
            },
            TokenKind::Struct => {
                let name = self.expect(TokenKind::Ident, "struct name")?;
                if self.symbols.lookup_struct(&name.text).is_none() {
                    return Err(self.type_error(
                        &name.file,
                        name.line,
                        &format!("Undeclared struct {}", name.text),
                    ));
                }
                Type::structure(name.text)
            }
            _ => return Err(self.syntax_error(&tok, "type specifier")),
        };
        let is_const_post = self.eat(TokenKind::Const)?.is_some();
        ty.is_const = is_const_pre || is_const_post;
        Ok(ty)
    }

    /// `'struct' IDENT '{' memberDecl+ '}' ';'`
    fn parse_struct_def(&mut self) -> Result<(), String> {
        self.expect(TokenKind::Struct, "struct")?;
        let name = self.expect(TokenKind::Ident, "struct name")?;
        self.record(&name, DeclKind::Struct, &name.text.clone());
        self.expect(TokenKind::LBrace, "'{' after struct name")?;

        let mut members: Vec<Declaration> = Vec::new();
        while self.peek_kind(0)? != TokenKind::RBrace {
            let base = self.parse_type_spec()?;
            if base.base == BaseType::Void {
                let tok = self.tokens.peek(0)?.clone();
                return Err(self.type_error(
                    &tok.file,
                    tok.line,
                    "Struct member cannot be declared void",
                ));
            }
            loop {
                let member = self.expect(TokenKind::Ident, "member name")?;
                let mut ty = base.clone();
                if self.eat(TokenKind::LBracket)?.is_some() {
                    self.expect(TokenKind::IntLit, "array size literal")?;
                    self.expect(TokenKind::RBracket, "']'")?;
                    ty.is_array = true;
                }
                if members.iter().any(|m| m.name == member.text) {
                    return Err(self.type_error(
                        &member.file,
                        member.line,
                        &format!("Duplicate member {} in struct {}", member.text, name.text),
                    ));
                }
                self.record(&member, DeclKind::Member, &member.text.clone());
                members.push(Declaration {
                    ty,
                    name: member.text,
                    init: None,
                    line: member.line,
                });
                if self.eat(TokenKind::Comma)?.is_none() {
                    break;
                }
            }
            self.expect(TokenKind::Semicolon, "';'")?;
        }
        self.expect(TokenKind::RBrace, "'}' after struct definition")?;
        self.expect(TokenKind::Semicolon, "';' after struct definition")?;

        if members.is_empty() {
            return Err(self.type_error(
                &name.file,
                name.line,
                &format!("Struct {} has no members", name.text),
            ));
        }
        self.symbols
            .add_struct(StructDef {
                name: name.text.clone(),
                members,
                line: name.line,
            })
            .map_err(|msg| self.type_error(&name.file, name.line, &msg))
    }

    /// A top-level `type name ...` form: function or global variable list.
    fn parse_top_level_decl(&mut self) -> Result<(), String> {
        let ty = self.parse_type_spec()?;
        let name = self.expect(TokenKind::Ident, "identifier")?;
        if self.peek_kind(0)? == TokenKind::LParen {
            self.parse_function(ty, name)
        } else {
            self.parse_global_decl_list(ty, name)
        }
    }

    fn parse_global_decl_list(&mut self, base: Type, first: Token) -> Result<(), String> {
        if base.base == BaseType::Void {
            return Err(self.type_error(
                &first.file,
                first.line,
                "Variable cannot be declared void",
            ));
        }
        let mut name = first;
        loop {
            let decl = self.parse_declarator(base.clone(), &name, true)?;
            self.symbols
                .add_global(VarSymbol {
                    name: decl.name.clone(),
                    ty: decl.ty.clone(),
                    is_global: true,
                    slot: None,
                    line: decl.line,
                })
                .map_err(|msg| self.type_error(&name.file, name.line, &msg))?;
            self.items.push(Item::Global(decl));
            if self.eat(TokenKind::Comma)?.is_some() {
                name = self.expect(TokenKind::Ident, "identifier after ','")?;
            } else {
                self.expect(TokenKind::Semicolon, "';'")?;
                return Ok(());
            }
        }
    }

    /// One declarator: `('[' INT ']')? ('=' assignExpr)?`, plus the trace
    /// record. The name token has already been consumed.
    fn parse_declarator(
        &mut self,
        mut ty: Type,
        name: &Token,
        is_global: bool,
    ) -> Result<Declaration, String> {
        if self.eat(TokenKind::LBracket)?.is_some() {
            self.expect(TokenKind::IntLit, "array size literal")?;
            self.expect(TokenKind::RBracket, "']'")?;
            ty.is_array = true;
        }
        let kind = if is_global {
            DeclKind::GlobalVariable
        } else {
            DeclKind::LocalVariable
        };
        self.record(name, kind, &name.text);

        let init = if self.eat(TokenKind::Equal)?.is_some() {
            let expr = self.parse_expression()?;
            if !expr.ty.same_as(&ty) && !expr.ty.widens_to(&ty) {
                return Err(self.type_error(
                    &name.file,
                    name.line,
                    "Initializer type does not match declared type",
                ));
            }
            Some(widen(expr, &ty))
        } else {
            None
        };

        Ok(Declaration {
            ty,
            name: name.text.clone(),
            init,
            line: name.line,
        })
    }

    // =========================================================================
    // Functions
    // =========================================================================

    fn parse_function(&mut self, return_type: Type, name: Token) -> Result<(), String> {
        self.record(&name, DeclKind::Function, &name.text.clone());
        self.expect(TokenKind::LParen, "'(' after function name")?;

        let mut params: Vec<Param> = Vec::new();
        if self.peek_kind(0)? != TokenKind::RParen {
            loop {
                params.push(self.parse_param()?);
                if self.eat(TokenKind::Comma)?.is_none() {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "')'")?;

        if self.eat(TokenKind::Semicolon)?.is_some() {
            let proto = Function {
                name: name.text.clone(),
                return_type,
                params,
                locals: Vec::new(),
                body: None,
                defined: false,
                builtin: false,
                line: name.line,
            };
            return self
                .symbols
                .declare_function(proto)
                .map_err(|msg| self.type_error(&name.file, name.line, &msg));
        }

        // Definition: parameters become the leading local slots.
        self.current_locals.clear();
        self.next_slot = 0;
        for param in &params {
            let pname = match &param.name {
                Some(n) => n.clone(),
                None => {
                    let tok = self.tokens.peek(0)?.clone();
                    return Err(self.syntax_error(&tok, "parameter name in function definition"));
                }
            };
            if self.current_locals.iter().any(|v| v.name == pname) {
                return Err(self.type_error(
                    &name.file,
                    name.line,
                    &format!("Duplicate declaration of parameter {}", pname),
                ));
            }
            let slot = self.next_slot;
            self.next_slot += 1;
            self.current_locals.push(VarSymbol {
                name: pname,
                ty: param.ty.clone(),
                is_global: false,
                slot: Some(slot),
                line: name.line,
            });
        }

        self.current_return = Some(return_type.clone());
        let body = self.parse_compound()?;
        self.current_return = None;

        let func = Function {
            name: name.text.clone(),
            return_type,
            params,
            locals: std::mem::take(&mut self.current_locals),
            body: Some(body),
            defined: true,
            builtin: false,
            line: name.line,
        };
        self.symbols
            .declare_function(func)
            .map_err(|msg| self.type_error(&name.file, name.line, &msg))?;
        self.items.push(Item::Function(name.text));
        Ok(())
    }

    /// `param := typeSpec IDENT? ('[' ']')?` — names are optional in
    /// prototypes.
    fn parse_param(&mut self) -> Result<Param, String> {
        let mut ty = self.parse_type_spec()?;
        if ty.base == BaseType::Void {
            let tok = self.tokens.peek(0)?.clone();
            return Err(self.type_error(&tok.file, tok.line, "Parameter type cannot be void"));
        }
        let name = if let Some(tok) = self.eat(TokenKind::Ident)? {
            self.record(&tok, DeclKind::Parameter, &tok.text);
            Some(tok.text)
        } else {
            None
        };
        if self.eat(TokenKind::LBracket)?.is_some() {
            self.expect(TokenKind::RBracket, "']'")?;
            ty.is_array = true;
        }
        Ok(Param { name, ty })
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn parse_compound(&mut self) -> Result<Statement, String> {
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut stmts = Vec::new();
        while !matches!(self.peek_kind(0)?, TokenKind::RBrace | TokenKind::End) {
            self.parse_statement_into(&mut stmts)?;
        }
        self.expect(TokenKind::RBrace, "'}'")?;
        Ok(Statement::Compound(stmts))
    }

    fn parse_statement(&mut self) -> Result<Statement, String> {
        let mut out = Vec::new();
        self.parse_statement_into(&mut out)?;
        if out.len() == 1 {
            Ok(out.pop().expect("one statement"))
        } else {
            Ok(Statement::Compound(out))
        }
    }

    fn parse_statement_into(&mut self, out: &mut Vec<Statement>) -> Result<(), String> {
        match self.peek_kind(0)? {
            TokenKind::Semicolon => {
                self.tokens.advance()?;
                out.push(Statement::Empty);
            }
            TokenKind::LBrace => out.push(self.parse_compound()?),
            TokenKind::Const | TokenKind::TypeName | TokenKind::Struct => {
                self.parse_local_decl_list(out)?;
            }
            TokenKind::If => out.push(self.parse_if()?),
            TokenKind::While => out.push(self.parse_while()?),
            TokenKind::Do => out.push(self.parse_do_while()?),
            TokenKind::For => out.push(self.parse_for()?),
            TokenKind::Return => out.push(self.parse_return()?),
            TokenKind::Break => {
                let tok = self.tokens.advance()?;
                self.expect(TokenKind::Semicolon, "';'")?;
                if self.loop_depth == 0 {
                    return Err(self.parser_error(&tok, "break not inside a loop"));
                }
                out.push(Statement::Break { line: tok.line });
            }
            TokenKind::Continue => {
                let tok = self.tokens.advance()?;
                self.expect(TokenKind::Semicolon, "';'")?;
                if self.loop_depth == 0 {
                    return Err(self.parser_error(&tok, "continue not inside a loop"));
                }
                out.push(Statement::Continue { line: tok.line });
            }
            TokenKind::Switch | TokenKind::Case | TokenKind::Default => {
                let tok = self.tokens.peek(0)?.clone();
                return Err(self.syntax_error(&tok, "statement"));
            }
            _ => {
                let expr = self.parse_expression()?;
                self.expect(TokenKind::Semicolon, "';'")?;
                out.push(Statement::Expr(expr));
            }
        }
        Ok(())
    }

    fn parse_local_decl_list(&mut self, out: &mut Vec<Statement>) -> Result<(), String> {
        let base = self.parse_type_spec()?;
        let mut name = self.expect(TokenKind::Ident, "variable name")?;
        if base.base == BaseType::Void {
            return Err(self.type_error(&name.file, name.line, "Variable cannot be declared void"));
        }
        loop {
            if self.peek_kind(0)? == TokenKind::LParen {
                return Err(self.parser_error(&name, "Cannot nest functions"));
            }
            let decl = self.parse_declarator(base.clone(), &name, false)?;
            if self.current_locals.iter().any(|v| v.name == decl.name) {
                return Err(self.type_error(
                    &name.file,
                    name.line,
                    &format!("Duplicate declaration of variable {}", decl.name),
                ));
            }
            let slot = self.next_slot;
            self.next_slot += 1;
            self.current_locals.push(VarSymbol {
                name: decl.name.clone(),
                ty: decl.ty.clone(),
                is_global: false,
                slot: Some(slot),
                line: decl.line,
            });
            out.push(Statement::Decl(decl));
            if self.eat(TokenKind::Comma)?.is_some() {
                name = self.expect(TokenKind::Ident, "identifier after ','")?;
            } else {
                self.expect(TokenKind::Semicolon, "';'")?;
                return Ok(());
            }
        }
    }

    fn parse_condition(&mut self, context: &str) -> Result<Expression, String> {
        let cond = self.parse_expression()?;
        if !cond.ty.is_integral() {
            return Err(self.type_error(
                &cond.file,
                cond.line,
                &format!("{} must have integer type", context),
            ));
        }
        Ok(cond)
    }

    fn parse_if(&mut self) -> Result<Statement, String> {
        self.tokens.advance()?;
        self.expect(TokenKind::LParen, "'(' after if")?;
        let cond = self.parse_condition("Condition of if statement")?;
        self.expect(TokenKind::RParen, "')'")?;
        let then_branch = Box::new(self.parse_statement()?);
        let else_branch = if self.eat(TokenKind::Else)?.is_some() {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Statement::If {
            cond,
            then_branch,
            else_branch,
        })
    }

    fn parse_while(&mut self) -> Result<Statement, String> {
        self.tokens.advance()?;
        self.expect(TokenKind::LParen, "'(' after while")?;
        let cond = self.parse_condition("Condition of while loop")?;
        self.expect(TokenKind::RParen, "')'")?;
        self.loop_depth += 1;
        let body = Box::new(self.parse_statement()?);
        self.loop_depth -= 1;
        Ok(Statement::While { cond, body })
    }

    fn parse_do_while(&mut self) -> Result<Statement, String> {
        self.tokens.advance()?;
        self.loop_depth += 1;
        let body = Box::new(self.parse_statement()?);
        self.loop_depth -= 1;
        self.expect(TokenKind::While, "while after do body")?;
        self.expect(TokenKind::LParen, "'(' after while")?;
        let cond = self.parse_condition("Condition of do-while loop")?;
        self.expect(TokenKind::RParen, "')'")?;
        self.expect(TokenKind::Semicolon, "';'")?;
        Ok(Statement::DoWhile { body, cond })
    }

    fn parse_for(&mut self) -> Result<Statement, String> {
        self.tokens.advance()?;
        self.expect(TokenKind::LParen, "'(' after for")?;
        let init = if self.peek_kind(0)? != TokenKind::Semicolon {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon, "';'")?;
        let cond = if self.peek_kind(0)? != TokenKind::Semicolon {
            Some(self.parse_condition("Condition of for loop")?)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon, "';'")?;
        let update = if self.peek_kind(0)? != TokenKind::RParen {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect(TokenKind::RParen, "')'")?;
        self.loop_depth += 1;
        let body = Box::new(self.parse_statement()?);
        self.loop_depth -= 1;
        Ok(Statement::For {
            init,
            cond,
            update,
            body,
        })
    }

    fn parse_return(&mut self) -> Result<Statement, String> {
        let tok = self.tokens.advance()?;
        let value = if self.peek_kind(0)? != TokenKind::Semicolon {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon, "';'")?;

        let ret = self
            .current_return
            .clone()
            .expect("return statement inside a function");
        match &value {
            None => {
                if ret.base != BaseType::Void {
                    return Err(self.type_error(
                        &tok.file,
                        tok.line,
                        "Return without a value in non-void function",
                    ));
                }
            }
            Some(v) => {
                if ret.base == BaseType::Void {
                    return Err(self.type_error(
                        &v.file,
                        v.line,
                        "Return with a value in void function",
                    ));
                }
                if !v.ty.same_as(&ret) {
                    return Err(self.type_error(
                        &v.file,
                        v.line,
                        "Return type does not match function return type",
                    ));
                }
            }
        }
        Ok(Statement::Return {
            value,
            line: tok.line,
        })
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn parse_expression(&mut self) -> Result<Expression, String> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expression, String> {
        let left = self.parse_ternary()?;
        let tok = self.tokens.peek(0)?.clone();
        let compound = match tok.kind {
            TokenKind::Equal => None,
            TokenKind::PlusAssign => Some(BinaryOp::Add),
            TokenKind::MinusAssign => Some(BinaryOp::Sub),
            TokenKind::StarAssign => Some(BinaryOp::Mul),
            TokenKind::SlashAssign => Some(BinaryOp::Div),
            _ => return Ok(left),
        };
        self.tokens.advance()?;
        let rhs = self.parse_assignment()?;

        let value = match compound {
            None => rhs,
            Some(op) => {
                if !left.ty.is_numeric() {
                    return Err(self.type_error(
                        &tok.file,
                        tok.line,
                        "Operand of compound assignment is not numeric",
                    ));
                }
                self.make_binary(op, left.clone(), rhs, &tok)?
            }
        };
        self.make_assign(left, value, &tok)
    }

    fn make_assign(
        &self,
        target: Expression,
        value: Expression,
        tok: &Token,
    ) -> Result<Expression, String> {
        if !target.is_lvalue() {
            return Err(self.type_error(&tok.file, tok.line, "Invalid assignment target"));
        }
        if target.ty.is_const {
            return Err(self.type_error(&tok.file, tok.line, "Assignment to a const variable"));
        }
        if target.ty.is_array {
            return Err(self.type_error(&tok.file, tok.line, "Assignment to an array"));
        }
        if !value.ty.same_as(&target.ty) && !value.ty.widens_to(&target.ty) {
            return Err(self.type_error(&tok.file, tok.line, "Type mismatch in assignment"));
        }
        let ty = target.ty.clone();
        let value = widen(value, &ty);
        Ok(Expression {
            kind: ExprKind::Assign {
                target: Box::new(target),
                value: Box::new(value),
            },
            ty,
            line: tok.line,
            file: tok.file.clone(),
        })
    }

    fn parse_ternary(&mut self) -> Result<Expression, String> {
        let cond = self.parse_logical_or()?;
        if self.eat(TokenKind::Question)?.is_none() {
            return Ok(cond);
        }
        if !cond.ty.is_integral() {
            return Err(self.type_error(
                &cond.file,
                cond.line,
                "Condition of ternary operator must have integer type",
            ));
        }
        let then_value = self.parse_expression()?;
        let colon = self.expect(TokenKind::Colon, "':' in ternary operator")?;
        let else_value = self.parse_expression()?;

        let (then_value, else_value) = if then_value.ty.same_as(&else_value.ty) {
            (then_value, else_value)
        } else if then_value.ty.widens_to(&else_value.ty) {
            let target = else_value.ty.clone();
            (widen(then_value, &target), else_value)
        } else if else_value.ty.widens_to(&then_value.ty) {
            let target = then_value.ty.clone();
            (then_value, widen(else_value, &target))
        } else {
            return Err(self.type_error(
                &colon.file,
                colon.line,
                "Incompatible types in ternary operator",
            ));
        };
        let ty = Type::scalar(then_value.ty.base);
        Ok(Expression {
            line: cond.line,
            file: cond.file.clone(),
            kind: ExprKind::Ternary {
                cond: Box::new(cond),
                then_value: Box::new(then_value),
                else_value: Box::new(else_value),
            },
            ty,
        })
    }

    fn parse_logical_or(&mut self) -> Result<Expression, String> {
        let mut node = self.parse_logical_and()?;
        while self.peek_kind(0)? == TokenKind::OrOr {
            let tok = self.tokens.advance()?;
            let right = self.parse_logical_and()?;
            node = self.make_logical(BinaryOp::Or, node, right, &tok)?;
        }
        Ok(node)
    }

    fn parse_logical_and(&mut self) -> Result<Expression, String> {
        let mut node = self.parse_equality()?;
        while self.peek_kind(0)? == TokenKind::AndAnd {
            let tok = self.tokens.advance()?;
            let right = self.parse_equality()?;
            node = self.make_logical(BinaryOp::And, node, right, &tok)?;
        }
        Ok(node)
    }

    fn make_logical(
        &self,
        op: BinaryOp,
        left: Expression,
        right: Expression,
        tok: &Token,
    ) -> Result<Expression, String> {
        if !left.ty.is_integral() || !right.ty.is_integral() {
            return Err(self.type_error(
                &tok.file,
                tok.line,
                "Operand of logical operator must have integer type",
            ));
        }
        Ok(Expression {
            kind: ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            ty: Type::scalar(BaseType::Int),
            line: tok.line,
            file: tok.file.clone(),
        })
    }

    fn parse_equality(&mut self) -> Result<Expression, String> {
        let mut node = self.parse_relational()?;
        loop {
            let op = match self.peek_kind(0)? {
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::Ne,
                _ => return Ok(node),
            };
            let tok = self.tokens.advance()?;
            let right = self.parse_relational()?;
            node = self.make_binary(op, node, right, &tok)?;
        }
    }

    fn parse_relational(&mut self) -> Result<Expression, String> {
        let mut node = self.parse_additive()?;
        loop {
            let op = match self.peek_kind(0)? {
                TokenKind::Less => BinaryOp::Lt,
                TokenKind::LessEq => BinaryOp::Le,
                TokenKind::Greater => BinaryOp::Gt,
                TokenKind::GreaterEq => BinaryOp::Ge,
                _ => return Ok(node),
            };
            let tok = self.tokens.advance()?;
            let right = self.parse_additive()?;
            node = self.make_binary(op, node, right, &tok)?;
        }
    }

    fn parse_additive(&mut self) -> Result<Expression, String> {
        let mut node = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_kind(0)? {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok(node),
            };
            let tok = self.tokens.advance()?;
            let right = self.parse_multiplicative()?;
            node = self.make_binary(op, node, right, &tok)?;
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expression, String> {
        let mut node = self.parse_unary()?;
        loop {
            let op = match self.peek_kind(0)? {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Rem,
                _ => return Ok(node),
            };
            let tok = self.tokens.advance()?;
            let right = self.parse_unary()?;
            node = self.make_binary(op, node, right, &tok)?;
        }
    }

    /// Arithmetic and comparison operators: numeric operands, implicit
    /// widening of the narrower side, `%` restricted to integer operands.
    fn make_binary(
        &self,
        op: BinaryOp,
        left: Expression,
        right: Expression,
        tok: &Token,
    ) -> Result<Expression, String> {
        if !left.ty.is_numeric() || !right.ty.is_numeric() {
            return Err(self.type_error(
                &tok.file,
                tok.line,
                "Operand of binary operator is not numeric",
            ));
        }
        let (left, right) = if left.ty.same_as(&right.ty) {
            (left, right)
        } else if left.ty.widens_to(&right.ty) {
            let target = right.ty.clone();
            (widen(left, &target), right)
        } else if right.ty.widens_to(&left.ty) {
            let target = left.ty.clone();
            (left, widen(right, &target))
        } else {
            return Err(self.type_error(&tok.file, tok.line, "Type mismatch in binary operator"));
        };
        if op == BinaryOp::Rem && left.ty.base == BaseType::Float {
            return Err(self.type_error(
                &tok.file,
                tok.line,
                "Operator % cannot be applied to float operands",
            ));
        }
        let ty = if op.is_comparison() {
            Type::scalar(BaseType::Int)
        } else {
            Type::scalar(left.ty.base)
        };
        Ok(Expression {
            kind: ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            ty,
            line: tok.line,
            file: tok.file.clone(),
        })
    }

    fn parse_unary(&mut self) -> Result<Expression, String> {
        match self.peek_kind(0)? {
            TokenKind::Minus => {
                let tok = self.tokens.advance()?;
                let operand = self.parse_unary()?;
                if !operand.ty.is_numeric() {
                    return Err(self.type_error(
                        &tok.file,
                        tok.line,
                        "Operand of unary minus is not numeric",
                    ));
                }
                let ty = Type::scalar(operand.ty.base);
                Ok(Expression {
                    kind: ExprKind::Unary {
                        op: UnaryOp::Neg,
                        operand: Box::new(operand),
                    },
                    ty,
                    line: tok.line,
                    file: tok.file,
                })
            }
            TokenKind::Bang => {
                let tok = self.tokens.advance()?;
                let operand = self.parse_unary()?;
                if !operand.ty.is_integral() {
                    return Err(self.type_error(
                        &tok.file,
                        tok.line,
                        "Operand of logical not must have integer type",
                    ));
                }
                Ok(Expression {
                    kind: ExprKind::Unary {
                        op: UnaryOp::Not,
                        operand: Box::new(operand),
                    },
                    ty: Type::scalar(BaseType::Int),
                    line: tok.line,
                    file: tok.file,
                })
            }
            TokenKind::Tilde => {
                let tok = self.tokens.advance()?;
                let operand = self.parse_unary()?;
                if operand.ty.is_array || operand.ty.base != BaseType::Int {
                    return Err(self.type_error(
                        &tok.file,
                        tok.line,
                        "Operator ~ requires an int operand",
                    ));
                }
                Ok(Expression {
                    kind: ExprKind::Unary {
                        op: UnaryOp::BitNot,
                        operand: Box::new(operand),
                    },
                    ty: Type::scalar(BaseType::Int),
                    line: tok.line,
                    file: tok.file,
                })
            }
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let tok = self.tokens.advance()?;
                let op = if tok.kind == TokenKind::PlusPlus {
                    UnaryOp::PreInc
                } else {
                    UnaryOp::PreDec
                };
                let operand = self.parse_unary()?;
                self.make_incdec(op, operand, &tok)
            }
            TokenKind::LParen if self.peek_kind(1)? == TokenKind::TypeName => {
                let tok = self.tokens.advance()?;
                let ty_tok = self.tokens.advance()?;
                let target = match ty_tok.text.as_str() {
                    "int" => Type::scalar(BaseType::Int),
                    "float" => Type::scalar(BaseType::Float),
                    "char" => Type::scalar(BaseType::Char),
                    _ => {
                        return Err(self.type_error(&ty_tok.file, ty_tok.line, "Illegal cast"));
                    }
                };
                self.expect(TokenKind::RParen, "')' after cast type")?;
                let operand = self.parse_unary()?;
                if !operand.ty.is_numeric() {
                    return Err(self.type_error(&tok.file, tok.line, "Illegal cast"));
                }
                Ok(Expression {
                    kind: ExprKind::Cast {
                        operand: Box::new(operand),
                    },
                    ty: target,
                    line: tok.line,
                    file: tok.file,
                })
            }
            _ => self.parse_postfix(),
        }
    }

    fn make_incdec(
        &self,
        op: UnaryOp,
        operand: Expression,
        tok: &Token,
    ) -> Result<Expression, String> {
        if !operand.is_lvalue() {
            return Err(self.type_error(
                &tok.file,
                tok.line,
                "Operand of increment or decrement is not assignable",
            ));
        }
        if operand.ty.is_const {
            return Err(self.type_error(&tok.file, tok.line, "Invalid operation on a const variable"));
        }
        if !operand.ty.is_numeric() {
            return Err(self.type_error(
                &tok.file,
                tok.line,
                "Operand of increment or decrement is not numeric",
            ));
        }
        let ty = Type::scalar(operand.ty.base);
        Ok(Expression {
            kind: ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            ty,
            line: tok.line,
            file: tok.file.clone(),
        })
    }

    fn parse_postfix(&mut self) -> Result<Expression, String> {
        let mut node = self.parse_primary()?;
        loop {
            match self.peek_kind(0)? {
                TokenKind::LBracket => {
                    let tok = self.tokens.advance()?;
                    let index = self.parse_expression()?;
                    self.expect(TokenKind::RBracket, "']'")?;
                    node = self.make_index(node, index, &tok)?;
                }
                TokenKind::Dot => {
                    self.tokens.advance()?;
                    let member = self.expect(TokenKind::Ident, "member name after '.'")?;
                    node = self.make_member(node, &member)?;
                }
                TokenKind::PlusPlus => {
                    let tok = self.tokens.advance()?;
                    node = self.make_incdec(UnaryOp::PostInc, node, &tok)?;
                }
                TokenKind::MinusMinus => {
                    let tok = self.tokens.advance()?;
                    node = self.make_incdec(UnaryOp::PostDec, node, &tok)?;
                }
                _ => return Ok(node),
            }
        }
    }

    fn make_index(
        &self,
        array: Expression,
        index: Expression,
        tok: &Token,
    ) -> Result<Expression, String> {
        if !array.ty.is_array {
            return Err(self.type_error(&tok.file, tok.line, "Attempt to index a non-array type"));
        }
        if index.ty.is_array || index.ty.base != BaseType::Int {
            return Err(self.type_error(&tok.file, tok.line, "Array index is not of integer type"));
        }
        let ty = array.ty.element_type();
        Ok(Expression {
            kind: ExprKind::Index {
                array: Box::new(array),
                index: Box::new(index),
            },
            ty,
            line: tok.line,
            file: tok.file.clone(),
        })
    }

    fn make_member(&self, object: Expression, member: &Token) -> Result<Expression, String> {
        if object.ty.is_array || object.ty.base != BaseType::Struct {
            return Err(self.type_error(
                &member.file,
                member.line,
                "Member selection on non-struct type",
            ));
        }
        let struct_name = object.ty.struct_name.clone().unwrap_or_default();
        let sdef = match self.symbols.lookup_struct(&struct_name) {
            Some(s) => s,
            None => {
                return Err(self.type_error(
                    &member.file,
                    member.line,
                    &format!("Undeclared struct {}", struct_name),
                ));
            }
        };
        let decl = match sdef.member(&member.text) {
            Some(m) => m,
            None => {
                return Err(self.type_error(
                    &member.file,
                    member.line,
                    &format!("Member {} not found in struct {}", member.text, struct_name),
                ));
            }
        };
        let mut ty = decl.ty.clone();
        if object.ty.is_const {
            ty.is_const = true;
        }
        Ok(Expression {
            kind: ExprKind::Member {
                object: Box::new(object),
                member: member.text.clone(),
            },
            ty,
            line: member.line,
            file: member.file.clone(),
        })
    }

    fn parse_primary(&mut self) -> Result<Expression, String> {
        let tok = self.tokens.peek(0)?.clone();
        match tok.kind {
            TokenKind::LParen => {
                self.tokens.advance()?;
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(expr)
            }
            TokenKind::IntLit | TokenKind::HexLit => {
                let tok = self.tokens.advance()?;
                Ok(literal(tok, Type::scalar(BaseType::Int)))
            }
            TokenKind::RealLit => {
                let tok = self.tokens.advance()?;
                Ok(literal(tok, Type::scalar(BaseType::Float)))
            }
            TokenKind::CharLit => {
                let tok = self.tokens.advance()?;
                Ok(literal(tok, Type::scalar(BaseType::Char)))
            }
            TokenKind::StringLit => {
                let tok = self.tokens.advance()?;
                Ok(literal(
                    tok,
                    Type::scalar(BaseType::Char).const_of().array_of(),
                ))
            }
            TokenKind::Ident => {
                let name = self.tokens.advance()?;
                if self.peek_kind(0)? == TokenKind::LParen {
                    self.parse_call(name)
                } else {
                    self.make_identifier(&name)
                }
            }
            _ => Err(self.syntax_error(&tok, "primary expression")),
        }
    }

    fn make_identifier(&self, name: &Token) -> Result<Expression, String> {
        let sym = match self.symbols.lookup_variable(&self.current_locals, &name.text) {
            Some(sym) => sym,
            None => {
                return Err(self.type_error(
                    &name.file,
                    name.line,
                    &format!("Using undeclared variable {}", name.text),
                ));
            }
        };
        Ok(Expression {
            kind: ExprKind::Identifier {
                name: name.text.clone(),
            },
            ty: sym.ty.clone(),
            line: name.line,
            file: name.file.clone(),
        })
    }

    fn parse_call(&mut self, name: Token) -> Result<Expression, String> {
        self.expect(TokenKind::LParen, "'('")?;
        let mut args = Vec::new();
        if self.peek_kind(0)? != TokenKind::RParen {
            loop {
                args.push(self.parse_expression()?);
                if self.eat(TokenKind::Comma)?.is_none() {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "')' after function call")?;

        let (param_types, return_type) = match self.symbols.lookup_function(&name.text) {
            Some(f) => (
                f.params.iter().map(|p| p.ty.clone()).collect::<Vec<_>>(),
                f.return_type.clone(),
            ),
            None => {
                return Err(self.type_error(
                    &name.file,
                    name.line,
                    &format!("Call to undeclared function {}", name.text),
                ));
            }
        };
        if args.len() != param_types.len() {
            return Err(self.type_error(
                &name.file,
                name.line,
                &format!("Wrong number of arguments in call to {}", name.text),
            ));
        }
        let mut widened = Vec::with_capacity(args.len());
        for (arg, param_ty) in args.into_iter().zip(param_types.iter()) {
            if !arg.ty.same_as(param_ty) && !arg.ty.widens_to(param_ty) {
                return Err(self.type_error(
                    &arg.file,
                    arg.line,
                    &format!("Argument type mismatch in call to {}", name.text),
                ));
            }
            widened.push(widen(arg, param_ty));
        }
        Ok(Expression {
            kind: ExprKind::Call {
                name: name.text.clone(),
                args: widened,
            },
            ty: return_type,
            line: name.line,
            file: name.file,
        })
    }
}

/// Materialize an implicit widening of `expr` to `target`.
///
/// Widening distributes into arithmetic subtrees: `y + 1` widened to float
/// becomes a float addition of two widened operands, so the emitter
/// converts each operand before the operation. Any other node is wrapped
/// in a cast. The widened type is the plain value type; const does not
/// transfer.
fn widen(expr: Expression, target: &Type) -> Expression {
    if expr.ty.same_as(target) {
        return expr;
    }
    let ty = Type::scalar(target.base);
    match expr.kind {
        ExprKind::Binary { op, left, right } if op.is_arithmetic() => Expression {
            line: expr.line,
            file: expr.file,
            kind: ExprKind::Binary {
                op,
                left: Box::new(widen(*left, &ty)),
                right: Box::new(widen(*right, &ty)),
            },
            ty,
        },
        kind => {
            let file = expr.file;
            Expression {
                line: expr.line,
                file: file.clone(),
                kind: ExprKind::Cast {
                    operand: Box::new(Expression {
                        line: expr.line,
                        file,
                        kind,
                        ty: expr.ty,
                    }),
                },
                ty,
            }
        }
    }
}

fn literal(tok: Token, ty: Type) -> Expression {
    Expression {
        kind: ExprKind::Literal { text: tok.text },
        ty,
        line: tok.line,
        file: tok.file,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse_ok(source: &str) -> Program {
        let stream = TokenStream::new(Lexer::from_source("test.c", source));
        Parser::new(stream, &CompilerConfig::default())
            .parse()
            .unwrap()
    }

    fn parse_err(source: &str) -> String {
        let stream = TokenStream::new(Lexer::from_source("test.c", source));
        match Parser::new(stream, &CompilerConfig::default()).parse() {
            Ok(_) => panic!("expected parse failure"),
            Err(e) => e,
        }
    }

    #[test]
    fn test_globals_and_function() {
        let program = parse_ok("int g;\nint main() { return 0; }\n");
        assert!(program.symbols.lookup_global("g").is_some());
        let main = program.symbols.lookup_function("main").unwrap();
        assert!(main.defined);
        assert_eq!(main.params.len(), 0);
    }

    #[test]
    fn test_parameter_and_local_slots() {
        let program = parse_ok("int f(int a, float b) { int c; float d; return a; }\n");
        let f = program.symbols.lookup_function("f").unwrap();
        let slots: Vec<(String, u16)> = f
            .locals
            .iter()
            .map(|v| (v.name.clone(), v.slot.unwrap()))
            .collect();
        assert_eq!(
            slots,
            vec![
                ("a".to_string(), 0),
                ("b".to_string(), 1),
                ("c".to_string(), 2),
                ("d".to_string(), 3)
            ]
        );
    }

    #[test]
    fn test_decl_records_in_source_order() {
        let program = parse_ok("int g;\nint f(int p) { int l; return p; }\n");
        let kinds: Vec<(DeclKind, String)> = program
            .records
            .iter()
            .map(|r| (r.kind, r.name.clone()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (DeclKind::GlobalVariable, "g".to_string()),
                (DeclKind::Function, "f".to_string()),
                (DeclKind::Parameter, "p".to_string()),
                (DeclKind::LocalVariable, "l".to_string())
            ]
        );
    }

    #[test]
    fn test_widening_distributes_into_arithmetic() {
        let program = parse_ok("int main() { float x; int y; x = y + 1; return 0; }\n");
        let main = program.symbols.lookup_function("main").unwrap();
        let body = match main.body.as_ref().unwrap() {
            Statement::Compound(stmts) => stmts,
            _ => panic!("compound body"),
        };
        let assign = body
            .iter()
            .find_map(|s| match s {
                Statement::Expr(e) => Some(e),
                _ => None,
            })
            .unwrap();
        assert_eq!(assign.ty.base, BaseType::Float);
        match &assign.kind {
            ExprKind::Assign { value, .. } => match &value.kind {
                // The sum itself is retyped float; each int operand is
                // wrapped in a widening cast.
                ExprKind::Binary { left, right, .. } => {
                    assert_eq!(value.ty.base, BaseType::Float);
                    assert!(matches!(left.kind, ExprKind::Cast { .. }));
                    assert_eq!(left.ty.base, BaseType::Float);
                    assert!(matches!(right.kind, ExprKind::Cast { .. }));
                    assert_eq!(right.ty.base, BaseType::Float);
                }
                other => panic!("expected widened sum, got {:?}", other),
            },
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_comparison_has_int_type() {
        let program = parse_ok("int main() { float a; int r; r = a < 2.0; return r; }\n");
        let main = program.symbols.lookup_function("main").unwrap();
        assert!(main.defined);
    }

    #[test]
    fn test_struct_definition_and_member_access() {
        let program = parse_ok(
            "struct pair { int a; int b; };\nint main() { struct pair p; p.a = 3; return p.a; }\n",
        );
        let pair = program.symbols.lookup_struct("pair").unwrap();
        assert_eq!(pair.members.len(), 2);
        let records: Vec<DeclKind> = program.records.iter().map(|r| r.kind).collect();
        assert_eq!(records[0], DeclKind::Struct);
        assert_eq!(records[1], DeclKind::Member);
    }

    #[test]
    fn test_string_literal_is_const_char_array() {
        let program = parse_ok("int main() { putstring(\"hi\\n\"); return 0; }\n");
        assert!(program.symbols.lookup_function("main").unwrap().defined);
    }

    #[test]
    fn test_assignment_to_const_rejected() {
        let err = parse_err("int main() { const int x = 1; x = 2; return 0; }\n");
        assert!(err.contains("Assignment to a const variable"), "{}", err);
    }

    #[test]
    fn test_prototype_mismatch_rejected() {
        let err = parse_err("int f(int);\nint f(float x) { return 0; }\n");
        assert!(err.contains("differs from previous declaration"), "{}", err);
    }

    #[test]
    fn test_break_outside_loop_rejected() {
        let err = parse_err("int main() { break; return 0; }\n");
        assert!(err.contains("break not inside a loop"), "{}", err);
    }

    #[test]
    fn test_call_to_undeclared_function_rejected() {
        let err = parse_err("int main() { return foo(); }\n");
        assert!(err.contains("Call to undeclared function foo"), "{}", err);
    }

    #[test]
    fn test_undeclared_variable_rejected() {
        let err = parse_err("int main() { return x; }\n");
        assert!(err.contains("Using undeclared variable x"), "{}", err);
    }

    #[test]
    fn test_implicit_narrowing_rejected() {
        let err = parse_err("int main() { char c; int i; c = i; return 0; }\n");
        assert!(err.contains("Type mismatch in assignment"), "{}", err);
    }

    #[test]
    fn test_explicit_narrowing_cast_accepted() {
        let program = parse_ok("int main() { char c; int i; c = (char)i; return 0; }\n");
        assert!(program.symbols.lookup_function("main").unwrap().defined);
    }

    #[test]
    fn test_rem_on_float_rejected() {
        let err = parse_err("int main() { float f; f = 1.0 % 2.0; return 0; }\n");
        assert!(err.contains("%"), "{}", err);
    }

    #[test]
    fn test_arity_mismatch_rejected() {
        let err = parse_err("int main() { putint(1, 2); return 0; }\n");
        assert!(err.contains("Wrong number of arguments"), "{}", err);
    }

    #[test]
    fn test_argument_widening_accepted() {
        let program = parse_ok("int main() { char c; putint(c); return 0; }\n");
        assert!(program.symbols.lookup_function("main").unwrap().defined);
    }

    #[test]
    fn test_duplicate_local_rejected() {
        let err = parse_err("int main() { int x; float x; return 0; }\n");
        assert!(err.contains("Duplicate declaration of variable x"), "{}", err);
    }

    #[test]
    fn test_redefinition_rejected() {
        let err = parse_err("int f() { return 1; }\nint f() { return 2; }\n");
        assert!(err.contains("Redefinition of function f"), "{}", err);
    }

    #[test]
    fn test_return_type_mismatch_rejected() {
        let err = parse_err("int main() { float f; return f; }\n");
        assert!(
            err.contains("Return type does not match function return type"),
            "{}",
            err
        );
    }

    #[test]
    fn test_index_of_non_array_rejected() {
        let err = parse_err("int main() { int x; return x[0]; }\n");
        assert!(err.contains("Attempt to index a non-array type"), "{}", err);
    }

    #[test]
    fn test_member_of_non_struct_rejected() {
        let err = parse_err("int main() { int x; return x.a; }\n");
        assert!(err.contains("Member selection on non-struct type"), "{}", err);
    }

    #[test]
    fn test_member_not_found_rejected() {
        let err = parse_err(
            "struct pair { int a; };\nint main() { struct pair p; return p.z; }\n",
        );
        assert!(err.contains("Member z not found in struct pair"), "{}", err);
    }

    #[test]
    fn test_unexpected_token_reports_line_and_text() {
        let err = parse_err("int main() { return 0 }\n");
        assert!(err.starts_with("Parser error in file test.c line 1"), "{}", err);
        assert!(err.contains("Expected ';'"), "{}", err);
    }

    #[test]
    fn test_nested_function_rejected() {
        let err = parse_err("int main() { int g() { return 1; } return 0; }\n");
        assert!(err.contains("Cannot nest functions"), "{}", err);
    }

    #[test]
    fn test_compound_assignment_desugars() {
        let program = parse_ok("int main() { int x; x = 1; x += 2; return x; }\n");
        let main = program.symbols.lookup_function("main").unwrap();
        let body = match main.body.as_ref().unwrap() {
            Statement::Compound(stmts) => stmts,
            _ => panic!("compound body"),
        };
        let compound = body
            .iter()
            .filter_map(|s| match s {
                Statement::Expr(e) => Some(e),
                _ => None,
            })
            .nth(1)
            .unwrap();
        match &compound.kind {
            ExprKind::Assign { value, .. } => {
                assert!(matches!(value.kind, ExprKind::Binary { .. }));
            }
            other => panic!("expected desugared assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_for_loop_with_break_and_continue() {
        let program = parse_ok(
            "int main() { int i; for (i = 0; i < 10; i = i + 1) { if (i == 5) break; continue; } return 0; }\n",
        );
        assert!(program.symbols.lookup_function("main").unwrap().defined);
    }

    #[test]
    fn test_ternary_unifies_branch_types() {
        let program = parse_ok("int main() { float f; int i; f = i ? 1 : 2.0; return 0; }\n");
        assert!(program.symbols.lookup_function("main").unwrap().defined);
    }

    #[test]
    fn test_prototype_without_parameter_name() {
        let program = parse_ok("int f(int);\nint f(int x) { return x; }\n");
        let f = program.symbols.lookup_function("f").unwrap();
        assert!(f.defined);
        assert_eq!(f.locals.len(), 1);
    }
}
