//! Type listing pass.
//!
//! A read-only walk over the parsed program that reports the computed type
//! of every expression node, one line per node in post-order, statement by
//! statement in source order. The parser has already typed every node, so
//! this pass only formats; it is deterministic and byte-identical across
//! runs for the same input.

use crate::ast::{ExprKind, Expression, Item, Program, Statement};
use std::fmt::Write as _;

/// Render the `-3` listing for a parsed program.
pub fn type_listing(program: &Program) -> String {
    let mut out = String::new();
    for item in &program.items {
        match item {
            Item::Global(decl) => {
                if let Some(init) = &decl.init {
                    walk_expression(init, &mut out);
                }
            }
            Item::Function(name) => {
                if let Some(func) = program.symbols.lookup_function(name) {
                    if let Some(body) = &func.body {
                        walk_statement(body, &mut out);
                    }
                }
            }
        }
    }
    out
}

fn walk_statement(stmt: &Statement, out: &mut String) {
    match stmt {
        Statement::Empty | Statement::Break { .. } | Statement::Continue { .. } => {}
        Statement::Decl(decl) => {
            if let Some(init) = &decl.init {
                walk_expression(init, out);
            }
        }
        Statement::Expr(expr) => walk_expression(expr, out),
        Statement::Return { value, .. } => {
            if let Some(value) = value {
                walk_expression(value, out);
            }
        }
        Statement::Compound(stmts) => {
            for s in stmts {
                walk_statement(s, out);
            }
        }
        Statement::If {
            cond,
            then_branch,
            else_branch,
        } => {
            walk_expression(cond, out);
            walk_statement(then_branch, out);
            if let Some(e) = else_branch {
                walk_statement(e, out);
            }
        }
        Statement::While { cond, body } => {
            walk_expression(cond, out);
            walk_statement(body, out);
        }
        Statement::DoWhile { body, cond } => {
            walk_statement(body, out);
            walk_expression(cond, out);
        }
        Statement::For {
            init,
            cond,
            update,
            body,
        } => {
            if let Some(e) = init {
                walk_expression(e, out);
            }
            if let Some(e) = cond {
                walk_expression(e, out);
            }
            if let Some(e) = update {
                walk_expression(e, out);
            }
            walk_statement(body, out);
        }
    }
}

/// Children first, then the node itself.
fn walk_expression(expr: &Expression, out: &mut String) {
    match &expr.kind {
        ExprKind::Literal { .. } | ExprKind::Identifier { .. } => {}
        ExprKind::Binary { left, right, .. } => {
            walk_expression(left, out);
            walk_expression(right, out);
        }
        ExprKind::Unary { operand, .. } | ExprKind::Cast { operand } => {
            walk_expression(operand, out);
        }
        ExprKind::Assign { target, value } => {
            walk_expression(target, out);
            walk_expression(value, out);
        }
        ExprKind::Call { args, .. } => {
            for arg in args {
                walk_expression(arg, out);
            }
        }
        ExprKind::Index { array, index } => {
            walk_expression(array, out);
            walk_expression(index, out);
        }
        ExprKind::Member { object, .. } => walk_expression(object, out),
        ExprKind::Ternary {
            cond,
            then_value,
            else_value,
        } => {
            walk_expression(cond, out);
            walk_expression(then_value, out);
            walk_expression(else_value, out);
        }
    }
    let _ = writeln!(
        out,
        "File {} Line {}: expression has type {}",
        expr.file, expr.line, expr.ty
    );
}
