//! Statement lowering.

use super::state::reg_prefix;
use super::{CodeGen, CodeGenError};
use crate::ast::{ExprKind, Expression, Statement};
use crate::symbols::Function;
use crate::types::BaseType;

impl CodeGen<'_> {
    pub(super) fn emit_statement(
        &mut self,
        func: &Function,
        stmt: &Statement,
    ) -> Result<(), CodeGenError> {
        match stmt {
            Statement::Empty => Ok(()),
            Statement::Compound(stmts) => self.emit_block(func, stmts),
            Statement::Expr(expr) => {
                self.emit(&format!(
                    "; expression statement at {} line {}",
                    expr.file, expr.line
                ))?;
                self.emit_expression_statement(func, expr)
            }
            Statement::Decl(decl) => {
                let init = match &decl.init {
                    Some(init) => init,
                    None => return Ok(()),
                };
                self.emit(&format!(
                    "; declaration initialization at {} line {}",
                    self.source_file, decl.line
                ))?;
                self.emit_expression(&func.locals, init)?;
                let var = self.resolve_var(&func.locals, &decl.name)?;
                let slot = var.slot.ok_or_else(|| {
                    CodeGenError::Logic(format!(
                        "Local {} has no slot at code generation",
                        decl.name
                    ))
                })?;
                let prefix = reg_prefix(&var.ty);
                self.emit(&format!("{}store {} ; {}", prefix, slot, decl.name))?;
                self.pop(1);
                Ok(())
            }
            Statement::Return { value, line } => {
                self.emit(&format!(
                    "; return statement at {} line {}",
                    self.source_file, line
                ))?;
                match value {
                    Some(value) => {
                        self.emit_expression(&func.locals, value)?;
                        self.emit(&format!("{}return", reg_prefix(&value.ty)))?;
                        self.pop(1);
                    }
                    None => {
                        self.emit("return")?;
                    }
                }
                Ok(())
            }
            Statement::If {
                cond,
                then_branch,
                else_branch,
            } => self.emit_if(func, cond, then_branch, else_branch.as_deref()),
            Statement::While { cond, body } => self.emit_while(func, cond, body),
            Statement::DoWhile { body, cond } => self.emit_do_while(func, body, cond),
            Statement::For {
                init,
                cond,
                update,
                body,
            } => self.emit_for(func, init.as_ref(), cond.as_ref(), update.as_ref(), body),
            Statement::Break { .. } => self.emit_break(),
            Statement::Continue { .. } => self.emit_continue(),
        }
    }

    /// Statements after a return in the same block are dead and skipped.
    pub(super) fn emit_block(
        &mut self,
        func: &Function,
        stmts: &[Statement],
    ) -> Result<(), CodeGenError> {
        for stmt in stmts {
            self.emit_statement(func, stmt)?;
            if matches!(stmt, Statement::Return { .. }) {
                break;
            }
        }
        Ok(())
    }

    /// An expression in statement position. A bare assignment stores
    /// without materializing its value; any other non-void expression is
    /// popped.
    pub(super) fn emit_expression_statement(
        &mut self,
        func: &Function,
        expr: &Expression,
    ) -> Result<(), CodeGenError> {
        if let ExprKind::Assign { target, value } = &expr.kind {
            return self.emit_assignment(&func.locals, target, value, false);
        }
        self.emit_expression(&func.locals, expr)?;
        if expr.ty.base != BaseType::Void {
            self.emit("pop")?;
            self.pop(1);
        }
        Ok(())
    }
}
