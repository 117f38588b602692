//! Control-flow lowering: if, the three loop forms, break and continue.
//!
//! Loops push a pair of labels for the enclosing `break`/`continue`
//! targets: `break` always leaves through the loop's end label, while
//! `continue` re-tests the condition (`while`, `do`) or runs the update
//! step first (`for`).

use super::state::LoopLabels;
use super::{CodeGen, CodeGenError};
use crate::ast::{Expression, Statement};
use crate::symbols::Function;

impl CodeGen<'_> {
    pub(super) fn emit_if(
        &mut self,
        func: &Function,
        cond: &Expression,
        then_branch: &Statement,
        else_branch: Option<&Statement>,
    ) -> Result<(), CodeGenError> {
        self.emit_expression(&func.locals, cond)?;
        let l_else = self.fresh_label();
        self.emit(&format!("ifeq {}", l_else))?;
        self.pop(1);
        self.emit_statement(func, then_branch)?;
        match else_branch {
            Some(else_branch) => {
                let l_end = self.fresh_label();
                self.emit(&format!("goto {}", l_end))?;
                self.label(&l_else)?;
                self.emit_statement(func, else_branch)?;
                self.label(&l_end)?;
            }
            None => {
                self.label(&l_else)?;
            }
        }
        Ok(())
    }

    pub(super) fn emit_while(
        &mut self,
        func: &Function,
        cond: &Expression,
        body: &Statement,
    ) -> Result<(), CodeGenError> {
        let l_top = self.fresh_label();
        let l_end = self.fresh_label();
        self.label(&l_top)?;
        self.emit_expression(&func.locals, cond)?;
        self.emit(&format!("ifeq {}", l_end))?;
        self.pop(1);
        self.loop_labels.push(LoopLabels {
            continue_label: l_top.clone(),
            break_label: l_end.clone(),
        });
        self.emit_statement(func, body)?;
        self.loop_labels.pop();
        self.emit(&format!("goto {}", l_top))?;
        self.label(&l_end)?;
        Ok(())
    }

    pub(super) fn emit_do_while(
        &mut self,
        func: &Function,
        body: &Statement,
        cond: &Expression,
    ) -> Result<(), CodeGenError> {
        let l_top = self.fresh_label();
        let l_cond = self.fresh_label();
        let l_end = self.fresh_label();
        self.label(&l_top)?;
        self.loop_labels.push(LoopLabels {
            continue_label: l_cond.clone(),
            break_label: l_end.clone(),
        });
        self.emit_statement(func, body)?;
        self.loop_labels.pop();
        self.label(&l_cond)?;
        self.emit_expression(&func.locals, cond)?;
        self.emit(&format!("ifne {}", l_top))?;
        self.pop(1);
        self.label(&l_end)?;
        Ok(())
    }

    pub(super) fn emit_for(
        &mut self,
        func: &Function,
        init: Option<&Expression>,
        cond: Option<&Expression>,
        update: Option<&Expression>,
        body: &Statement,
    ) -> Result<(), CodeGenError> {
        if let Some(init) = init {
            self.emit_expression_statement(func, init)?;
        }
        let l_body = self.fresh_label();
        let l_update = self.fresh_label();
        let l_cond = self.fresh_label();
        let l_end = self.fresh_label();
        self.emit(&format!("goto {}", l_cond))?;
        self.label(&l_body)?;
        self.loop_labels.push(LoopLabels {
            continue_label: l_update.clone(),
            break_label: l_end.clone(),
        });
        self.emit_statement(func, body)?;
        self.loop_labels.pop();
        self.label(&l_update)?;
        if let Some(update) = update {
            self.emit_expression_statement(func, update)?;
        }
        self.label(&l_cond)?;
        match cond {
            Some(cond) => {
                self.emit_expression(&func.locals, cond)?;
                self.emit(&format!("ifne {}", l_body))?;
                self.pop(1);
            }
            None => {
                self.emit(&format!("goto {}", l_body))?;
            }
        }
        self.label(&l_end)?;
        Ok(())
    }

    pub(super) fn emit_break(&mut self) -> Result<(), CodeGenError> {
        let target = self
            .loop_labels
            .last()
            .ok_or_else(|| CodeGenError::Logic("break outside of a loop".to_string()))?
            .break_label
            .clone();
        self.emit(&format!("goto {}", target))
    }

    pub(super) fn emit_continue(&mut self) -> Result<(), CodeGenError> {
        let target = self
            .loop_labels
            .last()
            .ok_or_else(|| CodeGenError::Logic("continue outside of a loop".to_string()))?
            .continue_label
            .clone();
        self.emit(&format!("goto {}", target))
    }
}
