//! Expression lowering.
//!
//! Every `emit_expression` leaves exactly one value on the operand stack
//! (calls to void functions leave none; statement emission accounts for
//! that). The emitter trusts the types the parser computed; resolution
//! failures here are internal errors.

use super::state::{array_load_op, array_store_op, jvm_descriptor, method_descriptor, reg_prefix};
use super::{CodeGen, CodeGenError};
use crate::ast::{BinaryOp, ExprKind, Expression, UnaryOp};
use crate::symbols::VarSymbol;
use crate::types::{BaseType, Type};

impl CodeGen<'_> {
    pub(super) fn emit_expression(
        &mut self,
        locals: &[VarSymbol],
        expr: &Expression,
    ) -> Result<(), CodeGenError> {
        match &expr.kind {
            ExprKind::Literal { text } => self.emit_literal(text, &expr.ty),
            ExprKind::Identifier { name } => self.emit_load(locals, name),
            ExprKind::Binary { op, left, right } => {
                if *op == BinaryOp::And || *op == BinaryOp::Or {
                    self.emit_logical(locals, *op, left, right)
                } else if op.is_comparison() {
                    self.emit_expression(locals, left)?;
                    self.emit_expression(locals, right)?;
                    self.emit_comparison(*op, &left.ty)
                } else {
                    self.emit_expression(locals, left)?;
                    self.emit_expression(locals, right)?;
                    self.emit_arithmetic(*op, &expr.ty)
                }
            }
            ExprKind::Unary { op, operand } => self.emit_unary(locals, *op, operand, &expr.ty),
            ExprKind::Assign { target, value } => {
                self.emit_assignment(locals, target, value, true)
            }
            ExprKind::Cast { operand } => {
                self.emit_expression(locals, operand)?;
                self.emit_cast(&operand.ty, &expr.ty)
            }
            ExprKind::Call { name, args } => self.emit_call(locals, name, args),
            ExprKind::Index { array, index } => {
                self.emit_expression(locals, array)?;
                self.emit_expression(locals, index)?;
                let op = array_load_op(&expr.ty)?;
                self.emit(op)?;
                self.pop(1);
                Ok(())
            }
            ExprKind::Member { .. } => Err(CodeGenError::Logic(
                "struct member access is not supported in code generation".to_string(),
            )),
            ExprKind::Ternary {
                cond,
                then_value,
                else_value,
            } => {
                self.emit_expression(locals, cond)?;
                let l_else = self.fresh_label();
                let l_end = self.fresh_label();
                self.emit(&format!("ifeq {}", l_else))?;
                self.pop(1);
                self.emit_expression(locals, then_value)?;
                self.emit(&format!("goto {}", l_end))?;
                self.label(&l_else)?;
                // The arms converge to a single value.
                self.pop(1);
                self.emit_expression(locals, else_value)?;
                self.label(&l_end)?;
                Ok(())
            }
        }
    }

    fn emit_literal(&mut self, text: &str, ty: &Type) -> Result<(), CodeGenError> {
        if ty.is_array && ty.base == BaseType::Char {
            self.emit(&format!("ldc \"{}\"", text))?;
            self.push(1);
            self.emit(&format!(
                "invokestatic Method {} java2c (Ljava/lang/String;)[C",
                self.config.runtime_class
            ))?;
            return Ok(());
        }
        match ty.base {
            BaseType::Int => {
                let value = int_value(text)?;
                self.emit_int_const(value)
            }
            BaseType::Char => {
                let value = char_value(text)?;
                self.emit(&format!("bipush {}", value))?;
                self.push(1);
                Ok(())
            }
            BaseType::Float => {
                self.emit(&format!("ldc {}", text))?;
                self.push(1);
                Ok(())
            }
            _ => Err(CodeGenError::Logic(format!(
                "Unsupported literal {} in code generation",
                text
            ))),
        }
    }

    pub(super) fn emit_int_const(&mut self, value: i32) -> Result<(), CodeGenError> {
        if value == -1 {
            self.emit("iconst_m1")?;
        } else if (0..=5).contains(&value) {
            self.emit(&format!("iconst_{}", value))?;
        } else if (-128..=127).contains(&value) {
            self.emit(&format!("bipush {}", value))?;
        } else {
            self.emit(&format!("ldc {}", value))?;
        }
        self.push(1);
        Ok(())
    }

    fn emit_load(&mut self, locals: &[VarSymbol], name: &str) -> Result<(), CodeGenError> {
        let var = self.resolve_var(locals, name)?;
        let ty = var.ty.clone();
        let var_name = var.name.clone();
        let slot = var.slot;
        if var.is_global {
            self.emit(&format!(
                "getstatic Field {} {} {}",
                self.class_name,
                var_name,
                jvm_descriptor(&ty)
            ))?;
        } else {
            let slot = slot.ok_or_else(|| {
                CodeGenError::Logic(format!("Local {} has no slot at code generation", var_name))
            })?;
            self.emit(&format!("{}load {} ; {}", reg_prefix(&ty), slot, var_name))?;
        }
        self.push(1);
        Ok(())
    }

    fn emit_arithmetic(&mut self, op: BinaryOp, ty: &Type) -> Result<(), CodeGenError> {
        let opcode = match (ty.base, op) {
            (BaseType::Float, BinaryOp::Add) => "fadd",
            (BaseType::Float, BinaryOp::Sub) => "fsub",
            (BaseType::Float, BinaryOp::Mul) => "fmul",
            (BaseType::Float, BinaryOp::Div) => "fdiv",
            (_, BinaryOp::Add) => "iadd",
            (_, BinaryOp::Sub) => "isub",
            (_, BinaryOp::Mul) => "imul",
            (_, BinaryOp::Div) => "idiv",
            (_, BinaryOp::Rem) => "irem",
            _ => {
                return Err(CodeGenError::Logic(
                    "Unsupported binary operator in code generation".to_string(),
                ));
            }
        };
        self.emit(opcode)?;
        self.pop(1);
        Ok(())
    }

    /// Comparison skeleton: branch to a label that pushes 1, fall through
    /// to push 0, converge. Consumes the two operands, leaves one int.
    fn emit_comparison(&mut self, op: BinaryOp, operand_ty: &Type) -> Result<(), CodeGenError> {
        let l_true = self.fresh_label();
        let l_end = self.fresh_label();
        if operand_ty.base == BaseType::Float {
            self.emit("fcmpl")?;
            self.pop(2);
            self.push(1);
            let branch = match op {
                BinaryOp::Eq => "ifeq",
                BinaryOp::Ne => "ifne",
                BinaryOp::Lt => "iflt",
                BinaryOp::Le => "ifle",
                BinaryOp::Gt => "ifgt",
                BinaryOp::Ge => "ifge",
                _ => unreachable!("comparison operator"),
            };
            self.emit(&format!("{} {}", branch, l_true))?;
            self.pop(1);
        } else {
            let branch = match op {
                BinaryOp::Eq => "if_icmpeq",
                BinaryOp::Ne => "if_icmpne",
                BinaryOp::Lt => "if_icmplt",
                BinaryOp::Le => "if_icmple",
                BinaryOp::Gt => "if_icmpgt",
                BinaryOp::Ge => "if_icmpge",
                _ => unreachable!("comparison operator"),
            };
            self.emit(&format!("{} {}", branch, l_true))?;
            self.pop(2);
        }
        self.emit("iconst_0")?;
        self.push(1);
        self.emit(&format!("goto {}", l_end))?;
        self.label(&l_true)?;
        // Both arms push the result once.
        self.pop(1);
        self.emit("iconst_1")?;
        self.push(1);
        self.label(&l_end)?;
        Ok(())
    }

    /// Short-circuit `&&` / `||`: evaluate the left operand, duplicate it,
    /// branch on it to a constant-result label, otherwise discard it and
    /// evaluate the right operand.
    fn emit_logical(
        &mut self,
        locals: &[VarSymbol],
        op: BinaryOp,
        left: &Expression,
        right: &Expression,
    ) -> Result<(), CodeGenError> {
        let l_short = self.fresh_label();
        let l_end = self.fresh_label();
        self.emit_expression(locals, left)?;
        self.emit("dup")?;
        self.push(1);
        let branch = if op == BinaryOp::And { "ifeq" } else { "ifne" };
        self.emit(&format!("{} {}", branch, l_short))?;
        self.pop(1);
        self.emit("pop")?;
        self.pop(1);
        self.emit_expression(locals, right)?;
        self.emit(&format!("goto {}", l_end))?;
        self.label(&l_short)?;
        self.emit("pop")?;
        self.pop(1);
        let constant = if op == BinaryOp::And {
            "iconst_0"
        } else {
            "iconst_1"
        };
        self.emit(constant)?;
        self.push(1);
        self.label(&l_end)?;
        Ok(())
    }

    /// Assignment lowering. With `want_value` the assigned value is left
    /// on the stack (`dup` before the store, or an element reload for
    /// array targets); statement roots pass `false` and leave nothing.
    pub(super) fn emit_assignment(
        &mut self,
        locals: &[VarSymbol],
        target: &Expression,
        value: &Expression,
        want_value: bool,
    ) -> Result<(), CodeGenError> {
        match &target.kind {
            ExprKind::Identifier { name } => {
                let var = self.resolve_var(locals, name)?;
                let ty = var.ty.clone();
                let var_name = var.name.clone();
                let slot = var.slot;
                let is_global = var.is_global;
                self.emit_expression(locals, value)?;
                if want_value {
                    self.emit("dup")?;
                    self.push(1);
                }
                if is_global {
                    self.emit(&format!(
                        "putstatic Field {} {} {}",
                        self.class_name,
                        var_name,
                        jvm_descriptor(&ty)
                    ))?;
                } else {
                    let slot = slot.ok_or_else(|| {
                        CodeGenError::Logic(format!(
                            "Local {} has no slot at code generation",
                            var_name
                        ))
                    })?;
                    self.emit(&format!(
                        "{}store {} ; {}",
                        reg_prefix(&ty),
                        slot,
                        var_name
                    ))?;
                }
                self.pop(1);
                Ok(())
            }
            ExprKind::Index { array, index } => {
                self.emit_expression(locals, array)?;
                self.emit_expression(locals, index)?;
                self.emit_expression(locals, value)?;
                let op = array_store_op(&target.ty)?;
                self.emit(op)?;
                self.pop(3);
                if want_value {
                    self.emit_expression(locals, array)?;
                    self.emit_expression(locals, index)?;
                    let load = array_load_op(&target.ty)?;
                    self.emit(load)?;
                    self.pop(1);
                }
                Ok(())
            }
            ExprKind::Member { .. } => Err(CodeGenError::Logic(
                "struct member access is not supported in code generation".to_string(),
            )),
            _ => Err(CodeGenError::Logic(
                "Unsupported assignment target in code generation".to_string(),
            )),
        }
    }

    fn emit_unary(
        &mut self,
        locals: &[VarSymbol],
        op: UnaryOp,
        operand: &Expression,
        result_ty: &Type,
    ) -> Result<(), CodeGenError> {
        match op {
            UnaryOp::Neg => {
                self.emit_expression(locals, operand)?;
                if result_ty.base == BaseType::Float {
                    self.emit("fneg")?;
                } else {
                    self.emit("ineg")?;
                }
                Ok(())
            }
            UnaryOp::BitNot => {
                self.emit_expression(locals, operand)?;
                self.emit("iconst_m1")?;
                self.push(1);
                self.emit("ixor")?;
                self.pop(1);
                Ok(())
            }
            UnaryOp::Not => {
                self.emit_expression(locals, operand)?;
                let l_true = self.fresh_label();
                let l_end = self.fresh_label();
                self.emit(&format!("ifeq {}", l_true))?;
                self.pop(1);
                self.emit("iconst_0")?;
                self.push(1);
                self.emit(&format!("goto {}", l_end))?;
                self.label(&l_true)?;
                self.pop(1);
                self.emit("iconst_1")?;
                self.push(1);
                self.label(&l_end)?;
                Ok(())
            }
            UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec => {
                self.emit_incdec(locals, op, operand)
            }
        }
    }

    fn emit_incdec(
        &mut self,
        locals: &[VarSymbol],
        op: UnaryOp,
        operand: &Expression,
    ) -> Result<(), CodeGenError> {
        let name = match &operand.kind {
            ExprKind::Identifier { name } => name,
            _ => {
                return Err(CodeGenError::Logic(
                    "increment of array elements or members is not supported in code generation"
                        .to_string(),
                ));
            }
        };
        let var = self.resolve_var(locals, name)?;
        let ty = var.ty.clone();
        let var_name = var.name.clone();
        let slot = var.slot;
        let is_global = var.is_global;
        let increment = matches!(op, UnaryOp::PreInc | UnaryOp::PostInc);
        let prefix_form = matches!(op, UnaryOp::PreInc | UnaryOp::PreDec);

        if is_global {
            let field = format!(
                "Field {} {} {}",
                self.class_name,
                var_name,
                jvm_descriptor(&ty)
            );
            let (one, apply) = if ty.base == BaseType::Float {
                ("fconst_1", if increment { "fadd" } else { "fsub" })
            } else {
                ("iconst_1", if increment { "iadd" } else { "isub" })
            };
            if !prefix_form {
                // Old value stays beneath the update.
                self.emit(&format!("getstatic {}", field))?;
                self.push(1);
            }
            self.emit(&format!("getstatic {}", field))?;
            self.push(1);
            self.emit(one)?;
            self.push(1);
            self.emit(apply)?;
            self.pop(1);
            self.emit(&format!("putstatic {}", field))?;
            self.pop(1);
            if prefix_form {
                self.emit(&format!("getstatic {}", field))?;
                self.push(1);
            }
            return Ok(());
        }

        let slot = slot.ok_or_else(|| {
            CodeGenError::Logic(format!("Local {} has no slot at code generation", var_name))
        })?;
        if ty.base == BaseType::Float {
            let apply = if increment { "fadd" } else { "fsub" };
            self.emit(&format!("fload {} ; {}", slot, var_name))?;
            self.push(1);
            if prefix_form {
                self.emit("fconst_1")?;
                self.push(1);
                self.emit(apply)?;
                self.pop(1);
                self.emit("dup")?;
                self.push(1);
                self.emit(&format!("fstore {} ; {}", slot, var_name))?;
                self.pop(1);
            } else {
                self.emit("dup")?;
                self.push(1);
                self.emit("fconst_1")?;
                self.push(1);
                self.emit(apply)?;
                self.pop(1);
                self.emit(&format!("fstore {} ; {}", slot, var_name))?;
                self.pop(1);
            }
            return Ok(());
        }

        let amount = if increment { 1 } else { -1 };
        if prefix_form {
            self.emit(&format!("iinc {} {} ; {}", slot, amount, var_name))?;
            self.emit(&format!("iload {} ; {}", slot, var_name))?;
            self.push(1);
        } else {
            self.emit(&format!("iload {} ; {}", slot, var_name))?;
            self.push(1);
            self.emit(&format!("iinc {} {} ; {}", slot, amount, var_name))?;
        }
        Ok(())
    }

    fn emit_cast(&mut self, from: &Type, to: &Type) -> Result<(), CodeGenError> {
        match (from.base, to.base) {
            (BaseType::Int, BaseType::Float) | (BaseType::Char, BaseType::Float) => {
                self.emit("i2f")?;
            }
            (BaseType::Int, BaseType::Char) => {
                self.emit("i2c")?;
            }
            (BaseType::Float, BaseType::Int) => {
                self.emit("f2i")?;
            }
            (BaseType::Float, BaseType::Char) => {
                self.emit("f2i")?;
                self.emit("i2c")?;
            }
            // char -> int and identity casts are no-ops on the stack.
            _ => {}
        }
        Ok(())
    }

    fn emit_call(
        &mut self,
        locals: &[VarSymbol],
        name: &str,
        args: &[Expression],
    ) -> Result<(), CodeGenError> {
        let callee = self.symbols.lookup_function(name).ok_or_else(|| {
            CodeGenError::Logic(format!("Undeclared function {} at code generation", name))
        })?;
        let descriptor = method_descriptor(&callee.params, &callee.return_type);
        let returns_value = callee.return_type.base != BaseType::Void;
        let class = if callee.builtin {
            self.config.runtime_class.clone()
        } else {
            self.class_name.clone()
        };
        for arg in args {
            self.emit_expression(locals, arg)?;
        }
        self.emit(&format!(
            "invokestatic Method {} {} {}",
            class, name, descriptor
        ))?;
        self.pop(args.len() as i32);
        if returns_value {
            self.push(1);
        }
        Ok(())
    }

    pub(super) fn resolve_var<'s>(
        &'s self,
        locals: &'s [VarSymbol],
        name: &str,
    ) -> Result<&'s VarSymbol, CodeGenError> {
        self.symbols.lookup_variable(locals, name).ok_or_else(|| {
            CodeGenError::Logic(format!("Undeclared variable {} at code generation", name))
        })
    }
}

fn int_value(text: &str) -> Result<i32, CodeGenError> {
    let parsed = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16)
    } else {
        text.parse::<i64>()
    };
    parsed
        .map(|v| v as i32)
        .map_err(|_| CodeGenError::Logic(format!("Integer literal {} out of range", text)))
}

/// ASCII value of a char-literal lexeme, decoding the escape forms the
/// lexer accepts.
fn char_value(text: &str) -> Result<i32, CodeGenError> {
    let mut chars = text.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some('\\'), Some(escape), None) => match escape {
            'a' => Ok(7),
            'b' => Ok(8),
            'n' => Ok(10),
            'r' => Ok(13),
            '\\' => Ok(92),
            '\'' => Ok(39),
            _ => Err(CodeGenError::Logic(format!(
                "Invalid escape in char literal '{}'",
                text
            ))),
        },
        (Some(c), None, None) => Ok(c as i32),
        _ => Err(CodeGenError::Logic(format!(
            "Malformed char literal '{}'",
            text
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_value_decimal_and_hex() {
        assert_eq!(int_value("42").unwrap(), 42);
        assert_eq!(int_value("0x1F").unwrap(), 31);
        assert_eq!(int_value("0XfF").unwrap(), 255);
        assert!(int_value("banana").is_err());
    }

    #[test]
    fn test_char_value_plain_and_escaped() {
        assert_eq!(char_value("a").unwrap(), 97);
        assert_eq!(char_value("\\n").unwrap(), 10);
        assert_eq!(char_value("\\\\").unwrap(), 92);
        assert_eq!(char_value("\\'").unwrap(), 39);
        assert!(char_value("ab").is_err());
    }
}
