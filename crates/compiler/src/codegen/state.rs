//! CodeGen state and shared helpers.
//!
//! The emitter writes Krakatau-style assembly text into a `String`.
//! Instructions are indented four spaces, directives and labels start in
//! column 1. A virtual operand stack depth is tracked through the
//! `push`/`pop` helpers; the recorded maximum becomes the method's
//! `.code stack` directive, floored at 2.

use super::error::CodeGenError;
use crate::config::CompilerConfig;
use crate::symbols::{Param, SymbolTable};
use crate::types::{BaseType, Type};
use std::fmt::Write as _;

/// Minimum `.code stack` value emitted for any method.
pub(super) const MIN_METHOD_STACK: i32 = 2;

/// Labels of the innermost enclosing loop, for `break` and `continue`.
pub(super) struct LoopLabels {
    pub continue_label: String,
    pub break_label: String,
}

pub struct CodeGen<'a> {
    pub(super) symbols: &'a SymbolTable,
    pub(super) config: &'a CompilerConfig,
    /// Emitted class name: input file name minus its extension.
    pub(super) class_name: String,
    /// Input file name, used in emitted comment lines.
    pub(super) source_file: String,
    pub(super) output: String,
    pub(super) label_counter: usize,
    /// Current virtual operand stack depth of the method being emitted.
    pub(super) cur_stack: i32,
    /// Maximum observed depth of the method being emitted.
    pub(super) max_stack: i32,
    pub(super) loop_labels: Vec<LoopLabels>,
}

impl<'a> CodeGen<'a> {
    pub fn new(
        symbols: &'a SymbolTable,
        config: &'a CompilerConfig,
        class_name: impl Into<String>,
        source_file: impl Into<String>,
    ) -> Self {
        CodeGen {
            symbols,
            config,
            class_name: class_name.into(),
            source_file: source_file.into(),
            output: String::new(),
            label_counter: 0,
            cur_stack: 0,
            max_stack: 0,
            loop_labels: Vec::new(),
        }
    }

    /// Allocate a fresh label from the monotone counter.
    pub(super) fn fresh_label(&mut self) -> String {
        let name = format!("L{}", self.label_counter);
        self.label_counter += 1;
        name
    }

    pub(super) fn push(&mut self, n: i32) {
        self.cur_stack += n;
        if self.cur_stack > self.max_stack {
            self.max_stack = self.cur_stack;
        }
    }

    pub(super) fn pop(&mut self, n: i32) {
        self.cur_stack -= n;
    }

    /// One instruction or comment line, indented four spaces.
    pub(super) fn emit(&mut self, line: &str) -> Result<(), CodeGenError> {
        writeln!(self.output, "    {}", line)?;
        Ok(())
    }

    /// A directive line in column 1.
    pub(super) fn directive(&mut self, line: &str) -> Result<(), CodeGenError> {
        writeln!(self.output, "{}", line)?;
        Ok(())
    }

    pub(super) fn label(&mut self, name: &str) -> Result<(), CodeGenError> {
        writeln!(self.output, "{}:", name)?;
        Ok(())
    }

    pub(super) fn stack_limit(&self) -> i32 {
        self.max_stack.max(MIN_METHOD_STACK)
    }
}

/// JVM descriptor for a source type.
pub(super) fn jvm_descriptor(ty: &Type) -> String {
    let base = match ty.base {
        BaseType::Int => "I",
        BaseType::Char => "C",
        BaseType::Float => "F",
        BaseType::Void => "V",
        BaseType::Struct => "Ljava/lang/Object;",
    };
    if ty.is_array {
        format!("[{}", base)
    } else {
        base.to_string()
    }
}

/// `(<paramTypes>)<retType>` method descriptor.
pub(super) fn method_descriptor(params: &[Param], return_type: &Type) -> String {
    let mut s = String::from("(");
    for param in params {
        s.push_str(&jvm_descriptor(&param.ty));
    }
    s.push(')');
    s.push_str(&jvm_descriptor(return_type));
    s
}

/// Load/store mnemonic prefix for a type: `a` for references, `f` for
/// float, `i` otherwise.
pub(super) fn reg_prefix(ty: &Type) -> &'static str {
    if ty.is_array || ty.base == BaseType::Struct {
        "a"
    } else if ty.base == BaseType::Float {
        "f"
    } else {
        "i"
    }
}

/// Array load opcode for an element type.
pub(super) fn array_load_op(element: &Type) -> Result<&'static str, CodeGenError> {
    match element.base {
        BaseType::Int => Ok("iaload"),
        BaseType::Char => Ok("caload"),
        BaseType::Float => Ok("faload"),
        BaseType::Struct => Ok("aaload"),
        BaseType::Void => Err(CodeGenError::Logic(
            "Array of void in code generation".to_string(),
        )),
    }
}

/// Array store opcode for an element type.
pub(super) fn array_store_op(element: &Type) -> Result<&'static str, CodeGenError> {
    match element.base {
        BaseType::Int => Ok("iastore"),
        BaseType::Char => Ok("castore"),
        BaseType::Float => Ok("fastore"),
        BaseType::Struct => Ok("aastore"),
        BaseType::Void => Err(CodeGenError::Logic(
            "Array of void in code generation".to_string(),
        )),
    }
}
