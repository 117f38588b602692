//! Whole-program emission: class header, static fields, user methods, the
//! synthetic `main` wrapper, the default constructor, and `<clinit>`.

use super::state::{jvm_descriptor, method_descriptor};
use super::{CodeGen, CodeGenError};
use crate::ast::{Item, Program};
use crate::symbols::Function;
use crate::types::BaseType;
use std::fmt::Write as _;

impl CodeGen<'_> {
    /// Generate the full `.j` text for a parsed program.
    pub fn generate(&mut self, program: &Program) -> Result<String, CodeGenError> {
        match self.symbols.lookup_function("main") {
            Some(main) if main.defined && !main.builtin => {
                // The synthetic wrapper calls `main ()I`.
                if !main.params.is_empty() || main.return_type.base != BaseType::Int {
                    return Err(CodeGenError::Logic(
                        "main must be declared as int main()".to_string(),
                    ));
                }
            }
            _ => {
                return Err(CodeGenError::Logic("No main function defined".to_string()));
            }
        }

        self.directive(&format!(".class public {}", self.class_name.clone()))?;
        self.directive(".super java/lang/Object")?;
        writeln!(self.output)?;

        let symbols = self.symbols;
        for global in &symbols.globals {
            writeln!(
                self.output,
                ".field public static {} {}",
                global.name,
                jvm_descriptor(&global.ty)
            )?;
        }
        if !symbols.globals.is_empty() {
            writeln!(self.output)?;
        }

        for item in &program.items {
            if let Item::Function(name) = item {
                let func = symbols.lookup_function(name).ok_or_else(|| {
                    CodeGenError::Logic(format!("Undeclared function {} at code generation", name))
                })?;
                if func.defined && !func.builtin {
                    self.emit_function(func)?;
                }
            }
        }

        self.emit_main_wrapper()?;
        self.emit_default_constructor()?;
        if program.has_global_initializers() {
            self.emit_clinit(program)?;
        }

        Ok(std::mem::take(&mut self.output))
    }

    fn emit_function(&mut self, func: &Function) -> Result<(), CodeGenError> {
        self.cur_stack = 0;
        self.max_stack = 0;
        self.loop_labels.clear();

        // The body is emitted into a side buffer first; the stack limit is
        // only known afterwards.
        let saved = std::mem::take(&mut self.output);
        if let Some(body) = &func.body {
            self.emit_statement(func, body)?;
        }
        if func.return_type.base == BaseType::Void {
            self.emit("return")?;
        }
        let body_text = std::mem::replace(&mut self.output, saved);

        let descriptor = method_descriptor(&func.params, &func.return_type);
        self.directive(&format!(
            ".method public static {} : {}",
            func.name, descriptor
        ))?;
        self.directive(&format!(
            ".code stack {} locals {}",
            self.stack_limit(),
            func.locals.len()
        ))?;
        self.output.push_str(&body_text);
        self.directive(".end code")?;
        self.directive(".end method")?;
        writeln!(self.output)?;
        Ok(())
    }

    /// JVM entry point: calls the user's `main ()I` and exits with its
    /// result.
    fn emit_main_wrapper(&mut self) -> Result<(), CodeGenError> {
        self.directive(".method public static main : ([Ljava/lang/String;)V")?;
        self.directive(".code stack 1 locals 1")?;
        self.emit(&format!(
            "invokestatic Method {} main ()I",
            self.class_name.clone()
        ))?;
        self.emit("invokestatic Method java/lang/System exit (I)V")?;
        self.emit("return")?;
        self.directive(".end code")?;
        self.directive(".end method")?;
        writeln!(self.output)?;
        Ok(())
    }

    fn emit_default_constructor(&mut self) -> Result<(), CodeGenError> {
        self.directive(".method <init> : ()V")?;
        self.directive(".code stack 1 locals 1")?;
        self.emit("aload_0")?;
        self.emit("invokespecial Method java/lang/Object <init> ()V")?;
        self.emit("return")?;
        self.directive(".end code")?;
        self.directive(".end method")?;
        writeln!(self.output)?;
        Ok(())
    }

    /// Emitted only when at least one global carries an initializer; the
    /// initializers run here in declaration order.
    fn emit_clinit(&mut self, program: &Program) -> Result<(), CodeGenError> {
        self.cur_stack = 0;
        self.max_stack = 0;

        let saved = std::mem::take(&mut self.output);
        for item in &program.items {
            if let Item::Global(decl) = item {
                let init = match &decl.init {
                    Some(init) => init,
                    None => continue,
                };
                self.emit(&format!(
                    "; global initialization at {} line {}",
                    self.source_file, decl.line
                ))?;
                self.emit_expression(&[], init)?;
                self.emit(&format!(
                    "putstatic Field {} {} {}",
                    self.class_name,
                    decl.name,
                    jvm_descriptor(&decl.ty)
                ))?;
                self.pop(1);
            }
        }
        self.emit("return")?;
        let body_text = std::mem::replace(&mut self.output, saved);

        self.directive(".method <clinit> : ()V")?;
        self.directive(&format!(".code stack {} locals 0", self.stack_limit()))?;
        self.output.push_str(&body_text);
        self.directive(".end code")?;
        self.directive(".end method")?;
        writeln!(self.output)?;
        Ok(())
    }
}
