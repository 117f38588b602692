//! Compiler configuration.
//!
//! The compiler links generated classes against a runtime support class
//! (`lib440` by default) that provides console I/O. Its call surface is
//! described here rather than hard-coded in the parser and emitter, so a
//! different runtime class or an extended builtin set can be supplied
//! without touching the core compiler.

use crate::types::{BaseType, Type};

/// A static method of the runtime class, callable from source code.
#[derive(Debug, Clone)]
pub struct RuntimeBuiltin {
    /// The name used in source code and in the emitted call.
    pub name: String,
    pub params: Vec<Type>,
    pub return_type: Type,
}

impl RuntimeBuiltin {
    pub fn new(name: impl Into<String>, params: Vec<Type>, return_type: Type) -> Self {
        RuntimeBuiltin {
            name: name.into(),
            params,
            return_type,
        }
    }
}

/// Configuration for one compiler invocation.
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Class the preloaded builtins resolve to at emission.
    pub runtime_class: String,
    /// Functions preloaded into the symbol table before parsing.
    pub builtins: Vec<RuntimeBuiltin>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        let int = || Type::scalar(BaseType::Int);
        let float = || Type::scalar(BaseType::Float);
        let void = || Type::scalar(BaseType::Void);
        let char_array = || Type::scalar(BaseType::Char).array_of();
        CompilerConfig {
            runtime_class: "lib440".to_string(),
            builtins: vec![
                RuntimeBuiltin::new("putint", vec![int()], void()),
                RuntimeBuiltin::new("putchar", vec![int()], int()),
                RuntimeBuiltin::new("putfloat", vec![float()], void()),
                RuntimeBuiltin::new("putstring", vec![char_array()], void()),
                RuntimeBuiltin::new("getint", vec![], int()),
                RuntimeBuiltin::new("getchar", vec![], int()),
                RuntimeBuiltin::new("getfloat", vec![], float()),
            ],
        }
    }
}

impl CompilerConfig {
    pub fn new() -> Self {
        CompilerConfig::default()
    }

    /// Add a builtin (builder pattern).
    pub fn with_builtin(mut self, builtin: RuntimeBuiltin) -> Self {
        self.builtins.push(builtin);
        self
    }

    /// Use a different runtime class name.
    pub fn with_runtime_class(mut self, class: impl Into<String>) -> Self {
        self.runtime_class = class.into();
        self
    }
}
