//! Symbol tables: variables, functions, and struct definitions.
//!
//! All three collections are insertion-ordered and owned by a single
//! `SymbolTable` that is threaded explicitly through the parser and the
//! emitter. Variable lookup searches the current function's locals before
//! the globals. Function lookup covers preloaded runtime builtins as well
//! as user declarations.

use crate::ast::Statement;
use crate::types::Type;

#[derive(Debug, Clone)]
pub struct VarSymbol {
    pub name: String,
    pub ty: Type,
    pub is_global: bool,
    /// Local slot index; `None` for globals. Parameters get `0..n`, other
    /// locals the next free index in declaration order.
    pub slot: Option<u16>,
    pub line: u32,
}

#[derive(Debug, Clone)]
pub struct Param {
    /// Prototypes may omit parameter names.
    pub name: Option<String>,
    pub ty: Type,
}

#[derive(Debug)]
pub struct Function {
    pub name: String,
    pub return_type: Type,
    pub params: Vec<Param>,
    /// All locals including parameters, in slot order.
    pub locals: Vec<VarSymbol>,
    pub body: Option<Statement>,
    pub defined: bool,
    /// Preloaded runtime function (resolves to the runtime class at
    /// emission).
    pub builtin: bool,
    pub line: u32,
}

impl Function {
    pub fn signature_matches(&self, other: &Function) -> bool {
        self.return_type.same_as(&other.return_type)
            && self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(other.params.iter())
                .all(|(a, b)| a.ty.same_as(&b.ty))
    }
}

#[derive(Debug)]
pub struct StructDef {
    pub name: String,
    pub members: Vec<crate::ast::Declaration>,
    pub line: u32,
}

impl StructDef {
    pub fn member(&self, name: &str) -> Option<&crate::ast::Declaration> {
        self.members.iter().find(|m| m.name == name)
    }
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    pub globals: Vec<VarSymbol>,
    pub functions: Vec<Function>,
    pub structs: Vec<StructDef>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    /// Add a global variable. Duplicates within the global scope are
    /// rejected.
    pub fn add_global(&mut self, sym: VarSymbol) -> Result<(), String> {
        if self.globals.iter().any(|g| g.name == sym.name) {
            return Err(format!("Duplicate declaration of variable {}", sym.name));
        }
        self.globals.push(sym);
        Ok(())
    }

    pub fn lookup_global(&self, name: &str) -> Option<&VarSymbol> {
        self.globals.iter().find(|g| g.name == name)
    }

    /// Locals of the current function first, then globals.
    pub fn lookup_variable<'a>(
        &'a self,
        locals: &'a [VarSymbol],
        name: &str,
    ) -> Option<&'a VarSymbol> {
        locals
            .iter()
            .find(|v| v.name == name)
            .or_else(|| self.lookup_global(name))
    }

    /// Declare or define a function.
    ///
    /// A re-declaration must match the earlier signature exactly; defining
    /// an already-defined function is an error. A definition fills in the
    /// body and locals of an earlier prototype.
    pub fn declare_function(&mut self, func: Function) -> Result<(), String> {
        match self.functions.iter_mut().find(|f| f.name == func.name) {
            Some(existing) => {
                if existing.builtin {
                    return Err(format!(
                        "Function {} conflicts with a runtime function",
                        func.name
                    ));
                }
                if !existing.signature_matches(&func) {
                    return Err(format!(
                        "Prototype of {} differs from previous declaration",
                        func.name
                    ));
                }
                if func.defined {
                    if existing.defined {
                        return Err(format!("Redefinition of function {}", func.name));
                    }
                    existing.params = func.params;
                    existing.locals = func.locals;
                    existing.body = func.body;
                    existing.defined = true;
                }
                Ok(())
            }
            None => {
                self.functions.push(func);
                Ok(())
            }
        }
    }

    pub fn lookup_function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn add_struct(&mut self, def: StructDef) -> Result<(), String> {
        if self.structs.iter().any(|s| s.name == def.name) {
            return Err(format!("Duplicate definition of struct {}", def.name));
        }
        self.structs.push(def);
        Ok(())
    }

    pub fn lookup_struct(&self, name: &str) -> Option<&StructDef> {
        self.structs.iter().find(|s| s.name == name)
    }
}
