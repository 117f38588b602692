//! Type system for the source language.
//!
//! Types are a base (void/char/int/float/struct) plus const and array
//! flags. Two types are the same when base, array-ness, and struct name
//! match; `const` is not part of type identity. Implicit widening is the
//! reflexive closure of char->int, char->float, int->float; narrowing is
//! only available through an explicit cast.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseType {
    Void,
    Char,
    Int,
    Float,
    Struct,
}

#[derive(Debug, Clone)]
pub struct Type {
    pub base: BaseType,
    pub is_const: bool,
    pub is_array: bool,
    /// Set only when `base` is `Struct`.
    pub struct_name: Option<String>,
}

impl Type {
    pub fn scalar(base: BaseType) -> Type {
        Type {
            base,
            is_const: false,
            is_array: false,
            struct_name: None,
        }
    }

    pub fn structure(name: impl Into<String>) -> Type {
        Type {
            base: BaseType::Struct,
            is_const: false,
            is_array: false,
            struct_name: Some(name.into()),
        }
    }

    pub fn array_of(mut self) -> Type {
        self.is_array = true;
        self
    }

    pub fn const_of(mut self) -> Type {
        self.is_const = true;
        self
    }

    /// Type identity: base, array-ness, and struct name. `const` does not
    /// participate.
    pub fn same_as(&self, other: &Type) -> bool {
        self.base == other.base
            && self.is_array == other.is_array
            && (self.base != BaseType::Struct || self.struct_name == other.struct_name)
    }

    /// Whether this type implicitly widens to `target`. Arrays never widen.
    pub fn widens_to(&self, target: &Type) -> bool {
        if self.same_as(target) {
            return true;
        }
        if self.is_array || target.is_array {
            return false;
        }
        matches!(
            (self.base, target.base),
            (BaseType::Char, BaseType::Int)
                | (BaseType::Char, BaseType::Float)
                | (BaseType::Int, BaseType::Float)
        )
    }

    /// char, int, or float scalar.
    pub fn is_numeric(&self) -> bool {
        !self.is_array && matches!(self.base, BaseType::Char | BaseType::Int | BaseType::Float)
    }

    /// A scalar that loads as an int on the operand stack.
    pub fn is_integral(&self) -> bool {
        !self.is_array && matches!(self.base, BaseType::Char | BaseType::Int)
    }

    /// The element type of an array, with const carried over.
    pub fn element_type(&self) -> Type {
        let mut t = self.clone();
        t.is_array = false;
        t
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_const {
            write!(f, "const ")?;
        }
        match self.base {
            BaseType::Void => write!(f, "void")?,
            BaseType::Char => write!(f, "char")?,
            BaseType::Int => write!(f, "int")?,
            BaseType::Float => write!(f, "float")?,
            BaseType::Struct => write!(f, "struct {}", self.struct_name.as_deref().unwrap_or(""))?,
        }
        if self.is_array {
            write!(f, "[]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_const_is_not_part_of_identity() {
        let a = Type::scalar(BaseType::Int);
        let b = Type::scalar(BaseType::Int).const_of();
        assert!(a.same_as(&b));
        assert!(b.same_as(&a));
    }

    #[test]
    fn test_array_distinguishes_types() {
        let a = Type::scalar(BaseType::Char);
        let b = Type::scalar(BaseType::Char).array_of();
        assert!(!a.same_as(&b));
    }

    #[test]
    fn test_struct_name_distinguishes_types() {
        let a = Type::structure("pair");
        let b = Type::structure("point");
        assert!(!a.same_as(&b));
        assert!(a.same_as(&Type::structure("pair")));
    }

    #[test]
    fn test_widening_chain() {
        let c = Type::scalar(BaseType::Char);
        let i = Type::scalar(BaseType::Int);
        let f = Type::scalar(BaseType::Float);
        assert!(c.widens_to(&i));
        assert!(c.widens_to(&f));
        assert!(i.widens_to(&f));
        assert!(i.widens_to(&i));
    }

    #[test]
    fn test_narrowing_is_rejected() {
        let i = Type::scalar(BaseType::Int);
        let c = Type::scalar(BaseType::Char);
        let f = Type::scalar(BaseType::Float);
        assert!(!i.widens_to(&c));
        assert!(!f.widens_to(&i));
        assert!(!f.widens_to(&c));
    }

    #[test]
    fn test_arrays_never_widen() {
        let ca = Type::scalar(BaseType::Char).array_of();
        let ia = Type::scalar(BaseType::Int).array_of();
        let i = Type::scalar(BaseType::Int);
        assert!(!ca.widens_to(&ia));
        assert!(!ca.widens_to(&i));
        assert!(!i.widens_to(&ia));
    }

    #[test]
    fn test_display_canonical_format() {
        assert_eq!(Type::scalar(BaseType::Int).to_string(), "int");
        assert_eq!(
            Type::scalar(BaseType::Char).const_of().array_of().to_string(),
            "const char[]"
        );
        assert_eq!(Type::structure("pair").to_string(), "struct pair");
        assert_eq!(
            Type::structure("pair").array_of().to_string(),
            "struct pair[]"
        );
    }
}
