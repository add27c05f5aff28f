//! Borrowed views of engine-owned constructs
//!
//! The renderer never owns what it prints. Functions are reached through the
//! [`FunctionHandle`] trait, types through [`TypeDescriptor`], and values are
//! plain Cranelift [`Value`] references resolved against their function.

use std::collections::HashMap;
use std::fmt;

use cranelift_codegen::ir::{types, Function, Signature, Type, Value};

/// A function whose IR can be rendered
///
/// Implementors may also carry function-local display names for values.
pub trait FunctionHandle {
    /// The function's Cranelift IR
    fn ir(&self) -> &Function;

    /// Display name attached to `value`, if any
    fn value_name(&self, _value: Value) -> Option<&str> {
        None
    }
}

impl FunctionHandle for Function {
    fn ir(&self) -> &Function {
        self
    }
}

/// A type that can be rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeDescriptor<'a> {
    /// A scalar or vector value type such as `i32` or `f64x2`
    Value(Type),
    /// A function signature, rendered with its parameter and return types
    Signature(&'a Signature),
}

impl TypeDescriptor<'_> {
    /// Returns true if the descriptor names no real type
    pub fn is_invalid(&self) -> bool {
        match self {
            TypeDescriptor::Value(ty) => *ty == types::INVALID,
            TypeDescriptor::Signature(sig) => sig
                .params
                .iter()
                .chain(sig.returns.iter())
                .any(|param| param.value_type == types::INVALID),
        }
    }
}

impl From<Type> for TypeDescriptor<'_> {
    fn from(ty: Type) -> Self {
        TypeDescriptor::Value(ty)
    }
}

impl<'a> From<&'a Signature> for TypeDescriptor<'a> {
    fn from(sig: &'a Signature) -> Self {
        TypeDescriptor::Signature(sig)
    }
}

impl fmt::Display for TypeDescriptor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Value(ty) => write!(f, "{ty}"),
            TypeDescriptor::Signature(sig) => write!(f, "{sig}"),
        }
    }
}

/// Function-local display names for values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueNames {
    names: HashMap<Value, String>,
}

impl ValueNames {
    /// Create an empty name table
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a display name to `value`, replacing any previous name
    pub fn set(&mut self, value: Value, name: impl Into<String>) {
        self.names.insert(value, name.into());
    }

    /// The display name of `value`
    pub fn get(&self, value: Value) -> Option<&str> {
        self.names.get(&value).map(String::as_str)
    }

    /// Number of named values
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if no value has a name
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cranelift_codegen::entity::EntityRef;
    use cranelift_codegen::ir::AbiParam;
    use cranelift_codegen::isa::CallConv;

    #[test]
    fn descriptor_conversions() {
        assert_eq!(TypeDescriptor::from(types::I32), TypeDescriptor::Value(types::I32));

        let sig = Signature::new(CallConv::SystemV);
        assert!(matches!(TypeDescriptor::from(&sig), TypeDescriptor::Signature(_)));
    }

    #[test]
    fn invalid_types_detected() {
        assert!(TypeDescriptor::Value(types::INVALID).is_invalid());
        assert!(!TypeDescriptor::Value(types::I64).is_invalid());

        let mut sig = Signature::new(CallConv::SystemV);
        sig.params.push(AbiParam::new(types::I64));
        assert!(!TypeDescriptor::Signature(&sig).is_invalid());
        sig.returns.push(AbiParam::new(types::INVALID));
        assert!(TypeDescriptor::Signature(&sig).is_invalid());
    }

    #[test]
    fn value_names_replace() {
        let v0 = Value::new(0);
        let mut names = ValueNames::new();
        assert!(names.is_empty());

        names.set(v0, "x");
        names.set(v0, "y");
        assert_eq!(names.get(v0), Some("y"));
        assert_eq!(names.get(Value::new(1)), None);
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn bare_function_has_no_names() {
        let func = Function::new();
        assert_eq!(func.value_name(Value::new(0)), None);
    }
}
