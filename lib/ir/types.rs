//! Types and arena indices.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The index of a class in its `Program`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct ClassId(pub usize);

/// The index of a field in its `Program`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct FieldId(pub usize);

/// The index of a method in its `Program`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct MethodId(pub usize);

/// The index of a variable in its `Program`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct VarId(pub usize);

impl ClassId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl FieldId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl MethodId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A program point: a statement within a method. Identifies both
/// allocation sites and call sites.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Site {
    pub method: MethodId,
    pub stmt: usize,
}

impl Site {
    pub fn new(method: MethodId, stmt: usize) -> Site {
        Site { method, stmt }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "m{}:{}", self.method.index(), self.stmt)
    }
}

/// A primitive type.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum PrimitiveType {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
}

/// The static type of a variable, field, or method return.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Type {
    Void,
    Null,
    Primitive(PrimitiveType),
    Reference(ClassId),
    Array(Box<Type>),
}

impl Type {
    /// Shorthand for the 32-bit integer type.
    pub fn int() -> Type {
        Type::Primitive(PrimitiveType::Int)
    }

    /// True iff values of this type are carried as 32-bit integers, and
    /// therefore tracked by constant propagation.
    pub fn can_hold_int(&self) -> bool {
        matches!(
            self,
            Type::Primitive(
                PrimitiveType::Boolean
                    | PrimitiveType::Byte
                    | PrimitiveType::Char
                    | PrimitiveType::Short
                    | PrimitiveType::Int
            )
        )
    }

    /// True iff values of this type may reference heap objects.
    pub fn is_reference(&self) -> bool {
        matches!(self, Type::Reference(_) | Type::Array(_) | Type::Null)
    }
}
