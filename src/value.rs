use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::ast::float_text;

/// Index of a closure in the evaluator's function table.
///
/// Every copy shares one handle; the evaluator counts handles to tell
/// whether a function value is still held anywhere.
#[derive(Debug, Clone)]
pub struct FunctionId {
    pub(crate) index: usize,
    pub(crate) handle: Arc<()>,
}

impl PartialEq for FunctionId {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl Eq for FunctionId {}

impl Hash for FunctionId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

/// Functions provided by the interpreter itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    /// `len(s)`: number of characters in a string.
    Len,
    /// `str(v)`: display form of any value.
    Str,
    /// `type(v)`: name of the value's type.
    Type,
}

impl Builtin {
    pub const ALL: [Self; 3] = [Self::Len, Self::Str, Self::Type];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Len => "len",
            Self::Str => "str",
            Self::Type => "type",
        }
    }

    #[must_use]
    pub const fn arity(self) -> usize {
        match self {
            Self::Len | Self::Str | Self::Type => 1,
        }
    }
}

/// Runtime value.
///
/// Function values are indices into the evaluator that created them
/// and are only meaningful within that evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Str(String),
    Function { id: FunctionId, name: String },
    Builtin(Builtin),
}

impl Value {
    /// Name of the value's type as reported by `type()` and in errors.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Function { .. } => "function",
            Self::Builtin(_) => "builtin",
        }
    }

    /// `nil`, `false`, zero and the empty string are false.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Nil => false,
            Self::Bool(b) => *b,
            Self::Integer(n) => *n != 0,
            Self::Float(x) => *x != 0.0,
            Self::Str(s) => !s.is_empty(),
            Self::Function { .. } | Self::Builtin(_) => true,
        }
    }

    /// Language-level equality: numbers compare across int and float.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn equals(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Integer(a), Self::Float(b)) | (Self::Float(b), Self::Integer(a)) => {
                (*a as f64) == *b
            }
            (Self::Function { id: a, .. }, Self::Function { id: b, .. }) => a == b,
            _ => self == other,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => f.write_str("nil"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(x) => f.write_str(&float_text(*x)),
            Self::Str(s) => f.write_str(s),
            Self::Function { name, .. } => write!(f, "<fn {name}>"),
            Self::Builtin(builtin) => write!(f, "<builtin {}>", builtin.name()),
        }
    }
}
