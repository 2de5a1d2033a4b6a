//! Typed argument values for operator specifications
//!
//! Arguments are dynamically typed over a small closed set of semantic
//! types. A value's stored representation is fixed when it is set;
//! conversions to requested types happen at read time and follow an
//! explicit widening table rather than implicit coercion.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Semantic type of an argument value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArgType {
    /// Boolean scalar
    Bool,

    /// 64-bit signed integer scalar
    Int,

    /// 64-bit floating point scalar
    Float,

    /// UTF-8 string scalar
    String,

    /// Ordered sequence of booleans
    BoolVec,

    /// Ordered sequence of integers
    IntVec,

    /// Ordered sequence of floats
    FloatVec,

    /// Ordered sequence of strings
    StringVec,
}

impl ArgType {
    /// Check if this type is one of the scalar semantic types
    pub fn is_scalar(self) -> bool {
        matches!(self, ArgType::Bool | ArgType::Int | ArgType::Float | ArgType::String)
    }

    /// Conversion rules table: whether a value stored as `self` may be
    /// read as `target`.
    ///
    /// Only the identity and the numeric widenings `Int -> Float` and
    /// `IntVec -> FloatVec` are supported; everything else requires an
    /// exact tag match.
    pub fn widens_to(self, target: ArgType) -> bool {
        self == target
            || matches!(
                (self, target),
                (ArgType::Int, ArgType::Float) | (ArgType::IntVec, ArgType::FloatVec)
            )
    }
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArgType::Bool => "Bool",
            ArgType::Int => "Int",
            ArgType::Float => "Float",
            ArgType::String => "String",
            ArgType::BoolVec => "BoolVec",
            ArgType::IntVec => "IntVec",
            ArgType::FloatVec => "FloatVec",
            ArgType::StringVec => "StringVec",
        };
        write!(f, "{}", name)
    }
}

/// A type-tagged argument value
///
/// Integer-like Rust types are stored as `Int` and float-like types as
/// `Float`, so two values set from `i32` and `i64` compare equal when
/// their widened representations do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArgValue {
    /// Boolean scalar
    Bool(bool),

    /// Integer scalar
    Int(i64),

    /// Float scalar
    Float(f64),

    /// String scalar
    String(String),

    /// Boolean sequence
    BoolVec(Vec<bool>),

    /// Integer sequence
    IntVec(Vec<i64>),

    /// Float sequence
    FloatVec(Vec<f64>),

    /// String sequence
    StringVec(Vec<String>),
}

impl ArgValue {
    /// Get the semantic type tag of this value
    pub fn arg_type(&self) -> ArgType {
        match self {
            ArgValue::Bool(_) => ArgType::Bool,
            ArgValue::Int(_) => ArgType::Int,
            ArgValue::Float(_) => ArgType::Float,
            ArgValue::String(_) => ArgType::String,
            ArgValue::BoolVec(_) => ArgType::BoolVec,
            ArgValue::IntVec(_) => ArgType::IntVec,
            ArgValue::FloatVec(_) => ArgType::FloatVec,
            ArgValue::StringVec(_) => ArgType::StringVec,
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Bool(v) => write!(f, "{}", v),
            ArgValue::Int(v) => write!(f, "{}", v),
            ArgValue::Float(v) => write!(f, "{}", v),
            ArgValue::String(v) => write!(f, "\"{}\"", v),
            ArgValue::BoolVec(v) => write!(f, "{:?}", v),
            ArgValue::IntVec(v) => write!(f, "{:?}", v),
            ArgValue::FloatVec(v) => write!(f, "{:?}", v),
            ArgValue::StringVec(v) => write!(f, "{:?}", v),
        }
    }
}

/// Conversion from a Rust value into a stored argument value
pub trait IntoArgValue {
    /// Convert into the tagged storage representation
    fn into_arg_value(self) -> ArgValue;
}

/// Conversion from a stored argument value back into a Rust type
///
/// Implementations are the read side of the [`ArgType::widens_to`] table:
/// `from_arg_value` returns `None` exactly when the stored tag does not
/// widen to [`Self::REQUESTED`].
pub trait FromArgValue: Sized {
    /// Semantic type this Rust type reads as
    const REQUESTED: ArgType;

    /// Convert from the tagged storage representation, applying only the
    /// supported widenings
    fn from_arg_value(value: &ArgValue) -> Option<Self>;
}

macro_rules! impl_into_scalar {
    ($($ty:ty => $variant:ident as $stored:ty),* $(,)?) => {
        $(impl IntoArgValue for $ty {
            fn into_arg_value(self) -> ArgValue {
                ArgValue::$variant(self as $stored)
            }
        })*
    };
}

impl_into_scalar! {
    i32 => Int as i64,
    i64 => Int as i64,
    u32 => Int as i64,
    f32 => Float as f64,
    f64 => Float as f64,
}

impl IntoArgValue for bool {
    fn into_arg_value(self) -> ArgValue {
        ArgValue::Bool(self)
    }
}

impl IntoArgValue for String {
    fn into_arg_value(self) -> ArgValue {
        ArgValue::String(self)
    }
}

impl IntoArgValue for &str {
    fn into_arg_value(self) -> ArgValue {
        ArgValue::String(self.to_string())
    }
}

macro_rules! impl_into_vec {
    ($($elem:ty => $variant:ident as $stored:ty),* $(,)?) => {
        $(impl IntoArgValue for Vec<$elem> {
            fn into_arg_value(self) -> ArgValue {
                ArgValue::$variant(self.into_iter().map(|v| v as $stored).collect())
            }
        })*
    };
}

impl_into_vec! {
    i32 => IntVec as i64,
    i64 => IntVec as i64,
    u32 => IntVec as i64,
    f32 => FloatVec as f64,
    f64 => FloatVec as f64,
}

impl IntoArgValue for Vec<bool> {
    fn into_arg_value(self) -> ArgValue {
        ArgValue::BoolVec(self)
    }
}

impl IntoArgValue for Vec<String> {
    fn into_arg_value(self) -> ArgValue {
        ArgValue::StringVec(self)
    }
}

impl IntoArgValue for Vec<&str> {
    fn into_arg_value(self) -> ArgValue {
        ArgValue::StringVec(self.into_iter().map(str::to_string).collect())
    }
}

impl IntoArgValue for ArgValue {
    fn into_arg_value(self) -> ArgValue {
        self
    }
}

impl FromArgValue for bool {
    const REQUESTED: ArgType = ArgType::Bool;

    fn from_arg_value(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromArgValue for i64 {
    const REQUESTED: ArgType = ArgType::Int;

    fn from_arg_value(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromArgValue for i32 {
    const REQUESTED: ArgType = ArgType::Int;

    fn from_arg_value(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::Int(v) => i32::try_from(*v).ok(),
            _ => None,
        }
    }
}

impl FromArgValue for u32 {
    const REQUESTED: ArgType = ArgType::Int;

    fn from_arg_value(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::Int(v) => u32::try_from(*v).ok(),
            _ => None,
        }
    }
}

impl FromArgValue for u64 {
    const REQUESTED: ArgType = ArgType::Int;

    fn from_arg_value(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::Int(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }
}

impl FromArgValue for f64 {
    const REQUESTED: ArgType = ArgType::Float;

    fn from_arg_value(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::Float(v) => Some(*v),
            // Int -> Float widening
            ArgValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }
}

impl FromArgValue for f32 {
    const REQUESTED: ArgType = ArgType::Float;

    fn from_arg_value(value: &ArgValue) -> Option<Self> {
        f64::from_arg_value(value).map(|v| v as f32)
    }
}

impl FromArgValue for String {
    const REQUESTED: ArgType = ArgType::String;

    fn from_arg_value(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::String(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl FromArgValue for Vec<bool> {
    const REQUESTED: ArgType = ArgType::BoolVec;

    fn from_arg_value(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::BoolVec(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl FromArgValue for Vec<i64> {
    const REQUESTED: ArgType = ArgType::IntVec;

    fn from_arg_value(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::IntVec(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl FromArgValue for Vec<i32> {
    const REQUESTED: ArgType = ArgType::IntVec;

    fn from_arg_value(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::IntVec(v) => v.iter().map(|&x| i32::try_from(x).ok()).collect(),
            _ => None,
        }
    }
}

impl FromArgValue for Vec<f64> {
    const REQUESTED: ArgType = ArgType::FloatVec;

    fn from_arg_value(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::FloatVec(v) => Some(v.clone()),
            // IntVec -> FloatVec widening
            ArgValue::IntVec(v) => Some(v.iter().map(|&x| x as f64).collect()),
            _ => None,
        }
    }
}

impl FromArgValue for Vec<f32> {
    const REQUESTED: ArgType = ArgType::FloatVec;

    fn from_arg_value(value: &ArgValue) -> Option<Self> {
        Vec::<f64>::from_arg_value(value).map(|v| v.into_iter().map(|x| x as f32).collect())
    }
}

impl FromArgValue for Vec<String> {
    const REQUESTED: ArgType = ArgType::StringVec;

    fn from_arg_value(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::StringVec(v) => Some(v.clone()),
            _ => None,
        }
    }
}

/// A named, type-tagged argument attached to an operator specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    /// Argument name, unique within one operator specification
    name: String,

    /// The stored value
    value: ArgValue,
}

impl Argument {
    /// Create a new argument from a Rust value
    pub fn new<T: IntoArgValue>(name: &str, value: T) -> Self {
        Self {
            name: name.to_string(),
            value: value.into_arg_value(),
        }
    }

    /// Get the argument name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the stored value
    pub fn value(&self) -> &ArgValue {
        &self.value
    }

    /// Get the semantic type the value was stored with
    pub fn arg_type(&self) -> ArgType {
        self.value.arg_type()
    }

    /// Read the value as `T`, applying the widening table
    pub fn get<T: FromArgValue>(&self) -> Result<T> {
        T::from_arg_value(&self.value).ok_or_else(|| Error::TypeMismatch {
            name: self.name.clone(),
            stored: self.value.arg_type().to_string(),
            requested: T::REQUESTED.to_string(),
        })
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.name, self.value, self.value.arg_type())
    }
}
