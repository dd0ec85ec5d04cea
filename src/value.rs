use std::fmt;

use crate::error::ConversionError;

/// The result of evaluating an expression. Exactly one variant is active and
/// the typed accessors refuse to convert between them.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f32),
    String(String),
    Bool(bool),
    Char(char),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(x) => write!(f, "{}", x),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(x) => write!(f, "{}", x),
            Value::Bool(x) => write!(f, "{}", x),
            Value::Char(x) => write!(f, "{}", x),
        }
    }
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Bool(_) => "bool",
            Value::Char(_) => "char",
        }
    }

    fn mismatch(&self, expected: &'static str) -> ConversionError {
        ConversionError {
            expected,
            found: self.kind(),
        }
    }

    pub fn as_integer(&self) -> Result<i64, ConversionError> {
        if let Value::Integer(val) = self {
            Ok(*val)
        } else {
            Err(self.mismatch("integer"))
        }
    }

    pub fn as_float(&self) -> Result<f32, ConversionError> {
        if let Value::Float(val) = self {
            Ok(*val)
        } else {
            Err(self.mismatch("float"))
        }
    }

    pub fn as_bool(&self) -> Result<bool, ConversionError> {
        if let Value::Bool(val) = self {
            Ok(*val)
        } else {
            Err(self.mismatch("bool"))
        }
    }

    pub fn as_string(&self) -> Result<&str, ConversionError> {
        if let Value::String(val) = self {
            Ok(val)
        } else {
            Err(self.mismatch("string"))
        }
    }

    pub fn as_char(&self) -> Result<char, ConversionError> {
        if let Value::Char(val) = self {
            Ok(*val)
        } else {
            Err(self.mismatch("char"))
        }
    }
}

impl From<i64> for Value {
    fn from(val: i64) -> Self {
        Value::Integer(val)
    }
}

impl From<f32> for Value {
    fn from(val: f32) -> Self {
        Value::Float(val)
    }
}

impl From<bool> for Value {
    fn from(val: bool) -> Self {
        Value::Bool(val)
    }
}

impl From<char> for Value {
    fn from(val: char) -> Self {
        Value::Char(val)
    }
}

impl From<String> for Value {
    fn from(val: String) -> Self {
        Value::String(val)
    }
}

impl From<&str> for Value {
    fn from(val: &str) -> Self {
        Value::String(val.to_owned())
    }
}
