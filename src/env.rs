use std::collections::HashMap;

use crate::error::EvalError;
use crate::value::Value;

/// A caller-supplied variable value. Wider than [`Value`]: it also admits
/// unsigned integers, 64-bit floats, and structured values that only make
/// sense as the base of an index or member expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Dynamic {
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Bool(bool),
    Char(char),
    List(Vec<Dynamic>),
    Record(HashMap<String, Dynamic>),
}

impl Dynamic {
    pub fn kind(&self) -> &'static str {
        match self {
            Dynamic::Int(_) => "integer",
            Dynamic::UInt(_) => "unsigned integer",
            Dynamic::Float(_) => "float",
            Dynamic::Str(_) => "string",
            Dynamic::Bool(_) => "bool",
            Dynamic::Char(_) => "char",
            Dynamic::List(_) => "list",
            Dynamic::Record(_) => "record",
        }
    }

    /// Normalizes into a [`Value`]. `name` is only used for the error.
    pub fn to_value(&self, name: &str) -> Result<Value, EvalError> {
        let unsupported = || EvalError::UnsupportedValueType {
            name: name.to_owned(),
            kind: self.kind(),
        };
        match self {
            Dynamic::Int(x) => Ok(Value::Integer(*x)),
            Dynamic::UInt(x) => i64::try_from(*x)
                .map(Value::Integer)
                .map_err(|_| unsupported()),
            Dynamic::Float(x) => Ok(Value::Float(*x as f32)),
            Dynamic::Str(x) => Ok(Value::String(x.clone())),
            Dynamic::Bool(x) => Ok(Value::Bool(*x)),
            Dynamic::Char(x) => Ok(Value::Char(*x)),
            Dynamic::List(_) | Dynamic::Record(_) => Err(unsupported()),
        }
    }
}

impl From<Value> for Dynamic {
    fn from(value: Value) -> Self {
        match value {
            Value::Integer(x) => Dynamic::Int(x),
            Value::Float(x) => Dynamic::Float(x.into()),
            Value::String(x) => Dynamic::Str(x),
            Value::Bool(x) => Dynamic::Bool(x),
            Value::Char(x) => Dynamic::Char(x),
        }
    }
}

macro_rules! impl_from {
    ($variant:ident, $target:ty: $($source:ty),+) => {
        $(
            impl From<$source> for Dynamic {
                fn from(val: $source) -> Self {
                    Dynamic::$variant(<$target>::from(val))
                }
            }
        )+
    };
}

impl_from!(Int, i64: i8, i16, i32, i64);
impl_from!(UInt, u64: u8, u16, u32, u64);
impl_from!(Float, f64: f32, f64);
impl_from!(Str, String: String, &str);
impl_from!(Bool, bool: bool);
impl_from!(Char, char: char);

impl From<isize> for Dynamic {
    fn from(val: isize) -> Self {
        Dynamic::Int(val as i64)
    }
}

impl From<usize> for Dynamic {
    fn from(val: usize) -> Self {
        Dynamic::UInt(val as u64)
    }
}

impl<T: Into<Dynamic>> From<Vec<T>> for Dynamic {
    fn from(values: Vec<T>) -> Self {
        Dynamic::List(values.into_iter().map(Into::into).collect())
    }
}

impl<K: Into<String>, V: Into<Dynamic>> FromIterator<(K, V)> for Dynamic {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Dynamic::Record(
            iter.into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }
}

/// Variable bindings for one evaluation. Evaluation only ever reads it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Environment {
    values: HashMap<String, Dynamic>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Dynamic>) -> Environment {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Dynamic>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Dynamic> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<Dynamic>> FromIterator<(K, V)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Environment {
            values: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}
