use std::fmt::Display;

use crate::domain::principal::Principal;

/// The subset of Clarity values the registry produces
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    UInt(u64),
    Bool(bool),
    Ascii(String),
    Principal(Principal),
    Tuple(Vec<(&'static str, Value)>),
    Some(Box<Value>),
    None,
    Ok(Box<Value>),
    Err(Box<Value>),
}

impl Value {
    pub fn ok(value: Value) -> Self {
        Value::Ok(Box::new(value))
    }

    pub fn err(value: Value) -> Self {
        Value::Err(Box::new(value))
    }

    pub fn some(value: Value) -> Self {
        Value::Some(Box::new(value))
    }

    /// true for `(ok ...)` responses
    pub fn is_ok(&self) -> bool {
        matches!(self, Value::Ok(_))
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::UInt(n) => write!(f, "u{n}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Ascii(s) => {
                f.write_str("\"")?;
                for c in s.chars() {
                    match c {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        '\t' => f.write_str("\\t")?,
                        '\r' => f.write_str("\\r")?,
                        c => write!(f, "{c}")?,
                    }
                }
                f.write_str("\"")
            }
            Value::Principal(p) => write!(f, "'{p}"),
            Value::Tuple(fields) => {
                f.write_str("{")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                f.write_str("}")
            }
            Value::Some(v) => write!(f, "(some {v})"),
            Value::None => f.write_str("none"),
            Value::Ok(v) => write!(f, "(ok {v})"),
            Value::Err(v) => write!(f, "(err {v})"),
        }
    }
}
