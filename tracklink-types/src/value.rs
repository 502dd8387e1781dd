//! Typed message values.
//!
//! A transport decodes OSC arguments into [`RuntimeArgument`]s: the original
//! OSC type tag plus a [`Value`]. Actions declare the [`TypeTag`] they expect
//! at each position.

use std::fmt;

use serde::Serialize;

/// The argument types an action may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    Number,
    String,
    Boolean,
}

impl TypeTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeTag::Number => "number",
            TypeTag::String => "string",
            TypeTag::Boolean => "boolean",
        }
    }

    /// Parse a type name as written in declarative action definitions.
    /// Returns `None` for anything but the three supported names.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "number" => Some(TypeTag::Number),
            "string" => Some(TypeTag::String),
            "boolean" => Some(TypeTag::Boolean),
            _ => None,
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dynamically typed message value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    String(String),
    Boolean(bool),
    Nil,
}

impl Value {
    /// The declared type this value satisfies. `Nil` satisfies none.
    pub fn type_tag(&self) -> Option<TypeTag> {
        match self {
            Value::Number(_) => Some(TypeTag::Number),
            Value::String(_) => Some(TypeTag::String),
            Value::Boolean(_) => Some(TypeTag::Boolean),
            Value::Nil => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_tag().map(|t| t.as_str()).unwrap_or("nil")
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Nil => f.write_str("nil"),
        }
    }
}

/// One decoded argument of an incoming message.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeArgument {
    /// OSC type tag character the transport decoded (`f`, `i`, `s`, `T`, ...).
    pub tag: char,
    pub value: Value,
}

impl RuntimeArgument {
    pub fn new(tag: char, value: Value) -> Self {
        Self { tag, value }
    }

    pub fn number(n: f64) -> Self {
        Self::new('f', Value::Number(n))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Self::new('s', Value::String(s.into()))
    }

    pub fn boolean(b: bool) -> Self {
        Self::new(if b { 'T' } else { 'F' }, Value::Boolean(b))
    }

    pub fn nil() -> Self {
        Self::new('N', Value::Nil)
    }
}

/// A message as handed over by the transport: prefix already stripped.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingMessage {
    pub pattern: String,
    pub arguments: Vec<RuntimeArgument>,
}

impl IncomingMessage {
    pub fn new(pattern: impl Into<String>, arguments: Vec<RuntimeArgument>) -> Self {
        Self {
            pattern: pattern.into(),
            arguments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_type_names() {
        assert_eq!(TypeTag::parse("number"), Some(TypeTag::Number));
        assert_eq!(TypeTag::parse(" String "), Some(TypeTag::String));
        assert_eq!(TypeTag::parse("BOOLEAN"), Some(TypeTag::Boolean));
        assert_eq!(TypeTag::parse("integer"), None);
        assert_eq!(TypeTag::parse(""), None);
    }

    #[test]
    fn nil_has_no_type_tag() {
        assert_eq!(Value::Nil.type_tag(), None);
        assert_eq!(Value::Nil.type_name(), "nil");
        assert_eq!(Value::Number(1.0).type_tag(), Some(TypeTag::Number));
    }

    #[test]
    fn boolean_argument_tags() {
        assert_eq!(RuntimeArgument::boolean(true).tag, 'T');
        assert_eq!(RuntimeArgument::boolean(false).tag, 'F');
    }
}
