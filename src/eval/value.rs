//! Runtime values of the host evaluator.

use std::fmt;
use std::sync::Arc;

use crate::ast::{Node, NodeList, Value};

#[derive(Debug, Clone)]
pub enum HostValue {
    Unit,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    Node(Node),
    List(NodeList),
    Tuple(Vec<HostValue>),
}

impl HostValue {
    /// Converts a literal's payload. Byte arrays stay wrapped in their node.
    pub fn from_value(value: &Value) -> HostValue {
        match value {
            Value::Null => HostValue::Null,
            Value::Bool(b) => HostValue::Bool(*b),
            Value::Int(i) => HostValue::Int(*i),
            Value::Float(x) => HostValue::Float(*x),
            Value::String(s) => HostValue::Str(s.clone()),
            Value::Char(c) => HostValue::Str(c.to_string().into()),
            Value::Bytes(_) => HostValue::Node(Node::literal(value.clone())),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            HostValue::Unit => "unit",
            HostValue::Null => "null",
            HostValue::Bool(_) => "bool",
            HostValue::Int(_) => "int",
            HostValue::Float(_) => "float",
            HostValue::Str(_) => "string",
            HostValue::Node(_) => "node",
            HostValue::List(_) => "node list",
            HostValue::Tuple(_) => "tuple",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, HostValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HostValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            HostValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            HostValue::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&NodeList> {
        match self {
            HostValue::List(l) => Some(l),
            _ => None,
        }
    }
}

impl PartialEq for HostValue {
    fn eq(&self, other: &HostValue) -> bool {
        match (self, other) {
            (HostValue::Unit, HostValue::Unit) | (HostValue::Null, HostValue::Null) => true,
            (HostValue::Bool(a), HostValue::Bool(b)) => a == b,
            (HostValue::Int(a), HostValue::Int(b)) => a == b,
            (HostValue::Float(a), HostValue::Float(b)) => a == b,
            (HostValue::Int(a), HostValue::Float(b)) | (HostValue::Float(b), HostValue::Int(a)) => {
                (*a as f64) == *b
            }
            (HostValue::Str(a), HostValue::Str(b)) => a == b,
            (HostValue::Node(a), HostValue::Node(b)) => a == b,
            (HostValue::List(a), HostValue::List(b)) => a == b,
            (HostValue::Tuple(a), HostValue::Tuple(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostValue::Unit => write!(f, "()"),
            HostValue::Null => write!(f, "null"),
            HostValue::Bool(b) => write!(f, "{}", b),
            HostValue::Int(i) => write!(f, "{}", i),
            HostValue::Float(x) => write!(f, "{}", x),
            HostValue::Str(s) => write!(f, "{:?}", s),
            HostValue::Node(n) => write!(f, "{}", n),
            HostValue::List(items) => {
                write!(f, "(list")?;
                for item in items {
                    write!(f, " {}", item)?;
                }
                write!(f, ")")
            }
            HostValue::Tuple(items) => {
                write!(f, "(tuple")?;
                for item in items {
                    write!(f, " {}", item)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl From<Node> for HostValue {
    fn from(node: Node) -> Self {
        HostValue::Node(node)
    }
}

impl From<bool> for HostValue {
    fn from(b: bool) -> Self {
        HostValue::Bool(b)
    }
}
