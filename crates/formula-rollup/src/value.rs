use ordered_float::OrderedFloat;
use std::fmt;
use std::sync::Arc;

/// A scalar cell value.
///
/// Variant order doubles as the sort order used for keys: blanks sort first, then booleans,
/// numbers and text.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Value {
    #[default]
    Blank,
    Boolean(bool),
    Number(OrderedFloat<f64>),
    Text(Arc<str>),
}

impl Value {
    pub fn is_blank(&self) -> bool {
        matches!(self, Value::Blank)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(n.0),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_ref()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Blank => Ok(()),
            Value::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Value::Number(n) => write!(f, "{}", format_number(n.0)),
            Value::Text(s) => f.write_str(s),
        }
    }
}

/// Formats a number without a trailing `.0` when it is integral.
pub(crate) fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(OrderedFloat(value))
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::from(value as f64)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::from(value as f64)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::from(value as f64)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::from(value as f64)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(Arc::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(Arc::from(value))
    }
}

impl From<Arc<str>> for Value {
    fn from(value: Arc<str>) -> Self {
        Value::Text(value)
    }
}

/// The equality-compared key shared by grouping and join matching.
///
/// Keys are ordered tuples of values and compare by value, so a composite key of
/// `("abc.com", 2024)` matches any other key built from equal parts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey(Vec<Value>);

impl GroupKey {
    pub fn new(parts: Vec<Value>) -> Self {
        Self(parts)
    }

    pub fn single(value: impl Into<Value>) -> Self {
        Self(vec![value.into()])
    }

    pub fn parts(&self) -> &[Value] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_parts(self) -> Vec<Value> {
        self.0
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, part) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str("|")?;
            }
            write!(f, "{part}")?;
        }
        Ok(())
    }
}

impl From<Value> for GroupKey {
    fn from(value: Value) -> Self {
        Self(vec![value])
    }
}

impl From<Vec<Value>> for GroupKey {
    fn from(parts: Vec<Value>) -> Self {
        Self(parts)
    }
}

impl From<&str> for GroupKey {
    fn from(value: &str) -> Self {
        Self::single(value)
    }
}

impl From<String> for GroupKey {
    fn from(value: String) -> Self {
        Self::single(value)
    }
}
