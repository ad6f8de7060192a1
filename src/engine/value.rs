//! Dynamically-typed cell values.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// A single cell value in a row store or query result.
///
/// Comparison and coercion semantics are deliberately loose, matching a
/// preview engine over heterogeneous JSON data: numeric coercion yields NaN
/// for unparseable input rather than an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric coercion. Null coerces to 0, unparseable strings to NaN.
    pub fn to_f64(&self) -> f64 {
        match self {
            Value::Null => 0.0,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Int(n) => *n as f64,
            Value::Float(f) => *f,
            Value::Str(s) => s.trim().parse::<f64>().unwrap_or(f64::NAN),
        }
    }

    /// Display string, used for group keys and string-typed comparisons.
    /// Whole floats render without a fractional part.
    pub fn display(&self) -> String {
        match self {
            Value::Null => "null".into(),
            Value::Bool(b) => b.to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(f) => {
                if f.is_finite() && f.fract() == 0.0 {
                    format!("{}", *f as i64)
                } else {
                    f.to_string()
                }
            }
            Value::Str(s) => s.clone(),
        }
    }

    /// Loose equality for join keys: numbers compare numerically across
    /// Int/Float, everything else by variant.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                self.to_f64() == other.to_f64()
            }
            _ => self == other,
        }
    }

    /// Native ordering: numbers numerically, strings lexicographically.
    /// Mixed or incomparable operands order as equal.
    pub fn cmp_native(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            (Value::Null, _) | (_, Value::Null) => Ordering::Equal,
            _ => {
                let (a, b) = (self.to_f64(), other.to_f64());
                a.partial_cmp(&b).unwrap_or(Ordering::Equal)
            }
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::Str(s),
            other => Value::Str(other.to_string()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(Value::Int(3).to_f64(), 3.0);
        assert_eq!(Value::Str(" 4.5 ".into()).to_f64(), 4.5);
        assert!(Value::Str("abc".into()).to_f64().is_nan());
        assert_eq!(Value::Null.to_f64(), 0.0);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Float(12.0).display(), "12");
        assert_eq!(Value::Float(12.5).display(), "12.5");
        assert_eq!(Value::Int(7).display(), "7");
        assert_eq!(Value::Null.display(), "null");
    }

    #[test]
    fn test_loose_eq_across_numeric_variants() {
        assert!(Value::Int(2).loose_eq(&Value::Float(2.0)));
        assert!(!Value::Int(2).loose_eq(&Value::Str("2".into())));
    }

    #[test]
    fn test_native_ordering() {
        assert_eq!(Value::Int(1).cmp_native(&Value::Float(2.0)), Ordering::Less);
        assert_eq!(
            Value::Str("a".into()).cmp_native(&Value::Str("b".into())),
            Ordering::Less
        );
        assert_eq!(Value::Null.cmp_native(&Value::Int(1)), Ordering::Equal);
    }

    #[test]
    fn test_from_json() {
        let v: Value = serde_json::json!(42).into();
        assert_eq!(v, Value::Int(42));
        let v: Value = serde_json::json!(1.25).into();
        assert_eq!(v, Value::Float(1.25));
        let v: Value = serde_json::json!("x").into();
        assert_eq!(v, Value::Str("x".into()));
        let v: Value = serde_json::json!(null).into();
        assert_eq!(v, Value::Null);
    }
}
