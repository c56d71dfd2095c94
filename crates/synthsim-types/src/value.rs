//! Typed value bus.
//!
//! A deliberately tiny closed type system used to move values from sensors
//! into actuators when routing is configured by the user instead of being
//! hard-wired by a behavior.
//!
//! | Type | Text form | Fan-in combiner |
//! |---|---|---|
//! | [`ValueType::Scalar`] | `number` | sum of all producers |
//! | [`ValueType::Pair`] | `(number,number)` | none |
//! | [`ValueType::Triple`] | `(number,number,number)` | none |
//! | [`ValueType::Unknown`] | `unknown` | none |
//!
//! Tuples can be decomposed into their scalar components so a single
//! component of a tuple producer can feed a scalar consumer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Fan-in function merging the values of several producers into one.
pub type Combiner = fn(&[Value]) -> Value;

/// Type tag carried by every [`Value`] and declared by producers/consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ValueType {
    Scalar,
    Pair,
    Triple,
    Unknown,
}

impl ValueType {
    /// Number of scalar components, or `None` for [`ValueType::Unknown`].
    pub fn arity(self) -> Option<usize> {
        match self {
            ValueType::Scalar => Some(1),
            ValueType::Pair => Some(2),
            ValueType::Triple => Some(3),
            ValueType::Unknown => None,
        }
    }

    /// `true` for the parenthesised tuple types.
    pub fn is_tuple(self) -> bool {
        matches!(self, ValueType::Pair | ValueType::Triple)
    }

    /// Split a tuple type into its component scalar types.
    ///
    /// Returns `None` for scalars and unknown types.
    pub fn decompose(self) -> Option<Vec<ValueType>> {
        match self {
            ValueType::Pair => Some(vec![ValueType::Scalar; 2]),
            ValueType::Triple => Some(vec![ValueType::Scalar; 3]),
            ValueType::Scalar | ValueType::Unknown => None,
        }
    }

    /// Fan-in function for this type, if one is defined.
    ///
    /// Callers must treat `None` as "multi-producer routing into this type is
    /// unsupported".
    pub fn combiner(self) -> Option<Combiner> {
        match self {
            ValueType::Scalar => Some(sum_numbers),
            ValueType::Pair | ValueType::Triple | ValueType::Unknown => None,
        }
    }
}

fn sum_numbers(values: &[Value]) -> Value {
    Value::Number(values.iter().filter_map(|v| v.as_number()).sum())
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ValueType::Scalar => "number",
            ValueType::Pair => "(number,number)",
            ValueType::Triple => "(number,number,number)",
            ValueType::Unknown => "unknown",
        };
        f.write_str(text)
    }
}

impl FromStr for ValueType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        match compact.as_str() {
            "number" => Ok(ValueType::Scalar),
            "(number,number)" => Ok(ValueType::Pair),
            "(number,number,number)" => Ok(ValueType::Triple),
            "unknown" => Ok(ValueType::Unknown),
            other => Err(format!("unrecognised value type '{other}'")),
        }
    }
}

impl TryFrom<String> for ValueType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ValueType> for String {
    fn from(value: ValueType) -> Self {
        value.to_string()
    }
}

/// A value travelling over the bus.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Number(f32),
    Pair(f32, f32),
    Triple(f32, f32, f32),
    Unknown,
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Number(_) => ValueType::Scalar,
            Value::Pair(..) => ValueType::Pair,
            Value::Triple(..) => ValueType::Triple,
            Value::Unknown => ValueType::Unknown,
        }
    }

    pub fn as_number(&self) -> Option<f32> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Extract component `index` of a tuple as a [`Value::Number`].
    ///
    /// Scalars answer index `0` with themselves.
    pub fn component(&self, index: usize) -> Option<Value> {
        let n = match (self, index) {
            (Value::Number(a), 0) => *a,
            (Value::Pair(a, _), 0) | (Value::Triple(a, _, _), 0) => *a,
            (Value::Pair(_, b), 1) | (Value::Triple(_, b, _), 1) => *b,
            (Value::Triple(_, _, c), 2) => *c,
            _ => return None,
        };
        Some(Value::Number(n))
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Number(value)
    }
}

impl From<glam::Vec3> for Value {
    fn from(v: glam::Vec3) -> Self {
        Value::Triple(v.x, v.y, v.z)
    }
}
