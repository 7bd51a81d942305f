use enum_as_inner::EnumAsInner;
use serde_json::Value;

use crate::Indices;
use crate::IndicesError;
use crate::Slice;

/// The operand of [`Indices::subscript`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subscript {
    /// A single element; negative indices count from the end.
    Index(i64),
    /// A derived view over a slice of local positions.
    Slice(Slice),
    /// A derived view over explicit local positions, in order.
    Positions(Vec<i64>),
}

/// The result of [`Indices::subscript`].
#[derive(Debug, Clone, PartialEq, EnumAsInner)]
pub enum Subscripted {
    Value(i64),
    View(Indices),
}

impl From<i64> for Subscript {
    fn from(index: i64) -> Self {
        Self::Index(index)
    }
}

impl From<Slice> for Subscript {
    fn from(slice: Slice) -> Self {
        Self::Slice(slice)
    }
}

impl From<std::ops::Range<i64>> for Subscript {
    fn from(r: std::ops::Range<i64>) -> Self {
        Self::Slice(r.into())
    }
}

impl From<std::ops::RangeFrom<i64>> for Subscript {
    fn from(r: std::ops::RangeFrom<i64>) -> Self {
        Self::Slice(r.into())
    }
}

impl From<std::ops::RangeTo<i64>> for Subscript {
    fn from(r: std::ops::RangeTo<i64>) -> Self {
        Self::Slice(r.into())
    }
}

impl From<std::ops::RangeFull> for Subscript {
    fn from(r: std::ops::RangeFull) -> Self {
        Self::Slice(r.into())
    }
}

impl From<Vec<i64>> for Subscript {
    fn from(positions: Vec<i64>) -> Self {
        Self::Positions(positions)
    }
}

impl From<&[i64]> for Subscript {
    fn from(positions: &[i64]) -> Self {
        Self::Positions(positions.to_vec())
    }
}

impl<const N: usize> From<[i64; N]> for Subscript {
    fn from(positions: [i64; N]) -> Self {
        Self::Positions(positions.to_vec())
    }
}

fn invalid(value: &Value) -> IndicesError {
    IndicesError::InvalidOperand {
        operand: value.to_string(),
    }
}

/// Subscripts arriving as data: an integer, an array of integers, or
/// an object with optional integer `start`, `stop` and `step` keys.
impl TryFrom<&Value> for Subscript {
    type Error = IndicesError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::Number(n) => n.as_i64().map(Subscript::Index).ok_or_else(|| invalid(value)),
            Value::Array(items) => items
                .iter()
                .map(|item| item.as_i64().ok_or_else(|| invalid(value)))
                .collect::<Result<Vec<_>, _>>()
                .map(Subscript::Positions),
            Value::Object(map) => {
                let mut slice = Slice::full();
                for (key, bound) in map {
                    let bound = match bound {
                        Value::Null => None,
                        bound => Some(bound.as_i64().ok_or_else(|| invalid(value))?),
                    };
                    match key.as_str() {
                        "start" => slice.start = bound,
                        "stop" => slice.stop = bound,
                        "step" => slice.step = bound,
                        _ => return Err(invalid(value)),
                    }
                }
                Ok(Subscript::Slice(slice))
            }
            Value::Null | Value::Bool(_) | Value::String(_) => Err(invalid(value)),
        }
    }
}
