//! The nested record format for views.
//!
//! Each node encodes as `{"slice": <op>, "ref": <parent record>}`, where
//! `<op>` is either
//! `{"type": "slice", "slice": {"start": .., "stop": .., "step": ..}}`
//! or `{"type": "indexes", "values": [..]}`. The root carries no `ref`.
//! Reversals encode as the equivalent reversing slice.

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use serde::de::Error as _;

use crate::Indices;
use crate::IndicesError;
use crate::range::Range;
use crate::view::Node;

/// One node of an encoded view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub slice: Op,
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<Box<Record>>,
}

/// The transform a record applies to its reference, or the base range
/// of a root record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Op {
    Slice { slice: Bounds },
    Indexes { values: Vec<i64> },
}

/// A resolved `(start, stop, step)` triple; a null or missing stop is
/// unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub start: i64,
    #[serde(default)]
    pub stop: Option<i64>,
    pub step: i64,
}

impl From<Range> for Bounds {
    fn from(range: Range) -> Self {
        Self {
            start: range.start(),
            stop: range.stop(),
            step: range.step(),
        }
    }
}

impl TryFrom<Bounds> for Range {
    type Error = IndicesError;

    fn try_from(bounds: Bounds) -> Result<Self, Self::Error> {
        Range::new(bounds.start, bounds.stop, bounds.step)
    }
}

/// `CodecOpts` controls what [`Indices::from_json_with`] accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecOpts {
    /// Reject records nested deeper than this many `ref`s.
    pub max_depth: usize,

    /// Accept a root `indexes` record, decoding it as a rootless
    /// selection.
    pub allow_rootless: bool,
}

impl CodecOpts {
    // Accept anything that describes a view.
    pub fn lenient() -> Self {
        Self {
            max_depth: usize::MAX,
            allow_rootless: true,
        }
    }

    // Only accept bound views of bounded depth.
    pub fn strict() -> Self {
        Self {
            max_depth: 64,
            allow_rootless: false,
        }
    }
}

impl Default for CodecOpts {
    fn default() -> Self {
        Self::lenient()
    }
}

fn malformed(reason: String) -> IndicesError {
    tracing::debug!(%reason, "rejected record");
    IndicesError::MalformedRecord { reason }
}

impl Indices {
    /// Encodes this view as a nested [`Record`].
    pub fn for_json(&self) -> Record {
        let (op, parent) = match self.node() {
            Node::Base(range) => (
                Op::Slice {
                    slice: (*range).into(),
                },
                None,
            ),
            Node::Slice { parent, range } => (
                Op::Slice {
                    slice: (*range).into(),
                },
                Some(parent),
            ),
            Node::Select { parent, positions } => (
                Op::Indexes {
                    values: positions.clone(),
                },
                parent.as_ref(),
            ),
            Node::Reversed { parent, len } => (
                Op::Slice {
                    slice: Range::reversal(*len).into(),
                },
                Some(parent),
            ),
        };
        Record {
            slice: op,
            reference: parent.map(|parent| Box::new(parent.for_json())),
        }
    }

    /// Decodes a view from a [`Record`] with [`CodecOpts::lenient`].
    pub fn from_json(record: &Record) -> Result<Indices, IndicesError> {
        Self::from_json_with(record, &CodecOpts::lenient())
    }

    /// Decodes a view from a [`Record`], rebuilding it bottom-up.
    pub fn from_json_with(record: &Record, opts: &CodecOpts) -> Result<Indices, IndicesError> {
        decode(record, opts, 0)
    }
}

fn decode(record: &Record, opts: &CodecOpts, depth: usize) -> Result<Indices, IndicesError> {
    if depth > opts.max_depth {
        return Err(malformed(format!(
            "record nested deeper than {}",
            opts.max_depth
        )));
    }

    let Some(reference) = &record.reference else {
        return match &record.slice {
            Op::Slice { slice } => Ok(Indices::from(Range::try_from(*slice)?)),
            Op::Indexes { values } if opts.allow_rootless => {
                Ok(Indices::from_positions(values.iter().copied()))
            }
            Op::Indexes { .. } => Err(malformed(
                "root record selects positions without a reference range".to_string(),
            )),
        };
    };

    let parent = decode(reference, opts, depth + 1)?;
    let view = match &record.slice {
        Op::Slice { slice } => {
            let local = Range::try_from(*slice)?;
            if !local.fits(parent.extent()) {
                return Err(malformed(format!(
                    "slice {local} does not fit its reference {parent}"
                )));
            }
            parent.derive_range(local)
        }
        Op::Indexes { values } => parent.select(values.iter().copied()),
    };
    tracing::trace!(depth, %view, "decoded record");
    Ok(view)
}

impl Serialize for Indices {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.for_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Indices {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let record = Record::deserialize(deserializer)?;
        Indices::from_json(&record).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;
    use serde_json::json;
    use tracing_test::traced_test;

    use super::*;
    use crate::Slice;

    fn json_data() -> Value {
        json!({
            "slice": {"type": "slice", "slice": {"start": 0, "stop": 2, "step": 1}},
            "ref": {
                "slice": {"type": "indexes", "values": [1, 3, 5, 7]},
                "ref": {
                    "slice": {"type": "indexes", "values": [10, 20, 40, 50, 80, 120, 150]},
                    "ref": {
                        "slice": {
                            "type": "slice",
                            "slice": {"start": 0, "stop": 5000, "step": 10},
                        }
                    },
                },
            },
        })
    }

    fn chain() -> Indices {
        Indices::new()
            .indices(Slice::new(None, Some(5000), Some(10)))
            .unwrap()
            .select([10, 20, 40, 50, 80, 120, 150])
            .select([1, 3, 5, 7])
            .indices(..2)
            .unwrap()
    }

    fn record(value: Value) -> Record {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_for_json() {
        let encoded = serde_json::to_value(chain().for_json()).unwrap();
        assert_eq!(encoded, json_data());
        assert_eq!(serde_json::to_value(chain()).unwrap(), json_data());
    }

    #[test]
    fn test_from_json() {
        let view = Indices::from_json(&record(json_data())).unwrap();
        assert_eq!(serde_json::to_value(view.for_json()).unwrap(), json_data());
        assert_elements!(view, [200, 500]);
        assert_eq!(view, chain());

        let view: Indices = serde_json::from_value(json_data()).unwrap();
        assert_structurally_eq!(view, chain());
    }

    #[test]
    fn test_unbounded_base() {
        let view = Indices::range(10, None, 20).unwrap();
        let encoded = serde_json::to_value(&view).unwrap();
        assert_eq!(
            encoded,
            json!({"slice": {"type": "slice", "slice": {"start": 10, "stop": null, "step": 20}}})
        );
        let decoded: Indices = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, view);

        // A missing stop is unbounded too.
        let decoded: Indices =
            serde_json::from_value(json!({"slice": {"type": "slice", "slice": {"start": 10, "step": 20}}}))
                .unwrap();
        assert_eq!(decoded, view);
    }

    #[test]
    fn test_reversed_round_trip() {
        let view = Indices::range(0, Some(100), 2)
            .unwrap()
            .select([10, 20, 45])
            .reverse()
            .unwrap();
        let record = view.for_json();
        assert_eq!(
            serde_json::to_value(&record.slice).unwrap(),
            json!({"type": "slice", "slice": {"start": 2, "stop": -1, "step": -1}})
        );
        let decoded = Indices::from_json(&record).unwrap();
        assert_elements!(decoded, [90, 40, 20]);
        assert_eq!(decoded, view);
    }

    #[test]
    fn test_slice_onto_base_collapses() {
        let decoded = Indices::from_json(&record(json!({
            "slice": {"type": "slice", "slice": {"start": 1, "stop": 4, "step": 1}},
            "ref": {"slice": {"type": "slice", "slice": {"start": 10, "stop": 100, "step": 10}}},
        })))
        .unwrap();
        assert!(decoded.reference().is_none());
        assert_eq!(decoded.slice(), Some(Range::new(20, Some(50), 10).unwrap()));
    }

    #[test]
    fn test_rootless() {
        let rootless = Indices::from_positions([0, 1, 2]);
        let encoded = serde_json::to_value(&rootless).unwrap();
        assert_eq!(encoded, json!({"slice": {"type": "indexes", "values": [0, 1, 2]}}));

        let decoded = Indices::from_json(&record(encoded.clone())).unwrap();
        assert!(matches!(decoded.to_vec(), Err(IndicesError::NoRangeFound)));
        assert_structurally_eq!(decoded, rootless);

        let err = Indices::from_json_with(&record(encoded), &CodecOpts::strict()).unwrap_err();
        assert!(matches!(err, IndicesError::MalformedRecord { .. }), "Unexpected: {:?}", err);
    }

    #[test]
    fn test_invalid_records() {
        let err = Indices::from_json(&record(json!({
            "slice": {"type": "slice", "slice": {"start": 0, "stop": 10, "step": 0}},
        })))
        .unwrap_err();
        assert!(matches!(err, IndicesError::InvalidRange { .. }), "Unexpected: {:?}", err);

        let err = Indices::from_json(&record(json!({
            "slice": {"type": "slice", "slice": {"start": 0, "stop": 20, "step": 1}},
            "ref": {"slice": {"type": "indexes", "values": [1, 2]}, "ref": {
                "slice": {"type": "slice", "slice": {"start": 0, "stop": 10, "step": 1}},
            }},
        })))
        .unwrap_err();
        assert!(matches!(err, IndicesError::MalformedRecord { .. }), "Unexpected: {:?}", err);

        assert!(
            serde_json::from_value::<Indices>(json!({"slice": {"type": "reverse"}})).is_err()
        );
        assert!(serde_json::from_value::<Indices>(json!({"ref": null})).is_err());
    }

    #[test]
    fn test_records_at_i64_limits() {
        for (start, stop, step) in [
            (i64::MIN, i64::MAX, 1),
            (i64::MAX, i64::MIN, -1),
            (0, i64::MAX, i64::MAX - 1),
            (i64::MIN, i64::MIN + 2, 1),
        ] {
            let err = Indices::from_json(&record(json!({
                "slice": {"type": "slice", "slice": {"start": start, "stop": stop, "step": step}},
                "ref": {"slice": {"type": "indexes", "values": [1, 2]}, "ref": {
                    "slice": {"type": "slice", "slice": {"start": 0, "stop": 10, "step": 1}},
                }},
            })))
            .unwrap_err();
            assert!(matches!(err, IndicesError::MalformedRecord { .. }), "Unexpected: {:?}", err);
        }

        // A slice too wide to collapse onto its base still decodes.
        let view = Indices::from_json(&record(json!({
            "slice": {"type": "slice", "slice": {"start": 0, "stop": null, "step": 2}},
            "ref": {"slice": {"type": "slice", "slice": {"start": 0, "stop": null, "step": i64::MAX}}},
        })))
        .unwrap();
        assert!(view.reference().is_some());
        assert_eq!(view.get(0).unwrap(), 0);
    }

    #[test]
    fn test_max_depth() {
        let opts = CodecOpts {
            max_depth: 2,
            ..CodecOpts::lenient()
        };
        let err = Indices::from_json_with(&chain().for_json(), &opts).unwrap_err();
        assert!(matches!(err, IndicesError::MalformedRecord { .. }), "Unexpected: {:?}", err);
        assert!(Indices::from_json_with(&chain().for_json(), &CodecOpts::strict()).is_ok());
    }

    #[traced_test]
    #[test]
    fn test_decode_logs_rejections() {
        let encoded = serde_json::to_value(Indices::from_positions([1])).unwrap();
        assert!(Indices::from_json_with(&record(encoded), &CodecOpts::strict()).is_err());
        assert!(logs_contain("rejected record"));
    }
}
