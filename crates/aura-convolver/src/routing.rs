//! Sparse input -> output filter routing
//!
//! A routing entry connects an input channel to an output channel through
//! a filter slot with a linear gain. The table is keyed by
//! `(output, input)` so one output's entries form a contiguous range;
//! entry identity is `(input, output)` and re-inserting replaces the
//! previous filter/gain pair.

use std::collections::BTreeMap;
use std::ops::Deref;

use aura_core::Gain;
use serde::{Deserialize, Serialize};

use crate::{ConvolverError, ConvolverResult};

fn unit_gain() -> Gain {
    1.0
}

/// One routing point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterRouting {
    pub input: usize,
    pub output: usize,
    pub filter: usize,
    #[serde(default = "unit_gain")]
    pub gain: Gain,
}

impl FilterRouting {
    pub fn new(input: usize, output: usize, filter: usize, gain: Gain) -> Self {
        Self {
            input,
            output,
            filter,
            gain,
        }
    }
}

/// A bulk set of routing points, e.g. for construction or JSON import.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoutingList(pub Vec<FilterRouting>);

/// JSON form of one routing: every index may be a scalar or a sequence.
/// Sequences are zipped together, scalars broadcast:
/// `{"input": [0, 1], "output": 0, "filter": [2, 3], "gain": 0.5}`
/// expands to two entries.
#[derive(Deserialize)]
#[serde(untagged)]
enum IndexSpec {
    One(usize),
    Many(Vec<usize>),
}

impl IndexSpec {
    fn len(&self) -> usize {
        match self {
            IndexSpec::One(_) => 1,
            IndexSpec::Many(v) => v.len(),
        }
    }

    fn get(&self, idx: usize) -> usize {
        match self {
            IndexSpec::One(v) => *v,
            IndexSpec::Many(v) => v[idx],
        }
    }
}

#[derive(Deserialize)]
struct JsonRouting {
    input: IndexSpec,
    output: IndexSpec,
    filter: IndexSpec,
    #[serde(default = "unit_gain")]
    gain: Gain,
}

impl RoutingList {
    pub fn new(entries: Vec<FilterRouting>) -> Self {
        Self(entries)
    }

    /// Parse a JSON array of routing points, accepting scalar or
    /// index-sequence forms for the index fields.
    pub fn from_json(text: &str) -> ConvolverResult<Self> {
        let raw: Vec<JsonRouting> = serde_json::from_str(text)
            .map_err(|e| ConvolverError::InvalidArgument(format!("routing JSON: {e}")))?;
        let mut entries = Vec::new();
        for entry in &raw {
            let count = entry
                .input
                .len()
                .max(entry.output.len())
                .max(entry.filter.len());
            for field in [&entry.input, &entry.output, &entry.filter] {
                if field.len() != 1 && field.len() != count {
                    return Err(ConvolverError::InvalidArgument(
                        "routing JSON: index sequences must have matching lengths".into(),
                    ));
                }
            }
            for idx in 0..count {
                entries.push(FilterRouting {
                    input: entry.input.get(idx.min(entry.input.len() - 1)),
                    output: entry.output.get(idx.min(entry.output.len() - 1)),
                    filter: entry.filter.get(idx.min(entry.filter.len() - 1)),
                    gain: entry.gain,
                });
            }
        }
        Ok(Self(entries))
    }
}

impl Deref for RoutingList {
    type Target = [FilterRouting];

    fn deref(&self) -> &[FilterRouting] {
        &self.0
    }
}

impl From<Vec<FilterRouting>> for RoutingList {
    fn from(entries: Vec<FilterRouting>) -> Self {
        Self(entries)
    }
}

// ============ Routing Table ============

/// Map key ordered by output first, so per-output iteration is a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct RouteKey {
    output: usize,
    input: usize,
}

/// Stored per-route parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteParams {
    pub filter: usize,
    pub gain: Gain,
}

/// The sparse routing table used by the convolvers.
#[derive(Debug, Default)]
pub struct RoutingTable {
    entries: BTreeMap<RouteKey, RouteParams>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Insert a routing point, replacing any entry with the same
    /// `(input, output)` identity.
    pub fn set(&mut self, routing: FilterRouting) {
        self.entries.insert(
            RouteKey {
                output: routing.output,
                input: routing.input,
            },
            RouteParams {
                filter: routing.filter,
                gain: routing.gain,
            },
        );
    }

    /// Returns `true` if an entry existed and was removed.
    pub fn remove(&mut self, input: usize, output: usize) -> bool {
        self.entries.remove(&RouteKey { output, input }).is_some()
    }

    pub fn get(&self, input: usize, output: usize) -> Option<RouteParams> {
        self.entries.get(&RouteKey { output, input }).copied()
    }

    /// All entries, ordered by `(output, input)`.
    pub fn iter(&self) -> impl Iterator<Item = FilterRouting> + '_ {
        self.entries.iter().map(|(key, params)| FilterRouting {
            input: key.input,
            output: key.output,
            filter: params.filter,
            gain: params.gain,
        })
    }

    /// The entries feeding one output, as `(input, params)` pairs.
    pub fn entries_for_output(
        &self,
        output: usize,
    ) -> impl Iterator<Item = (usize, RouteParams)> + '_ {
        let from = RouteKey { output, input: 0 };
        let to = RouteKey {
            output,
            input: usize::MAX,
        };
        self.entries
            .range(from..=to)
            .map(|(key, params)| (key.input, *params))
    }
}
