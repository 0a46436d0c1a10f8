//! Run-length coding shared by the lossy tiers.
//!
//! A sequence is stored as ordered `(count, value)` runs. In JSON a run is a
//! two-element array `[count, value]`.

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};

/// Largest count a single run may carry; longer stretches split into
/// several runs of the same value.
pub const MAX_RUN: u32 = i32::MAX as u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run<T> {
    pub count: u32,
    pub value: T,
}

impl<T> Run<T> {
    pub const fn new(count: u32, value: T) -> Self {
        Self { count, value }
    }
}

impl<T: Serialize> Serialize for Run<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.count, &self.value).serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Run<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (count, value) = <(u32, T)>::deserialize(deserializer)?;
        Ok(Self { count, value })
    }
}

pub fn encode<T: Copy + PartialEq>(values: &[T]) -> Vec<Run<T>> {
    encode_bounded(values, MAX_RUN)
}

fn encode_bounded<T: Copy + PartialEq>(values: &[T], max_run: u32) -> Vec<Run<T>> {
    let mut runs = Vec::new();
    let Some((&first, rest)) = values.split_first() else {
        return runs;
    };

    let mut current = Run::new(1, first);
    for &value in rest {
        if value == current.value && current.count < max_run {
            current.count += 1;
        } else {
            runs.push(current);
            current = Run::new(1, value);
        }
    }
    runs.push(current);
    runs
}

/// Expands runs in order. Performs no length check; callers that expect a
/// fixed total compare [`total_len`] first.
pub fn decode<T: Copy>(runs: &[Run<T>]) -> Vec<T> {
    let capacity = usize::try_from(total_len(runs)).unwrap_or(0);
    let mut out = Vec::with_capacity(capacity);
    for run in runs {
        out.extend(std::iter::repeat_n(run.value, run.count as usize));
    }
    out
}

#[inline]
pub fn total_len<T>(runs: &[Run<T>]) -> u64 {
    runs.iter().map(|r| u64::from(r.count)).sum()
}
