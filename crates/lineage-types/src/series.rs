//! Chains and time series produced by progenitor traversal.
//!
//! A [`Chain`] is what the walker accumulates: samples in visitation order, newest first.
//! A [`TimeSeries`] is what leaves the engine: the same samples, oldest first, split into
//! parallel columns. The only way to build a series is [`TimeSeries::from_chain`], which is
//! what keeps every column the same length.

use serde::{Deserialize, Serialize};

use crate::record::ObjectKey;

/// One visited record: its key, the requested field values (in request order) and the
/// redshift of its snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub key: ObjectKey,
    pub values: Vec<Option<f64>>,
    pub redshift: Option<f64>,
}

/// Samples in visitation order (root first, earliest progenitor last).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chain {
    samples: Vec<Sample>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Most recently appended sample (the earliest snapshot visited so far).
    pub fn last_mut(&mut self) -> Option<&mut Sample> {
        self.samples.last_mut()
    }

    /// Keys in the order they were visited.
    pub fn visit_order(&self) -> Vec<ObjectKey> {
        self.samples.iter().map(|s| s.key).collect()
    }
}

/// Aligned chronological columns for one root object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    root: ObjectKey,
    fields: Vec<String>,
    snapshots: Vec<i64>,
    object_ids: Vec<i64>,
    redshift: Vec<Option<f64>>,
    columns: Vec<Vec<Option<f64>>>,
}

impl TimeSeries {
    /// Empty series for `root`: "no data", not an error.
    pub fn empty(root: ObjectKey, fields: Vec<String>) -> Self {
        Self::from_chain(root, fields, Chain::new())
    }

    /// Reverse a chain into chronological order.
    ///
    /// Samples carrying fewer values than `fields` are padded with `None`.
    pub fn from_chain(root: ObjectKey, fields: Vec<String>, chain: Chain) -> Self {
        let n = chain.len();
        let mut snapshots = Vec::with_capacity(n);
        let mut object_ids = Vec::with_capacity(n);
        let mut redshift = Vec::with_capacity(n);
        let mut columns: Vec<Vec<Option<f64>>> =
            fields.iter().map(|_| Vec::with_capacity(n)).collect();

        for sample in chain.samples.into_iter().rev() {
            snapshots.push(sample.key.snapshot);
            object_ids.push(sample.key.id);
            redshift.push(sample.redshift);
            for (i, column) in columns.iter_mut().enumerate() {
                column.push(sample.values.get(i).copied().flatten());
            }
        }

        Self {
            root,
            fields,
            snapshots,
            object_ids,
            redshift,
            columns,
        }
    }

    /// Undo [`TimeSeries::from_chain`]: back to visitation order.
    pub fn into_chain(self) -> Chain {
        let samples = (0..self.len())
            .rev()
            .filter_map(|i| self.sample(i))
            .collect();
        Chain { samples }
    }

    pub fn root(&self) -> ObjectKey {
        self.root
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn snapshots(&self) -> &[i64] {
        &self.snapshots
    }

    pub fn object_ids(&self) -> &[i64] {
        &self.object_ids
    }

    pub fn redshift(&self) -> &[Option<f64>] {
        &self.redshift
    }

    /// Column for a requested field, or `None` if the field was not requested.
    pub fn column(&self, field: &str) -> Option<&[Option<f64>]> {
        let idx = self.fields.iter().position(|f| f == field)?;
        self.columns.get(idx).map(Vec::as_slice)
    }

    /// Row `i` in chronological order.
    pub fn sample(&self, i: usize) -> Option<Sample> {
        let snapshot = *self.snapshots.get(i)?;
        let id = *self.object_ids.get(i)?;
        Some(Sample {
            key: ObjectKey::new(snapshot, id),
            values: self.columns.iter().map(|c| c.get(i).copied().flatten()).collect(),
            redshift: self.redshift.get(i).copied().flatten(),
        })
    }

    pub fn samples(&self) -> impl Iterator<Item = Sample> + '_ {
        (0..self.len()).filter_map(move |i| self.sample(i))
    }

    /// Every column has the same length as the redshift column.
    pub fn is_aligned(&self) -> bool {
        let n = self.redshift.len();
        self.snapshots.len() == n
            && self.object_ids.len() == n
            && self.columns.len() == self.fields.len()
            && self.columns.iter().all(|c| c.len() == n)
    }
}
