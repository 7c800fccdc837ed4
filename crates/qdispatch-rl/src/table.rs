//! Sparse value table: state -> per-worker value estimates

use std::collections::HashMap;

use crate::state::State;

/// Per-worker value estimates keyed by [`State`].
///
/// Rows for unseen states read as all-zero and are only materialized through
/// [`ValueTable::row_mut`]. Rows are never removed. Creation order is kept so
/// that the most recently created rows can be listed.
#[derive(Debug, Clone)]
pub struct ValueTable {
    rows: HashMap<State, Vec<f64>>,
    order: Vec<State>,
    num_workers: usize,
}

impl ValueTable {
    pub fn new(num_workers: usize) -> Self {
        Self {
            rows: HashMap::new(),
            order: Vec::new(),
            num_workers,
        }
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Number of materialized rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains(&self, state: &State) -> bool {
        self.rows.contains_key(state)
    }

    /// Materialized row for a state, if any
    pub fn get(&self, state: &State) -> Option<&[f64]> {
        self.rows.get(state).map(Vec::as_slice)
    }

    /// Values for a state without inserting; zeros when unseen
    pub fn q_values(&self, state: &State) -> Vec<f64> {
        self.rows
            .get(state)
            .cloned()
            .unwrap_or_else(|| vec![0.0; self.num_workers])
    }

    /// Value of one state-action pair; zero when unseen
    pub fn value(&self, state: &State, action: usize) -> f64 {
        self.rows
            .get(state)
            .and_then(|row| row.get(action).copied())
            .unwrap_or(0.0)
    }

    /// Largest value in a state's row; zero when unseen
    pub fn max_value(&self, state: &State) -> f64 {
        match self.rows.get(state) {
            Some(row) => row.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            None => 0.0,
        }
    }

    /// Get the row for a state, inserting an all-zero row first if absent
    pub fn row_mut(&mut self, state: &State) -> &mut [f64] {
        if !self.rows.contains_key(state) {
            self.order.push(state.clone());
        }
        let num_workers = self.num_workers;
        self.rows
            .entry(state.clone())
            .or_insert_with(|| vec![0.0; num_workers])
    }

    /// Rows in creation order
    pub fn iter(&self) -> impl Iterator<Item = (&State, &[f64])> + '_ {
        self.order
            .iter()
            .filter_map(|state| self.rows.get(state).map(|row| (state, row.as_slice())))
    }

    /// The `limit` most recently created rows, oldest first
    pub fn recent(&self, limit: usize) -> impl Iterator<Item = (&State, &[f64])> + '_ {
        let skip = self.order.len().saturating_sub(limit);
        self.iter().skip(skip)
    }
}
