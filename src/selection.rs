//! Row selections, selection mappings between datasets and the persisted session state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Ordered row indices of one user selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selection {
    indices: Vec<usize>,
}

impl Selection {
    pub fn new(indices: Vec<usize>) -> Self {
        Selection { indices }
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

impl From<Vec<usize>> for Selection {
    fn from(indices: Vec<usize>) -> Self {
        Selection::new(indices)
    }
}

impl FromIterator<usize> for Selection {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Selection::new(iter.into_iter().collect())
    }
}

/// Maps rows of a source dataset onto rows of a target dataset.
///
/// Used to capture a selection made in another (for example derived) dataset and express it
/// in terms of the dataset the statistics are computed on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionMapping {
    map: BTreeMap<usize, Vec<usize>>,
}

impl SelectionMapping {
    pub fn new(map: BTreeMap<usize, Vec<usize>>) -> Self {
        SelectionMapping { map }
    }

    pub fn insert(&mut self, source: usize, targets: Vec<usize>) {
        self.map.insert(source, targets);
    }

    pub fn targets(&self, source: usize) -> Option<&[usize]> {
        self.map.get(&source).map(Vec::as_slice)
    }

    /// Whether every row of a target with `num_target_rows` rows is hit by some source row.
    ///
    /// Target indices outside the target are ignored.
    pub fn is_surjective(&self, num_target_rows: usize) -> bool {
        let mut found = vec![false; num_target_rows];
        let mut count = 0usize;
        for &target in self.map.values().flatten() {
            if target < num_target_rows && !found[target] {
                found[target] = true;
                count += 1;
                if count == num_target_rows {
                    return true;
                }
            }
        }
        count == num_target_rows
    }

    /// Sorted, de-duplicated target rows of every mapped source row in `selection`.
    pub fn map_selection(&self, selection: &Selection) -> Selection {
        let mut targets: Vec<usize> = selection
            .indices()
            .iter()
            .filter_map(|source| self.map.get(source))
            .flatten()
            .copied()
            .collect();
        targets.sort_unstable();
        targets.dedup();
        Selection::new(targets)
    }
}

/// Session state that survives a save / restore cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    pub selection_a: Selection,
    pub selection_b: Selection,
    pub normalize: bool,
}

impl PersistedState {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
