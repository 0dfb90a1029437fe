use std::sync::Arc;

use single_utilities::traits::FloatOpsTS;

use super::{AggregationMode, ComputeOptions, compute_differential_expression};
use crate::config::DiffExprConfig;
use crate::data::NumericMatrixSource;
use crate::error::{DiffExprError, Result};
use crate::progress::ProgressReporter;
use crate::result::ResultTable;
use crate::selection::{PersistedState, Selection, SelectionMapping};
use crate::statistics::range::DimensionRangeCache;

/// Freshness of the session's result table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComputeState {
    /// Nothing computed yet.
    #[default]
    Idle,
    Computing,
    /// The result matches the current selections and options.
    UpToDate,
    /// Selections or options changed since the result was computed.
    OutDated,
    /// The last computation failed; the previous result, if any, is kept.
    Error,
}

/// Two selections, the normalization flag and the most recent result of an interactive view.
///
/// Computations run synchronously; callers serialize triggers. A new result replaces the old
/// one as a whole.
#[derive(Debug, Clone, Default)]
pub struct DiffExprSession {
    selection_a: Selection,
    selection_b: Selection,
    options: ComputeOptions,
    state: ComputeState,
    result: Option<Arc<ResultTable>>,
    ranges: DimensionRangeCache,
}

impl DiffExprSession {
    pub fn new(config: &DiffExprConfig) -> Self {
        DiffExprSession {
            options: ComputeOptions::from(config),
            ..DiffExprSession::default()
        }
    }

    /// Restore selections and the normalization flag saved with [`to_state`](Self::to_state).
    pub fn from_state(state: PersistedState, config: &DiffExprConfig) -> Self {
        let mut session = DiffExprSession::new(config);
        session.selection_a = state.selection_a;
        session.selection_b = state.selection_b;
        session.options.normalize = state.normalize;
        session
    }

    pub fn to_state(&self) -> PersistedState {
        PersistedState {
            selection_a: self.selection_a.clone(),
            selection_b: self.selection_b.clone(),
            normalize: self.options.normalize,
        }
    }

    pub fn state(&self) -> ComputeState {
        self.state
    }

    pub fn selection_a(&self) -> &Selection {
        &self.selection_a
    }

    pub fn selection_b(&self) -> &Selection {
        &self.selection_b
    }

    pub fn options(&self) -> &ComputeOptions {
        &self.options
    }

    pub fn normalize(&self) -> bool {
        self.options.normalize
    }

    /// Whether both selections are non-empty, i.e. whether [`compute`](Self::compute) can run.
    pub fn can_compute(&self) -> bool {
        !self.selection_a.is_empty() && !self.selection_b.is_empty()
    }

    pub fn result(&self) -> Option<Arc<ResultTable>> {
        self.result.clone()
    }

    pub fn set_selection_a(&mut self, selection: Selection) {
        log::debug!("Selection A set to {} rows", selection.len());
        self.selection_a = selection;
        self.mark_outdated();
    }

    pub fn set_selection_b(&mut self, selection: Selection) {
        log::debug!("Selection B set to {} rows", selection.len());
        self.selection_b = selection;
        self.mark_outdated();
    }

    /// Capture selection A from a selection made in another dataset.
    pub fn capture_selection_a_through(&mut self, mapping: &SelectionMapping, source: &Selection) {
        self.set_selection_a(mapping.map_selection(source));
    }

    /// Capture selection B from a selection made in another dataset.
    pub fn capture_selection_b_through(&mut self, mapping: &SelectionMapping, source: &Selection) {
        self.set_selection_b(mapping.map_selection(source));
    }

    pub fn set_normalize(&mut self, normalize: bool) {
        if self.options.normalize != normalize {
            self.options.normalize = normalize;
            self.mark_outdated();
        }
    }

    /// Forget cached dimension ranges, e.g. after the dataset was replaced.
    pub fn invalidate_ranges(&mut self) {
        self.ranges.invalidate();
        self.mark_outdated();
    }

    /// Recompute the result table from the current selections.
    ///
    /// An empty selection refuses the computation and leaves state and result untouched. Any
    /// other failure moves the session to [`ComputeState::Error`] and keeps the previous result.
    pub fn compute<T, S>(
        &mut self,
        dataset: &mut S,
        mode: AggregationMode<'_>,
        progress: &dyn ProgressReporter,
    ) -> Result<Arc<ResultTable>>
    where
        T: FloatOpsTS,
        S: NumericMatrixSource<T>,
    {
        let previous = self.state;
        self.state = ComputeState::Computing;

        let outcome = compute_differential_expression(
            dataset,
            &self.selection_a,
            &self.selection_b,
            mode,
            &self.options,
            &mut self.ranges,
            progress,
        );

        match outcome {
            Ok(table) => {
                let table = Arc::new(table);
                self.result = Some(Arc::clone(&table));
                self.state = ComputeState::UpToDate;
                Ok(table)
            }
            Err(error @ DiffExprError::EmptySelection { .. }) => {
                log::debug!("Not computing: {}", error);
                self.state = previous;
                Err(error)
            }
            Err(error) => {
                log::warn!("Differential expression computation failed: {}", error);
                self.state = ComputeState::Error;
                Err(error)
            }
        }
    }

    fn mark_outdated(&mut self) {
        if self.state != ComputeState::Idle {
            self.state = ComputeState::OutDated;
        }
    }
}
