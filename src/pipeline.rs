//! Filter-and-sort pipeline producing the rows to display.

use serde::Serialize;
use tracing::debug;

use crate::filter::FilterCriteria;
use crate::record::ConnectionRecord;

/// The records to display, in display order, plus their count.
///
/// Borrows from the parsed record set; nothing is copied or modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordView<'a> {
    pub count: usize,
    pub records: Vec<&'a ConnectionRecord>,
}

impl<'a> RecordView<'a> {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a ConnectionRecord> + '_ {
        self.records.iter().copied()
    }
}

/// Applies [`FilterCriteria`] to a record set and orders the result.
#[derive(Debug, Clone, Default)]
pub struct RecordPipeline {
    criteria: FilterCriteria,
}

impl RecordPipeline {
    pub fn new(criteria: FilterCriteria) -> Self {
        Self { criteria }
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    /// Filter `records` and sort them by local port.
    ///
    /// The sort is stable: records sharing a port keep their input order.
    /// The view is rebuilt from scratch on every call.
    pub fn run<'a>(&self, records: &'a [ConnectionRecord]) -> RecordView<'a> {
        let mut selected: Vec<&ConnectionRecord> = records
            .iter()
            .filter(|record| self.criteria.matches(record))
            .collect();
        selected.sort_by_key(|record| record.local_port);

        debug!(
            "Pipeline kept {} of {} records",
            selected.len(),
            records.len()
        );

        RecordView {
            count: selected.len(),
            records: selected,
        }
    }
}
