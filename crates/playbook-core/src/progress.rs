//! Pure progress evaluation over a template's items and the set of
//! completed step ids. No I/O, no clock: the same input always produces the
//! same snapshot.

use crate::template::PlaybookItem;
use crate::types::StepStatus;
use serde::Serialize;
use std::collections::HashSet;

// ---------------------------------------------------------------------------
// StepState / Snapshot
// ---------------------------------------------------------------------------

/// Computed status of one item, in order_index order.
#[derive(Debug, Clone, Serialize)]
pub struct StepState {
    pub step_id: String,
    pub order_index: u32,
    pub required: bool,
    pub status: StepStatus,
}

/// The full derived view of a journey's progress.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub steps: Vec<StepState>,
    /// `100 × completed_required / total_required`, rounded to one decimal.
    /// A playbook with no required items is vacuously complete (100).
    pub percentage: f64,
    pub completed_required: usize,
    pub total_required: usize,
    /// Lowest-order item whose status is `available`; `None` once everything
    /// is completed.
    pub next_available: Option<String>,
}

impl Snapshot {
    pub fn is_complete(&self) -> bool {
        self.percentage >= 100.0
    }

    #[cfg(test)]
    pub(crate) fn for_test(percentage: f64) -> Self {
        Self {
            steps: Vec::new(),
            percentage,
            completed_required: 0,
            total_required: 0,
            next_available: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Compute per-step statuses and the overall percentage.
///
/// Items are re-sorted by `order_index` here; the caller's ordering is never
/// trusted. Status rules:
/// - completed: a response exists for the step.
/// - available: every preceding *required* step is completed, or the step
///   has the lowest order_index (the first step is always reachable).
/// - blocked: otherwise. Optional steps never block anything.
pub fn evaluate(items: &[PlaybookItem], completed: &HashSet<String>) -> Snapshot {
    let mut ordered: Vec<&PlaybookItem> = items.iter().collect();
    ordered.sort_by_key(|i| i.order_index);

    let total_required = ordered.iter().filter(|i| i.required).count();
    let completed_required = ordered
        .iter()
        .filter(|i| i.required && completed.contains(&i.id))
        .count();

    let mut steps = Vec::with_capacity(ordered.len());
    let mut required_gate_open = true;
    let mut next_available: Option<String> = None;

    for (pos, item) in ordered.iter().enumerate() {
        let status = if completed.contains(&item.id) {
            StepStatus::Completed
        } else if pos == 0 || required_gate_open {
            StepStatus::Available
        } else {
            StepStatus::Blocked
        };

        if status == StepStatus::Available && next_available.is_none() {
            next_available = Some(item.id.clone());
        }

        // A required step left incomplete closes the gate for everything
        // after it; optional steps never participate.
        if item.required && !completed.contains(&item.id) {
            required_gate_open = false;
        }

        steps.push(StepState {
            step_id: item.id.clone(),
            order_index: item.order_index,
            required: item.required,
            status,
        });
    }

    let percentage = if total_required == 0 {
        100.0
    } else {
        round1(100.0 * completed_required as f64 / total_required as f64)
    };

    Snapshot {
        steps,
        percentage,
        completed_required,
        total_required,
        next_available,
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
