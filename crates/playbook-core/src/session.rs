use crate::config::ActiveJourneyPolicy;
use crate::coordinator::{CompletionOutcome, Coordinator};
use crate::error::Result;
use crate::journey::Journey;
use crate::progress::{self, Snapshot};
use crate::store::StepStore;
use crate::template::{PlaybookItem, PlaybookTemplate};
use crate::types::StepStatus;
use serde::Serialize;

// ---------------------------------------------------------------------------
// PlaybookDetails
// ---------------------------------------------------------------------------

/// Everything a caller needs to render one user's view of a playbook.
#[derive(Debug, Clone, Serialize)]
pub struct StepDetail {
    pub item: PlaybookItem,
    pub status: StepStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaybookDetails {
    pub template: PlaybookTemplate,
    pub steps: Vec<StepDetail>,
    /// Absent until the user records their first response.
    pub journey: Option<Journey>,
    pub progress: Snapshot,
    pub next_available: Option<PlaybookItem>,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Public entry point for UI and onboarding callers. Reads compose the
/// store and the calculator; the one write goes through the coordinator.
/// Errors pass through unmodified, with no translation layer.
pub struct Session<S: StepStore> {
    coordinator: Coordinator<S>,
    active_policy: ActiveJourneyPolicy,
}

impl<S: StepStore> Session<S> {
    pub fn new(store: S) -> Self {
        Self::with_policy(store, ActiveJourneyPolicy::default())
    }

    pub fn with_policy(store: S, active_policy: ActiveJourneyPolicy) -> Self {
        Self {
            coordinator: Coordinator::new(store),
            active_policy,
        }
    }

    fn store(&self) -> &S {
        self.coordinator.store()
    }

    /// Assemble the display-ready view of `playbook` for `user_id`.
    pub fn playbook_details(&self, user_id: &str, playbook: &str) -> Result<PlaybookDetails> {
        let template = self.store().get_template(playbook)?;
        let journey = self.store().load_journey(user_id, playbook)?;

        let completed = journey
            .as_ref()
            .map(|j| j.completed_step_ids())
            .unwrap_or_default();
        let snapshot = progress::evaluate(&template.items, &completed);

        let steps = snapshot
            .steps
            .iter()
            .filter_map(|s| {
                template.item(&s.step_id).map(|item| StepDetail {
                    item: item.clone(),
                    status: s.status,
                })
            })
            .collect();
        let next_available = snapshot
            .next_available
            .as_deref()
            .and_then(|id| template.item(id).cloned());

        Ok(PlaybookDetails {
            template,
            steps,
            journey,
            progress: snapshot,
            next_available,
        })
    }

    /// Complete (or amend) a step. Delegates to the coordinator.
    pub fn complete_step(
        &self,
        user_id: &str,
        playbook: &str,
        step_id: &str,
        response: serde_json::Value,
    ) -> Result<CompletionOutcome> {
        self.coordinator
            .complete_step(user_id, playbook, step_id, response)
    }

    /// The journey the user should resume, or `None` when nothing is in
    /// progress. With several in-progress journeys the configured policy
    /// picks one.
    pub fn active_journey(&self, user_id: &str) -> Result<Option<Journey>> {
        let mut in_progress: Vec<Journey> = self
            .store()
            .list_journeys(user_id)?
            .into_iter()
            .filter(|j| j.is_in_progress())
            .collect();

        in_progress.sort_by_key(|j| j.started_at);
        let picked = match self.active_policy {
            ActiveJourneyPolicy::MostRecentlyStarted => in_progress.pop(),
            ActiveJourneyPolicy::OldestStarted => {
                if in_progress.is_empty() {
                    None
                } else {
                    Some(in_progress.remove(0))
                }
            }
        };
        Ok(picked)
    }

    /// All journeys for a user, whatever their status.
    pub fn journeys(&self, user_id: &str) -> Result<Vec<Journey>> {
        self.store().list_journeys(user_id)
    }

    /// Template summaries for listing screens.
    pub fn playbooks(&self) -> Result<Vec<PlaybookTemplate>> {
        self.store().list_templates()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
