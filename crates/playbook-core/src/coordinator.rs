use crate::error::{PlaybookError, Result};
use crate::journey::Journey;
use crate::progress;
use crate::store::StepStore;
use crate::template::PlaybookItem;
use crate::types::StepStatus;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Clock source, injectable so tests can pin time.
pub type Clock = fn() -> DateTime<Utc>;

// ---------------------------------------------------------------------------
// CompletionOutcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CompletionOutcome {
    pub journey: Journey,
    /// What the caller should present as the next thing to do.
    pub next_available: Option<PlaybookItem>,
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// The single write path for journey state: "user completes step X with
/// payload Y."
///
/// Completions of different steps of the same journey serialize on a
/// per-journey lock, so the persisted percentage always reflects every
/// response present at write time; the journey manifest itself is written in
/// one atomic replace, so the response and the recomputed progress land
/// together or not at all.
pub struct Coordinator<S: StepStore> {
    store: S,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    now: Clock,
}

impl<S: StepStore> Coordinator<S> {
    pub fn new(store: S) -> Self {
        Self::with_clock(store, Utc::now)
    }

    pub fn with_clock(store: S, now: Clock) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
            now,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Record a response for `step_id` and advance the journey.
    ///
    /// Fails with `UnknownStep` if the step is not part of the playbook and
    /// `StepBlocked` if its prerequisites are unmet; neither writes anything.
    /// Completing an already-completed step is an amendment: the response
    /// payload and timestamp are replaced, the percentage is unchanged, and a
    /// set `completed_at` stays set.
    pub fn complete_step(
        &self,
        user_id: &str,
        playbook: &str,
        step_id: &str,
        response: serde_json::Value,
    ) -> Result<CompletionOutcome> {
        let template = self.store.get_template(playbook)?;
        if template.item(step_id).is_none() {
            return Err(PlaybookError::UnknownStep {
                playbook: playbook.to_string(),
                step: step_id.to_string(),
            });
        }

        let guard = self.journey_lock(user_id, playbook);
        let _held = match guard.lock() {
            Ok(held) => held,
            // Poisoning means a prior caller panicked; on-disk state is unaffected.
            Err(poisoned) => poisoned.into_inner(),
        };

        let now = (self.now)();
        let mut journey = self
            .store
            .load_journey(user_id, playbook)?
            .unwrap_or_else(|| Journey::new(user_id, playbook, now));

        // Evaluate against the responses on disk before touching anything,
        // so a blocked attempt leaves no trace.
        let before = progress::evaluate(&template.items, &journey.completed_step_ids());
        let Some(status) = before
            .steps
            .iter()
            .find(|s| s.step_id == step_id)
            .map(|s| s.status)
        else {
            return Err(PlaybookError::UnknownStep {
                playbook: playbook.to_string(),
                step: step_id.to_string(),
            });
        };

        if status == StepStatus::Blocked {
            let missing = first_unmet_required(&template.items, &journey, step_id);
            return Err(PlaybookError::StepBlocked {
                step: step_id.to_string(),
                missing,
            });
        }

        journey.upsert_response(step_id, response, now);
        let after = progress::evaluate(&template.items, &journey.completed_step_ids());
        journey.apply_progress(&after, now);
        self.store.save_journey(&journey)?;

        tracing::debug!(
            user = user_id,
            playbook = playbook,
            step = step_id,
            percentage = journey.progress_percentage,
            "step completed"
        );

        let next_available = after
            .next_available
            .as_deref()
            .and_then(|id| template.item(id).cloned());

        Ok(CompletionOutcome {
            journey,
            next_available,
        })
    }

    fn journey_lock(&self, user_id: &str, playbook: &str) -> Arc<Mutex<()>> {
        let key = format!("{user_id}/{playbook}");
        let mut locks = match self.locks.lock() {
            Ok(locks) => locks,
            Err(poisoned) => poisoned.into_inner(),
        };
        locks.entry(key).or_default().clone()
    }
}

/// The incomplete required step with the lowest order_index preceding
/// `step_id`, i.e. the one the caller should do first.
fn first_unmet_required(items: &[PlaybookItem], journey: &Journey, step_id: &str) -> String {
    let completed = journey.completed_step_ids();
    let mut ordered: Vec<&PlaybookItem> = items.iter().collect();
    ordered.sort_by_key(|i| i.order_index);

    ordered
        .iter()
        .take_while(|i| i.id != step_id)
        .find(|i| i.required && !completed.contains(&i.id))
        .map(|i| i.id.clone())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FileStore;
    use crate::template::PlaybookTemplate;
    use crate::types::JourneyStatus;
    use serde_json::json;
    use tempfile::TempDir;

    fn fixed_now() -> DateTime<Utc> {
        "2026-03-01T12:00:00Z".parse().unwrap()
    }

    fn setup(dir: &TempDir, items: Vec<PlaybookItem>) -> Coordinator<FileStore> {
        let store = FileStore::new(dir.path());
        store.scaffold().unwrap();
        store
            .put_template(PlaybookTemplate::new("onboarding", "Onboarding", items))
            .unwrap();
        Coordinator::with_clock(store, fixed_now)
    }

    fn three_required() -> Vec<PlaybookItem> {
        vec![
            PlaybookItem::new("s1", "One", 1),
            PlaybookItem::new("s2", "Two", 2),
            PlaybookItem::new("s3", "Three", 3),
        ]
    }

    #[test]
    fn sequential_completion_to_the_end() {
        let dir = TempDir::new().unwrap();
        let coordinator = setup(&dir, three_required());

        let out = coordinator
            .complete_step("u-1", "onboarding", "s1", json!({"ok": true}))
            .unwrap();
        assert_eq!(out.journey.progress_percentage, 33.3);
        assert_eq!(out.journey.status, JourneyStatus::InProgress);
        assert_eq!(out.journey.started_at, Some(fixed_now()));
        assert_eq!(out.next_available.unwrap().id, "s2");

        // Skipping ahead fails and names the missing prerequisite.
        let err = coordinator
            .complete_step("u-1", "onboarding", "s3", json!({}))
            .unwrap_err();
        assert!(
            matches!(&err, PlaybookError::StepBlocked { step, missing }
                if step == "s3" && missing == "s2")
        );

        let out = coordinator
            .complete_step("u-1", "onboarding", "s2", json!({}))
            .unwrap();
        assert_eq!(out.journey.progress_percentage, 66.7);
        assert_eq!(out.next_available.unwrap().id, "s3");

        let out = coordinator
            .complete_step("u-1", "onboarding", "s3", json!({}))
            .unwrap();
        assert_eq!(out.journey.progress_percentage, 100.0);
        assert_eq!(out.journey.status, JourneyStatus::Completed);
        assert_eq!(out.journey.completed_at, Some(fixed_now()));
        assert!(out.next_available.is_none());
    }

    #[test]
    fn unknown_step_is_rejected() {
        let dir = TempDir::new().unwrap();
        let coordinator = setup(&dir, three_required());

        let err = coordinator
            .complete_step("u-1", "onboarding", "ghost", json!({}))
            .unwrap_err();
        assert!(matches!(err, PlaybookError::UnknownStep { .. }));
    }

    #[test]
    fn unknown_playbook_is_rejected() {
        let dir = TempDir::new().unwrap();
        let coordinator = setup(&dir, three_required());

        assert!(matches!(
            coordinator.complete_step("u-1", "ghost", "s1", json!({})),
            Err(PlaybookError::TemplateNotFound(_))
        ));
    }

    #[test]
    fn blocked_completion_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let coordinator = setup(&dir, three_required());

        let err = coordinator
            .complete_step("u-1", "onboarding", "s2", json!({}))
            .unwrap_err();
        assert!(matches!(err, PlaybookError::StepBlocked { .. }));

        // No journey manifest came into existence.
        assert!(coordinator
            .store()
            .load_journey("u-1", "onboarding")
            .unwrap()
            .is_none());
    }

    #[test]
    fn blocked_attempt_leaves_existing_journey_untouched() {
        let dir = TempDir::new().unwrap();
        let coordinator = setup(&dir, three_required());

        coordinator
            .complete_step("u-1", "onboarding", "s1", json!({}))
            .unwrap();
        let before = coordinator
            .store()
            .load_journey("u-1", "onboarding")
            .unwrap()
            .unwrap();

        coordinator
            .complete_step("u-1", "onboarding", "s3", json!({}))
            .unwrap_err();

        let after = coordinator
            .store()
            .load_journey("u-1", "onboarding")
            .unwrap()
            .unwrap();
        assert_eq!(after.responses.len(), before.responses.len());
        assert_eq!(after.progress_percentage, before.progress_percentage);
        assert_eq!(after.updated_at, before.updated_at);
    }

    #[test]
    fn recompletion_amends_without_double_counting() {
        let dir = TempDir::new().unwrap();
        let coordinator = setup(&dir, three_required());

        coordinator
            .complete_step("u-1", "onboarding", "s1", json!({"v": 1}))
            .unwrap();
        let out = coordinator
            .complete_step("u-1", "onboarding", "s1", json!({"v": 2}))
            .unwrap();

        assert_eq!(out.journey.responses.len(), 1, "one row per step");
        assert_eq!(out.journey.response("s1").unwrap().response["v"], 2);
        assert_eq!(out.journey.progress_percentage, 33.3, "not counted twice");
    }

    #[test]
    fn amendment_after_completion_keeps_completed_at() {
        let dir = TempDir::new().unwrap();
        let coordinator = setup(&dir, three_required());

        for step in ["s1", "s2", "s3"] {
            coordinator
                .complete_step("u-1", "onboarding", step, json!({}))
                .unwrap();
        }
        let finished = coordinator
            .store()
            .load_journey("u-1", "onboarding")
            .unwrap()
            .unwrap();
        assert_eq!(finished.completed_at, Some(fixed_now()));

        let out = coordinator
            .complete_step("u-1", "onboarding", "s1", json!({"amended": true}))
            .unwrap();
        assert_eq!(out.journey.progress_percentage, 100.0);
        assert_eq!(out.journey.status, JourneyStatus::Completed);
        assert_eq!(out.journey.completed_at, finished.completed_at);
    }

    #[test]
    fn optional_steps_do_not_gate() {
        let dir = TempDir::new().unwrap();
        let items = vec![
            PlaybookItem::new("s1", "One", 1),
            PlaybookItem::new("extra", "Extra", 2).optional(),
            PlaybookItem::new("s3", "Three", 3),
        ];
        let coordinator = setup(&dir, items);

        coordinator
            .complete_step("u-1", "onboarding", "s1", json!({}))
            .unwrap();
        // s3 is gated only by required s1; the untouched optional step in
        // between doesn't block it.
        let out = coordinator
            .complete_step("u-1", "onboarding", "s3", json!({}))
            .unwrap();
        assert_eq!(out.journey.progress_percentage, 100.0);
    }

    #[test]
    fn all_optional_playbook_completes_on_first_response() {
        let dir = TempDir::new().unwrap();
        let items = vec![
            PlaybookItem::new("a", "A", 1).optional(),
            PlaybookItem::new("b", "B", 2).optional(),
        ];
        let coordinator = setup(&dir, items);

        let out = coordinator
            .complete_step("u-1", "onboarding", "b", json!({}))
            .unwrap();
        assert_eq!(out.journey.progress_percentage, 100.0);
        assert_eq!(out.journey.status, JourneyStatus::Completed);
    }

    #[test]
    fn concurrent_sibling_completions_are_not_lost() {
        let dir = TempDir::new().unwrap();
        let coordinator = Arc::new(setup(&dir, three_required()));

        coordinator
            .complete_step("u-1", "onboarding", "s1", json!({}))
            .unwrap();

        let mut handles = Vec::new();
        for step in ["s2", "s3"] {
            let coordinator = Arc::clone(&coordinator);
            handles.push(std::thread::spawn(move || {
                // s3 may be attempted before s2 lands; retry on the blocked
                // race like a client would.
                loop {
                    match coordinator.complete_step("u-1", "onboarding", step, json!({})) {
                        Ok(_) => break,
                        Err(PlaybookError::StepBlocked { .. }) => std::thread::yield_now(),
                        Err(e) => panic!("unexpected error: {e}"),
                    }
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        let journey = coordinator
            .store()
            .load_journey("u-1", "onboarding")
            .unwrap()
            .unwrap();
        assert_eq!(journey.progress_percentage, 100.0, "no lost update");
        assert_eq!(journey.responses.len(), 3);
        assert_eq!(journey.status, JourneyStatus::Completed);
    }

    #[test]
    fn concurrent_same_step_completions_keep_one_row() {
        let dir = TempDir::new().unwrap();
        let coordinator = Arc::new(setup(&dir, three_required()));

        let mut handles = Vec::new();
        for i in 0..4 {
            let coordinator = Arc::clone(&coordinator);
            handles.push(std::thread::spawn(move || {
                coordinator
                    .complete_step("u-1", "onboarding", "s1", json!({"writer": i}))
                    .unwrap();
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        let journey = coordinator
            .store()
            .load_journey("u-1", "onboarding")
            .unwrap()
            .unwrap();
        assert_eq!(journey.responses.len(), 1);
        assert_eq!(journey.progress_percentage, 33.3);
    }
}
