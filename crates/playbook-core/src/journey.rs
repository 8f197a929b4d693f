use crate::error::Result;
use crate::paths;
use crate::progress::Snapshot;
use crate::types::JourneyStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// StepResponse
// ---------------------------------------------------------------------------

/// A user's recorded answer to one step. Its existence is the sole source of
/// truth for "this step is done"; `completed_at` is refreshed when the
/// response is amended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResponse {
    pub step_id: String,
    pub response: serde_json::Value,
    pub completed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Journey
// ---------------------------------------------------------------------------

/// One user's pass through a playbook template.
///
/// The whole journey (progress record and responses) lives in a single
/// manifest, so a completion persists both in one atomic write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Journey {
    pub id: Uuid,
    pub user_id: String,
    pub playbook: String,
    pub status: JourneyStatus,
    pub progress_percentage: f64,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub responses: Vec<StepResponse>,
}

impl Journey {
    pub fn new(user_id: impl Into<String>, playbook: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            playbook: playbook.into(),
            status: JourneyStatus::NotStarted,
            progress_percentage: 0.0,
            started_at: None,
            completed_at: None,
            updated_at: now,
            responses: Vec::new(),
        }
    }

    // ---------------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------------

    pub fn load(root: &Path, user_id: &str, playbook: &str) -> Result<Option<Self>> {
        let path = paths::journey_path(root, user_id, playbook);
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(&path)?;
        let journey: Journey = serde_yaml::from_str(&data)?;
        Ok(Some(journey))
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::journey_path(root, &self.user_id, &self.playbook);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn list(root: &Path, user_id: &str) -> Result<Vec<Self>> {
        let dir = paths::journeys_dir(root, user_id);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut journeys = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            let Some(playbook) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if let Some(j) = Self::load(root, user_id, playbook)? {
                journeys.push(j);
            }
        }
        journeys.sort_by(|a, b| a.playbook.cmp(&b.playbook));
        Ok(journeys)
    }

    // ---------------------------------------------------------------------------
    // Responses
    // ---------------------------------------------------------------------------

    pub fn response(&self, step_id: &str) -> Option<&StepResponse> {
        self.responses.iter().find(|r| r.step_id == step_id)
    }

    pub fn completed_step_ids(&self) -> HashSet<String> {
        self.responses.iter().map(|r| r.step_id.clone()).collect()
    }

    /// Record or replace the response for a step. At most one response per
    /// step ever exists; re-submission overwrites payload and timestamp.
    pub fn upsert_response(
        &mut self,
        step_id: &str,
        response: serde_json::Value,
        now: DateTime<Utc>,
    ) {
        self.responses.retain(|r| r.step_id != step_id);
        self.responses.push(StepResponse {
            step_id: step_id.to_string(),
            response,
            completed_at: now,
        });
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
        self.updated_at = now;
    }

    // ---------------------------------------------------------------------------
    // Progress
    // ---------------------------------------------------------------------------

    /// Fold a freshly computed snapshot into the stored progress record.
    ///
    /// `completed_at`, once set, is never cleared: amending a response after
    /// the journey finished keeps the journey finished.
    pub fn apply_progress(&mut self, snapshot: &Snapshot, now: DateTime<Utc>) {
        self.progress_percentage = snapshot.percentage;

        if snapshot.percentage >= 100.0 {
            if self.status != JourneyStatus::Completed {
                self.status = JourneyStatus::Completed;
                self.completed_at = Some(now);
            }
        } else if self.status == JourneyStatus::NotStarted {
            self.status = JourneyStatus::InProgress;
        }
        self.updated_at = now;
    }

    pub fn is_in_progress(&self) -> bool {
        self.status == JourneyStatus::InProgress
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn now() -> DateTime<Utc> {
        "2026-03-01T12:00:00Z".parse().unwrap()
    }

    fn later() -> DateTime<Utc> {
        "2026-03-02T09:30:00Z".parse().unwrap()
    }

    #[test]
    fn journey_roundtrip() {
        let dir = TempDir::new().unwrap();

        let mut journey = Journey::new("u-1", "onboarding", now());
        journey.upsert_response("profile", json!({"name": "Ada"}), now());
        journey.save(dir.path()).unwrap();

        let loaded = Journey::load(dir.path(), "u-1", "onboarding")
            .unwrap()
            .unwrap();
        assert_eq!(loaded.user_id, "u-1");
        assert_eq!(loaded.responses.len(), 1);
        assert_eq!(loaded.response("profile").unwrap().response["name"], "Ada");
    }

    #[test]
    fn load_missing_journey_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(Journey::load(dir.path(), "u-1", "onboarding")
            .unwrap()
            .is_none());
    }

    #[test]
    fn upsert_replaces_existing_response() {
        let mut journey = Journey::new("u-1", "onboarding", now());
        journey.upsert_response("profile", json!({"v": 1}), now());
        journey.upsert_response("profile", json!({"v": 2}), later());

        assert_eq!(journey.responses.len(), 1);
        let r = journey.response("profile").unwrap();
        assert_eq!(r.response["v"], 2);
        assert_eq!(r.completed_at, later());
    }

    #[test]
    fn first_response_sets_started_at_once() {
        let mut journey = Journey::new("u-1", "onboarding", now());
        assert!(journey.started_at.is_none());

        journey.upsert_response("profile", json!({}), now());
        assert_eq!(journey.started_at, Some(now()));

        journey.upsert_response("email", json!({}), later());
        assert_eq!(journey.started_at, Some(now()), "started_at is set once");
    }

    #[test]
    fn apply_progress_transitions_status() {
        let mut journey = Journey::new("u-1", "onboarding", now());

        journey.apply_progress(&Snapshot::for_test(50.0), now());
        assert_eq!(journey.status, JourneyStatus::InProgress);
        assert!(journey.completed_at.is_none());

        journey.apply_progress(&Snapshot::for_test(100.0), later());
        assert_eq!(journey.status, JourneyStatus::Completed);
        assert_eq!(journey.completed_at, Some(later()));
    }

    #[test]
    fn completed_at_is_never_cleared() {
        let mut journey = Journey::new("u-1", "onboarding", now());
        journey.apply_progress(&Snapshot::for_test(100.0), now());
        assert_eq!(journey.completed_at, Some(now()));

        // Amendment after completion: percentage stays 100, timestamp stays.
        journey.apply_progress(&Snapshot::for_test(100.0), later());
        assert_eq!(journey.status, JourneyStatus::Completed);
        assert_eq!(journey.completed_at, Some(now()));
    }

    #[test]
    fn list_returns_all_journeys_for_user() {
        let dir = TempDir::new().unwrap();

        Journey::new("u-1", "onboarding", now()).save(dir.path()).unwrap();
        Journey::new("u-1", "sales-ramp", now()).save(dir.path()).unwrap();
        Journey::new("u-2", "onboarding", now()).save(dir.path()).unwrap();

        let journeys = Journey::list(dir.path(), "u-1").unwrap();
        assert_eq!(journeys.len(), 2);
        assert!(journeys.iter().all(|j| j.user_id == "u-1"));
    }

    #[test]
    fn list_empty_for_unknown_user() {
        let dir = TempDir::new().unwrap();
        assert!(Journey::list(dir.path(), "ghost").unwrap().is_empty());
    }
}
