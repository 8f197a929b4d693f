use crate::error::Result;
use crate::journey::Journey;
use crate::paths;
use crate::template::PlaybookTemplate;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// StepStore
// ---------------------------------------------------------------------------

/// Durable access to templates and journeys.
///
/// The coordinator and session are generic over this trait so tests can
/// substitute a fake; `FileStore` is the production implementation. A
/// journey is saved as one document (progress record plus responses), so
/// implementations persist a completion in a single atomic operation.
pub trait StepStore: Send + Sync {
    fn get_template(&self, slug: &str) -> Result<PlaybookTemplate>;

    fn list_templates(&self) -> Result<Vec<PlaybookTemplate>>;

    /// Validate and store a new template. Fails if the slug is taken.
    fn put_template(&self, template: PlaybookTemplate) -> Result<PlaybookTemplate>;

    fn load_journey(&self, user_id: &str, playbook: &str) -> Result<Option<Journey>>;

    fn save_journey(&self, journey: &Journey) -> Result<()>;

    fn list_journeys(&self, user_id: &str) -> Result<Vec<Journey>>;
}

// ---------------------------------------------------------------------------
// FileStore
// ---------------------------------------------------------------------------

/// YAML documents under a `.playbook/` root, written atomically.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the `.playbook/` directory tree. Idempotent.
    pub fn scaffold(&self) -> Result<()> {
        crate::io::ensure_dir(&self.root.join(paths::TEMPLATES_DIR))?;
        crate::io::ensure_dir(&self.root.join(paths::JOURNEYS_DIR))?;
        Ok(())
    }
}

impl StepStore for FileStore {
    fn get_template(&self, slug: &str) -> Result<PlaybookTemplate> {
        let template = PlaybookTemplate::load(&self.root, slug)?;
        // Manifests are editable on disk; duplicate ids or order ties are a
        // data-integrity error, not something the calculator resolves.
        template.validate()?;
        Ok(template)
    }

    fn list_templates(&self) -> Result<Vec<PlaybookTemplate>> {
        PlaybookTemplate::list(&self.root)
    }

    fn put_template(&self, template: PlaybookTemplate) -> Result<PlaybookTemplate> {
        PlaybookTemplate::create(&self.root, template)
    }

    fn load_journey(&self, user_id: &str, playbook: &str) -> Result<Option<Journey>> {
        paths::validate_user_id(user_id)?;
        Journey::load(&self.root, user_id, playbook)
    }

    fn save_journey(&self, journey: &Journey) -> Result<()> {
        paths::validate_user_id(&journey.user_id)?;
        journey.save(&self.root)
    }

    fn list_journeys(&self, user_id: &str) -> Result<Vec<Journey>> {
        paths::validate_user_id(user_id)?;
        Journey::list(&self.root, user_id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlaybookError;
    use crate::template::PlaybookItem;
    use chrono::Utc;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> FileStore {
        let store = FileStore::new(dir.path());
        store.scaffold().unwrap();
        store
    }

    fn template(slug: &str) -> PlaybookTemplate {
        PlaybookTemplate::new(
            slug,
            "Test",
            vec![
                PlaybookItem::new("a", "First", 1),
                PlaybookItem::new("b", "Second", 2),
            ],
        )
    }

    #[test]
    fn scaffold_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        store.scaffold().unwrap();
        store.scaffold().unwrap();
        assert!(dir.path().join(".playbook/templates").is_dir());
        assert!(dir.path().join(".playbook/journeys").is_dir());
    }

    #[test]
    fn put_then_get_template() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store.put_template(template("onboarding")).unwrap();
        let loaded = store.get_template("onboarding").unwrap();
        assert_eq!(loaded.items.len(), 2);

        assert!(matches!(
            store.get_template("ghost"),
            Err(PlaybookError::TemplateNotFound(_))
        ));
    }

    #[test]
    fn put_template_rejects_invalid() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let mut bad = template("onboarding");
        bad.items[1].order_index = 1;
        assert!(matches!(
            store.put_template(bad),
            Err(PlaybookError::DuplicateOrderIndex { .. })
        ));
    }

    #[test]
    fn journey_save_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let journey = Journey::new("u-1", "onboarding", Utc::now());
        store.save_journey(&journey).unwrap();

        let loaded = store.load_journey("u-1", "onboarding").unwrap().unwrap();
        assert_eq!(loaded.id, journey.id);
        assert!(store.load_journey("u-2", "onboarding").unwrap().is_none());
    }

    #[test]
    fn get_template_rejects_corrupted_manifest() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.put_template(template("onboarding")).unwrap();

        // Hand-edit the manifest so both items share an order_index.
        let path = dir.path().join(".playbook/templates/onboarding.yaml");
        let data = std::fs::read_to_string(&path)
            .unwrap()
            .replace("order_index: 2", "order_index: 1");
        std::fs::write(&path, data).unwrap();

        assert!(matches!(
            store.get_template("onboarding"),
            Err(PlaybookError::DuplicateOrderIndex { order_index: 1, .. })
        ));
    }

    #[test]
    fn traversal_user_ids_are_rejected() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        assert!(matches!(
            store.load_journey("../escape", "onboarding"),
            Err(PlaybookError::InvalidUserId(_))
        ));
        let journey = Journey::new("../escape", "onboarding", Utc::now());
        assert!(store.save_journey(&journey).is_err());
    }
}
