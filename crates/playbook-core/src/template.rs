use crate::error::{PlaybookError, Result};
use crate::paths;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

// ---------------------------------------------------------------------------
// PlaybookItem
// ---------------------------------------------------------------------------

/// One step of a playbook template.
///
/// `order_index` is 1-based and totally ordered within a template; it drives
/// the default unlock sequence. Required items gate later items and count
/// toward the completion percentage; optional items do neither.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybookItem {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub order_index: u32,
    #[serde(default = "default_required")]
    pub required: bool,
    /// Expected response shape, passed through to whatever validates
    /// submissions. The engine never inspects it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_schema: Option<serde_json::Value>,
}

fn default_required() -> bool {
    true
}

impl PlaybookItem {
    pub fn new(id: impl Into<String>, title: impl Into<String>, order_index: u32) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            order_index,
            required: true,
            validation_schema: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

// ---------------------------------------------------------------------------
// PlaybookTemplate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybookTemplate {
    pub slug: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub items: Vec<PlaybookItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PlaybookTemplate {
    pub fn new(slug: impl Into<String>, name: impl Into<String>, items: Vec<PlaybookItem>) -> Self {
        let now = Utc::now();
        Self {
            slug: slug.into(),
            name: name.into(),
            description: None,
            category: None,
            items,
            created_at: now,
            updated_at: now,
        }
    }

    // ---------------------------------------------------------------------------
    // Validation
    // ---------------------------------------------------------------------------

    /// Structural integrity check: valid slug, at least one item, unique item
    /// ids, unique order_index values.
    pub fn validate(&self) -> Result<()> {
        paths::validate_slug(&self.slug)?;

        if self.items.is_empty() {
            return Err(PlaybookError::EmptyTemplate(self.slug.clone()));
        }

        let mut ids = HashSet::new();
        let mut orders = HashSet::new();
        for item in &self.items {
            if !ids.insert(item.id.as_str()) {
                return Err(PlaybookError::DuplicateStepId {
                    playbook: self.slug.clone(),
                    step: item.id.clone(),
                });
            }
            if !orders.insert(item.order_index) {
                return Err(PlaybookError::DuplicateOrderIndex {
                    playbook: self.slug.clone(),
                    order_index: item.order_index,
                });
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------------

    /// Validate and write a new template. Fails if a template with the same
    /// slug already exists.
    pub fn create(root: &Path, template: PlaybookTemplate) -> Result<PlaybookTemplate> {
        template.validate()?;

        let path = paths::template_path(root, &template.slug);
        if path.exists() {
            return Err(PlaybookError::TemplateExists(template.slug));
        }

        template.save(root)?;
        Ok(template)
    }

    pub fn load(root: &Path, slug: &str) -> Result<Self> {
        let path = paths::template_path(root, slug);
        if !path.exists() {
            return Err(PlaybookError::TemplateNotFound(slug.to_string()));
        }
        let data = std::fs::read_to_string(&path)?;
        let template: PlaybookTemplate = serde_yaml::from_str(&data)?;
        Ok(template)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::template_path(root, &self.slug);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn list(root: &Path) -> Result<Vec<Self>> {
        let templates_dir = root.join(paths::TEMPLATES_DIR);
        if !templates_dir.exists() {
            return Ok(Vec::new());
        }

        let mut templates = Vec::new();
        for entry in std::fs::read_dir(&templates_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            let Some(slug) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match Self::load(root, slug) {
                Ok(t) => templates.push(t),
                Err(PlaybookError::TemplateNotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        templates.sort_by(|a, b| a.slug.cmp(&b.slug));
        Ok(templates)
    }

    // ---------------------------------------------------------------------------
    // Item helpers
    // ---------------------------------------------------------------------------

    pub fn item(&self, step_id: &str) -> Option<&PlaybookItem> {
        self.items.iter().find(|i| i.id == step_id)
    }

    /// Items sorted by `order_index` ascending. The stored order is not
    /// trusted; order_index is the authoritative sort key.
    pub fn ordered_items(&self) -> Vec<&PlaybookItem> {
        let mut items: Vec<&PlaybookItem> = self.items.iter().collect();
        items.sort_by_key(|i| i.order_index);
        items
    }

    pub fn required_count(&self) -> usize {
        self.items.iter().filter(|i| i.required).count()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
