use crate::error::{PlaybookError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const PLAYBOOK_DIR: &str = ".playbook";
pub const TEMPLATES_DIR: &str = ".playbook/templates";
pub const JOURNEYS_DIR: &str = ".playbook/journeys";

pub const CONFIG_FILE: &str = ".playbook/config.yaml";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn playbook_dir(root: &Path) -> PathBuf {
    root.join(PLAYBOOK_DIR)
}

pub fn template_path(root: &Path, slug: &str) -> PathBuf {
    root.join(TEMPLATES_DIR).join(format!("{slug}.yaml"))
}

pub fn journeys_dir(root: &Path, user_id: &str) -> PathBuf {
    root.join(JOURNEYS_DIR).join(user_id)
}

pub fn journey_path(root: &Path, user_id: &str, slug: &str) -> PathBuf {
    journeys_dir(root, user_id).join(format!("{slug}.yaml"))
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

// ---------------------------------------------------------------------------
// Identifier validation
// ---------------------------------------------------------------------------

static SLUG_RE: OnceLock<Regex> = OnceLock::new();
static USER_RE: OnceLock<Regex> = OnceLock::new();

fn slug_re() -> &'static Regex {
    SLUG_RE.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9\-]*[a-z0-9]$|^[a-z0-9]$").unwrap())
}

fn user_re() -> &'static Regex {
    USER_RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._\-]*$").unwrap())
}

pub fn validate_slug(slug: &str) -> Result<()> {
    if slug.is_empty() || slug.len() > 64 || !slug_re().is_match(slug) {
        return Err(PlaybookError::InvalidSlug(slug.to_string()));
    }
    Ok(())
}

/// User ids become path components under `.playbook/journeys/`, so they must
/// be filename-safe.
pub fn validate_user_id(user_id: &str) -> Result<()> {
    if user_id.is_empty() || user_id.len() > 128 || !user_re().is_match(user_id) {
        return Err(PlaybookError::InvalidUserId(user_id.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
