use anyhow::Context;
use playbook_core::{config::Config, paths, store::FileStore};
use std::path::Path;

pub fn run(root: &Path) -> anyhow::Result<()> {
    let project_name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string());

    println!("Initializing playbook in: {}", root.display());

    let store = FileStore::new(root);
    store
        .scaffold()
        .context("failed to create .playbook directory tree")?;
    println!("  created: {}", paths::TEMPLATES_DIR);
    println!("  created: {}", paths::JOURNEYS_DIR);

    let config_path = paths::config_path(root);
    if !config_path.exists() {
        let config = Config::new(&project_name);
        config.save(root).context("failed to write config.yaml")?;
        println!("  created: {}", paths::CONFIG_FILE);
    } else {
        println!("  exists:  {}", paths::CONFIG_FILE);
    }

    Ok(())
}
