use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use playbook_core::store::{FileStore, StepStore};
use playbook_core::template::{PlaybookItem, PlaybookTemplate};
use std::path::Path;

#[derive(Subcommand)]
pub enum TemplateSubcommand {
    /// Import a playbook template from a YAML definition file
    Import {
        /// Path to the definition file
        file: std::path::PathBuf,
    },
    /// List playbook templates
    List,
    /// Show a template's steps
    Show { slug: String },
}

pub fn run(root: &Path, subcmd: TemplateSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        TemplateSubcommand::Import { file } => import(root, &file, json),
        TemplateSubcommand::List => list(root, json),
        TemplateSubcommand::Show { slug } => show(root, &slug, json),
    }
}

/// Shape of a template definition file: the durable manifest minus the
/// engine-managed timestamps.
#[derive(serde::Deserialize)]
struct TemplateDefinition {
    slug: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    category: Option<String>,
    items: Vec<PlaybookItem>,
}

fn import(root: &Path, file: &Path, json: bool) -> anyhow::Result<()> {
    let data = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let definition: TemplateDefinition =
        serde_yaml::from_str(&data).context("invalid template definition")?;

    let mut template =
        PlaybookTemplate::new(definition.slug, definition.name, definition.items);
    template.description = definition.description;
    template.category = definition.category;

    let store = FileStore::new(root);
    let template = store
        .put_template(template)
        .context("failed to import template")?;

    if json {
        print_json(&serde_json::json!({
            "slug": template.slug,
            "steps": template.items.len(),
        }))?;
    } else {
        println!(
            "Imported playbook '{}' ({} steps, {} required)",
            template.slug,
            template.items.len(),
            template.required_count()
        );
    }
    Ok(())
}

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let store = FileStore::new(root);
    let templates = store.list_templates().context("failed to list templates")?;

    if json {
        print_json(&templates)?;
        return Ok(());
    }

    if templates.is_empty() {
        println!("No playbooks. Import one with 'playbook template import <file>'.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = templates
        .iter()
        .map(|t| {
            vec![
                t.slug.clone(),
                t.name.clone(),
                t.items.len().to_string(),
                t.required_count().to_string(),
                t.category.clone().unwrap_or_default(),
            ]
        })
        .collect();
    print_table(&["SLUG", "NAME", "STEPS", "REQUIRED", "CATEGORY"], rows);
    Ok(())
}

fn show(root: &Path, slug: &str, json: bool) -> anyhow::Result<()> {
    let store = FileStore::new(root);
    let template = store
        .get_template(slug)
        .with_context(|| format!("playbook '{slug}' not found"))?;

    if json {
        print_json(&template)?;
        return Ok(());
    }

    println!("Playbook: {} ({})", template.name, template.slug);
    if let Some(desc) = &template.description {
        println!("{desc}");
    }
    println!();

    let rows: Vec<Vec<String>> = template
        .ordered_items()
        .iter()
        .map(|i| {
            vec![
                i.order_index.to_string(),
                i.id.clone(),
                i.title.clone(),
                if i.required { "required" } else { "optional" }.to_string(),
            ]
        })
        .collect();
    print_table(&["#", "ID", "TITLE", "KIND"], rows);
    Ok(())
}
