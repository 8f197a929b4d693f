use crate::output::{print_json, print_table};
use anyhow::Context;
use playbook_core::config::Config;
use playbook_core::session::Session;
use playbook_core::store::FileStore;
use std::path::Path;

fn session(root: &Path) -> anyhow::Result<Session<FileStore>> {
    let config = Config::load(root).context("failed to load config")?;
    Ok(Session::with_policy(
        FileStore::new(root),
        config.active_journey,
    ))
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

pub fn show(root: &Path, slug: &str, user: &str, json: bool) -> anyhow::Result<()> {
    let session = session(root)?;
    let details = session
        .playbook_details(user, slug)
        .with_context(|| format!("playbook '{slug}' not found"))?;

    if json {
        print_json(&details)?;
        return Ok(());
    }

    println!(
        "{} — {:.1}% ({}/{} required steps)",
        details.template.name,
        details.progress.percentage,
        details.progress.completed_required,
        details.progress.total_required,
    );
    if let Some(next) = &details.next_available {
        println!("Next: [{}] {}", next.id, next.title);
    }
    println!();

    let rows: Vec<Vec<String>> = details
        .steps
        .iter()
        .map(|s| {
            vec![
                s.item.order_index.to_string(),
                s.item.id.clone(),
                s.status.to_string(),
                s.item.title.clone(),
                if s.item.required { "" } else { "optional" }.to_string(),
            ]
        })
        .collect();
    print_table(&["#", "ID", "STATUS", "TITLE", ""], rows);
    Ok(())
}

// ---------------------------------------------------------------------------
// complete
// ---------------------------------------------------------------------------

pub fn complete(
    root: &Path,
    slug: &str,
    step_id: &str,
    user: &str,
    response: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let payload: serde_json::Value = match response {
        Some(raw) => serde_json::from_str(raw).context("response must be valid JSON")?,
        None => serde_json::Value::Null,
    };

    let session = session(root)?;
    let outcome = session.complete_step(user, slug, step_id, payload)?;

    if json {
        print_json(&serde_json::json!({
            "journey": outcome.journey,
            "next_available": outcome.next_available,
        }))?;
        return Ok(());
    }

    println!(
        "Completed [{}] — {:.1}%",
        step_id, outcome.journey.progress_percentage
    );
    match &outcome.next_available {
        Some(next) => println!("Next: [{}] {}", next.id, next.title),
        None => println!("Playbook finished."),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// active / list
// ---------------------------------------------------------------------------

pub fn active(root: &Path, user: &str, json: bool) -> anyhow::Result<()> {
    let session = session(root)?;
    let journey = session.active_journey(user)?;

    if json {
        print_json(&journey)?;
        return Ok(());
    }

    match journey {
        Some(j) => println!(
            "{} — {} ({:.1}%)",
            j.playbook, j.status, j.progress_percentage
        ),
        None => println!("No playbook in progress."),
    }
    Ok(())
}

pub fn list(root: &Path, user: &str, json: bool) -> anyhow::Result<()> {
    let session = session(root)?;
    let journeys = session.journeys(user)?;

    if json {
        print_json(&journeys)?;
        return Ok(());
    }

    if journeys.is_empty() {
        println!("No journeys for '{user}'.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = journeys
        .iter()
        .map(|j| {
            vec![
                j.playbook.clone(),
                j.status.to_string(),
                format!("{:.1}%", j.progress_percentage),
                j.started_at
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default(),
            ]
        })
        .collect();
    print_table(&["PLAYBOOK", "STATUS", "PROGRESS", "STARTED"], rows);
    Ok(())
}
