//! Atomic application of a fully computed batch plan.
//!
//! The caller (the engine) wraps this in a transaction; every mutation
//! of the batch lands together or not at all. Application order matters:
//! assignments before rewrites, rewrites before status changes, counts
//! recomputed after every assignment op so the response_count invariant
//! holds at commit.

use std::collections::BTreeSet;

use rusqlite::Connection;

use mosaic_core::errors::MosaicResult;
use mosaic_core::models::BatchPlan;

use super::{assignment_ops, batch_ops, evolution_ops, theme_ops};

pub fn apply_plan(conn: &Connection, plan: &BatchPlan) -> MosaicResult<()> {
    let mut touched: BTreeSet<String> = BTreeSet::new();

    for theme in &plan.new_themes {
        theme_ops::insert_theme(conn, theme)?;
        touched.insert(theme.id.clone());
    }

    for assignment in &plan.assignments {
        assignment_ops::upsert_assignment(conn, assignment)?;
        touched.insert(assignment.theme_id.clone());
    }

    for rewrite in &plan.rewrites {
        assignment_ops::rewrite_assignments(
            conn,
            &rewrite.from_theme_id,
            &rewrite.to_theme_id,
            plan.batch_id,
        )?;
        touched.insert(rewrite.from_theme_id.clone());
        touched.insert(rewrite.to_theme_id.clone());
    }

    for retarget in &plan.retargets {
        assignment_ops::retarget_assignment(
            conn,
            &retarget.response_id,
            &retarget.from_theme_id,
            &retarget.to_theme_id,
            plan.batch_id,
        )?;
        touched.insert(retarget.from_theme_id.clone());
        touched.insert(retarget.to_theme_id.clone());
    }

    for change in &plan.status_changes {
        theme_ops::apply_status_change(conn, change)?;
        touched.insert(change.theme_id.clone());
    }

    for update in &plan.theme_updates {
        theme_ops::apply_theme_update(conn, update)?;
        touched.insert(update.theme_id.clone());
    }

    let touched: Vec<String> = touched.into_iter().collect();
    theme_ops::recompute_response_counts(conn, &touched)?;

    for entry in &plan.evolution {
        evolution_ops::append_entry(conn, entry)?;
    }

    if let Some(ref metadata) = plan.metadata {
        batch_ops::insert_metadata(conn, metadata)?;
    }

    tracing::debug!(
        batch_id = plan.batch_id,
        new_themes = plan.new_themes.len(),
        assignments = plan.assignments.len(),
        rewrites = plan.rewrites.len(),
        retargets = plan.retargets.len(),
        status_changes = plan.status_changes.len(),
        evolution = plan.evolution.len(),
        "batch plan applied"
    );
    Ok(())
}
