//! End-to-end scenarios over the real stack with fixture backends.

mod common;

use common::*;
use mosaic_core::models::{EvolutionAction, ThemeStatus};
use mosaic_core::traits::IThemeStore;
use test_fixtures::TWO_THEME_JSON;

const QUESTION: &str = "What challenges do you face?";

fn batch_one_responses() -> Vec<String> {
    vec![
        "API integration is hard".to_string(),
        "The documentation is sparse".to_string(),
        "API rate limits are confusing".to_string(),
        "The docs are incomplete".to_string(),
    ]
}

/// S1: a single batch against a fresh catalog creates themes, assigns
/// every response with solid confidence, and highlights keywords.
#[test]
fn fresh_catalog_single_batch() {
    let stack = build_stack(vec![TWO_THEME_JSON]);
    let result = stack
        .processor
        .process_batch(1, QUESTION, &batch_one_responses())
        .unwrap();

    assert!(result.themes_created >= 2);
    assert_eq!(result.themes_updated, 0);
    assert_eq!(result.themes_deleted, 0);
    assert_eq!(result.total_responses, 4);

    let themes = stack.store.list_themes(Some(ThemeStatus::Active)).unwrap();
    assert_eq!(themes.len(), 2);
    let names: Vec<&str> = themes.iter().map(|t| t.name.as_str()).collect();
    assert!(names.contains(&"API Challenges"));
    assert!(names.contains(&"Documentation Gaps"));

    // Every response is assigned at least once, confidently, with at
    // least one scored keyword.
    for response in stack.store.responses_for_batch(1).unwrap() {
        let assignments = stack.store.assignments_for_response(&response.id).unwrap();
        assert!(!assignments.is_empty(), "{} unassigned", response.text);
        for assignment in assignments {
            assert!(
                assignment.confidence >= 0.75,
                "{} confidence {}",
                response.text,
                assignment.confidence
            );
            assert!(
                !assignment.highlighted_keywords.is_empty(),
                "{} has no highlights",
                response.text
            );
            assert!(assignment
                .highlighted_keywords
                .iter()
                .all(|h| h.score >= 0.05));
        }
    }

    assert_invariants(&stack.store);
}

/// S2: a near-duplicate batch creates nothing new; responses land on
/// the existing themes via candidate dedupe and direct matching.
#[test]
fn duplicate_batch_triggers_dedupe() {
    let stack = build_stack(vec![TWO_THEME_JSON, TWO_THEME_JSON]);
    stack
        .processor
        .process_batch(1, QUESTION, &batch_one_responses())
        .unwrap();

    let near_duplicates = vec![
        "API integration is still hard".to_string(),
        "The documentation and docs are sparse".to_string(),
        "API rate limits are so confusing".to_string(),
        "The docs and documentation are incomplete".to_string(),
    ];
    let result = stack
        .processor
        .process_batch(2, QUESTION, &near_duplicates)
        .unwrap();

    assert_eq!(result.themes_created, 0);
    let active = stack.store.list_themes(Some(ThemeStatus::Active)).unwrap();
    assert_eq!(active.len(), 2);
    assert!(result.themes_updated <= active.len() as u64);

    for response in stack.store.responses_for_batch(2).unwrap() {
        let assignments = stack.store.assignments_for_response(&response.id).unwrap();
        assert!(!assignments.is_empty(), "{} unassigned", response.text);
    }

    assert_invariants(&stack.store);
}

/// S3 + S5: seeded near-identical themes merge; the loser's historical
/// assignments are rewritten to the survivor in the same batch.
#[test]
fn overlapping_themes_merge_with_retroactive_rewrite() {
    let stack = build_stack(vec!["[]", "Api pain across integration and limits."]);

    let survivor = seed_theme(&stack.store, "API Challenges", axis(0), 1);
    let mut loser_embedding = axis(0);
    loser_embedding[2] = 0.1;
    let loser = seed_theme(
        &stack.store,
        "API Problems",
        mosaic_core::vector::l2_normalize(&loser_embedding),
        1,
    );
    seed_assigned_response(&stack.store, &survivor, "api one", axis(0), 1);
    seed_assigned_response(&stack.store, &survivor, "api two", axis(0), 1);
    let loser_response =
        seed_assigned_response(&stack.store, &loser, "api three", axis(0), 1);

    let result = stack
        .processor
        .process_batch(2, QUESTION, &["Overall feedback".to_string()])
        .unwrap();

    let merges: Vec<_> = result
        .evolution
        .iter()
        .filter(|e| e.action == EvolutionAction::Merged)
        .collect();
    assert_eq!(merges.len(), 1);
    assert_eq!(merges[0].theme_id, survivor.id);
    assert_eq!(merges[0].related_theme_id, Some(loser.id.clone()));

    let survivor_after = stack.store.get_theme(&survivor.id).unwrap().unwrap();
    assert_eq!(survivor_after.response_count, 3);
    assert_eq!(
        survivor_after.description,
        "Api pain across integration and limits."
    );

    let loser_after = stack.store.get_theme(&loser.id).unwrap().unwrap();
    assert_eq!(loser_after.status, ThemeStatus::Merged);
    assert_eq!(loser_after.parent_theme_id, Some(survivor.id.clone()));
    assert!(stack
        .store
        .assignments_for_theme(&loser.id)
        .unwrap()
        .is_empty());

    // S5: the historical assignment now references the survivor and
    // carries the rewriting batch.
    let rewritten = stack
        .store
        .assignments_for_response(&loser_response.id)
        .unwrap();
    assert_eq!(rewritten.len(), 1);
    assert_eq!(rewritten[0].theme_id, survivor.id);
    assert_eq!(rewritten[0].last_updated_batch, 2);

    assert_invariants(&stack.store);
}

/// S4: a theme holding two visibly distinct clusters splits into two
/// children; the parent keeps no assignments.
#[test]
fn drifting_theme_splits_into_children() {
    let child_a = r#"[{"name": "API Integration", "description": "Api integration."}]"#;
    let child_b = r#"[{"name": "Platform Gripes", "description": "Broad platform complaints."}]"#;
    let stack = build_stack(vec!["[]", child_a, child_b]);

    let parent = seed_theme(&stack.store, "Mixed Feedback", axis(4), 1);
    for i in 0..5 {
        seed_assigned_response(&stack.store, &parent, &format!("side a {i}"), axis(0), 1);
    }
    for i in 0..5 {
        seed_assigned_response(
            &stack.store,
            &parent,
            &format!("side b {i}"),
            counter_axis(),
            1,
        );
    }

    let result = stack
        .processor
        .process_batch(2, QUESTION, &["Overall feedback".to_string()])
        .unwrap();

    let splits: Vec<_> = result
        .evolution
        .iter()
        .filter(|e| e.action == EvolutionAction::Split)
        .collect();
    assert_eq!(splits.len(), 1);
    assert_eq!(splits[0].theme_id, parent.id);
    assert_eq!(splits[0].affected_response_count, 10);

    let parent_after = stack.store.get_theme(&parent.id).unwrap().unwrap();
    assert_eq!(parent_after.status, ThemeStatus::Split);
    assert!(stack
        .store
        .assignments_for_theme(&parent.id)
        .unwrap()
        .is_empty());

    let children = stack.store.child_themes(&parent.id).unwrap();
    assert_eq!(children.len(), 2);
    for child in &children {
        assert_eq!(child.status, ThemeStatus::Active);
        assert!(
            child.response_count >= 2,
            "child {} under minimum",
            child.name
        );
    }
    let total_child_members: u64 = children.iter().map(|c| c.response_count).sum();
    assert_eq!(total_child_members, 10);

    assert_invariants(&stack.store);
}

/// S6: a blank response is persisted with the zero vector; no themes
/// are created and neither backend is contacted.
#[test]
fn empty_input_batch() {
    let stack = build_stack(vec![]);
    let result = stack
        .processor
        .process_batch(1, QUESTION, &["".to_string()])
        .unwrap();

    assert_eq!(result.total_responses, 1);
    assert_eq!(result.themes_created, 0);
    assert_eq!(stack.llm.call_count(), 0, "LLM was contacted");
    assert_eq!(stack.backend.call_count(), 0, "embedding backend was contacted");

    let responses = stack.store.responses_for_batch(1).unwrap();
    assert_eq!(responses.len(), 1);
    assert!(responses[0].embedding.iter().all(|x| *x == 0.0));

    assert_invariants(&stack.store);
}

/// Boundary law: reprocessing a batch id fails with an integrity
/// conflict before any mutation.
#[test]
fn duplicate_batch_id_is_rejected() {
    let stack = build_stack(vec![TWO_THEME_JSON]);
    stack
        .processor
        .process_batch(1, QUESTION, &batch_one_responses())
        .unwrap();
    let err = stack
        .processor
        .process_batch(1, QUESTION, &batch_one_responses())
        .unwrap_err();
    assert!(err.is_integrity_conflict());
    assert_invariants(&stack.store);
}
