//! ThemeEvolver — the five ordered passes that keep the catalog
//! coherent: (a) match responses to live themes, (b) dedupe fresh
//! candidates, (c) merge overlapping themes, (d) split drifting themes,
//! (e) refresh descriptions (and retire emptied themes).
//!
//! Order is fixed and non-interleaved: merges see the complete
//! post-dedup catalog, splits see post-merge assignments. No theme
//! transitions more than once per batch.

use std::sync::Arc;

use tracing::{debug, info};

use mosaic_core::cancellation::{Cancellable, CancellationToken};
use mosaic_core::config::Thresholds;
use mosaic_core::constants::{MAX_CANDIDATES_PER_RESPONSE, MIN_REFRESH_POOL};
use mosaic_core::errors::{MosaicError, MosaicResult};
use mosaic_core::models::{
    Assignment, AssignmentRetarget, AssignmentRewrite, BatchPlan, EvolutionAction,
    EvolutionDetails, EvolutionEntry, Response, StatusChange, Theme, ThemeCandidate, ThemeOrigin,
    ThemeStatus, ThemeUpdate,
};
use mosaic_core::traits::{IEmbedder, IThemeExtractor, IThemeStore};
use mosaic_core::vector::cosine_similarity;

use crate::catalog::{CatalogView, MemberRef, ThemeState};
use crate::kmeans;

/// The text a theme embeds as: name and description together.
pub fn theme_embedding_text(name: &str, description: &str) -> String {
    format!("{name}: {description}")
}

/// Mutations produced by one evolution pass, merged into the batch plan.
#[derive(Debug, Default)]
pub struct EvolutionOutcome {
    pub new_themes: Vec<Theme>,
    pub assignments: Vec<Assignment>,
    pub rewrites: Vec<AssignmentRewrite>,
    pub retargets: Vec<AssignmentRetarget>,
    pub status_changes: Vec<StatusChange>,
    pub theme_updates: Vec<ThemeUpdate>,
    pub evolution: Vec<EvolutionEntry>,
}

impl EvolutionOutcome {
    pub fn merge_into(self, plan: &mut BatchPlan) {
        plan.new_themes.extend(self.new_themes);
        plan.assignments.extend(self.assignments);
        plan.rewrites.extend(self.rewrites);
        plan.retargets.extend(self.retargets);
        plan.status_changes.extend(self.status_changes);
        plan.theme_updates.extend(self.theme_updates);
        plan.evolution.extend(self.evolution);
    }
}

pub struct ThemeEvolver {
    store: Arc<dyn IThemeStore>,
    embedder: Arc<dyn IEmbedder>,
    extractor: Arc<dyn IThemeExtractor>,
    thresholds: Thresholds,
    token: CancellationToken,
}

impl ThemeEvolver {
    pub fn new(
        store: Arc<dyn IThemeStore>,
        embedder: Arc<dyn IEmbedder>,
        extractor: Arc<dyn IThemeExtractor>,
        thresholds: Thresholds,
        token: CancellationToken,
    ) -> Self {
        Self {
            store,
            embedder,
            extractor,
            thresholds,
            token,
        }
    }

    fn check_cancelled(&self, stage: &str) -> MosaicResult<()> {
        if self.token.is_cancelled() {
            return Err(MosaicError::Cancelled {
                stage: stage.to_string(),
            });
        }
        Ok(())
    }

    fn response_texts(&self, response_ids: &[String]) -> MosaicResult<Vec<String>> {
        let mut texts = Vec::with_capacity(response_ids.len());
        for id in response_ids {
            if let Some(response) = self.store.get_response(id)? {
                texts.push(response.text);
            }
        }
        Ok(texts)
    }

    /// (a) Assign each response to up to 3 live themes at or above the
    /// match threshold (multi-label). Similarities in the near band
    /// [update, match) feed that theme's refresh pool instead.
    pub fn match_to_existing(
        &self,
        catalog: &mut CatalogView,
        responses: &[Response],
        batch_id: u64,
    ) -> MosaicResult<EvolutionOutcome> {
        self.check_cancelled("match_to_existing")?;
        let mut outcome = EvolutionOutcome::default();

        for response in responses {
            let mut scored: Vec<(String, f64)> = catalog
                .iter()
                .filter(|s| s.theme.is_active())
                .map(|s| {
                    (
                        s.theme.id.clone(),
                        cosine_similarity(&response.embedding, &s.theme.embedding),
                    )
                })
                .filter(|(_, sim)| *sim >= self.thresholds.update_threshold)
                .collect();
            scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
            scored.truncate(MAX_CANDIDATES_PER_RESPONSE);

            for (theme_id, sim) in scored {
                let state = catalog
                    .get_mut(&theme_id)
                    .expect("scored theme is in the catalog");
                if sim >= self.thresholds.match_threshold {
                    outcome
                        .assignments
                        .push(Assignment::new(&response.id, &theme_id, sim, batch_id));
                    state.members.push(MemberRef {
                        response_id: response.id.clone(),
                        embedding: response.embedding.clone(),
                        confidence: sim,
                    });
                    state.fresh_response_ids.push(response.id.clone());
                } else {
                    state.near_response_ids.push(response.id.clone());
                }
            }
        }

        info!(
            batch_id,
            assignments = outcome.assignments.len(),
            "matched responses to existing themes"
        );
        Ok(outcome)
    }

    /// (b) Dedupe freshly extracted candidates against the catalog.
    /// A candidate within the merge threshold of a live theme is dropped
    /// and its intended responses are assigned to that theme; otherwise
    /// it becomes a new active theme. Candidates created earlier in this
    /// pass are part of the catalog, so re-proposals never duplicate.
    pub fn dedupe_candidates(
        &self,
        catalog: &mut CatalogView,
        candidates: &[(ThemeCandidate, Vec<f32>)],
        responses: &[Response],
        batch_id: u64,
    ) -> MosaicResult<EvolutionOutcome> {
        self.check_cancelled("dedupe_candidates")?;
        let mut outcome = EvolutionOutcome::default();

        for (candidate, embedding) in candidates {
            let best = catalog
                .iter()
                .filter(|s| s.theme.is_active())
                .map(|s| {
                    (
                        s.theme.id.clone(),
                        cosine_similarity(embedding, &s.theme.embedding),
                    )
                })
                .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

            // Responses this candidate was extracted to cover.
            let intended: Vec<&Response> = responses
                .iter()
                .filter(|r| {
                    cosine_similarity(&r.embedding, embedding) >= self.thresholds.match_threshold
                })
                .collect();

            match best {
                Some((theme_id, sim)) if sim >= self.thresholds.merge_threshold => {
                    debug!(
                        candidate = %candidate.name,
                        matched = %theme_id,
                        similarity = sim,
                        "candidate duplicates an existing theme, dropping"
                    );
                    let state = catalog
                        .get_mut(&theme_id)
                        .expect("matched theme is in the catalog");
                    for response in intended {
                        if state.members.iter().any(|m| m.response_id == response.id) {
                            continue;
                        }
                        let confidence =
                            cosine_similarity(&response.embedding, &state.theme.embedding);
                        outcome.assignments.push(Assignment::new(
                            &response.id,
                            &theme_id,
                            confidence,
                            batch_id,
                        ));
                        state.members.push(MemberRef {
                            response_id: response.id.clone(),
                            embedding: response.embedding.clone(),
                            confidence,
                        });
                        state.fresh_response_ids.push(response.id.clone());
                    }
                }
                _ => {
                    let theme = Theme::new(
                        &candidate.name,
                        &candidate.description,
                        embedding.clone(),
                        batch_id,
                    );
                    let mut state = ThemeState::fresh(theme.clone());
                    for response in intended {
                        let confidence = cosine_similarity(&response.embedding, embedding);
                        outcome.assignments.push(Assignment::new(
                            &response.id,
                            &theme.id,
                            confidence,
                            batch_id,
                        ));
                        state.members.push(MemberRef {
                            response_id: response.id.clone(),
                            embedding: response.embedding.clone(),
                            confidence,
                        });
                        state.fresh_response_ids.push(response.id.clone());
                    }
                    outcome.evolution.push(EvolutionEntry::new(
                        batch_id,
                        EvolutionAction::Created,
                        &theme.id,
                        None,
                        state.members.len() as u64,
                        EvolutionDetails::Created {
                            name: theme.name.clone(),
                        },
                    ));
                    info!(theme = %theme.name, members = state.members.len(), "created theme");
                    outcome.new_themes.push(theme);
                    catalog.push(state);
                }
            }
        }
        Ok(outcome)
    }

    /// (c) Pairwise merge detection over the live catalog. The survivor
    /// keeps the larger membership (ties go to the lower id); its
    /// embedding becomes the count-weighted average, renormalized, and
    /// its description is refreshed from the absorbed theme's responses.
    pub fn detect_merges(
        &self,
        catalog: &mut CatalogView,
        batch_id: u64,
    ) -> MosaicResult<EvolutionOutcome> {
        self.check_cancelled("detect_merges")?;
        let mut outcome = EvolutionOutcome::default();

        let ids = catalog.active_ids();
        let mut pairs: Vec<(String, String, f64)> = Vec::new();
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                let a = catalog.get(&ids[i]).expect("catalog id");
                let b = catalog.get(&ids[j]).expect("catalog id");
                let sim = cosine_similarity(&a.theme.embedding, &b.theme.embedding);
                if sim >= self.thresholds.merge_threshold {
                    pairs.push((ids[i].clone(), ids[j].clone(), sim));
                }
            }
        }
        // Most-similar pairs merge first; id order breaks exact ties.
        pairs.sort_by(|a, b| {
            b.2.partial_cmp(&a.2)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| (&a.0, &a.1).cmp(&(&b.0, &b.1)))
        });

        for (id_a, id_b, sim) in pairs {
            let (a, b) = (
                catalog.get(&id_a).expect("catalog id"),
                catalog.get(&id_b).expect("catalog id"),
            );
            if a.transitioned || b.transitioned || !a.theme.is_active() || !b.theme.is_active() {
                continue;
            }

            let (survivor_id, loser_id) = pick_survivor(a, b);
            let survivor = catalog.get(&survivor_id).expect("catalog id");
            let loser = catalog.get(&loser_id).expect("catalog id");

            let merged_embedding = mosaic_core::vector::weighted_merge(
                &survivor.theme.embedding,
                survivor.members.len().max(1) as f64,
                &loser.theme.embedding,
                loser.members.len().max(1) as f64,
            );

            // Refresh the survivor's description against the absorbed
            // theme's evidence, when there is any.
            let loser_member_ids: Vec<String> =
                loser.members.iter().map(|m| m.response_id.clone()).collect();
            let loser_members = loser.members.clone();
            let loser_name = loser.theme.name.clone();
            let affected = loser.members.len() as u64;

            let description = if loser_member_ids.is_empty() {
                survivor.theme.description.clone()
            } else {
                let texts = self.response_texts(&loser_member_ids)?;
                self.extractor
                    .refresh_description(&survivor.theme, &texts)?
            };

            let mut metadata = survivor.theme.metadata.clone();
            metadata.absorbed.push(loser_id.clone());

            outcome.theme_updates.push(ThemeUpdate {
                theme_id: survivor_id.clone(),
                description: Some(description.clone()),
                embedding: Some(merged_embedding.clone()),
                metadata: Some(metadata.clone()),
                last_updated_batch: batch_id,
            });
            outcome.status_changes.push(StatusChange {
                theme_id: loser_id.clone(),
                status: ThemeStatus::Merged,
                parent_theme_id: Some(survivor_id.clone()),
                batch_id,
            });
            outcome.rewrites.push(AssignmentRewrite {
                from_theme_id: loser_id.clone(),
                to_theme_id: survivor_id.clone(),
            });
            outcome.evolution.push(EvolutionEntry::new(
                batch_id,
                EvolutionAction::Merged,
                &survivor_id,
                Some(&loser_id),
                affected,
                EvolutionDetails::Merged {
                    survivor_name: survivor.theme.name.clone(),
                    absorbed_name: loser_name.clone(),
                    similarity: sim,
                },
            ));
            info!(
                survivor = %survivor.theme.name,
                absorbed = %loser_name,
                similarity = sim,
                "merging themes"
            );

            // Update the working set for the remaining passes.
            let survivor_state = catalog.get_mut(&survivor_id).expect("catalog id");
            survivor_state.theme.embedding = merged_embedding;
            survivor_state.theme.description = description;
            survivor_state.theme.metadata = metadata;
            survivor_state.transitioned = true;
            for member in loser_members {
                if !survivor_state
                    .members
                    .iter()
                    .any(|m| m.response_id == member.response_id)
                {
                    survivor_state.members.push(member);
                }
            }
            let loser_state = catalog.get_mut(&loser_id).expect("catalog id");
            loser_state.theme.status = ThemeStatus::Merged;
            loser_state.members.clear();
            loser_state.transitioned = true;
        }

        Ok(outcome)
    }

    /// (d) Split detection: a theme with enough members and excessive
    /// intra-cluster variance is partitioned with 2-means; both children
    /// must clear the minimum membership or the split is abandoned.
    pub fn detect_splits(
        &self,
        catalog: &mut CatalogView,
        question: &str,
        batch_id: u64,
    ) -> MosaicResult<EvolutionOutcome> {
        self.check_cancelled("detect_splits")?;
        let mut outcome = EvolutionOutcome::default();
        let min_members = self.thresholds.min_responses_per_theme;

        for theme_id in catalog.active_ids() {
            let state = catalog.get(&theme_id).expect("catalog id");
            if state.transitioned || state.members.len() < min_members * 2 {
                continue;
            }
            let embeddings: Vec<Vec<f32>> =
                state.members.iter().map(|m| m.embedding.clone()).collect();
            let variance = kmeans::cluster_variance(&embeddings);
            if variance <= self.thresholds.split_variance_threshold {
                continue;
            }

            let (labels, centroids) = kmeans::two_means(&embeddings);
            let cluster_members = |cluster: usize| -> Vec<MemberRef> {
                state
                    .members
                    .iter()
                    .zip(labels.iter())
                    .filter(|(_, l)| **l == cluster)
                    .map(|(m, _)| m.clone())
                    .collect()
            };
            let clusters = [cluster_members(0), cluster_members(1)];
            if clusters.iter().any(|c| c.len() < min_members) {
                debug!(
                    theme = %state.theme.name,
                    variance,
                    "split abandoned, a child would be under the minimum"
                );
                continue;
            }

            let parent_name = state.theme.name.clone();
            let parent_description = state.theme.description.clone();
            info!(theme = %parent_name, variance, "splitting theme");

            let mut child_states: Vec<ThemeState> = Vec::with_capacity(2);
            let mut child_names: Vec<String> = Vec::with_capacity(2);
            for (k, members) in clusters.iter().enumerate() {
                self.check_cancelled("detect_splits")?;
                let member_ids: Vec<String> =
                    members.iter().map(|m| m.response_id.clone()).collect();
                let texts = self.response_texts(&member_ids)?;
                let proposals = self.extractor.extract(question, &texts, batch_id)?;
                let (name, description) = match proposals.into_iter().next() {
                    Some(candidate) => (candidate.name, candidate.description),
                    // Parse-failure recovery: keep the parent's framing.
                    None => (format!("{parent_name} ({})", k + 1), parent_description.clone()),
                };

                let mut child = Theme::new(&name, &description, centroids[k].clone(), batch_id);
                child.parent_theme_id = Some(theme_id.clone());
                child.metadata.origin = ThemeOrigin::SplitChild;
                child_names.push(name);

                for member in members {
                    outcome.retargets.push(AssignmentRetarget {
                        response_id: member.response_id.clone(),
                        from_theme_id: theme_id.clone(),
                        to_theme_id: child.id.clone(),
                    });
                }

                let mut child_state = ThemeState::fresh(child.clone());
                child_state.members = members.clone();
                child_state.transitioned = true;
                outcome.new_themes.push(child);
                child_states.push(child_state);
            }

            outcome.status_changes.push(StatusChange {
                theme_id: theme_id.clone(),
                status: ThemeStatus::Split,
                parent_theme_id: None,
                batch_id,
            });
            outcome.evolution.push(EvolutionEntry::new(
                batch_id,
                EvolutionAction::Split,
                &theme_id,
                None,
                state.members.len() as u64,
                EvolutionDetails::Split {
                    parent_name,
                    child_names,
                    variance,
                },
            ));

            let parent_state = catalog.get_mut(&theme_id).expect("catalog id");
            parent_state.theme.status = ThemeStatus::Split;
            parent_state.members.clear();
            parent_state.transitioned = true;
            for child_state in child_states {
                catalog.push(child_state);
            }
        }

        Ok(outcome)
    }

    /// (e) Refresh descriptions of themes that accumulated enough new
    /// evidence this batch; apply only when the embedding drifts past
    /// the update threshold. Ends with a sweep retiring active themes
    /// whose membership has emptied.
    pub fn refresh_descriptions(
        &self,
        catalog: &mut CatalogView,
        batch_id: u64,
    ) -> MosaicResult<EvolutionOutcome> {
        self.check_cancelled("refresh_descriptions")?;
        let mut outcome = EvolutionOutcome::default();

        for theme_id in catalog.active_ids() {
            let state = catalog.get(&theme_id).expect("catalog id");
            if state.transitioned || state.is_new {
                continue;
            }
            let pool = state.refresh_pool();
            if pool.len() < MIN_REFRESH_POOL {
                continue;
            }

            let texts = self.response_texts(&pool)?;
            let new_description = self.extractor.refresh_description(&state.theme, &texts)?;
            if new_description == state.theme.description {
                continue;
            }
            let new_embedding = self.embedder.embed(&theme_embedding_text(
                &state.theme.name,
                &new_description,
            ))?;
            let drift = 1.0 - cosine_similarity(&state.theme.embedding, &new_embedding);
            if drift <= self.thresholds.drift_update {
                debug!(theme = %state.theme.name, drift, "refresh below drift threshold, keeping description");
                continue;
            }

            let previous = state.theme.description.clone();
            let mut metadata = state.theme.metadata.clone();
            metadata.refresh_count += 1;

            outcome.theme_updates.push(ThemeUpdate {
                theme_id: theme_id.clone(),
                description: Some(new_description.clone()),
                embedding: Some(new_embedding.clone()),
                metadata: Some(metadata.clone()),
                last_updated_batch: batch_id,
            });
            outcome.evolution.push(EvolutionEntry::new(
                batch_id,
                EvolutionAction::Updated,
                &theme_id,
                None,
                pool.len() as u64,
                EvolutionDetails::Updated {
                    previous_description: previous,
                    new_description: new_description.clone(),
                    drift,
                },
            ));
            info!(theme = %state.theme.name, drift, "description refreshed");

            let state = catalog.get_mut(&theme_id).expect("catalog id");
            state.theme.description = new_description;
            state.theme.embedding = new_embedding;
            state.theme.metadata = metadata;
            state.transitioned = true;
        }

        // Retirement sweep: a live theme whose membership emptied has
        // nothing left to match against.
        for theme_id in catalog.active_ids() {
            let state = catalog.get(&theme_id).expect("catalog id");
            if state.transitioned || state.is_new || !state.members.is_empty() {
                continue;
            }
            outcome.status_changes.push(StatusChange {
                theme_id: theme_id.clone(),
                status: ThemeStatus::Retired,
                parent_theme_id: None,
                batch_id,
            });
            outcome.evolution.push(EvolutionEntry::new(
                batch_id,
                EvolutionAction::Retired,
                &theme_id,
                None,
                0,
                EvolutionDetails::Retired {
                    reason: "no live assignments".to_string(),
                },
            ));
            let state = catalog.get_mut(&theme_id).expect("catalog id");
            state.theme.status = ThemeStatus::Retired;
            state.transitioned = true;
        }

        Ok(outcome)
    }
}

/// Survivor selection: larger membership wins, lower id breaks ties.
fn pick_survivor(a: &ThemeState, b: &ThemeState) -> (String, String) {
    let (a_count, b_count) = (a.members.len(), b.members.len());
    if a_count > b_count || (a_count == b_count && a.theme.id < b.theme.id) {
        (a.theme.id.clone(), b.theme.id.clone())
    } else {
        (b.theme.id.clone(), a.theme.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mosaic_core::vector::l2_normalize;
    use mosaic_storage::StorageEngine;

    /// Embedder pinned to one direction, so description-drift in tests
    /// is fully controlled by the theme embedding it is compared to.
    struct ConstEmbedder;

    impl IEmbedder for ConstEmbedder {
        fn embed(&self, _text: &str) -> MosaicResult<Vec<f32>> {
            Ok(l2_normalize(&[0.0, 1.0, 0.0, 0.0]))
        }
        fn embed_many(&self, texts: &[String]) -> MosaicResult<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| l2_normalize(&[0.0, 1.0, 0.0, 0.0])).collect())
        }
        fn dimensions(&self) -> usize {
            4
        }
        fn model_name(&self) -> &str {
            "const"
        }
    }

    /// Extractor that answers every call with a fixed proposal/refresh.
    struct FixedExtractor;

    impl IThemeExtractor for FixedExtractor {
        fn extract(
            &self,
            _question: &str,
            _responses: &[String],
            _batch_id: u64,
        ) -> MosaicResult<Vec<ThemeCandidate>> {
            Ok(vec![ThemeCandidate {
                name: "Extracted Child".to_string(),
                description: "A child theme.".to_string(),
            }])
        }
        fn refresh_description(
            &self,
            _theme: &Theme,
            _new_responses: &[String],
        ) -> MosaicResult<String> {
            Ok("A merged, refreshed description.".to_string())
        }
    }

    /// Extractor whose output is never parseable (recovers to empty).
    struct EmptyExtractor;

    impl IThemeExtractor for EmptyExtractor {
        fn extract(
            &self,
            _question: &str,
            _responses: &[String],
            _batch_id: u64,
        ) -> MosaicResult<Vec<ThemeCandidate>> {
            Ok(vec![])
        }
        fn refresh_description(
            &self,
            theme: &Theme,
            _new_responses: &[String],
        ) -> MosaicResult<String> {
            Ok(theme.description.clone())
        }
    }

    fn evolver(store: Arc<StorageEngine>) -> ThemeEvolver {
        ThemeEvolver::new(
            store,
            Arc::new(ConstEmbedder),
            Arc::new(FixedExtractor),
            Thresholds::default(),
            CancellationToken::new(),
        )
    }

    /// A direction nearly opposite `axis(0)`: far enough that a theme
    /// holding both sides has intra-cluster variance above the split
    /// threshold of 0.40.
    fn counter_axis() -> Vec<f32> {
        l2_normalize(&[-1.0, 0.3, 0.0, 0.0])
    }

    fn axis(i: usize) -> Vec<f32> {
        let mut v = vec![0.0; 4];
        v[i] = 1.0;
        v
    }

    fn seeded_theme(catalog: &mut CatalogView, name: &str, embedding: Vec<f32>) -> String {
        let theme = Theme::new(name, "desc", embedding, 1);
        let id = theme.id.clone();
        let mut state = ThemeState::fresh(theme);
        state.is_new = false;
        catalog.push(state);
        id
    }

    fn empty_catalog() -> CatalogView {
        let store = StorageEngine::open_in_memory().unwrap();
        CatalogView::load(&store).unwrap()
    }

    #[test]
    fn match_assigns_above_threshold_and_records_near_band() {
        let store = Arc::new(StorageEngine::open_in_memory().unwrap());
        let evolver = evolver(store);
        let mut catalog = empty_catalog();
        let theme_id = seeded_theme(&mut catalog, "Axis Zero", axis(0));

        let strong = Response::new(2, "q", "strong", l2_normalize(&[0.95, 0.05, 0.0, 0.0]));
        let near = Response::new(2, "q", "near", l2_normalize(&[0.6, 0.8, 0.0, 0.0]));
        let unrelated = Response::new(2, "q", "far", axis(2));

        let outcome = evolver
            .match_to_existing(&mut catalog, &[strong.clone(), near.clone(), unrelated], 2)
            .unwrap();

        assert_eq!(outcome.assignments.len(), 1);
        assert_eq!(outcome.assignments[0].response_id, strong.id);
        assert!(outcome.assignments[0].confidence >= 0.75);

        let state = catalog.get(&theme_id).unwrap();
        assert_eq!(state.fresh_response_ids, vec![strong.id]);
        assert_eq!(state.near_response_ids, vec![near.id]);
    }

    #[test]
    fn match_is_multi_label_up_to_three() {
        let store = Arc::new(StorageEngine::open_in_memory().unwrap());
        let evolver = evolver(store);
        let mut catalog = empty_catalog();
        // Four themes all close to the response direction.
        for i in 0..4 {
            let mut e = vec![1.0, 0.0, 0.0, 0.0];
            e[1] = 0.05 * i as f32;
            seeded_theme(&mut catalog, &format!("Theme {i}"), l2_normalize(&e));
        }
        let response = Response::new(2, "q", "resp", axis(0));
        let outcome = evolver
            .match_to_existing(&mut catalog, &[response], 2)
            .unwrap();
        assert_eq!(outcome.assignments.len(), 3);
    }

    #[test]
    fn zero_embedding_response_matches_nothing() {
        let store = Arc::new(StorageEngine::open_in_memory().unwrap());
        let evolver = evolver(store);
        let mut catalog = empty_catalog();
        seeded_theme(&mut catalog, "Theme", axis(0));
        let blank = Response::new(2, "q", "", vec![0.0; 4]);
        let outcome = evolver.match_to_existing(&mut catalog, &[blank], 2).unwrap();
        assert!(outcome.assignments.is_empty());
    }

    #[test]
    fn dedupe_drops_duplicate_candidate_and_reassigns() {
        let store = Arc::new(StorageEngine::open_in_memory().unwrap());
        let evolver = evolver(store);
        let mut catalog = empty_catalog();
        let existing = seeded_theme(&mut catalog, "API Challenges", axis(0));

        let candidate = ThemeCandidate {
            name: "API Problems".to_string(),
            description: "Same thing, different words.".to_string(),
        };
        let near_duplicate = l2_normalize(&[0.99, 0.1, 0.0, 0.0]);
        let response = Response::new(2, "q", "api woes", l2_normalize(&[0.97, 0.2, 0.0, 0.0]));

        let outcome = evolver
            .dedupe_candidates(
                &mut catalog,
                &[(candidate, near_duplicate)],
                &[response.clone()],
                2,
            )
            .unwrap();

        assert!(outcome.new_themes.is_empty());
        assert_eq!(outcome.assignments.len(), 1);
        assert_eq!(outcome.assignments[0].theme_id, existing);
        assert_eq!(outcome.assignments[0].response_id, response.id);
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn dedupe_creates_novel_candidate_with_intended_responses() {
        let store = Arc::new(StorageEngine::open_in_memory().unwrap());
        let evolver = evolver(store);
        let mut catalog = empty_catalog();
        seeded_theme(&mut catalog, "Existing", axis(0));

        let candidate = ThemeCandidate {
            name: "Documentation Gaps".to_string(),
            description: "Docs are lacking.".to_string(),
        };
        let response = Response::new(2, "q", "docs sparse", l2_normalize(&[0.0, 0.98, 0.1, 0.0]));

        let outcome = evolver
            .dedupe_candidates(&mut catalog, &[(candidate, axis(1))], &[response], 2)
            .unwrap();

        assert_eq!(outcome.new_themes.len(), 1);
        assert_eq!(outcome.new_themes[0].name, "Documentation Gaps");
        assert_eq!(outcome.assignments.len(), 1);
        assert_eq!(outcome.evolution.len(), 1);
        assert_eq!(outcome.evolution[0].action, EvolutionAction::Created);
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn dedupe_catches_repeat_within_same_batch() {
        let store = Arc::new(StorageEngine::open_in_memory().unwrap());
        let evolver = evolver(store);
        let mut catalog = empty_catalog();

        let first = ThemeCandidate {
            name: "Pricing".to_string(),
            description: "Costs.".to_string(),
        };
        let second = ThemeCandidate {
            name: "Price Concerns".to_string(),
            description: "Also costs.".to_string(),
        };
        let outcome = evolver
            .dedupe_candidates(
                &mut catalog,
                &[
                    (first, axis(2)),
                    (second, l2_normalize(&[0.0, 0.0, 0.99, 0.05])),
                ],
                &[],
                2,
            )
            .unwrap();

        // The second candidate duplicates the first within the batch.
        assert_eq!(outcome.new_themes.len(), 1);
        assert_eq!(outcome.new_themes[0].name, "Pricing");
    }

    #[test]
    fn merge_picks_larger_theme_as_survivor() {
        let store = Arc::new(StorageEngine::open_in_memory().unwrap());
        // Responses must exist for the survivor's description refresh.
        let r1 = Response::new(1, "q", "resp one", axis(0));
        let r2 = Response::new(1, "q", "resp two", axis(0));
        store.put_response(&r1).unwrap();
        store.put_response(&r2).unwrap();

        let evolver = evolver(store);
        let mut catalog = empty_catalog();
        let big = seeded_theme(&mut catalog, "Big", axis(0));
        let small = seeded_theme(&mut catalog, "Small", l2_normalize(&[0.99, 0.1, 0.0, 0.0]));
        catalog.get_mut(&big).unwrap().members = vec![
            MemberRef {
                response_id: r1.id.clone(),
                embedding: axis(0),
                confidence: 0.9,
            },
            MemberRef {
                response_id: r2.id.clone(),
                embedding: axis(0),
                confidence: 0.9,
            },
        ];
        catalog.get_mut(&small).unwrap().members = vec![MemberRef {
            response_id: r1.id.clone(),
            embedding: axis(0),
            confidence: 0.8,
        }];

        let outcome = evolver.detect_merges(&mut catalog, 2).unwrap();

        assert_eq!(outcome.rewrites.len(), 1);
        assert_eq!(outcome.rewrites[0].from_theme_id, small);
        assert_eq!(outcome.rewrites[0].to_theme_id, big);
        assert_eq!(outcome.status_changes.len(), 1);
        assert_eq!(outcome.status_changes[0].status, ThemeStatus::Merged);
        assert_eq!(
            outcome.status_changes[0].parent_theme_id,
            Some(big.clone())
        );
        assert_eq!(outcome.evolution.len(), 1);
        assert_eq!(outcome.evolution[0].action, EvolutionAction::Merged);

        // Survivor embedding stays unit norm after the weighted average.
        let update = &outcome.theme_updates[0];
        let norm = mosaic_core::vector::l2_norm(update.embedding.as_ref().unwrap());
        assert!((norm - 1.0).abs() < 1e-6);

        // Both parties are done transitioning for this batch.
        assert!(catalog.get(&big).unwrap().transitioned);
        assert!(catalog.get(&small).unwrap().transitioned);
    }

    #[test]
    fn distant_themes_do_not_merge() {
        let store = Arc::new(StorageEngine::open_in_memory().unwrap());
        let evolver = evolver(store);
        let mut catalog = empty_catalog();
        seeded_theme(&mut catalog, "A", axis(0));
        seeded_theme(&mut catalog, "B", axis(1));
        let outcome = evolver.detect_merges(&mut catalog, 2).unwrap();
        assert!(outcome.rewrites.is_empty());
        assert!(outcome.evolution.is_empty());
    }

    #[test]
    fn split_partitions_bimodal_theme() {
        let store = Arc::new(StorageEngine::open_in_memory().unwrap());
        let mut members = Vec::new();
        for i in 0..6 {
            let embedding = if i < 3 { axis(0) } else { counter_axis() };
            let response = Response::new(1, "q", &format!("resp {i}"), embedding.clone());
            store.put_response(&response).unwrap();
            members.push(MemberRef {
                response_id: response.id,
                embedding,
                confidence: 0.8,
            });
        }

        let evolver = evolver(store);
        let mut catalog = empty_catalog();
        let parent = seeded_theme(&mut catalog, "Mixed Bag", axis(0));
        catalog.get_mut(&parent).unwrap().members = members;

        let outcome = evolver.detect_splits(&mut catalog, "q", 2).unwrap();

        assert_eq!(outcome.new_themes.len(), 2);
        assert_eq!(outcome.retargets.len(), 6);
        assert_eq!(outcome.status_changes.len(), 1);
        assert_eq!(outcome.status_changes[0].status, ThemeStatus::Split);
        let split_entries: Vec<_> = outcome
            .evolution
            .iter()
            .filter(|e| e.action == EvolutionAction::Split)
            .collect();
        assert_eq!(split_entries.len(), 1);
        assert_eq!(split_entries[0].affected_response_count, 6);
        for child in &outcome.new_themes {
            assert_eq!(child.parent_theme_id, Some(parent.clone()));
            assert_eq!(child.metadata.origin, ThemeOrigin::SplitChild);
        }
        // Each retarget goes to one of the two children, three per side.
        let to_first = outcome
            .retargets
            .iter()
            .filter(|r| r.to_theme_id == outcome.new_themes[0].id)
            .count();
        assert_eq!(to_first, 3);
    }

    #[test]
    fn tight_theme_is_not_split() {
        let store = Arc::new(StorageEngine::open_in_memory().unwrap());
        let evolver = evolver(store);
        let mut catalog = empty_catalog();
        let parent = seeded_theme(&mut catalog, "Tight", axis(0));
        catalog.get_mut(&parent).unwrap().members = (0..6)
            .map(|i| MemberRef {
                response_id: format!("r{i}"),
                embedding: l2_normalize(&[1.0, 0.01 * i as f32, 0.0, 0.0]),
                confidence: 0.9,
            })
            .collect();

        let outcome = evolver.detect_splits(&mut catalog, "q", 2).unwrap();
        assert!(outcome.new_themes.is_empty());
        assert!(outcome.status_changes.is_empty());
    }

    #[test]
    fn lopsided_split_is_abandoned() {
        let store = Arc::new(StorageEngine::open_in_memory().unwrap());
        let evolver = evolver(store);
        let mut catalog = empty_catalog();
        let parent = seeded_theme(&mut catalog, "Lopsided", axis(0));
        // Three members on one axis, one far outlier: the variance gate
        // opens, but the outlier cluster would have a single member,
        // below the minimum of two.
        let mut members: Vec<MemberRef> = (0..3)
            .map(|i| MemberRef {
                response_id: format!("r{i}"),
                embedding: axis(0),
                confidence: 0.9,
            })
            .collect();
        members.push(MemberRef {
            response_id: "outlier".to_string(),
            embedding: counter_axis(),
            confidence: 0.8,
        });
        catalog.get_mut(&parent).unwrap().members = members;

        let outcome = evolver.detect_splits(&mut catalog, "q", 2).unwrap();
        assert!(outcome.new_themes.is_empty());
        assert!(catalog.get(&parent).unwrap().theme.is_active());
    }

    #[test]
    fn refresh_applies_only_past_drift_threshold() {
        let store = Arc::new(StorageEngine::open_in_memory().unwrap());
        let mut fresh_ids = Vec::new();
        for i in 0..3 {
            let response = Response::new(2, "q", &format!("new evidence {i}"), axis(0));
            store.put_response(&response).unwrap();
            fresh_ids.push(response.id);
        }

        let evolver = evolver(store);
        let mut catalog = empty_catalog();
        let theme_id = seeded_theme(&mut catalog, "Drifter", axis(0));
        catalog.get_mut(&theme_id).unwrap().fresh_response_ids = fresh_ids;

        let outcome = evolver.refresh_descriptions(&mut catalog, 2).unwrap();

        // FixedExtractor returns a new description; ConstEmbedder lands
        // it orthogonal to axis(0), so the drift gate opens.
        assert_eq!(outcome.theme_updates.len(), 1);
        assert_eq!(outcome.evolution.len(), 1);
        assert_eq!(outcome.evolution[0].action, EvolutionAction::Updated);
        let state = catalog.get(&theme_id).unwrap();
        assert_eq!(state.theme.metadata.refresh_count, 1);
        assert!(state.transitioned);
    }

    #[test]
    fn refresh_skips_small_pools_and_new_themes() {
        let store = Arc::new(StorageEngine::open_in_memory().unwrap());
        let evolver = ThemeEvolver::new(
            store,
            Arc::new(ConstEmbedder),
            Arc::new(EmptyExtractor),
            Thresholds::default(),
            CancellationToken::new(),
        );
        let mut catalog = empty_catalog();
        let small_pool = seeded_theme(&mut catalog, "Quiet", axis(0));
        catalog.get_mut(&small_pool).unwrap().fresh_response_ids =
            vec!["r1".to_string(), "r2".to_string()];

        let brand_new = Theme::new("Brand New", "desc", axis(1), 2);
        let mut state = ThemeState::fresh(brand_new);
        state.fresh_response_ids = vec!["a".into(), "b".into(), "c".into()];
        catalog.push(state);

        let outcome = evolver.refresh_descriptions(&mut catalog, 2).unwrap();
        assert!(outcome.theme_updates.is_empty());
    }

    #[test]
    fn emptied_theme_is_retired_in_final_sweep() {
        let store = Arc::new(StorageEngine::open_in_memory().unwrap());
        let evolver = evolver(store);
        let mut catalog = empty_catalog();
        let hollow = seeded_theme(&mut catalog, "Hollow", axis(3));

        let outcome = evolver.refresh_descriptions(&mut catalog, 2).unwrap();

        let retired: Vec<_> = outcome
            .status_changes
            .iter()
            .filter(|c| c.status == ThemeStatus::Retired)
            .collect();
        assert_eq!(retired.len(), 1);
        assert_eq!(retired[0].theme_id, hollow);
        assert!(outcome
            .evolution
            .iter()
            .any(|e| e.action == EvolutionAction::Retired));
    }

    #[test]
    fn merge_survivor_does_not_split_in_same_batch() {
        let store = Arc::new(StorageEngine::open_in_memory().unwrap());
        let mut members = Vec::new();
        for i in 0..6 {
            let embedding = if i < 3 { axis(0) } else { counter_axis() };
            let response = Response::new(1, "q", &format!("resp {i}"), embedding.clone());
            store.put_response(&response).unwrap();
            members.push(MemberRef {
                response_id: response.id,
                embedding,
                confidence: 0.8,
            });
        }

        let evolver = evolver(store);
        let mut catalog = empty_catalog();
        let survivor = seeded_theme(&mut catalog, "Survivor", l2_normalize(&[1.0, 1.0, 0.0, 0.0]));
        let loser = seeded_theme(
            &mut catalog,
            "Loser",
            l2_normalize(&[0.99, 0.95, 0.0, 0.0]),
        );
        catalog.get_mut(&survivor).unwrap().members = members;
        catalog.get_mut(&loser).unwrap().members = vec![];

        let merge_outcome = evolver.detect_merges(&mut catalog, 2).unwrap();
        assert_eq!(merge_outcome.rewrites.len(), 1);

        // The survivor's membership is bimodal, but it already
        // transitioned this batch, so the split pass must skip it.
        let split_outcome = evolver.detect_splits(&mut catalog, "q", 2).unwrap();
        assert!(split_outcome.new_themes.is_empty());
    }
}
