//! In-memory working set for one batch.
//!
//! The evolver operates on copies of the active themes and their live
//! assignments, loaded once at batch start. The store stays the single
//! owner of persisted state; nothing here writes back.

use std::collections::HashMap;

use mosaic_core::errors::MosaicResult;
use mosaic_core::models::{Theme, ThemeStatus};
use mosaic_core::traits::IThemeStore;

/// One live assignment as the evolver sees it: just the response
/// pointer, its embedding, and the confidence that produced it.
#[derive(Debug, Clone)]
pub struct MemberRef {
    pub response_id: String,
    pub embedding: Vec<f32>,
    pub confidence: f64,
}

/// Working copy of one theme plus its per-batch bookkeeping.
#[derive(Debug, Clone)]
pub struct ThemeState {
    pub theme: Theme,
    /// Live assignments (historical and from this batch).
    pub members: Vec<MemberRef>,
    /// Created during this batch (dedupe pass or split promotion).
    pub is_new: bool,
    /// Responses newly assigned this batch (refresh pool).
    pub fresh_response_ids: Vec<String>,
    /// Near-matching responses this batch (refresh pool).
    pub near_response_ids: Vec<String>,
    /// One state transition per theme per batch.
    pub transitioned: bool,
}

impl ThemeState {
    fn existing(theme: Theme, members: Vec<MemberRef>) -> Self {
        Self {
            theme,
            members,
            is_new: false,
            fresh_response_ids: Vec::new(),
            near_response_ids: Vec::new(),
            transitioned: false,
        }
    }

    pub fn fresh(theme: Theme) -> Self {
        Self {
            theme,
            members: Vec::new(),
            is_new: true,
            fresh_response_ids: Vec::new(),
            near_response_ids: Vec::new(),
            transitioned: false,
        }
    }

    /// Distinct responses feeding a potential description refresh.
    pub fn refresh_pool(&self) -> Vec<String> {
        let mut pool = self.fresh_response_ids.clone();
        for id in &self.near_response_ids {
            if !pool.contains(id) {
                pool.push(id.clone());
            }
        }
        pool
    }
}

/// The full working set: every active theme, indexed by id.
pub struct CatalogView {
    states: Vec<ThemeState>,
    index: HashMap<String, usize>,
}

impl CatalogView {
    /// Load every active theme and its live assignments (with response
    /// embeddings) from the store.
    pub fn load(store: &dyn IThemeStore) -> MosaicResult<Self> {
        let themes = store.list_themes(Some(ThemeStatus::Active))?;
        let mut states = Vec::with_capacity(themes.len());
        for theme in themes {
            let assignments = store.assignments_for_theme(&theme.id)?;
            let mut members = Vec::with_capacity(assignments.len());
            for assignment in assignments {
                if let Some(response) = store.get_response(&assignment.response_id)? {
                    members.push(MemberRef {
                        response_id: assignment.response_id,
                        embedding: response.embedding,
                        confidence: assignment.confidence,
                    });
                }
            }
            states.push(ThemeState::existing(theme, members));
        }
        let index = states
            .iter()
            .enumerate()
            .map(|(i, s)| (s.theme.id.clone(), i))
            .collect();
        Ok(Self { states, index })
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn push(&mut self, state: ThemeState) {
        self.index.insert(state.theme.id.clone(), self.states.len());
        self.states.push(state);
    }

    pub fn get(&self, theme_id: &str) -> Option<&ThemeState> {
        self.index.get(theme_id).map(|&i| &self.states[i])
    }

    pub fn get_mut(&mut self, theme_id: &str) -> Option<&mut ThemeState> {
        let i = *self.index.get(theme_id)?;
        Some(&mut self.states[i])
    }

    /// Ids of themes still active in the working set, in insertion order.
    pub fn active_ids(&self) -> Vec<String> {
        self.states
            .iter()
            .filter(|s| s.theme.is_active())
            .map(|s| s.theme.id.clone())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ThemeState> {
        self.states.iter()
    }
}
