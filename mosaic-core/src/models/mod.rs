//! Domain models shared across the workspace.

mod assignment;
mod batch;
mod evolution;
mod highlight;
mod plan;
mod response;
mod stats;
mod theme;

pub use assignment::Assignment;
pub use batch::{BatchInput, BatchMetadata, BatchResult};
pub use evolution::{EvolutionAction, EvolutionDetails, EvolutionEntry};
pub use highlight::Highlight;
pub use plan::{AssignmentRetarget, AssignmentRewrite, BatchPlan, StatusChange, ThemeUpdate};
pub use response::Response;
pub use stats::CatalogStats;
pub use theme::{Theme, ThemeCandidate, ThemeMetadata, ThemeOrigin, ThemeStatus};
