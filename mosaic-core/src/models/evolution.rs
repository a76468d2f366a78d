use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What happened to a theme. Serialized as lowercase strings in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvolutionAction {
    Created,
    Updated,
    Merged,
    Split,
    Retired,
    Reassigned,
}

impl EvolutionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvolutionAction::Created => "created",
            EvolutionAction::Updated => "updated",
            EvolutionAction::Merged => "merged",
            EvolutionAction::Split => "split",
            EvolutionAction::Retired => "retired",
            EvolutionAction::Reassigned => "reassigned",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created" => Some(EvolutionAction::Created),
            "updated" => Some(EvolutionAction::Updated),
            "merged" => Some(EvolutionAction::Merged),
            "split" => Some(EvolutionAction::Split),
            "retired" => Some(EvolutionAction::Retired),
            "reassigned" => Some(EvolutionAction::Reassigned),
            _ => None,
        }
    }
}

/// Per-action payload, stored as tagged JSON in the log's `details` column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvolutionDetails {
    Created {
        name: String,
    },
    Updated {
        previous_description: String,
        new_description: String,
        drift: f64,
    },
    Merged {
        survivor_name: String,
        absorbed_name: String,
        similarity: f64,
    },
    Split {
        parent_name: String,
        child_names: Vec<String>,
        variance: f64,
    },
    Retired {
        reason: String,
    },
    Reassigned {
        from_theme_id: String,
        to_theme_id: String,
    },
}

/// One append-only record in the theme evolution log. Never mutated
/// or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionEntry {
    pub batch_id: u64,
    pub action: EvolutionAction,
    pub theme_id: String,
    /// Merge partner, split parent, or reassignment source.
    pub related_theme_id: Option<String>,
    pub affected_response_count: u64,
    pub details: EvolutionDetails,
    pub created_at: DateTime<Utc>,
}

impl EvolutionEntry {
    pub fn new(
        batch_id: u64,
        action: EvolutionAction,
        theme_id: &str,
        related_theme_id: Option<&str>,
        affected_response_count: u64,
        details: EvolutionDetails,
    ) -> Self {
        Self {
            batch_id,
            action,
            theme_id: theme_id.to_string(),
            related_theme_id: related_theme_id.map(str::to_string),
            affected_response_count,
            details,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_roundtrips_through_strings() {
        for action in [
            EvolutionAction::Created,
            EvolutionAction::Updated,
            EvolutionAction::Merged,
            EvolutionAction::Split,
            EvolutionAction::Retired,
            EvolutionAction::Reassigned,
        ] {
            assert_eq!(EvolutionAction::parse(action.as_str()), Some(action));
        }
    }

    #[test]
    fn details_serialize_with_kind_tag() {
        let details = EvolutionDetails::Merged {
            survivor_name: "API Challenges".to_string(),
            absorbed_name: "API Problems".to_string(),
            similarity: 0.91,
        };
        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["kind"], "merged");
        assert_eq!(json["survivor_name"], "API Challenges");
    }
}
