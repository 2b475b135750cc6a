use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    ApplicationId, RequirementCategory, RequirementDetail, RequirementKind,
    RequirementNecessity,
};
use super::validation::{DetailDraft, RequirementDraft};

/// Identifier wrapper for reusable requirement templates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemplateId(pub String);

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Audience a template is built for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TemplateCategory {
    Graduate,
    Undergraduate,
    Scholarship,
    Custom,
}

impl TemplateCategory {
    pub const fn label(self) -> &'static str {
        match self {
            TemplateCategory::Graduate => "graduate",
            TemplateCategory::Undergraduate => "undergraduate",
            TemplateCategory::Scholarship => "scholarship",
            TemplateCategory::Custom => "custom",
        }
    }
}

/// Stateless blueprint for one requirement: classification and detail, no
/// status or linkage. Expanded into a concrete requirement when the template
/// is applied to an application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementBlueprint {
    pub name: String,
    pub description: Option<String>,
    pub category: RequirementCategory,
    pub necessity: RequirementNecessity,
    pub detail: RequirementDetail,
    pub order: u32,
}

impl RequirementBlueprint {
    pub const fn kind(&self) -> RequirementKind {
        self.detail.kind()
    }

    /// Map the blueprint onto a creation draft for the given application,
    /// carrying over every kind-specific field.
    pub fn to_draft(&self, application_id: &ApplicationId) -> RequirementDraft {
        RequirementDraft {
            application_id: application_id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            kind: Some(self.kind()),
            category: Some(self.category),
            necessity: Some(self.necessity),
            order: Some(self.order),
            external_url: None,
            notes: None,
            task_id: None,
            detail: DetailDraft::from(&self.detail),
        }
    }
}

/// Named, reusable, ordered set of requirement blueprints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementsTemplate {
    pub id: TemplateId,
    pub name: String,
    pub description: Option<String>,
    pub category: TemplateCategory,
    pub blueprints: Vec<RequirementBlueprint>,
    pub tags: Vec<String>,
    pub usage_count: u64,
    pub is_active: bool,
    pub is_system: bool,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RequirementsTemplate {
    /// Keep blueprints in display order. Called before every save.
    pub fn normalize(&mut self) {
        self.blueprints.sort_by_key(|blueprint| blueprint.order);
    }

    /// Names that appear more than once among the blueprints.
    pub fn duplicate_blueprint_names(&self) -> Vec<String> {
        let mut seen = std::collections::BTreeSet::new();
        let mut duplicates = Vec::new();
        for blueprint in &self.blueprints {
            let key = blueprint.name.trim().to_lowercase();
            if !seen.insert(key) && !duplicates.contains(&blueprint.name) {
                duplicates.push(blueprint.name.clone());
            }
        }
        duplicates
    }

    /// Case-insensitive substring match against name, description, and tags.
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return false;
        }
        if self.name.to_lowercase().contains(&needle) {
            return true;
        }
        if let Some(description) = &self.description {
            if description.to_lowercase().contains(&needle) {
                return true;
            }
        }
        self.tags
            .iter()
            .any(|tag| tag.to_lowercase().contains(&needle))
    }
}
