use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::catalog;
use super::domain::{ApplicationId, Requirement, RequirementCategory, RequirementKind, RequirementNecessity};
use super::repository::{RepositoryError, TemplateRepository};
use super::service::{RequirementsError, RequirementsService};
use super::template::{
    RequirementBlueprint, RequirementsTemplate, TemplateCategory, TemplateId,
};
use super::validation::{evaluate, DetailDraft, FieldError, ValidationReport};

static TEMPLATE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_template_id() -> TemplateId {
    let id = TEMPLATE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    TemplateId(format!("tpl-{id:06}"))
}

/// Error raised by the template service.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("invalid template data: {0}")]
    Validation(ValidationReport),
    #[error("template {0} not found")]
    NotFound(TemplateId),
    #[error("cannot update system templates")]
    SystemTemplateUpdate,
    #[error("cannot delete system templates")]
    SystemTemplateDelete,
    #[error("template {0} is inactive")]
    InactiveTemplate(TemplateId),
    #[error(
        "template {template_id} could not be applied to {application_id}: \
         rolled back {rolled_back} created requirement(s): {source}"
    )]
    ApplyRolledBack {
        template_id: TemplateId,
        application_id: ApplicationId,
        rolled_back: usize,
        #[source]
        source: Box<RequirementsError>,
    },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Blueprint input as submitted by clients: classification may be missing and
/// kind-specific fields arrive flat, exactly like a requirement draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlueprintDraft {
    pub name: String,
    pub description: Option<String>,
    pub kind: Option<RequirementKind>,
    pub category: Option<RequirementCategory>,
    pub necessity: Option<RequirementNecessity>,
    pub order: Option<u32>,
    #[serde(flatten)]
    pub detail: DetailDraft,
}

/// Input for creating a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateDraft {
    pub name: String,
    pub description: Option<String>,
    pub category: Option<TemplateCategory>,
    pub requirements: Vec<BlueprintDraft>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Field patch for user templates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplatePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<TemplateCategory>,
    pub requirements: Option<Vec<BlueprintDraft>>,
    pub is_active: Option<bool>,
    pub tags: Option<Vec<String>>,
}

/// Listing filter for templates.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateFilter {
    pub category: Option<TemplateCategory>,
    pub is_system: Option<bool>,
    pub is_active: Option<bool>,
    pub created_by: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl TemplateFilter {
    const DEFAULT_LIMIT: usize = 50;

    fn accepts(&self, template: &RequirementsTemplate) -> bool {
        if let Some(category) = self.category {
            if template.category != category {
                return false;
            }
        }
        if let Some(is_system) = self.is_system {
            if template.is_system != is_system {
                return false;
            }
        }
        if let Some(is_active) = self.is_active {
            if template.is_active != is_active {
                return false;
            }
        }
        if let Some(created_by) = &self.created_by {
            if template.created_by.as_deref() != Some(created_by.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Aggregate counts across the template catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateStatistics {
    pub total: usize,
    pub system: usize,
    pub user: usize,
    pub active: usize,
    pub total_usage: u64,
    pub by_category: BTreeMap<TemplateCategory, usize>,
}

/// Manages reusable blueprint sets and expands them into concrete
/// requirements through the requirements service.
pub struct TemplateService {
    templates: Arc<dyn TemplateRepository>,
    requirements: Arc<RequirementsService>,
}

impl TemplateService {
    pub fn new(
        templates: Arc<dyn TemplateRepository>,
        requirements: Arc<RequirementsService>,
    ) -> Self {
        Self {
            templates,
            requirements,
        }
    }

    /// Validate and persist a user template. Blueprints are checked with the
    /// same rules as requirement drafts, names must be unique within the
    /// template, and the saved order follows the blueprint `order` field.
    pub fn create_template(
        &self,
        draft: TemplateDraft,
        created_by: Option<String>,
    ) -> Result<RequirementsTemplate, TemplateError> {
        let category = match draft.category {
            Some(category) => category,
            None => {
                return Err(validation_failure(vec![FieldError::new(
                    "category",
                    "Template category is required",
                )]))
            }
        };

        let mut errors = Vec::new();
        if draft.name.trim().is_empty() {
            errors.push(FieldError::new("name", "Template name is required"));
        }
        if draft.requirements.is_empty() {
            errors.push(FieldError::new(
                "requirements",
                "A template needs at least one requirement",
            ));
        }

        let blueprints = resolve_blueprints(&draft.requirements, &mut errors);
        if !errors.is_empty() {
            return Err(validation_failure(errors));
        }

        let now = Utc::now();
        let mut template = RequirementsTemplate {
            id: next_template_id(),
            name: draft.name,
            description: draft.description,
            category,
            blueprints,
            tags: draft.tags,
            usage_count: 0,
            is_active: true,
            is_system: false,
            created_by,
            created_at: now,
            updated_at: now,
        };

        let duplicates = template.duplicate_blueprint_names();
        if !duplicates.is_empty() {
            return Err(validation_failure(vec![FieldError::new(
                "requirements",
                format!(
                    "Requirement names must be unique within a template: {}",
                    duplicates.join(", ")
                ),
            )]));
        }

        template.normalize();
        let stored = self.templates.insert(template)?;
        info!(template = %stored.id, name = %stored.name, "template created");
        Ok(stored)
    }

    /// List templates matching the filter, most used first, then by name.
    pub fn templates(
        &self,
        filter: &TemplateFilter,
    ) -> Result<Vec<RequirementsTemplate>, TemplateError> {
        let mut templates: Vec<RequirementsTemplate> = self
            .templates
            .list()?
            .into_iter()
            .filter(|template| filter.accepts(template))
            .collect();
        sort_by_popularity(&mut templates);

        let offset = filter.offset.unwrap_or(0);
        let limit = filter.limit.unwrap_or(TemplateFilter::DEFAULT_LIMIT);
        Ok(templates.into_iter().skip(offset).take(limit).collect())
    }

    pub fn template_by_id(
        &self,
        id: &TemplateId,
    ) -> Result<Option<RequirementsTemplate>, TemplateError> {
        Ok(self.templates.fetch(id)?)
    }

    /// Merge a patch onto a user template. System templates are immutable.
    pub fn update_template(
        &self,
        id: &TemplateId,
        patch: TemplatePatch,
    ) -> Result<RequirementsTemplate, TemplateError> {
        let mut template = self
            .templates
            .fetch(id)?
            .ok_or_else(|| TemplateError::NotFound(id.clone()))?;
        if template.is_system {
            return Err(TemplateError::SystemTemplateUpdate);
        }

        if let Some(name) = patch.name {
            if name.trim().is_empty() {
                return Err(validation_failure(vec![FieldError::new(
                    "name",
                    "Template name is required",
                )]));
            }
            template.name = name;
        }
        if let Some(description) = patch.description {
            template.description = Some(description);
        }
        if let Some(category) = patch.category {
            template.category = category;
        }
        if let Some(is_active) = patch.is_active {
            template.is_active = is_active;
        }
        if let Some(tags) = patch.tags {
            template.tags = tags;
        }
        if let Some(requirements) = patch.requirements {
            let mut errors = Vec::new();
            if requirements.is_empty() {
                errors.push(FieldError::new(
                    "requirements",
                    "A template needs at least one requirement",
                ));
            }
            let blueprints = resolve_blueprints(&requirements, &mut errors);
            if !errors.is_empty() {
                return Err(validation_failure(errors));
            }
            template.blueprints = blueprints;
            let duplicates = template.duplicate_blueprint_names();
            if !duplicates.is_empty() {
                return Err(validation_failure(vec![FieldError::new(
                    "requirements",
                    format!(
                        "Requirement names must be unique within a template: {}",
                        duplicates.join(", ")
                    ),
                )]));
            }
        }

        template.normalize();
        template.updated_at = Utc::now();
        self.templates.update(template.clone())?;
        info!(template = %template.id, "template updated");
        Ok(template)
    }

    /// Hard-delete a user template. System templates are immutable.
    pub fn delete_template(&self, id: &TemplateId) -> Result<(), TemplateError> {
        let template = self
            .templates
            .fetch(id)?
            .ok_or_else(|| TemplateError::NotFound(id.clone()))?;
        if template.is_system {
            return Err(TemplateError::SystemTemplateDelete);
        }
        self.templates.delete(id)?;
        info!(template = %id, "template deleted");
        Ok(())
    }

    /// Expand every blueprint into a concrete requirement for the given
    /// application, in template order. The expansion is all-or-nothing: if a
    /// creation fails midway, every requirement created so far is deleted
    /// before the error is returned. On success the template's usage count is
    /// incremented.
    pub fn apply_template(
        &self,
        template_id: &TemplateId,
        application_id: &ApplicationId,
    ) -> Result<Vec<Requirement>, TemplateError> {
        let mut template = self
            .templates
            .fetch(template_id)?
            .ok_or_else(|| TemplateError::NotFound(template_id.clone()))?;
        if !template.is_active {
            return Err(TemplateError::InactiveTemplate(template_id.clone()));
        }

        let mut created: Vec<Requirement> = Vec::with_capacity(template.blueprints.len());
        for blueprint in &template.blueprints {
            match self
                .requirements
                .create_requirement(blueprint.to_draft(application_id))
            {
                Ok(requirement) => created.push(requirement),
                Err(err) => {
                    let rolled_back = created.len();
                    self.roll_back(&created);
                    return Err(TemplateError::ApplyRolledBack {
                        template_id: template_id.clone(),
                        application_id: application_id.clone(),
                        rolled_back,
                        source: Box::new(err),
                    });
                }
            }
        }

        template.usage_count += 1;
        template.updated_at = Utc::now();
        self.templates.update(template)?;

        info!(
            template = %template_id,
            application = %application_id,
            requirements = created.len(),
            "template applied"
        );
        Ok(created)
    }

    fn roll_back(&self, created: &[Requirement]) {
        for requirement in created {
            if let Err(err) = self.requirements.delete_requirement(&requirement.id) {
                warn!(
                    requirement = %requirement.id,
                    error = %err,
                    "failed to roll back requirement after partial template application"
                );
            }
        }
    }

    /// Most-applied active templates.
    pub fn popular_templates(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<RequirementsTemplate>, TemplateError> {
        let mut templates: Vec<RequirementsTemplate> = self
            .templates
            .list()?
            .into_iter()
            .filter(|template| template.is_active)
            .collect();
        sort_by_popularity(&mut templates);
        Ok(templates.into_iter().take(limit.unwrap_or(10)).collect())
    }

    /// Active templates for one category.
    pub fn templates_by_category(
        &self,
        category: TemplateCategory,
    ) -> Result<Vec<RequirementsTemplate>, TemplateError> {
        let mut templates: Vec<RequirementsTemplate> = self
            .templates
            .list()?
            .into_iter()
            .filter(|template| template.is_active && template.category == category)
            .collect();
        sort_by_popularity(&mut templates);
        Ok(templates)
    }

    /// Case-insensitive substring search over name, description, and tags.
    pub fn search_templates(
        &self,
        query: &str,
        limit: Option<usize>,
    ) -> Result<Vec<RequirementsTemplate>, TemplateError> {
        let mut templates: Vec<RequirementsTemplate> = self
            .templates
            .list()?
            .into_iter()
            .filter(|template| template.is_active && template.matches(query))
            .collect();
        sort_by_popularity(&mut templates);
        Ok(templates.into_iter().take(limit.unwrap_or(20)).collect())
    }

    /// One-time seed of the built-in graduate, undergraduate, and scholarship
    /// templates. A no-op when any system template already exists.
    pub fn seed_system_templates(&self) -> Result<Vec<RequirementsTemplate>, TemplateError> {
        if self.templates.any_system()? {
            return Ok(Vec::new());
        }

        let now = Utc::now();
        let mut seeded = Vec::new();
        for seed in catalog::system_template_seeds() {
            let mut template = RequirementsTemplate {
                id: next_template_id(),
                name: seed.name.to_string(),
                description: Some(seed.description.to_string()),
                category: seed.category,
                blueprints: seed.blueprints,
                tags: seed.tags.iter().map(|tag| (*tag).to_string()).collect(),
                usage_count: 0,
                is_active: true,
                is_system: true,
                created_by: None,
                created_at: now,
                updated_at: now,
            };
            template.normalize();
            seeded.push(self.templates.insert(template)?);
        }

        info!(count = seeded.len(), "system templates seeded");
        Ok(seeded)
    }

    /// Aggregate counts across all templates.
    pub fn template_statistics(&self) -> Result<TemplateStatistics, TemplateError> {
        let templates = self.templates.list()?;
        let mut statistics = TemplateStatistics {
            total: templates.len(),
            system: 0,
            user: 0,
            active: 0,
            total_usage: 0,
            by_category: BTreeMap::new(),
        };
        for template in &templates {
            if template.is_system {
                statistics.system += 1;
            } else {
                statistics.user += 1;
            }
            if template.is_active {
                statistics.active += 1;
            }
            statistics.total_usage += template.usage_count;
            *statistics.by_category.entry(template.category).or_insert(0) += 1;
        }
        Ok(statistics)
    }
}

fn validation_failure(errors: Vec<FieldError>) -> TemplateError {
    TemplateError::Validation(ValidationReport::from_errors(errors))
}

fn resolve_blueprints(
    drafts: &[BlueprintDraft],
    errors: &mut Vec<FieldError>,
) -> Vec<RequirementBlueprint> {
    let mut blueprints = Vec::with_capacity(drafts.len());
    for (index, draft) in drafts.iter().enumerate() {
        let (blueprint_errors, detail) =
            evaluate(&draft.name, draft.kind, draft.category, &draft.detail);
        for error in blueprint_errors {
            errors.push(FieldError::new(
                format!("requirements[{index}].{}", error.field),
                error.message,
            ));
        }
        if let (Some(detail), Some(category)) = (detail, draft.category) {
            blueprints.push(RequirementBlueprint {
                name: draft.name.clone(),
                description: draft.description.clone(),
                category,
                necessity: draft.necessity.unwrap_or(RequirementNecessity::Required),
                detail,
                order: draft.order.unwrap_or(index as u32),
            });
        }
    }
    blueprints
}

fn sort_by_popularity(templates: &mut [RequirementsTemplate]) {
    templates.sort_by(|a, b| {
        b.usage_count
            .cmp(&a.usage_count)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
}
