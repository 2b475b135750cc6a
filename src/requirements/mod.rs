//! Application requirements engine: checklist items, reusable templates, and
//! per-application progress aggregation.
//!
//! The service layer is the sole mutator of requirement records and keeps the
//! owning application's cached progress consistent after every mutation.
//! Storage sits behind repository traits so the engine runs unchanged against
//! the in-memory adapters or a real store.

pub(crate) mod catalog;
pub mod domain;
pub mod memory;
pub mod repository;
pub mod router;
pub mod service;
pub mod template;
pub mod template_service;
pub mod validation;

#[cfg(test)]
mod tests;

pub use domain::{
    ApplicationId, DocumentId, InvalidTransition, Requirement, RequirementCategory,
    RequirementDetail, RequirementId, RequirementKind, RequirementNecessity,
    RequirementPatch, RequirementStatus, RequirementsProgress, TaskId,
};
pub use repository::{
    ApplicationDirectory, DocumentDirectory, DocumentRef, RepositoryError,
    RequirementRepository, TaskDirectory, TaskRef, TemplateRepository,
};
pub use router::{requirements_router, templates_router};
pub use service::{
    RequirementQuery, RequirementSort, RequirementView, RequirementsError,
    RequirementsService, RequirementsSummary, SummaryBucket,
};
pub use template::{
    RequirementBlueprint, RequirementsTemplate, TemplateCategory, TemplateId,
};
pub use template_service::{
    BlueprintDraft, TemplateDraft, TemplateError, TemplateFilter, TemplatePatch,
    TemplateService, TemplateStatistics,
};
pub use validation::{
    validate_requirement_data, DetailDraft, FieldError, RequirementDraft, ValidationReport,
};
