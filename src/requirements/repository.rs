use serde::{Deserialize, Serialize};

use super::domain::{
    ApplicationId, DocumentId, Requirement, RequirementId, RequirementPatch,
    RequirementsProgress, TaskId,
};
use super::template::{RequirementsTemplate, TemplateId};

/// Error enumeration for storage adapter failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Storage abstraction for requirement records so the service can be
/// exercised against in-memory fixtures or a real store.
pub trait RequirementRepository: Send + Sync {
    fn insert(&self, requirement: Requirement) -> Result<Requirement, RepositoryError>;
    fn update(&self, requirement: Requirement) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &RequirementId) -> Result<Option<Requirement>, RepositoryError>;
    fn delete(&self, id: &RequirementId) -> Result<(), RepositoryError>;
    fn by_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<Requirement>, RepositoryError>;
    /// Apply one patch to every listed requirement in a single batch, returning
    /// the records that were actually modified. Unknown ids are skipped.
    fn apply_patch(
        &self,
        ids: &[RequirementId],
        patch: &RequirementPatch,
    ) -> Result<Vec<Requirement>, RepositoryError>;
}

/// Storage abstraction for reusable requirement templates.
pub trait TemplateRepository: Send + Sync {
    fn insert(
        &self,
        template: RequirementsTemplate,
    ) -> Result<RequirementsTemplate, RepositoryError>;
    fn update(&self, template: RequirementsTemplate) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &TemplateId) -> Result<Option<RequirementsTemplate>, RepositoryError>;
    fn delete(&self, id: &TemplateId) -> Result<(), RepositoryError>;
    fn list(&self) -> Result<Vec<RequirementsTemplate>, RepositoryError>;
    fn any_system(&self) -> Result<bool, RepositoryError>;
}

/// Facade over the application aggregate. The aggregate owns the requirement
/// id list and the cached progress fields; this service only pushes into them.
pub trait ApplicationDirectory: Send + Sync {
    fn exists(&self, id: &ApplicationId) -> Result<bool, RepositoryError>;
    fn attach_requirement(
        &self,
        application_id: &ApplicationId,
        requirement_id: &RequirementId,
    ) -> Result<(), RepositoryError>;
    fn detach_requirement(
        &self,
        application_id: &ApplicationId,
        requirement_id: &RequirementId,
    ) -> Result<(), RepositoryError>;
    fn record_progress(
        &self,
        application_id: &ApplicationId,
        progress: &RequirementsProgress,
    ) -> Result<(), RepositoryError>;
}

/// Read-only lookup into the document library for resolving linked documents.
pub trait DocumentDirectory: Send + Sync {
    fn fetch(&self, id: &DocumentId) -> Result<Option<DocumentRef>, RepositoryError>;
}

/// Read-only lookup into the task planner for resolving linked tasks.
pub trait TaskDirectory: Send + Sync {
    fn fetch(&self, id: &TaskId) -> Result<Option<TaskRef>, RepositoryError>;
}

/// Resolved view of a linked document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub id: DocumentId,
    pub file_name: String,
    pub content_type: Option<String>,
}

/// Resolved view of a linked task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRef {
    pub id: TaskId,
    pub title: String,
    pub completed: bool,
}
