//! In-memory storage adapters backing the demo server and the test suite.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;

use super::domain::{
    ApplicationId, DocumentId, Requirement, RequirementId, RequirementPatch,
    RequirementsProgress, TaskId,
};
use super::repository::{
    ApplicationDirectory, DocumentDirectory, DocumentRef, RepositoryError,
    RequirementRepository, TaskDirectory, TaskRef, TemplateRepository,
};
use super::template::{RequirementsTemplate, TemplateId};

#[derive(Default, Clone)]
pub struct InMemoryRequirementRepository {
    records: Arc<Mutex<HashMap<RequirementId, Requirement>>>,
}

impl InMemoryRequirementRepository {
    pub fn len(&self) -> usize {
        self.records.lock().expect("requirement mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RequirementRepository for InMemoryRequirementRepository {
    fn insert(&self, requirement: Requirement) -> Result<Requirement, RepositoryError> {
        let mut guard = self.records.lock().expect("requirement mutex poisoned");
        if guard.contains_key(&requirement.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(requirement.id.clone(), requirement.clone());
        Ok(requirement)
    }

    fn update(&self, requirement: Requirement) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("requirement mutex poisoned");
        if !guard.contains_key(&requirement.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(requirement.id.clone(), requirement);
        Ok(())
    }

    fn fetch(&self, id: &RequirementId) -> Result<Option<Requirement>, RepositoryError> {
        let guard = self.records.lock().expect("requirement mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn delete(&self, id: &RequirementId) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("requirement mutex poisoned");
        guard.remove(id).map(|_| ()).ok_or(RepositoryError::NotFound)
    }

    fn by_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<Requirement>, RepositoryError> {
        let guard = self.records.lock().expect("requirement mutex poisoned");
        Ok(guard
            .values()
            .filter(|requirement| requirement.application_id == *application_id)
            .cloned()
            .collect())
    }

    fn apply_patch(
        &self,
        ids: &[RequirementId],
        patch: &RequirementPatch,
    ) -> Result<Vec<Requirement>, RepositoryError> {
        let mut guard = self.records.lock().expect("requirement mutex poisoned");
        let now = Utc::now();
        let mut modified = Vec::new();
        for id in ids {
            if let Some(requirement) = guard.get_mut(id) {
                requirement.apply_patch(patch, now);
                modified.push(requirement.clone());
            }
        }
        Ok(modified)
    }
}

#[derive(Default, Clone)]
pub struct InMemoryTemplateRepository {
    records: Arc<Mutex<HashMap<TemplateId, RequirementsTemplate>>>,
}

impl TemplateRepository for InMemoryTemplateRepository {
    fn insert(
        &self,
        template: RequirementsTemplate,
    ) -> Result<RequirementsTemplate, RepositoryError> {
        let mut guard = self.records.lock().expect("template mutex poisoned");
        if guard.contains_key(&template.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(template.id.clone(), template.clone());
        Ok(template)
    }

    fn update(&self, template: RequirementsTemplate) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("template mutex poisoned");
        if !guard.contains_key(&template.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(template.id.clone(), template);
        Ok(())
    }

    fn fetch(&self, id: &TemplateId) -> Result<Option<RequirementsTemplate>, RepositoryError> {
        let guard = self.records.lock().expect("template mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn delete(&self, id: &TemplateId) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("template mutex poisoned");
        guard.remove(id).map(|_| ()).ok_or(RepositoryError::NotFound)
    }

    fn list(&self) -> Result<Vec<RequirementsTemplate>, RepositoryError> {
        let guard = self.records.lock().expect("template mutex poisoned");
        Ok(guard.values().cloned().collect())
    }

    fn any_system(&self) -> Result<bool, RepositoryError> {
        let guard = self.records.lock().expect("template mutex poisoned");
        Ok(guard.values().any(|template| template.is_system))
    }
}

#[derive(Debug, Default, Clone)]
struct ApplicationEntry {
    requirement_ids: Vec<RequirementId>,
    progress: Option<RequirementsProgress>,
}

/// Stand-in for the application aggregate: tracks each application's
/// requirement id list and its cached progress snapshot.
#[derive(Default, Clone)]
pub struct InMemoryApplicationDirectory {
    records: Arc<Mutex<HashMap<ApplicationId, ApplicationEntry>>>,
}

impl InMemoryApplicationDirectory {
    pub fn register(&self, id: ApplicationId) {
        let mut guard = self.records.lock().expect("application mutex poisoned");
        guard.entry(id).or_default();
    }

    pub fn progress_of(&self, id: &ApplicationId) -> Option<RequirementsProgress> {
        let guard = self.records.lock().expect("application mutex poisoned");
        guard.get(id).and_then(|entry| entry.progress)
    }

    pub fn requirement_ids(&self, id: &ApplicationId) -> Vec<RequirementId> {
        let guard = self.records.lock().expect("application mutex poisoned");
        guard
            .get(id)
            .map(|entry| entry.requirement_ids.clone())
            .unwrap_or_default()
    }
}

impl ApplicationDirectory for InMemoryApplicationDirectory {
    fn exists(&self, id: &ApplicationId) -> Result<bool, RepositoryError> {
        let guard = self.records.lock().expect("application mutex poisoned");
        Ok(guard.contains_key(id))
    }

    fn attach_requirement(
        &self,
        application_id: &ApplicationId,
        requirement_id: &RequirementId,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("application mutex poisoned");
        let entry = guard.get_mut(application_id).ok_or(RepositoryError::NotFound)?;
        if !entry.requirement_ids.contains(requirement_id) {
            entry.requirement_ids.push(requirement_id.clone());
        }
        Ok(())
    }

    fn detach_requirement(
        &self,
        application_id: &ApplicationId,
        requirement_id: &RequirementId,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("application mutex poisoned");
        let entry = guard.get_mut(application_id).ok_or(RepositoryError::NotFound)?;
        entry.requirement_ids.retain(|id| id != requirement_id);
        Ok(())
    }

    fn record_progress(
        &self,
        application_id: &ApplicationId,
        progress: &RequirementsProgress,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("application mutex poisoned");
        let entry = guard.get_mut(application_id).ok_or(RepositoryError::NotFound)?;
        entry.progress = Some(*progress);
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryDocumentDirectory {
    records: Arc<Mutex<HashMap<DocumentId, DocumentRef>>>,
}

impl InMemoryDocumentDirectory {
    pub fn register(&self, document: DocumentRef) {
        let mut guard = self.records.lock().expect("document mutex poisoned");
        guard.insert(document.id.clone(), document);
    }
}

impl DocumentDirectory for InMemoryDocumentDirectory {
    fn fetch(&self, id: &DocumentId) -> Result<Option<DocumentRef>, RepositoryError> {
        let guard = self.records.lock().expect("document mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryTaskDirectory {
    records: Arc<Mutex<HashMap<TaskId, TaskRef>>>,
}

impl InMemoryTaskDirectory {
    pub fn register(&self, task: TaskRef) {
        let mut guard = self.records.lock().expect("task mutex poisoned");
        guard.insert(task.id.clone(), task);
    }
}

impl TaskDirectory for InMemoryTaskDirectory {
    fn fetch(&self, id: &TaskId) -> Result<Option<TaskRef>, RepositoryError> {
        let guard = self.records.lock().expect("task mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}
