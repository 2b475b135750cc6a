use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::domain::{
    ApplicationId, DocumentId, Requirement, RequirementCategory, RequirementId,
    RequirementKind, RequirementNecessity, RequirementPatch, RequirementStatus,
    RequirementsProgress,
};
use super::repository::{
    ApplicationDirectory, DocumentDirectory, DocumentRef, RepositoryError,
    RequirementRepository, TaskDirectory, TaskRef,
};
use super::validation::{validate_requirement_data, RequirementDraft, ValidationReport};

static REQUIREMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_requirement_id() -> RequirementId {
    let id = REQUIREMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RequirementId(format!("req-{id:06}"))
}

/// Error raised by the requirements service.
#[derive(Debug, thiserror::Error)]
pub enum RequirementsError {
    #[error("invalid requirement data: {0}")]
    Validation(ValidationReport),
    #[error("application {0} not found")]
    ApplicationNotFound(ApplicationId),
    #[error("requirement {0} not found")]
    RequirementNotFound(RequirementId),
    #[error("requirement {id}: cannot move from {from} to {to}")]
    InvalidTransition {
        id: RequirementId,
        from: RequirementStatus,
        to: RequirementStatus,
    },
    #[error("bulk update modified no requirements")]
    EmptyBulkUpdate,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Sort keys accepted when listing an application's requirements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementSort {
    #[default]
    Order,
    Name,
    Status,
    CreatedAt,
}

/// Filtering, sorting, and pagination options for checklist listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequirementQuery {
    #[serde(default)]
    pub statuses: Vec<RequirementStatus>,
    #[serde(default)]
    pub categories: Vec<RequirementCategory>,
    #[serde(default)]
    pub kinds: Vec<RequirementKind>,
    pub necessity: Option<RequirementNecessity>,
    pub sort_by: Option<RequirementSort>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl RequirementQuery {
    const DEFAULT_LIMIT: usize = 100;

    fn accepts(&self, requirement: &Requirement) -> bool {
        if !self.statuses.is_empty() && !self.statuses.contains(&requirement.status) {
            return false;
        }
        if !self.categories.is_empty() && !self.categories.contains(&requirement.category) {
            return false;
        }
        if !self.kinds.is_empty() && !self.kinds.contains(&requirement.kind()) {
            return false;
        }
        if let Some(necessity) = self.necessity {
            if requirement.necessity != necessity {
                return false;
            }
        }
        true
    }
}

/// A requirement together with its resolved document and task references.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequirementView {
    #[serde(flatten)]
    pub requirement: Requirement,
    pub linked_document: Option<DocumentRef>,
    pub task: Option<TaskRef>,
}

/// One grouping bucket in the application summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryBucket {
    pub total: u32,
    pub completed: u32,
    pub requirements: Vec<Requirement>,
}

/// Progress plus per-category and per-kind groupings for one application.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequirementsSummary {
    pub application_id: ApplicationId,
    pub progress: RequirementsProgress,
    pub by_category: BTreeMap<RequirementCategory, SummaryBucket>,
    pub by_kind: BTreeMap<RequirementKind, SummaryBucket>,
}

/// Sole mutator of requirement records and keeper of the application's cached
/// progress: after any mutation returns, the owning application's progress
/// reflects the latest checklist state.
pub struct RequirementsService {
    requirements: Arc<dyn RequirementRepository>,
    applications: Arc<dyn ApplicationDirectory>,
    documents: Arc<dyn DocumentDirectory>,
    tasks: Arc<dyn TaskDirectory>,
}

impl RequirementsService {
    pub fn new(
        requirements: Arc<dyn RequirementRepository>,
        applications: Arc<dyn ApplicationDirectory>,
        documents: Arc<dyn DocumentDirectory>,
        tasks: Arc<dyn TaskDirectory>,
    ) -> Self {
        Self {
            requirements,
            applications,
            documents,
            tasks,
        }
    }

    /// Validate and persist a new requirement, attach it to its application,
    /// and refresh the cached progress.
    pub fn create_requirement(
        &self,
        draft: RequirementDraft,
    ) -> Result<Requirement, RequirementsError> {
        let detail = draft
            .resolved_detail()
            .map_err(RequirementsError::Validation)?;

        if !self.applications.exists(&draft.application_id)? {
            return Err(RequirementsError::ApplicationNotFound(draft.application_id));
        }

        let now = Utc::now();
        let requirement = Requirement {
            id: next_requirement_id(),
            application_id: draft.application_id,
            name: draft.name,
            description: draft.description,
            category: draft.category.unwrap_or(RequirementCategory::Administrative),
            necessity: draft.necessity.unwrap_or(RequirementNecessity::Required),
            detail,
            status: RequirementStatus::Pending,
            linked_document_id: None,
            task_id: draft.task_id,
            external_url: draft.external_url,
            notes: draft.notes,
            order: draft.order.unwrap_or(0),
            submitted_at: None,
            verified_at: None,
            created_at: now,
            updated_at: now,
        };

        let stored = self.requirements.insert(requirement)?;
        self.applications
            .attach_requirement(&stored.application_id, &stored.id)?;
        self.refresh_application_progress(&stored.application_id)?;

        info!(
            requirement = %stored.id,
            application = %stored.application_id,
            kind = stored.kind().label(),
            "requirement created"
        );
        Ok(stored)
    }

    /// List an application's requirements with filtering, sorting, and
    /// pagination, resolving linked document and task references.
    pub fn requirements_for_application(
        &self,
        application_id: &ApplicationId,
        query: &RequirementQuery,
    ) -> Result<Vec<RequirementView>, RequirementsError> {
        let mut requirements: Vec<Requirement> = self
            .requirements
            .by_application(application_id)?
            .into_iter()
            .filter(|requirement| query.accepts(requirement))
            .collect();

        match query.sort_by.unwrap_or_default() {
            RequirementSort::Order => requirements.sort_by_key(|r| r.order),
            RequirementSort::Name => {
                requirements.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
            }
            RequirementSort::Status => requirements.sort_by_key(|r| r.status),
            RequirementSort::CreatedAt => requirements.sort_by_key(|r| r.created_at),
        }

        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(RequirementQuery::DEFAULT_LIMIT);
        requirements
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|requirement| self.resolve(requirement))
            .collect()
    }

    /// Single lookup with references resolved; `None` when absent.
    pub fn requirement_by_id(
        &self,
        id: &RequirementId,
    ) -> Result<Option<RequirementView>, RequirementsError> {
        match self.requirements.fetch(id)? {
            Some(requirement) => Ok(Some(self.resolve(requirement)?)),
            None => Ok(None),
        }
    }

    /// Merge a field patch onto an existing requirement and refresh progress.
    pub fn update_requirement(
        &self,
        id: &RequirementId,
        patch: &RequirementPatch,
    ) -> Result<Requirement, RequirementsError> {
        let mut requirement = self
            .requirements
            .fetch(id)?
            .ok_or_else(|| RequirementsError::RequirementNotFound(id.clone()))?;

        requirement.apply_patch(patch, Utc::now());
        self.requirements.update(requirement.clone())?;
        self.refresh_application_progress(&requirement.application_id)?;

        debug!(requirement = %requirement.id, "requirement updated");
        Ok(requirement)
    }

    /// Delete a requirement, detach it from its application, refresh progress.
    pub fn delete_requirement(&self, id: &RequirementId) -> Result<(), RequirementsError> {
        let requirement = self
            .requirements
            .fetch(id)?
            .ok_or_else(|| RequirementsError::RequirementNotFound(id.clone()))?;

        self.requirements.delete(id)?;
        self.applications
            .detach_requirement(&requirement.application_id, id)?;
        self.refresh_application_progress(&requirement.application_id)?;

        info!(
            requirement = %requirement.id,
            application = %requirement.application_id,
            "requirement deleted"
        );
        Ok(())
    }

    /// Move a requirement through its lifecycle state machine.
    pub fn update_requirement_status(
        &self,
        id: &RequirementId,
        status: RequirementStatus,
        notes: Option<String>,
    ) -> Result<Requirement, RequirementsError> {
        let mut requirement = self
            .requirements
            .fetch(id)?
            .ok_or_else(|| RequirementsError::RequirementNotFound(id.clone()))?;

        requirement
            .transition(status, Utc::now())
            .map_err(|invalid| RequirementsError::InvalidTransition {
                id: id.clone(),
                from: invalid.from,
                to: invalid.to,
            })?;
        if let Some(notes) = notes {
            requirement.notes = Some(notes);
        }

        self.requirements.update(requirement.clone())?;
        self.refresh_application_progress(&requirement.application_id)?;

        debug!(requirement = %requirement.id, status = status.label(), "status updated");
        Ok(requirement)
    }

    /// Attach an uploaded document to a requirement, marking it completed.
    pub fn link_document(
        &self,
        id: &RequirementId,
        document_id: DocumentId,
        notes: Option<String>,
    ) -> Result<Requirement, RequirementsError> {
        let mut requirement = self
            .requirements
            .fetch(id)?
            .ok_or_else(|| RequirementsError::RequirementNotFound(id.clone()))?;

        let now = Utc::now();
        requirement.linked_document_id = Some(document_id);
        requirement.status = RequirementStatus::Completed;
        requirement.submitted_at = Some(now);
        if let Some(notes) = notes {
            requirement.notes = Some(notes);
        }
        requirement.updated_at = now;

        self.requirements.update(requirement.clone())?;
        self.refresh_application_progress(&requirement.application_id)?;

        info!(requirement = %requirement.id, "document linked");
        Ok(requirement)
    }

    /// Fresh full-scan computation of the progress snapshot. Never cached.
    pub fn application_progress(
        &self,
        application_id: &ApplicationId,
    ) -> Result<RequirementsProgress, RequirementsError> {
        let requirements = self.requirements.by_application(application_id)?;
        Ok(RequirementsProgress::from_requirements(&requirements))
    }

    /// Recompute and write the progress snapshot onto the application
    /// aggregate. Runs after every mutating operation.
    pub fn refresh_application_progress(
        &self,
        application_id: &ApplicationId,
    ) -> Result<RequirementsProgress, RequirementsError> {
        let progress = self.application_progress(application_id)?;
        self.applications
            .record_progress(application_id, &progress)?;
        Ok(progress)
    }

    /// Progress plus groupings by category and by kind.
    pub fn application_summary(
        &self,
        application_id: &ApplicationId,
    ) -> Result<RequirementsSummary, RequirementsError> {
        if !self.applications.exists(application_id)? {
            return Err(RequirementsError::ApplicationNotFound(
                application_id.clone(),
            ));
        }

        let requirements = self.requirements.by_application(application_id)?;
        let progress = RequirementsProgress::from_requirements(&requirements);

        let mut by_category: BTreeMap<RequirementCategory, SummaryBucket> = BTreeMap::new();
        let mut by_kind: BTreeMap<RequirementKind, SummaryBucket> = BTreeMap::new();
        for requirement in requirements {
            push_bucket(
                by_category.entry(requirement.category).or_insert_with(empty_bucket),
                requirement.clone(),
            );
            push_bucket(
                by_kind.entry(requirement.kind()).or_insert_with(empty_bucket),
                requirement,
            );
        }

        Ok(RequirementsSummary {
            application_id: application_id.clone(),
            progress,
            by_category,
            by_kind,
        })
    }

    /// Patch every listed requirement in one batch write, then refresh
    /// progress once per distinct affected application. Not atomic: a failing
    /// refresh leaves earlier refreshes in place.
    pub fn bulk_update(
        &self,
        ids: &[RequirementId],
        patch: &RequirementPatch,
    ) -> Result<Vec<Requirement>, RequirementsError> {
        let modified = self.requirements.apply_patch(ids, patch)?;
        if modified.is_empty() {
            return Err(RequirementsError::EmptyBulkUpdate);
        }

        let affected: BTreeSet<ApplicationId> = modified
            .iter()
            .map(|requirement| requirement.application_id.clone())
            .collect();
        for application_id in &affected {
            self.refresh_application_progress(application_id)?;
        }

        info!(
            modified = modified.len(),
            applications = affected.len(),
            "bulk requirement update"
        );
        Ok(modified)
    }

    /// Open required requirements, in display order.
    pub fn needing_attention(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<Requirement>, RequirementsError> {
        let mut open: Vec<Requirement> = self
            .requirements
            .by_application(application_id)?
            .into_iter()
            .filter(|requirement| {
                requirement.status.is_open()
                    && requirement.necessity == RequirementNecessity::Required
            })
            .collect();
        open.sort_by_key(|requirement| requirement.order);
        Ok(open)
    }

    /// True only when every required requirement is settled and at least one
    /// required requirement exists.
    pub fn ready_to_submit(
        &self,
        application_id: &ApplicationId,
    ) -> Result<bool, RequirementsError> {
        Ok(self.application_progress(application_id)?.is_ready_to_submit())
    }

    /// Re-export of the pure draft check for API callers.
    pub fn validate(&self, draft: &RequirementDraft) -> ValidationReport {
        validate_requirement_data(draft)
    }

    fn resolve(&self, requirement: Requirement) -> Result<RequirementView, RequirementsError> {
        let linked_document = match &requirement.linked_document_id {
            Some(document_id) => self.documents.fetch(document_id)?,
            None => None,
        };
        let task = match &requirement.task_id {
            Some(task_id) => self.tasks.fetch(task_id)?,
            None => None,
        };
        Ok(RequirementView {
            requirement,
            linked_document,
            task,
        })
    }
}

fn empty_bucket() -> SummaryBucket {
    SummaryBucket {
        total: 0,
        completed: 0,
        requirements: Vec::new(),
    }
}

fn push_bucket(bucket: &mut SummaryBucket, requirement: Requirement) {
    bucket.total += 1;
    if requirement.status.counts_as_completed() {
        bucket.completed += 1;
    }
    bucket.requirements.push(requirement);
}
