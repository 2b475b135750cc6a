use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Utc;

use crate::requirements::memory::{
    InMemoryApplicationDirectory, InMemoryDocumentDirectory, InMemoryRequirementRepository,
    InMemoryTaskDirectory, InMemoryTemplateRepository,
};
use crate::requirements::repository::{RepositoryError, RequirementRepository};
use crate::requirements::service::RequirementsService;
use crate::requirements::template_service::{BlueprintDraft, TemplateDraft, TemplateService};
use crate::requirements::validation::{DetailDraft, RequirementDraft};
use crate::requirements::{
    ApplicationId, Requirement, RequirementCategory, RequirementDetail, RequirementId,
    RequirementKind, RequirementNecessity, RequirementPatch, RequirementStatus,
    TemplateCategory,
};

pub(super) struct Harness {
    pub(super) requirements: Arc<RequirementsService>,
    pub(super) templates: Arc<TemplateService>,
    pub(super) store: Arc<InMemoryRequirementRepository>,
    pub(super) applications: Arc<InMemoryApplicationDirectory>,
    pub(super) documents: Arc<InMemoryDocumentDirectory>,
    pub(super) tasks: Arc<InMemoryTaskDirectory>,
}

pub(super) fn harness() -> Harness {
    let store = Arc::new(InMemoryRequirementRepository::default());
    let applications = Arc::new(InMemoryApplicationDirectory::default());
    let documents = Arc::new(InMemoryDocumentDirectory::default());
    let tasks = Arc::new(InMemoryTaskDirectory::default());

    let requirements = Arc::new(RequirementsService::new(
        store.clone(),
        applications.clone(),
        documents.clone(),
        tasks.clone(),
    ));
    let templates = Arc::new(TemplateService::new(
        Arc::new(InMemoryTemplateRepository::default()),
        requirements.clone(),
    ));

    Harness {
        requirements,
        templates,
        store,
        applications,
        documents,
        tasks,
    }
}

pub(super) fn application(harness: &Harness, id: &str) -> ApplicationId {
    let id = ApplicationId(id.to_string());
    harness.applications.register(id.clone());
    id
}

pub(super) fn document_draft(application_id: &ApplicationId, name: &str) -> RequirementDraft {
    let mut draft = RequirementDraft::new(
        application_id.clone(),
        name,
        RequirementKind::Document,
        RequirementCategory::Academic,
    );
    draft.detail.document_type = Some("transcript".to_string());
    draft
}

pub(super) fn test_score_draft(application_id: &ApplicationId, name: &str) -> RequirementDraft {
    let mut draft = RequirementDraft::new(
        application_id.clone(),
        name,
        RequirementKind::TestScore,
        RequirementCategory::Academic,
    );
    draft.detail.test_type = Some("GRE".to_string());
    draft.detail.min_score = Some(260.0);
    draft.detail.max_score = Some(340.0);
    draft
}

pub(super) fn fee_draft(application_id: &ApplicationId, name: &str) -> RequirementDraft {
    let mut draft = RequirementDraft::new(
        application_id.clone(),
        name,
        RequirementKind::Fee,
        RequirementCategory::Administrative,
    );
    draft.detail.fee_amount = Some(85.0);
    draft
}

pub(super) fn interview_draft(application_id: &ApplicationId, name: &str) -> RequirementDraft {
    let mut draft = RequirementDraft::new(
        application_id.clone(),
        name,
        RequirementKind::Interview,
        RequirementCategory::Personal,
    );
    draft.detail.interview_type = Some("video".to_string());
    draft.detail.interview_duration = Some(30);
    draft
}

/// Directly constructed requirement for pure progress computations.
pub(super) fn requirement(
    application_id: &ApplicationId,
    name: &str,
    status: RequirementStatus,
    necessity: RequirementNecessity,
) -> Requirement {
    let now = Utc::now();
    Requirement {
        id: RequirementId(format!("fixture-{name}")),
        application_id: application_id.clone(),
        name: name.to_string(),
        description: None,
        category: RequirementCategory::Academic,
        necessity,
        detail: RequirementDetail::Other,
        status,
        linked_document_id: None,
        task_id: None,
        external_url: None,
        notes: None,
        order: 0,
        submitted_at: None,
        verified_at: None,
        created_at: now,
        updated_at: now,
    }
}

pub(super) fn blueprint_draft(name: &str) -> BlueprintDraft {
    let mut detail = DetailDraft::default();
    detail.document_type = Some("essay".to_string());
    BlueprintDraft {
        name: name.to_string(),
        description: None,
        kind: Some(RequirementKind::Document),
        category: Some(RequirementCategory::Personal),
        necessity: Some(RequirementNecessity::Required),
        order: None,
        detail,
    }
}

pub(super) fn template_draft(name: &str) -> TemplateDraft {
    TemplateDraft {
        name: name.to_string(),
        description: Some("Fixture template".to_string()),
        category: Some(TemplateCategory::Custom),
        requirements: vec![blueprint_draft("Essay"), blueprint_draft("Writing Sample")],
        tags: vec!["fixture".to_string()],
    }
}

pub(super) fn completed_patch() -> RequirementPatch {
    RequirementPatch {
        status: Some(RequirementStatus::Completed),
        ..RequirementPatch::default()
    }
}

/// Requirement store that starts failing inserts after a fixed budget, for
/// exercising rollback of partially applied templates.
pub(super) struct FlakyRequirementRepository {
    inner: InMemoryRequirementRepository,
    insert_budget: usize,
    inserts: AtomicUsize,
}

impl FlakyRequirementRepository {
    pub(super) fn new(insert_budget: usize) -> Self {
        Self {
            inner: InMemoryRequirementRepository::default(),
            insert_budget,
            inserts: AtomicUsize::new(0),
        }
    }

    pub(super) fn stored(&self) -> usize {
        self.inner.len()
    }
}

impl RequirementRepository for FlakyRequirementRepository {
    fn insert(&self, requirement: Requirement) -> Result<Requirement, RepositoryError> {
        let seen = self.inserts.fetch_add(1, Ordering::SeqCst);
        if seen >= self.insert_budget {
            return Err(RepositoryError::Unavailable("storage offline".to_string()));
        }
        self.inner.insert(requirement)
    }

    fn update(&self, requirement: Requirement) -> Result<(), RepositoryError> {
        self.inner.update(requirement)
    }

    fn fetch(&self, id: &RequirementId) -> Result<Option<Requirement>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn delete(&self, id: &RequirementId) -> Result<(), RepositoryError> {
        self.inner.delete(id)
    }

    fn by_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<Requirement>, RepositoryError> {
        self.inner.by_application(application_id)
    }

    fn apply_patch(
        &self,
        ids: &[RequirementId],
        patch: &RequirementPatch,
    ) -> Result<Vec<Requirement>, RepositoryError> {
        self.inner.apply_patch(ids, patch)
    }
}
