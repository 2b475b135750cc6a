use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    ApplicationId, DocumentId, RequirementCategory, RequirementId, RequirementKind,
    RequirementNecessity, RequirementPatch, RequirementStatus, TaskId,
};
use super::service::{
    RequirementQuery, RequirementSort, RequirementsError, RequirementsService,
};
use super::template::{TemplateCategory, TemplateId};
use super::template_service::{
    TemplateDraft, TemplateError, TemplateFilter, TemplatePatch, TemplateService,
};
use super::validation::{DetailDraft, RequirementDraft};

/// Router exposing the per-application checklist endpoints.
pub fn requirements_router(service: Arc<RequirementsService>) -> Router {
    Router::new()
        .route(
            "/api/v1/applications/:application_id/requirements",
            post(create_requirement).get(list_requirements),
        )
        .route(
            "/api/v1/applications/:application_id/requirements/summary",
            get(application_summary),
        )
        .route(
            "/api/v1/requirements/:id",
            get(get_requirement)
                .patch(update_requirement)
                .delete(delete_requirement),
        )
        .route("/api/v1/requirements/:id/status", post(update_status))
        .route("/api/v1/requirements/:id/document", post(link_document))
        .with_state(service)
}

/// Router exposing the template catalog endpoints.
pub fn templates_router(service: Arc<TemplateService>) -> Router {
    Router::new()
        .route("/api/v1/templates", post(create_template).get(list_templates))
        .route("/api/v1/templates/popular", get(popular_templates))
        .route("/api/v1/templates/search", get(search_templates))
        .route("/api/v1/templates/statistics", get(template_statistics))
        .route(
            "/api/v1/templates/:id",
            get(get_template)
                .patch(update_template)
                .delete(delete_template),
        )
        .route(
            "/api/v1/templates/:id/apply/:application_id",
            post(apply_template),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
struct CreateRequirementBody {
    name: String,
    description: Option<String>,
    kind: Option<RequirementKind>,
    category: Option<RequirementCategory>,
    necessity: Option<RequirementNecessity>,
    order: Option<u32>,
    external_url: Option<String>,
    notes: Option<String>,
    task_id: Option<String>,
    #[serde(flatten)]
    detail: DetailDraft,
}

impl CreateRequirementBody {
    fn into_draft(self, application_id: ApplicationId) -> RequirementDraft {
        RequirementDraft {
            application_id,
            name: self.name,
            description: self.description,
            kind: self.kind,
            category: self.category,
            necessity: self.necessity,
            order: self.order,
            external_url: self.external_url,
            notes: self.notes,
            task_id: self.task_id.map(TaskId),
            detail: self.detail,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ListParams {
    status: Option<RequirementStatus>,
    category: Option<RequirementCategory>,
    kind: Option<RequirementKind>,
    necessity: Option<RequirementNecessity>,
    sort_by: Option<RequirementSort>,
    limit: Option<usize>,
    offset: Option<usize>,
}

impl ListParams {
    fn into_query(self) -> RequirementQuery {
        RequirementQuery {
            statuses: self.status.into_iter().collect(),
            categories: self.category.into_iter().collect(),
            kinds: self.kind.into_iter().collect(),
            necessity: self.necessity,
            sort_by: self.sort_by,
            limit: self.limit,
            offset: self.offset,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: RequirementStatus,
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LinkDocumentBody {
    document_id: String,
    notes: Option<String>,
}

async fn create_requirement(
    State(service): State<Arc<RequirementsService>>,
    Path(application_id): Path<String>,
    Json(body): Json<CreateRequirementBody>,
) -> Response {
    let draft = body.into_draft(ApplicationId(application_id));
    match service.create_requirement(draft) {
        Ok(requirement) => (StatusCode::CREATED, Json(requirement)).into_response(),
        Err(err) => requirements_error_response(err),
    }
}

async fn list_requirements(
    State(service): State<Arc<RequirementsService>>,
    Path(application_id): Path<String>,
    Query(params): Query<ListParams>,
) -> Response {
    let application_id = ApplicationId(application_id);
    match service.requirements_for_application(&application_id, &params.into_query()) {
        Ok(requirements) => (StatusCode::OK, Json(requirements)).into_response(),
        Err(err) => requirements_error_response(err),
    }
}

async fn application_summary(
    State(service): State<Arc<RequirementsService>>,
    Path(application_id): Path<String>,
) -> Response {
    let application_id = ApplicationId(application_id);
    match service.application_summary(&application_id) {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(err) => requirements_error_response(err),
    }
}

async fn get_requirement(
    State(service): State<Arc<RequirementsService>>,
    Path(id): Path<String>,
) -> Response {
    let id = RequirementId(id);
    match service.requirement_by_id(&id) {
        Ok(Some(view)) => (StatusCode::OK, Json(view)).into_response(),
        Ok(None) => not_found(format!("requirement {id} not found")),
        Err(err) => requirements_error_response(err),
    }
}

async fn update_requirement(
    State(service): State<Arc<RequirementsService>>,
    Path(id): Path<String>,
    Json(body): Json<RequirementPatch>,
) -> Response {
    let id = RequirementId(id);
    match service.update_requirement(&id, &body) {
        Ok(requirement) => (StatusCode::OK, Json(requirement)).into_response(),
        Err(err) => requirements_error_response(err),
    }
}

async fn delete_requirement(
    State(service): State<Arc<RequirementsService>>,
    Path(id): Path<String>,
) -> Response {
    let id = RequirementId(id);
    match service.delete_requirement(&id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => requirements_error_response(err),
    }
}

async fn update_status(
    State(service): State<Arc<RequirementsService>>,
    Path(id): Path<String>,
    Json(body): Json<StatusBody>,
) -> Response {
    let id = RequirementId(id);
    match service.update_requirement_status(&id, body.status, body.notes) {
        Ok(requirement) => (StatusCode::OK, Json(requirement)).into_response(),
        Err(err) => requirements_error_response(err),
    }
}

async fn link_document(
    State(service): State<Arc<RequirementsService>>,
    Path(id): Path<String>,
    Json(body): Json<LinkDocumentBody>,
) -> Response {
    let id = RequirementId(id);
    match service.link_document(&id, DocumentId(body.document_id), body.notes) {
        Ok(requirement) => (StatusCode::OK, Json(requirement)).into_response(),
        Err(err) => requirements_error_response(err),
    }
}

#[derive(Debug, Deserialize)]
struct CreateTemplateBody {
    #[serde(flatten)]
    draft: TemplateDraft,
    created_by: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PopularParams {
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: String,
    limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct TemplateListParams {
    category: Option<TemplateCategory>,
    is_system: Option<bool>,
    is_active: Option<bool>,
    created_by: Option<String>,
    limit: Option<usize>,
    offset: Option<usize>,
}

async fn create_template(
    State(service): State<Arc<TemplateService>>,
    Json(body): Json<CreateTemplateBody>,
) -> Response {
    match service.create_template(body.draft, body.created_by) {
        Ok(template) => (StatusCode::CREATED, Json(template)).into_response(),
        Err(err) => template_error_response(err),
    }
}

async fn list_templates(
    State(service): State<Arc<TemplateService>>,
    Query(params): Query<TemplateListParams>,
) -> Response {
    let filter = TemplateFilter {
        category: params.category,
        is_system: params.is_system,
        is_active: params.is_active,
        created_by: params.created_by,
        limit: params.limit,
        offset: params.offset,
    };
    match service.templates(&filter) {
        Ok(templates) => (StatusCode::OK, Json(templates)).into_response(),
        Err(err) => template_error_response(err),
    }
}

async fn popular_templates(
    State(service): State<Arc<TemplateService>>,
    Query(params): Query<PopularParams>,
) -> Response {
    match service.popular_templates(params.limit) {
        Ok(templates) => (StatusCode::OK, Json(templates)).into_response(),
        Err(err) => template_error_response(err),
    }
}

async fn search_templates(
    State(service): State<Arc<TemplateService>>,
    Query(params): Query<SearchParams>,
) -> Response {
    match service.search_templates(&params.q, params.limit) {
        Ok(templates) => (StatusCode::OK, Json(templates)).into_response(),
        Err(err) => template_error_response(err),
    }
}

async fn template_statistics(State(service): State<Arc<TemplateService>>) -> Response {
    match service.template_statistics() {
        Ok(statistics) => (StatusCode::OK, Json(statistics)).into_response(),
        Err(err) => template_error_response(err),
    }
}

async fn get_template(
    State(service): State<Arc<TemplateService>>,
    Path(id): Path<String>,
) -> Response {
    let id = TemplateId(id);
    match service.template_by_id(&id) {
        Ok(Some(template)) => (StatusCode::OK, Json(template)).into_response(),
        Ok(None) => not_found(format!("template {id} not found")),
        Err(err) => template_error_response(err),
    }
}

async fn update_template(
    State(service): State<Arc<TemplateService>>,
    Path(id): Path<String>,
    Json(body): Json<TemplatePatch>,
) -> Response {
    let id = TemplateId(id);
    match service.update_template(&id, body) {
        Ok(template) => (StatusCode::OK, Json(template)).into_response(),
        Err(err) => template_error_response(err),
    }
}

async fn delete_template(
    State(service): State<Arc<TemplateService>>,
    Path(id): Path<String>,
) -> Response {
    let id = TemplateId(id);
    match service.delete_template(&id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => template_error_response(err),
    }
}

async fn apply_template(
    State(service): State<Arc<TemplateService>>,
    Path((id, application_id)): Path<(String, String)>,
) -> Response {
    let id = TemplateId(id);
    let application_id = ApplicationId(application_id);
    match service.apply_template(&id, &application_id) {
        Ok(requirements) => {
            let payload = json!({
                "template_id": id,
                "application_id": application_id,
                "created": requirements.len(),
                "requirements": requirements,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => template_error_response(err),
    }
}

fn requirements_error_response(err: RequirementsError) -> Response {
    match err {
        RequirementsError::Validation(report) => {
            let payload = json!({
                "error": "invalid requirement data",
                "fields": report.errors,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
        }
        RequirementsError::ApplicationNotFound(_) | RequirementsError::RequirementNotFound(_) => {
            not_found(err.to_string())
        }
        RequirementsError::InvalidTransition { .. } | RequirementsError::EmptyBulkUpdate => {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
        }
        RequirementsError::Repository(_) => {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}

fn template_error_response(err: TemplateError) -> Response {
    match err {
        TemplateError::Validation(report) => {
            let payload = json!({
                "error": "invalid template data",
                "fields": report.errors,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
        }
        TemplateError::NotFound(_) => not_found(err.to_string()),
        TemplateError::SystemTemplateUpdate | TemplateError::SystemTemplateDelete => {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::FORBIDDEN, Json(payload)).into_response()
        }
        TemplateError::InactiveTemplate(_) => {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::CONFLICT, Json(payload)).into_response()
        }
        TemplateError::ApplyRolledBack { ref source, .. } => {
            let status = match source.as_ref() {
                RequirementsError::ApplicationNotFound(_) => StatusCode::NOT_FOUND,
                RequirementsError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            let payload = json!({ "error": err.to_string() });
            (status, Json(payload)).into_response()
        }
        TemplateError::Repository(_) => {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}

fn not_found(message: String) -> Response {
    let payload = json!({ "error": message });
    (StatusCode::NOT_FOUND, Json(payload)).into_response()
}
