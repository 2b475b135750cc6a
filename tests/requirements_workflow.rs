//! End-to-end specifications for the requirements checklist workflow.
//!
//! Scenarios run through the public service facades and the HTTP routers the
//! way a deployment wires them, without reaching into private modules.

mod common {
    use std::sync::Arc;

    use apptrack::requirements::memory::{
        InMemoryApplicationDirectory, InMemoryDocumentDirectory, InMemoryRequirementRepository,
        InMemoryTaskDirectory, InMemoryTemplateRepository,
    };
    use apptrack::requirements::{
        ApplicationId, RequirementCategory, RequirementDraft, RequirementKind,
        RequirementsService, RequirementsTemplate, TemplateCategory, TemplateService,
    };

    pub(super) struct Deployment {
        pub(super) requirements: Arc<RequirementsService>,
        pub(super) templates: Arc<TemplateService>,
        pub(super) applications: Arc<InMemoryApplicationDirectory>,
    }

    pub(super) fn deployment() -> Deployment {
        let applications = Arc::new(InMemoryApplicationDirectory::default());
        let requirements = Arc::new(RequirementsService::new(
            Arc::new(InMemoryRequirementRepository::default()),
            applications.clone(),
            Arc::new(InMemoryDocumentDirectory::default()),
            Arc::new(InMemoryTaskDirectory::default()),
        ));
        let templates = Arc::new(TemplateService::new(
            Arc::new(InMemoryTemplateRepository::default()),
            requirements.clone(),
        ));
        Deployment {
            requirements,
            templates,
            applications,
        }
    }

    pub(super) fn application(deployment: &Deployment, id: &str) -> ApplicationId {
        let id = ApplicationId(id.to_string());
        deployment.applications.register(id.clone());
        id
    }

    pub(super) fn document_draft(
        application_id: &ApplicationId,
        name: &str,
        document_type: &str,
    ) -> RequirementDraft {
        let mut draft = RequirementDraft::new(
            application_id.clone(),
            name,
            RequirementKind::Document,
            RequirementCategory::Academic,
        );
        draft.detail.document_type = Some(document_type.to_string());
        draft
    }

    pub(super) fn scholarship_template(
        seeded: &[RequirementsTemplate],
    ) -> &RequirementsTemplate {
        seeded
            .iter()
            .find(|template| template.category == TemplateCategory::Scholarship)
            .expect("scholarship template is seeded")
    }
}

mod scholarship_checklist {
    use super::common::*;
    use apptrack::requirements::RequirementStatus;

    #[test]
    fn applying_the_template_and_completing_it_makes_the_application_ready() {
        let deployment = deployment();
        let app = application(&deployment, "app-scholarship");
        let seeded = deployment
            .templates
            .seed_system_templates()
            .expect("seeding succeeds");
        let template = scholarship_template(&seeded);

        let created = deployment
            .templates
            .apply_template(&template.id, &app)
            .expect("template applies");
        assert_eq!(created.len(), 5);

        let progress = deployment
            .requirements
            .application_progress(&app)
            .expect("progress computes");
        assert_eq!(progress.total, 5);
        assert_eq!(progress.required, 5);
        assert_eq!(progress.percentage, 0);
        assert!(!progress.is_ready_to_submit());

        for requirement in &created {
            deployment
                .requirements
                .update_requirement_status(&requirement.id, RequirementStatus::Completed, None)
                .expect("requirement completes");
        }

        let progress = deployment
            .requirements
            .application_progress(&app)
            .expect("progress computes");
        assert_eq!(progress.completed, 5);
        assert_eq!(progress.percentage, 100);
        assert!(deployment
            .requirements
            .ready_to_submit(&app)
            .expect("readiness computes"));

        let attention = deployment
            .requirements
            .needing_attention(&app)
            .expect("listing succeeds");
        assert!(attention.is_empty());
    }

    #[test]
    fn reopening_a_requirement_revokes_readiness() {
        let deployment = deployment();
        let app = application(&deployment, "app-scholarship");
        let seeded = deployment
            .templates
            .seed_system_templates()
            .expect("seeding succeeds");
        let created = deployment
            .templates
            .apply_template(&scholarship_template(&seeded).id, &app)
            .expect("template applies");

        for requirement in &created {
            deployment
                .requirements
                .update_requirement_status(&requirement.id, RequirementStatus::Completed, None)
                .expect("requirement completes");
        }
        assert!(deployment
            .requirements
            .ready_to_submit(&app)
            .expect("readiness computes"));

        let reopened = deployment
            .requirements
            .update_requirement_status(&created[0].id, RequirementStatus::InProgress, None)
            .expect("completed requirement reopens");
        assert_eq!(reopened.submitted_at, None);

        assert!(!deployment
            .requirements
            .ready_to_submit(&app)
            .expect("readiness computes"));
        let attention = deployment
            .requirements
            .needing_attention(&app)
            .expect("listing succeeds");
        assert_eq!(attention.len(), 1);
        assert_eq!(attention[0].name, created[0].name);
    }
}

mod mixed_checklist {
    use super::common::*;
    use apptrack::requirements::{
        RequirementNecessity, RequirementPatch, RequirementStatus,
    };

    #[test]
    fn manual_requirements_and_waivers_roll_up_into_progress() {
        let deployment = deployment();
        let app = application(&deployment, "app-mixed");

        let transcript = deployment
            .requirements
            .create_requirement(document_draft(&app, "Transcript", "transcript"))
            .expect("created");
        let essay = deployment
            .requirements
            .create_requirement(document_draft(&app, "Essay", "essay"))
            .expect("created");
        let mut portfolio = document_draft(&app, "Portfolio", "portfolio");
        portfolio.necessity = Some(RequirementNecessity::Optional);
        deployment
            .requirements
            .create_requirement(portfolio)
            .expect("created");

        deployment
            .requirements
            .update_requirement_status(&transcript.id, RequirementStatus::Waived, None)
            .expect("transcript waived");
        deployment
            .requirements
            .update_requirement(
                &essay.id,
                &RequirementPatch {
                    status: Some(RequirementStatus::Completed),
                    ..RequirementPatch::default()
                },
            )
            .expect("essay patched");

        let cached = deployment
            .applications
            .progress_of(&app)
            .expect("progress cached on the application");
        assert_eq!(cached.total, 3);
        assert_eq!(cached.completed, 2);
        assert_eq!(cached.percentage, 67);
        assert_eq!(cached.required_completed, 2);
        assert!(cached.is_ready_to_submit());
    }
}

mod http_surface {
    use super::common::*;
    use apptrack::requirements::{requirements_router, templates_router};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    #[tokio::test]
    async fn checklist_lifecycle_over_http() {
        let deployment = deployment();
        let app = application(&deployment, "app-http");
        let seeded = deployment
            .templates
            .seed_system_templates()
            .expect("seeding succeeds");
        let template = scholarship_template(&seeded);
        let router = requirements_router(deployment.requirements.clone())
            .merge(templates_router(deployment.templates.clone()));

        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/v1/templates/{}/apply/{app}", template.id))
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router dispatch");
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("body reads");
        let payload: Value = serde_json::from_slice(&body).expect("json payload");
        assert_eq!(payload["created"], 5);
        let first_id = payload["requirements"][0]["id"]
            .as_str()
            .expect("requirement id is a string")
            .to_string();

        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/v1/requirements/{first_id}/status"))
                    .header("content-type", "application/json")
                    .body(Body::from(
                        json!({ "status": "completed", "notes": "submitted online" }).to_string(),
                    ))
                    .expect("request builds"),
            )
            .await
            .expect("router dispatch");
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri(format!("/api/v1/applications/{app}/requirements/summary"))
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router dispatch");
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("body reads");
        let payload: Value = serde_json::from_slice(&body).expect("json payload");
        assert_eq!(payload["progress"]["total"], 5);
        assert_eq!(payload["progress"]["completed"], 1);
        assert_eq!(payload["progress"]["percentage"], 20);

        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri(format!(
                        "/api/v1/applications/{app}/requirements?status=pending&sort_by=order"
                    ))
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router dispatch");
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("body reads");
        let payload: Value = serde_json::from_slice(&body).expect("json payload");
        assert_eq!(payload.as_array().expect("array response").len(), 4);
    }
}
