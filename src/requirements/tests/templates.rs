use std::sync::Arc;

use super::common::{
    application, blueprint_draft, harness, template_draft, FlakyRequirementRepository,
};
use crate::requirements::memory::{
    InMemoryApplicationDirectory, InMemoryDocumentDirectory, InMemoryTaskDirectory,
    InMemoryTemplateRepository,
};
use crate::requirements::service::RequirementsService;
use crate::requirements::template_service::{TemplateFilter, TemplatePatch, TemplateService};
use crate::requirements::{
    ApplicationId, RequirementsError, RequirementsTemplate, TemplateCategory, TemplateError,
    TemplateId,
};

fn scholarship(seeded: &[RequirementsTemplate]) -> &RequirementsTemplate {
    seeded
        .iter()
        .find(|template| template.category == TemplateCategory::Scholarship)
        .expect("scholarship template is seeded")
}

#[test]
fn create_template_normalizes_blueprint_order() {
    let harness = harness();

    let mut draft = template_draft("Transfer Checklist");
    draft.requirements[0].order = Some(5);
    draft.requirements[1].order = Some(1);

    let template = harness
        .templates
        .create_template(draft, Some("advisor@example.com".to_string()))
        .expect("valid template is created");

    assert!(!template.is_system);
    assert!(template.is_active);
    assert_eq!(template.usage_count, 0);
    assert_eq!(template.created_by.as_deref(), Some("advisor@example.com"));
    let names: Vec<&str> = template.blueprints.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["Writing Sample", "Essay"]);
}

#[test]
fn create_template_requires_category_name_and_blueprints() {
    let harness = harness();

    let mut no_category = template_draft("Checklist");
    no_category.category = None;
    let err = harness
        .templates
        .create_template(no_category, None)
        .expect_err("category is mandatory");
    match err {
        TemplateError::Validation(report) => {
            assert_eq!(report.errors[0].field, "category");
        }
        other => panic!("expected validation error, got {other:?}"),
    }

    let mut empty = template_draft("  ");
    empty.requirements.clear();
    let err = harness
        .templates
        .create_template(empty, None)
        .expect_err("name and blueprints are mandatory");
    match err {
        TemplateError::Validation(report) => {
            let fields: Vec<&str> = report.errors.iter().map(|e| e.field.as_str()).collect();
            assert_eq!(fields, vec!["name", "requirements"]);
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn blueprint_errors_are_prefixed_with_their_index() {
    let harness = harness();

    let mut draft = template_draft("Checklist");
    draft.requirements[1].detail.document_type = None;

    let err = harness
        .templates
        .create_template(draft, None)
        .expect_err("malformed blueprint is rejected");
    match err {
        TemplateError::Validation(report) => {
            assert_eq!(report.errors[0].field, "requirements[1].document_type");
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn duplicate_blueprint_names_are_rejected_case_insensitively() {
    let harness = harness();

    let mut draft = template_draft("Checklist");
    draft.requirements[1] = blueprint_draft("ESSAY");

    let err = harness
        .templates
        .create_template(draft, None)
        .expect_err("duplicate names are rejected");
    match err {
        TemplateError::Validation(report) => {
            assert_eq!(report.errors[0].field, "requirements");
            assert!(report.errors[0].message.contains("unique"));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn system_templates_are_immutable() {
    let harness = harness();
    let seeded = harness.templates.seed_system_templates().expect("seeding succeeds");
    let system_id = seeded[0].id.clone();

    let err = harness
        .templates
        .update_template(
            &system_id,
            TemplatePatch {
                name: Some("Renamed".to_string()),
                ..TemplatePatch::default()
            },
        )
        .expect_err("system templates cannot be updated");
    assert!(matches!(err, TemplateError::SystemTemplateUpdate));

    let err = harness
        .templates
        .delete_template(&system_id)
        .expect_err("system templates cannot be deleted");
    assert!(matches!(err, TemplateError::SystemTemplateDelete));

    let untouched = harness
        .templates
        .template_by_id(&system_id)
        .expect("lookup succeeds")
        .expect("template still exists");
    assert_eq!(untouched.name, seeded[0].name);
}

#[test]
fn user_templates_can_be_updated_and_deleted() {
    let harness = harness();
    let template = harness
        .templates
        .create_template(template_draft("Checklist"), None)
        .expect("created");

    let updated = harness
        .templates
        .update_template(
            &template.id,
            TemplatePatch {
                description: Some("Updated description".to_string()),
                tags: Some(vec!["transfer".to_string()]),
                ..TemplatePatch::default()
            },
        )
        .expect("user template updates");
    assert_eq!(updated.description.as_deref(), Some("Updated description"));
    assert_eq!(updated.tags, vec!["transfer".to_string()]);

    harness
        .templates
        .delete_template(&template.id)
        .expect("user template deletes");
    assert!(harness
        .templates
        .template_by_id(&template.id)
        .expect("lookup succeeds")
        .is_none());
}

#[test]
fn applying_scholarship_template_creates_full_checklist() {
    let harness = harness();
    let app = application(&harness, "app-1");
    let seeded = harness.templates.seed_system_templates().expect("seeding succeeds");
    let template = scholarship(&seeded);

    let created = harness
        .templates
        .apply_template(&template.id, &app)
        .expect("template applies");

    assert_eq!(created.len(), 5);
    let names: Vec<&str> = created.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "Scholarship Essay",
            "Academic Transcript",
            "Letter of Recommendation",
            "Financial Need Statement",
            "Enrollment Verification",
        ]
    );

    let progress = harness.applications.progress_of(&app).expect("progress recorded");
    assert_eq!(progress.total, 5);
    assert_eq!(progress.required, 5);
    assert_eq!(progress.percentage, 0);

    let reloaded = harness
        .templates
        .template_by_id(&template.id)
        .expect("lookup succeeds")
        .expect("template exists");
    assert_eq!(reloaded.usage_count, 1);
}

#[test]
fn applying_unknown_template_fails() {
    let harness = harness();
    let app = application(&harness, "app-1");
    let err = harness
        .templates
        .apply_template(&TemplateId("tpl-missing".to_string()), &app)
        .expect_err("unknown template is rejected");
    assert!(matches!(err, TemplateError::NotFound(_)));
}

#[test]
fn inactive_templates_cannot_be_applied() {
    let harness = harness();
    let app = application(&harness, "app-1");
    let template = harness
        .templates
        .create_template(template_draft("Checklist"), None)
        .expect("created");

    harness
        .templates
        .update_template(
            &template.id,
            TemplatePatch {
                is_active: Some(false),
                ..TemplatePatch::default()
            },
        )
        .expect("deactivation succeeds");

    let err = harness
        .templates
        .apply_template(&template.id, &app)
        .expect_err("inactive template is rejected");
    assert!(matches!(err, TemplateError::InactiveTemplate(_)));
    assert!(harness.store.is_empty());
}

#[test]
fn applying_to_unknown_application_creates_nothing() {
    let harness = harness();
    let ghost = ApplicationId("app-ghost".to_string());
    let seeded = harness.templates.seed_system_templates().expect("seeding succeeds");
    let template = scholarship(&seeded);

    let err = harness
        .templates
        .apply_template(&template.id, &ghost)
        .expect_err("unknown application is rejected");
    match err {
        TemplateError::ApplyRolledBack {
            rolled_back,
            source,
            ..
        } => {
            assert_eq!(rolled_back, 0);
            assert!(matches!(*source, RequirementsError::ApplicationNotFound(_)));
        }
        other => panic!("expected rollback error, got {other:?}"),
    }
    assert!(harness.store.is_empty());

    let reloaded = harness
        .templates
        .template_by_id(&template.id)
        .expect("lookup succeeds")
        .expect("template exists");
    assert_eq!(reloaded.usage_count, 0);
}

#[test]
fn partial_application_rolls_back_created_requirements() {
    let flaky = Arc::new(FlakyRequirementRepository::new(2));
    let applications = Arc::new(InMemoryApplicationDirectory::default());
    let requirements = Arc::new(RequirementsService::new(
        flaky.clone(),
        applications.clone(),
        Arc::new(InMemoryDocumentDirectory::default()),
        Arc::new(InMemoryTaskDirectory::default()),
    ));
    let templates = TemplateService::new(
        Arc::new(InMemoryTemplateRepository::default()),
        requirements,
    );

    let app = ApplicationId("app-1".to_string());
    applications.register(app.clone());
    let seeded = templates.seed_system_templates().expect("seeding succeeds");
    let template = scholarship(&seeded);

    let err = templates
        .apply_template(&template.id, &app)
        .expect_err("third insert fails");
    match err {
        TemplateError::ApplyRolledBack {
            rolled_back,
            source,
            ..
        } => {
            assert_eq!(rolled_back, 2);
            assert!(matches!(*source, RequirementsError::Repository(_)));
        }
        other => panic!("expected rollback error, got {other:?}"),
    }

    assert_eq!(flaky.stored(), 0);
    assert!(applications.requirement_ids(&app).is_empty());
    let progress = applications.progress_of(&app).expect("progress refreshed");
    assert_eq!(progress.total, 0);

    let reloaded = templates
        .template_by_id(&template.id)
        .expect("lookup succeeds")
        .expect("template exists");
    assert_eq!(reloaded.usage_count, 0);
}

#[test]
fn seeding_is_idempotent() {
    let harness = harness();
    let first = harness.templates.seed_system_templates().expect("seeding succeeds");
    assert_eq!(first.len(), 3);

    let second = harness.templates.seed_system_templates().expect("second call is a no-op");
    assert!(second.is_empty());

    let statistics = harness.templates.template_statistics().expect("statistics compute");
    assert_eq!(statistics.total, 3);
    assert_eq!(statistics.system, 3);
}

#[test]
fn listing_filters_by_system_flag_and_category() {
    let harness = harness();
    harness.templates.seed_system_templates().expect("seeding succeeds");
    harness
        .templates
        .create_template(template_draft("Checklist"), None)
        .expect("created");

    let user_only = harness
        .templates
        .templates(&TemplateFilter {
            is_system: Some(false),
            ..TemplateFilter::default()
        })
        .expect("listing succeeds");
    assert_eq!(user_only.len(), 1);
    assert_eq!(user_only[0].name, "Checklist");

    let graduate = harness
        .templates
        .templates_by_category(TemplateCategory::Graduate)
        .expect("listing succeeds");
    assert_eq!(graduate.len(), 1);
    assert_eq!(graduate[0].name, "Graduate School Application");
}

#[test]
fn popular_templates_rank_by_usage() {
    let harness = harness();
    let app = application(&harness, "app-1");
    let seeded = harness.templates.seed_system_templates().expect("seeding succeeds");
    let template = scholarship(&seeded);

    harness
        .templates
        .apply_template(&template.id, &app)
        .expect("template applies");

    let popular = harness
        .templates
        .popular_templates(Some(2))
        .expect("listing succeeds");
    assert_eq!(popular.len(), 2);
    assert_eq!(popular[0].name, "Scholarship Application");
    assert_eq!(popular[0].usage_count, 1);
}

#[test]
fn search_matches_name_description_and_tags() {
    let harness = harness();
    harness.templates.seed_system_templates().expect("seeding succeeds");

    let by_tag = harness
        .templates
        .search_templates("funding", None)
        .expect("search succeeds");
    assert_eq!(by_tag.len(), 1);
    assert_eq!(by_tag[0].name, "Scholarship Application");

    let by_name = harness
        .templates
        .search_templates("GRADUATE", None)
        .expect("search succeeds");
    assert_eq!(by_name.len(), 2);

    let nothing = harness
        .templates
        .search_templates("   ", None)
        .expect("search succeeds");
    assert!(nothing.is_empty());
}

#[test]
fn statistics_aggregate_catalog_counts() {
    let harness = harness();
    let app = application(&harness, "app-1");
    let seeded = harness.templates.seed_system_templates().expect("seeding succeeds");
    harness
        .templates
        .create_template(template_draft("Checklist"), None)
        .expect("created");
    harness
        .templates
        .apply_template(&scholarship(&seeded).id, &app)
        .expect("template applies");

    let statistics = harness.templates.template_statistics().expect("statistics compute");
    assert_eq!(statistics.total, 4);
    assert_eq!(statistics.system, 3);
    assert_eq!(statistics.user, 1);
    assert_eq!(statistics.active, 4);
    assert_eq!(statistics.total_usage, 1);
    assert_eq!(statistics.by_category[&TemplateCategory::Scholarship], 1);
    assert_eq!(statistics.by_category[&TemplateCategory::Custom], 1);
}
