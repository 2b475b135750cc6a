//! Built-in system templates seeded once per deployment.

use super::domain::{RequirementCategory, RequirementDetail, RequirementNecessity};
use super::template::{RequirementBlueprint, TemplateCategory};

pub(crate) struct TemplateSeed {
    pub name: &'static str,
    pub description: &'static str,
    pub category: TemplateCategory,
    pub tags: &'static [&'static str],
    pub blueprints: Vec<RequirementBlueprint>,
}

pub(crate) fn system_template_seeds() -> Vec<TemplateSeed> {
    vec![
        TemplateSeed {
            name: "Graduate School Application",
            description: "Standard checklist for graduate program applications.",
            category: TemplateCategory::Graduate,
            tags: &["graduate", "masters", "phd"],
            blueprints: graduate_blueprints(),
        },
        TemplateSeed {
            name: "Undergraduate Application",
            description: "Standard checklist for undergraduate admissions.",
            category: TemplateCategory::Undergraduate,
            tags: &["undergraduate", "college", "freshman"],
            blueprints: undergraduate_blueprints(),
        },
        TemplateSeed {
            name: "Scholarship Application",
            description: "Standard checklist for scholarship applications.",
            category: TemplateCategory::Scholarship,
            tags: &["scholarship", "funding", "financial-aid"],
            blueprints: scholarship_blueprints(),
        },
    ]
}

fn document(
    name: &str,
    category: RequirementCategory,
    necessity: RequirementNecessity,
    document_type: &str,
    word_limit: Option<u64>,
    order: u32,
) -> RequirementBlueprint {
    RequirementBlueprint {
        name: name.to_string(),
        description: None,
        category,
        necessity,
        detail: RequirementDetail::Document {
            document_type: document_type.to_string(),
            max_file_size: Some(10 * 1024 * 1024),
            allowed_file_types: vec!["pdf".to_string(), "docx".to_string()],
            word_limit,
            character_limit: None,
        },
        order,
    }
}

fn graduate_blueprints() -> Vec<RequirementBlueprint> {
    vec![
        document(
            "Official Transcripts",
            RequirementCategory::Academic,
            RequirementNecessity::Required,
            "transcript",
            None,
            0,
        ),
        document(
            "Statement of Purpose",
            RequirementCategory::Personal,
            RequirementNecessity::Required,
            "essay",
            Some(1000),
            1,
        ),
        document(
            "Letters of Recommendation",
            RequirementCategory::Professional,
            RequirementNecessity::Required,
            "recommendation_letter",
            None,
            2,
        ),
        RequirementBlueprint {
            name: "GRE Scores".to_string(),
            description: Some("General test scores sent directly by ETS.".to_string()),
            category: RequirementCategory::Academic,
            necessity: RequirementNecessity::Required,
            detail: RequirementDetail::TestScore {
                test_type: "GRE".to_string(),
                min_score: Some(260.0),
                max_score: Some(340.0),
                score_format: Some("total".to_string()),
            },
            order: 3,
        },
        RequirementBlueprint {
            name: "TOEFL Scores".to_string(),
            description: Some("Required for non-native English speakers.".to_string()),
            category: RequirementCategory::Academic,
            necessity: RequirementNecessity::Conditional,
            detail: RequirementDetail::TestScore {
                test_type: "TOEFL".to_string(),
                min_score: Some(0.0),
                max_score: Some(120.0),
                score_format: Some("total".to_string()),
            },
            order: 4,
        },
        document(
            "Resume or CV",
            RequirementCategory::Professional,
            RequirementNecessity::Required,
            "resume",
            None,
            5,
        ),
        RequirementBlueprint {
            name: "Application Fee".to_string(),
            description: None,
            category: RequirementCategory::Administrative,
            necessity: RequirementNecessity::Required,
            detail: RequirementDetail::Fee {
                amount: 85.0,
                currency: "USD".to_string(),
                description: Some("Non-refundable application fee.".to_string()),
            },
            order: 6,
        },
        RequirementBlueprint {
            name: "Admissions Interview".to_string(),
            description: None,
            category: RequirementCategory::Personal,
            necessity: RequirementNecessity::Optional,
            detail: RequirementDetail::Interview {
                interview_type: "video".to_string(),
                duration_minutes: Some(30),
                notes: Some("Scheduled by the department after initial review.".to_string()),
            },
            order: 7,
        },
    ]
}

fn undergraduate_blueprints() -> Vec<RequirementBlueprint> {
    vec![
        document(
            "High School Transcript",
            RequirementCategory::Academic,
            RequirementNecessity::Required,
            "transcript",
            None,
            0,
        ),
        RequirementBlueprint {
            name: "SAT or ACT Scores".to_string(),
            description: None,
            category: RequirementCategory::Academic,
            necessity: RequirementNecessity::Required,
            detail: RequirementDetail::TestScore {
                test_type: "SAT".to_string(),
                min_score: Some(400.0),
                max_score: Some(1600.0),
                score_format: Some("composite".to_string()),
            },
            order: 1,
        },
        document(
            "Personal Essay",
            RequirementCategory::Personal,
            RequirementNecessity::Required,
            "essay",
            Some(650),
            2,
        ),
        document(
            "Counselor Recommendation",
            RequirementCategory::Academic,
            RequirementNecessity::Required,
            "recommendation_letter",
            None,
            3,
        ),
        RequirementBlueprint {
            name: "Application Fee".to_string(),
            description: None,
            category: RequirementCategory::Administrative,
            necessity: RequirementNecessity::Required,
            detail: RequirementDetail::Fee {
                amount: 75.0,
                currency: "USD".to_string(),
                description: Some("Non-refundable application fee.".to_string()),
            },
            order: 4,
        },
        document(
            "Extracurricular Activities List",
            RequirementCategory::Personal,
            RequirementNecessity::Optional,
            "activities_list",
            None,
            5,
        ),
    ]
}

// Scenario tests rely on this template carrying exactly five blueprints.
fn scholarship_blueprints() -> Vec<RequirementBlueprint> {
    vec![
        document(
            "Scholarship Essay",
            RequirementCategory::Personal,
            RequirementNecessity::Required,
            "essay",
            Some(500),
            0,
        ),
        document(
            "Academic Transcript",
            RequirementCategory::Academic,
            RequirementNecessity::Required,
            "transcript",
            None,
            1,
        ),
        document(
            "Letter of Recommendation",
            RequirementCategory::Professional,
            RequirementNecessity::Required,
            "recommendation_letter",
            None,
            2,
        ),
        document(
            "Financial Need Statement",
            RequirementCategory::Financial,
            RequirementNecessity::Required,
            "financial_statement",
            None,
            3,
        ),
        document(
            "Enrollment Verification",
            RequirementCategory::Administrative,
            RequirementNecessity::Required,
            "enrollment_verification",
            None,
            4,
        ),
    ]
}
