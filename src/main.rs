use apptrack::config::AppConfig;
use apptrack::error::AppError;
use apptrack::requirements::memory::{
    InMemoryApplicationDirectory, InMemoryDocumentDirectory, InMemoryRequirementRepository,
    InMemoryTaskDirectory, InMemoryTemplateRepository,
};
use apptrack::requirements::{
    requirements_router, templates_router, ApplicationId, RequirementsService, TemplateService,
};
use apptrack::telemetry;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
    applications: Arc<InMemoryApplicationDirectory>,
}

#[derive(Parser, Debug)]
#[command(
    name = "apptrack",
    about = "Track application requirement checklists, templates, and progress",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Inspect the built-in requirement templates
    Templates {
        #[command(subcommand)]
        command: TemplatesCommand,
    },
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Subcommand, Debug)]
enum TemplatesCommand {
    /// Seed the system templates and list their checklists
    Seed,
    /// Seed the system templates and print catalog statistics
    Stats,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Templates { command } => run_templates_command(command),
    }
}

fn build_services() -> (
    Arc<RequirementsService>,
    Arc<TemplateService>,
    Arc<InMemoryApplicationDirectory>,
) {
    let requirements_store = Arc::new(InMemoryRequirementRepository::default());
    let templates_store = Arc::new(InMemoryTemplateRepository::default());
    let applications = Arc::new(InMemoryApplicationDirectory::default());
    let documents = Arc::new(InMemoryDocumentDirectory::default());
    let tasks = Arc::new(InMemoryTaskDirectory::default());

    let requirements = Arc::new(RequirementsService::new(
        requirements_store,
        applications.clone(),
        documents,
        tasks,
    ));
    let templates = Arc::new(TemplateService::new(templates_store, requirements.clone()));
    (requirements, templates, applications)
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (requirements, templates, applications) = build_services();
    if config.seed_templates {
        let seeded = templates.seed_system_templates()?;
        info!(count = seeded.len(), "system templates ready");
    }

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
        applications,
    };

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/applications", post(register_application))
        .with_state(state)
        .merge(requirements_router(requirements))
        .merge(templates_router(templates))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "requirements tracker ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn run_templates_command(command: TemplatesCommand) -> Result<(), AppError> {
    let (_, templates, _) = build_services();
    let seeded = templates.seed_system_templates()?;

    match command {
        TemplatesCommand::Seed => {
            for template in &seeded {
                println!(
                    "{} [{}] — {} requirement(s)",
                    template.name,
                    template.category.label(),
                    template.blueprints.len()
                );
                for blueprint in &template.blueprints {
                    println!(
                        "  {}. {} ({}, {}, {})",
                        blueprint.order + 1,
                        blueprint.name,
                        blueprint.kind().label(),
                        blueprint.category.label(),
                        blueprint.necessity.label()
                    );
                }
            }
        }
        TemplatesCommand::Stats => {
            let statistics = templates.template_statistics()?;
            println!("Templates: {} total", statistics.total);
            println!("  system: {}", statistics.system);
            println!("  user: {}", statistics.user);
            println!("  active: {}", statistics.active);
            println!("  applications served: {}", statistics.total_usage);
            for (category, count) in &statistics.by_category {
                println!("  {}: {}", category.label(), count);
            }
        }
    }

    Ok(())
}

#[derive(Debug, Deserialize)]
struct RegisterApplicationBody {
    id: String,
}

/// Demo hook standing in for the application aggregate's own API: registers
/// an application so requirements can be attached to it.
async fn register_application(
    State(state): State<AppState>,
    Json(body): Json<RegisterApplicationBody>,
) -> impl IntoResponse {
    let id = ApplicationId(body.id);
    state.applications.register(id.clone());
    (StatusCode::CREATED, Json(json!({ "application_id": id })))
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
