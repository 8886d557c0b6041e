//! Backend entry-point: wires configuration, migrations, the service graph,
//! and the REST endpoints.

use actix_web::{web, App, HttpServer};
use diesel::{Connection, PgConnection};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

use backend::api::enrollments::{enroll, record_feedback, repair_enrollments};
use backend::api::health::{live, ready, HealthState};
use backend::api::meetings::{
    advance_meeting, get_meeting, propose_reschedule, request_meeting, resolve_reschedule,
};
use backend::api::slots::{
    archive_slot_batch, book_slot, get_slot_batch, list_bookable_slot_batches,
    list_mentor_slot_batches, publish_slots, reschedule_slot,
};
#[cfg(debug_assertions)]
use backend::ApiDoc;
use backend::outbound::persistence::{DbPool, PoolConfig};
use backend::server::{build_state, AppSettings, AppState};
use backend::Trace;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

fn run_migrations(database_url: &str) -> std::io::Result<()> {
    let mut conn = PgConnection::establish(database_url)
        .map_err(|err| std::io::Error::other(format!("database connection failed: {err}")))?;
    conn.run_pending_migrations(MIGRATIONS)
        .map(|applied| info!(count = applied.len(), "migrations applied"))
        .map_err(|err| std::io::Error::other(format!("migrations failed: {err}")))
}

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = AppSettings::load()
        .map_err(|err| std::io::Error::other(format!("configuration failed: {err}")))?;
    let bind_addr = settings
        .bind_addr()
        .map_err(|err| std::io::Error::other(format!("invalid bind address: {err}")))?;

    let database_url = settings.database_url().to_owned();
    tokio::task::spawn_blocking(move || run_migrations(&database_url))
        .await
        .map_err(|err| std::io::Error::other(format!("migration task failed: {err}")))??;

    let pool = DbPool::new(
        PoolConfig::new(settings.database_url()).with_max_size(settings.db_pool_size),
    )
    .await
    .map_err(|err| std::io::Error::other(format!("pool construction failed: {err}")))?;

    let state = build_state(&pool, &settings);
    let health_state = web::Data::new(HealthState::new());
    let server_health_state = health_state.clone();

    info!(%bind_addr, "starting scheduling backend");
    let server = HttpServer::new(move || build_app(server_health_state.clone(), state.clone()))
        .bind(bind_addr)?;

    health_state.mark_ready();
    server.run().await
}

fn build_app(
    health_state: web::Data<HealthState>,
    state: AppState,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let api = web::scope("/api/v1")
        .app_data(state.slot_batches)
        .app_data(state.bookings)
        .app_data(state.enrollments)
        .app_data(state.meetings)
        .service(publish_slots)
        .service(get_slot_batch)
        .service(list_mentor_slot_batches)
        .service(list_bookable_slot_batches)
        .service(archive_slot_batch)
        .service(book_slot)
        .service(reschedule_slot)
        .service(enroll)
        .service(record_feedback)
        .service(repair_enrollments)
        .service(request_meeting)
        .service(get_meeting)
        .service(advance_meeting)
        .service(propose_reschedule)
        .service(resolve_reschedule);

    let app = App::new()
        .app_data(health_state)
        .wrap(Trace)
        .service(api)
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app =
        app.service(SwaggerUi::new("/docs/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app
}
