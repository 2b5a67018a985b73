use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    middleware,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use skillmatch_api::middleware::require_auth;
use skillmatch_api::{AppState, AppStateInner, auth, messages, pitches, profiles, projects};
use skillmatch_gateway::connection;
use skillmatch_gateway::dispatcher::Dispatcher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skillmatch=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("SKILLMATCH_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("SKILLMATCH_DB_PATH").unwrap_or_else(|_| "skillmatch.db".into());
    let host = std::env::var("SKILLMATCH_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("SKILLMATCH_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database
    let db = skillmatch_db::Database::open(&PathBuf::from(&db_path))?;

    // Shared state
    let dispatcher = Dispatcher::new();
    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret,
        dispatcher,
    });

    // Routes
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/reset-request", post(auth::reset_request))
        .route("/auth/reset", post(auth::reset_password));

    let protected_routes = Router::new()
        .route("/me", get(auth::me))
        .route("/profiles/me", get(profiles::my_profile))
        .route("/profiles/me", put(profiles::update_profile))
        .route("/profiles/me/skills", post(profiles::add_skill))
        .route(
            "/profiles/me/skills/{user_skill_id}",
            delete(profiles::remove_skill),
        )
        .route("/profiles/me/badges", get(profiles::my_badges))
        .route("/skills", get(profiles::list_skills))
        .route("/badges", get(profiles::list_badges))
        .route("/students", get(profiles::list_students))
        .route("/projects", get(projects::list_projects))
        .route("/projects", post(projects::create_project))
        .route("/projects/{project_id}/join", post(projects::join_project))
        .route("/pitches", get(pitches::list_pitches))
        .route("/pitches", post(pitches::create_pitch))
        .route("/pitches/mine", get(pitches::my_pitches))
        .route("/pitches/{pitch_id}", get(pitches::get_pitch))
        .route(
            "/pitches/{pitch_id}/interest",
            post(pitches::express_interest),
        )
        .route("/pitches/{pitch_id}/reveal", post(pitches::reveal_pitch))
        .route("/conversations", get(messages::list_conversations))
        .route(
            "/conversations/{partner_id}",
            get(messages::get_conversation),
        )
        .route("/messages", post(messages::send_message))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let ws_route = Router::new().route("/gateway", get(ws_upgrade));

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("SkillMatch server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let dispatcher = state.dispatcher.clone();
    let jwt_secret = state.jwt_secret.clone();
    ws.on_upgrade(move |socket| connection::handle_connection(socket, dispatcher, jwt_secret))
}
