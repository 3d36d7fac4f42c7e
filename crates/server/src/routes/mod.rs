use axum::{Router, http::HeaderValue};
use deployment::Deployment;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::DeploymentImpl;

pub mod budget;
pub mod content;
pub mod generation;
pub mod health;
pub mod projects;
pub mod scenes;
pub mod scripts;
pub mod shots;
pub mod storyboards;

fn cors_layer(deployment: &DeploymentImpl) -> CorsLayer {
    let origin = match deployment.config().cors_allow_origin.as_deref() {
        None | Some("*") => AllowOrigin::any(),
        Some(origin) => match HeaderValue::from_str(origin) {
            Ok(value) => AllowOrigin::exact(value),
            Err(e) => {
                warn!(origin, error = %e, "Ignoring invalid CORS_ALLOW_ORIGIN");
                AllowOrigin::any()
            }
        },
    };
    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn router(deployment: DeploymentImpl) -> Router {
    let api = Router::new()
        .merge(health::router(&deployment))
        .merge(projects::router(&deployment))
        .merge(content::router(&deployment))
        .merge(scenes::router(&deployment))
        .merge(storyboards::router(&deployment))
        .merge(shots::router(&deployment))
        .merge(budget::router(&deployment))
        .merge(scripts::router(&deployment))
        .merge(generation::router(&deployment));

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&deployment))
        .with_state(deployment)
}
