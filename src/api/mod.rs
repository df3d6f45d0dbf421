// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{routing::get, Router};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{lti::LaunchContext, state::AppState};

pub mod health;
pub mod launch;

pub fn router(state: AppState) -> Router {
    let routes = Router::new()
        .route(
            "/lti/launch",
            get(launch::current_context).post(launch::launch),
        )
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .with_state(state);

    Router::new()
        .merge(routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        launch::launch,
        launch::current_context,
        health::health,
        health::liveness
    ),
    components(
        schemas(
            LaunchContext,
            health::ReadyResponse,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Launch", description = "LTI launch verification and context rehydration"),
        (name = "Health", description = "Liveness and readiness checks")
    )
)]
struct ApiDoc;
