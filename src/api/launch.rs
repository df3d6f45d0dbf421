// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Launch endpoint handlers.

use axum::{
    extract::{Request, State},
    Json,
};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    error::ApiError,
    lti::{LaunchContext, UnencodedCookies},
    state::AppState,
};

async fn resolve(
    state: &AppState,
    jar: CookieJar,
    request: Request,
) -> Result<(UnencodedCookies, Json<LaunchContext>), ApiError> {
    let (jar, context) = state.resolver.resolve(&state.lti, jar, request).await?;
    Ok((UnencodedCookies(jar), Json(context)))
}

/// Receive a signed LTI launch from the LMS.
///
/// Always answers 200 with either the verified launch body or an
/// `{ "error": { "code", "message" } }` object.
#[utoipa::path(
    post,
    path = "/lti/launch",
    tag = "Launch",
    request_body(
        content = String,
        content_type = "application/x-www-form-urlencoded",
        description = "Signed LTI 1.x launch parameters"
    ),
    responses(
        (status = 200, description = "Verified launch body or error object", body = LaunchContext),
        (status = 500, description = "Launch validator failure")
    )
)]
pub async fn launch(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Request,
) -> Result<(UnencodedCookies, Json<LaunchContext>), ApiError> {
    resolve(&state, jar, request).await
}

/// Current launch context for a page load after the launch.
///
/// Returns `{}` when nothing is stored or persistence is disabled.
#[utoipa::path(
    get,
    path = "/lti/launch",
    tag = "Launch",
    responses(
        (status = 200, description = "Stored launch context, {} or error object", body = LaunchContext)
    )
)]
pub async fn current_context(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Request,
) -> Result<(UnencodedCookies, Json<LaunchContext>), ApiError> {
    resolve(&state, jar, request).await
}
