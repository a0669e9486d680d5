use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Form, Json,
};
use axum_extra::extract::cookie::Key;
use axum_extra::extract::PrivateCookieJar;
use cookie::Cookie;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::ec2::{instance_document, Ec2Client};
use crate::policy::{CheckKind, PolicyClient};
use crate::server::types::{
    build_row, mutation_outcome, CredentialForm, HealthResponse, ListResponse, VersionResponse,
};
use crate::session::{CredentialSession, SESSION_COOKIE_NAME};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub policy: Arc<PolicyClient>,
    pub checks: Vec<CheckKind>,
    pub cookie_key: Key,
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Key {
        state.cookie_key.clone()
    }
}

// ============================================
// Handlers
// ============================================

/// Health check endpoint on the app router
pub async fn healthz(
    axum::extract::ConnectInfo(addr): axum::extract::ConnectInfo<std::net::SocketAddr>,
) -> impl IntoResponse {
    debug!(
        remote_addr = %addr,
        "Health check request received"
    );
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
        }),
    )
}

/// Get version info
pub async fn get_version() -> impl IntoResponse {
    let version = VersionResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        commit: env!("GIT_COMMIT").to_string(),
        build_date: env!("BUILD_DATE").to_string(),
    };
    (StatusCode::OK, Json(version))
}

/// Accept credentials, store them in the session cookie, enumerate
/// instances and run every active policy check per instance
pub async fn list_instances(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Form(form): Form<CredentialForm>,
) -> Response {
    let session = CredentialSession {
        access_key: form.access_key,
        secret_key: form.secret_key,
        region: form.region,
    };

    let session_json = match serde_json::to_string(&session) {
        Ok(json) => json,
        Err(e) => {
            error!(error = %e, "Failed to serialize credential session");
            return internal_error("failed to store session");
        }
    };
    let session_cookie = Cookie::build((SESSION_COOKIE_NAME, session_json))
        .path("/")
        .http_only(true)
        .same_site(cookie::SameSite::Lax)
        .build();
    let jar = jar.add(session_cookie);

    let ec2 = Ec2Client::from_credentials(&session).await;
    let instances = match ec2.list_instances().await {
        Ok(instances) => instances,
        Err(e) => {
            error!(error = %e, region = %session.region, "Failed to list instances");
            return (jar, internal_error(&format!("{:#}", e))).into_response();
        }
    };

    let mut rows = Vec::with_capacity(instances.len());
    for instance in &instances {
        let document = instance_document(instance).into_json();

        // One policy call per active check, sequential
        let mut results = Vec::with_capacity(state.checks.len());
        for check in &state.checks {
            match state.policy.evaluate(*check, &document).await {
                Ok(verdict) => results.push(crate::server::types::CheckResult {
                    check: *check,
                    flagged: verdict.flagged,
                    reasons: verdict.reasons,
                }),
                Err(e) => {
                    error!(
                        error = %e,
                        check = %check,
                        instance_id = ?instance.instance_id(),
                        "Policy evaluation failed"
                    );
                    return (jar, internal_error(&e.to_string())).into_response();
                }
            }
        }

        rows.push(build_row(instance, results));
    }

    info!(
        total = rows.len(),
        active_checks = state.checks.len(),
        region = %session.region,
        "Instance listing complete"
    );

    (
        jar,
        (
            StatusCode::OK,
            Json(ListResponse {
                total: rows.len(),
                items: rows,
            }),
        ),
    )
        .into_response()
}

/// Raw describe-instance document for one instance, datetime-normalized
pub async fn get_instance(
    State(_state): State<AppState>,
    jar: PrivateCookieJar,
    Path(id): Path<String>,
) -> Response {
    let session = match read_session(&jar) {
        Some(session) => session,
        None => return unauthorized(),
    };

    let ec2 = Ec2Client::from_credentials(&session).await;
    match ec2.describe_instance(&id).await {
        Ok(instance) => {
            let document = instance_document(&instance).into_json();
            (StatusCode::OK, Json(document)).into_response()
        }
        Err(e) => {
            error!(error = %e, instance_id = %id, "Failed to describe instance");
            internal_error(&format!("{:#}", e))
        }
    }
}

/// Enforce IMDSv2 on one instance. Any cloud-API failure is logged with
/// its full error chain and degraded to `{"success": false}`; the response
/// deliberately carries no error detail.
pub async fn enable_imdsv2(
    State(_state): State<AppState>,
    jar: PrivateCookieJar,
    Path(id): Path<String>,
) -> Response {
    let session = match read_session(&jar) {
        Some(session) => session,
        None => return unauthorized(),
    };

    let ec2 = Ec2Client::from_credentials(&session).await;
    let result = ec2.enable_imdsv2(&id).await;
    match &result {
        Ok(()) => info!(instance_id = %id, "IMDSv2 enforced"),
        Err(e) => {
            error!(error = %format!("{:#}", e), instance_id = %id, "Failed to enforce IMDSv2")
        }
    }

    (StatusCode::OK, Json(mutation_outcome(&result))).into_response()
}

/// Drop the credential session cookie
pub async fn logout(jar: PrivateCookieJar) -> Response {
    let removal = Cookie::build((SESSION_COOKIE_NAME, ""))
        .path("/")
        .max_age(cookie::time::Duration::ZERO)
        .build();

    info!("Session ended");
    (jar.add(removal), StatusCode::NO_CONTENT).into_response()
}

fn read_session(jar: &PrivateCookieJar) -> Option<CredentialSession> {
    jar.get(SESSION_COOKIE_NAME)
        .and_then(|cookie| serde_json::from_str(cookie.value()).ok())
}

fn internal_error(message: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": "No credentials in session, submit the dashboard form first"
        })),
    )
        .into_response()
}
