use axum::extract::{Path, Request, State};
use axum::http::header::SET_COOKIE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use tracing::debug;
use vigil_dns_application::ports::PasswordResult;
use vigil_dns_domain::Session;

use crate::auth::middleware::{
    authenticate, delete_cookie, now_secs, session_cookie, AuthContext, AuthVerdict,
};
use crate::auth::totp::verify_totp;
use crate::dto::{
    LoginRequest, SessionInfo, SessionListEntry, SessionListResponse, SessionResponse,
    SessionTlsInfo,
};
use crate::errors::{ApiError, RequestTimer};
use crate::state::AppState;

fn session_info(session: Option<&Session>, totp_configured: bool, now: i64) -> SessionInfo {
    match session {
        Some(s) => SessionInfo {
            valid: true,
            totp: totp_configured,
            sid: Some(s.sid.clone()),
            csrf: Some(s.csrf.clone()),
            validity: s.valid_until - now,
        },
        None => SessionInfo {
            valid: false,
            totp: totp_configured,
            sid: None,
            csrf: None,
            validity: -1,
        },
    }
}

fn no_session_info(valid: bool, totp_configured: bool) -> SessionInfo {
    SessionInfo {
        valid,
        totp: totp_configured,
        sid: None,
        csrf: None,
        validity: -1,
    }
}

/// The shared tail of every auth endpoint: report the session state with the
/// status code and cookie the verdict calls for.
fn auth_status_response(
    state: &AppState,
    verdict: &AuthVerdict,
    logout: bool,
    timer: &RequestTimer,
) -> Response {
    let cfg = state.config.load();
    let totp_configured = !cfg.api.totp_secret.is_empty();
    let now = now_secs();

    match verdict {
        AuthVerdict::Localhost | AuthVerdict::EmptyPassword => {
            debug!("Auth status: OK (no authentication needed)");
            Json(SessionResponse {
                session: no_session_info(true, totp_configured),
                took: timer.took(),
            })
            .into_response()
        }
        AuthVerdict::Session { slot, .. } if logout => {
            debug!(slot, "Auth status: logout, deleting session");
            state.sessions.logout(*slot);
            let mut response = (
                StatusCode::GONE,
                Json(SessionResponse {
                    session: no_session_info(false, totp_configured),
                    took: timer.took(),
                }),
            )
                .into_response();
            response.headers_mut().insert(SET_COOKIE, delete_cookie());
            response
        }
        AuthVerdict::Session { session, .. } => {
            debug!("Auth status: OK");
            let mut response = Json(SessionResponse {
                session: session_info(Some(session), totp_configured, now),
                took: timer.took(),
            })
            .into_response();
            response.headers_mut().insert(
                SET_COOKIE,
                session_cookie(&session.sid, cfg.api.session_timeout, session.tls.login),
            );
            response
        }
        AuthVerdict::Unauthorized => {
            debug!("Auth status: invalid, deleting cookie");
            let mut response = (
                StatusCode::UNAUTHORIZED,
                Json(SessionResponse {
                    session: no_session_info(false, totp_configured),
                    took: timer.took(),
                }),
            )
                .into_response();
            response.headers_mut().insert(SET_COOKIE, delete_cookie());
            response
        }
    }
}

/// POST /api/auth — login with `{password, totp?}` or HTTP Basic.
pub async fn login(State(state): State<AppState>, req: Request) -> Response {
    let timer = RequestTimer::now();
    let (_req, ctx) = authenticate(&state, req, false).await;
    let cfg = state.config.load();
    let now = now_secs();
    let empty_password = cfg.api.pwhash.is_empty();

    let body: LoginRequest = if ctx.body.is_empty() {
        LoginRequest::default()
    } else {
        match serde_json::from_slice(&ctx.body) {
            Ok(body) => body,
            Err(e) => {
                return ApiError::bad_request("Invalid request body data (no valid JSON)")
                    .with_hint(e.to_string())
                    .with_timer(&timer)
                    .into_response()
            }
        }
    };

    let mut password = body.password.clone().filter(|p| !p.is_empty());
    if password.is_none() {
        password = ctx.basic_password.clone();
    }

    // An already-valid session needs no password at all.
    if ctx.verdict.is_authorized() && password.is_none() {
        return auth_status_response(&state, &ctx.verdict, false, &timer);
    }
    if password.is_none() && !empty_password {
        return auth_status_response(&state, &ctx.verdict, false, &timer);
    }

    let result = match &password {
        None => PasswordResult::Correct, // no password configured, none given
        Some(pw) => state.verifier.verify(pw, &ctx.remote_addr, now),
    };

    match result {
        PasswordResult::RateLimited => ApiError::new(
            StatusCode::TOO_MANY_REQUESTS,
            "too_many_requests",
            "Too many requests",
        )
        .with_hint("login rate limiting")
        .with_timer(&timer)
        .into_response(),
        PasswordResult::Incorrect => {
            debug!(remote_addr = %ctx.remote_addr, "Login failed: password incorrect");
            auth_status_response(&state, &ctx.verdict, false, &timer)
        }
        correct => {
            // 2FA applies to interactive logins only.
            if !cfg.api.totp_secret.is_empty() && correct != PasswordResult::AppCorrect {
                let Some(code) = body.totp else {
                    return ApiError::bad_request("No 2FA token found in JSON payload")
                        .with_timer(&timer)
                        .into_response();
                };
                if !verify_totp(&cfg.api.totp_secret, code, now) {
                    return ApiError::new(
                        StatusCode::UNAUTHORIZED,
                        "unauthorized",
                        "Invalid 2FA token",
                    )
                    .with_timer(&timer)
                    .into_response();
                }
            }

            match state.sessions.login(
                &ctx.remote_addr,
                &ctx.user_agent,
                ctx.is_tls,
                correct == PasswordResult::AppCorrect,
                now,
                cfg.api.session_timeout,
            ) {
                Ok((slot, session)) => {
                    let verdict = AuthVerdict::Session { slot, session };
                    auth_status_response(&state, &verdict, false, &timer)
                }
                Err(e) => ApiError::from_domain(e, &timer).into_response(),
            }
        }
    }
}

/// GET /api/auth — current session status.
pub async fn status(State(state): State<AppState>, req: Request) -> Response {
    let timer = RequestTimer::now();
    let (_req, ctx) = authenticate(&state, req, false).await;
    auth_status_response(&state, &ctx.verdict, false, &timer)
}

/// DELETE /api/auth — logout; HTTP 410 on success.
pub async fn logout(State(state): State<AppState>, req: Request) -> Response {
    let timer = RequestTimer::now();
    let (_req, ctx) = authenticate(&state, req, false).await;
    auth_status_response(&state, &ctx.verdict, true, &timer)
}

/// GET /api/auth/sessions — list the session table.
pub async fn list_sessions(
    State(state): State<AppState>,
    Extension(timer): Extension<RequestTimer>,
    Extension(ctx): Extension<AuthContext>,
) -> Json<SessionListResponse> {
    let cfg = state.config.load();
    let now = now_secs();
    let current = match &ctx.verdict {
        AuthVerdict::Session { slot, .. } => Some(*slot),
        _ => None,
    };

    let sessions = state
        .sessions
        .list()
        .into_iter()
        .map(|(id, s)| SessionListEntry {
            id,
            current_session: current == Some(id),
            valid: s.valid_until >= now,
            tls: SessionTlsInfo {
                login: s.tls.login,
                mixed: s.tls.mixed,
            },
            login_at: s.login_at,
            last_active: s.valid_until - cfg.api.session_timeout as i64,
            valid_until: s.valid_until,
            remote_addr: s.remote_addr,
            user_agent: s.user_agent,
            app: s.app,
        })
        .collect();

    Json(SessionListResponse {
        sessions,
        took: timer.took(),
    })
}

/// DELETE /api/auth/sessions/{id} — revoke one slot; 204 on success.
pub async fn delete_session(
    State(state): State<AppState>,
    Extension(timer): Extension<RequestTimer>,
    Path(id): Path<usize>,
) -> Response {
    match state.sessions.revoke(id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => ApiError::from_domain(e, &timer).into_response(),
    }
}
