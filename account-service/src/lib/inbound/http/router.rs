use std::sync::Arc;
use std::time::Duration;

use auth::Authenticator;
use axum::body::Body;
use axum::http::Request;
use axum::http::Response;
use axum::middleware;
use axum::routing::delete;
use axum::routing::get;
use axum::routing::post;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::handlers::assign_role::assign_role;
use super::handlers::authorize_provider::authorize_provider;
use super::handlers::confirm_email::confirm_email;
use super::handlers::create_role::create_role;
use super::handlers::disconnect_provider::disconnect_provider;
use super::handlers::enable_two_factor::enable_two_factor;
use super::handlers::forgot_password::forgot_password;
use super::handlers::list_roles::list_roles;
use super::handlers::list_user_roles::list_user_roles;
use super::handlers::login::login;
use super::handlers::oauth_callback::oauth_callback;
use super::handlers::provider_status::provider_status;
use super::handlers::register::register;
use super::handlers::resend_confirmation::resend_confirmation;
use super::handlers::reset_password::reset_password;
use super::handlers::revoke_role::revoke_role;
use super::middleware::authenticate as auth_middleware;
use crate::domain::account::ports::AccountServicePort;
use crate::domain::oauth::ports::OAuthServicePort;
use crate::domain::role::ports::RoleServicePort;

#[derive(Clone)]
pub struct AppState {
    pub account_service: Arc<dyn AccountServicePort>,
    pub role_service: Arc<dyn RoleServicePort>,
    pub oauth_service: Arc<dyn OAuthServicePort>,
    pub authenticator: Arc<Authenticator>,
}

pub fn create_router(
    account_service: Arc<dyn AccountServicePort>,
    role_service: Arc<dyn RoleServicePort>,
    oauth_service: Arc<dyn OAuthServicePort>,
    authenticator: Arc<Authenticator>,
) -> Router {
    let state = AppState {
        account_service,
        role_service,
        oauth_service,
        authenticator,
    };

    let public_routes = Router::new()
        .route("/api/account/register", post(register))
        .route("/api/account/confirm-email", post(confirm_email))
        .route("/api/account/login", post(login))
        .route("/api/account/forgot-password", post(forgot_password))
        .route("/api/account/reset-password", post(reset_password))
        .route(
            "/api/account/resend-confirmation",
            post(resend_confirmation),
        );

    let protected_routes = Router::new()
        .route("/api/account/two-factor", post(enable_two_factor))
        .route("/api/oauth/callback", post(oauth_callback))
        .route("/api/oauth/:provider/authorize", get(authorize_provider))
        .route("/api/oauth/:provider/status", get(provider_status))
        .route("/api/oauth/:provider", delete(disconnect_provider))
        .route("/api/roles", get(list_roles).post(create_role))
        .route("/api/roles/assign", post(assign_role))
        .route("/api/roles/revoke", post(revoke_role))
        .route("/api/users/:user_id/roles", get(list_user_roles))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Headers are left out of the span: they carry bearer tokens.
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri().path(),
                version = ?request.version(),
            )
        })
        .on_request(|request: &Request<Body>, _span: &Span| {
            tracing::info!(
                method = %request.method(),
                path = %request.uri().path(),
                "Request started"
            );
        })
        .on_response(
            |response: &Response<Body>, latency: Duration, _span: &Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis(),
                    "Request completed"
                );
            },
        );

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(
            ServiceBuilder::new()
                .layer(trace_layer)
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
