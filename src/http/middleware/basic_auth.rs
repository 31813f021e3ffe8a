//! Basic authentication stage.
//!
//! Verifies `Authorization: Basic <base64(user:pass)>` against the route's
//! credentials. Failures short-circuit with 401 and a challenge; the next
//! stage is only called for authorized requests.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{
        header::{AUTHORIZATION, WWW_AUTHENTICATE},
        HeaderMap, HeaderValue, Request, StatusCode,
    },
    response::IntoResponse,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::config::BasicAuthConfig;
use crate::http::middleware::{
    Handler, Middleware, PipelineError, RequestContext, ResponseSink, SharedHandler,
};

struct Credentials {
    username: String,
    password: String,
    challenge: HeaderValue,
}

/// Middleware requiring HTTP basic authentication.
#[derive(Clone)]
pub struct BasicAuth {
    credentials: Arc<Credentials>,
}

impl BasicAuth {
    pub fn new(config: &BasicAuthConfig) -> Self {
        let realm = config.realm.replace('\\', "\\\\").replace('"', "\\\"");
        let challenge =
            HeaderValue::from_str(&format!("Basic realm=\"{realm}\", charset=\"UTF-8\""))
                .unwrap_or_else(|_| HeaderValue::from_static("Basic"));

        Self {
            credentials: Arc::new(Credentials {
                username: config.username.clone(),
                password: config.password.clone(),
                challenge,
            }),
        }
    }
}

impl Middleware for BasicAuth {
    fn name(&self) -> &'static str {
        "basic_auth"
    }

    fn wrap(&self, next: SharedHandler) -> SharedHandler {
        Arc::new(BasicAuthHandler {
            credentials: self.credentials.clone(),
            next,
        })
    }
}

struct BasicAuthHandler {
    credentials: Arc<Credentials>,
    next: SharedHandler,
}

impl BasicAuthHandler {
    fn authorized(&self, headers: &HeaderMap) -> bool {
        let Some((username, password)) = decode_credentials(headers) else {
            return false;
        };
        // Non-short-circuiting so both comparisons always run.
        constant_time_eq(username.as_bytes(), self.credentials.username.as_bytes())
            & constant_time_eq(password.as_bytes(), self.credentials.password.as_bytes())
    }
}

#[async_trait]
impl Handler for BasicAuthHandler {
    async fn handle(
        &self,
        ctx: &RequestContext,
        sink: &mut ResponseSink,
        request: Request<Body>,
    ) -> Result<(), PipelineError> {
        if self.authorized(request.headers()) {
            return self.next.handle(ctx, sink, request).await;
        }

        tracing::warn!(
            request_id = %ctx.request_id,
            route = %ctx.route.path,
            "Basic authentication failed"
        );
        sink.commit(
            (
                StatusCode::UNAUTHORIZED,
                [(WWW_AUTHENTICATE, self.credentials.challenge.clone())],
                "Unauthorized",
            )
                .into_response(),
        )
    }
}

/// Extract `(username, password)` from a Basic `Authorization` header.
fn decode_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = String::from_utf8(STANDARD.decode(encoded.trim()).ok()?).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
