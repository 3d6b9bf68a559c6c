//! Route table with per-route security policies.
//!
//! Every binding goes through the CSRF check unless it carries
//! [`SecurityPolicy::CsrfExempt`]. [`SecurityPolicy::LoginRequired`] adds a
//! bearer-token check in front of the handler.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request},
    middleware::{self, Next},
    response::Response,
    routing::MethodRouter,
    Router,
};
use thiserror::Error;
use tracing::info;

use crate::{
    api::csrf::csrf_protect,
    infrastructure::{
        auth::{AuthError, AuthenticatedUser},
        config::CsrfConfig,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityPolicy {
    CsrfExempt,
    LoginRequired,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("path {0} is already bound")]
    DuplicatePath(String),
    #[error("invalid route pattern: {0:?}")]
    InvalidPattern(String),
}

pub struct RouteBinding {
    path: String,
    handler: MethodRouter,
    policies: Vec<SecurityPolicy>,
}

impl RouteBinding {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn policies(&self) -> &[SecurityPolicy] {
        &self.policies
    }

    pub fn has_policy(&self, policy: SecurityPolicy) -> bool {
        self.policies.contains(&policy)
    }
}

#[derive(Default)]
pub struct RouteTable {
    bindings: Vec<RouteBinding>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `pattern` to `handler`. The pattern is relative to the site root,
    /// so `graphql` and `/graphql` name the same route.
    pub fn path(
        mut self,
        pattern: &str,
        handler: MethodRouter,
        policies: &[SecurityPolicy],
    ) -> Result<Self, RouteError> {
        let path = normalize(pattern)?;
        if self.binding(&path).is_some() {
            return Err(RouteError::DuplicatePath(path));
        }
        let mut policies = policies.to_vec();
        policies.dedup();
        self.bindings.push(RouteBinding {
            path,
            handler,
            policies,
        });
        Ok(self)
    }

    pub fn binding(&self, pattern: &str) -> Option<&RouteBinding> {
        let path = normalize(pattern).ok()?;
        self.bindings.iter().find(|binding| binding.path == path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|binding| binding.path.as_str())
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn into_router(self, csrf: Arc<CsrfConfig>) -> Router {
        self.bindings
            .into_iter()
            .fold(Router::new(), |router, binding| {
                info!(
                    path = %binding.path,
                    policies = ?binding.policies,
                    "registering route"
                );
                let mut route = Router::new().route(&binding.path, binding.handler);
                if !binding.policies.contains(&SecurityPolicy::CsrfExempt) {
                    route = route.route_layer(middleware::from_fn_with_state(
                        Arc::clone(&csrf),
                        csrf_protect,
                    ));
                }
                if binding.policies.contains(&SecurityPolicy::LoginRequired) {
                    route = route.route_layer(middleware::from_fn(require_authenticated_user));
                }
                router.merge(route)
            })
    }
}

fn normalize(pattern: &str) -> Result<String, RouteError> {
    let trimmed = pattern.trim_start_matches('/');
    let invalid = trimmed.contains("//")
        || trimmed.chars().any(|c| c.is_whitespace() || c == '?' || c == '#');
    if invalid {
        return Err(RouteError::InvalidPattern(pattern.to_string()));
    }
    Ok(format!("/{trimmed}"))
}

/// Rejects requests without a valid bearer token and hands the user to the handler.
pub async fn require_authenticated_user(
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let (mut parts, body) = request.into_parts();
    let user = AuthenticatedUser::from_request_parts(&mut parts, &()).await?;
    parts.extensions.insert(user);
    let request = Request::from_parts(parts, body);
    Ok(next.run(request).await)
}
