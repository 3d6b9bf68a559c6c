//! GraphQL view: executes queries against a schema and optionally serves GraphiQL.

use std::sync::Arc;

use async_graphql::{
    http::GraphiQLSource,
    parser::{parse_query, types::OperationType},
    Executor, Value, Variables,
};
use axum::{
    body::{to_bytes, Body},
    extract::{OriginalUri, Request},
    http::{header, request::Parts, HeaderValue, Method, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, MethodRouter},
    Json,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::{infrastructure::auth::AuthenticatedUser, schema::Viewer};

const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ViewError {
    #[error("Must provide query string.")]
    MissingQuery,
    #[error("Variables are invalid JSON.")]
    InvalidVariables,
    #[error("Query parameters are malformed.")]
    InvalidParameters,
    #[error("POST body sent invalid JSON.")]
    InvalidJson,
    #[error("Request body is not valid UTF-8.")]
    InvalidEncoding,
    #[error("Request body exceeds {0} bytes.")]
    PayloadTooLarge(usize),
    #[error("Can only perform a {0} operation from a POST request.")]
    MutationOverGet(&'static str),
}

impl IntoResponse for ViewError {
    fn into_response(self) -> Response {
        let status = match self {
            ViewError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ViewError::MutationOverGet(_) => StatusCode::METHOD_NOT_ALLOWED,
            _ => StatusCode::BAD_REQUEST,
        };
        let body = Json(serde_json::json!({ "errors": [{ "message": self.to_string() }] }));
        let mut response = (status, body).into_response();
        if status == StatusCode::METHOD_NOT_ALLOWED {
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static("POST"));
        }
        response
    }
}

/// Request handler bound to one schema.
pub struct GraphQLView<E> {
    schema: E,
    graphiql: bool,
    max_body_bytes: usize,
}

impl<E: Executor> GraphQLView<E> {
    pub fn new(schema: E, graphiql: bool) -> Self {
        Self {
            schema,
            graphiql,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Builds a `GET`/`POST` handler around `schema`.
    pub fn as_view(graphiql: bool, schema: E) -> MethodRouter {
        Self::new(schema, graphiql).into_method_router()
    }

    pub fn into_method_router(self) -> MethodRouter {
        let view = Arc::new(self);
        let handler = move |request: Request| {
            let view = Arc::clone(&view);
            async move { view.dispatch(request).await }
        };
        get(handler.clone()).post(handler)
    }

    async fn dispatch(&self, request: Request) -> Response {
        let (parts, body) = request.into_parts();

        if self.graphiql && parts.method == Method::GET && wants_graphiql(&parts) {
            let endpoint = parts
                .extensions
                .get::<OriginalUri>()
                .map(|uri| uri.0.path().to_string())
                .unwrap_or_else(|| parts.uri.path().to_string());
            return Html(GraphiQLSource::build().endpoint(&endpoint).finish()).into_response();
        }

        let request = match self.read_request(&parts, body).await {
            Ok(request) => request,
            Err(err) => return err.into_response(),
        };

        if parts.method == Method::GET {
            if let Some(kind) = non_query_operation(&request) {
                return ViewError::MutationOverGet(kind).into_response();
            }
        }

        let viewer = Viewer(
            parts
                .extensions
                .get::<AuthenticatedUser>()
                .map(|user| user.username.clone()),
        );
        debug!(operation = ?request.operation_name, "executing graphql request");
        let response = self.schema.execute(request.data(viewer)).await;

        // Errors without a path come from parsing or validation, before any resolver ran.
        let rejected = response.data == Value::Null
            && !response.errors.is_empty()
            && response.errors.iter().all(|err| err.path.is_empty());
        let status = if rejected {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::OK
        };
        (status, Json(response)).into_response()
    }

    async fn read_request(
        &self,
        parts: &Parts,
        body: Body,
    ) -> Result<async_graphql::Request, ViewError> {
        let url_params = QueryParams::parse(parts.uri.query().unwrap_or_default())?;
        let request = if parts.method == Method::GET {
            url_params.fill(async_graphql::Request::new(""))?
        } else {
            let bytes = to_bytes(body, self.max_body_bytes)
                .await
                .map_err(|_| ViewError::PayloadTooLarge(self.max_body_bytes))?;
            let from_body = match content_type(parts).as_str() {
                "application/graphql" => {
                    let query =
                        String::from_utf8(bytes.to_vec()).map_err(|_| ViewError::InvalidEncoding)?;
                    async_graphql::Request::new(query)
                }
                "application/x-www-form-urlencoded" => {
                    let raw =
                        std::str::from_utf8(&bytes).map_err(|_| ViewError::InvalidEncoding)?;
                    from_query_string(raw)?
                }
                _ if bytes.iter().all(u8::is_ascii_whitespace) => async_graphql::Request::new(""),
                _ => serde_json::from_slice(&bytes).map_err(|_| ViewError::InvalidJson)?,
            };
            // The URL supplies whatever the body left out.
            url_params.fill(from_body)?
        };

        if request.query.trim().is_empty() {
            return Err(ViewError::MissingQuery);
        }
        Ok(request)
    }
}

/// `query`, `operationName` and `variables` as sent in a URL or a form body.
#[derive(Debug, Default, Deserialize)]
struct QueryParams {
    query: Option<String>,
    #[serde(rename = "operationName")]
    operation_name: Option<String>,
    variables: Option<String>,
}

impl QueryParams {
    fn parse(raw: &str) -> Result<Self, ViewError> {
        serde_urlencoded::from_str(raw).map_err(|_| ViewError::InvalidParameters)
    }

    /// Copies each parameter into `request` where it has none.
    fn fill(
        self,
        mut request: async_graphql::Request,
    ) -> Result<async_graphql::Request, ViewError> {
        if request.query.trim().is_empty() {
            if let Some(query) = self.query {
                request.query = query;
            }
        }
        if request.operation_name.is_none() {
            request.operation_name = self.operation_name.filter(|name| !name.is_empty());
        }
        if request.variables.is_empty() {
            if let Some(raw) = self.variables.filter(|raw| !raw.trim().is_empty()) {
                let value: serde_json::Value =
                    serde_json::from_str(&raw).map_err(|_| ViewError::InvalidVariables)?;
                if !(value.is_object() || value.is_null()) {
                    return Err(ViewError::InvalidVariables);
                }
                request.variables = Variables::from_json(value);
            }
        }
        Ok(request)
    }
}

fn from_query_string(raw: &str) -> Result<async_graphql::Request, ViewError> {
    QueryParams::parse(raw)?.fill(async_graphql::Request::new(""))
}

fn content_type(parts: &Parts) -> String {
    parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_ascii_lowercase())
        .unwrap_or_default()
}

/// Browsers asking for HTML get the console unless `?raw` is set.
fn wants_graphiql(parts: &Parts) -> bool {
    let raw = parts
        .uri
        .query()
        .map(|q| q.split('&').any(|pair| pair == "raw" || pair.starts_with("raw=")))
        .unwrap_or(false);
    let accepts_html = parts
        .headers
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.contains("text/html"));
    accepts_html && !raw
}

/// Name of the operation kind when the selected operation is not a query.
/// Unparseable documents return `None` and are reported by execution.
fn non_query_operation(request: &async_graphql::Request) -> Option<&'static str> {
    let document = parse_query(&request.query).ok()?;
    let wanted = request.operation_name.as_deref();
    document
        .operations
        .iter()
        .find(|(name, _)| match wanted {
            Some(wanted) => name.map(|n| n.as_str()) == Some(wanted),
            None => true,
        })
        .and_then(|(_, operation)| match operation.node.ty {
            OperationType::Query => None,
            OperationType::Mutation => Some("mutation"),
            OperationType::Subscription => Some("subscription"),
        })
}
