use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    routing::post,
    Extension, Router,
};
use kaki_backend::{
    api::{
        graphql::GraphQLView,
        routes::{RouteTable, SecurityPolicy},
    },
    infrastructure::{auth::issue_token, config::CsrfConfig},
    schema::build_schema,
};
use serde_json::{json, Value};


use test_harness::{build_app, send};

async fn accepted() -> &'static str {
    "accepted"
}

fn typename_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "query": "{ __typename }" }).to_string()))
        .expect("failed to build request")
}

/// The same view mounted twice: once exempt, once behind the CSRF check.
fn exempt_and_protected() -> Result<Router> {
    let app = build_app(|_| {})?;
    let schema = build_schema(Arc::clone(&app.state.repository));
    let router = RouteTable::new()
        .path(
            "graphql",
            GraphQLView::as_view(true, schema.clone()),
            &[SecurityPolicy::CsrfExempt],
        )?
        .path("protected/graphql", GraphQLView::as_view(true, schema), &[])?
        .path("protected/form", post(accepted), &[])?
        .into_router(Arc::new(CsrfConfig::default()));
    Ok(router)
}

#[tokio::test]
async fn protected_route_rejects_post_without_token() -> Result<()> {
    let router = exempt_and_protected()?;

    let exempt = send(&router, typename_request("/graphql")).await?;
    let protected = send(&router, typename_request("/protected/graphql")).await?;

    assert_eq!(exempt.status, StatusCode::OK);
    assert_eq!(protected.status, StatusCode::FORBIDDEN);
    assert_eq!(
        protected.json()?,
        json!({ "error": "csrf_failed", "reason": "CSRF cookie not set" })
    );
    Ok(())
}

#[tokio::test]
async fn protected_route_accepts_matching_token() -> Result<()> {
    let router = exempt_and_protected()?;

    let mismatched = send(
        &router,
        Request::builder()
            .method(Method::POST)
            .uri("/protected/form")
            .header(header::COOKIE, "csrftoken=abc123")
            .header("x-csrftoken", "zzz999")
            .body(Body::empty())?,
    )
    .await?;
    assert_eq!(mismatched.status, StatusCode::FORBIDDEN);

    let matching = send(
        &router,
        Request::builder()
            .method(Method::POST)
            .uri("/protected/form")
            .header(header::COOKIE, "csrftoken=abc123")
            .header("x-csrftoken", "abc123")
            .body(Body::empty())?,
    )
    .await?;
    assert_eq!(matching.status, StatusCode::OK);
    assert_eq!(matching.text(), "accepted");
    Ok(())
}

#[tokio::test]
async fn safe_requests_on_protected_routes_receive_a_token_cookie() -> Result<()> {
    let router = exempt_and_protected()?;

    let response = send(
        &router,
        Request::builder()
            .uri("/protected/graphql?query=%7B__typename%7D")
            .body(Body::empty())?,
    )
    .await?;

    assert_eq!(response.status, StatusCode::OK);
    let cookie = response
        .headers
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(cookie.starts_with("csrftoken="));
    Ok(())
}

#[tokio::test]
async fn exempt_route_sets_no_cookie() -> Result<()> {
    let router = exempt_and_protected()?;

    let response = send(
        &router,
        Request::builder()
            .uri("/graphql?query=%7B__typename%7D")
            .body(Body::empty())?,
    )
    .await?;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.headers.get(header::SET_COOKIE).is_none());
    Ok(())
}

#[tokio::test]
async fn health_route_reports_ok() -> Result<()> {
    let app = build_app(|_| {})?;

    let response = send(
        &app.router,
        Request::builder().uri("/api/health").body(Body::empty())?,
    )
    .await?;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()?, json!({ "status": "ok" }));
    Ok(())
}

#[tokio::test]
async fn login_required_graphql_needs_bearer_token() -> Result<()> {
    let app = build_app(|config| config.graphql.require_login = true)?;

    let anonymous = send(&app.router, typename_request("/graphql")).await?;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        anonymous.json()?,
        json!({ "error": "missing authorization header" })
    );

    let token = issue_token(&app.state, "hana")?;
    let enroll = Request::builder()
        .method(Method::POST)
        .uri("/graphql")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(
            json!({
                "query": "mutation { enrollCategory(username: \"hana\", category: \"N5\", start: \"2024-01-01\") { ok studyItems { id } } }"
            })
            .to_string(),
        ))?;
    let enrolled = send(&app.router, enroll).await?;
    assert_eq!(enrolled.status, StatusCode::OK);
    assert_eq!(
        enrolled.json()?["data"]["enrollCategory"]["studyItems"]
            .as_array()
            .map(Vec::len),
        Some(2)
    );

    // No username argument: the signed-in user is used.
    let mine = Request::builder()
        .method(Method::POST)
        .uri("/graphql")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(
            json!({
                "query": "{ dueStudyItems(on: \"2024-01-01\") { username item { tango } } }"
            })
            .to_string(),
        ))?;
    let due = send(&app.router, mine).await?;
    let body: Value = due.json()?;
    assert_eq!(
        body["data"]["dueStudyItems"],
        json!([
            { "username": "hana", "item": { "tango": "猫" } },
            { "username": "hana", "item": { "tango": "犬" } }
        ])
    );
    Ok(())
}

#[tokio::test]
async fn login_required_route_without_app_state_is_unauthorized() -> Result<()> {
    let app = build_app(|_| {})?;
    let schema = build_schema(Arc::clone(&app.state.repository));
    let router = RouteTable::new()
        .path(
            "graphql",
            GraphQLView::as_view(false, schema),
            &[SecurityPolicy::CsrfExempt, SecurityPolicy::LoginRequired],
        )?
        .into_router(Arc::new(CsrfConfig::default()));

    let response = send(&router, typename_request("/graphql")).await?;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let with_state = router.layer(Extension(Arc::clone(&app.state)));
    let token = issue_token(&app.state, "taro")?;
    let mut request = typename_request("/graphql");
    request
        .headers_mut()
        .insert(header::AUTHORIZATION, format!("Bearer {token}").parse()?);
    let response = send(&with_state, request).await?;
    assert_eq!(response.status, StatusCode::OK);
    Ok(())
}
