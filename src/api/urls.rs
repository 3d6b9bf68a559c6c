use axum::routing::get;

use crate::{
    api::{
        graphql::GraphQLView,
        health,
        routes::{RouteError, RouteTable, SecurityPolicy},
    },
    infrastructure::config::GraphQLConfig,
    schema::KakiSchema,
};

/// Site route table. `/graphql` skips the CSRF check so cross-origin clients can
/// post queries without a token; login is only enforced when configured.
pub fn urlpatterns(schema: KakiSchema, config: &GraphQLConfig) -> Result<RouteTable, RouteError> {
    let view = GraphQLView::new(schema, config.graphiql)
        .max_body_bytes(config.max_body_bytes)
        .into_method_router();

    let mut graphql_policies = vec![SecurityPolicy::CsrfExempt];
    if config.require_login {
        graphql_policies.push(SecurityPolicy::LoginRequired);
    }

    RouteTable::new()
        .path("graphql", view, &graphql_policies)?
        .path("api/health", get(health::healthcheck), &[])
}
