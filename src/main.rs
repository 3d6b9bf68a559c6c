use std::net::SocketAddr;
use std::sync::Arc;

use axum::{serve, Extension};
use dotenvy::dotenv;
use kaki_backend::{
    api,
    infrastructure::{config::Config, repository, state::AppState},
    schema, telemetry,
};
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let config = Arc::new(Config::from_env()?);
    telemetry::init(config.app.log_format);

    let repository = repository::build_repository(&config.vocabulary)?;
    let state = Arc::new(AppState::new(Arc::clone(&config), repository));
    let schema = schema::build_schema(Arc::clone(&state.repository));

    let router = api::build_router(Arc::clone(&config), schema)?.layer(Extension(state));

    let addr: SocketAddr = config.bind_address().parse()?;
    info!(
        %addr,
        graphiql = config.graphql.graphiql,
        require_login = config.graphql.require_login,
        "starting kaki api"
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let server = serve(listener, router.into_make_service());

    tokio::select! {
        res = server => {
            if let Err(err) = res {
                warn!(error = ?err, "server exited with error");
            }
        }
        _ = shutdown_signal() => {
            info!("shutdown signal received");
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = ?err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = ?err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
