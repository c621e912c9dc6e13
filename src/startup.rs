use std::future::Future;
use std::net::TcpListener;

use axum::AddExtensionLayer;
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tower::limit::ConcurrencyLimitLayer;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::DatabaseSettings;
use crate::context::AppContext;
use crate::cors::cors_layer;
use crate::routes::routes;
use crate::shutdown;

/// Builds the full router with its ambient layers, given an already
/// constructed `AppContext`. Split out from `run` so the test harness can
/// drive it directly with `tower::ServiceExt::oneshot` without binding a
/// socket.
pub fn app(ctx: AppContext) -> Router {
    routes().layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(ConcurrencyLimitLayer::new(64))
            .layer(cors_layer())
            .layer(AddExtensionLayer::new(ctx)),
    )
}

pub fn run(
    listener: TcpListener,
    ctx: AppContext,
) -> anyhow::Result<impl Future<Output = Result<(), hyper::Error>>> {
    let server = axum::Server::from_tcp(listener)?
        .serve(app(ctx).into_make_service())
        .with_graceful_shutdown(shutdown::signal());

    Ok(server)
}

pub async fn connect_to_postgres(db_settings: &DatabaseSettings) -> PgPool {
    PgPoolOptions::new()
        .min_connections(1)
        .connect(&db_settings.url())
        .await
        .expect("Failed to connect to postgres")
}
