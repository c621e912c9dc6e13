use axum::extract::extractor_middleware;
use axum::routing::{get, post, put};
use axum::Router;

use crate::auth::AuthenticatedUser;
use crate::controllers::{blobs, files, health_check, query, statements, transactions, volumes};

pub fn routes() -> Router {
    let protected = Router::new()
        .route(
            "/statements",
            get(statements::index).post(statements::create),
        )
        .route("/statements/:handle", get(statements::show))
        .route("/statements/query", post(statements::query))
        .route("/statements/transaction", post(transactions::submit))
        .route("/query/:target", get(query::get))
        .route(
            "/volumes/:reference",
            put(volumes::create).delete(volumes::delete).get(volumes::show),
        )
        .route("/volumes", get(volumes::index))
        .route(
            "/volumes/:reference/files",
            get(files::index).post(files::mutate),
        )
        .route("/volumes/:reference/files/:path", get(files::show))
        .route("/blobs/new", post(blobs::create))
        .route("/blobs/:digest", get(blobs::show))
        .route("/blobs", get(blobs::index))
        .layer(extractor_middleware::<AuthenticatedUser>());

    Router::new()
        .route("/health_check", get(health_check::show))
        .merge(protected)
}
