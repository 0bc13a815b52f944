//! HTTP front end.
//!
//! A single `GET /` route: with a query it dispatches to the orchestrator and
//! answers with the JSON envelope, without one it serves a short usage page.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::app::{self, AppContext};

const INDEX: &str = r#"<!DOCTYPE html>
<html lang="zh-CN">
<head><meta charset="utf-8"><title>ptgen</title></head>
<body>
<h1>ptgen</h1>
<p>Generate BBCode descriptions from douban, imdb, bangumi, steam, indienova and epic.</p>
<ul>
<li><code>/?url=https://movie.douban.com/subject/1292052/</code></li>
<li><code>/?site=imdb&amp;sid=tt0111161</code></li>
<li><code>/?search=肖申克&amp;source=douban</code></li>
</ul>
</body>
</html>
"#;

pub fn router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/", get(dispatch))
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        )
        .with_state(ctx)
}

async fn dispatch(State(ctx): State<Arc<AppContext>>, uri: Uri) -> Response {
    if uri.query().is_none_or(str::is_empty) {
        return Html(INDEX).into_response();
    }

    let target = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let reply = app::handle(&ctx, target).await;
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::OK);

    (
        status,
        [(header::CONTENT_TYPE, "application/json; charset=utf-8")],
        reply.body,
    )
        .into_response()
}

/// Bind and serve until the process is stopped.
pub async fn serve(ctx: Arc<AppContext>, bind: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router(ctx)).await?;
    Ok(())
}
