//! HTTP boundary: every GET and POST goes through the resolver.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, Request, State};
use axum::http::{Method, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Router};
use folio_core::{render_content, Indexer, Intent, Resolution, Resolver};
use serde::Deserialize;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tower_http::trace::TraceLayer;

use crate::html::{layout, HtmlRenderer};

pub struct AppState {
    resolver: Resolver,
    renderer: HtmlRenderer,
}

impl AppState {
    pub fn new(indexer: Arc<Indexer>) -> Arc<Self> {
        Arc::new(Self {
            renderer: HtmlRenderer::new(Arc::clone(&indexer)),
            resolver: Resolver::new(indexer),
        })
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(get_page).post(post_page))
        .route("/*path", get(get_page).post(post_page))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct WriteForm {
    content: Option<String>,
}

async fn get_page(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
    request: Request,
) -> Response {
    let path = request.uri().path().to_string();
    let resolution = state.resolver.resolve(&path, Intent::from_query(&query)).await;
    respond(&state, resolution, Method::GET, &path, Some(request)).await
}

async fn post_page(State(state): State<Arc<AppState>>, uri: Uri, form: Option<Form<WriteForm>>) -> Response {
    let content = form.and_then(|Form(f)| f.content);
    let outcome = state.resolver.write(uri.path(), content).await;
    // The index update finishes on its own; the response does not wait for it.
    drop(outcome.index_update);
    respond(&state, outcome.resolution, Method::POST, uri.path(), None).await
}

async fn respond(
    state: &AppState,
    resolution: Resolution,
    method: Method,
    path: &str,
    request: Option<Request>,
) -> Response {
    match resolution {
        Resolution::Page(page) => match render_content(&state.renderer, &page).await {
            Ok(content) => {
                let status = if page.is_not_found() {
                    StatusCode::NOT_FOUND
                } else {
                    StatusCode::OK
                };
                (status, Html(layout(&page, &content))).into_response()
            }
            Err(e) => {
                tracing::debug!(route = %page.route, error = %e, "render failed");
                not_handled(&method, path)
            }
        },
        Resolution::Redirect(location) => Redirect::to(&location).into_response(),
        Resolution::Raw(file) => match request {
            Some(request) => match ServeFile::new(&file).oneshot(request).await {
                Ok(res) => res.into_response(),
                Err(never) => match never {},
            },
            None => not_handled(&method, path),
        },
        Resolution::NotHandled => not_handled(&method, path),
    }
}

fn not_handled(method: &Method, path: &str) -> Response {
    (StatusCode::NOT_FOUND, format!("Cannot {method} {path}")).into_response()
}
