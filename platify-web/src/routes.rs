use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use minijinja::context;
use serde::Serialize;
use tower_http::{
    compression::CompressionLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::{
    errors::{ApiResult, UploadError},
    ingest::MAX_UPLOAD_BYTES,
    state::AppState,
    templates,
    upstream::ResourceKind,
};

/// Multipart field carrying the uploaded image.
pub const IMAGE_FIELD: &str = "image";

pub const UPLOAD_PATH: &str = "/api/images/upload";

pub fn router(state: AppState) -> Router {
    let config = state.config.clone();
    let mut app = Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/recipes/editor", get(recipe_editor))
        .route("/recipes/:id", get(recipe))
        .route("/products", get(products))
        .route("/products/:id", get(product))
        .route_service("/privacy-policy", ServeFile::new(&config.privacy_policy_path))
        .route(
            UPLOAD_PATH,
            post(upload_image).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .nest_service("/static", ServeDir::new(&config.static_dir));

    // Design previews from local fixtures, never in release builds
    if !config.release_mode {
        app = app
            .route("/recipes/_example", get(example_recipe))
            .route("/products/_example", get(example_product));
        tracing::info!(
            fixtures = %state.fixtures.dir().display(),
            "Dev routes registered: GET /recipes/_example, GET /products/_example"
        );
    }

    app.layer(CompressionLayer::new().quality(tower_http::CompressionLevel::Fastest))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn home(State(state): State<AppState>) -> Response {
    state.pages.render_page(templates::HOME, context! {})
}

// Just reply that everything is okay
async fn health() -> StatusCode {
    StatusCode::OK
}

async fn recipe_editor(State(state): State<AppState>) -> Response {
    state.pages.render_page(
        templates::RECIPE_EDITOR,
        context! { upload_url => UPLOAD_PATH, image_field => IMAGE_FIELD },
    )
}

async fn recipe(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let fetched = state.upstream.fetch_recipe(&id).await;
    state
        .pages
        .render_fetched(ResourceKind::Recipe, &id, fetched, templates::RECIPE, "recipe")
}

async fn product(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let fetched = state.upstream.fetch_product(&id).await;
    state
        .pages
        .render_fetched(ResourceKind::Product, &id, fetched, templates::PRODUCT, "product")
}

async fn products(State(state): State<AppState>) -> Response {
    let fetched = state.upstream.fetch_products().await;
    state.pages.render_fetched(
        ResourceKind::ProductList,
        "*",
        fetched,
        templates::PRODUCTS,
        "products",
    )
}

async fn example_recipe(State(state): State<AppState>) -> Response {
    let fetched = state.fixtures.recipe().await;
    state
        .pages
        .render_fetched(ResourceKind::Recipe, "_example", fetched, templates::RECIPE, "recipe")
}

async fn example_product(State(state): State<AppState>) -> Response {
    let fetched = state.fixtures.product().await;
    state
        .pages
        .render_fetched(ResourceKind::Product, "_example", fetched, templates::PRODUCT, "product")
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    url: String,
}

/// Store the `image` field of a multipart upload and return its public URL.
async fn upload_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<UploadResponse>> {
    let mut multipart = multipart?;
    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let url = state.images.ingest(&mut field).await?;
        return Ok(Json(UploadResponse { url }));
    }
    Err(UploadError::MissingImage)
}
