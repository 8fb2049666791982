//! Turns fetch outcomes into complete HTML responses.
//!
//! A page is rendered to a string before any response is built, so the status
//! line always matches the body that follows it and exactly one response is
//! produced per request.

use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use minijinja::context;
use serde::Serialize;

use crate::templates::{self, Templates};
use crate::upstream::{Fetched, ResourceKind};

/// User-facing wording for a resource's not-found and error pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCopy {
    pub not_found_title: &'static str,
    pub not_found_message: &'static str,
    pub error_title: &'static str,
    pub error_message: &'static str,
}

impl ResourceKind {
    pub fn copy(self) -> PageCopy {
        match self {
            ResourceKind::Recipe => PageCopy {
                not_found_title: "Recipe not found",
                not_found_message: "This recipe does not exist or is no longer available.",
                error_title: "Could not load recipe",
                error_message: "The recipe could not be loaded. Please try again later.",
            },
            ResourceKind::Product => PageCopy {
                not_found_title: "Product not found",
                not_found_message: "This product does not exist or is no longer available.",
                error_title: "Could not load product",
                error_message: "The product could not be loaded. Please try again later.",
            },
            ResourceKind::ProductList => PageCopy {
                not_found_title: "No products",
                not_found_message: "The product catalog is not available.",
                error_title: "Could not load products",
                error_message: "The products could not be loaded. Please try again later.",
            },
        }
    }
}

const FALLBACK_BODY: &str = "Internal Server Error";

#[derive(Clone)]
pub struct Pages {
    templates: Templates,
}

impl Pages {
    pub fn new(templates: Templates) -> Self {
        Self { templates }
    }

    /// Map a fetch outcome onto the content, not-found or error page.
    ///
    /// `ctx_key` is the name the record is bound to in `template`.
    pub fn render_fetched<T: Serialize>(
        &self,
        kind: ResourceKind,
        id: &str,
        fetched: Fetched<T>,
        template: &str,
        ctx_key: &str,
    ) -> Response {
        let copy = kind.copy();
        match fetched {
            Fetched::Found(record) => {
                let ctx = BTreeMap::from([(ctx_key, minijinja::Value::from_serialize(&record))]);
                match self.templates.render(template, ctx) {
                    Ok(html) => (StatusCode::OK, Html(html)).into_response(),
                    Err(err) => {
                        tracing::error!(%kind, id, template, error = %format!("{err:#}"), "rendering page failed");
                        self.error_page(copy.error_title, copy.error_message)
                    }
                }
            }
            Fetched::NotFound => {
                tracing::info!(%kind, id, "resource not found upstream");
                self.not_found_page(copy.not_found_title, copy.not_found_message)
            }
            Fetched::TransientError(err) => {
                tracing::error!(%kind, id, error = %err, "fetching resource failed");
                self.error_page(copy.error_title, copy.error_message)
            }
        }
    }

    /// Render a page that needs no upstream data.
    pub fn render_page<S: Serialize>(&self, template: &str, ctx: S) -> Response {
        match self.templates.render(template, ctx) {
            Ok(html) => (StatusCode::OK, Html(html)).into_response(),
            Err(err) => {
                tracing::error!(template, error = %format!("{err:#}"), "rendering page failed");
                self.error_page(
                    "Something went wrong",
                    "This page could not be displayed. Please try again later.",
                )
            }
        }
    }

    pub fn not_found_page(&self, title: &str, message: &str) -> Response {
        self.shared_page(StatusCode::NOT_FOUND, templates::NOT_FOUND, title, message)
    }

    pub fn error_page(&self, title: &str, message: &str) -> Response {
        self.shared_page(StatusCode::INTERNAL_SERVER_ERROR, templates::ERROR, title, message)
    }

    fn shared_page(&self, status: StatusCode, template: &str, title: &str, message: &str) -> Response {
        match self.templates.render(template, context! { title, message }) {
            Ok(html) => (status, Html(html)).into_response(),
            Err(err) => {
                tracing::error!(template, error = %format!("{err:#}"), "rendering fallback page failed");
                (StatusCode::INTERNAL_SERVER_ERROR, FALLBACK_BODY).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::FetchError;
    use axum::body::to_bytes;
    use platify::models::Product;
    use tempfile::TempDir;

    fn pages(overrides: &[(&str, &str)]) -> (TempDir, Pages) {
        let dir = TempDir::new().unwrap();
        let write = |name: &str, source: &str| std::fs::write(dir.path().join(name), source).unwrap();
        for name in [
            templates::HOME,
            templates::RECIPE,
            templates::RECIPE_EDITOR,
            templates::PRODUCT,
            templates::PRODUCTS,
        ] {
            write(name, "page");
        }
        write(templates::PRODUCT, "<h1>{{ product.name }}</h1>");
        write(templates::NOT_FOUND, "404: {{ title }} / {{ message }}");
        write(templates::ERROR, "500: {{ title }} / {{ message }}");
        for (name, source) in overrides {
            write(name, source);
        }
        let templates = Templates::load(dir.path()).unwrap();
        (dir, Pages::new(templates))
    }

    async fn body(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn oats() -> Product {
        serde_json::from_str(r#"{"id": "p1", "name": "Oats & Co"}"#).unwrap()
    }

    #[tokio::test]
    async fn found_renders_content() {
        let (_dir, pages) = pages(&[]);
        let response = pages.render_fetched(
            ResourceKind::Product,
            "p1",
            Fetched::Found(oats()),
            templates::PRODUCT,
            "product",
        );
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body(response).await, "<h1>Oats &amp; Co</h1>");
    }

    #[tokio::test]
    async fn not_found_uses_resource_copy() {
        let (_dir, pages) = pages(&[]);
        let response = pages.render_fetched::<Product>(
            ResourceKind::Product,
            "p1",
            Fetched::NotFound,
            templates::PRODUCT,
            "product",
        );
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body(response).await,
            "404: Product not found / This product does not exist or is no longer available."
        );
    }

    #[tokio::test]
    async fn transient_errors_hide_the_cause() {
        let (_dir, pages) = pages(&[]);
        let response = pages.render_fetched::<Product>(
            ResourceKind::Recipe,
            "r1",
            Fetched::TransientError(FetchError::UnexpectedStatus(StatusCode::BAD_GATEWAY)),
            templates::RECIPE,
            "recipe",
        );
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let html = body(response).await;
        assert!(html.contains("Please try again later."));
        assert!(!html.contains("502"));
    }

    #[tokio::test]
    async fn content_template_failure_becomes_error_page() {
        let (_dir, pages) = pages(&[(templates::PRODUCT, r#"{% include "missing.html.jinja" %}"#)]);
        let response = pages.render_fetched(
            ResourceKind::Product,
            "p1",
            Fetched::Found(oats()),
            templates::PRODUCT,
            "product",
        );
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body(response).await.starts_with("500: Could not load product"));
    }

    #[tokio::test]
    async fn broken_error_template_falls_back_to_plain_text() {
        let (_dir, pages) = pages(&[(templates::ERROR, r#"{% include "missing.html.jinja" %}"#)]);
        let response = pages.error_page("t", "m");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body(response).await, FALLBACK_BODY);
    }
}
