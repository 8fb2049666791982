//! Local example payloads for previewing page designs without the catalog API.

use std::path::{Path, PathBuf};

use platify::models::{Product, Recipe, RecipeResponse};
use serde::de::DeserializeOwned;

use crate::upstream::{FetchError, Fetched};

pub const EXAMPLE_RECIPE: &str = "example_recipe.json";
pub const EXAMPLE_PRODUCT: &str = "example_product.json";

#[derive(Clone, Debug)]
pub struct Fixtures {
    dir: PathBuf,
}

impl Fixtures {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn recipe(&self) -> Fetched<Recipe> {
        self.load::<RecipeResponse>(EXAMPLE_RECIPE).await.map(|r| r.recipe)
    }

    pub async fn product(&self) -> Fetched<Product> {
        self.load(EXAMPLE_PRODUCT).await
    }

    /// Same shape and same failure classes as an upstream fetch.
    async fn load<T: DeserializeOwned>(&self, file: &str) -> Fetched<T> {
        let bytes = match tokio::fs::read(self.dir.join(file)).await {
            Ok(bytes) => bytes,
            Err(err) => return Fetched::TransientError(FetchError::Fixture(err)),
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => Fetched::Found(value),
            Err(err) => Fetched::TransientError(FetchError::Decode(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn bundled_fixtures_decode() {
        let fixtures = Fixtures::new(concat!(env!("CARGO_MANIFEST_DIR"), "/testdata"));
        match fixtures.recipe().await {
            Fetched::Found(recipe) => assert!(!recipe.sections.is_empty()),
            other => panic!("expected bundled recipe, got {other:?}"),
        }
        assert!(matches!(fixtures.product().await, Fetched::Found(_)));
    }

    #[tokio::test]
    async fn missing_fixture_is_transient() {
        let dir = TempDir::new().unwrap();
        let fixtures = Fixtures::new(dir.path());
        assert!(matches!(
            fixtures.recipe().await,
            Fetched::TransientError(FetchError::Fixture(_))
        ));
    }

    #[tokio::test]
    async fn malformed_fixture_is_a_decode_failure() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(EXAMPLE_PRODUCT), "{\"id\": ").unwrap();
        let fixtures = Fixtures::new(dir.path());
        assert!(matches!(
            fixtures.product().await,
            Fetched::TransientError(FetchError::Decode(_))
        ));
    }
}
