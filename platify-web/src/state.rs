use std::sync::Arc;

use anyhow::{Context, Result};

use crate::{
    config::Config, fixtures::Fixtures, ingest::ImageStore, render::Pages, templates::Templates,
    upstream::UpstreamClient,
};

/// Everything a handler needs. Built once at startup and only read afterwards.
#[derive(Clone)]
pub struct AppState {
    pub upstream: UpstreamClient,
    pub pages: Pages,
    pub images: ImageStore,
    pub fixtures: Fixtures,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, templates: Templates) -> Result<Self> {
        let upstream =
            UpstreamClient::new(&config.api_base_url).context("Building upstream HTTP client")?;
        let images = ImageStore::new(&config.upload_dir, &config.upload_url_prefix);
        tracing::info!(
            upstream = upstream.base_url(),
            uploads = %images.dir().display(),
            "application state ready"
        );
        Ok(Self {
            upstream,
            pages: Pages::new(templates),
            images,
            fixtures: Fixtures::new(&config.fixtures_dir),
            config: Arc::new(config),
        })
    }
}
