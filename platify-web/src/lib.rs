//! Server-rendered recipe and product pages for the Platify catalog, plus the
//! image upload endpoint used by the recipe editor.
pub mod config;
pub mod errors;
pub mod fixtures;
pub mod ingest;
pub mod render;
pub mod routes;
pub mod state;
pub mod templates;
pub mod upstream;

pub use config::Config;
pub use routes::router;
pub use state::AppState;
