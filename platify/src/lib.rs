//! Records served by the Platify catalog API.
pub mod models;
