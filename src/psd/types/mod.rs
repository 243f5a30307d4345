//! Data model for parsed PSD documents.

pub mod descriptor;
pub mod models;
