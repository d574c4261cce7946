// crates/geoimport-core/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database query failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GeoJSON parsing error: {0}")]
    Geojson(#[from] geojson::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Capabilities XML parsing error: {0}")]
    Xml(#[from] serde_xml_rs::Error),

    #[error("Coordinate transform failed: {0}")]
    Proj(#[from] proj4rs::errors::Error),

    #[error("WFS error: {0}")]
    Wfs(String),

    #[error("No projection registered for EPSG:{0}")]
    UnknownCrs(i32),

    #[error("GeoJSON file not found: {0}")]
    FileNotFound(String),

    #[error("Could not find a PLZ column in the GeoJSON")]
    MissingPlzColumn,

    #[error("Normalization failed: {0}")]
    Normalize(String),
}

pub type Result<T> = std::result::Result<T, ImportError>;
