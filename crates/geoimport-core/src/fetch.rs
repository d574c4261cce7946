use std::path::Path;

use async_trait::async_trait;
use reqwest::Client;
use tracing::info;

use crate::error::Result;
use crate::feature::{self, FeatureCollection};
use crate::source::DatasetSource;
use crate::wfs;

/// Port for loading a dataset source into an in-memory feature table.
#[async_trait]
pub trait DatasetReader: Send + Sync {
    async fn read(&self, source: &DatasetSource) -> Result<FeatureCollection>;
}

/// Production reader: HTTP(S) GET for GeoJSON URLs, a disk read for local
/// paths, and the capabilities/GetFeature flow for WFS endpoints.
pub struct HttpReader {
    client: Client,
}

impl HttpReader {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    async fn read_geojson(&self, locator: &str) -> Result<FeatureCollection> {
        let text = if locator.starts_with("http://") || locator.starts_with("https://") {
            info!(url = %locator, "fetching GeoJSON");
            self.client
                .get(locator)
                .send()
                .await?
                .error_for_status()?
                .text()
                .await?
        } else {
            info!(path = %locator, "reading GeoJSON file");
            std::fs::read_to_string(Path::new(locator))?
        };
        feature::parse_geojson(&text)
    }
}

impl Default for HttpReader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatasetReader for HttpReader {
    async fn read(&self, source: &DatasetSource) -> Result<FeatureCollection> {
        match source {
            DatasetSource::GeoJson(locator) => self.read_geojson(locator).await,
            DatasetSource::Wfs(endpoint) => wfs::fetch_layer(&self.client, endpoint).await,
        }
    }
}
