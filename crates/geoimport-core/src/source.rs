use std::fmt;

/// Where a dataset comes from: a GeoJSON document reachable as a URL or
/// local file, or a WFS service endpoint marked with a `WFS:` prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetSource {
    GeoJson(String),
    Wfs(String),
}

impl DatasetSource {
    pub fn parse(locator: &str) -> Self {
        match locator.strip_prefix("WFS:") {
            Some(endpoint) => DatasetSource::Wfs(endpoint.to_string()),
            None => DatasetSource::GeoJson(locator.to_string()),
        }
    }
}

impl fmt::Display for DatasetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetSource::GeoJson(locator) => write!(f, "{locator}"),
            DatasetSource::Wfs(endpoint) => write!(f, "WFS:{endpoint}"),
        }
    }
}

/// One (source, destination table) pair from a static import list.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub source: DatasetSource,
    pub table: String,
}

impl Dataset {
    pub fn new(locator: &str, table: &str) -> Self {
        Self {
            source: DatasetSource::parse(locator),
            table: table.to_string(),
        }
    }
}
