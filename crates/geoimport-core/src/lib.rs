pub mod error;
pub mod config;
pub mod db;
pub mod source;
pub mod feature;
pub mod fetch;
pub mod wfs;
pub mod crs;
pub mod normalize;
pub mod postgis;
pub mod berlin;
pub mod plz;
