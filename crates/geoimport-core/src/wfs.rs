use reqwest::Client;
use serde::Deserialize;
use tracing::info;
use url::Url;

use crate::crs;
use crate::error::{ImportError, Result};
use crate::feature::{self, FeatureCollection};

/// WFS GetCapabilities document, reduced to the pieces the importer
/// needs. serde-xml-rs matches elements by local name, so the usual
/// `wfs:` namespace prefixes are transparent.
#[derive(Debug, Deserialize)]
struct Capabilities {
    #[serde(rename = "FeatureTypeList", default)]
    feature_type_list: Option<FeatureTypeList>,
}

#[derive(Debug, Default, Deserialize)]
struct FeatureTypeList {
    #[serde(rename = "FeatureType", default)]
    feature_types: Vec<FeatureType>,
}

#[derive(Debug, Deserialize)]
struct FeatureType {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "DefaultCRS", alias = "DefaultSRS", default)]
    default_crs: Option<String>,
}

/// Fetch the first feature layer a WFS endpoint advertises.
///
/// Flow: GetCapabilities, take the first advertised feature type, then
/// GetFeature for it as GeoJSON. The layer's DefaultCRS serves as the
/// SRID fallback when the GeoJSON body declares none.
pub async fn fetch_layer(client: &Client, endpoint: &str) -> Result<FeatureCollection> {
    let capabilities_url = capabilities_url(endpoint)?;
    info!(url = %capabilities_url, "requesting WFS capabilities");
    let xml = client
        .get(capabilities_url.as_str())
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    let feature_type = first_feature_type(&xml)?;
    let fallback_srid = feature_type
        .default_crs
        .as_deref()
        .and_then(crs::epsg_from_name)
        .unwrap_or(crs::WGS84_SRID);

    let feature_url = get_feature_url(endpoint, &feature_type.name)?;
    info!(url = %feature_url, layer = %feature_type.name, "requesting WFS features");
    let body = client
        .get(feature_url.as_str())
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    feature::parse_geojson_with_fallback(&body, fallback_srid)
}

fn first_feature_type(xml: &str) -> Result<FeatureType> {
    let capabilities: Capabilities = serde_xml_rs::from_str(xml)?;
    capabilities
        .feature_type_list
        .and_then(|list| list.feature_types.into_iter().next())
        .ok_or_else(|| ImportError::Wfs("capabilities advertise no feature types".to_string()))
}

fn capabilities_url(endpoint: &str) -> Result<Url> {
    let mut url = Url::parse(endpoint)?;
    url.query_pairs_mut()
        .append_pair("SERVICE", "WFS")
        .append_pair("REQUEST", "GetCapabilities");
    Ok(url)
}

fn get_feature_url(endpoint: &str, type_name: &str) -> Result<Url> {
    let mut url = Url::parse(endpoint)?;
    url.query_pairs_mut()
        .append_pair("SERVICE", "WFS")
        .append_pair("VERSION", "2.0.0")
        .append_pair("REQUEST", "GetFeature")
        .append_pair("TYPENAMES", type_name)
        .append_pair("OUTPUTFORMAT", "application/json");
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BERLIN_CAPABILITIES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<wfs:WFS_Capabilities xmlns:wfs="http://www.opengis.net/wfs/2.0" xmlns:ows="http://www.opengis.net/ows/1.1" version="2.0.0">
  <ows:ServiceIdentification>
    <ows:Title>Einwohnerdichte 2023</ows:Title>
  </ows:ServiceIdentification>
  <wfs:FeatureTypeList>
    <wfs:FeatureType>
      <wfs:Name>ua_einwohnerdichte_2023:einwohnerdichte2023</wfs:Name>
      <wfs:Title>Einwohnerdichte 2023</wfs:Title>
      <wfs:DefaultCRS>urn:ogc:def:crs:EPSG::25833</wfs:DefaultCRS>
      <wfs:OtherCRS>urn:ogc:def:crs:EPSG::4326</wfs:OtherCRS>
    </wfs:FeatureType>
    <wfs:FeatureType>
      <wfs:Name>ua_einwohnerdichte_2023:raster</wfs:Name>
      <wfs:DefaultCRS>urn:ogc:def:crs:EPSG::25833</wfs:DefaultCRS>
    </wfs:FeatureType>
  </wfs:FeatureTypeList>
</wfs:WFS_Capabilities>"#;

    #[test]
    fn first_advertised_feature_type_wins() {
        let feature_type = first_feature_type(BERLIN_CAPABILITIES).expect("parse");
        assert_eq!(feature_type.name, "ua_einwohnerdichte_2023:einwohnerdichte2023");
        assert_eq!(
            feature_type.default_crs.as_deref(),
            Some("urn:ogc:def:crs:EPSG::25833")
        );
    }

    #[test]
    fn legacy_default_srs_spelling_is_accepted() {
        let xml = r#"<WFS_Capabilities version="1.1.0">
  <FeatureTypeList>
    <FeatureType>
      <Name>fis:s_brw_2024</Name>
      <DefaultSRS>urn:ogc:def:crs:EPSG::25833</DefaultSRS>
    </FeatureType>
  </FeatureTypeList>
</WFS_Capabilities>"#;
        let feature_type = first_feature_type(xml).expect("parse");
        assert_eq!(feature_type.name, "fis:s_brw_2024");
        assert_eq!(
            feature_type.default_crs.as_deref(),
            Some("urn:ogc:def:crs:EPSG::25833")
        );
    }

    #[test]
    fn empty_capabilities_are_an_error() {
        let xml = r#"<wfs:WFS_Capabilities xmlns:wfs="http://www.opengis.net/wfs/2.0" version="2.0.0">
  <wfs:FeatureTypeList/>
</wfs:WFS_Capabilities>"#;
        let err = first_feature_type(xml).unwrap_err();
        assert!(matches!(err, ImportError::Wfs(_)));
    }

    #[test]
    fn capabilities_request_carries_the_wfs_service_parameters() {
        let url = capabilities_url("https://gdi.berlin.de/services/wfs/ua_einwohnerdichte_2023")
            .expect("url");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("SERVICE".to_string(), "WFS".to_string())));
        assert!(pairs.contains(&("REQUEST".to_string(), "GetCapabilities".to_string())));
    }

    #[test]
    fn get_feature_request_names_the_layer_and_output_format() {
        let url = get_feature_url(
            "https://fbinter.stadt-berlin.de/fb/wfs/data/senstadt/s_brw_2024",
            "fis:s_brw_2024",
        )
        .expect("url");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("VERSION".to_string(), "2.0.0".to_string())));
        assert!(pairs.contains(&("REQUEST".to_string(), "GetFeature".to_string())));
        assert!(pairs.contains(&("TYPENAMES".to_string(), "fis:s_brw_2024".to_string())));
        assert!(pairs.contains(&(
            "OUTPUTFORMAT".to_string(),
            "application/json".to_string()
        )));
    }
}
