use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use geojson::JsonObject;
use geoimport_core::berlin;
use geoimport_core::error::{ImportError, Result};
use geoimport_core::feature::{Feature, FeatureCollection};
use geoimport_core::fetch::DatasetReader;
use geoimport_core::plz;
use geoimport_core::postgis::TableWriter;
use geoimport_core::source::DatasetSource;
use serde_json::json;

fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/data")
        .join(name)
}

fn stub_collection() -> FeatureCollection {
    let mut properties = JsonObject::new();
    properties.insert("name".to_string(), json!("stub"));
    FeatureCollection {
        features: vec![Feature {
            geometry: None,
            properties,
        }],
        srid: 4326,
    }
}

/// Reader double that fails for one configured source and hands back a
/// small stub collection for every other one.
struct ScriptedReader {
    fail_for: Option<DatasetSource>,
}

#[async_trait]
impl DatasetReader for ScriptedReader {
    async fn read(&self, source: &DatasetSource) -> Result<FeatureCollection> {
        if self.fail_for.as_ref() == Some(source) {
            return Err(ImportError::Wfs("simulated fetch failure".to_string()));
        }
        Ok(stub_collection())
    }
}

/// Writer double that records every replacement and can simulate a
/// database failure for one table.
#[derive(Default)]
struct RecordingWriter {
    replaced: Mutex<Vec<(String, FeatureCollection)>>,
    fail_for_table: Option<String>,
}

impl RecordingWriter {
    fn failing_on(table: &str) -> Self {
        Self {
            fail_for_table: Some(table.to_string()),
            ..Self::default()
        }
    }

    fn call_count(&self) -> usize {
        self.replaced.lock().unwrap().len()
    }

    fn tables(&self) -> Vec<String> {
        self.replaced
            .lock()
            .unwrap()
            .iter()
            .map(|(table, _)| table.clone())
            .collect()
    }

    fn collection_for(&self, table: &str) -> Option<FeatureCollection> {
        self.replaced
            .lock()
            .unwrap()
            .iter()
            .find(|(name, _)| name == table)
            .map(|(_, collection)| collection.clone())
    }
}

#[async_trait]
impl TableWriter for RecordingWriter {
    async fn replace_table(&self, table: &str, collection: &FeatureCollection) -> Result<u64> {
        if self.fail_for_table.as_deref() == Some(table) {
            return Err(ImportError::Sqlx(sqlx::Error::PoolClosed));
        }
        let rows = collection.len() as u64;
        self.replaced
            .lock()
            .unwrap()
            .push((table.to_string(), collection.clone()));
        Ok(rows)
    }
}

/// Reader and writer pair sharing one journal, for asserting the order of
/// calls across both ports.
struct JournalReader {
    journal: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl DatasetReader for JournalReader {
    async fn read(&self, source: &DatasetSource) -> Result<FeatureCollection> {
        self.journal.lock().unwrap().push(format!("read {source}"));
        Ok(stub_collection())
    }
}

struct JournalWriter {
    journal: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl TableWriter for JournalWriter {
    async fn replace_table(&self, table: &str, collection: &FeatureCollection) -> Result<u64> {
        self.journal.lock().unwrap().push(format!("write {table}"));
        Ok(collection.len() as u64)
    }
}

#[tokio::test]
async fn a_failing_fetch_never_stops_the_remaining_datasets() {
    let datasets = berlin::datasets();

    for failing_index in 0..datasets.len() {
        let reader = ScriptedReader {
            fail_for: Some(datasets[failing_index].source.clone()),
        };
        let writer = RecordingWriter::default();

        let reports = berlin::run(&reader, &writer, &datasets).await;

        assert_eq!(reports.len(), datasets.len());
        for (index, report) in reports.iter().enumerate() {
            assert_eq!(report.table, datasets[index].table);
            if index == failing_index {
                assert!(report.outcome.is_err(), "dataset {index} should have failed");
            } else {
                assert_eq!(*report.outcome.as_ref().unwrap(), 1);
            }
        }

        let expected_tables: Vec<String> = datasets
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != failing_index)
            .map(|(_, dataset)| dataset.table.clone())
            .collect();
        assert_eq!(writer.tables(), expected_tables);
    }
}

#[tokio::test]
async fn a_failing_table_write_is_isolated_the_same_way() {
    let datasets = berlin::datasets();
    let reader = ScriptedReader { fail_for: None };
    let writer = RecordingWriter::failing_on("berlin_plz");

    let reports = berlin::run(&reader, &writer, &datasets).await;

    assert_eq!(reports.len(), 5);
    assert!(reports[1].outcome.is_err());
    let successes = reports
        .iter()
        .filter(|report| report.outcome.is_ok())
        .count();
    assert_eq!(successes, 4);
    assert_eq!(writer.call_count(), 4);
}

#[tokio::test]
async fn each_dataset_is_fetched_and_written_before_the_next_one_starts() {
    let journal = Arc::new(Mutex::new(Vec::new()));
    let reader = JournalReader {
        journal: Arc::clone(&journal),
    };
    let writer = JournalWriter {
        journal: Arc::clone(&journal),
    };
    let datasets = berlin::datasets();

    berlin::run(&reader, &writer, &datasets).await;

    let expected: Vec<String> = datasets
        .iter()
        .flat_map(|dataset| {
            [
                format!("read {}", dataset.source),
                format!("write {}", dataset.table),
            ]
        })
        .collect();
    assert_eq!(*journal.lock().unwrap(), expected);
}

#[tokio::test]
async fn a_missing_file_aborts_before_any_database_write() {
    let writer = RecordingWriter::default();

    let err = plz::run(&writer, Path::new("does/not/exist.geojson"))
        .await
        .unwrap_err();

    assert!(matches!(err, ImportError::FileNotFound(_)));
    assert_eq!(writer.call_count(), 0, "writer spy must never be called");
}

#[tokio::test]
async fn a_missing_plz_column_aborts_before_any_database_write() {
    let writer = RecordingWriter::default();

    let err = plz::run(&writer, &fixture_path("no_plz.geojson"))
        .await
        .unwrap_err();

    assert!(matches!(err, ImportError::MissingPlzColumn));
    assert_eq!(writer.call_count(), 0);
}

#[tokio::test]
async fn the_plz_pipeline_detects_normalizes_and_reprojects() {
    let writer = RecordingWriter::default();

    let report = plz::run(&writer, &fixture_path("plz_gebiete.geojson"))
        .await
        .expect("pipeline run");

    assert_eq!(report.rows, 3);
    assert_eq!(report.plz_column, "PLZ");
    assert_eq!(report.population_column.as_deref(), Some("Einwohner"));

    let collection = writer
        .collection_for("germany_plz_with_pop")
        .expect("destination table written");
    assert_eq!(collection.srid, 4326);

    let canonical: Vec<(serde_json::Value, serde_json::Value)> = collection
        .features
        .iter()
        .map(|feature| {
            (
                feature.properties["plz"].clone(),
                feature.properties["einwohner"].clone(),
            )
        })
        .collect();
    assert_eq!(
        canonical,
        vec![
            (json!("00123"), json!(12000)),
            (json!("10115"), json!(0)),
            (json!("00987"), json!(340)),
        ]
    );

    // detected source column survives alongside the canonical one
    assert_eq!(collection.features[0].properties["PLZ"], json!(123));

    // fixture coordinates are UTM zone 32 around the 9°E meridian; after
    // reprojection every vertex must be in that neighbourhood
    for feature in &collection.features {
        let geometry = feature.geometry.as_ref().expect("polygon");
        let geo_types::Geometry::Polygon(polygon) = geometry else {
            panic!("expected polygons, got {geometry:?}");
        };
        for coord in polygon.exterior().coords() {
            assert!(
                (8.9..9.1).contains(&coord.x),
                "longitude {} outside UTM32 test window",
                coord.x
            );
            assert!(
                (51.9..52.1).contains(&coord.y),
                "latitude {} outside UTM32 test window",
                coord.y
            );
        }
    }
}
