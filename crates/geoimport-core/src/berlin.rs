use tracing::error;

use crate::error::{ImportError, Result};
use crate::fetch::DatasetReader;
use crate::postgis::TableWriter;
use crate::source::Dataset;

/// The Berlin open-data layers the bulk importer replaces: district
/// boundaries, postal-code polygons, traffic cells, population density,
/// and land values.
pub fn datasets() -> Vec<Dataset> {
    vec![
        Dataset::new(
            "https://tsb-opendata.s3.eu-central-1.amazonaws.com/bezirksgrenzen/bezirksgrenzen.geojson",
            "berlin_bezirke",
        ),
        Dataset::new(
            "https://tsb-opendata.s3.eu-central-1.amazonaws.com/plz/plz.geojson",
            "berlin_plz",
        ),
        Dataset::new(
            "https://tsb-opendata.s3.eu-central-1.amazonaws.com/verkehrszellen/verkehrszellen.geojson",
            "berlin_traffic_cells",
        ),
        Dataset::new(
            "WFS:https://gdi.berlin.de/services/wfs/ua_einwohnerdichte_2023",
            "berlin_population_density",
        ),
        Dataset::new(
            "WFS:https://fbinter.stadt-berlin.de/fb/wfs/data/senstadt/s_brw_2024",
            "berlin_land_values",
        ),
    ]
}

/// Outcome of one dataset's replace attempt.
#[derive(Debug)]
pub struct DatasetReport {
    pub table: String,
    pub outcome: std::result::Result<u64, ImportError>,
}

/// Run the bulk import strictly in list order, announcing each dataset on
/// the console before its fetch starts and its outcome once it finishes.
///
/// Failure isolation: every dataset is attempted, any error (fetch, parse,
/// database) is captured in that dataset's report, and the function itself
/// never returns an error.
pub async fn run(
    reader: &dyn DatasetReader,
    writer: &dyn TableWriter,
    datasets: &[Dataset],
) -> Vec<DatasetReport> {
    let mut reports = Vec::with_capacity(datasets.len());
    for dataset in datasets {
        println!("Importing {}...", dataset.table);
        let outcome = import_dataset(reader, writer, dataset).await;
        match &outcome {
            Ok(rows) => println!("  ✓ {rows} features"),
            Err(err) => {
                println!("  ✗ Error: {err}");
                error!(table = %dataset.table, error = %err, "dataset import failed");
            }
        }
        reports.push(DatasetReport {
            table: dataset.table.clone(),
            outcome,
        });
    }
    reports
}

async fn import_dataset(
    reader: &dyn DatasetReader,
    writer: &dyn TableWriter,
    dataset: &Dataset,
) -> Result<u64> {
    let collection = reader.read(&dataset.source).await?;
    writer.replace_table(&dataset.table, &collection).await
}
