use async_trait::async_trait;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::QueryBuilder;
use tracing::{debug, info};

use crate::db::DbPool;
use crate::error::Result;
use crate::feature::{Feature, FeatureCollection};

/// Port for replacing a destination table wholesale with a feature
/// collection's rows. Returns the number of rows written.
#[async_trait]
pub trait TableWriter: Send + Sync {
    async fn replace_table(&self, table: &str, collection: &FeatureCollection) -> Result<u64>;
}

/// Writes feature collections into PostGIS tables.
///
/// Each replacement is one transaction: DROP TABLE IF EXISTS, CREATE TABLE
/// with a schema inferred from the property values, then chunked inserts
/// with geometries bound as GeoJSON text through
/// `ST_SetSRID(ST_GeomFromGeoJSON(...), srid)`.
pub struct PostgisWriter {
    pool: DbPool,
}

impl PostgisWriter {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

// Postgres caps bind parameters per statement at u16::MAX.
const MAX_BINDS_PER_INSERT: usize = 60_000;

#[async_trait]
impl TableWriter for PostgisWriter {
    async fn replace_table(&self, table: &str, collection: &FeatureCollection) -> Result<u64> {
        let columns = infer_columns(collection);
        let create = create_table_sql(
            table,
            &columns,
            geometry_sql_type(collection),
            collection.srid,
        );
        debug!(table, statement = %create, "creating destination table");

        let mut tx = self.pool.begin().await?;
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", quote_ident(table)))
            .execute(tx.as_mut())
            .await?;
        sqlx::query(&create).execute(tx.as_mut()).await?;

        let rows_per_chunk = (MAX_BINDS_PER_INSERT / (columns.len() + 1)).max(1);
        let mut written = 0u64;
        for chunk in collection.features.chunks(rows_per_chunk) {
            written += insert_chunk(tx.as_mut(), table, &columns, collection.srid, chunk).await?;
        }
        tx.commit().await?;

        info!(table, rows = written, "replaced table");
        Ok(written)
    }
}

async fn insert_chunk(
    conn: &mut sqlx::PgConnection,
    table: &str,
    columns: &[(String, ColumnType)],
    srid: i32,
    features: &[Feature],
) -> Result<u64> {
    // Serialize geometries up front; the push_values closure cannot fail.
    let geometries = features
        .iter()
        .map(|feature| feature.geometry.as_ref().map(geojson_text).transpose())
        .collect::<Result<Vec<Option<String>>>>()?;

    let mut builder: QueryBuilder<'_, sqlx::Postgres> = QueryBuilder::new(format!(
        "INSERT INTO {} ({}) ",
        quote_ident(table),
        column_list(columns),
    ));

    builder.push_values(
        features.iter().zip(geometries),
        |mut row, (feature, geometry)| {
            for (name, column_type) in columns {
                let value = feature.properties.get(name).unwrap_or(&Value::Null);
                match column_type {
                    ColumnType::Bigint => {
                        row.push_bind(value.as_i64());
                    }
                    ColumnType::Double => {
                        row.push_bind(value.as_f64());
                    }
                    ColumnType::Boolean => {
                        row.push_bind(value.as_bool());
                    }
                    ColumnType::Text => {
                        row.push_bind(text_of(value));
                    }
                    ColumnType::Jsonb => {
                        row.push_bind(jsonb_of(value));
                    }
                }
            }
            match geometry {
                Some(text) => {
                    row.push("ST_SetSRID(ST_GeomFromGeoJSON(");
                    row.push_bind_unseparated(text);
                    row.push_unseparated(format!("), {srid})"));
                }
                None => {
                    row.push("NULL");
                }
            }
        },
    );

    let result = builder.build().execute(conn).await?;
    Ok(result.rows_affected())
}

/// SQL types a property column can be mapped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnType {
    Bigint,
    Double,
    Boolean,
    Text,
    Jsonb,
}

impl ColumnType {
    fn sql(self) -> &'static str {
        match self {
            ColumnType::Bigint => "BIGINT",
            ColumnType::Double => "DOUBLE PRECISION",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Text => "TEXT",
            ColumnType::Jsonb => "JSONB",
        }
    }

    fn of_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(_) => Some(ColumnType::Boolean),
            Value::Number(number) if number.is_i64() => Some(ColumnType::Bigint),
            Value::Number(_) => Some(ColumnType::Double),
            Value::String(_) => Some(ColumnType::Text),
            Value::Array(_) | Value::Object(_) => Some(ColumnType::Jsonb),
        }
    }

    /// Widen two observed value types into one column type. Integers widen
    /// to doubles; any other mix falls back to TEXT.
    fn merge(self, other: Self) -> Self {
        use ColumnType::*;
        match (self, other) {
            (a, b) if a == b => a,
            (Bigint, Double) | (Double, Bigint) => Double,
            _ => Text,
        }
    }
}

/// Infer one SQL type per attribute column from the values it holds.
/// Columns that are null in every row land as TEXT.
fn infer_columns(collection: &FeatureCollection) -> Vec<(String, ColumnType)> {
    collection
        .column_names()
        .into_iter()
        .map(|name| {
            let inferred = collection
                .features
                .iter()
                .filter_map(|feature| feature.properties.get(&name))
                .filter_map(ColumnType::of_value)
                .reduce(ColumnType::merge)
                .unwrap_or(ColumnType::Text);
            (name, inferred)
        })
        .collect()
}

/// The typed geometry column: the uniform geometry kind across all rows,
/// or the generic GEOMETRY when kinds are mixed or absent.
fn geometry_sql_type(collection: &FeatureCollection) -> &'static str {
    let mut uniform: Option<&'static str> = None;
    for feature in &collection.features {
        let Some(geometry) = &feature.geometry else {
            continue;
        };
        let kind = geometry_kind(geometry);
        match uniform {
            None => uniform = Some(kind),
            Some(seen) if seen == kind => {}
            Some(_) => return "GEOMETRY",
        }
    }
    uniform.unwrap_or("GEOMETRY")
}

fn geometry_kind(geometry: &geo_types::Geometry<f64>) -> &'static str {
    use geo_types::Geometry::*;
    match geometry {
        Point(_) => "POINT",
        Line(_) | LineString(_) => "LINESTRING",
        Polygon(_) | Rect(_) | Triangle(_) => "POLYGON",
        MultiPoint(_) => "MULTIPOINT",
        MultiLineString(_) => "MULTILINESTRING",
        MultiPolygon(_) => "MULTIPOLYGON",
        GeometryCollection(_) => "GEOMETRYCOLLECTION",
    }
}

fn create_table_sql(
    table: &str,
    columns: &[(String, ColumnType)],
    geometry_type: &str,
    srid: i32,
) -> String {
    let mut definitions: Vec<String> = columns
        .iter()
        .map(|(name, column_type)| format!("{} {}", quote_ident(name), column_type.sql()))
        .collect();
    definitions.push(format!("\"geometry\" geometry({geometry_type}, {srid})"));
    format!(
        "CREATE TABLE {} ({})",
        quote_ident(table),
        definitions.join(", ")
    )
}

fn column_list(columns: &[(String, ColumnType)]) -> String {
    columns
        .iter()
        .map(|(name, _)| quote_ident(name))
        .chain(std::iter::once(quote_ident("geometry")))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Double-quote a SQL identifier, escaping embedded quotes.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn geojson_text(geometry: &geo_types::Geometry<f64>) -> Result<String> {
    let geometry = geojson::Geometry::new(geojson::Value::from(geometry));
    Ok(serde_json::to_string(&geometry)?)
}

/// TEXT columns hold strings as-is and render other scalars through their
/// JSON form.
fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn jsonb_of(value: &Value) -> Option<Json<Value>> {
    match value {
        Value::Null => None,
        other => Some(Json(other.clone())),
    }
}
