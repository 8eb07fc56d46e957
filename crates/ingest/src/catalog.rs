//! Static per-category table: identity key and row schema contract.

use arrow::datatypes::Schema;
use serde::Serialize;

use tripdata_core::TripCategory;

/// Logical column type declared by a schema contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Float,
    Integer,
    Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

const fn field(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec { name, kind }
}

/// Columns every category record shares.
const BASE_FIELDS: &[FieldSpec] = &[
    field("VendorID", FieldKind::Float),
    field("RatecodeID", FieldKind::Integer),
    field("extra", FieldKind::Float),
    field("tolls_amount", FieldKind::Float),
    field("trip_distance", FieldKind::Float),
    field("PULocationID", FieldKind::Float),
    field("DOLocationID", FieldKind::Integer),
    field("passenger_count", FieldKind::Float),
    field("total_amount", FieldKind::Float),
    field("fare_amount", FieldKind::Float),
    field("improvement_surcharge", FieldKind::Float),
    field("cbd_congestion_fee", FieldKind::Float),
    field("congestion_surcharge", FieldKind::Float),
    field("mta_tax", FieldKind::Float),
    field("store_and_fwd_flag", FieldKind::Float),
    field("payment_type", FieldKind::Integer),
    field("tip_amount", FieldKind::Float),
];

const YELLOW_FIELDS: &[FieldSpec] = &[
    field("tpep_pickup_datetime", FieldKind::Timestamp),
    field("tpep_dropoff_datetime", FieldKind::Timestamp),
    field("Airport_fee", FieldKind::Float),
];

const GREEN_FIELDS: &[FieldSpec] = &[
    field("lpep_pickup_datetime", FieldKind::Timestamp),
    field("lpep_dropoff_datetime", FieldKind::Timestamp),
    field("trip_type", FieldKind::Integer),
    field("ehail_fee", FieldKind::Float),
];

const YELLOW_KEY: &[&str] = &["VendorID", "tpep_pickup_datetime", "tpep_dropoff_datetime"];
const GREEN_KEY: &[&str] = &["VendorID", "lpep_pickup_datetime", "lpep_dropoff_datetime"];

/// Row contract of one category. Opaque to the streaming path; the loader
/// uses it to report columns a file does not carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaContract {
    Yellow,
    Green,
    Fhv,
    Fhvhv,
}

impl SchemaContract {
    /// Category-specific columns, on top of the shared base columns.
    fn own_fields(&self) -> &'static [FieldSpec] {
        match self {
            SchemaContract::Yellow => YELLOW_FIELDS,
            SchemaContract::Green => GREEN_FIELDS,
            SchemaContract::Fhv | SchemaContract::Fhvhv => &[],
        }
    }

    /// All declared columns, base columns first.
    pub fn fields(&self) -> impl Iterator<Item = &'static FieldSpec> {
        BASE_FIELDS.iter().chain(self.own_fields().iter())
    }

    /// Declared columns that `schema` does not contain.
    pub fn missing_fields(&self, schema: &Schema) -> Vec<&'static str> {
        self.fields()
            .filter(|f| schema.field_with_name(f.name).is_err())
            .map(|f| f.name)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Fields that identify a trip within its category. Empty for FHV and
    /// FHVHV, which publish no natural key.
    pub identity_key: &'static [&'static str],
    pub schema: SchemaContract,
}

pub fn catalog(category: TripCategory) -> CatalogEntry {
    match category {
        TripCategory::Yellow => CatalogEntry {
            identity_key: YELLOW_KEY,
            schema: SchemaContract::Yellow,
        },
        TripCategory::Green => CatalogEntry {
            identity_key: GREEN_KEY,
            schema: SchemaContract::Green,
        },
        TripCategory::Fhv => CatalogEntry {
            identity_key: &[],
            schema: SchemaContract::Fhv,
        },
        TripCategory::Fhvhv => CatalogEntry {
            identity_key: &[],
            schema: SchemaContract::Fhvhv,
        },
    }
}
