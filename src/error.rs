use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("{path} is missing required column '{column}'")]
    MissingColumn { path: String, column: String },

    #[error("{path} row {row}: invalid {column} value '{value}'")]
    BadValue {
        path: String,
        row: usize,
        column: String,
        value: String,
    },

    #[error("{path} row {row}: quarter {quarter} is outside 1..=4")]
    QuarterOutOfRange { path: String, row: usize, quarter: i64 },

    #[error("Boundary file {path} is not valid GeoJSON: {source}")]
    Boundary {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Boundary file {path}: feature {index} has no 'name' property")]
    UnnamedRegion { path: String, index: usize },

    #[error("{path} has no data rows")]
    EmptyTable { path: String },

    #[error("Table {table} has no column '{field}'")]
    UnknownField { table: String, field: String },

    #[error("Table {table}: '{value}' in column '{field}' is not a number")]
    BadMetricValue {
        table: String,
        field: String,
        value: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type DashResult<T> = Result<T, DashboardError>;
