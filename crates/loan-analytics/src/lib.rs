//! Loan analytics: query catalog, warehouse access, cached execution, and schema checks
//! for the loan and accounting tables.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod connection;
pub mod executor;
pub mod export;
pub mod introspect;
pub mod queries;
pub mod report;
pub mod schema;
pub mod types;
pub mod warehouse;

pub use cache::{CacheKey, ResultCache};
pub use catalog::{Domain, QueryCatalog, QueryName, LEGACY_ALIASES};
pub use config::WarehouseConfig;
pub use connection::{ColumnDescriptor, ConnectionProvider};
pub use executor::QueryExecutor;
pub use export::{to_csv, write_csv, write_csv_file};
pub use introspect::{FieldChecklist, SampleData, SchemaInspector, TableReport};
pub use report::{CollectingSink, Status, StatusLevel, StatusSink, TracingSink};
pub use schema::{Table, TableNamespace};
pub use types::*;
pub use warehouse::{Connector, DatabricksConnector, SqlService, StatementClient};
