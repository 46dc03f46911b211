pub mod json_store;
pub mod report_store;
pub mod schema;
