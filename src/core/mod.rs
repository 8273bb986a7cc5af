pub mod ingest;
pub mod lifecycle;
pub mod records;
pub mod store;
pub mod terminal;
