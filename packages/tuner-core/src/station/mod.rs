//! Station catalog, persisted selection and the directory that combines them.

mod catalog;
mod directory;
mod storage;

pub use catalog::{
    fetch_or_fallback, CatalogError, CatalogResult, HttpStationCatalog, Station, StationCatalog,
};
pub use directory::StationDirectory;
pub use storage::LastStationStore;
