pub mod browse;
pub mod cache;
pub mod catalog;
pub mod credentials;
pub mod drive;
pub mod error;
pub mod file_store;
pub mod local;

pub use browse::{BrowseSession, Page};
pub use catalog::CatalogService;
pub use error::ServiceError;
pub use file_store::{FileStore, StoreError};
