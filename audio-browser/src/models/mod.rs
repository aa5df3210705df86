pub mod browse;
pub mod catalog;

pub use browse::{BrowseState, SessionBrowseState};
pub use catalog::{FileRef, FolderRef};
