pub mod catalog;
pub mod client;
pub mod error;
pub mod pager;
pub mod title;
pub mod walker;

pub use catalog::{CatalogNode, CatalogPage, PageRequest, Row};
pub use client::{CatalogClient, HttpOptions, PageSource, RetryPolicy};
pub use error::ScanError;
pub use pager::{ChildList, fetch_all_children};
pub use walker::{BranchPolicy, ProgressCallback, WalkReport, Walker};
