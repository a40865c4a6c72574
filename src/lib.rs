//! Galdex keeps a persistent index of a media folder so a gallery can be
//! served without walking the disk on every request.
//!
//! The [`scanner`] reads folders into [`model::Directory`] trees, the
//! [`indexing`] engine merges them into the SQLite store in [`db`], and
//! [`gallery`] reads them back one level at a time.

pub mod albums;
pub mod config;
pub mod db;
pub mod error;
pub mod gallery;
pub mod indexing;
pub mod logging;
pub mod model;
pub mod scanner;

pub use config::Config;
pub use error::{IndexError, Result};
pub use gallery::{GalleryManager, Listing};
pub use indexing::{IndexingManager, MergeStats, SaveHandle};
