//! Everything the harvester writes to disk.
//!
//! # Submodules
//!
//! - [`article`]: fills the article template and stores the page with its sidecar
//! - [`catalog`]: merges and orders records into `articles.json`
//! - [`indexes`]: renders the browsable index (paged or embedded)
//!
//! # Output Structure
//!
//! ```text
//! output_root/
//! ├── index.html
//! ├── page-2.html            # paged mode only
//! ├── articles.json
//! └── articles/
//!     └── 20250601/
//!         ├── some-slug.html
//!         └── some-slug.json  # sidecar metadata
//! ```
//!
//! Every file is written to a temp sibling first and renamed into place.

pub mod article;
pub mod catalog;
pub mod indexes;
