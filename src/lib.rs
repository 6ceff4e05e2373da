//! tpcell - records and reporting for a college training and placement cell.
//!
//! tpcell keeps student, company, and placement records in
//! [MongoDB](https://www.mongodb.com), with offer-letter PDFs stored as
//! blobs in a second database. On top of the records it provides
//! substring search with package-threshold filtering, chart data for
//! dashboards and analytics views, and CSV/workbook exports.
//!
//! # Quick start
//!
//! ```no_run
//! use tpcell::{ConnectionProvider, CompanyStore};
//! use tpcell::{company, search};
//!
//! # async fn demo() -> tpcell::Result<()> {
//! let provider = ConnectionProvider::from_sources(
//!     Some("mongodb://localhost:27017".to_string()),
//!     None,
//! )?;
//! let store = CompanyStore::open(&provider).await?;
//!
//! let filters = company::search_filters("ACME", "", "", "").package("8");
//! let results = search::run(
//!     store.collection(),
//!     &filters,
//!     "50",
//!     company::search_projection(),
//! )
//! .await?;
//!
//! println!("{}", results.summary);
//! for doc in &results.documents {
//!     let record = company::CompanyRecord::new(doc);
//!     println!(
//!         "{} ({})",
//!         record.name().unwrap_or("-"),
//!         record.package().unwrap_or("-")
//!     );
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod charts;
pub mod company;
pub mod connection;
pub mod error;
pub mod export;
pub mod letters;
pub mod placement;
pub mod query;
pub mod search;
pub mod student;
pub mod validate;
pub mod warmup;

pub use cache::SampleCache;
pub use company::CompanyStore;
pub use connection::ConnectionProvider;
pub use error::{Error, Result};
pub use letters::LetterStore;
pub use placement::PlacementStore;
pub use student::StudentStore;
