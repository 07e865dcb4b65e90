//! Output generation: article PDFs and the per-run JSON report.
//!
//! # Submodules
//!
//! - [`pdf`]: Exports cached articles to PDF files, skipping ones already on disk
//! - [`json`]: Writes the batch's [`crate::models::DownloadReport`] as JSON
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── 20240310 First post.pdf
//! ├── 20240305 Second post.pdf
//! └── download_report.json
//! ```

pub mod json;
pub mod pdf;
