//! Report and export generation.
//!
//! # Submodules
//!
//! - [`markdown`]: Renders the per-query Markdown report
//! - [`json`]: Writes the selected articles as JSON for other tools
//!
//! # Output Structure
//!
//! ```text
//! reports_dir/
//! └── report_bóng_đá_20250506_093000.md
//!
//! json_output_dir/
//! └── bóng_đá_20250506_093000.json
//! ```

pub mod json;
pub mod markdown;
