//! # sowgen-docx
//!
//! Word-processing (DOCX) output for the SOW generator: an in-memory package,
//! a small editable XML tree and a placeholder template engine with
//! repeating paragraphs, table rows and regions.
//!
//! ## Example
//!
//! ```rust
//! use sowgen_docx::{render, Context, DocxPackage};
//!
//! let mut ctx = Context::new();
//! ctx.set_text("client_name", "IEEE")
//!     .set_list("scope_items", ["Provide Developer services as outlined in this SOW"]);
//!
//! let mut package = DocxPackage::builtin();
//! let report = render(&mut package, &ctx).unwrap();
//!
//! let text = package.document_text().unwrap();
//! assert!(text.contains("Provide Developer services as outlined in this SOW"));
//! assert!(!report.unresolved.is_empty()); // most values were left out
//! ```

pub mod context;
pub mod engine;
pub mod error;
pub mod package;
pub mod template;
pub mod xml;

pub use context::{Context, Value};
pub use engine::{placeholders, render, RenderReport};
pub use error::{DocxError, DocxResult};
pub use package::{DocxPackage, DOCUMENT_PART};
