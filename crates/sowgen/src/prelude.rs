//! Prelude module - common imports for sowgen users
//!
//! ```rust
//! use sowgen::prelude::*;
//! ```

pub use crate::{
    // Pipelines
    clone_workbook,
    document_context,
    render_document,
    render_workbook,
    write_document,
    write_document_json,
    write_workbook,
    write_workbook_with,
    // Builder
    BuildOptions,
    BuildReport,
    BuildWarning,
    Builder,
    CloneOutcome,
    // Model types
    ContentModel,
    ContentPatch,
    DeliverableSet,
    DocumentOptions,
    // Error types
    Error,
    Phase,
    ReferenceData,
    ResourceRow,
    Result,
    ScopeOverrides,
    WorkbookOptions,
};
