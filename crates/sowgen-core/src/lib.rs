//! # sowgen-core
//!
//! Core data structures for the sowgen SOW generator.
//!
//! This crate provides the types shared by every pipeline:
//! - [`ContentModel`] - Normalized project, sales team, resources, phases and deliverables
//! - [`ReferenceData`] - Rate table and picklists loaded once at start-up
//! - [`ScopeOverrides`] - Optional user-supplied document text
//! - [`money`] and [`dates`] - Cent-exact totals and display formatting
//!
//! ## Example
//!
//! ```rust
//! use sowgen_core::{ContentModel, money};
//!
//! let model: ContentModel = serde_json::from_str(r#"{
//!     "project": {"client_name": "IEEE", "duration_months": 2},
//!     "resources": [{
//!         "practice": "EPM_Practice_USA",
//!         "resource_role": "Project Manager",
//!         "hourly_rate": 230,
//!         "monthly_hours": [24, 168]
//!     }]
//! }"#).unwrap();
//!
//! assert_eq!(money::format_money(model.totals().total_fees), "44,160.00");
//! ```

pub mod dates;
pub mod error;
pub mod model;
pub mod money;
pub mod reference;
pub mod scope;

pub use error::{Error, LookupError, Result};
pub use model::{
    ContentModel, ContentPatch, DeliverableSet, Phase, PhaseDeliverables, ProjectInfo,
    ProjectPatch, ResourceRow, SalesTeam, SalesTeamPatch, Totals,
};
pub use reference::{FallbackRates, RateEntry, RateResolution, RateSource, ReferenceData};
pub use scope::{MiscProvision, ScopeOverrides};

/// Placeholder shown for a named resource that has not been staffed yet
pub const TBD: &str = "TBD";

/// Sheet holding the project header and resource table
pub const PRICING_SHEET: &str = "Pricing Details";
