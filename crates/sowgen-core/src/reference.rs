//! Reference data store
//!
//! Rates and picklists are loaded once from a JSON file and then passed by
//! shared reference into every pipeline. Nothing here mutates after load.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Error, LookupError, Result};
use crate::model::{phase_map, PhaseDeliverables};

/// One entry of the rate table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateEntry {
    pub bill_rate: Decimal,
}

/// Rates used when the table has no entry for a practice/role pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackRates {
    /// Rate for practices that match no regional keyword
    pub default: Decimal,
    /// Practice substring -> rate, checked in key order
    pub regional: BTreeMap<String, Decimal>,
}

impl Default for FallbackRates {
    fn default() -> Self {
        let mut regional = BTreeMap::new();
        regional.insert("India".to_string(), Decimal::from(55));
        Self {
            default: Decimal::from(200),
            regional,
        }
    }
}

/// Where a resolved rate came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateSource {
    /// Exact `Practice|Role` hit in the rate table
    Table,
    /// Fallback matched on a practice keyword
    Regional(String),
    /// Fallback default rate
    Default,
}

/// A rate plus its provenance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateResolution {
    pub rate: Decimal,
    pub source: RateSource,
}

impl RateResolution {
    /// True when the rate did not come from the rate table
    pub fn is_fallback(&self) -> bool {
        self.source != RateSource::Table
    }
}

/// Rates, picklists and default deliverables
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceData {
    /// Keyed by `"Practice|Role"`
    pub rates: HashMap<String, RateEntry>,
    pub clients: Vec<String>,
    pub capabilities: Vec<String>,
    pub service_types: Vec<String>,
    pub contract_types: Vec<String>,
    pub practices: Vec<String>,
    pub roles: Vec<String>,
    #[serde(with = "phase_map")]
    pub deliverables_by_phase: Vec<PhaseDeliverables>,
    pub fallback_rates: FallbackRates,
}

impl ReferenceData {
    /// Load reference data from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let data = Self::from_json_str(&text, &path.display().to_string())?;
        log::info!(
            "loaded reference data from '{}': {} rates, {} practices, {} roles",
            path.display(),
            data.rates.len(),
            data.practices.len(),
            data.roles.len()
        );
        Ok(data)
    }

    /// Parse reference data from JSON text; `origin` names the source in errors
    pub fn from_json_str(text: &str, origin: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::json(origin, e))
    }

    /// Add or replace a rate table entry
    pub fn insert_rate(&mut self, practice: &str, role: &str, bill_rate: Decimal) {
        self.rates
            .insert(rate_key(practice, role), RateEntry { bill_rate });
    }

    /// Exact rate table lookup
    pub fn lookup_rate(&self, practice: &str, role: &str) -> std::result::Result<Decimal, LookupError> {
        self.rates
            .get(&rate_key(practice, role))
            .map(|entry| entry.bill_rate)
            .ok_or_else(|| LookupError {
                practice: practice.to_string(),
                role: role.to_string(),
            })
    }

    /// Rate table lookup with fallback
    ///
    /// `default_rate` replaces the configured fallback default when given;
    /// regional keywords still take precedence over it.
    pub fn resolve_rate(&self, practice: &str, role: &str, default_rate: Option<Decimal>) -> RateResolution {
        if let Ok(rate) = self.lookup_rate(practice, role) {
            return RateResolution {
                rate,
                source: RateSource::Table,
            };
        }
        for (keyword, rate) in &self.fallback_rates.regional {
            if practice.contains(keyword.as_str()) {
                return RateResolution {
                    rate: *rate,
                    source: RateSource::Regional(keyword.clone()),
                };
            }
        }
        RateResolution {
            rate: default_rate.unwrap_or(self.fallback_rates.default),
            source: RateSource::Default,
        }
    }

    /// Deliverables used for the `"default"` keyword
    pub fn default_deliverables(&self) -> Vec<PhaseDeliverables> {
        if self.deliverables_by_phase.is_empty() {
            crate::model::DeliverableSet::builtin()
        } else {
            self.deliverables_by_phase.clone()
        }
    }
}

fn rate_key(practice: &str, role: &str) -> String {
    format!("{}|{}", practice.trim(), role.trim())
}
