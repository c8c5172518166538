//! Content model types
//!
//! The [`ContentModel`] is the unit passed between the builder and the
//! renderers. Field names follow the JSON input schema so that a model can be
//! read from, and dumped back to, the same document shape.

use std::fmt;

use rust_decimal::Decimal;
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::TBD;

/// Project header fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectInfo {
    pub client_name: String,
    pub project_name: String,
    pub capability_area: String,
    pub service_type: String,
    pub contract_type: String,
    pub project_type: String,
    pub risk_profile: String,
    pub pricing_date: String,
    pub project_start_date: String,
    pub duration_months: u32,
}

impl Default for ProjectInfo {
    fn default() -> Self {
        Self {
            client_name: String::new(),
            project_name: String::new(),
            capability_area: String::new(),
            service_type: String::new(),
            contract_type: "T&M".to_string(),
            project_type: "New".to_string(),
            risk_profile: "Low".to_string(),
            pricing_date: String::new(),
            project_start_date: String::new(),
            duration_months: 6,
        }
    }
}

/// The four named sales contacts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SalesTeam {
    pub relationship_owner: String,
    pub sales_rep: String,
    pub inside_sales: String,
    pub sales_team_leader: String,
}

/// One staffed (or to-be-staffed) role on the engagement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRow {
    #[serde(default)]
    pub practice: String,
    #[serde(default)]
    pub resource_role: String,
    #[serde(default)]
    pub project_role: String,
    #[serde(default = "default_potential_resource")]
    pub potential_resource: String,
    #[serde(default = "default_location")]
    pub location: String,
    /// Absent on input means "look it up"; always set once the builder ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hourly_rate: Option<Decimal>,
    /// Hours per project month, month 1 first
    #[serde(default)]
    pub monthly_hours: Vec<Decimal>,
}

fn default_potential_resource() -> String {
    TBD.to_string()
}

fn default_location() -> String {
    "USA".to_string()
}

impl ResourceRow {
    /// Create a resource with the given practice and role and no hours
    pub fn new<P: Into<String>, R: Into<String>>(practice: P, resource_role: R) -> Self {
        Self {
            practice: practice.into(),
            resource_role: resource_role.into(),
            project_role: String::new(),
            potential_resource: default_potential_resource(),
            location: default_location(),
            hourly_rate: None,
            monthly_hours: Vec::new(),
        }
    }

    /// Set the hourly rate
    pub fn with_rate(mut self, rate: Decimal) -> Self {
        self.hourly_rate = Some(rate);
        self
    }

    /// Set the monthly hours
    pub fn with_hours<I: IntoIterator<Item = Decimal>>(mut self, hours: I) -> Self {
        self.monthly_hours = hours.into_iter().collect();
        self
    }

    /// Hourly rate, zero when unresolved
    pub fn rate(&self) -> Decimal {
        self.hourly_rate.unwrap_or(Decimal::ZERO)
    }

    /// Sum of all monthly hours
    pub fn total_hours(&self) -> Decimal {
        self.monthly_hours.iter().copied().sum()
    }

    /// Rate times total hours, unrounded
    pub fn total_fee(&self) -> Decimal {
        self.rate() * self.total_hours()
    }

    /// Label used in documents: the project role when set, else the resource role
    pub fn display_role(&self) -> &str {
        if self.project_role.trim().is_empty() {
            &self.resource_role
        } else {
            &self.project_role
        }
    }
}

/// A named span of project weeks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    pub name: String,
    #[serde(default = "default_start_week")]
    pub start_week: u32,
    /// Zero on input means "start week + 4"
    #[serde(default)]
    pub end_week: u32,
}

fn default_start_week() -> u32 {
    1
}

impl Phase {
    pub fn new<S: Into<String>>(name: S, start_week: u32, end_week: u32) -> Self {
        Self {
            name: name.into(),
            start_week,
            end_week,
        }
    }

    /// The phase list used when a specification supplies none
    pub fn default_plan() -> Vec<Phase> {
        vec![
            Phase::new("Mobilize", 1, 2),
            Phase::new("Requirements", 2, 5),
            Phase::new("Design", 4, 8),
            Phase::new("Build", 7, 16),
            Phase::new("Testing", 14, 20),
            Phase::new("Training", 18, 22),
            Phase::new("Parallel Testing", 20, 24),
            Phase::new("HyperCare", 24, 28),
        ]
    }
}

/// Deliverables belonging to a single phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseDeliverables {
    pub phase: String,
    pub items: Vec<String>,
}

impl PhaseDeliverables {
    pub fn new<S: Into<String>>(phase: S, items: &[&str]) -> Self {
        Self {
            phase: phase.into(),
            items: items.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Deliverables: the `"default"` keyword, a flat list, or an ordered per-phase mapping
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DeliverableSet {
    /// Resolved by the builder from reference data
    #[default]
    Default,
    List(Vec<String>),
    ByPhase(Vec<PhaseDeliverables>),
}

impl DeliverableSet {
    /// The built-in per-phase set used when reference data has none
    pub fn builtin() -> Vec<PhaseDeliverables> {
        vec![
            PhaseDeliverables::new("Mobilize", &["Project Charter", "RAID Logs", "Project Schedule"]),
            PhaseDeliverables::new("Requirements", &["RTM", "Requirements Workshops"]),
            PhaseDeliverables::new("Design", &["Design Document", "Architecture Diagram"]),
            PhaseDeliverables::new("Build", &["Application Development", "Data Integrations"]),
            PhaseDeliverables::new("Testing", &["Test Plan", "UAT Scripts"]),
            PhaseDeliverables::new("Training", &["Training Materials"]),
            PhaseDeliverables::new("Parallel Testing", &["Parallel Test Support"]),
            PhaseDeliverables::new("HyperCare", &["Production Support"]),
        ]
    }

    /// True when no deliverable item exists
    pub fn is_empty(&self) -> bool {
        match self {
            DeliverableSet::Default => false,
            DeliverableSet::List(items) => items.is_empty(),
            DeliverableSet::ByPhase(phases) => phases.iter().all(|p| p.items.is_empty()),
        }
    }

    /// All items in order, phases flattened
    pub fn items(&self) -> Vec<&str> {
        match self {
            DeliverableSet::Default => Vec::new(),
            DeliverableSet::List(items) => items.iter().map(String::as_str).collect(),
            DeliverableSet::ByPhase(phases) => phases
                .iter()
                .flat_map(|p| p.items.iter().map(String::as_str))
                .collect(),
        }
    }
}

impl Serialize for DeliverableSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DeliverableSet::Default => serializer.serialize_str("default"),
            DeliverableSet::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            DeliverableSet::ByPhase(phases) => phase_map::serialize(phases, serializer),
        }
    }
}

impl<'de> Deserialize<'de> for DeliverableSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DeliverableSetVisitor;

        impl<'de> Visitor<'de> for DeliverableSetVisitor {
            type Value = DeliverableSet;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("\"default\", a list of deliverables, or an object of phase lists")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                if v.eq_ignore_ascii_case("default") {
                    Ok(DeliverableSet::Default)
                } else {
                    Err(E::invalid_value(de::Unexpected::Str(v), &self))
                }
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(DeliverableSet::Default)
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut items = Vec::new();
                while let Some(item) = seq.next_element::<String>()? {
                    items.push(item);
                }
                Ok(DeliverableSet::List(items))
            }

            fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Self::Value, A::Error> {
                phase_map::collect(map).map(DeliverableSet::ByPhase)
            }
        }

        deserializer.deserialize_any(DeliverableSetVisitor)
    }
}

/// Serde adapter for an order-preserving `{phase: [items]}` object
pub mod phase_map {
    use super::*;

    pub fn serialize<S: Serializer>(
        phases: &[PhaseDeliverables],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(phases.len()))?;
        for phase in phases {
            map.serialize_entry(&phase.phase, &phase.items)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<PhaseDeliverables>, D::Error> {
        struct PhaseMapVisitor;

        impl<'de> Visitor<'de> for PhaseMapVisitor {
            type Value = Vec<PhaseDeliverables>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping phase names to deliverable lists")
            }

            fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Self::Value, A::Error> {
                collect(map)
            }
        }

        deserializer.deserialize_map(PhaseMapVisitor)
    }

    pub(super) fn collect<'de, A: MapAccess<'de>>(
        mut map: A,
    ) -> Result<Vec<PhaseDeliverables>, A::Error> {
        let mut phases = Vec::new();
        while let Some((phase, items)) = map.next_entry::<String, Vec<String>>()? {
            phases.push(PhaseDeliverables { phase, items });
        }
        Ok(phases)
    }
}

/// Hours and fees summed over every resource row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Totals {
    pub total_hours: Decimal,
    pub total_fees: Decimal,
}

/// Everything a renderer needs, independent of where it came from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentModel {
    #[serde(default)]
    pub project: ProjectInfo,
    #[serde(default)]
    pub sales_team: SalesTeam,
    #[serde(default)]
    pub resources: Vec<ResourceRow>,
    #[serde(default)]
    pub phases: Vec<Phase>,
    #[serde(default)]
    pub deliverables: DeliverableSet,
    /// Totals found on a Summary sheet; informational, renderers use [`ContentModel::totals`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stated_totals: Option<Totals>,
}

impl ContentModel {
    /// Totals computed from the resource rows
    pub fn totals(&self) -> Totals {
        self.resources.iter().fold(Totals::default(), |acc, r| Totals {
            total_hours: acc.total_hours + r.total_hours(),
            total_fees: acc.total_fees + r.total_fee(),
        })
    }

    /// Number of months the hour grid spans: the project duration, widened to
    /// fit the longest monthly-hours sequence
    pub fn month_columns(&self) -> u32 {
        let longest = self
            .resources
            .iter()
            .map(|r| r.monthly_hours.len() as u32)
            .max()
            .unwrap_or(0);
        self.project.duration_months.max(longest)
    }
}

/// Field-wise optional project header, used by clone mode
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectPatch {
    pub client_name: Option<String>,
    pub project_name: Option<String>,
    pub capability_area: Option<String>,
    pub service_type: Option<String>,
    pub contract_type: Option<String>,
    pub project_type: Option<String>,
    pub risk_profile: Option<String>,
    pub pricing_date: Option<String>,
    pub project_start_date: Option<String>,
    pub duration_months: Option<u32>,
}

/// Field-wise optional sales team, used by clone mode
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SalesTeamPatch {
    pub relationship_owner: Option<String>,
    pub sales_rep: Option<String>,
    pub inside_sales: Option<String>,
    pub sales_team_leader: Option<String>,
}

/// A partial content model: only present fields overwrite the target
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentPatch {
    pub project: Option<ProjectPatch>,
    pub sales_team: Option<SalesTeamPatch>,
    pub resources: Option<Vec<ResourceRow>>,
    pub phases: Option<Vec<Phase>>,
    pub deliverables: Option<DeliverableSet>,
}

fn merge<T: Clone>(target: &mut T, value: &Option<T>) {
    if let Some(v) = value {
        *target = v.clone();
    }
}

impl ContentPatch {
    /// True when the patch changes table-shaped content (rows, phases, deliverables)
    /// or the duration, which changes the month column layout
    pub fn is_structural(&self) -> bool {
        self.resources.is_some()
            || self.phases.is_some()
            || self.deliverables.is_some()
            || self
                .project
                .as_ref()
                .map_or(false, |p| p.duration_months.is_some())
    }

    /// Overwrite the fields present in this patch
    pub fn apply_to(&self, model: &mut ContentModel) {
        if let Some(p) = &self.project {
            let target = &mut model.project;
            merge(&mut target.client_name, &p.client_name);
            merge(&mut target.project_name, &p.project_name);
            merge(&mut target.capability_area, &p.capability_area);
            merge(&mut target.service_type, &p.service_type);
            merge(&mut target.contract_type, &p.contract_type);
            merge(&mut target.project_type, &p.project_type);
            merge(&mut target.risk_profile, &p.risk_profile);
            merge(&mut target.pricing_date, &p.pricing_date);
            merge(&mut target.project_start_date, &p.project_start_date);
            merge(&mut target.duration_months, &p.duration_months);
        }
        if let Some(s) = &self.sales_team {
            let target = &mut model.sales_team;
            merge(&mut target.relationship_owner, &s.relationship_owner);
            merge(&mut target.sales_rep, &s.sales_rep);
            merge(&mut target.inside_sales, &s.inside_sales);
            merge(&mut target.sales_team_leader, &s.sales_team_leader);
        }
        merge(&mut model.resources, &self.resources);
        merge(&mut model.phases, &self.phases);
        merge(&mut model.deliverables, &self.deliverables);
        if self.resources.is_some() {
            model.stated_totals = None;
        }
    }
}
