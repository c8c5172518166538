//! Document text overrides and their built-in defaults

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One row of the miscellaneous provisions table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiscProvision {
    pub provision: String,
    pub narrative: String,
}

impl MiscProvision {
    pub fn new<P: Into<String>, N: Into<String>>(provision: P, narrative: N) -> Self {
        Self {
            provision: provision.into(),
            narrative: narrative.into(),
        }
    }
}

/// User-supplied document text; every absent field falls back to a default
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeOverrides {
    pub msa_date: Option<String>,
    /// About text; may use the `{date}`, `{client_name}`, `{msa_date}`,
    /// `{service_type}`, `{project_name}` and `{capability_area}` fields
    pub about: Option<String>,
    pub scope_intro: Option<String>,
    pub scope_items: Option<Vec<String>>,
    pub deliverables: Option<Vec<String>>,
    pub client_responsibilities: Option<Vec<String>>,
    pub assumptions: Option<Vec<String>>,
    pub out_of_scope: Option<Vec<String>>,
    pub misc_provisions: Option<Vec<MiscProvision>>,
}

impl ScopeOverrides {
    /// Load overrides from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|e| Error::json(path.display().to_string(), e))
    }
}

/// Boilerplate About text, one paragraph per blank-line-separated block
pub const DEFAULT_ABOUT: &str = "This Statement of Work (\"SOW\"), entered into as of {date}, is by and between Donyati, LLC (\"Donyati\") and {client_name} (\"Client\"). This SOW is governed by the terms and conditions of the Master Services Agreement (\"MSA\") dated {msa_date}, between Donyati and Client. In the event of any conflict between the terms of this SOW and the MSA, the terms of this SOW shall prevail with respect to the Services described herein.

The primary goal of this engagement is to provide {service_type} services for {project_name}. Donyati will leverage its expertise in {capability_area} to deliver the Services outlined in this SOW.";

pub const DEFAULT_SCOPE_INTRO: &str =
    "Under this SOW, Donyati will work with Client to provide Services noted below.";

pub const DEFAULT_DELIVERABLES_NOTE: &str =
    "Deliverables will be defined during the engagement based on agreed scope.";

pub const CLIENT_RESPONSIBILITIES_INTRO: &str = "Donyati will work directly with the Client to perform Services under this SOW. To ensure the project is successful, Client agrees to:";

pub const ASSUMPTIONS_INTRO: &str =
    "The following general assumptions have been made in the development of this SOW:";

pub const INVOICE_TERMS: &str = "Invoices will be provided monthly at the end of the service month, and payment is due in U.S. currency within thirty (30) days of receipt.";

pub const MSA_DATE_PLACEHOLDER: &str = "[MSA DATE]";

pub const START_DATE_PLACEHOLDER: &str = "[START DATE]";

pub const DEFAULT_PROJECT_NAME: &str = "Professional Services";

/// Scope bullet generated for a staffed role
pub fn scope_item_for_role(role: &str) -> String {
    format!("Provide {} services as outlined in this SOW", role)
}

/// Fees paragraph naming the contract type
pub fn fees_intro(contract_type: &str) -> String {
    format!(
        "Donyati shall charge, and Client shall pay for the Services under this SOW based on {} fees.",
        contract_type
    )
}

/// Sentence naming the service commencement date
pub fn commencement(start_date: &str) -> String {
    format!("The Service Commencement Date is {}.", start_date)
}

pub fn default_client_responsibilities() -> Vec<String> {
    [
        "Provide a designated representative to act as the main point of Client contact for the Donyati Consultants.",
        "Confirm appropriate stakeholders and support resources are available as requested by Donyati consultants.",
        "Provide appropriate Application documentation access to Donyati resources.",
        "Provide timely responses to questions and clarifications within two (2) business days.",
        "All management functions and decisions related to Services, including without limitation evaluation and acceptance of Deliverables, will remain the responsibility of Client.",
        "Additional Client Responsibilities: In connection with Donyati's provision of Services, Client shall provide appropriate review and approval of deliverables within two (2) business days of receipt or as agreed to by both parties.",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

pub fn default_assumptions() -> Vec<String> {
    [
        "All services will be provided in English, including but not limited to project documents, presentations, communications, training, workshops, and meetings.",
        "All Donyati resources will work from Donyati sites (including home offices), VPN access and/or laptop will be provided as applicable.",
        "Standard business hours for US are 9:00 AM \u{2013} 5:00 PM ET.",
        "Client will provide Donyati access to all necessary systems and environments to commence work in a timely manner.",
        "Donyati will not access Client Production source systems.",
        "In the event that the project start date, as specified in the SOW, is delayed by Client for more than thirty (30) days, Donyati reserves the right to re-estimate the project considering resource availability.",
        "If Client requests Donyati to begin work on this project prior to signatures, this SOW is deemed as signed by Client on the date work begins.",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

pub fn default_out_of_scope() -> Vec<String> {
    vec!["Services not explicitly included in this SOW are implicitly excluded from this engagement.".to_string()]
}

pub fn default_misc_provisions() -> Vec<MiscProvision> {
    vec![
        MiscProvision::new(
            "Purchase Order Number (PO#)",
            "Client shall provide Donyati with a Purchase Order Number (PO#) prior to commencement of Services.",
        ),
        MiscProvision::new(
            "Scope Changes",
            "Changes to the scope of services will be documented through a formal Change Order process and require written approval from both parties.",
        ),
        MiscProvision::new(
            "Deliverables",
            "All deliverables provided to Client under this SOW shall be considered accepted unless Client provides written notice of rejection within five (5) business days of receipt.",
        ),
        MiscProvision::new(
            "Termination for Convenience",
            "This SOW may be terminated for convenience by either party with thirty (30) days prior written notice.",
        ),
    ]
}

/// About text with its `{field}` names substituted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilledText {
    pub text: String,
    /// Field names that had no value; each rendered as empty text
    pub unknown: Vec<String>,
}

fn is_field_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

/// Substitute `{field}` names in an About text
///
/// A `{name}` that is not among `fields` renders empty and is listed in
/// [`FilledText::unknown`]. Braces around anything that is not a field name
/// are kept as written.
pub fn fill_about(template: &str, fields: &[(&str, &str)]) -> FilledText {
    let mut filled = FilledText {
        text: String::with_capacity(template.len()),
        unknown: Vec::new(),
    };
    let out = &mut filled.text;
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let name = &after[..close];
                match fields.iter().find(|(key, _)| *key == name) {
                    Some((_, value)) => out.push_str(value),
                    None if is_field_name(name) => {
                        if !filled.unknown.iter().any(|u| u == name) {
                            filled.unknown.push(name.to_string());
                        }
                    }
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_overrides_partial_json() {
        let o: ScopeOverrides =
            serde_json::from_str(r#"{"scope_items": ["Build the model"], "msa_date": "Jan 1"}"#)
                .unwrap();
        assert_eq!(o.scope_items, Some(vec!["Build the model".to_string()]));
        assert_eq!(o.msa_date.as_deref(), Some("Jan 1"));
        assert_eq!(o.assumptions, None);
    }

    #[test]
    fn test_fill_about() {
        let filled = fill_about(
            "{client_name} on {date}, {unknown}",
            &[("client_name", "IEEE"), ("date", "May 01, 2026")],
        );
        assert_eq!(filled.text, "IEEE on May 01, 2026, ");
        assert_eq!(filled.unknown, vec!["unknown".to_string()]);
    }

    #[test]
    fn test_fill_about_keeps_non_field_braces() {
        let filled = fill_about("Costs {in USD} for {client_name}", &[("client_name", "IEEE")]);
        assert_eq!(filled.text, "Costs {in USD} for IEEE");
        assert!(filled.unknown.is_empty());
    }

    #[test]
    fn test_default_about_has_two_paragraphs() {
        assert_eq!(DEFAULT_ABOUT.split("\n\n").count(), 2);
        assert_eq!(default_misc_provisions().len(), 4);
    }
}
