//! Document renderer
//!
//! Builds the template [`Context`] for a Statement of Work from a content
//! model and the user's [`ScopeOverrides`], then renders it into the
//! built-in template or a user-supplied one with the same placeholders.
//!
//! Precedence for every section is: override, then a value derived from the
//! model, then a built-in default. Values the model cannot supply render as
//! visible markers (`TBD`, `[MSA DATE]`, `[START DATE]`), never as blanks.

use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sowgen_core::scope::{self, MiscProvision};
use sowgen_core::{dates, money, ContentModel, DeliverableSet, ScopeOverrides, Totals, TBD};
use sowgen_docx::{render, Context, DocxPackage, RenderReport};

use crate::error::{Error, Result};

/// Document settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentOptions {
    /// Template `.docx`; the built-in template when `None`
    pub template: Option<PathBuf>,
    /// Document date; the pricing date, else today, when `None`
    pub date: Option<String>,
}

impl DocumentOptions {
    fn document_date(&self, model: &ContentModel) -> String {
        match &self.date {
            Some(date) => dates::display_date(date),
            None if !model.project.pricing_date.trim().is_empty() => {
                dates::display_date(&model.project.pricing_date)
            }
            None => dates::today(),
        }
    }
}

/// What the JSON-only mode writes: the model plus every resolved section
#[derive(Debug, Serialize)]
pub struct DocumentContent<'a> {
    pub model: &'a ContentModel,
    pub totals: Totals,
    pub context: &'a Context,
}

fn or_marker(value: &str, marker: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        marker.to_string()
    } else {
        value.to_string()
    }
}

/// Resolve every template value for a model
pub fn document_context(model: &ContentModel, overrides: &ScopeOverrides, date: &str) -> Context {
    build_context(model, overrides, date).0
}

/// The context plus the About field names that had no value
fn build_context(model: &ContentModel, overrides: &ScopeOverrides, date: &str) -> (Context, Vec<String>) {
    let project = &model.project;
    let mut ctx = Context::new();

    let client_name = or_marker(&project.client_name, TBD);
    let project_name = or_marker(&project.project_name, scope::DEFAULT_PROJECT_NAME);
    let msa_date = overrides
        .msa_date
        .as_deref()
        .map(|d| or_marker(d, scope::MSA_DATE_PLACEHOLDER))
        .unwrap_or_else(|| scope::MSA_DATE_PLACEHOLDER.to_string());
    let service_type = or_marker(&project.service_type, "professional");
    let capability_area = or_marker(&project.capability_area, "technology consulting");
    let start_date = if project.project_start_date.trim().is_empty() {
        scope::START_DATE_PLACEHOLDER.to_string()
    } else {
        dates::display_date(&project.project_start_date)
    };
    let contract_type = or_marker(&project.contract_type, "T&M");

    ctx.set_text("client_name", client_name.as_str())
        .set_text("project_name", project_name.as_str())
        .set_text("date", date)
        .set_text("msa_date", msa_date.as_str())
        .set_text("service_type", service_type.as_str())
        .set_text("capability_area", capability_area.as_str())
        .set_text("contract_type", contract_type.as_str())
        .set_text("project_start_date", start_date.as_str());

    let about = overrides.about.as_deref().unwrap_or(scope::DEFAULT_ABOUT);
    let about = scope::fill_about(
        about,
        &[
            ("date", date),
            ("client_name", &client_name),
            ("msa_date", &msa_date),
            ("service_type", &service_type),
            ("project_name", &project_name),
            ("capability_area", &capability_area),
        ],
    );
    for name in &about.unknown {
        log::warn!("about text field {{{}}} has no value; rendered empty", name);
    }
    ctx.set_list("about_paragraphs", paragraphs(&about.text));

    ctx.set_text(
        "scope_intro",
        overrides
            .scope_intro
            .as_deref()
            .unwrap_or(scope::DEFAULT_SCOPE_INTRO),
    );
    let scope_items = match &overrides.scope_items {
        Some(items) => items.clone(),
        None => role_scope_items(model),
    };
    ctx.set_list("scope_items", scope_items);

    set_deliverables(&mut ctx, model, overrides);

    ctx.set_text("client_responsibilities_intro", scope::CLIENT_RESPONSIBILITIES_INTRO)
        .set_list(
            "client_responsibilities",
            overrides
                .client_responsibilities
                .clone()
                .unwrap_or_else(scope::default_client_responsibilities),
        );

    ctx.set_text("fees_intro", scope::fees_intro(&contract_type))
        .set_text("commencement", scope::commencement(&start_date))
        .set_text("invoice_terms", scope::INVOICE_TERMS);
    set_fees(&mut ctx, model);

    ctx.set_text("assumptions_intro", scope::ASSUMPTIONS_INTRO)
        .set_list(
            "assumptions",
            overrides
                .assumptions
                .clone()
                .unwrap_or_else(scope::default_assumptions),
        )
        .set_list(
            "out_of_scope",
            overrides
                .out_of_scope
                .clone()
                .unwrap_or_else(scope::default_out_of_scope),
        );

    let misc = overrides
        .misc_provisions
        .clone()
        .unwrap_or_else(scope::default_misc_provisions);
    ctx.set_records("misc_section", section_if(!misc.is_empty()))
        .set_records("misc", misc.iter().map(misc_record).collect());

    (ctx, about.unknown)
}

/// Blank-line separated blocks, each trimmed, empties dropped
fn paragraphs(text: &str) -> Vec<String> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// One scope bullet per distinct role, in first-seen order
fn role_scope_items(model: &ContentModel) -> Vec<String> {
    let mut seen = BTreeSet::new();
    model
        .resources
        .iter()
        .map(|r| r.display_role().trim())
        .filter(|role| !role.is_empty() && seen.insert(role.to_string()))
        .map(scope::scope_item_for_role)
        .collect()
}

fn set_deliverables(ctx: &mut Context, model: &ContentModel, overrides: &ScopeOverrides) {
    let mut flat = Vec::new();
    let mut by_phase = Vec::new();

    match (&overrides.deliverables, &model.deliverables) {
        (Some(items), _) => flat = items.clone(),
        (None, DeliverableSet::List(items)) => flat = items.clone(),
        (None, DeliverableSet::ByPhase(phases)) => {
            by_phase = phases
                .iter()
                .filter(|p| !p.items.is_empty())
                .map(|p| {
                    let mut record = Context::new();
                    record
                        .set_text("phase", p.phase.as_str())
                        .set_list("items", p.items.iter().cloned());
                    record
                })
                .collect();
        }
        (None, DeliverableSet::Default) => {
            by_phase = DeliverableSet::builtin()
                .into_iter()
                .map(|p| {
                    let mut record = Context::new();
                    record.set_text("phase", p.phase).set_list("items", p.items);
                    record
                })
                .collect();
        }
    }

    let note = if flat.is_empty() && by_phase.is_empty() {
        vec![scope::DEFAULT_DELIVERABLES_NOTE.to_string()]
    } else {
        Vec::new()
    };
    ctx.set_list("deliverables", flat)
        .set_records("phase_deliverables", by_phase)
        .set_list("deliverables_note", note);
}

/// Engagement Fees table rows and totals
fn set_fees(ctx: &mut Context, model: &ContentModel) {
    let rows = model
        .resources
        .iter()
        .map(|r| {
            let mut record = Context::new();
            record
                .set_text(
                    "practice_role",
                    format!("{} / {}", or_marker(&r.practice, TBD), or_marker(&r.resource_role, TBD)),
                )
                .set_text("project_role", or_marker(r.display_role(), TBD))
                .set_text("resource", or_marker(&r.potential_resource, TBD))
                .set_text("location", or_marker(&r.location, TBD))
                .set_text("rate", money::format_rate(r.rate()))
                .set_text("hours", money::format_hours(r.total_hours()))
                .set_text("total", format!("${}", money::format_money(r.total_fee())));
            record
        })
        .collect();
    ctx.set_records("fees_table", section_if(!model.resources.is_empty()))
        .set_records("fees", rows);

    let totals = model.totals();
    ctx.set_text("fees_total_hours", money::format_hours(totals.total_hours))
        .set_text(
            "fees_total",
            format!("${}", money::format_money(totals.total_fees)),
        );
}

/// A `{#name}` region rendered once when `present`, dropped otherwise
fn section_if(present: bool) -> Vec<Context> {
    if present {
        vec![Context::new()]
    } else {
        Vec::new()
    }
}

fn misc_record(provision: &MiscProvision) -> Context {
    Context::new()
        .with_text("provision", provision.provision.as_str())
        .with_text("narrative", provision.narrative.as_str())
}

fn load_template(options: &DocumentOptions) -> Result<DocxPackage> {
    match &options.template {
        Some(path) => Ok(DocxPackage::open(path)?),
        None => Ok(DocxPackage::builtin()),
    }
}

/// Render the document in memory
pub fn render_document(
    model: &ContentModel,
    overrides: &ScopeOverrides,
    options: &DocumentOptions,
) -> Result<(DocxPackage, RenderReport)> {
    let mut package = load_template(options)?;
    let (context, unknown) = build_context(model, overrides, &options.document_date(model));
    let mut report = render(&mut package, &context)?;
    report.unresolved.extend(unknown);
    log::debug!(
        "rendered document: {} blocks expanded, {} prototypes removed",
        report.expanded,
        report.removed_prototypes
    );
    Ok((package, report))
}

/// Render the document and write it atomically to `path`
pub fn write_document<P: AsRef<Path>>(
    model: &ContentModel,
    overrides: &ScopeOverrides,
    options: &DocumentOptions,
    path: P,
) -> Result<RenderReport> {
    let path = path.as_ref();
    let (package, report) = render_document(model, overrides, options)?;
    package.save(path)?;
    log::info!("wrote document '{}'", path.display());
    Ok(report)
}

/// Write the resolved content as pretty JSON instead of a document
pub fn write_document_json<P: AsRef<Path>>(
    model: &ContentModel,
    overrides: &ScopeOverrides,
    options: &DocumentOptions,
    path: P,
) -> Result<()> {
    let path = path.as_ref();
    let context = document_context(model, overrides, &options.document_date(model));
    let content = DocumentContent {
        model,
        totals: model.totals(),
        context: &context,
    };
    let json = serde_json::to_vec_pretty(&content)
        .map_err(|e| Error::output(path, std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let write = || -> std::io::Result<()> {
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&json)?;
        tmp.write_all(b"\n")?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    };
    write().map_err(|e| Error::output(path, e))?;
    log::info!("wrote document content '{}'", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use sowgen_core::{PhaseDeliverables, ResourceRow};

    fn model() -> ContentModel {
        let mut model = ContentModel::default();
        model.project.client_name = "IEEE".into();
        model.project.project_name = "Planning Rollout".into();
        model.project.project_start_date = "2026-02-15".into();
        model.resources = vec![
            ResourceRow::new("EPM_Practice_USA", "Project Manager")
                .with_rate(Decimal::from(230))
                .with_hours([Decimal::from(24), Decimal::from(168)]),
            ResourceRow::new("EPM_Practice_USA", "Project Manager")
                .with_rate(Decimal::from(230))
                .with_hours([Decimal::from(8)]),
        ];
        model.deliverables = DeliverableSet::ByPhase(vec![
            PhaseDeliverables::new("Mobilize", &["Project Charter"]),
            PhaseDeliverables::new("Build", &[]),
        ]);
        model
    }

    #[test]
    fn test_defaults_and_markers() {
        let ctx = document_context(&model(), &ScopeOverrides::default(), "March 01, 2026");

        let about = ctx.list("about_paragraphs").unwrap();
        assert_eq!(about.len(), 2);
        assert!(about[0].contains("entered into as of March 01, 2026"));
        assert!(about[0].contains("dated [MSA DATE]"));
        assert!(about[1].contains("provide professional services for Planning Rollout"));

        assert_eq!(
            ctx.list("scope_items").unwrap(),
            ["Provide Project Manager services as outlined in this SOW"]
        );
        assert_eq!(
            ctx.text("commencement"),
            Some("The Service Commencement Date is February 15, 2026.")
        );
        assert_eq!(ctx.list("client_responsibilities").unwrap().len(), 6);
        assert_eq!(ctx.records("misc").unwrap().len(), 4);
    }

    #[test]
    fn test_missing_values_are_visible() {
        let ctx = document_context(&ContentModel::default(), &ScopeOverrides::default(), "today");
        assert_eq!(ctx.text("client_name"), Some(TBD));
        assert_eq!(ctx.text("project_start_date"), Some("[START DATE]"));
        assert_eq!(
            ctx.list("deliverables_note").unwrap(),
            [scope::DEFAULT_DELIVERABLES_NOTE]
        );
        assert_eq!(ctx.records("fees").unwrap().len(), 0);
        assert_eq!(ctx.text("fees_total"), Some("$0.00"));
    }

    #[test]
    fn test_overrides_win() {
        let overrides = ScopeOverrides {
            msa_date: Some("January 5, 2024".into()),
            scope_items: Some(vec!["Build the planning model".into()]),
            deliverables: Some(vec!["Model".into(), "Runbook".into()]),
            ..ScopeOverrides::default()
        };
        let ctx = document_context(&model(), &overrides, "March 01, 2026");

        assert_eq!(ctx.list("scope_items").unwrap(), ["Build the planning model"]);
        assert_eq!(ctx.list("deliverables").unwrap(), ["Model", "Runbook"]);
        assert_eq!(ctx.records("phase_deliverables").unwrap().len(), 0);
        assert!(ctx.list("deliverables_note").unwrap().is_empty());
        assert!(ctx.list("about_paragraphs").unwrap()[0].contains("dated January 5, 2024"));
    }

    #[test]
    fn test_phase_deliverables_skip_empty_phases() {
        let ctx = document_context(&model(), &ScopeOverrides::default(), "d");
        let phases = ctx.records("phase_deliverables").unwrap();
        assert_eq!(phases.len(), 1);
        assert_eq!(phases[0].text("phase"), Some("Mobilize"));
        assert_eq!(phases[0].list("items").unwrap(), ["Project Charter"]);
    }

    #[test]
    fn test_fee_rows() {
        let ctx = document_context(&model(), &ScopeOverrides::default(), "d");
        let fees = ctx.records("fees").unwrap();
        assert_eq!(fees[0].text("practice_role"), Some("EPM_Practice_USA / Project Manager"));
        assert_eq!(fees[0].text("rate"), Some("$230"));
        assert_eq!(fees[0].text("hours"), Some("192"));
        assert_eq!(fees[0].text("total"), Some("$44,160.00"));
        assert_eq!(ctx.text("fees_total_hours"), Some("200"));
        assert_eq!(ctx.text("fees_total"), Some("$46,000.00"));
    }

    #[test]
    fn test_empty_sections_are_dropped() {
        let overrides = ScopeOverrides {
            misc_provisions: Some(Vec::new()),
            ..ScopeOverrides::default()
        };
        let ctx = document_context(&ContentModel::default(), &overrides, "d");
        assert!(ctx.records("misc_section").unwrap().is_empty());
        assert!(ctx.records("fees_table").unwrap().is_empty());

        let ctx = document_context(&model(), &ScopeOverrides::default(), "d");
        assert_eq!(ctx.records("misc_section").unwrap().len(), 1);
        assert_eq!(ctx.records("fees_table").unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_about_fields_render_empty() {
        let overrides = ScopeOverrides {
            about: Some("For {client_name} see {unknown_field}".into()),
            ..ScopeOverrides::default()
        };
        let (ctx, unknown) = build_context(&model(), &overrides, "d");
        assert_eq!(ctx.list("about_paragraphs").unwrap(), ["For IEEE see"]);
        assert_eq!(unknown, ["unknown_field"]);
    }

    #[test]
    fn test_document_date_precedence() {
        let mut model = model();
        let explicit = DocumentOptions {
            date: Some("2026-03-01".into()),
            ..DocumentOptions::default()
        };
        assert_eq!(explicit.document_date(&model), "March 01, 2026");

        model.project.pricing_date = "01/29/2026".into();
        assert_eq!(DocumentOptions::default().document_date(&model), "January 29, 2026");
    }
}
