//! Content model builder
//!
//! Turns a pricing specification into a normalized [`ContentModel`]. Two
//! sources are supported: the JSON input schema, and a pricing workbook laid
//! out like the one [`crate::workbook`] renders (header fields on rows 1-4 of
//! Pricing Details, resources from row 7, optional Summary, Timeline and
//! Deliverables sheets).
//!
//! Whatever the source, the model goes through the same normalization:
//! missing rates are resolved from [`ReferenceData`], the schedule is
//! clamped to what the sheets can hold, the `"default"` deliverables keyword
//! is expanded and an empty project name is inferred. Recoverable problems
//! are collected as [`BuildWarning`]s instead of failing the build.

use std::fmt;
use std::path::Path;

use rust_decimal::Decimal;
use sowgen_core::{
    dates, money, scope, ContentModel, DeliverableSet, Error as CoreError, Phase,
    PhaseDeliverables, RateSource, ReferenceData, ResourceRow, Totals, PRICING_SHEET, TBD,
};
use sowgen_xlsx::{recalculate, CellAddress, CellValue, Workbook, Worksheet, XlsxReader};

use crate::error::{Error, Result};
use crate::workbook::{MAX_DURATION_MONTHS, MAX_MONTH_COLUMNS, MAX_WEEK};

/// Optional sheet holding project name, duration and totals
pub const SUMMARY_SHEET: &str = "Summary";

/// Names accepted for the Gantt sheet, preferred first
pub const TIMELINE_SHEETS: [&str; 2] = ["Timeline", "Timeline 36 Weeks"];

/// Optional sheet holding deliverables by phase
pub const DELIVERABLES_SHEET: &str = "Deliverables";

/// First resource row on Pricing Details (row 7)
const FIRST_RESOURCE_ROW: u32 = 6;

/// Resource table header row on Pricing Details (row 6)
const RESOURCE_HEADER_ROW: u32 = 5;

/// First month column on Pricing Details (column G)
const FIRST_MONTH_COL: u16 = 6;

/// First phase row on the Timeline sheet (row 6)
const FIRST_PHASE_ROW: u32 = 5;

/// Summary labels are searched in this many leading rows
const SUMMARY_SCAN_ROWS: u32 = 30;

/// Build settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Replaces the reference data fallback default rate
    pub default_rate: Option<Decimal>,
}

/// A problem the builder recovered from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildWarning {
    /// No rate table entry; a fallback rate was used
    FallbackRate {
        practice: String,
        role: String,
        rate: Decimal,
        source: RateSource,
    },
    /// A resource's hour grid does not match the project duration
    HoursMismatch {
        role: String,
        months: usize,
        duration: u32,
    },
    /// The duration does not fit on the Timeline sheet and has been capped
    DurationClamped { requested: u32, limit: u32 },
    /// A resource's hour grid ran past the last month column and was cut
    HoursTruncated {
        role: String,
        months: usize,
        limit: usize,
    },
    /// A phase's week span was out of range and has been adjusted
    PhaseClamped {
        phase: String,
        start_week: u32,
        end_week: u32,
    },
    /// Totals on the Summary sheet differ from the resource rows
    StatedTotalsDiffer { stated: Totals, computed: Totals },
}

impl fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildWarning::FallbackRate {
                practice,
                role,
                rate,
                source,
            } => {
                let origin = match source {
                    RateSource::Regional(keyword) => format!("'{}' regional fallback", keyword),
                    _ => "default fallback".to_string(),
                };
                write!(
                    f,
                    "no rate for '{}' / '{}'; using {} ({})",
                    practice,
                    role,
                    money::format_rate(*rate),
                    origin
                )
            }
            BuildWarning::HoursMismatch {
                role,
                months,
                duration,
            } => write!(
                f,
                "'{}' has {} months of hours but the project runs {} months",
                role, months, duration
            ),
            BuildWarning::DurationClamped { requested, limit } => write!(
                f,
                "duration of {} months exceeds the sheet width; capped at {} months",
                requested, limit
            ),
            BuildWarning::HoursTruncated {
                role,
                months,
                limit,
            } => write!(
                f,
                "'{}' has {} months of hours; only the first {} fit on the sheet",
                role, months, limit
            ),
            BuildWarning::PhaseClamped {
                phase,
                start_week,
                end_week,
            } => write!(
                f,
                "phase '{}' adjusted to weeks {}-{}",
                phase, start_week, end_week
            ),
            BuildWarning::StatedTotalsDiffer { stated, computed } => write!(
                f,
                "Summary totals ({} hours, {}) differ from resource rows ({} hours, {}); using resource rows",
                money::format_hours(stated.total_hours),
                money::format_money(stated.total_fees),
                money::format_hours(computed.total_hours),
                money::format_money(computed.total_fees)
            ),
        }
    }
}

/// A built model plus everything the builder had to recover from
#[derive(Debug, Clone, PartialEq)]
pub struct BuildReport {
    pub model: ContentModel,
    pub warnings: Vec<BuildWarning>,
}

/// Builds content models against one set of reference data
#[derive(Debug, Clone)]
pub struct Builder<'a> {
    reference: &'a ReferenceData,
    options: BuildOptions,
}

impl<'a> Builder<'a> {
    pub fn new(reference: &'a ReferenceData, options: BuildOptions) -> Self {
        Self { reference, options }
    }

    /// Build from a `.json` specification or a `.xlsx` pricing workbook, by extension
    pub fn from_path<P: AsRef<Path>>(&self, path: P) -> Result<BuildReport> {
        let path = path.as_ref();
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .map_or(false, |e| e.eq_ignore_ascii_case("json"));
        if is_json {
            self.from_json_file(path)
        } else {
            self.from_workbook_file(path)
        }
    }

    /// Build from a JSON specification file
    pub fn from_json_file<P: AsRef<Path>>(&self, path: P) -> Result<BuildReport> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| CoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.from_json_str(&text, &path.display().to_string())
    }

    /// Build from JSON text; `origin` names the document in errors
    pub fn from_json_str(&self, text: &str, origin: &str) -> Result<BuildReport> {
        let model: ContentModel =
            serde_json::from_str(text).map_err(|e| CoreError::json(origin, e))?;
        log::info!(
            "read specification '{}': {} resources, {} phases",
            origin,
            model.resources.len(),
            model.phases.len()
        );
        Ok(self.normalize(model))
    }

    /// Build from a pricing workbook file
    pub fn from_workbook_file<P: AsRef<Path>>(&self, path: P) -> Result<BuildReport> {
        let path = path.as_ref();
        let model = load_workbook(path)?;
        Ok(self.normalize(model))
    }

    /// Build from a workbook already in memory; `file` names it in errors
    pub fn from_workbook(&self, workbook: Workbook, file: &str) -> Result<BuildReport> {
        let model = read_model(workbook, file)?;
        Ok(self.normalize(model))
    }

    /// Apply rate resolution, schedule clamping and deliverable expansion
    pub fn normalize(&self, mut model: ContentModel) -> BuildReport {
        let mut warnings = Vec::new();

        let requested = model.project.duration_months;
        if requested > MAX_DURATION_MONTHS {
            model.project.duration_months = MAX_DURATION_MONTHS;
            warnings.push(BuildWarning::DurationClamped {
                requested,
                limit: MAX_DURATION_MONTHS,
            });
        }

        let max_months = usize::from(MAX_MONTH_COLUMNS);
        for resource in &mut model.resources {
            if resource.monthly_hours.len() > max_months {
                warnings.push(BuildWarning::HoursTruncated {
                    role: resource.display_role().to_string(),
                    months: resource.monthly_hours.len(),
                    limit: max_months,
                });
                resource.monthly_hours.truncate(max_months);
            }

            if resource.hourly_rate.is_none() {
                let resolution = self.reference.resolve_rate(
                    &resource.practice,
                    &resource.resource_role,
                    self.options.default_rate,
                );
                if resolution.is_fallback() {
                    warnings.push(BuildWarning::FallbackRate {
                        practice: resource.practice.clone(),
                        role: resource.resource_role.clone(),
                        rate: resolution.rate,
                        source: resolution.source.clone(),
                    });
                } else {
                    log::debug!(
                        "rate for '{}' / '{}' from table: {}",
                        resource.practice,
                        resource.resource_role,
                        resolution.rate
                    );
                }
                resource.hourly_rate = Some(resolution.rate);
            }

            let months = resource.monthly_hours.len();
            if months > 0 && months != model.project.duration_months as usize {
                warnings.push(BuildWarning::HoursMismatch {
                    role: resource.display_role().to_string(),
                    months,
                    duration: model.project.duration_months,
                });
            }
        }

        for phase in &mut model.phases {
            let (start, end) = (phase.start_week, phase.end_week);
            phase.start_week = start.clamp(1, MAX_WEEK);
            let wanted_end = if end == 0 {
                phase.start_week.saturating_add(4)
            } else {
                end
            };
            phase.end_week = wanted_end.clamp(phase.start_week, MAX_WEEK);
            if phase.start_week != start || phase.end_week != wanted_end {
                warnings.push(BuildWarning::PhaseClamped {
                    phase: phase.name.clone(),
                    start_week: phase.start_week,
                    end_week: phase.end_week,
                });
            }
        }

        if model.deliverables == DeliverableSet::Default {
            model.deliverables = DeliverableSet::ByPhase(self.reference.default_deliverables());
        }

        if model.project.project_name.trim().is_empty() {
            model.project.project_name = infer_project_name(&model);
        }

        if let Some(stated) = model.stated_totals {
            let computed = model.totals();
            if money::round_cents(stated.total_fees) != money::round_cents(computed.total_fees)
                || stated.total_hours != computed.total_hours
            {
                warnings.push(BuildWarning::StatedTotalsDiffer { stated, computed });
            }
        }

        for warning in &warnings {
            log::warn!("{}", warning);
        }
        BuildReport { model, warnings }
    }
}

/// Read a pricing workbook into a model without normalizing it
pub(crate) fn load_workbook(path: &Path) -> Result<ContentModel> {
    let workbook = XlsxReader::read_file(path).map_err(|e| Error::workbook(path, e))?;
    read_model(workbook, &path.display().to_string())
}

fn read_model(mut workbook: Workbook, file: &str) -> Result<ContentModel> {
    let stats = recalculate(&mut workbook).map_err(|e| Error::workbook(file, e))?;
    if stats.cells_calculated > 0 {
        log::debug!(
            "'{}': recalculated {} of {} formulas without cached values",
            file,
            stats.cells_calculated,
            stats.formula_count
        );
    }

    let model = read_workbook(&workbook, file)?;
    log::info!(
        "read workbook '{}': {} resources, {} phases",
        file,
        model.resources.len(),
        model.phases.len()
    );
    Ok(model)
}

/// Project name from capability and service type, or the generic name
fn infer_project_name(model: &ContentModel) -> String {
    let joined = format!(
        "{} {}",
        model.project.capability_area.trim(),
        model.project.service_type.trim()
    );
    let joined = joined.trim();
    if joined.is_empty() {
        scope::DEFAULT_PROJECT_NAME.to_string()
    } else {
        joined.to_string()
    }
}

fn read_workbook(workbook: &Workbook, file: &str) -> Result<ContentModel> {
    let sheet = workbook
        .sheet(PRICING_SHEET)
        .ok_or_else(|| CoreError::MissingSheet {
            file: file.to_string(),
            sheet: PRICING_SHEET.to_string(),
        })?;

    let mut model = ContentModel::default();
    read_header(sheet, file, &mut model)?;

    let month_headers = month_header_count(sheet);
    model.resources = read_resources(sheet, month_headers);
    // The table header is the best duration hint until Summary says otherwise
    if month_headers > 0 {
        model.project.duration_months = month_headers as u32;
    }

    match workbook.sheet(SUMMARY_SHEET) {
        Some(summary) => read_summary(summary, &mut model),
        None => log::debug!("'{}': no {} sheet", file, SUMMARY_SHEET),
    }

    match TIMELINE_SHEETS.iter().find_map(|name| workbook.sheet(name)) {
        Some(timeline) => model.phases = read_phases(timeline),
        None => log::debug!("'{}': no timeline sheet", file),
    }

    model.deliverables = match workbook.sheet(DELIVERABLES_SHEET) {
        Some(deliverables) => read_deliverables(deliverables),
        None => {
            log::debug!("'{}': no {} sheet", file, DELIVERABLES_SHEET);
            DeliverableSet::List(Vec::new())
        }
    };

    Ok(model)
}

/// Header cells on rows 1-4 of Pricing Details
fn read_header(sheet: &Worksheet, file: &str, model: &mut ContentModel) -> Result<()> {
    let project = &mut model.project;
    let sales = &mut model.sales_team;

    project.client_name = text_at(sheet, 0, 1).ok_or_else(|| CoreError::MissingField {
        file: file.to_string(),
        sheet: sheet.name().to_string(),
        cell: "B1".to_string(),
        field: "client_name",
    })?;
    project.pricing_date = date_at(sheet, 0, 3).unwrap_or_default();
    project.capability_area = text_at(sheet, 1, 1).unwrap_or_default();
    sales.sales_rep = text_at(sheet, 1, 3).unwrap_or_default();
    project.project_type = text_at(sheet, 1, 5).unwrap_or_else(|| "New".to_string());
    project.service_type = text_at(sheet, 2, 1).unwrap_or_default();
    sales.relationship_owner = text_at(sheet, 2, 3).unwrap_or_default();
    project.risk_profile = text_at(sheet, 2, 5).unwrap_or_else(|| "Low".to_string());
    project.contract_type = text_at(sheet, 3, 1).unwrap_or_else(|| "T&M".to_string());
    sales.sales_team_leader = text_at(sheet, 3, 3).unwrap_or_default();
    project.project_start_date = date_at(sheet, 3, 5).unwrap_or_default();
    Ok(())
}

/// Number of `Month N` headers on the resource table header row
fn month_header_count(sheet: &Worksheet) -> usize {
    (FIRST_MONTH_COL..)
        .map(|col| text_at(sheet, RESOURCE_HEADER_ROW, col))
        .take_while(|header| {
            header
                .as_deref()
                .map_or(false, |h| h.to_ascii_lowercase().starts_with("month"))
        })
        .count()
}

fn read_resources(sheet: &Worksheet, month_headers: usize) -> Vec<ResourceRow> {
    let last_row = sheet.max_row().unwrap_or(0);
    let mut resources = Vec::new();

    for row in FIRST_RESOURCE_ROW..=last_row {
        let practice = match text_at(sheet, row, 0) {
            Some(p) if !p.eq_ignore_ascii_case("TOTAL") => p,
            _ => break,
        };
        if text_at(sheet, row, 4).map_or(false, |e| e.eq_ignore_ascii_case("TOTAL")) {
            break;
        }

        let mut resource = ResourceRow::new(practice, text_at(sheet, row, 1).unwrap_or_default());
        resource.project_role = text_at(sheet, row, 2).unwrap_or_default();
        resource.potential_resource = text_at(sheet, row, 3).unwrap_or_else(|| TBD.to_string());
        if let Some(location) = text_at(sheet, row, 4) {
            resource.location = location;
        }
        resource.hourly_rate = decimal_at(sheet, row, 5);

        // Without month headers, read until the first gap
        let limit = if month_headers > 0 {
            month_headers
        } else {
            usize::MAX
        };
        resource.monthly_hours = (FIRST_MONTH_COL..)
            .take(limit)
            .map(|col| decimal_at(sheet, row, col))
            .take_while(Option::is_some)
            .flatten()
            .collect();

        resources.push(resource);
    }
    resources
}

/// Label/value pairs in columns A and B
fn read_summary(sheet: &Worksheet, model: &mut ContentModel) {
    let mut total_hours = None;
    let mut total_fees = None;

    for row in 0..SUMMARY_SCAN_ROWS {
        let label = match text_at(sheet, row, 0) {
            Some(l) => l.to_ascii_lowercase(),
            None => continue,
        };
        if label.contains("project name") {
            if let Some(name) = text_at(sheet, row, 1) {
                model.project.project_name = name;
            }
        } else if label.contains("client") && label.contains("name") {
            if model.project.client_name.is_empty() {
                model.project.client_name = text_at(sheet, row, 1).unwrap_or_default();
            }
        } else if label.contains("inside sales") {
            if let Some(name) = text_at(sheet, row, 1) {
                model.sales_team.inside_sales = name;
            }
        } else if label.contains("duration") {
            if let Some(months) = text_at(sheet, row, 1).as_deref().and_then(leading_number) {
                model.project.duration_months = months;
            }
        } else if label.contains("total hours") {
            total_hours = decimal_at(sheet, row, 1);
        } else if label.contains("total fee") {
            total_fees = decimal_at(sheet, row, 1);
        }
    }

    if let (Some(total_hours), Some(total_fees)) = (total_hours, total_fees) {
        model.stated_totals = Some(Totals {
            total_hours,
            total_fees,
        });
    }
}

/// `"6 months"` -> 6
fn leading_number(text: &str) -> Option<u32> {
    let digits: String = text
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Phase names in column A from row 6; the span is the run of filled week cells
fn read_phases(sheet: &Worksheet) -> Vec<Phase> {
    let mut phases = Vec::new();
    let mut row = FIRST_PHASE_ROW;
    while let Some(name) = text_at(sheet, row, 0) {
        let filled: Vec<u32> = (1..=sheet.max_col_in_row(row).unwrap_or(0))
            .filter(|&col| {
                sheet
                    .style(CellAddress::new(row, col))
                    .map_or(false, |s| s.fill.color().is_some())
            })
            .map(u32::from)
            .collect();
        let phase = match (filled.first(), filled.last()) {
            (Some(&start), Some(&end)) => Phase::new(name, start, end),
            // No bar drawn: the builder widens it to the default span
            _ => Phase::new(name, 1, 0),
        };
        phases.push(phase);
        row += 1;
    }
    phases
}

/// Phase headers on row 1, items from row 3 down; a single column is a flat list
fn read_deliverables(sheet: &Worksheet) -> DeliverableSet {
    let mut phases = Vec::new();
    let mut col = 0;
    while let Some(phase) = text_at(sheet, 0, col) {
        let items = (2..)
            .map(|row| text_at(sheet, row, col))
            .take_while(Option::is_some)
            .flatten()
            .collect();
        phases.push(PhaseDeliverables { phase, items });
        col += 1;
    }

    if phases.len() == 1 {
        let only = phases.remove(0);
        DeliverableSet::List(only.items)
    } else {
        DeliverableSet::ByPhase(phases)
    }
}

fn text_at(sheet: &Worksheet, row: u32, col: u16) -> Option<String> {
    sheet.value(CellAddress::new(row, col)).as_text()
}

fn decimal_at(sheet: &Worksheet, row: u32, col: u16) -> Option<Decimal> {
    let number = sheet.value(CellAddress::new(row, col)).as_number()?;
    Decimal::from_f64_retain(number).map(|d| d.round_dp(6).normalize())
}

/// Date-formatted serials become ISO dates; anything else is read as text
fn date_at(sheet: &Worksheet, row: u32, col: u16) -> Option<String> {
    let addr = CellAddress::new(row, col);
    let is_date = sheet.style(addr).map_or(false, |s| s.is_date());
    match sheet.value(addr).resolved() {
        CellValue::Number(serial) if is_date => dates::serial_to_iso(*serial),
        _ => text_at(sheet, row, col),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sowgen_xlsx::Style;

    fn reference() -> ReferenceData {
        let mut data = ReferenceData::default();
        data.insert_rate("EPM_Practice_USA", "Project Manager", Decimal::from(230));
        data
    }

    fn pricing_sheet(workbook: &mut Workbook) -> &mut Worksheet {
        let sheet = workbook.add_sheet(PRICING_SHEET).unwrap();
        sheet.set_value_at("B1", "IEEE").unwrap();
        sheet.set_value_at("B2", "EPM").unwrap();
        sheet.set_value_at("B3", "Implementation").unwrap();
        for (i, header) in ["Practice", "Resource Role", "Project Role", "Potential Resource", "Location", "Hourly Rate", "Month 1", "Month 2", "Total Hours"]
            .iter()
            .enumerate()
        {
            sheet.set_value(CellAddress::new(5, i as u16), *header);
        }
        sheet
    }

    #[test]
    fn test_json_rate_resolution() {
        let reference = reference();
        let builder = Builder::new(&reference, BuildOptions::default());
        let report = builder
            .from_json_str(
                r#"{
                    "project": {"client_name": "IEEE", "duration_months": 2},
                    "resources": [
                        {"practice": "EPM_Practice_USA", "resource_role": "Project Manager", "monthly_hours": [24, 168]},
                        {"practice": "TS_Practice_India", "resource_role": "Developer", "monthly_hours": [80, 80]}
                    ]
                }"#,
                "input.json",
            )
            .unwrap();

        let rates: Vec<_> = report.model.resources.iter().map(|r| r.rate()).collect();
        assert_eq!(rates, vec![Decimal::from(230), Decimal::from(55)]);
        assert_eq!(
            report.warnings,
            vec![BuildWarning::FallbackRate {
                practice: "TS_Practice_India".into(),
                role: "Developer".into(),
                rate: Decimal::from(55),
                source: RateSource::Regional("India".into()),
            }]
        );
    }

    #[test]
    fn test_default_rate_option() {
        let reference = reference();
        let options = BuildOptions {
            default_rate: Some(Decimal::from(175)),
        };
        let report = Builder::new(&reference, options)
            .from_json_str(
                r#"{"resources": [{"practice": "Data_Practice_USA", "resource_role": "Architect"}]}"#,
                "input.json",
            )
            .unwrap();
        assert_eq!(report.model.resources[0].rate(), Decimal::from(175));
    }

    #[test]
    fn test_malformed_json_names_origin() {
        let reference = reference();
        let err = Builder::new(&reference, BuildOptions::default())
            .from_json_str("{\"project\": [", "broken.json")
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("broken.json"), "{}", message);
        assert!(message.contains("line 1"), "{}", message);
    }

    #[test]
    fn test_normalization() {
        let reference = reference();
        let report = Builder::new(&reference, BuildOptions::default())
            .from_json_str(
                r#"{
                    "project": {"capability_area": "EPM", "service_type": "Support", "duration_months": 6},
                    "resources": [{"practice": "EPM_Practice_USA", "resource_role": "Project Manager", "hourly_rate": 230, "monthly_hours": [10, 10]}],
                    "phases": [{"name": "Build", "start_week": 0, "end_week": 0}, {"name": "Test", "start_week": 9, "end_week": 3}],
                    "deliverables": "default"
                }"#,
                "input.json",
            )
            .unwrap();

        let model = &report.model;
        assert_eq!(model.project.project_name, "EPM Support");
        assert_eq!(model.phases, vec![Phase::new("Build", 1, 5), Phase::new("Test", 9, 9)]);
        assert_eq!(model.deliverables, DeliverableSet::ByPhase(DeliverableSet::builtin()));
        assert_eq!(report.warnings.len(), 3);
        assert!(matches!(report.warnings[0], BuildWarning::HoursMismatch { months: 2, duration: 6, .. }));
    }

    #[test]
    fn test_schedule_is_clamped_to_sheet_width() {
        let reference = reference();
        let mut model = ContentModel::default();
        model.project.duration_months = 65_535;
        model.resources = vec![ResourceRow::new("EPM_Practice_USA", "Project Manager")
            .with_hours(vec![Decimal::ONE; usize::from(MAX_MONTH_COLUMNS) + 10])];
        model.phases = vec![Phase::new("Run", 20_000, u32::MAX)];

        let report = Builder::new(&reference, BuildOptions::default()).normalize(model);
        let model = &report.model;
        assert_eq!(model.project.duration_months, MAX_DURATION_MONTHS);
        assert_eq!(model.resources[0].monthly_hours.len(), usize::from(MAX_MONTH_COLUMNS));
        assert_eq!(model.phases, vec![Phase::new("Run", MAX_WEEK, MAX_WEEK)]);
        assert_eq!(
            report.warnings[0],
            BuildWarning::DurationClamped {
                requested: 65_535,
                limit: MAX_DURATION_MONTHS,
            }
        );
        assert!(report
            .warnings
            .iter()
            .any(|w| matches!(w, BuildWarning::HoursTruncated { months, .. } if *months == usize::from(MAX_MONTH_COLUMNS) + 10)));
        assert!(report
            .warnings
            .iter()
            .any(|w| matches!(w, BuildWarning::PhaseClamped { .. })));

        let workbook = crate::workbook::render_workbook(model, &reference).unwrap();
        assert_eq!(workbook.sheet_count(), crate::workbook::SHEET_NAMES.len());
    }

    #[test]
    fn test_workbook_header_and_resources() {
        let mut workbook = Workbook::new();
        let sheet = pricing_sheet(&mut workbook);
        let date = Style::new().number_format("yyyy-mm-dd");
        sheet.set(CellAddress::new(0, 3), 46051.0, &date);
        sheet.set_value_at("F4", "2026-02-15").unwrap();

        sheet.set_value_at("A7", "EPM_Practice_USA").unwrap();
        sheet.set_value_at("B7", "Project Manager").unwrap();
        sheet.set_value_at("G7", 24.0).unwrap();
        sheet.set_value_at("H7", 168.0).unwrap();
        sheet.set_value_at("I7", CellValue::formula("SUM(G7:H7)")).unwrap();
        sheet.set_value_at("E8", "TOTAL").unwrap();

        let reference = reference();
        let report = Builder::new(&reference, BuildOptions::default())
            .from_workbook(workbook, "pricing.xlsx")
            .unwrap();
        let model = report.model;

        assert_eq!(model.project.client_name, "IEEE");
        assert_eq!(model.project.pricing_date, "2026-01-29");
        assert_eq!(model.project.project_start_date, "2026-02-15");
        assert_eq!(model.project.contract_type, "T&M");
        assert_eq!(model.project.duration_months, 2);
        assert_eq!(model.project.project_name, "EPM Implementation");
        assert_eq!(model.resources.len(), 1);
        assert_eq!(model.resources[0].potential_resource, TBD);
        assert_eq!(model.resources[0].rate(), Decimal::from(230));
        assert_eq!(
            money::format_money(model.totals().total_fees),
            "44,160.00"
        );
        assert_eq!(model.deliverables, DeliverableSet::List(Vec::new()));
    }

    #[test]
    fn test_workbook_missing_sheet_and_field() {
        let reference = reference();
        let builder = Builder::new(&reference, BuildOptions::default());

        let mut workbook = Workbook::new();
        workbook.add_sheet("Other").unwrap();
        let err = builder.from_workbook(workbook, "a.xlsx").unwrap_err();
        assert!(matches!(err, Error::Input(CoreError::MissingSheet { ref sheet, .. }) if sheet == PRICING_SHEET));

        let mut workbook = Workbook::new();
        workbook.add_sheet(PRICING_SHEET).unwrap();
        let err = builder.from_workbook(workbook, "b.xlsx").unwrap_err();
        assert!(matches!(
            err,
            Error::Input(CoreError::MissingField { ref cell, field: "client_name", .. }) if cell == "B1"
        ));
    }

    #[test]
    fn test_optional_sheets() {
        let mut workbook = Workbook::new();
        pricing_sheet(&mut workbook);

        let summary = workbook.add_sheet(SUMMARY_SHEET).unwrap();
        summary.set_value_at("A5", "Project Name:").unwrap();
        summary.set_value_at("B5", "Planning Rollout").unwrap();
        summary.set_value_at("A12", "Duration:").unwrap();
        summary.set_value_at("B12", "4 months").unwrap();

        let fill = Style::new().fill_color(sowgen_xlsx::Color::rgb(0x4A, 0x47, 0x78));
        let timeline = workbook.add_sheet("Timeline 36 Weeks").unwrap();
        timeline.set_value_at("A6", "Mobilize").unwrap();
        timeline.set_style(CellAddress::new(5, 1), &fill);
        timeline.set_style(CellAddress::new(5, 2), &fill);
        timeline.set_value_at("A7", "Build").unwrap();
        timeline.set_style(CellAddress::new(6, 3), &fill);
        timeline.set_style(CellAddress::new(6, 7), &fill);

        let deliverables = workbook.add_sheet(DELIVERABLES_SHEET).unwrap();
        deliverables.set_value_at("A1", "Mobilize").unwrap();
        deliverables.set_value_at("A3", "Project Charter").unwrap();
        deliverables.set_value_at("A4", "RAID Logs").unwrap();
        deliverables.set_value_at("B1", "Build").unwrap();

        let reference = reference();
        let model = Builder::new(&reference, BuildOptions::default())
            .from_workbook(workbook, "pricing.xlsx")
            .unwrap()
            .model;

        assert_eq!(model.project.project_name, "Planning Rollout");
        assert_eq!(model.project.duration_months, 4);
        assert_eq!(model.phases, vec![Phase::new("Mobilize", 1, 2), Phase::new("Build", 3, 7)]);
        assert_eq!(
            model.deliverables,
            DeliverableSet::ByPhase(vec![
                PhaseDeliverables::new("Mobilize", &["Project Charter", "RAID Logs"]),
                PhaseDeliverables::new("Build", &[]),
            ])
        );
    }

    #[test]
    fn test_leading_number() {
        assert_eq!(leading_number("6 months"), Some(6));
        assert_eq!(leading_number("12"), Some(12));
        assert_eq!(leading_number("months"), None);
    }
}
