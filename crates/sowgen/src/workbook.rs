//! Workbook renderer
//!
//! Lays a [`ContentModel`] out as the fixed eleven-sheet pricing workbook.
//! Totals are written as formulas over the resource rows, each with a cached
//! value computed here, so the file reads correctly whether or not the
//! consumer recalculates.
//!
//! A base workbook may be given as a template: its Formulas, Picklist and
//! INSTRUCTIONS sheets are kept, with the generated cells written over them,
//! and every other sheet is regenerated.

use std::path::{Path, PathBuf};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sowgen_core::{dates, ContentModel, DeliverableSet, Phase, ReferenceData, PRICING_SHEET, TBD};
use sowgen_xlsx::address::MAX_COL;
use sowgen_xlsx::{
    CellAddress, CellRange, CellValue, Color, HorizontalAlignment, Style, Workbook, Worksheet,
    XlsxReader, XlsxResult, XlsxWriter,
};

use crate::builder::{DELIVERABLES_SHEET, SUMMARY_SHEET};
use crate::error::{Error, Result};

/// Sheet names in output order
pub const SHEET_NAMES: [&str; 11] = [
    SUMMARY_SHEET,
    PRICING_SHEET,
    TIMELINE_SHEET,
    DELIVERABLES_SHEET,
    "Complexity Considerations",
    "Formulas",
    PICKLIST_SHEET,
    "INSTRUCTIONS",
    "Update Resource Instructions",
    "Certinia Resource List",
    "Customer Capability Service",
];

pub const TIMELINE_SHEET: &str = "Timeline";

/// Sheets a template workbook carries into the output
pub const TEMPLATE_SHEETS: [&str; 3] = ["Formulas", PICKLIST_SHEET, "INSTRUCTIONS"];

/// Month columns that fit on Pricing Details after the rate column and
/// before the two total columns
pub const MAX_MONTH_COLUMNS: u16 = MAX_COL - 7;

/// Last week column on the Timeline sheet
pub const MAX_WEEK: u32 = MAX_COL as u32;

/// Longest duration the Timeline can chart at four weeks a month plus four
pub const MAX_DURATION_MONTHS: u32 = (MAX_WEEK - 4) / 4;
pub const PICKLIST_SHEET: &str = "Picklist";

const PURPLE: Color = Color::rgb(0x4A, 0x47, 0x78);
const BLACK: Color = Color::rgb(0x12, 0x00, 0x2A);
const LIGHT_PURPLE: Color = Color::rgb(0xE8, 0xE6, 0xF0);
const ALT_ROW: Color = Color::rgb(0xF5, 0xF0, 0xFA);

/// Gantt bar colours, cycled by phase
const PHASE_PALETTE: [Color; 8] = [
    Color::rgb(0x4A, 0x47, 0x78),
    Color::rgb(0x00, 0x62, 0x9B),
    Color::rgb(0x00, 0x73, 0x77),
    Color::rgb(0x00, 0x9C, 0xA6),
    Color::rgb(0xFF, 0xA3, 0x00),
    Color::rgb(0x86, 0x1F, 0x41),
    Color::rgb(0x2E, 0x7D, 0x32),
    Color::rgb(0x19, 0x76, 0xD2),
];

const HOURS_FORMAT: &str = "#,##0";
const CURRENCY_FORMAT: &str = "$#,##0";
const DATE_FORMAT: &str = "yyyy-mm-dd";

/// Picklist column headers, one per reference list
const PICKLIST_COLUMNS: [&str; 6] = [
    "Client",
    "Capability",
    "Service Type",
    "Contract Type",
    "Practice",
    "Role",
];

const COMPLEXITY_FACTORS: [(&str, &str); 10] = [
    ("Data Volume", "Number of data sources, records, and integrations"),
    ("Integration Complexity", "Number and complexity of system integrations"),
    ("Business Process Complexity", "Complexity of workflows and business rules"),
    ("Organizational Change", "Level of organizational change management required"),
    ("Technical Environment", "Complexity of technical infrastructure"),
    ("Regulatory Requirements", "Compliance and regulatory considerations"),
    ("Timeline Constraints", "Aggressive timeline or fixed deadlines"),
    ("Resource Availability", "Client resource availability for UAT, training"),
    ("Geographic Distribution", "Multi-location or global deployment"),
    ("Customization Level", "Amount of custom development required"),
];

const FORMULA_REFERENCE: [(&str, &str, &str); 4] = [
    ("Total Hours", "=SUM(range)", "Sum of all monthly hours for a resource"),
    ("Total Fees", "=Rate * Hours", "Hourly rate multiplied by total hours"),
    ("Blended Rate", "=Total Fees / Total Hours", "Average rate across all resources"),
    ("Margin %", "=(Bill Rate - Cost) / Bill Rate", "Profit margin percentage"),
];

const INSTRUCTIONS: [&str; 24] = [
    "",
    "Overview",
    "This workbook is used to develop pricing for Statement of Work (SOW) engagements.",
    "",
    "Key Sheets:",
    "- Summary: High-level project overview and totals",
    "- Pricing Details: Resource allocation and monthly hours",
    "- Timeline: Gantt-style project phase timeline",
    "- Deliverables: Phase-by-phase deliverable matrix",
    "- Complexity Considerations: Factors affecting estimate",
    "- Picklist: Reference data for dropdowns",
    "",
    "How to Use:",
    "1. Fill in project information in Pricing Details (rows 1-4)",
    "2. Add resources starting at row 7",
    "3. Enter monthly hours for each resource",
    "4. Review Timeline and adjust phases as needed",
    "5. Verify Deliverables match project scope",
    "6. Check Summary sheet for totals",
    "",
    "Notes:",
    "- Hourly rates are looked up from Picklist based on Practice + Role",
    "- Total Hours and Total Fees are calculated automatically",
    "- Purple-highlighted cells indicate editable fields",
];

const INSTRUCTION_HEADINGS: [&str; 4] = ["Overview", "Key Sheets:", "How to Use:", "Notes:"];

const RESOURCE_INSTRUCTIONS: [&str; 9] = [
    "",
    "The Certinia Resource List sheet contains available resources.",
    "",
    "To update:",
    "1. Export resource list from Certinia",
    "2. Copy data to Certinia Resource List sheet",
    "3. Ensure columns match: Account, Practice, First Name, Last Name, Role, Type",
    "",
    "The Picklist sheet will reference this data for dropdowns.",
];

const CERTINIA_COLUMNS: [&str; 6] = [
    "Account Name",
    "Practice",
    "First Name",
    "Last Name",
    "Resource Role",
    "Employment Type",
];

/// Capability rows and service columns shown on the matrix sheet
const MAX_MATRIX_CAPABILITIES: usize = 20;
const MAX_MATRIX_SERVICES: usize = 15;

/// Workbook settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkbookOptions {
    /// Base workbook whose [`TEMPLATE_SHEETS`] are kept
    pub template: Option<PathBuf>,
}

/// Render the workbook and write it atomically to `path`
pub fn write_workbook<P: AsRef<Path>>(
    model: &ContentModel,
    reference: &ReferenceData,
    path: P,
) -> Result<()> {
    write_workbook_with(model, reference, &WorkbookOptions::default(), path)
}

/// Like [`write_workbook`], starting from `options.template` when set
pub fn write_workbook_with<P: AsRef<Path>>(
    model: &ContentModel,
    reference: &ReferenceData,
    options: &WorkbookOptions,
    path: P,
) -> Result<()> {
    let path = path.as_ref();
    let template = match &options.template {
        Some(template_path) => Some(
            XlsxReader::read_file(template_path).map_err(|e| Error::workbook(template_path, e))?,
        ),
        None => None,
    };
    let workbook =
        render_sheets(model, reference, template.as_ref()).map_err(|e| Error::workbook(path, e))?;
    XlsxWriter::write_file(&workbook, path).map_err(|e| Error::workbook(path, e))?;
    log::info!(
        "wrote workbook '{}' ({} sheets, {} resources)",
        path.display(),
        workbook.sheet_count(),
        model.resources.len()
    );
    Ok(())
}

/// Lay the model out as the eleven-sheet pricing workbook
pub fn render_workbook(model: &ContentModel, reference: &ReferenceData) -> XlsxResult<Workbook> {
    render_sheets(model, reference, None)
}

/// Like [`render_workbook`], keeping the [`TEMPLATE_SHEETS`] of `template`
pub fn render_workbook_with_template(
    model: &ContentModel,
    reference: &ReferenceData,
    template: &Workbook,
) -> XlsxResult<Workbook> {
    render_sheets(model, reference, Some(template))
}

fn render_sheets(
    model: &ContentModel,
    reference: &ReferenceData,
    template: Option<&Workbook>,
) -> XlsxResult<Workbook> {
    let layout = PricingLayout::new(model);
    let mut workbook = Workbook::new();

    render_summary(workbook.add_sheet(SUMMARY_SHEET)?, model, &layout);
    render_pricing(workbook.add_sheet(PRICING_SHEET)?, model, reference, &layout);
    render_timeline(workbook.add_sheet(TIMELINE_SHEET)?, model);
    render_deliverables(workbook.add_sheet(DELIVERABLES_SHEET)?, model, reference);
    render_complexity(workbook.add_sheet(SHEET_NAMES[4])?);
    render_formulas(base_sheet(&mut workbook, template, TEMPLATE_SHEETS[0])?);
    render_picklist(base_sheet(&mut workbook, template, TEMPLATE_SHEETS[1])?, reference);
    render_instructions(base_sheet(&mut workbook, template, TEMPLATE_SHEETS[2])?);
    render_resource_instructions(workbook.add_sheet(SHEET_NAMES[8])?);
    render_certinia(workbook.add_sheet(SHEET_NAMES[9])?);
    render_capability_matrix(workbook.add_sheet(SHEET_NAMES[10])?, reference);

    log::debug!("rendered {} sheets", workbook.sheet_count());
    Ok(workbook)
}

/// The template's copy of `name` when it has one, else a new sheet
fn base_sheet<'a>(
    workbook: &'a mut Workbook,
    template: Option<&Workbook>,
    name: &str,
) -> XlsxResult<&'a mut Worksheet> {
    match template.and_then(|t| t.sheet(name)) {
        Some(base) => {
            log::debug!("sheet '{}' taken from template", name);
            let mut sheet = base.clone();
            sheet.set_name(name);
            workbook.push_sheet(sheet)
        }
        None => workbook.add_sheet(name),
    }
}

/// Column and row positions of the resource table
struct PricingLayout {
    months: u16,
    first_row: u32,
    last_row: u32,
    totals_row: Option<u32>,
}

impl PricingLayout {
    fn new(model: &ContentModel) -> Self {
        let months = u16::try_from(model.month_columns())
            .unwrap_or(u16::MAX)
            .clamp(1, MAX_MONTH_COLUMNS);
        let first_row = 6;
        let count = model.resources.len() as u32;
        Self {
            months,
            first_row,
            last_row: first_row + count.max(1) - 1,
            totals_row: (count > 0).then(|| first_row + count),
        }
    }

    fn rate_col(&self) -> u16 {
        5
    }

    fn first_month_col(&self) -> u16 {
        6
    }

    fn total_hours_col(&self) -> u16 {
        self.first_month_col() + self.months
    }

    fn total_fees_col(&self) -> u16 {
        self.total_hours_col() + 1
    }
}

fn a1(row: u32, col: u16) -> String {
    CellAddress::new(row, col).to_a1_string()
}

fn or_tbd(value: &str) -> &str {
    if value.trim().is_empty() {
        TBD
    } else {
        value
    }
}

fn number(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

fn title_style(size: f64) -> Style {
    Style::new().bold(true).font_size(size).font_color(BLACK)
}

fn section_style() -> Style {
    Style::new().bold(true).font_size(12.0).font_color(PURPLE)
}

fn bold_style() -> Style {
    Style::new().bold(true).font_size(10.0)
}

fn header_style() -> Style {
    Style::new()
        .bold(true)
        .font_size(10.0)
        .font_color(Color::WHITE)
        .fill_color(PURPLE)
        .align(HorizontalAlignment::Center)
        .vertical_center()
        .wrap()
        .thin_border()
}

fn data_style(alt: bool) -> Style {
    let style = Style::new()
        .font_size(10.0)
        .align(HorizontalAlignment::Left)
        .vertical_center()
        .thin_border();
    if alt {
        style.fill_color(ALT_ROW)
    } else {
        style
    }
}

fn label_style() -> Style {
    bold_style().fill_color(LIGHT_PURPLE)
}

/// A header row starting at `(row, first_col)`
fn header_row(sheet: &mut Worksheet, row: u32, first_col: u16, headers: &[&str]) {
    let style = header_style();
    for (i, header) in headers.iter().enumerate() {
        sheet.set(CellAddress::new(row, first_col + i as u16), *header, &style);
    }
}

/// ISO dates become date serials so the cell sorts and formats as a date
fn date_value(value: &str) -> (CellValue, Option<Style>) {
    match (dates::parse(value), dates::to_serial(value)) {
        (Some(date), Some(serial)) if date.format("%Y-%m-%d").to_string() == value.trim() => (
            CellValue::Number(serial),
            Some(Style::new().number_format(DATE_FORMAT)),
        ),
        _ => (CellValue::string(value), None),
    }
}

fn render_summary(sheet: &mut Worksheet, model: &ContentModel, layout: &PricingLayout) {
    let project = &model.project;
    let sales = &model.sales_team;
    let totals = model.totals();

    sheet.set(CellAddress::new(0, 0), "SOW Pricing Summary", &title_style(16.0));
    sheet.merge_cells(CellRange::new(CellAddress::new(0, 0), CellAddress::new(0, 3)));

    let section = section_style();
    let label = bold_style();

    sheet.set(CellAddress::new(2, 0), "General Information", &section);
    let general = [
        ("Client Name:", project.client_name.clone()),
        ("Project Name:", project.project_name.clone()),
        ("Capability:", project.capability_area.clone()),
        ("Service:", project.service_type.clone()),
        ("Contract Type:", project.contract_type.clone()),
        ("Risk Profile:", project.risk_profile.clone()),
        ("Pricing Date:", project.pricing_date.clone()),
        ("Project Start:", project.project_start_date.clone()),
        ("Duration:", format!("{} months", project.duration_months)),
    ];
    for (i, (text, value)) in general.into_iter().enumerate() {
        let row = 3 + i as u32;
        sheet.set(CellAddress::new(row, 0), text, &label);
        sheet.set_value(CellAddress::new(row, 1), value);
    }

    sheet.set(CellAddress::new(13, 0), "Sales Team", &section);
    let team = [
        ("Relationship Owner:", &sales.relationship_owner),
        ("Sales Rep:", &sales.sales_rep),
        ("Inside Sales:", &sales.inside_sales),
        ("Sales Team Leader:", &sales.sales_team_leader),
    ];
    for (i, (text, value)) in team.into_iter().enumerate() {
        let row = 14 + i as u32;
        sheet.set(CellAddress::new(row, 0), text, &label);
        sheet.set_value(CellAddress::new(row, 1), value.as_str());
    }

    sheet.set(CellAddress::new(19, 0), "Resource Summary", &section);
    sheet.set(CellAddress::new(20, 0), "Total Resources:", &label);
    sheet.set(CellAddress::new(21, 0), "Total Hours:", &label);
    sheet.set(CellAddress::new(22, 0), "Total Fees:", &label);

    let count = model.resources.len() as f64;
    let hours = number(totals.total_hours);
    let fees = number(totals.total_fees);
    let (count_value, hours_value, fees_value) = match layout.totals_row {
        Some(totals_row) => {
            let pricing = format!("'{}'", PRICING_SHEET);
            (
                CellValue::formula_with_value(
                    format!(
                        "COUNTA({}!A{}:A{})",
                        pricing,
                        layout.first_row + 1,
                        layout.last_row + 1
                    ),
                    CellValue::Number(count),
                ),
                CellValue::formula_with_value(
                    format!("{}!{}", pricing, a1(totals_row, layout.total_hours_col())),
                    CellValue::Number(hours),
                ),
                CellValue::formula_with_value(
                    format!("{}!{}", pricing, a1(totals_row, layout.total_fees_col())),
                    CellValue::Number(fees),
                ),
            )
        }
        None => (
            CellValue::Number(0.0),
            CellValue::Number(0.0),
            CellValue::Number(0.0),
        ),
    };
    sheet.set_value(CellAddress::new(20, 1), count_value);
    sheet.set(
        CellAddress::new(21, 1),
        hours_value,
        &Style::new().number_format(HOURS_FORMAT),
    );
    sheet.set(
        CellAddress::new(22, 1),
        fees_value,
        &Style::new().number_format(CURRENCY_FORMAT),
    );

    for (col, width) in [20.0, 35.0, 15.0, 15.0].into_iter().enumerate() {
        sheet.set_column_width(col as u16, width);
    }
}

fn render_pricing(
    sheet: &mut Worksheet,
    model: &ContentModel,
    reference: &ReferenceData,
    layout: &PricingLayout,
) {
    let project = &model.project;
    let sales = &model.sales_team;

    // (label, value) triples for columns A/B, C/D, E/F on rows 1-4
    let header: [[(&str, &str); 3]; 4] = [
        [
            ("Client Name (Partner Name):", project.client_name.as_str()),
            ("Pricing Date:", project.pricing_date.as_str()),
            ("", ""),
        ],
        [
            ("Capability/Practice Area:", project.capability_area.as_str()),
            ("Sales Rep:", sales.sales_rep.as_str()),
            ("Type:", project.project_type.as_str()),
        ],
        [
            ("Service /Project Type:", project.service_type.as_str()),
            ("Presales/Delivery:", sales.relationship_owner.as_str()),
            ("Risk Profile:", project.risk_profile.as_str()),
        ],
        [
            ("Contract Type:", project.contract_type.as_str()),
            ("Engagement Lead:", sales.sales_team_leader.as_str()),
            ("Project Start Date:", project.project_start_date.as_str()),
        ],
    ];
    let label = label_style();
    for (row, fields) in header.iter().enumerate() {
        for (pair, (text, value)) in fields.iter().enumerate() {
            let label_addr = CellAddress::new(row as u32, pair as u16 * 2);
            let value_addr = CellAddress::new(row as u32, pair as u16 * 2 + 1);
            if text.is_empty() {
                continue;
            }
            sheet.set(label_addr, *text, &label);
            let is_date = matches!((row, pair), (0, 1) | (3, 2));
            if is_date {
                match date_value(value) {
                    (v, Some(style)) => sheet.set(value_addr, v, &style),
                    (v, None) => sheet.set_value(value_addr, v),
                }
            } else if !value.is_empty() {
                sheet.set_value(value_addr, *value);
            }
        }
    }

    let header_row_idx = layout.first_row - 1;
    let mut headers = vec![
        "Practice".to_string(),
        "Resource Role".to_string(),
        "Project Role".to_string(),
        "Potential Resource".to_string(),
        "Location".to_string(),
        "Hourly Rate".to_string(),
    ];
    headers.extend((1..=layout.months).map(|m| format!("Month {}", m)));
    headers.push("Total Hours".to_string());
    headers.push("Total Fees".to_string());
    let header_refs: Vec<&str> = headers.iter().map(String::as_str).collect();
    header_row(sheet, header_row_idx, 0, &header_refs);

    let first_month = layout.first_month_col();
    let last_month = first_month + layout.months - 1;
    for (i, resource) in model.resources.iter().enumerate() {
        let row = layout.first_row + i as u32;
        let alt = i % 2 == 1;
        let text = data_style(alt);
        let hours_style = data_style(alt).number_format(HOURS_FORMAT);
        let money_style = data_style(alt).number_format(CURRENCY_FORMAT);

        // A blank practice or role cell ends the table on read-back
        let texts = [
            or_tbd(&resource.practice),
            or_tbd(&resource.resource_role),
            resource.project_role.as_str(),
            resource.potential_resource.as_str(),
            resource.location.as_str(),
        ];
        for (col, value) in texts.iter().enumerate() {
            sheet.set(CellAddress::new(row, col as u16), *value, &text);
        }
        sheet.set(
            CellAddress::new(row, layout.rate_col()),
            number(resource.rate()),
            &money_style,
        );

        for month in 0..layout.months {
            let addr = CellAddress::new(row, first_month + month);
            match resource.monthly_hours.get(month as usize) {
                Some(hours) => sheet.set(addr, number(*hours), &hours_style),
                None => sheet.set_style(addr, &hours_style),
            }
        }

        let row_label = row + 1;
        sheet.set(
            CellAddress::new(row, layout.total_hours_col()),
            CellValue::formula_with_value(
                format!(
                    "SUM({}{}:{}{})",
                    CellAddress::column_to_letters(first_month),
                    row_label,
                    CellAddress::column_to_letters(last_month),
                    row_label
                ),
                CellValue::Number(number(resource.total_hours())),
            ),
            &hours_style,
        );
        sheet.set(
            CellAddress::new(row, layout.total_fees_col()),
            CellValue::formula_with_value(
                format!(
                    "{}*{}",
                    a1(row, layout.rate_col()),
                    a1(row, layout.total_hours_col())
                ),
                CellValue::Number(number(resource.total_fee())),
            ),
            &money_style,
        );
    }

    if let Some(totals_row) = layout.totals_row {
        let totals = model.totals();
        sheet.set(CellAddress::new(totals_row, 4), "TOTAL", &bold_style());
        for (col, cached, format) in [
            (layout.total_hours_col(), totals.total_hours, HOURS_FORMAT),
            (layout.total_fees_col(), totals.total_fees, CURRENCY_FORMAT),
        ] {
            let letters = CellAddress::column_to_letters(col);
            sheet.set(
                CellAddress::new(totals_row, col),
                CellValue::formula_with_value(
                    format!(
                        "SUM({}{}:{}{})",
                        letters,
                        layout.first_row + 1,
                        letters,
                        layout.last_row + 1
                    ),
                    CellValue::Number(number(cached)),
                ),
                &Style::new().bold(true).number_format(format),
            );
        }

        // Drop-downs over the practice and role columns
        for (col, list, picklist_col) in [
            (0u16, &reference.practices, 4u16),
            (1u16, &reference.roles, 5u16),
        ] {
            if list.is_empty() {
                continue;
            }
            let letters = CellAddress::column_to_letters(picklist_col);
            sheet.add_list_validation(
                CellRange::new(
                    CellAddress::new(layout.first_row, col),
                    CellAddress::new(layout.last_row, col),
                ),
                format!("{}!${}$2:${}${}", PICKLIST_SHEET, letters, letters, list.len() + 1),
            );
        }
    }

    for (col, width) in [25.0, 22.0, 22.0, 20.0, 10.0, 12.0].into_iter().enumerate() {
        sheet.set_column_width(col as u16, width);
    }
    for col in first_month..=layout.total_fees_col() {
        sheet.set_column_width(col, 12.0);
    }
}

fn render_timeline(sheet: &mut Worksheet, model: &ContentModel) {
    let default_plan;
    let phases: &[Phase] = if model.phases.is_empty() {
        default_plan = Phase::default_plan();
        &default_plan
    } else {
        &model.phases
    };

    let last_end = phases.iter().map(|p| p.end_week).max().unwrap_or(0);
    let weeks = model
        .project
        .duration_months
        .saturating_mul(4)
        .saturating_add(4)
        .max(last_end)
        .min(MAX_WEEK);
    let weeks = u16::try_from(weeks).unwrap_or(MAX_COL);

    sheet.set(CellAddress::new(0, 0), "Project Timeline", &title_style(14.0));
    sheet.set(CellAddress::new(3, 0), "Week #", &bold_style());
    let week_style = Style::new()
        .bold(true)
        .font_size(9.0)
        .align(HorizontalAlignment::Center);
    for week in 1..=weeks {
        sheet.set(CellAddress::new(3, week), f64::from(week), &week_style);
        sheet.set_column_width(week, 4.0);
    }
    sheet.set(CellAddress::new(4, 0), "Project Phases", &bold_style());

    let name_style = Style::new().font_size(10.0);
    for (i, phase) in phases.iter().enumerate() {
        let row = 5 + i as u32;
        sheet.set(CellAddress::new(row, 0), phase.name.as_str(), &name_style);
        let bar = Style::new().fill_color(PHASE_PALETTE[i % PHASE_PALETTE.len()]);
        let start = u16::try_from(phase.start_week.clamp(1, MAX_WEEK)).unwrap_or(MAX_COL);
        let end = u16::try_from(phase.end_week.min(MAX_WEEK))
            .unwrap_or(MAX_COL)
            .max(start);
        for week in start..=end {
            sheet.set_style(CellAddress::new(row, week), &bar);
        }
    }
    sheet.set_column_width(0, 20.0);
}

fn render_deliverables(sheet: &mut Worksheet, model: &ContentModel, reference: &ReferenceData) {
    let columns: Vec<(String, Vec<String>)> = match &model.deliverables {
        DeliverableSet::Default => reference
            .default_deliverables()
            .into_iter()
            .map(|p| (p.phase, p.items))
            .collect(),
        DeliverableSet::List(items) => vec![("Deliverables".to_string(), items.clone())],
        DeliverableSet::ByPhase(phases) => phases
            .iter()
            .map(|p| (p.phase.clone(), p.items.clone()))
            .collect(),
    };

    let header = header_style();
    for (col, (phase, items)) in columns.iter().enumerate() {
        let col = col as u16;
        sheet.set(CellAddress::new(0, col), phase.as_str(), &header);
        sheet.set_column_width(col, 25.0);
        for (i, item) in items.iter().enumerate() {
            let row = 2 + i as u32;
            sheet.set(CellAddress::new(row, col), item.as_str(), &data_style(row % 2 == 1));
        }
    }
}

/// Title in A1 and a header row on row 3
fn titled_table(sheet: &mut Worksheet, title: &str, headers: &[&str]) {
    sheet.set(CellAddress::new(0, 0), title, &title_style(14.0));
    header_row(sheet, 2, 0, headers);
}

fn render_complexity(sheet: &mut Worksheet) {
    titled_table(sheet, "Complexity Considerations", &["Factor", "Description"]);
    for (i, (factor, description)) in COMPLEXITY_FACTORS.iter().enumerate() {
        let row = 3 + i as u32;
        let style = data_style(row % 2 == 1);
        sheet.set(CellAddress::new(row, 0), *factor, &style);
        sheet.set(CellAddress::new(row, 1), *description, &style);
    }
    sheet.set_column_width(0, 25.0);
    sheet.set_column_width(1, 60.0);
}

fn render_formulas(sheet: &mut Worksheet) {
    titled_table(sheet, "Formula Reference Sheet", &["Formula", "Syntax", "Description"]);
    for (i, (name, syntax, description)) in FORMULA_REFERENCE.iter().enumerate() {
        let row = 3 + i as u32;
        let style = data_style(row % 2 == 1);
        // Written as text: these describe formulas, they are not formulas
        for (col, text) in [name, syntax, description].iter().enumerate() {
            sheet.set(CellAddress::new(row, col as u16), **text, &style);
        }
    }
    for (col, width) in [20.0, 30.0, 45.0].into_iter().enumerate() {
        sheet.set_column_width(col as u16, width);
    }
}

fn render_picklist(sheet: &mut Worksheet, reference: &ReferenceData) {
    header_row(sheet, 0, 0, &PICKLIST_COLUMNS);
    let lists = [
        &reference.clients,
        &reference.capabilities,
        &reference.service_types,
        &reference.contract_types,
        &reference.practices,
        &reference.roles,
    ];
    for (col, items) in lists.iter().enumerate() {
        for (i, item) in items.iter().enumerate() {
            sheet.set_value(CellAddress::new(1 + i as u32, col as u16), item.as_str());
        }
    }
    for (col, width) in [30.0, 25.0, 25.0, 15.0, 35.0, 30.0].into_iter().enumerate() {
        sheet.set_column_width(col as u16, width);
    }
}

fn render_instructions(sheet: &mut Worksheet) {
    sheet.set(
        CellAddress::new(0, 0),
        "SOW Pricing Workbook Instructions",
        &title_style(16.0),
    );
    let heading = section_style();
    let body = Style::new().font_size(10.0);
    for (i, line) in INSTRUCTIONS.iter().enumerate() {
        let addr = CellAddress::new(2 + i as u32, 0);
        if line.is_empty() {
            continue;
        }
        if INSTRUCTION_HEADINGS.contains(line) {
            sheet.set(addr, *line, &heading);
        } else if line.starts_with('-') {
            sheet.set_value(addr, *line);
        } else {
            sheet.set(addr, *line, &body);
        }
    }
    sheet.set_column_width(0, 80.0);
}

fn render_resource_instructions(sheet: &mut Worksheet) {
    sheet.set(
        CellAddress::new(0, 0),
        "How to Update Resource List",
        &title_style(14.0),
    );
    for (i, line) in RESOURCE_INSTRUCTIONS.iter().enumerate() {
        if !line.is_empty() {
            sheet.set_value(CellAddress::new(2 + i as u32, 0), *line);
        }
    }
    sheet.set_column_width(0, 70.0);
}

fn render_certinia(sheet: &mut Worksheet) {
    header_row(sheet, 0, 0, &CERTINIA_COLUMNS);
    for col in 0..CERTINIA_COLUMNS.len() as u16 {
        sheet.set_column_width(col, 20.0);
    }
    sheet.set_value(CellAddress::new(1, 0), "Donyati");
    sheet.set_value(CellAddress::new(1, 1), "(Import from Certinia)");
}

fn render_capability_matrix(sheet: &mut Worksheet, reference: &ReferenceData) {
    sheet.set(
        CellAddress::new(0, 0),
        "Customer Capability Service Matrix",
        &title_style(14.0),
    );
    let header = header_style();
    sheet.set(CellAddress::new(2, 0), "Capability \\ Service", &header);
    for (i, service) in reference
        .service_types
        .iter()
        .take(MAX_MATRIX_SERVICES)
        .enumerate()
    {
        let col = 1 + i as u16;
        sheet.set(CellAddress::new(2, col), service.as_str(), &header);
        sheet.set_column_width(col, 15.0);
    }
    for (i, capability) in reference
        .capabilities
        .iter()
        .take(MAX_MATRIX_CAPABILITIES)
        .enumerate()
    {
        let row = 3 + i as u32;
        sheet.set(
            CellAddress::new(row, 0),
            capability.as_str(),
            &data_style(row % 2 == 1),
        );
    }
    sheet.set_column_width(0, 25.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sowgen_core::ResourceRow;

    fn model() -> ContentModel {
        let mut model = ContentModel::default();
        model.project.client_name = "IEEE".into();
        model.project.duration_months = 2;
        model.project.pricing_date = "2026-01-29".into();
        model.resources = vec![
            ResourceRow::new("EPM_Practice_USA", "Project Manager")
                .with_rate(Decimal::from(230))
                .with_hours([Decimal::from(24), Decimal::from(168)]),
            ResourceRow::new("TS_Practice_India", "Developer")
                .with_rate(Decimal::from(55))
                .with_hours([Decimal::from(80)]),
        ];
        model
    }

    #[test]
    fn test_sheet_order() {
        let workbook = render_workbook(&model(), &ReferenceData::default()).unwrap();
        assert_eq!(workbook.sheet_names(), SHEET_NAMES.to_vec());
    }

    #[test]
    fn test_pricing_formulas_and_cache() {
        let workbook = render_workbook(&model(), &ReferenceData::default()).unwrap();
        let sheet = workbook.sheet(PRICING_SHEET).unwrap();

        assert_eq!(sheet.value_at("G6").unwrap(), &CellValue::string("Month 1"));
        assert_eq!(sheet.value_at("I6").unwrap(), &CellValue::string("Total Hours"));
        assert_eq!(
            sheet.value_at("I7").unwrap(),
            &CellValue::formula_with_value("SUM(G7:H7)", CellValue::Number(192.0))
        );
        assert_eq!(
            sheet.value_at("J7").unwrap(),
            &CellValue::formula_with_value("F7*I7", CellValue::Number(44160.0))
        );
        // The shorter grid leaves a styled gap, not a zero
        assert_eq!(sheet.value_at("H8").unwrap(), &CellValue::Empty);
        assert_eq!(sheet.value_at("E9").unwrap(), &CellValue::string("TOTAL"));
        assert_eq!(
            sheet.value_at("J9").unwrap(),
            &CellValue::formula_with_value("SUM(J7:J8)", CellValue::Number(48560.0))
        );
        assert!(sheet.style(CellAddress::new(0, 3)).unwrap().is_date());
    }

    #[test]
    fn test_summary_references_totals_row() {
        let workbook = render_workbook(&model(), &ReferenceData::default()).unwrap();
        let summary = workbook.sheet(SUMMARY_SHEET).unwrap();
        assert_eq!(
            summary.value_at("B23").unwrap(),
            &CellValue::formula_with_value("'Pricing Details'!J9", CellValue::Number(48560.0))
        );
        assert_eq!(summary.value_at("B12").unwrap(), &CellValue::string("2 months"));
        assert_eq!(summary.merged_regions().len(), 1);
    }

    #[test]
    fn test_no_resources_no_totals_row() {
        let mut model = model();
        model.resources.clear();
        let workbook = render_workbook(&model, &ReferenceData::default()).unwrap();
        let sheet = workbook.sheet(PRICING_SHEET).unwrap();
        assert_eq!(sheet.max_row(), Some(5));
        let summary = workbook.sheet(SUMMARY_SHEET).unwrap();
        assert_eq!(summary.value_at("B22").unwrap(), &CellValue::Number(0.0));
    }

    #[test]
    fn test_timeline_width_and_default_plan() {
        let workbook = render_workbook(&model(), &ReferenceData::default()).unwrap();
        let timeline = workbook.sheet(TIMELINE_SHEET).unwrap();
        // Default plan ends in week 28, past 2 * 4 + 4
        assert_eq!(timeline.max_col_in_row(3), Some(28));
        assert_eq!(timeline.value_at("A6").unwrap(), &CellValue::string("Mobilize"));
        assert_eq!(
            timeline.style(CellAddress::new(5, 2)).unwrap().fill.color(),
            Some(PHASE_PALETTE[0])
        );
    }

    #[test]
    fn test_blank_practice_and_role_are_written_as_tbd() {
        let mut model = model();
        model.resources[0].practice = String::new();
        model.resources[1].resource_role = "  ".into();
        let workbook = render_workbook(&model, &ReferenceData::default()).unwrap();
        let sheet = workbook.sheet(PRICING_SHEET).unwrap();
        assert_eq!(sheet.value_at("A7").unwrap(), &CellValue::string(TBD));
        assert_eq!(sheet.value_at("B7").unwrap(), &CellValue::string("Project Manager"));
        assert_eq!(sheet.value_at("B8").unwrap(), &CellValue::string(TBD));
    }

    #[test]
    fn test_oversized_schedule_stays_within_sheet() {
        let mut model = model();
        model.project.duration_months = 65_535;
        model.phases = vec![Phase::new("Endless", 20_000, u32::MAX)];
        let workbook = render_workbook(&model, &ReferenceData::default()).unwrap();

        let pricing = workbook.sheet(PRICING_SHEET).unwrap();
        assert_eq!(pricing.max_col_in_row(5), Some(MAX_COL));
        let timeline = workbook.sheet(TIMELINE_SHEET).unwrap();
        assert_eq!(timeline.max_col_in_row(3), Some(MAX_COL));
        assert_eq!(
            timeline.style(CellAddress::new(5, MAX_COL)).unwrap().fill.color(),
            Some(PHASE_PALETTE[0])
        );
    }

    #[test]
    fn test_validations_follow_picklist() {
        let mut reference = ReferenceData::default();
        reference.practices = vec!["EPM_Practice_USA".into(), "TS_Practice_India".into()];
        let workbook = render_workbook(&model(), &reference).unwrap();
        let sheet = workbook.sheet(PRICING_SHEET).unwrap();
        let validations = sheet.list_validations();
        assert_eq!(validations.len(), 1);
        assert_eq!(validations[0].range.to_string(), "A7:A8");
        assert_eq!(validations[0].source, "Picklist!$E$2:$E$3");

        let picklist = workbook.sheet(PICKLIST_SHEET).unwrap();
        assert_eq!(picklist.value_at("E3").unwrap(), &CellValue::string("TS_Practice_India"));
    }
}
