//! Rendering the built-in template end to end

use pretty_assertions::assert_eq;
use sowgen_docx::template::{LIST_NAMES, SECTION_NAMES};
use sowgen_docx::{placeholders, render, Context, DocxPackage};

fn full_context() -> Context {
    let mut ctx = Context::new();
    for key in [
        "client_name",
        "project_name",
        "date",
        "scope_intro",
        "client_responsibilities_intro",
        "fees_intro",
        "commencement",
        "invoice_terms",
        "assumptions_intro",
        "fees_total_hours",
        "fees_total",
    ] {
        ctx.set_text(key, format!("<{}>", key));
    }
    for list in LIST_NAMES {
        ctx.set_list(*list, [format!("{} one", list), format!("{} two", list)]);
    }
    ctx.set_list("deliverables_note", Vec::<String>::new());
    ctx.set_records("phase_deliverables", Vec::new());
    for section in SECTION_NAMES {
        ctx.set_records(*section, vec![Context::new()]);
    }

    let mut fee = Context::new();
    for field in ["practice_role", "project_role", "resource", "location", "rate", "hours", "total"] {
        fee.set_text(field, format!("fee-{}", field));
    }
    ctx.set_records("fees", vec![fee]);
    ctx.set_records(
        "misc",
        vec![Context::new()
            .with_text("provision", "Travel")
            .with_text("narrative", "Billed at cost")],
    );
    ctx
}

#[test]
fn test_builtin_template_renders_without_leftover_tokens() {
    let mut package = DocxPackage::builtin();
    let report = render(&mut package, &full_context()).unwrap();
    assert!(report.is_clean(), "unresolved: {:?}", report.unresolved);

    for part in package.content_part_names() {
        let text = package.xml_part(&part).unwrap().descendant_text("w:t");
        assert_eq!(placeholders(&text), Vec::<String>::new(), "in {}", part);
    }

    let text = package.document_text().unwrap();
    assert!(text.contains("<client_name>"));
    assert!(text.contains("assumptions two"));
    assert!(text.contains("fee-rate"));
    assert!(text.contains("Billed at cost"));
}

#[test]
fn test_saved_document_reopens() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sow.docx");

    let mut package = DocxPackage::builtin();
    render(&mut package, &full_context()).unwrap();
    package.save(&path).unwrap();

    let reopened = DocxPackage::open(&path).unwrap();
    let lines: Vec<String> = reopened
        .document_text()
        .unwrap()
        .lines()
        .filter(|l| l.starts_with("scope_items"))
        .map(str::to_string)
        .collect();
    assert_eq!(lines, vec!["scope_items one", "scope_items two"]);
}

#[test]
fn test_empty_sections_are_dropped() {
    let mut ctx = full_context();
    for section in SECTION_NAMES {
        ctx.set_records(*section, Vec::new());
    }
    let mut package = DocxPackage::builtin();
    let report = render(&mut package, &ctx).unwrap();
    assert!(report.is_clean(), "unresolved: {:?}", report.unresolved);

    let text = package.document_text().unwrap();
    assert!(text.contains("Engagement Fees"));
    assert!(text.contains("<fees_intro>"));
    assert!(!text.contains("fee-rate"));
    assert!(!text.contains("<fees_total>"));
    assert!(!text.contains("Miscellaneous Provisions"));
    assert!(!text.contains("Billed at cost"));
}

#[test]
fn test_missing_values_are_reported() {
    let mut package = DocxPackage::builtin();
    let report = render(&mut package, &Context::new()).unwrap();
    assert!(report.unresolved.contains("client_name"));
    assert!(report.unresolved.contains("@fees_table"));
    assert!(report.unresolved.contains("@misc_section"));

    let text = package.document_text().unwrap();
    assert_eq!(placeholders(&text), Vec::<String>::new());
}
