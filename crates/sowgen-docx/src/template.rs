//! Embedded SOW template
//!
//! The built-in layout ships as raw WordprocessingML parts. A user template
//! must use the same placeholders:
//!
//! - `{name}` scalar values, e.g. `{client_name}`, `{fees_total}`
//! - `{@list}` paragraph repeated once per list item
//! - `{@records.field}` paragraph or table row repeated once per record
//! - `{#records}` ... `{/records}` paragraphs delimiting a repeated region;
//!   an empty collection drops the region, so `fees_table` and
//!   `misc_section` act as on/off switches

/// Part name and body, in package order
pub(crate) const PARTS: &[(&str, &str)] = &[
    ("[Content_Types].xml", include_str!("../templates/content_types.xml")),
    ("_rels/.rels", include_str!("../templates/root_rels.xml")),
    ("word/document.xml", include_str!("../templates/document.xml")),
    ("word/_rels/document.xml.rels", include_str!("../templates/document_rels.xml")),
    ("word/styles.xml", include_str!("../templates/styles.xml")),
    ("word/numbering.xml", include_str!("../templates/numbering.xml")),
    ("word/header1.xml", include_str!("../templates/header1.xml")),
    ("word/footer1.xml", include_str!("../templates/footer1.xml")),
];

/// Lists the built-in template expands paragraph by paragraph
pub const LIST_NAMES: &[&str] = &[
    "about_paragraphs",
    "scope_items",
    "deliverables",
    "client_responsibilities",
    "assumptions",
    "out_of_scope",
];

/// Regions the built-in template shows or drops as a whole
pub const SECTION_NAMES: &[&str] = &["fees_table", "misc_section"];
