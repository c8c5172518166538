//! Placeholder template engine
//!
//! Rendering walks the block-level content of the body and of every header
//! and footer part:
//!
//! - a paragraph between `{#name}` and `{/name}` marker paragraphs is part of
//!   a region repeated once per record of `name`; placeholders inside resolve
//!   against the record first, then the enclosing context
//! - a paragraph (or table row) holding `{@name}` or `{@name.field}` is a
//!   prototype, cloned once per list item or record and then removed
//! - every remaining `{name}` is replaced in place, even when Word has split
//!   the token over several runs: the replacement lands in the run holding
//!   the opening brace and the other fragments are cut, so run formatting is
//!   kept
//!
//! Tokens that resolve to nothing render as empty text and are recorded in
//! the [`RenderReport`].

use std::collections::BTreeSet;

use crate::context::{Context, Value};
use crate::error::DocxResult;
use crate::package::DocxPackage;
use crate::xml::{Element, Node};

/// Outcome of a render pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderReport {
    /// Placeholder names (with their sigil) that had no value
    pub unresolved: BTreeSet<String>,
    /// Paragraphs, rows and regions produced from prototypes
    pub expanded: usize,
    /// Prototypes that expanded to nothing and were removed
    pub removed_prototypes: usize,
}

impl RenderReport {
    pub fn is_clean(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Render every content part of `package` against `context`
pub fn render(package: &mut DocxPackage, context: &Context) -> DocxResult<RenderReport> {
    let mut report = RenderReport::default();
    let scope = Scope::root(context);

    for part in package.content_part_names() {
        let mut root = package.xml_part(&part)?;
        let container = if root.name == "w:document" {
            root.child_mut("w:body")
        } else {
            Some(&mut root)
        };
        if let Some(container) = container {
            render_container(container, &scope, &mut report);
        }
        package.set_xml_part(&part, &root);
        log::debug!("rendered part {}", part);
    }

    for name in &report.unresolved {
        log::warn!("placeholder {{{}}} has no value; rendered empty", name);
    }
    Ok(report)
}

/// A token found in paragraph text
#[derive(Debug, Clone, PartialEq, Eq)]
struct Token {
    start: usize,
    end: usize,
    sigil: Option<char>,
    name: String,
}

impl Token {
    fn key(&self) -> String {
        match self.sigil {
            Some(s) => format!("{}{}", s, self.name),
            None => self.name.clone(),
        }
    }
}

fn find_tokens(text: &str) -> Vec<Token> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'{' {
            i += 1;
            continue;
        }
        let mut j = i + 1;
        let sigil = match bytes.get(j) {
            Some(b'@') | Some(b'#') | Some(b'/') => {
                j += 1;
                Some(bytes[j - 1] as char)
            }
            _ => None,
        };
        let name_start = j;
        if !bytes
            .get(j)
            .map_or(false, |b| b.is_ascii_alphabetic() || *b == b'_')
        {
            i += 1;
            continue;
        }
        while bytes
            .get(j)
            .map_or(false, |b| b.is_ascii_alphanumeric() || *b == b'_' || *b == b'.')
        {
            j += 1;
        }
        if bytes.get(j) == Some(&b'}') {
            tokens.push(Token {
                start: i,
                end: j + 1,
                sigil,
                name: text[name_start..j].to_string(),
            });
            i = j + 1;
        } else {
            i += 1;
        }
    }
    tokens
}

/// Every placeholder token in `text`, braces included
///
/// ```
/// use sowgen_docx::placeholders;
///
/// assert_eq!(placeholders("Dear {client_name}, see {@items} {not a token}"),
///            vec!["{client_name}", "{@items}"]);
/// ```
pub fn placeholders(text: &str) -> Vec<String> {
    find_tokens(text)
        .into_iter()
        .map(|t| text[t.start..t.end].to_string())
        .collect()
}

/// Lookup chain: innermost frame first
struct Scope<'a> {
    frame: &'a Context,
    parent: Option<&'a Scope<'a>>,
}

impl<'a> Scope<'a> {
    fn root(frame: &'a Context) -> Self {
        Self {
            frame,
            parent: None,
        }
    }

    fn child<'b>(&'b self, frame: &'b Context) -> Scope<'b> {
        Scope {
            frame,
            parent: Some(self),
        }
    }

    fn lookup(&self, key: &str) -> Option<&'a Value> {
        match self.frame.get(key) {
            Some(v) => Some(v),
            None => self.parent.and_then(|p| p.lookup(key)),
        }
    }
}

fn render_container(container: &mut Element, scope: &Scope<'_>, report: &mut RenderReport) {
    let children = std::mem::take(&mut container.children);
    container.children = render_blocks(&children, scope, report);
}

/// Collection named by the first `{@...}` token not bound in scope
fn find_prototype(text: &str, scope: &Scope<'_>) -> Option<String> {
    find_tokens(text)
        .into_iter()
        .filter(|t| t.sigil == Some('@'))
        .find(|t| scope.lookup(&t.key()).is_none())
        .map(|t| match t.name.split_once('.') {
            Some((collection, _)) => collection.to_string(),
            None => t.name,
        })
}

/// One context frame per list item or record of `collection`
fn collection_frames(collection: &str, scope: &Scope<'_>, report: &mut RenderReport) -> Vec<Context> {
    let item_key = format!("@{}", collection);
    match scope.lookup(collection) {
        Some(Value::List(items)) => items
            .iter()
            .map(|item| Context::new().with_text(item_key.as_str(), item.as_str()))
            .collect(),
        Some(Value::Text(text)) => vec![Context::new().with_text(item_key, text.as_str())],
        Some(Value::Records(records)) => records
            .iter()
            .map(|record| {
                let mut frame = record.clone();
                for (field, value) in record.iter() {
                    frame.set(format!("{}.{}", item_key, field), value.clone());
                }
                frame
            })
            .collect(),
        None => {
            report.unresolved.insert(item_key);
            Vec::new()
        }
    }
}

fn section_open(text: &str) -> Option<String> {
    match find_tokens(text.trim()).as_slice() {
        [t] if t.sigil == Some('#') && t.start == 0 && t.end == text.trim().len() => Some(t.name.clone()),
        _ => None,
    }
}

/// Index of the `{/name}` paragraph closing the region opened at `open`
fn section_close(nodes: &[Node], open: usize, name: &str) -> Option<usize> {
    let open_marker = format!("{{#{}}}", name);
    let close_marker = format!("{{/{}}}", name);
    let mut depth = 0usize;
    for (i, node) in nodes.iter().enumerate().skip(open + 1) {
        if let Node::Element(el) = node {
            if el.name != "w:p" {
                continue;
            }
            let text = el.descendant_text("w:t");
            let text = text.trim();
            if text == open_marker {
                depth += 1;
            } else if text == close_marker {
                if depth == 0 {
                    return Some(i);
                }
                depth -= 1;
            }
        }
    }
    None
}

fn render_blocks(nodes: &[Node], scope: &Scope<'_>, report: &mut RenderReport) -> Vec<Node> {
    let mut out = Vec::with_capacity(nodes.len());
    let mut i = 0;
    while i < nodes.len() {
        let el = match &nodes[i] {
            Node::Element(el) => el,
            other => {
                out.push(other.clone());
                i += 1;
                continue;
            }
        };

        match el.name.as_str() {
            "w:p" => {
                let text = el.descendant_text("w:t");
                if let Some(name) = section_open(&text) {
                    if let Some(close) = section_close(nodes, i, &name) {
                        let inner = &nodes[i + 1..close];
                        for frame in collection_frames(&name, scope, report) {
                            let child = scope.child(&frame);
                            out.extend(render_blocks(inner, &child, report));
                            report.expanded += 1;
                        }
                        i = close + 1;
                        continue;
                    }
                }
                match find_prototype(&text, scope) {
                    Some(collection) => {
                        out.extend(expand(el, &collection, scope, report, substitute));
                    }
                    None => {
                        let mut p = el.clone();
                        substitute(&mut p, scope, report);
                        out.push(Node::Element(p));
                    }
                }
            }
            "w:tbl" => {
                let mut table = el.clone();
                render_table(&mut table, scope, report);
                out.push(Node::Element(table));
            }
            _ => out.push(Node::Element(el.clone())),
        }
        i += 1;
    }
    out
}

fn expand(
    prototype: &Element,
    collection: &str,
    scope: &Scope<'_>,
    report: &mut RenderReport,
    fill: fn(&mut Element, &Scope<'_>, &mut RenderReport),
) -> Vec<Node> {
    let frames = collection_frames(collection, scope, report);
    if frames.is_empty() {
        report.removed_prototypes += 1;
    }
    frames
        .iter()
        .map(|frame| {
            let child = scope.child(frame);
            let mut copy = prototype.clone();
            fill(&mut copy, &child, report);
            report.expanded += 1;
            Node::Element(copy)
        })
        .collect()
}

fn render_table(table: &mut Element, scope: &Scope<'_>, report: &mut RenderReport) {
    let children = std::mem::take(&mut table.children);
    for node in children {
        match node {
            Node::Element(row) if row.name == "w:tr" => {
                let text = row.descendant_text("w:t");
                match find_prototype(&text, scope) {
                    Some(collection) => {
                        let rows = expand(&row, &collection, scope, report, render_row);
                        table.children.extend(rows);
                    }
                    None => {
                        let mut row = row;
                        render_row(&mut row, scope, report);
                        table.children.push(Node::Element(row));
                    }
                }
            }
            other => table.children.push(other),
        }
    }
}

fn render_row(row: &mut Element, scope: &Scope<'_>, report: &mut RenderReport) {
    for cell in row.elements_mut().filter(|e| e.name == "w:tc") {
        render_container(cell, scope, report);
        // A cell must keep at least one paragraph
        if cell.child("w:p").is_none() && cell.child("w:tbl").is_none() {
            cell.children.push(Node::Element(Element::new("w:p")));
        }
    }
}

fn resolve(token: &Token, scope: &Scope<'_>, report: &mut RenderReport) -> String {
    let value = match token.sigil {
        Some('#') | Some('/') => None,
        Some(_) => scope
            .lookup(&token.key())
            .or_else(|| scope.lookup(&token.name)),
        None => scope.lookup(&token.name),
    };
    match value {
        Some(Value::Text(s)) => s.clone(),
        Some(Value::List(items)) => items.join(", "),
        Some(Value::Records(_)) | None => {
            report.unresolved.insert(token.key());
            String::new()
        }
    }
}

/// Replace every token in the paragraph's run text
fn substitute(paragraph: &mut Element, scope: &Scope<'_>, report: &mut RenderReport) {
    let mut texts = Vec::new();
    paragraph.collect_mut("w:t", &mut texts);
    let originals: Vec<String> = texts.iter().map(|t| t.text()).collect();
    let joined = originals.concat();
    let tokens = find_tokens(&joined);
    if tokens.is_empty() {
        return;
    }
    let replacements: Vec<String> = tokens.iter().map(|t| resolve(t, scope, report)).collect();

    let mut seg_start = 0;
    let mut next = 0;
    for (text_el, original) in texts.iter_mut().zip(&originals) {
        let seg_end = seg_start + original.len();
        let mut out = String::with_capacity(original.len());
        let mut pos = seg_start;
        while pos < seg_end {
            while next < tokens.len() && tokens[next].end <= pos {
                next += 1;
            }
            match tokens.get(next) {
                Some(tok) if tok.start <= pos => {
                    if tok.start == pos {
                        out.push_str(&replacements[next]);
                    }
                    pos = tok.end.min(seg_end);
                }
                Some(tok) if tok.start < seg_end => {
                    out.push_str(&joined[pos..tok.start]);
                    pos = tok.start;
                }
                _ => {
                    out.push_str(&joined[pos..seg_end]);
                    pos = seg_end;
                }
            }
        }
        if out != *original {
            text_el.set_text(out);
            text_el.set_attr("xml:space", "preserve");
        }
        seg_start = seg_end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parse;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn body(xml: &str) -> Element {
        parse(format!("<w:body>{}</w:body>", xml).as_bytes(), "test").unwrap()
    }

    fn run(xml: &str, ctx: &Context) -> (Element, RenderReport) {
        let mut root = body(xml);
        let mut report = RenderReport::default();
        render_container(&mut root, &Scope::root(ctx), &mut report);
        (root, report)
    }

    fn paragraphs(root: &Element) -> Vec<String> {
        root.elements()
            .filter(|e| e.name == "w:p")
            .map(|p| p.descendant_text("w:t"))
            .collect()
    }

    #[test]
    fn test_find_tokens() {
        let tokens = find_tokens("a {x} {@list} {fees.total} {#sec}{/sec} {} {1x} {a b}");
        let keys: Vec<String> = tokens.iter().map(Token::key).collect();
        assert_eq!(keys, vec!["x", "@list", "fees.total", "#sec", "/sec"]);
    }

    #[test]
    fn test_split_run_substitution_keeps_formatting() {
        let ctx = Context::new().with_text("client_name", "IEEE");
        let xml = concat!(
            r#"<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>Client: {cli</w:t></w:r>"#,
            r#"<w:r><w:rPr><w:i/></w:rPr><w:t>ent_</w:t></w:r>"#,
            r#"<w:r><w:t>name} signs</w:t></w:r></w:p>"#
        );
        let (root, report) = run(xml, &ctx);

        assert!(report.is_clean());
        let p = root.child("w:p").unwrap();
        let runs: Vec<&Element> = p.elements().filter(|e| e.name == "w:r").collect();
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[0].child("w:t").unwrap().text(), "Client: IEEE");
        assert!(runs[0].child("w:rPr").unwrap().child("w:b").is_some());
        assert_eq!(runs[1].child("w:t").unwrap().text(), "");
        assert!(runs[1].child("w:rPr").unwrap().child("w:i").is_some());
        assert_eq!(runs[2].child("w:t").unwrap().text(), " signs");
        assert_eq!(runs[2].child("w:t").unwrap().attr("xml:space"), Some("preserve"));
    }

    #[test]
    fn test_unknown_token_renders_empty() {
        let (root, report) = run("<w:p><w:r><w:t>[{mystery}]</w:t></w:r></w:p>", &Context::new());
        assert_eq!(paragraphs(&root), vec!["[]"]);
        assert_eq!(report.unresolved.iter().collect::<Vec<_>>(), vec!["mystery"]);
    }

    #[test]
    fn test_list_prototype_expansion() {
        let mut ctx = Context::new();
        ctx.set_list("assumptions", ["One", "Two", "Three"]);
        let xml = concat!(
            "<w:p><w:r><w:t>Intro</w:t></w:r></w:p>",
            r#"<w:p><w:pPr><w:pStyle w:val="ListBullet"/></w:pPr><w:r><w:t>{@assumptions}</w:t></w:r></w:p>"#,
            "<w:p><w:r><w:t>Outro</w:t></w:r></w:p>"
        );
        let (root, report) = run(xml, &ctx);

        assert_eq!(paragraphs(&root), vec!["Intro", "One", "Two", "Three", "Outro"]);
        assert_eq!(report.expanded, 3);
        let styled = root
            .elements()
            .filter(|p| p.child("w:pPr").is_some())
            .count();
        assert_eq!(styled, 3);
    }

    #[test]
    fn test_empty_list_removes_prototype() {
        let mut ctx = Context::new();
        ctx.set_list("out_of_scope", Vec::<String>::new());
        let (root, report) = run("<w:p><w:r><w:t>{@out_of_scope}</w:t></w:r></w:p>", &ctx);
        assert!(paragraphs(&root).is_empty());
        assert_eq!(report.removed_prototypes, 1);
        assert!(report.is_clean());
    }

    #[test]
    fn test_section_repeats_with_nested_list() {
        let mut ctx = Context::new();
        let mut discovery = Context::new();
        discovery.set_text("phase", "Discovery").set_list("items", ["Charter", "Plan"]);
        let mut build = Context::new();
        build.set_text("phase", "Build").set_list("items", ["Code"]);
        ctx.set_records("phase_deliverables", vec![discovery, build]);
        ctx.set_text("client_name", "IEEE");

        let xml = concat!(
            "<w:p><w:r><w:t>{#phase_deliverables}</w:t></w:r></w:p>",
            "<w:p><w:r><w:t>{phase} for {client_name}</w:t></w:r></w:p>",
            "<w:p><w:r><w:t>{@items}</w:t></w:r></w:p>",
            "<w:p><w:r><w:t>{/phase_deliverables}</w:t></w:r></w:p>",
            "<w:p><w:r><w:t>after</w:t></w:r></w:p>"
        );
        let (root, report) = run(xml, &ctx);

        assert!(report.is_clean());
        assert_eq!(
            paragraphs(&root),
            vec!["Discovery for IEEE", "Charter", "Plan", "Build for IEEE", "Code", "after"]
        );
    }

    #[test]
    fn test_table_row_prototype() {
        let mut ctx = Context::new();
        ctx.set_records(
            "fees",
            vec![
                Context::new().with_text("role", "Project Manager").with_text("total", "44,160.00"),
                Context::new().with_text("role", "Developer").with_text("total", "8,800.00"),
            ],
        );
        ctx.set_text("fees_total", "52,960.00");
        let xml = concat!(
            "<w:tbl><w:tblPr/>",
            "<w:tr><w:tc><w:p><w:r><w:t>Role</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>Total</w:t></w:r></w:p></w:tc></w:tr>",
            "<w:tr><w:tc><w:p><w:r><w:t>{@fees.role}</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>{@fees.total}</w:t></w:r></w:p></w:tc></w:tr>",
            "<w:tr><w:tc><w:p><w:r><w:t>TOTAL</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>{fees_total}</w:t></w:r></w:p></w:tc></w:tr>",
            "</w:tbl>"
        );
        let (root, report) = run(xml, &ctx);

        assert!(report.is_clean());
        let table = root.child("w:tbl").unwrap();
        let rows: Vec<String> = table
            .elements()
            .filter(|e| e.name == "w:tr")
            .map(|r| {
                r.elements()
                    .map(|c| c.descendant_text("w:t"))
                    .collect::<Vec<_>>()
                    .join("|")
            })
            .collect();
        assert_eq!(
            rows,
            vec![
                "Role|Total",
                "Project Manager|44,160.00",
                "Developer|8,800.00",
                "TOTAL|52,960.00"
            ]
        );
        assert!(table.child("w:tblPr").is_some());
    }

    #[test]
    fn test_render_package_headers_and_footers() {
        let mut ctx = Context::new();
        ctx.set_text("project_name", "EPM Implementation")
            .set_text("client_name", "IEEE")
            .set_text("date", "March 01, 2026");
        let mut package = DocxPackage::builtin();
        render(&mut package, &ctx).unwrap();

        let header = package.xml_part("word/header1.xml").unwrap();
        assert_eq!(header.descendant_text("w:t"), "SOW - EPM Implementation");
        let footer = package.xml_part("word/footer1.xml").unwrap();
        assert_eq!(footer.descendant_text("w:t"), "IEEE | Statement of Work | March 01, 2026");
    }

    proptest! {
        #[test]
        fn prop_list_length_fidelity(items in proptest::collection::vec("[A-Za-z ]{1,20}", 0..=50)) {
            let mut ctx = Context::new();
            ctx.set_list("scope_items", items.clone());
            let (root, _) = run("<w:p><w:r><w:t>{@scope_items}</w:t></w:r></w:p>", &ctx);
            prop_assert_eq!(paragraphs(&root), items);
        }
    }
}
