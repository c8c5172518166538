//! Cell styling types
//!
//! A compact subset of SpreadsheetML formatting: font weight/size/colour,
//! solid fills, thin borders, alignment and number formats. Styles are
//! deduplicated per worksheet through [`StylePool`].

use std::fmt;
use std::hash::{Hash, Hasher};

use ahash::AHashMap;

/// An opaque RGB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(0xFF, 0xFF, 0xFF);
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `"4A4778"`, `"#4A4778"` or an ARGB `"FF4A4778"`
    pub fn from_hex(s: &str) -> Option<Self> {
        let s = s.trim_start_matches('#');
        let s = match s.len() {
            6 => s,
            8 => &s[2..],
            _ => return None,
        };
        let v = u32::from_str_radix(s, 16).ok()?;
        Some(Self::rgb((v >> 16) as u8, (v >> 8) as u8, v as u8))
    }

    /// ARGB hex as written in styles.xml
    pub fn to_argb_hex(&self) -> String {
        format!("FF{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Font settings
#[derive(Debug, Clone, PartialEq)]
pub struct FontStyle {
    pub name: String,
    pub size: f64,
    pub bold: bool,
    pub italic: bool,
    pub color: Option<Color>,
}

impl Default for FontStyle {
    fn default() -> Self {
        Self {
            name: "Calibri".to_string(),
            size: 11.0,
            bold: false,
            italic: false,
            color: None,
        }
    }
}

impl Eq for FontStyle {}

impl Hash for FontStyle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.size.to_bits().hash(state);
        self.bold.hash(state);
        self.italic.hash(state);
        self.color.hash(state);
    }
}

/// Background fill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FillStyle {
    #[default]
    None,
    Solid(Color),
}

impl FillStyle {
    pub fn color(&self) -> Option<Color> {
        match self {
            FillStyle::None => None,
            FillStyle::Solid(c) => Some(*c),
        }
    }
}

/// Cell border: nothing, or a thin line on all four edges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BorderStyle {
    #[default]
    None,
    Thin,
}

/// Horizontal alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HorizontalAlignment {
    #[default]
    General,
    Left,
    Center,
    Right,
}

impl HorizontalAlignment {
    pub(crate) fn xlsx_name(&self) -> &'static str {
        match self {
            HorizontalAlignment::General => "general",
            HorizontalAlignment::Left => "left",
            HorizontalAlignment::Center => "center",
            HorizontalAlignment::Right => "right",
        }
    }

    pub(crate) fn from_xlsx(s: &str) -> Self {
        match s {
            "left" => HorizontalAlignment::Left,
            "center" => HorizontalAlignment::Center,
            "right" => HorizontalAlignment::Right,
            _ => HorizontalAlignment::General,
        }
    }
}

/// Text alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Alignment {
    pub horizontal: HorizontalAlignment,
    pub vertical_center: bool,
    pub wrap_text: bool,
}

/// Complete cell style
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Style {
    pub font: FontStyle,
    pub fill: FillStyle,
    pub border: BorderStyle,
    pub alignment: Alignment,
    /// Custom number format code; `None` is General
    pub number_format: Option<String>,
}

impl Style {
    /// Create a new default style
    pub fn new() -> Self {
        Self::default()
    }

    /// Set font to bold
    pub fn bold(mut self, bold: bool) -> Self {
        self.font.bold = bold;
        self
    }

    /// Set font to italic
    pub fn italic(mut self, italic: bool) -> Self {
        self.font.italic = italic;
        self
    }

    /// Set font size in points
    pub fn font_size(mut self, size: f64) -> Self {
        self.font.size = size;
        self
    }

    /// Set font color
    pub fn font_color(mut self, color: Color) -> Self {
        self.font.color = Some(color);
        self
    }

    /// Set a solid background fill
    pub fn fill_color(mut self, color: Color) -> Self {
        self.fill = FillStyle::Solid(color);
        self
    }

    /// Thin border on all edges
    pub fn thin_border(mut self) -> Self {
        self.border = BorderStyle::Thin;
        self
    }

    /// Set horizontal alignment
    pub fn align(mut self, horizontal: HorizontalAlignment) -> Self {
        self.alignment.horizontal = horizontal;
        self
    }

    /// Center vertically
    pub fn vertical_center(mut self) -> Self {
        self.alignment.vertical_center = true;
        self
    }

    /// Wrap text
    pub fn wrap(mut self) -> Self {
        self.alignment.wrap_text = true;
        self
    }

    /// Set a custom number format (e.g. `"$#,##0"`)
    pub fn number_format<S: Into<String>>(mut self, code: S) -> Self {
        self.number_format = Some(code.into());
        self
    }

    /// True when the number format renders numbers as dates
    pub fn is_date(&self) -> bool {
        let code = match &self.number_format {
            Some(code) => code,
            None => return false,
        };
        // Quoted literals and [colour]/[$-locale] sections carry no date tokens
        let mut plain = String::new();
        let mut in_quote = false;
        let mut in_bracket = false;
        for c in code.chars() {
            match c {
                '"' => in_quote = !in_quote,
                '[' if !in_quote => in_bracket = true,
                ']' if !in_quote => in_bracket = false,
                _ if !in_quote && !in_bracket => plain.push(c.to_ascii_lowercase()),
                _ => {}
            }
        }
        plain.contains('y') || plain.contains('d') || plain.contains("mmm")
    }
}

/// Style pool for deduplicating styles
///
/// Cells reference styles by index; index 0 is always the default style.
#[derive(Debug, Clone)]
pub struct StylePool {
    styles: Vec<Style>,
    index_map: AHashMap<StyleKey, u32>,
}

/// Key for style lookup (hash-based)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct StyleKey(u64);

impl StyleKey {
    fn from_style(style: &Style) -> Self {
        let mut hasher = ahash::AHasher::default();
        style.hash(&mut hasher);
        StyleKey(hasher.finish())
    }
}

impl StylePool {
    /// Create a new style pool with default style at index 0
    pub fn new() -> Self {
        let mut pool = Self {
            styles: Vec::with_capacity(16),
            index_map: AHashMap::with_capacity(16),
        };
        let default = Style::default();
        pool.index_map.insert(StyleKey::from_style(&default), 0);
        pool.styles.push(default);
        pool
    }

    /// Get or create a style, returning its index
    pub fn get_or_insert(&mut self, style: &Style) -> u32 {
        let key = StyleKey::from_style(style);

        if let Some(&idx) = self.index_map.get(&key) {
            // Hash collision check
            if &self.styles[idx as usize] == style {
                return idx;
            }
        }

        let idx = self.styles.len() as u32;
        self.index_map.insert(key, idx);
        self.styles.push(style.clone());
        idx
    }

    /// Get a style by index
    pub fn get(&self, index: u32) -> Option<&Style> {
        self.styles.get(index as usize)
    }

    /// Number of styles, default included
    pub fn len(&self) -> usize {
        self.styles.len()
    }

    /// True when only the default style is present
    pub fn is_empty(&self) -> bool {
        self.styles.len() <= 1
    }
}

impl Default for StylePool {
    fn default() -> Self {
        Self::new()
    }
}
