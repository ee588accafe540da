//! Typed view of the raw snippet data returned by the OCR highlighter.
//!
//! Backend payloads are loosely typed (numbers arrive as strings, regions as
//! lists or index-keyed maps, highlights as single boxes or box lists). All of
//! that is absorbed here; missing or wrong-typed fields are recorded in
//! [`Diagnostics`] and replaced with neutral values instead of failing.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Highlight section of a search response: engine document id to the
/// per-field highlight payload, in backend relevance order.
pub type OcrHighlighting = IndexMap<String, Value>;

/// Counters for malformed input that was degraded rather than rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Diagnostics {
    /// Snippets that were not JSON objects.
    pub malformed_snippets: u32,
    /// Snippets without a usable `pages[0]`.
    pub missing_pages: u32,
    /// Highlights whose parent region was absent.
    pub missing_regions: u32,
    /// Coordinates that were not numeric.
    pub malformed_coordinates: u32,
    /// Absolute highlights normalized against a zero page dimension.
    pub zero_dimensions: u32,
}

impl Diagnostics {
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

/// A coordinate exactly as the backend sent it (number or numeric string).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Coord(Value);

impl Coord {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Floating point value, if the coordinate is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match &self.0 {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }

    /// Integer interpretation, truncating toward zero.
    ///
    /// Strings that are not full numbers fall back to their leading integer
    /// (`"12px"` is 12); anything else is 0.
    pub fn as_int(&self) -> i64 {
        match &self.0 {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
                .unwrap_or(0),
            Value::String(s) => match s.trim().parse::<f64>() {
                Ok(f) if f.is_finite() => f.trunc() as i64,
                _ => leading_int(s),
            },
            _ => 0,
        }
    }
}

fn leading_int(s: &str) -> i64 {
    let s = s.trim_start();
    let (sign, rest) = match s.as_bytes().first() {
        Some(b'-') => (-1, &s[1..]),
        Some(b'+') => (1, &s[1..]),
        _ => (1, s),
    };
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    rest[..end].parse::<i64>().map(|n| sign * n).unwrap_or(0)
}

/// Geometry of the page a snippet was cut from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageGeometry {
    pub id: String,
    pub width: f64,
    pub height: f64,
}

/// One highlight mark: a box plus the region it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct Highlight {
    pub ulx: Coord,
    pub uly: Coord,
    pub lrx: Coord,
    pub lry: Coord,
    pub parent_region_idx: Option<usize>,
}

impl Highlight {
    /// Parse a highlight given either as one box or as a list of boxes
    /// (only the first box is used).
    fn from_value(value: &Value, diagnostics: &mut Diagnostics) -> Option<Self> {
        let mark = match value {
            Value::Array(boxes) => boxes.first()?,
            other => other,
        };
        let obj = mark.as_object()?;

        let coord = |key: &str| Coord::new(obj.get(key).cloned().unwrap_or(Value::Null));
        let highlight = Self {
            ulx: coord("ulx"),
            uly: coord("uly"),
            lrx: coord("lrx"),
            lry: coord("lry"),
            parent_region_idx: obj.get("parentRegionIdx").and_then(index_value),
        };

        if [&highlight.ulx, &highlight.uly, &highlight.lrx, &highlight.lry]
            .iter()
            .any(|c| c.as_f64().is_none())
        {
            diagnostics.malformed_coordinates += 1;
        }
        Some(highlight)
    }
}

/// One highlighted fragment of an OCR document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snippet {
    /// `pages[0]`; later pages are never consulted.
    pub page: Option<PageGeometry>,
    pub regions: BTreeMap<usize, String>,
    pub highlights: Vec<Highlight>,
}

impl Snippet {
    /// Build a snippet from raw backend JSON. Never fails.
    pub fn from_value(value: &Value, diagnostics: &mut Diagnostics) -> Self {
        let Some(obj) = value.as_object() else {
            diagnostics.malformed_snippets += 1;
            return Self::default();
        };

        let page = obj
            .get("pages")
            .and_then(Value::as_array)
            .and_then(|pages| pages.first())
            .and_then(Value::as_object)
            .map(|page| PageGeometry {
                id: match page.get("id") {
                    Some(Value::String(s)) => s.clone(),
                    Some(Value::Number(n)) => n.to_string(),
                    _ => String::new(),
                },
                width: page.get("width").and_then(dimension).unwrap_or(0.0),
                height: page.get("height").and_then(dimension).unwrap_or(0.0),
            });
        if page.is_none() {
            diagnostics.missing_pages += 1;
        }

        let regions = match obj.get("regions") {
            Some(Value::Array(list)) => list
                .iter()
                .enumerate()
                .map(|(idx, region)| (idx, region_text(region)))
                .collect(),
            Some(Value::Object(map)) => map
                .iter()
                .filter_map(|(key, region)| {
                    Some((key.trim().parse::<usize>().ok()?, region_text(region)))
                })
                .collect(),
            _ => BTreeMap::new(),
        };

        let highlights = obj
            .get("highlights")
            .and_then(Value::as_array)
            .map(|marks| {
                marks
                    .iter()
                    .filter_map(|mark| {
                        let parsed = Highlight::from_value(mark, diagnostics);
                        if parsed.is_none() {
                            diagnostics.malformed_coordinates += 1;
                        }
                        parsed
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            page,
            regions,
            highlights,
        }
    }

    /// The page id, or empty if the snippet has no page.
    pub fn page_id(&self) -> &str {
        self.page.as_ref().map(|p| p.id.as_str()).unwrap_or("")
    }

    /// Page `(width, height)`, zero when unknown.
    pub fn dimensions(&self) -> (f64, f64) {
        self.page
            .as_ref()
            .map(|p| (p.width, p.height))
            .unwrap_or((0.0, 0.0))
    }

    /// Context text of the region a highlight points at; empty if absent.
    pub fn region_text(&self, idx: Option<usize>, diagnostics: &mut Diagnostics) -> &str {
        match idx.and_then(|i| self.regions.get(&i)) {
            Some(text) => text,
            None => {
                diagnostics.missing_regions += 1;
                ""
            }
        }
    }
}

fn region_text(region: &Value) -> String {
    match region {
        Value::Object(obj) => obj
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        Value::String(s) => s.clone(),
        _ => String::new(),
    }
}

fn dimension(value: &Value) -> Option<f64> {
    Coord::new(value.clone()).as_f64()
}

fn index_value(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
