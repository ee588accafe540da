//! Conversion of highlight marks into page-relative boxes.

use serde::Serialize;

use super::types::{Coord, Diagnostics, Highlight};

/// One box component in the viewer's output format.
///
/// Absolute input yields fixed three-decimal strings; relative input is
/// passed through with its original JSON type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BoxCoord {
    Fixed(String),
    Raw(Coord),
}

/// A highlight box in relative (0..1) page space.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighlightBox {
    pub l: BoxCoord,
    pub t: BoxCoord,
    pub r: BoxCoord,
    pub b: BoxCoord,
    pub page: u32,
}

/// Coordinate convention of a highlight mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateSystem {
    /// Pixel offsets (ALTO); divided by page geometry.
    Absolute,
    /// Fractions of the page (MiniOCR); already relative.
    Relative,
}

impl CoordinateSystem {
    /// A mark whose `lrx` is a positive integer is absolute.
    pub fn detect(highlight: &Highlight) -> Self {
        if highlight.lrx.as_int() > 0 {
            Self::Absolute
        } else {
            Self::Relative
        }
    }
}

/// Normalize one highlight mark against its page geometry.
///
/// `page` is stamped onto the box as given. Dividing by a zero dimension
/// yields `0` and bumps [`Diagnostics::zero_dimensions`].
pub fn normalize(
    highlight: &Highlight,
    page_width: f64,
    page_height: f64,
    page: u32,
    diagnostics: &mut Diagnostics,
) -> HighlightBox {
    match CoordinateSystem::detect(highlight) {
        CoordinateSystem::Absolute => {
            if page_width == 0.0 || page_height == 0.0 {
                diagnostics.zero_dimensions += 1;
            }
            HighlightBox {
                l: fraction(&highlight.ulx, page_width),
                t: fraction(&highlight.uly, page_height),
                r: fraction(&highlight.lrx, page_width),
                b: fraction(&highlight.lry, page_height),
                page,
            }
        }
        CoordinateSystem::Relative => HighlightBox {
            l: BoxCoord::Raw(highlight.ulx.clone()),
            t: BoxCoord::Raw(highlight.uly.clone()),
            r: BoxCoord::Raw(highlight.lrx.clone()),
            b: BoxCoord::Raw(highlight.lry.clone()),
            page,
        },
    }
}

fn fraction(coord: &Coord, dimension: f64) -> BoxCoord {
    let value = coord.as_f64().unwrap_or(0.0);
    let relative = if dimension == 0.0 || !dimension.is_finite() {
        0.0
    } else {
        value / dimension
    };
    BoxCoord::Fixed(format!("{:.3}", relative))
}
