//! SVG export serializer.
//!
//! Converts a curve into an SVG string using the [`svg`] crate for
//! document construction, XML escaping, and path data formatting.
//!
//! The curve becomes a single `<path>` in image coordinates: `M` to the
//! first leaf anchor, then `L` through every following anchor. The
//! `viewBox` matches the source image so the drawing overlays it 1:1.
//!
//! Optional [`SvgMetadata`] embeds `<title>`, `<desc>` and a
//! `<metadata>` block carrying the configuration as JSON.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use svg::Document;
use svg::node::element::path::Data;
use svg::node::element::{Description, Element, Path, Title};
use svg::node::{Node, Text, Value};

use hilbert_draw_pipeline::{Dimensions, Polyline};

/// Namespace of the element wrapping the configuration JSON.
const CONFIG_NAMESPACE: &str = "urn:hilbert-draw:config:1";

/// Metadata to embed in the SVG document.
///
/// All fields are optional. Text values are XML-escaped by the `svg`
/// crate.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title, emitted as `<title>`.
    ///
    /// Typically the source image filename (without extension).
    pub title: Option<&'a str>,

    /// Document description, emitted as `<desc>`.
    pub description: Option<&'a str>,

    /// Serialized [`CurveConfig`](hilbert_draw_pipeline::CurveConfig),
    /// emitted inside `<metadata>` so exported files can be reproduced.
    pub config_json: Option<&'a str>,
}

/// Build an SVG path `d` attribute string from a polyline.
///
/// Uses `M` for the first point and `L` for subsequent points.
/// Returns an empty string for polylines with fewer than 2 points.
///
/// # Examples
///
/// ```
/// use hilbert_draw_pipeline::{Point, Polyline};
/// use hilbert_draw_export::build_path_data;
///
/// let polyline = Polyline::new(vec![
///     Point::new(0.0, 0.0),
///     Point::new(1.0, 0.0),
///     Point::new(1.0, 1.0),
/// ]);
/// assert_eq!(build_path_data(&polyline), "M0,0 L1,0 L1,1");
/// ```
#[must_use]
pub fn build_path_data(polyline: &Polyline) -> String {
    let Some((first, rest)) = polyline.points().split_first() else {
        return String::new();
    };
    if rest.is_empty() {
        return String::new();
    }

    let data = rest
        .iter()
        .fold(Data::new().move_to((first.x, first.y)), |data, p| {
            data.line_to((p.x, p.y))
        });
    String::from(Value::from(data))
}

/// Serialize a curve into an SVG document string.
///
/// The document is `dimensions` pixels wide and high with a matching
/// `viewBox`. A curve with fewer than two points produces no `<path>`.
#[must_use]
pub fn to_svg(polyline: &Polyline, dimensions: Dimensions, metadata: &SvgMetadata<'_>) -> String {
    let w = dimensions.width;
    let h = dimensions.height;
    let mut doc = Document::new()
        .set("width", w)
        .set("height", h)
        .set("viewBox", (0, 0, w, h));

    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }

    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }

    if let Some(config_json) = metadata.config_json {
        let mut config_el = Element::new("hilbert-draw:config");
        config_el.assign("xmlns:hilbert-draw", CONFIG_NAMESPACE);
        config_el.append(Text::new(config_json));
        let mut metadata_el = Element::new("metadata");
        metadata_el.append(config_el);
        doc = doc.add(metadata_el);
    }

    let d = build_path_data(polyline);
    if !d.is_empty() {
        let path = Path::new()
            .set("d", d)
            .set("fill", "none")
            .set("stroke", "black")
            .set("stroke-width", 1)
            .set("stroke-linejoin", "round");
        doc = doc.add(path);
    }

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}
