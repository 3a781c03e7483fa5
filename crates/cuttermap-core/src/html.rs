//! HTML/CSS rendering of a cutter map.
//!
//! Produces a self-contained document with one absolutely positioned
//! `<section>` per sheet, sized in points with a matching `@page` rule so
//! a browser prints it at the original proportions.

use crate::model::ExtractionResult;
use crate::options::RenderOptions;
use crate::scale::Geometry;
use crate::sheet::{Align, DrawItem, Sheet, compose};

/// Renders cutter maps as printable HTML.
pub struct HtmlRenderer;

impl HtmlRenderer {
    /// Lay out `result` and render it.
    pub fn render(result: &ExtractionResult, options: &RenderOptions) -> String {
        let geometry = Geometry::for_blades(&result.blades, options);
        let sheets = compose(result, &geometry, options.page_width, options.page_height);
        Self::render_sheets(&Self::title(result), &sheets, &geometry)
    }

    /// Document title: `Cutter Map` plus the serial number when known.
    pub fn title(result: &ExtractionResult) -> String {
        if result.header.serial_number.is_empty() {
            "Cutter Map".to_string()
        } else {
            format!("Cutter Map {}", result.header.serial_number)
        }
    }

    /// Render already composed sheets.
    pub fn render_sheets(title: &str, sheets: &[Sheet], geometry: &Geometry) -> String {
        let (w, h) = sheets
            .first()
            .map(|s| (s.width, s.height))
            .unwrap_or((792.0, 612.0));
        let mut html = String::new();
        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
        html.push_str(&format!("<title>{}</title>\n", escape_html(title)));
        html.push_str("<style>\n");
        html.push_str(&format!("@page {{ size: {}pt {}pt; margin: 0; }}\n", fmt(w), fmt(h)));
        html.push_str("body { margin: 0; font-family: Helvetica, Arial, sans-serif; }\n");
        html.push_str(&format!(
            ".sheet {{ position: relative; width: {}pt; height: {}pt; overflow: hidden; page-break-after: always; }}\n",
            fmt(w),
            fmt(h)
        ));
        html.push_str(".t { position: absolute; white-space: nowrap; line-height: 1; }\n");
        html.push_str(&format!(
            ".c {{ position: absolute; border-radius: 50%; box-sizing: border-box; border: {}pt solid; }}\n",
            fmt(0.75 * geometry.scale)
        ));
        html.push_str(".r { position: absolute; box-sizing: border-box; }\n");
        html.push_str(".i { position: absolute; }\n");
        html.push_str("</style>\n</head>\n<body>\n");
        for sheet in sheets {
            html.push_str("<section class=\"sheet\">\n");
            for item in &sheet.items {
                html.push_str(&item_to_html(item));
                html.push('\n');
            }
            html.push_str("</section>\n");
        }
        html.push_str("</body>\n</html>\n");
        html
    }
}

/// Format a length without float noise.
fn fmt(v: f64) -> String {
    let rounded = (v * 100.0).round() / 100.0;
    format!("{rounded}")
}

fn item_to_html(item: &DrawItem) -> String {
    match item {
        DrawItem::Text {
            x,
            top,
            width,
            size,
            text,
            bold,
            align,
            color,
        } => {
            let mut style = format!(
                "left: {}pt; top: {}pt; font-size: {}pt; color: {};",
                fmt(*x),
                fmt(*top),
                fmt(*size),
                color.to_hex()
            );
            if *align == Align::Center {
                style.push_str(&format!(" width: {}pt; text-align: center;", fmt(*width)));
            }
            if *bold {
                style.push_str(" font-weight: bold;");
            }
            format!(
                "<div class=\"t\" style=\"{style}\">{}</div>",
                escape_html(text)
            )
        }
        DrawItem::Circle {
            cx,
            cy,
            r,
            fill,
            stroke,
        } => format!(
            "<div class=\"c\" style=\"left: {}pt; top: {}pt; width: {}pt; height: {}pt; background: {}; border-color: {};\"></div>",
            fmt(cx - r),
            fmt(cy - r),
            fmt(2.0 * r),
            fmt(2.0 * r),
            fill.to_hex(),
            stroke.to_hex()
        ),
        DrawItem::Rect { bbox, fill, stroke } => {
            let mut style = format!(
                "left: {}pt; top: {}pt; width: {}pt; height: {}pt;",
                fmt(bbox.x0),
                fmt(bbox.top),
                fmt(bbox.width()),
                fmt(bbox.height())
            );
            if let Some(fill) = fill {
                style.push_str(&format!(" background: {};", fill.to_hex()));
            }
            if let Some(stroke) = stroke {
                style.push_str(&format!(" border: 1px solid {};", stroke.to_hex()));
            }
            format!("<div class=\"r\" style=\"{style}\"></div>")
        }
        DrawItem::Image { bbox, icon } => format!(
            "<img class=\"i\" style=\"left: {}pt; top: {}pt; width: {}pt; height: {}pt;\" src=\"data:image/png;base64,{}\" alt=\"\">",
            fmt(bbox.x0),
            fmt(bbox.top),
            fmt(bbox.width()),
            fmt(bbox.height()),
            escape_html(&icon.png_base64)
        ),
    }
}

/// Escape special HTML characters.
fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
