//! SVG writer for finished QR symbols.
//!
//! Dark modules are stamped as `<use>` references to a shape definition;
//! finder and alignment patterns are then superimposed as grouped concentric
//! rings so that non-square module shapes keep the locator geometry scannable.

use std::io;
use std::path::Path as FsPath;

use svg::node::element::{Circle, ClipPath, Definitions, Group, Image, Path, Rectangle, Use};
use svg::Document;

use crate::builder::QR;
use crate::common::metadata::Color;

const QUIET_ZONE: f64 = 4.0;

// Fraction of a cell left as breathing room between non-square modules
const CELL_GAP: f64 = 0.125;

const LOGO_RELATIVE_SIZE: f64 = 1.0 / 6.0;

const LOGO_BORDER_WIDTH: f64 = 0.4;

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Shape {
    Square,
    Circle,
    Rounded,
    Squircle,
}

impl Shape {
    fn id(self) -> &'static str {
        match self {
            Self::Square => "square",
            Self::Circle => "circle",
            Self::Rounded => "rounded",
            Self::Squircle => "squircle",
        }
    }

    fn href(self) -> String {
        format!("#{}", self.id())
    }
}

#[derive(Debug, Clone)]
pub struct SvgOptions {
    // Pixels per module
    pub scale: u32,
    pub shape: Shape,
    // Any CSS color
    pub color: String,
    // href for a centre logo; data URIs work
    pub logo: Option<String>,
    pub debug: bool,
}

impl Default for SvgOptions {
    fn default() -> Self {
        Self { scale: 10, shape: Shape::Square, color: "#000000".into(), logo: None, debug: false }
    }
}

pub fn write_svg(qr: &QR, options: &SvgOptions, path: impl AsRef<FsPath>) -> io::Result<()> {
    svg::save(path, &render_svg(qr, options))
}

pub fn render_svg(qr: &QR, options: &SvgOptions) -> Document {
    let dim = qr.width();
    let side = dim as f64 + 2.0 * QUIET_ZONE;
    let px = (side * options.scale as f64).round() as u32;

    let mut doc = Document::new()
        .set("viewBox", (-QUIET_ZONE, -QUIET_ZONE, side, side))
        .set("width", px)
        .set("height", px)
        .set("style", "background-color:white")
        .add(definitions(options));

    if options.debug {
        let half = dim as f64 / 2.0;
        doc = doc.add(
            Path::new()
                .set("d", format!("M {half} 0 L {half} {dim} M 0 {half} L {dim} {half}"))
                .set("style", "stroke:red;stroke-width:0.1"),
        );
    }

    // Stamp every dark module; locator regions get repainted below
    let shape = options.shape;
    for r in 0..dim as i16 {
        for c in 0..dim as i16 {
            if *qr.get(r, c) == Color::Dark {
                doc = doc.add(
                    Use::new()
                        .set("href", shape.href())
                        .set("x", c as f64)
                        .set("y", r as f64)
                        .set("style", module_style(shape, &options.color, 1.0)),
                );
            }
        }
    }

    for (r, c) in qr.alignment_centers() {
        doc = doc.add(
            Use::new()
                .set("href", "#alignment")
                .set("x", c as f64 - 2.0)
                .set("y", r as f64 - 2.0),
        );
    }

    let far = (dim - 7) as f64;
    for (x, y) in [(0.0, 0.0), (far, 0.0), (0.0, far)] {
        doc = doc.add(Use::new().set("href", "#finder").set("x", x).set("y", y));
    }

    if let Some(logo) = &options.logo {
        doc = add_logo(doc, logo, dim, options);
    }

    doc
}

fn definitions(options: &SvgOptions) -> Definitions {
    let square = Rectangle::new()
        .set("id", Shape::Square.id())
        .set("x", 0)
        .set("y", 0)
        .set("width", 1)
        .set("height", 1);
    let circle = Circle::new()
        .set("id", Shape::Circle.id())
        .set("cx", 0.5)
        .set("cy", 0.5)
        .set("r", 0.5);
    let rounded = Rectangle::new()
        .set("id", Shape::Rounded.id())
        .set("x", 0)
        .set("y", 0)
        .set("width", 1)
        .set("height", 1)
        .set("rx", 0.3);
    let squircle = Path::new().set("id", Shape::Squircle.id()).set(
        "d",
        "M 0 0.5 C 0 0.125 0.125 0 0.5 0 S 1 0.125 1 0.5 0.875 1 0.5 1 0 0.875 0 0.5 Z",
    );

    Definitions::new()
        .add(square)
        .add(circle)
        .add(rounded)
        .add(squircle)
        .add(locator_group("finder", 7.0, options))
        .add(locator_group("alignment", 5.0, options))
}

// Concentric rings of the locator patterns: a white backdrop, an outer ring
// in the module shape, a white middle ring and a solid centre
fn locator_group(id: &str, size: f64, options: &SvgOptions) -> Group {
    let shape = options.shape;
    let color = &options.color;

    let background = Use::new()
        .set("href", Shape::Square.href())
        .set("style", "fill:white;stroke:none")
        .set("transform", transform(Shape::Square, size, 0.0, 0.0));
    let outer = Use::new()
        .set("href", shape.href())
        .set("style", module_style(shape, color, size))
        .set("transform", transform(shape, size, 0.0, 0.2));
    let middle = Use::new()
        .set("href", shape.href())
        .set("style", "fill:white;stroke:none")
        .set("transform", transform(shape, size - 2.0, 1.0, 0.0));
    let center = Use::new()
        .set("href", shape.href())
        .set("style", format!("fill:{color};stroke:none"))
        .set("transform", transform(shape, size - 4.0, 2.0, 0.0));

    Group::new().set("id", id).add(background).add(outer).add(middle).add(center)
}

fn add_logo(mut doc: Document, logo: &str, dim: usize, options: &SvgOptions) -> Document {
    let mut logo_size = (dim as f64 * LOGO_RELATIVE_SIZE).floor() as i64;
    // Odd size keeps the logo centred on the module grid
    logo_size += (logo_size + 1) % 2;
    let logo_pos = dim as i64 / 2 - logo_size / 2;
    let logo_center = logo_pos as f64 + logo_size as f64 / 2.0;

    if logo_size < 5 {
        return doc;
    }

    let shape = options.shape;
    let padding = if shape == Shape::Square { 1.0 } else { 2.0 };
    let radius = logo_size as f64 / 2.0 + padding;

    // Clear a keep-out disc so the logo never sits on live modules
    for y in logo_pos - 1..logo_pos + logo_size + 1 {
        for x in logo_pos - 1..logo_pos + logo_size + 1 {
            let dx = x as f64 + 0.5 - logo_center;
            let dy = y as f64 + 0.5 - logo_center;
            if dx * dx + dy * dy < radius * radius {
                doc = doc.add(
                    Use::new()
                        .set("href", Shape::Square.href())
                        .set("x", x as f64)
                        .set("y", y as f64)
                        .set("style", "fill:white;stroke:none"),
                );
            }
        }
    }

    let clip = ClipPath::new().set("id", "logoClip").add(
        Use::new()
            .set("href", shape.href())
            .set("transform", transform(shape, logo_size as f64, logo_pos as f64, 0.0)),
    );

    let border_scale = logo_size as f64 + 1.0;
    let mut border = Use::new()
        .set("href", shape.href())
        .set(
            "style",
            format!(
                "fill:none;stroke:{};stroke-width:{}",
                options.color,
                LOGO_BORDER_WIDTH / border_scale
            ),
        )
        .set("transform", transform(shape, border_scale, logo_pos as f64 - 0.5, 0.0));
    if shape == Shape::Square {
        border = border.set("visibility", "hidden");
    }

    let image = Image::new()
        .set("href", logo)
        .set("x", logo_pos as f64)
        .set("y", logo_pos as f64)
        .set("width", logo_size as f64)
        .set("height", logo_size as f64)
        .set("clip-path", "url(#logoClip)");

    doc.add(clip).add(border).add(image)
}

fn transform(shape: Shape, scale: f64, pos: f64, padding: f64) -> String {
    match shape {
        Shape::Square => format!("scale({scale}) translate({0},{0})", pos / scale),
        _ => {
            let scale = scale - padding;
            let pos = (pos + padding / 2.0) / scale;
            format!("scale({scale}) translate({pos},{pos})")
        }
    }
}

fn module_style(shape: Shape, color: &str, scale: f64) -> String {
    match shape {
        Shape::Square => format!("fill:{color};stroke:none"),
        _ => format!("fill:{color};stroke:white;stroke-width:{}", CELL_GAP / scale),
    }
}
