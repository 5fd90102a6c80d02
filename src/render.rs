// proposal-pdf: draw a computed layout into a PDF document

use std::io::Read;

use ::image::{DynamicImage, Rgba, RgbImage};
use log::debug;
use printpdf::path::{PaintMode, WindingOrder};
use printpdf::*;

use crate::error::AppError;
use crate::layout::{self, Layout, LineKind, PageGeometry, BODY_FONT_SIZE, TITLE_FONT_SIZE};

// ============================================================================
// Constants
// ============================================================================

/// Header font sizes in points
const BRAND_FONT_SIZE: f32 = 18.0;
const SUBTITLE_FONT_SIZE: f32 = 11.0;
const HEADING_FONT_SIZE: f32 = 14.0;

/// Header text baselines, measured from the page top in points
const BRAND_BASELINE: f32 = 68.0;
const SUBTITLE_BASELINE: f32 = 88.0;
const HEADING_BASELINE: f32 = 108.0;
const HEADER_TEXT_INSET: f32 = 20.0;

/// Logo box inside the header band
const LOGO_MAX_WIDTH_PT: f32 = 120.0;
const LOGO_PADDING_PT: f32 = 10.0;

/// Segments used to approximate each rounded corner
const CORNER_STEPS: usize = 6;

const BACKGROUND: (u8, u8, u8) = (232, 225, 208);
const HEADER_GREEN: (u8, u8, u8) = (31, 163, 91);
const CONTAINER: (u8, u8, u8) = (255, 255, 255);
const INK: (u8, u8, u8) = (17, 17, 17);

/// Fixed text of the first-page header.
#[derive(Debug, Clone)]
pub struct DocumentHeader {
    pub brand_name: String,
    pub subtitle: String,
    pub heading: String,
    pub logo: Option<DynamicImage>,
}

// ============================================================================
// Rendering
// ============================================================================

/// Draws every page of `layout` and returns the serialized PDF.
pub fn render_pdf(layout: &Layout, header: &DocumentHeader) -> Result<Vec<u8>, AppError> {
    let geometry = &layout.geometry;
    let page_width = Mm(pt_to_mm(geometry.width));
    let page_height = Mm(pt_to_mm(geometry.height));

    let (doc, page1, layer1) = PdfDocument::new(&header.heading, page_width, page_height, "Layer 1");

    let font_regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| AppError::PdfError(e.to_string()))?;
    let font_bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| AppError::PdfError(e.to_string()))?;

    for (index, page) in layout.pages.iter().enumerate() {
        let layer = if index == 0 {
            doc.get_page(page1).get_layer(layer1)
        } else {
            let (new_page, new_layer) = doc.add_page(page_width, page_height, "Layer 1");
            doc.get_page(new_page).get_layer(new_layer)
        };

        let full_page = layout::Rect {
            x: 0.0,
            y: 0.0,
            width: geometry.width,
            height: geometry.height,
            radius: 0.0,
        };
        fill_rounded_rect(&layer, &full_page, geometry.height, BACKGROUND);

        if index == 0 {
            draw_header(&layer, geometry, header, &font_regular, &font_bold)?;
        }

        fill_rounded_rect(&layer, &page.container, geometry.height, CONTAINER);

        layer.set_fill_color(rgb(INK));
        for line in page.lines.iter().filter(|l| !l.text.is_empty()) {
            let (font, size) = match line.kind {
                LineKind::Title => (&font_bold, TITLE_FONT_SIZE),
                LineKind::Body => (&font_regular, BODY_FONT_SIZE),
            };
            layer.use_text(
                line.text.as_str(),
                size,
                Mm(pt_to_mm(line.x)),
                Mm(pt_to_mm(geometry.height - line.y)),
                font,
            );
        }
    }

    let bytes = doc.save_to_bytes().map_err(|e| AppError::PdfError(e.to_string()))?;
    debug!(
        "event=render status=ok pages={} bytes={}",
        layout.page_count(),
        bytes.len()
    );
    Ok(bytes)
}

fn draw_header(
    layer: &PdfLayerReference,
    geometry: &PageGeometry,
    header: &DocumentHeader,
    font_regular: &IndirectFontRef,
    font_bold: &IndirectFontRef,
) -> Result<(), AppError> {
    let band = &geometry.header;
    fill_rounded_rect(layer, band, geometry.height, HEADER_GREEN);

    let text_x = Mm(pt_to_mm(band.x + HEADER_TEXT_INSET));
    let baseline = |y: f32| Mm(pt_to_mm(geometry.height - y));

    layer.set_fill_color(rgb(CONTAINER));
    layer.use_text(
        header.brand_name.as_str(),
        BRAND_FONT_SIZE,
        text_x,
        baseline(BRAND_BASELINE),
        font_bold,
    );
    layer.use_text(
        header.subtitle.as_str(),
        SUBTITLE_FONT_SIZE,
        text_x,
        baseline(SUBTITLE_BASELINE),
        font_regular,
    );
    layer.use_text(
        header.heading.as_str(),
        HEADING_FONT_SIZE,
        text_x,
        baseline(HEADING_BASELINE),
        font_bold,
    );

    if let Some(ref logo) = header.logo {
        embed_logo(
            layer,
            logo,
            LOGO_MAX_WIDTH_PT,
            band.height - 2.0 * LOGO_PADDING_PT,
            band.x + band.width - LOGO_PADDING_PT,
            geometry.height - band.y - LOGO_PADDING_PT,
        );
    }

    Ok(())
}

/// Right- and top-aligns the logo against the given edges (PDF space, pt),
/// compositing transparency onto the header colour.
fn embed_logo(
    layer: &PdfLayerReference,
    logo_image: &DynamicImage,
    max_width_pt: f32,
    max_height_pt: f32,
    right_edge_x: f32,
    top_y: f32,
) {
    let rgba_image = logo_image.to_rgba8();
    let (width_px, height_px) = rgba_image.dimensions();
    if width_px == 0 || height_px == 0 {
        return;
    }

    let (bg_r, bg_g, bg_b) = HEADER_GREEN;
    let mut rgb_image = RgbImage::new(width_px, height_px);
    for (x, y, pixel) in rgba_image.enumerate_pixels() {
        let Rgba([r, g, b, a]) = *pixel;
        let alpha = a as f32 / 255.0;
        let blend = |c: u8, bg: u8| (c as f32 * alpha + bg as f32 * (1.0 - alpha)) as u8;
        rgb_image.put_pixel(x, y, ::image::Rgb([blend(r, bg_r), blend(g, bg_g), blend(b, bg_b)]));
    }

    let aspect_ratio = width_px as f32 / height_px as f32;
    let (final_width, final_height) = if max_width_pt / max_height_pt > aspect_ratio {
        (max_height_pt * aspect_ratio, max_height_pt)
    } else {
        (max_width_pt, max_width_pt / aspect_ratio)
    };

    let image = Image::from(ImageXObject {
        width: Px(width_px as usize),
        height: Px(height_px as usize),
        color_space: ColorSpace::Rgb,
        bits_per_component: ColorBits::Bit8,
        interpolate: true,
        image_data: rgb_image.into_raw(),
        image_filter: None,
        clipping_bbox: None,
        smask: None,
    });

    // DPI = pixels / inches
    let dpi = width_px as f32 / (final_width / 72.0);

    image.add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(pt_to_mm(right_edge_x - final_width))),
            translate_y: Some(Mm(pt_to_mm(top_y - final_height))),
            dpi: Some(dpi),
            ..Default::default()
        },
    );
}

// ============================================================================
// Logo Loading
// ============================================================================

/// Reads a logo from a file path or an http(s) URL.
pub fn load_logo(source: &str) -> Result<DynamicImage, AppError> {
    let image_bytes = if source.starts_with("http://") || source.starts_with("https://") {
        let response = ureq::get(source)
            .call()
            .map_err(|e| AppError::LogoError(format!("Failed to fetch URL: {}", e)))?;

        let mut bytes = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut bytes)
            .map_err(|e| AppError::LogoError(format!("Failed to read response: {}", e)))?;
        bytes
    } else {
        std::fs::read(source).map_err(|e| AppError::LogoError(format!("{}: {}", source, e)))?
    };

    ::image::load_from_memory(&image_bytes)
        .map_err(|e| AppError::LogoError(format!("Failed to decode image: {}", e)))
}

// ============================================================================
// Drawing Utilities
// ============================================================================

fn pt_to_mm(pt: f32) -> f32 {
    pt * 25.4 / 72.0
}

fn rgb((r, g, b): (u8, u8, u8)) -> Color {
    Color::Rgb(Rgb::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, None))
}

/// Outline of a rounded rectangle in PDF space, counter-clockwise from the
/// bottom-right corner. Corners are polylines so every point is on-curve.
fn rounded_rect_points(rect: &layout::Rect, page_height: f32) -> Vec<(Point, bool)> {
    let r = rect.radius.min(rect.width / 2.0).min(rect.height / 2.0).max(0.0);
    let left = rect.x;
    let right = rect.x + rect.width;
    let top = page_height - rect.y;
    let bottom = page_height - rect.bottom();

    let corners = [
        (right - r, bottom + r, 270.0_f32),
        (right - r, top - r, 0.0),
        (left + r, top - r, 90.0),
        (left + r, bottom + r, 180.0),
    ];

    let mut points = Vec::with_capacity(corners.len() * (CORNER_STEPS + 1));
    for (cx, cy, start) in corners {
        for step in 0..=CORNER_STEPS {
            let angle = (start + 90.0 * step as f32 / CORNER_STEPS as f32).to_radians();
            let x = cx + r * angle.cos();
            let y = cy + r * angle.sin();
            points.push((Point::new(Mm(pt_to_mm(x)), Mm(pt_to_mm(y))), false));
        }
    }
    points
}

fn fill_rounded_rect(
    layer: &PdfLayerReference,
    rect: &layout::Rect,
    page_height: f32,
    color: (u8, u8, u8),
) {
    layer.set_fill_color(rgb(color));
    layer.add_polygon(Polygon {
        rings: vec![rounded_rect_points(rect, page_height)],
        mode: PaintMode::Fill,
        winding_order: WindingOrder::NonZero,
    });
}

// ============================================================================
// Tests
// ============================================================================
