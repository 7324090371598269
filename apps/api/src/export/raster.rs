//! Rasterized PDF export.
//!
//! One capture is fitted to the page width and placed on as many pages as its
//! scaled height needs. Page k draws the same full image shifted up by
//! k page heights and the page boundary clips it to the k-th slice. The
//! slicing is pure arithmetic and may cut through a line of text.

use std::time::Duration;

use image::DynamicImage;
use printpdf::{Image, ImageTransform, Mm, PdfDocument};
use serde::Serialize;

use crate::export::capture::{Capture, Rasterizer};
use crate::export::ExportError;

pub const DEFAULT_TOLERANCE_MM: f32 = 2.0;
/// Refuse to emit more pages than any resume plausibly needs.
pub const MAX_RASTER_PAGES: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RasterPageSpec {
    pub page_width_mm: f32,
    pub page_height_mm: f32,
    /// Overflow smaller than this does not start a new page.
    pub tolerance_mm: f32,
}

impl RasterPageSpec {
    pub fn a4() -> Self {
        Self {
            page_width_mm: 210.0,
            page_height_mm: 297.0,
            tolerance_mm: DEFAULT_TOLERANCE_MM,
        }
    }
}

/// Where the shared image sits on one page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RasterPlacement {
    /// How far the image top is moved above the page top.
    pub translate_up_mm: f32,
    /// Height the full image is drawn at on this page.
    pub draw_height_mm: f32,
    /// Height of the image slice actually visible on this page.
    pub visible_height_mm: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RasterPlan {
    pub scaled_height_mm: f32,
    pub placements: Vec<RasterPlacement>,
}

impl RasterPlan {
    pub fn page_count(&self) -> usize {
        self.placements.len()
    }
}

/// Computes page placements for a `width_px` × `height_px` capture.
pub fn plan_pages(
    width_px: u32,
    height_px: u32,
    spec: &RasterPageSpec,
) -> Result<RasterPlan, ExportError> {
    if width_px == 0 || height_px == 0 {
        return Err(ExportError::Rasterize("capture has no pixels".to_string()));
    }

    let page_h = spec.page_height_mm;
    let scaled = height_px as f32 * spec.page_width_mm / width_px as f32;

    if scaled <= page_h + spec.tolerance_mm {
        let draw = scaled.min(page_h);
        return Ok(RasterPlan {
            scaled_height_mm: scaled,
            placements: vec![RasterPlacement {
                translate_up_mm: 0.0,
                draw_height_mm: draw,
                visible_height_mm: draw,
            }],
        });
    }

    let mut placements = Vec::new();
    let mut remaining = scaled;
    while remaining > spec.tolerance_mm {
        if placements.len() == MAX_RASTER_PAGES {
            return Err(ExportError::Rasterize(format!(
                "capture would need more than {MAX_RASTER_PAGES} pages"
            )));
        }
        let offset = placements.len() as f32 * page_h;
        placements.push(RasterPlacement {
            translate_up_mm: offset,
            draw_height_mm: scaled,
            visible_height_mm: (scaled - offset).min(page_h),
        });
        remaining -= page_h;
    }

    Ok(RasterPlan {
        scaled_height_mm: scaled,
        placements,
    })
}

/// Builds the PDF from one capture. The bitmap is converted once; printpdf
/// registers XObjects per page, so every page embeds its own copy of it,
/// shifted up by the page's offset.
pub fn render_raster_pdf(capture: Capture, spec: &RasterPageSpec) -> Result<Vec<u8>, ExportError> {
    let plan = plan_pages(capture.width_px(), capture.height_px(), spec)?;
    let page_w = Mm(spec.page_width_mm);
    let page_h = Mm(spec.page_height_mm);
    // Pixels per inch that make the image exactly one page wide.
    let dpi = capture.width_px() as f32 * 25.4 / spec.page_width_mm;

    let xobject = Image::from_dynamic_image(&DynamicImage::ImageRgb8(capture.image)).image;
    let (doc, first_page, first_layer) = PdfDocument::new("Resume", page_w, page_h, "Layer 1");

    for (idx, placement) in plan.placements.iter().enumerate() {
        let layer = if idx == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page, layer) = doc.add_page(page_w, page_h, "Layer 1");
            doc.get_page(page).get_layer(layer)
        };

        let squash = placement.draw_height_mm / plan.scaled_height_mm;
        let bottom =
            spec.page_height_mm + placement.translate_up_mm - placement.draw_height_mm;
        Image::from(xobject.clone()).add_to_layer(
            layer,
            ImageTransform {
                translate_x: Some(Mm(0.0)),
                translate_y: Some(Mm(bottom)),
                dpi: Some(dpi),
                scale_y: (squash < 1.0).then_some(squash),
                ..Default::default()
            },
        );
    }

    let mut buf = Vec::new();
    {
        let mut writer = std::io::BufWriter::new(&mut buf);
        doc.save(&mut writer)
            .map_err(|e| ExportError::Rasterize(format!("save: {e:?}")))?;
        std::io::Write::flush(&mut writer)
            .map_err(|e| ExportError::Rasterize(format!("flush: {e}")))?;
    }

    tracing::info!(
        pages = plan.page_count(),
        scaled_height_mm = plan.scaled_height_mm,
        bytes = buf.len(),
        "rasterized PDF assembled"
    );
    Ok(buf)
}

/// Waits `settle`, takes a single capture, then assembles the PDF off the
/// async runtime.
pub async fn export_rasterized(
    rasterizer: &dyn Rasterizer,
    settle: Duration,
    spec: RasterPageSpec,
) -> Result<Vec<u8>, ExportError> {
    if !settle.is_zero() {
        tokio::time::sleep(settle).await;
    }
    let capture = rasterizer.rasterize().await?;
    tokio::task::spawn_blocking(move || render_raster_pdf(capture, &spec))
        .await
        .map_err(|e| ExportError::Task(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use image::RgbImage;

    use super::*;

    const A4_H: f32 = 297.0;

    #[test]
    fn test_one_and_a_half_pages_gives_two_pages() {
        // 891 * 210 / 420 = 445.5 mm = 1.5 pages
        let plan = plan_pages(420, 891, &RasterPageSpec::a4()).unwrap();
        assert_eq!(plan.page_count(), 2);
        assert_eq!(plan.placements[0].translate_up_mm, 0.0);
        assert_eq!(plan.placements[1].translate_up_mm, A4_H);
        assert!((plan.placements[1].visible_height_mm - A4_H / 2.0).abs() < 1e-3);
        assert!((plan.placements[1].draw_height_mm - 445.5).abs() < 1e-3);
    }

    #[test]
    fn test_short_capture_is_single_page() {
        let plan = plan_pages(420, 300, &RasterPageSpec::a4()).unwrap();
        assert_eq!(plan.page_count(), 1);
        assert!((plan.placements[0].draw_height_mm - 150.0).abs() < 1e-3);
    }

    #[test]
    fn test_overflow_within_tolerance_stays_on_one_page() {
        // 596 * 210 / 420 = 298 mm, one mm past the page
        let plan = plan_pages(420, 596, &RasterPageSpec::a4()).unwrap();
        assert_eq!(plan.page_count(), 1);
        assert_eq!(plan.placements[0].draw_height_mm, A4_H);
    }

    #[test]
    fn test_exact_multiple_does_not_add_blank_page() {
        // 1188 * 210 / 420 = 594 mm = 2 pages
        let plan = plan_pages(420, 1188, &RasterPageSpec::a4()).unwrap();
        assert_eq!(plan.page_count(), 2);
    }

    #[test]
    fn test_zero_sized_capture_rejected() {
        assert!(plan_pages(0, 100, &RasterPageSpec::a4()).is_err());
        assert!(plan_pages(100, 0, &RasterPageSpec::a4()).is_err());
    }

    #[test]
    fn test_absurd_height_rejected() {
        assert!(plan_pages(10, 100_000, &RasterPageSpec::a4()).is_err());
    }

    #[test]
    fn test_render_raster_pdf_bytes() {
        let capture = Capture {
            image: RgbImage::from_pixel(42, 89, image::Rgb([255, 255, 255])),
            scale: 2.0,
        };
        let bytes = render_raster_pdf(capture, &RasterPageSpec::a4()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    struct CountingRasterizer {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Rasterizer for CountingRasterizer {
        async fn rasterize(&self) -> Result<Capture, ExportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Capture {
                image: RgbImage::from_pixel(42, 89, image::Rgb([0, 0, 0])),
                scale: 2.0,
            })
        }
    }

    struct FailingRasterizer;

    #[async_trait]
    impl Rasterizer for FailingRasterizer {
        async fn rasterize(&self) -> Result<Capture, ExportError> {
            Err(ExportError::Rasterize("no element".to_string()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_export_captures_once_after_settle() {
        let rasterizer = CountingRasterizer {
            calls: AtomicUsize::new(0),
        };
        let bytes = export_rasterized(&rasterizer, Duration::from_millis(300), RasterPageSpec::a4())
            .await
            .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert_eq!(rasterizer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_export_failure_carries_print_hint() {
        let err = export_rasterized(&FailingRasterizer, Duration::ZERO, RasterPageSpec::a4())
            .await
            .unwrap_err();
        assert!(err.user_message().contains("Save as PDF"));
    }
}
