//! PDF page rasterization
//!
//! Rasterization is CPU-bound and must never run on the I/O loop: the
//! [`RasterPool`] dispatches work through `spawn_blocking` under a bounded
//! semaphore. The production [`PdfiumRasterizer`] binds the system pdfium
//! library; tests swap in a stub through the [`PageRasterizer`] trait.

use anyhow::{anyhow, Context, Result};
use std::io::Cursor;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::debug;

/// Convert the leading pages of a PDF into PNG images
pub trait PageRasterizer: Send + Sync {
    /// Render up to `max_pages` pages at `scale` and return one PNG per page
    fn rasterize(&self, pdf_bytes: &[u8], max_pages: usize, scale: f32) -> Result<Vec<Vec<u8>>>;
}

/// pdfium-backed rasterizer
pub struct PdfiumRasterizer;

impl PageRasterizer for PdfiumRasterizer {
    fn rasterize(&self, pdf_bytes: &[u8], max_pages: usize, scale: f32) -> Result<Vec<Vec<u8>>> {
        use pdfium_render::prelude::*;

        let bindings = Pdfium::bind_to_system_library()
            .map_err(|e| anyhow!("Failed to bind pdfium library: {:?}", e))?;
        let pdfium = Pdfium::new(bindings);
        let document = pdfium
            .load_pdf_from_byte_slice(pdf_bytes, None)
            .map_err(|e| anyhow!("Failed to open PDF: {:?}", e))?;

        let config = PdfRenderConfig::new().scale_page_by_factor(scale);
        let mut pages_png = Vec::new();

        for page in document.pages().iter().take(max_pages) {
            let bitmap = page
                .render_with_config(&config)
                .map_err(|e| anyhow!("Failed to render PDF page: {:?}", e))?;

            let width = bitmap.width() as u32;
            let height = bitmap.height() as u32;

            // pdfium hands back BGRA; swizzle in place before encoding
            let mut pixels = bitmap.as_raw_bytes().to_vec();
            for px in pixels.chunks_exact_mut(4) {
                px.swap(0, 2);
            }

            let img = image::RgbaImage::from_raw(width, height, pixels)
                .ok_or_else(|| anyhow!("Rendered page buffer has unexpected size"))?;
            let mut png = Vec::new();
            image::DynamicImage::ImageRgba8(img)
                .write_to(&mut Cursor::new(&mut png), image::ImageOutputFormat::Png)
                .context("Failed to encode rendered page as PNG")?;
            pages_png.push(png);
        }

        if pages_png.is_empty() {
            return Err(anyhow!("PDF produced no renderable pages"));
        }
        Ok(pages_png)
    }
}

/// Bounded CPU pool around a [`PageRasterizer`]
#[derive(Clone)]
pub struct RasterPool {
    rasterizer: Arc<dyn PageRasterizer>,
    permits: Arc<Semaphore>,
}

impl RasterPool {
    pub fn new(rasterizer: Arc<dyn PageRasterizer>, max_concurrency: usize) -> Self {
        Self {
            rasterizer,
            permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
        }
    }

    /// Rasterize off the async loop; concurrency is capped by the pool
    pub async fn rasterize(
        &self,
        pdf_bytes: Vec<u8>,
        max_pages: usize,
        scale: f32,
    ) -> Result<Vec<Vec<u8>>> {
        let _permit = self.permits.acquire().await?;
        let rasterizer = self.rasterizer.clone();
        debug!("Dispatching {}-byte PDF to raster pool", pdf_bytes.len());
        tokio::task::spawn_blocking(move || rasterizer.rasterize(&pdf_bytes, max_pages, scale))
            .await
            .context("Raster task panicked")?
    }
}
