use crate::config;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::io::Cursor;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RasterError {
    #[error("pdfium library unavailable: {0}")]
    LibraryUnavailable(String),

    #[error("failed to open document: {0}")]
    OpenDocument(String),

    #[error("failed to render page {page}: {reason}")]
    RenderPage { page: u32, reason: String },
}

/// One rendered page. The bitmap is owned by the page and dropped with it.
pub struct PageBitmap {
    /// 1-based, contiguous, document order.
    pub index: u32,
    pub image: DynamicImage,
}

impl PageBitmap {
    pub fn to_png_bytes(&self) -> Result<Vec<u8>, image::ImageError> {
        let mut buf = Cursor::new(Vec::new());
        self.image.write_to(&mut buf, image::ImageFormat::Png)?;
        Ok(buf.into_inner())
    }
}

pub trait Rasterizer {
    /// Opens the document once; all page renders share the decode context.
    fn open<'a>(&'a self, bytes: &'a [u8]) -> Result<Box<dyn PageRender + 'a>, RasterError>;
}

pub trait PageRender {
    fn page_count(&self) -> u32;

    /// Renders the 1-based page at the configured oversampling scale.
    fn render(&self, index: u32) -> Result<PageBitmap, RasterError>;
}

pub struct PdfiumRasterizer {
    pdfium: Pdfium,
    scale: f32,
}

impl PdfiumRasterizer {
    pub fn new(cfg: &config::Raster) -> Result<Self, RasterError> {
        let bindings = if cfg.pdfium_library_dir.is_empty() {
            Pdfium::bind_to_system_library()
        } else {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                &cfg.pdfium_library_dir,
            ))
        }
        .map_err(|e| RasterError::LibraryUnavailable(e.to_string()))?;

        Ok(Self {
            pdfium: Pdfium::new(bindings),
            scale: cfg.scale * cfg.device_pixel_ratio,
        })
    }

    /// Whether the pdfium shared library can be bound at all.
    pub fn available(cfg: &config::Raster) -> bool {
        Self::new(cfg).is_ok()
    }
}

/// Defers binding the pdfium library until a paginated document actually
/// shows up, so single-image runs work without pdfium installed.
pub struct LazyRasterizer {
    cfg: config::Raster,
    inner: std::cell::OnceCell<PdfiumRasterizer>,
}

impl LazyRasterizer {
    pub fn new(cfg: &config::Raster) -> Self {
        Self {
            cfg: cfg.clone(),
            inner: std::cell::OnceCell::new(),
        }
    }
}

impl Rasterizer for LazyRasterizer {
    fn open<'a>(&'a self, bytes: &'a [u8]) -> Result<Box<dyn PageRender + 'a>, RasterError> {
        if let Some(inner) = self.inner.get() {
            return inner.open(bytes);
        }
        let raster = PdfiumRasterizer::new(&self.cfg)?;
        self.inner.get_or_init(|| raster).open(bytes)
    }
}

struct PdfiumPages<'a> {
    doc: PdfDocument<'a>,
    render_config: PdfRenderConfig,
}

impl Rasterizer for PdfiumRasterizer {
    fn open<'a>(&'a self, bytes: &'a [u8]) -> Result<Box<dyn PageRender + 'a>, RasterError> {
        let doc = self
            .pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(|e| RasterError::OpenDocument(e.to_string()))?;
        Ok(Box::new(PdfiumPages {
            doc,
            render_config: PdfRenderConfig::new().scale_page_by_factor(self.scale),
        }))
    }
}

impl PageRender for PdfiumPages<'_> {
    fn page_count(&self) -> u32 {
        self.doc.pages().len() as u32
    }

    fn render(&self, index: u32) -> Result<PageBitmap, RasterError> {
        let page = self
            .doc
            .pages()
            .get((index - 1) as u16)
            .map_err(|e| RasterError::RenderPage {
                page: index,
                reason: e.to_string(),
            })?;
        let bitmap =
            page.render_with_config(&self.render_config)
                .map_err(|e| RasterError::RenderPage {
                    page: index,
                    reason: e.to_string(),
                })?;
        Ok(PageBitmap {
            index,
            image: bitmap.as_image(),
        })
    }
}
