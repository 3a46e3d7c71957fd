// Extraction strategy cascade: structured tables, then text lines,
// then OCR for documents with no text layer at all.
pub mod ocr;
pub mod page_images;
pub mod pdf_text;
pub mod preprocess;
pub mod table_locator;
pub mod tokenizer;

use anyhow::Result;
use lopdf::Document;
use tracing::{debug, warn};

use crate::types::RawRow;

/// What one page contributed. A page yields either structured rows or
/// a text blob for line-based parsing, never both.
#[derive(Debug, Clone)]
pub enum PageContent {
    Table(Vec<RawRow>),
    Text(String),
}

/// One way of getting content out of a document. Strategies run in
/// priority order; the first one to produce anything wins.
pub trait ExtractionStrategy {
    fn name(&self) -> &'static str;

    /// `Ok(None)` means "this strategy found nothing here" and the
    /// cascade moves on. Errors are treated the same way by the driver.
    fn try_extract(&mut self, document: &Document) -> Result<Option<Vec<PageContent>>>;
}

/// Run strategies in order, stopping at the first that yields content.
/// An empty result means no strategy found anything.
pub fn run_cascade(
    document: &Document,
    strategies: &mut [Box<dyn ExtractionStrategy>],
) -> Vec<PageContent> {
    for strategy in strategies {
        match strategy.try_extract(document) {
            Ok(Some(pages)) => {
                debug!(strategy = strategy.name(), pages = pages.len(), "extraction succeeded");
                return pages;
            }
            Ok(None) => {
                debug!(strategy = strategy.name(), "no content, falling through");
            }
            Err(e) => {
                warn!(strategy = strategy.name(), "extraction error, falling through: {e:#}");
            }
        }
    }
    Vec::new()
}

/// The standard cascade: text layer (tables first, raw text second),
/// then OCR for rasterized documents.
pub fn default_strategies() -> Vec<Box<dyn ExtractionStrategy>> {
    vec![
        Box::new(TextLayerStrategy),
        Box::new(OcrStrategy::from_models()),
    ]
}

/// Text-layer pass. Per page: attempt structured table detection over
/// the positioned fragments; if no table is found the page contributes
/// its raw text blob instead.
pub struct TextLayerStrategy;

impl ExtractionStrategy for TextLayerStrategy {
    fn name(&self) -> &'static str {
        "text-layer"
    }

    fn try_extract(&mut self, document: &Document) -> Result<Option<Vec<PageContent>>> {
        let mut pages = Vec::new();

        for (page_number, page_id) in document.get_pages() {
            let page_dict = match document.get_object(page_id).and_then(|o| o.as_dict()) {
                Ok(dict) => dict,
                Err(e) => {
                    warn!(page = page_number, "unreadable page object: {e}");
                    continue;
                }
            };

            // A broken page must not discard what healthier pages gave.
            let fragments = match pdf_text::extract_fragments(document, page_dict) {
                Ok(fragments) => fragments,
                Err(e) => {
                    warn!(page = page_number, "content stream error: {e:#}");
                    continue;
                }
            };
            if fragments.is_empty() {
                continue;
            }

            match table_locator::detect_table(&fragments) {
                Some(rows) => {
                    debug!(page = page_number, rows = rows.len(), "structured table found");
                    pages.push(PageContent::Table(rows));
                }
                None => {
                    let text = pdf_text::fragments_to_text(&fragments);
                    if !text.trim().is_empty() {
                        pages.push(PageContent::Text(text));
                    }
                }
            }
        }

        Ok(if pages.is_empty() { None } else { Some(pages) })
    }
}

/// OCR pass for documents with no extractable text layer. Each page's
/// embedded scan is binarized and recognized independently; a failed or
/// timed-out page contributes nothing.
pub struct OcrStrategy {
    engine: Option<ocr::OcrEngine>,
}

impl OcrStrategy {
    /// Strategy backed by the on-disk models. When they are missing the
    /// strategy stays in the cascade but never produces content.
    pub fn from_models() -> Self {
        match ocr::OcrEngine::from_models() {
            Ok(engine) => Self { engine: Some(engine) },
            Err(e) => {
                warn!("OCR unavailable: {e:#}");
                Self { engine: None }
            }
        }
    }

    pub fn with_engine(engine: ocr::OcrEngine) -> Self {
        Self { engine: Some(engine) }
    }
}

impl ExtractionStrategy for OcrStrategy {
    fn name(&self) -> &'static str {
        "ocr"
    }

    fn try_extract(&mut self, document: &Document) -> Result<Option<Vec<PageContent>>> {
        let engine = match self.engine.as_mut() {
            Some(engine) => engine,
            None => return Ok(None),
        };

        let mut pages = Vec::new();
        for (index, (page_number, page_id)) in document.get_pages().into_iter().enumerate() {
            let page_dict = match document.get_object(page_id).and_then(|o| o.as_dict()) {
                Ok(dict) => dict,
                Err(_) => continue,
            };

            let image = match page_images::page_image(document, page_dict) {
                Ok(Some(image)) => image,
                Ok(None) => continue,
                Err(e) => {
                    warn!(page = page_number, "could not rasterize page: {e:#}");
                    continue;
                }
            };

            let prepared = preprocess::binarize(&image);
            if let Some(text) = engine.recognize_page(index, &prepared) {
                pages.push(PageContent::Text(text));
            }
        }

        Ok(if pages.is_empty() { None } else { Some(pages) })
    }
}
