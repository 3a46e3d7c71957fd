// OCR fallback engine for scanned statements
//
// Encoder/decoder ONNX sessions with greedy autoregressive decoding,
// tuned for uniform single-column block text. Invoked only when the
// document has no text layer at all.
use anyhow::{anyhow, Context, Result};
use image::{DynamicImage, GrayImage};
use image::imageops::FilterType;
use ort::{
    init, inputs,
    session::builder::GraphOptimizationLevel,
    session::Session,
    value::Value,
};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::extract::tokenizer::OcrTokenizer;

const MODEL_DIR_ENV: &str = "BILLSNAP_MODEL_DIR";
const DEFAULT_MODEL_DIR: &str = "models";

/// Model input side length.
const INPUT_SIZE: u32 = 384;
/// Generation cap; a statement page rarely needs more.
const MAX_TOKENS: usize = 256;

/// Upper bound on recognition work per page. A page that exceeds it
/// contributes zero rows instead of stalling the request.
pub const PAGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Seam for recognition so the pipeline can be tested without model
/// files or OCR nondeterminism.
pub trait Recognizer {
    /// Recognize text in one preprocessed page image. Implementations
    /// must give up once `deadline` has passed.
    fn recognize(&mut self, image: &GrayImage, deadline: Instant) -> Result<String>;
}

/// Resolve the model directory from the environment.
pub fn model_dir() -> PathBuf {
    std::env::var(MODEL_DIR_ENV)
        .unwrap_or_else(|_| DEFAULT_MODEL_DIR.to_string())
        .into()
}

pub struct TrOcrRecognizer {
    encoder: Session,
    decoder: Session,
    tokenizer: OcrTokenizer,
}

impl TrOcrRecognizer {
    /// Load encoder, decoder and tokenizer from `model_dir`. Fails when
    /// the model files are absent; the caller degrades to "no data".
    pub fn load(model_dir: &Path) -> Result<Self> {
        let encoder_path = model_dir.join("trocr_encoder.onnx");
        let decoder_path = model_dir.join("trocr_decoder.onnx");
        if !encoder_path.exists() || !decoder_path.exists() {
            return Err(anyhow!("OCR models not found in {}", model_dir.display()));
        }

        let _ = init();

        let encoder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(&encoder_path)
            .context("loading OCR encoder")?;
        let decoder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(&decoder_path)
            .context("loading OCR decoder")?;
        let tokenizer = OcrTokenizer::load(model_dir)?;

        debug!(dir = %model_dir.display(), "OCR sessions ready");
        Ok(Self { encoder, decoder, tokenizer })
    }

    // The model expects RGB; replicate the binarized channel.
    fn to_model_input(image: &GrayImage) -> Vec<f32> {
        let mut rgb = image::RgbImage::new(image.width(), image.height());
        for (x, y, pixel) in image.enumerate_pixels() {
            let v = pixel[0];
            rgb.put_pixel(x, y, image::Rgb([v, v, v]));
        }
        let resized = DynamicImage::ImageRgb8(rgb)
            .resize_exact(INPUT_SIZE, INPUT_SIZE, FilterType::Lanczos3)
            .to_rgb8();

        // CHW layout, normalized to [0, 1].
        let side = INPUT_SIZE as usize;
        let mut pixels = Vec::with_capacity(3 * side * side);
        for channel in 0..3 {
            for y in 0..INPUT_SIZE {
                for x in 0..INPUT_SIZE {
                    pixels.push(resized.get_pixel(x, y)[channel] as f32 / 255.0);
                }
            }
        }
        pixels
    }
}

impl Recognizer for TrOcrRecognizer {
    fn recognize(&mut self, image: &GrayImage, deadline: Instant) -> Result<String> {
        let pixels = Self::to_model_input(image);
        let side = INPUT_SIZE as usize;

        let encoder_input = Value::from_array(([1_usize, 3, side, side], pixels.into_boxed_slice()))?;
        let encoder_outputs = self.encoder.run(inputs![encoder_input])?;
        let (enc_shape, enc_data) = encoder_outputs[0].try_extract_tensor::<f32>()?;
        let enc_data_vec: Vec<f32> = enc_data.to_vec();

        let mut decoder_input_ids = self.tokenizer.decoder_start_ids();
        let mut generated: Vec<u32> = Vec::new();

        for _step in 0..MAX_TOKENS {
            if Instant::now() >= deadline {
                return Err(anyhow!("page recognition exceeded the time budget"));
            }

            let input_ids = Value::from_array((
                [1_usize, decoder_input_ids.len()],
                decoder_input_ids.clone().into_boxed_slice(),
            ))?;
            let encoder_hidden_states =
                Value::from_array((enc_shape.clone(), enc_data_vec.clone().into_boxed_slice()))?;
            let use_cache = Value::from_array(([1_usize], vec![false].into_boxed_slice()))?;

            let outputs = self.decoder.run(inputs![
                "input_ids" => input_ids,
                "encoder_hidden_states" => encoder_hidden_states,
                "use_cache_branch" => use_cache
            ])?;

            let (logits_shape, logits_data) = outputs[0].try_extract_tensor::<f32>()?;
            let vocab_size = logits_shape[2] as usize;
            let last_start = ((logits_shape[1] - 1) * logits_shape[2]) as usize;
            let last_logits = &logits_data[last_start..last_start + vocab_size];

            let next_token = last_logits
                .iter()
                .enumerate()
                .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
                .map(|(idx, _)| idx as u32)
                .ok_or_else(|| anyhow!("decoder produced empty logits"))?;

            if next_token == self.tokenizer.eos_token_id() {
                break;
            }

            generated.push(next_token);
            decoder_input_ids.push(next_token as i64);

            // Greedy decoding can lock onto a repeating token; bail out
            // rather than burn the rest of the budget.
            if generated.len() >= 5 {
                let tail = &generated[generated.len() - 5..];
                if tail.iter().all(|&t| t == tail[0]) {
                    debug!("repetition loop detected, stopping decode");
                    break;
                }
            }
        }

        Ok(self.tokenizer.decode_ids(&generated))
    }
}

/// Per-document OCR driver. Owns the recognizer and applies the
/// page-time budget; one failed page never fails the document.
pub struct OcrEngine {
    recognizer: Box<dyn Recognizer>,
    page_timeout: Duration,
}

impl OcrEngine {
    /// Engine with the real model-backed recognizer, if models are
    /// available.
    pub fn from_models() -> Result<Self> {
        let recognizer = TrOcrRecognizer::load(&model_dir())?;
        Ok(Self::with_recognizer(Box::new(recognizer)))
    }

    pub fn with_recognizer(recognizer: Box<dyn Recognizer>) -> Self {
        Self { recognizer, page_timeout: PAGE_TIMEOUT }
    }

    pub fn with_page_timeout(mut self, timeout: Duration) -> Self {
        self.page_timeout = timeout;
        self
    }

    /// Recognize one preprocessed page. Errors and timeouts degrade to
    /// `None` (that page contributes nothing).
    pub fn recognize_page(&mut self, page_index: usize, image: &GrayImage) -> Option<String> {
        let deadline = Instant::now() + self.page_timeout;
        match self.recognizer.recognize(image, deadline) {
            Ok(text) if text.trim().is_empty() => None,
            Ok(text) => Some(text),
            Err(e) => {
                warn!(page = page_index + 1, "OCR failed: {e:#}");
                None
            }
        }
    }
}
