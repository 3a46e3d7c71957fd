// Decoder tokenizer for the OCR model
use anyhow::Result;
use std::collections::HashMap;
use std::path::Path;
use tokenizers::tokenizer::Tokenizer;
use tracing::debug;

pub struct OcrTokenizer {
    tokenizer: Option<Tokenizer>,
    id_to_token: HashMap<u32, String>,
    bos_token_id: u32,
    eos_token_id: u32,
}

impl OcrTokenizer {
    /// Load from a model directory containing `tokenizer.json` and/or
    /// `vocab.json`. The full tokenizer is preferred; the vocabulary
    /// map is the manual-decode fallback.
    pub fn load(model_dir: &Path) -> Result<Self> {
        let mut id_to_token: HashMap<u32, String> = HashMap::new();

        let vocab_path = model_dir.join("vocab.json");
        if vocab_path.exists() {
            let vocab_str = std::fs::read_to_string(&vocab_path)?;
            let vocab: HashMap<String, u32> = serde_json::from_str(&vocab_str)?;
            for (token, id) in &vocab {
                id_to_token.insert(*id, token.clone());
            }
            debug!(tokens = vocab.len(), "loaded OCR vocabulary");
        }

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = if tokenizer_path.exists() {
            match Tokenizer::from_file(&tokenizer_path) {
                Ok(t) => Some(t),
                Err(e) => {
                    debug!("failed to load tokenizer file: {e:?}");
                    None
                }
            }
        } else {
            None
        };

        Ok(Self {
            tokenizer,
            id_to_token,
            bos_token_id: 0,
            eos_token_id: 2,
        })
    }

    pub fn decode_ids(&self, token_ids: &[u32]) -> String {
        if let Some(ref tokenizer) = self.tokenizer {
            return tokenizer.decode(token_ids, true).unwrap_or_default();
        }

        // Manual decode with byte-level BPE space handling.
        let mut decoded = Vec::new();
        for &id in token_ids {
            if id == self.eos_token_id {
                break;
            }
            if let Some(token) = self.id_to_token.get(&id) {
                if token.starts_with('<') && token.ends_with('>') {
                    continue;
                }
                // "Ġ" marks a leading space in GPT-2 style vocabularies.
                if let Some(rest) = token.strip_prefix('Ġ') {
                    decoded.push(format!(" {rest}"));
                } else {
                    decoded.push(token.clone());
                }
            }
        }
        decoded.join("").trim().to_string()
    }

    pub fn decoder_start_ids(&self) -> Vec<i64> {
        vec![self.bos_token_id as i64]
    }

    pub fn eos_token_id(&self) -> u32 {
        self.eos_token_id
    }

    #[cfg(test)]
    pub(crate) fn from_vocab(vocab: HashMap<u32, String>) -> Self {
        Self {
            tokenizer: None,
            id_to_token: vocab,
            bos_token_id: 0,
            eos_token_id: 2,
        }
    }
}
