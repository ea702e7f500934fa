//! Sentence embedders behind the `ragdb_core::traits::Embedder` seam.
//!
//! `SentenceEmbedder` runs a BERT-family sentence-transformer (e.g.
//! all-MiniLM-L6-v2) with candle: tokenize, encode, masked mean pool, L2
//! normalize. `FakeEmbedder` hashes tokens into a fixed-size vector and is
//! selected with `APP_USE_FAKE_EMBEDDINGS=1` or `embedding.fake = true`.
use anyhow::{anyhow, bail, Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use tokenizers::Tokenizer;
use tracing::{debug, info};

use ragdb_core::config::EmbeddingSettings;
use ragdb_core::traits::Embedder;

pub mod pool;
pub mod preprocess;
pub mod tokenize;

pub use pool::masked_mean_l2;
pub use preprocess::preprocess_text;

pub struct SentenceEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    name: String,
    dim: usize,
    max_len: usize,
    pad_id: u32,
}

impl SentenceEmbedder {
    pub fn load(model_dir: &Path, name: &str, max_len: usize) -> Result<Self> {
        let device = embedding_device();
        info!("Loading embedding model {} from {}", name, model_dir.display());

        let tokenizer_path = model_dir.join("tokenizer.json");
        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        tokenizer.with_padding(None);
        let pad_id = tokenizer.token_to_id("[PAD]").unwrap_or(0);

        let config_path = model_dir.join("config.json");
        let raw_config =
            std::fs::read_to_string(&config_path).with_context(|| format!("reading {}", config_path.display()))?;
        let config: BertConfig = serde_json::from_str(&raw_config)?;
        let dim = serde_json::from_str::<serde_json::Value>(&raw_config)?
            .get("hidden_size")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| anyhow!("{} has no hidden_size", config_path.display()))? as usize;

        let weights = load_weights(model_dir, &device)?;
        let vb = VarBuilder::from_tensors(weights, DTYPE, &device);
        let model = BertModel::load(vb, &config)?;
        info!("Embedding model loaded (dimension {})", dim);

        Ok(Self {
            model,
            tokenizer,
            device,
            name: name.to_string(),
            dim,
            max_len,
            pad_id,
        })
    }

    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let (input_ids, attention_mask) =
            tokenize::tokenize_batch(&self.tokenizer, texts, self.max_len, self.pad_id, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &attention_mask.to_dtype(DType::F32)?)?;
        Ok(pooled.to_device(&Device::Cpu)?.to_dtype(DType::F32)?.to_vec2::<f32>()?)
    }
}

impl Embedder for SentenceEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { self.max_len }
    fn model_name(&self) -> &str { &self.name }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let start = Instant::now();
        let cleaned: Vec<String> = texts.iter().map(|t| preprocess_text(t)).collect();
        let vectors = self.encode(&cleaned)?;
        debug!("Embedded {} texts in {} ms", texts.len(), start.elapsed().as_millis());
        Ok(vectors)
    }
}

/// Metal when built with the `metal` feature and a GPU is present, else CPU.
fn embedding_device() -> Device {
    #[cfg(feature = "metal")]
    match Device::new_metal(0) {
        Ok(device) => {
            info!("Embedding on Metal");
            return device;
        }
        Err(e) => debug!("Metal unavailable, falling back to CPU: {}", e),
    }
    info!("Embedding on CPU");
    Device::Cpu
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<HashMap<String, Tensor>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        return Ok(candle_core::safetensors::load(&safetensors, device)?);
    }
    let pickle = model_dir.join("pytorch_model.bin");
    if pickle.exists() {
        let weights = candle_core::pickle::read_all(&pickle)?;
        return weights
            .into_iter()
            .map(|(name, tensor)| Ok((name, tensor.to_device(device)?)))
            .collect();
    }
    bail!("No model.safetensors or pytorch_model.bin in {}", model_dir.display())
}

/// Deterministic token-hashing embedder for tests and offline development.
pub struct FakeEmbedder {
    dim: usize,
}

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim } }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;
        let mut v = vec![0f32; self.dim];
        for (i, token) in preprocess_text(text).to_lowercase().split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6);
        for x in &mut v { *x /= norm; }
        v
    }
}

impl Embedder for FakeEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { preprocess::MAX_WORDS }
    fn model_name(&self) -> &str { "fake" }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

fn fake_requested() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Builds the process-wide embedder from settings.
///
/// Fails when the loaded model's dimension disagrees with `embedding.dimension`.
pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    if settings.fake || fake_requested() {
        info!("Using FakeEmbedder (dimension {})", settings.dimension);
        return Ok(Arc::new(FakeEmbedder::new(settings.dimension)));
    }
    let model_dir = resolve_model_dir(settings)?;
    let model = SentenceEmbedder::load(&model_dir, &settings.model_name, settings.max_len)?;
    if model.dim() != settings.dimension {
        bail!(
            "model {} produces {}-dimensional vectors but embedding.dimension is {}",
            settings.model_name,
            model.dim(),
            settings.dimension
        );
    }
    Ok(Arc::new(model))
}

fn resolve_model_dir(settings: &EmbeddingSettings) -> Result<PathBuf> {
    if let Some(p) = settings.model_path() {
        if p.exists() { return Ok(p); }
        bail!("embedding.model_dir {} does not exist", p.display());
    }
    for var in ["APP_MODEL_DIR", "MODEL_DIR"] {
        if let Ok(dir) = std::env::var(var) {
            let p = PathBuf::from(&dir);
            if p.exists() { info!("Using {}: {}", var, p.display()); return Ok(p); }
        }
    }
    for root in ["models", "../models"] {
        let p = Path::new(root).join(&settings.model_name);
        if p.exists() { info!("Using model dir: {}", p.display()); return Ok(p); }
    }
    Err(anyhow!("Could not locate model directory for {}", settings.model_name))
}
