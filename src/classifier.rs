pub use candle_core::Device;
use candle_core::{DType, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::XLMRobertaForSequenceClassification;
use log::{debug, info, warn};
use std::fs::File;
use std::path::PathBuf;
use std::time::Instant;
use tokenizers::{PaddingParams, Tokenizer, TruncationParams};

use crate::error::{Error, Result};
use crate::explainer::{
    attach_occlusions, non_empty, occluded_rows, occlusion_attributions, Explainer, Explanation,
};
use crate::model::{Config, ProblemType};
use crate::personality::{Trait, TraitMap};

pub const DEFAULT_MODEL_DIR: &str = "models/roberta-pers";

const CONFIG_FILE: &str = "config.json";
const TOKENIZER_FILE: &str = "tokenizer.json";
const WEIGHTS_FILE: &str = "model.safetensors";
const MASK_TOKEN: &str = "<mask>";
const UNKNOWN_TOKEN: &str = "<unk>";

/// Where to load the model from and how to run it.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictorConfig {
    pub model_dir: PathBuf,
    pub use_gpu: bool,
    /// Sequences per forward pass, also used for occlusion variants.
    pub batch_size: usize,
    /// Inputs are truncated to this many tokens, boundary markers included.
    pub max_length: usize,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
            use_gpu: true,
            batch_size: 16,
            max_length: 512,
        }
    }
}

impl PredictorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.model_dir = dir.into();
        self
    }

    pub fn with_gpu(mut self, use_gpu: bool) -> Self {
        self.use_gpu = use_gpu;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::config("batch size must be at least 1"));
        }
        if self.max_length < 3 {
            return Err(Error::config("max length must leave room for at least one token"));
        }
        Ok(())
    }

    /// Returns the path of a file inside the model directory, failing if it is absent.
    pub fn model_file(&self, name: &str) -> Result<PathBuf> {
        let path = self.model_dir.join(name);
        if path.is_file() {
            Ok(path)
        } else {
            Err(Error::MissingFile(path))
        }
    }

    pub fn load_model_config(&self) -> Result<Config> {
        let config_reader = File::open(self.model_file(CONFIG_FILE)?)?;
        Ok(serde_json::from_reader(config_reader)?)
    }
}

/// Picks the first CUDA device when requested and available, the CPU otherwise.
pub fn select_device(use_gpu: bool) -> Result<Device> {
    if !use_gpu {
        info!("Using CPU for inference");
        return Ok(Device::Cpu);
    }
    let device = Device::cuda_if_available(0)?;
    if device.is_cuda() {
        info!("Using GPU for inference!");
    } else {
        warn!("GPU not available, using CPU instead.");
    }
    Ok(device)
}

/// Multi-label Big Five classifier over a RoBERTa encoder.
///
/// Load it once and share it by reference; loading maps the weights into memory.
pub struct PersonalityClassifier {
    model: XLMRobertaForSequenceClassification,
    columns: TraitMap<usize>,
    tokenizer: Tokenizer,
    mask_id: u32,
    batch_size: usize,
    device: Device,
}

impl PersonalityClassifier {
    pub fn load(config: &PredictorConfig) -> Result<Self> {
        config.validate()?;
        info!("Loading model from {}", config.model_dir.display());
        let started = Instant::now();

        let model_config = config.load_model_config()?;
        if let Some(problem_type @ (ProblemType::SingleLabelClassification | ProblemType::Regression)) =
            model_config.classifier_config.problem_type
        {
            warn!(
                "model declares {:?}, scoring it as multi-label anyway",
                problem_type
            );
        }
        let columns = model_config.classifier_config.trait_columns()?;
        let pad_id = model_config.roberta_config.pad_token_id;

        let mut tokenizer = Tokenizer::from_file(config.model_file(TOKENIZER_FILE)?)?;
        let pad_token = tokenizer
            .id_to_token(pad_id)
            .unwrap_or_else(|| "<pad>".to_string());
        tokenizer
            .with_padding(Some(PaddingParams {
                strategy: tokenizers::PaddingStrategy::BatchLongest,
                pad_id,
                pad_token,
                ..Default::default()
            }))
            .with_truncation(Some(TruncationParams {
                max_length: config.max_length,
                ..Default::default()
            }))?;
        let mask_id = tokenizer
            .token_to_id(MASK_TOKEN)
            .or_else(|| tokenizer.token_to_id(UNKNOWN_TOKEN))
            .ok_or_else(|| Error::config("tokenizer has neither a mask nor an unknown token"))?;

        let device = select_device(config.use_gpu)?;
        let weights = config.model_file(WEIGHTS_FILE)?;
        let model_builder =
            unsafe { VarBuilder::from_mmaped_safetensors(&[&weights], DType::F32, &device) }?;
        let model = XLMRobertaForSequenceClassification::new(
            Trait::ALL.len(),
            &model_config.roberta_config,
            model_builder,
        )?;

        info!("Model loaded in {:.2?}", started.elapsed());
        Ok(Self {
            model,
            columns,
            tokenizer,
            mask_id,
            batch_size: config.batch_size,
            device,
        })
    }

    pub fn predict(&self, text: &str) -> Result<TraitMap<f32>> {
        self.predict_batch(&[text])?
            .pop()
            .ok_or(Error::EmptyInput)
    }

    /// Trait probabilities for each text, in input order.
    pub fn predict_batch(&self, texts: &[&str]) -> Result<Vec<TraitMap<f32>>> {
        for text in texts {
            non_empty(text)?;
        }
        let encodings = self.tokenizer.encode_batch(texts.to_vec(), true)?;
        let mut inputs_ids = Vec::with_capacity(encodings.len());
        let mut attentions_mask = Vec::with_capacity(encodings.len());
        for encoding in encodings {
            inputs_ids.push(encoding.get_ids().to_vec());
            attentions_mask.push(encoding.get_attention_mask().to_vec());
        }
        self.forward(&inputs_ids, &attentions_mask)
    }

    fn forward(&self, inputs_ids: &[Vec<u32>], attentions_mask: &[Vec<u32>]) -> Result<Vec<TraitMap<f32>>> {
        let mut predictions = Vec::with_capacity(inputs_ids.len());
        for (ids, masks) in inputs_ids
            .chunks(self.batch_size)
            .zip(attentions_mask.chunks(self.batch_size))
        {
            let ids = ids
                .iter()
                .map(|row| Tensor::new(row.as_slice(), &self.device))
                .collect::<candle_core::Result<Vec<_>>>()?;
            let masks = masks
                .iter()
                .map(|row| Tensor::new(row.as_slice(), &self.device))
                .collect::<candle_core::Result<Vec<_>>>()?;
            let ids = Tensor::stack(ids.as_slice(), 0)?;
            let masks = Tensor::stack(masks.as_slice(), 0)?;
            let token_type_ids = ids.zeros_like()?;

            let logits = self.model.forward(&ids, &masks, &token_type_ids)?;
            let probabilities: Vec<Vec<f32>> = candle_nn::ops::sigmoid(&logits)?.to_vec2()?;
            predictions.extend(
                probabilities
                    .into_iter()
                    .map(|row| self.columns.map(|_, &column| row[column])),
            );
        }
        Ok(predictions)
    }
}

impl Explainer for PersonalityClassifier {
    /// Occlusion attribution: every non-special token is replaced by the mask
    /// token in turn and the drop in each trait probability is its raw score.
    fn explain(&self, text: &str) -> Result<Explanation> {
        let text = non_empty(text)?;
        let started = Instant::now();
        let encoding = self.tokenizer.encode(text, true)?;
        let special = encoding.get_special_tokens_mask();

        let inputs_ids = occluded_rows(encoding.get_ids(), special, self.mask_id);
        let attentions_mask = vec![encoding.get_attention_mask().to_vec(); inputs_ids.len()];
        let mut outputs = self.forward(&inputs_ids, &attentions_mask)?;
        if outputs.is_empty() {
            return Err(Error::OcclusionRows {
                expected: inputs_ids.len(),
                found: 0,
            });
        }
        let baseline = outputs.remove(0);

        let tokens = encoding
            .get_tokens()
            .iter()
            .zip(encoding.get_offsets())
            .zip(special)
            .map(|((token, &(start, end)), &is_special)| {
                if is_special == 0 {
                    surface_text(text, start, end, token)
                } else {
                    token.clone()
                }
            })
            .collect();
        let probes = attach_occlusions(tokens, special, outputs)?;

        debug!(
            "explained {} tokens with {} forward rows in {:.2?}",
            probes.len(),
            inputs_ids.len(),
            started.elapsed()
        );
        Ok(Explanation {
            text: text.to_string(),
            attributions: occlusion_attributions(&baseline, &probes),
            predictions: baseline,
        })
    }
}

// Byte-level BPE tokens carry markers such as `Ġ`; show the covered input instead.
fn surface_text(text: &str, start: usize, end: usize, token: &str) -> String {
    match text.get(start..end) {
        Some(slice) if !slice.is_empty() => slice.to_string(),
        _ => token.to_string(),
    }
}
