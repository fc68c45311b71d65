//! Explanation records and occlusion-based token attribution.

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::personality::{is_present, Trait, TraitMap};
use crate::render::{attributions_to_html, TokenAttribution};

/// Produces per-trait probabilities and token attributions for a text.
pub trait Explainer {
    fn explain(&self, text: &str) -> Result<Explanation>;
}

impl<E: Explainer + ?Sized> Explainer for &E {
    fn explain(&self, text: &str) -> Result<Explanation> {
        (**self).explain(text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub text: String,
    pub predictions: TraitMap<f32>,
    pub attributions: TraitMap<Vec<TokenAttribution>>,
}

impl Explanation {
    /// HTML rendering of every trait's attributions.
    pub fn rendered(&self) -> TraitMap<String> {
        self.attributions.map(|_, a| attributions_to_html(a))
    }

    pub fn present_traits(&self) -> Vec<Trait> {
        self.predictions
            .iter()
            .filter(|(_, p)| is_present(**p))
            .map(|(t, _)| t)
            .collect()
    }
}

/// Explanations memoised by exact input text for the life of the session.
pub struct Session<E> {
    explainer: E,
    cache: HashMap<String, Explanation>,
}

impl<E: Explainer> Session<E> {
    pub fn new(explainer: E) -> Self {
        Self {
            explainer,
            cache: HashMap::new(),
        }
    }

    /// Explains `text`, reusing an earlier result for the same text.
    ///
    /// Blank text is skipped and yields `None` without reaching the explainer.
    pub fn explain(&mut self, text: &str) -> Result<Option<&Explanation>> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        if self.cache.contains_key(text) {
            debug!("cache hit for {:?}", text);
        } else {
            let explanation = self.explainer.explain(text)?;
            self.cache.insert(text.to_string(), explanation);
        }
        Ok(self.cache.get(text))
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

/// Rejects empty or whitespace-only input.
pub fn non_empty(text: &str) -> Result<&str> {
    if text.trim().is_empty() {
        Err(Error::EmptyInput)
    } else {
        Ok(text)
    }
}

/// One token of the input and the model's output with that token masked out.
///
/// Special tokens are never masked and carry no occluded prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct OcclusionProbe {
    pub token: String,
    pub occluded: Option<TraitMap<f32>>,
}

/// Input rows for one occlusion pass.
///
/// The first row is `ids` unchanged. It is followed by one row per
/// non-special token, in token order, with that token replaced by `mask_id`.
pub fn occluded_rows(ids: &[u32], special_tokens_mask: &[u32], mask_id: u32) -> Vec<Vec<u32>> {
    let mut rows = vec![ids.to_vec()];
    for (i, _) in special_tokens_mask
        .iter()
        .enumerate()
        .filter(|&(_, &special)| special == 0)
    {
        let mut row = ids.to_vec();
        row[i] = mask_id;
        rows.push(row);
    }
    rows
}

/// Pairs each non-special token with the output of the row that masked it.
///
/// `occluded` holds the outputs of every row of [`occluded_rows`] except the
/// first, in the same order. Special tokens get no output.
pub fn attach_occlusions(
    tokens: Vec<String>,
    special_tokens_mask: &[u32],
    occluded: Vec<TraitMap<f32>>,
) -> Result<Vec<OcclusionProbe>> {
    let expected = special_tokens_mask.iter().filter(|&&s| s == 0).count();
    if occluded.len() != expected || tokens.len() != special_tokens_mask.len() {
        return Err(Error::OcclusionRows {
            expected,
            found: occluded.len(),
        });
    }
    let mut occluded = occluded.into_iter();
    Ok(tokens
        .into_iter()
        .zip(special_tokens_mask)
        .map(|(token, &special)| OcclusionProbe {
            token,
            occluded: if special == 0 { occluded.next() } else { None },
        })
        .collect())
}

/// Turns occlusion probes into per-trait attributions.
///
/// The raw score of a token is how much the trait probability drops when the
/// token is masked. Each trait's scores are then scaled to unit L2 norm, which
/// bounds them to [-1, 1]. A trait whose scores are all zero stays all zero.
pub fn occlusion_attributions(
    baseline: &TraitMap<f32>,
    probes: &[OcclusionProbe],
) -> TraitMap<Vec<TokenAttribution>> {
    TraitMap::from_fn(|t| {
        let base = f64::from(*baseline.get(t));
        let raw: Vec<f64> = probes
            .iter()
            .map(|probe| match &probe.occluded {
                Some(occluded) => base - f64::from(*occluded.get(t)),
                None => 0.0,
            })
            .collect();
        let norm = raw.iter().map(|s| s * s).sum::<f64>().sqrt();
        probes
            .iter()
            .zip(raw)
            .map(|(probe, score)| {
                let score = if norm > 0.0 && norm.is_finite() {
                    score / norm
                } else {
                    0.0
                };
                TokenAttribution::new(probe.token.clone(), score)
            })
            .collect()
    })
}
