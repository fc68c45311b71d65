use candle_transformers::models::xlm_roberta::Config as RobertaConfig;
use serde::Deserialize;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::personality::{Trait, TraitMap};

/// `config.json` of a RoBERTa sequence classifier exported from `transformers`.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub roberta_config: RobertaConfig,
    #[serde(flatten)]
    pub classifier_config: ClassifierConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProblemType {
    #[default]
    MultiLabelClassification,
    SingleLabelClassification,
    Regression,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct ClassifierConfig {
    #[serde(default)]
    pub id2label: HashMap<String, String>,
    #[serde(default)]
    pub label2id: HashMap<String, usize>,
    #[serde(default)]
    pub problem_type: Option<ProblemType>,
}

impl ClassifierConfig {
    /// Output column of each trait.
    ///
    /// Without `id2label` the columns follow [`Trait::ALL`]. Otherwise every
    /// trait must be named by exactly one label.
    pub fn trait_columns(&self) -> Result<TraitMap<usize>> {
        if self.id2label.is_empty() {
            return Ok(TraitMap::from_fn(Trait::index));
        }
        if self.id2label.len() != Trait::ALL.len() {
            return Err(Error::label_mapping(format!(
                "expected {} labels, found {}",
                Trait::ALL.len(),
                self.id2label.len()
            )));
        }
        let mut columns: TraitMap<Option<usize>> = TraitMap::default();
        for (id, label) in &self.id2label {
            let column: usize = id
                .parse()
                .map_err(|_| Error::label_mapping(format!("label id is not a number: {}", id)))?;
            if column >= Trait::ALL.len() {
                return Err(Error::label_mapping(format!("label id out of range: {}", column)));
            }
            let t = Trait::parse(label)
                .ok_or_else(|| Error::label_mapping(format!("unknown label: {}", label)))?;
            if columns.get_mut(t).replace(column).is_some() {
                return Err(Error::label_mapping(format!("trait labelled twice: {}", t)));
            }
        }
        TraitMap::try_from_fn(|t| {
            (*columns.get(t)).ok_or_else(|| Error::label_mapping(format!("no label for trait: {}", t)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier_config(labels: &[(&str, &str)]) -> ClassifierConfig {
        ClassifierConfig {
            id2label: labels
                .iter()
                .map(|(id, label)| (id.to_string(), label.to_string()))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn missing_labels_use_trait_order() {
        let columns = ClassifierConfig::default().trait_columns().unwrap();
        assert_eq!(columns, TraitMap { o: 0, c: 1, e: 2, a: 3, n: 4 });
    }

    #[test]
    fn short_codes_map_to_columns() {
        let config = classifier_config(&[("0", "n"), ("1", "a"), ("2", "e"), ("3", "c"), ("4", "o")]);
        let columns = config.trait_columns().unwrap();
        assert_eq!(columns, TraitMap { o: 4, c: 3, e: 2, a: 1, n: 0 });
    }

    #[test]
    fn generic_labels_follow_trait_order() {
        let config = classifier_config(&[
            ("0", "LABEL_0"),
            ("1", "LABEL_1"),
            ("2", "LABEL_2"),
            ("3", "LABEL_3"),
            ("4", "LABEL_4"),
        ]);
        assert_eq!(config.trait_columns().unwrap(), TraitMap { o: 0, c: 1, e: 2, a: 3, n: 4 });
    }

    #[test]
    fn duplicate_trait_is_rejected() {
        let config = classifier_config(&[("0", "o"), ("1", "o"), ("2", "e"), ("3", "a"), ("4", "n")]);
        assert!(matches!(config.trait_columns(), Err(Error::LabelMapping(_))));
    }

    #[test]
    fn wrong_label_count_is_rejected() {
        let config = classifier_config(&[("0", "POSITIVE"), ("1", "NEGATIVE")]);
        assert!(matches!(config.trait_columns(), Err(Error::LabelMapping(_))));
    }

    #[test]
    fn unknown_label_is_rejected() {
        let config = classifier_config(&[("0", "o"), ("1", "c"), ("2", "e"), ("3", "a"), ("4", "honesty")]);
        assert!(matches!(config.trait_columns(), Err(Error::LabelMapping(_))));
    }
}
