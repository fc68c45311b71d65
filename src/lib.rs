//! Big Five personality prediction from free-form text, with token-level
//! attribution rendered as color-coded HTML.
//!
//! ```no_run
//! use big5_explainer::{Explainer, PersonalityClassifier, PredictorConfig};
//!
//! # fn main() -> big5_explainer::Result<()> {
//! let config = PredictorConfig::new().with_model_dir("models/roberta-pers");
//! let classifier = PersonalityClassifier::load(&config)?;
//! let explanation = classifier.explain("I enjoy meeting people and working hard!")?;
//! println!("{}", explanation.rendered().e);
//! # Ok(())
//! # }
//! ```

pub mod classifier;
pub mod error;
pub mod explainer;
pub mod model;
pub mod personality;
pub mod render;
pub mod report;

pub use classifier::{select_device, Device, PersonalityClassifier, PredictorConfig};
pub use error::{Error, Result};
pub use explainer::{Explainer, Explanation};
pub use personality::{is_present, Trait, TraitMap, PRESENCE_THRESHOLD};
pub use render::{attributions_to_html, TokenAttribution};
