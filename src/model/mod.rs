pub mod config;

pub use config::{ClassifierConfig, Config, ProblemType};
