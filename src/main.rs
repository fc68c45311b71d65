use big5_explainer::classifier::DEFAULT_MODEL_DIR;
use big5_explainer::explainer::Session;
use big5_explainer::report::{html_page, prediction_rows, prediction_table, PredictionRow, ReportDir};
use big5_explainer::{Error, Explanation, PersonalityClassifier, PredictorConfig, Trait, TraitMap};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;

/// Predicts Big Five personality traits from text and explains which words drove each prediction.
#[derive(Parser, Debug)]
#[command(name = "big5-explain", version)]
struct Args {
    /// Directory holding config.json, tokenizer.json and model.safetensors
    #[arg(long, env = "MODEL_PATH", default_value = DEFAULT_MODEL_DIR)]
    model_dir: PathBuf,

    /// Run on the CPU even when a GPU is available
    #[arg(long)]
    cpu: bool,

    #[arg(long, default_value_t = 16)]
    batch_size: usize,

    #[arg(long, default_value_t = 512)]
    max_length: usize,

    /// Only show explanations for these traits (code or name, repeatable)
    #[arg(long = "trait", value_name = "TRAIT")]
    traits: Vec<Trait>,

    #[arg(long, value_enum, default_value_t = Format::Table)]
    format: Format,

    /// Directory to write HTML reports into, one file per text
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Texts to explain; read one per line from stdin when omitted
    text: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Table,
    Json,
    Html,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    explanation: &'a Explanation,
    table: Vec<PredictionRow>,
    html: TraitMap<String>,
}

impl Args {
    fn validate(&self) -> big5_explainer::Result<()> {
        if self.output.is_some() && self.format != Format::Html {
            return Err(Error::config("--output only applies to --format html"));
        }
        Ok(())
    }
}

struct Printer {
    format: Format,
    traits: Vec<Trait>,
    reports: Option<ReportDir>,
}

impl Printer {
    fn print(&mut self, explanation: &Explanation) -> big5_explainer::Result<()> {
        match self.format {
            Format::Table => {
                println!("## {}", explanation.text);
                print!("{}", prediction_table(&explanation.predictions));
                let rendered = explanation.rendered();
                for &t in &self.traits {
                    println!("{}: {}", t.name(), rendered.get(t));
                }
                println!();
            }
            Format::Json => {
                let report = JsonReport {
                    explanation,
                    table: prediction_rows(&explanation.predictions),
                    html: explanation.rendered(),
                };
                println!("{}", serde_json::to_string(&report)?);
            }
            Format::Html => match &mut self.reports {
                Some(reports) => {
                    reports.write(explanation, &self.traits)?;
                }
                None => print!("{}", html_page(explanation, &self.traits)),
            },
        }
        Ok(())
    }
}

fn run(args: Args) -> big5_explainer::Result<()> {
    args.validate()?;
    let config = PredictorConfig::new()
        .with_model_dir(args.model_dir)
        .with_gpu(!args.cpu)
        .with_batch_size(args.batch_size)
        .with_max_length(args.max_length);
    let classifier = PersonalityClassifier::load(&config)?;
    let mut session = Session::new(&classifier);
    let mut printer = Printer {
        format: args.format,
        traits: if args.traits.is_empty() {
            Trait::ALL.to_vec()
        } else {
            args.traits
        },
        reports: args.output.map(ReportDir::new),
    };

    let mut handle = |text: &str| {
        let printed = match session.explain(text) {
            Ok(Some(explanation)) => printer.print(explanation),
            Ok(None) => Ok(()),
            Err(e) => Err(e),
        };
        if let Err(e) = printed {
            log::error!("failed to explain {:?}: {}", text, e);
        }
    };

    if args.text.is_empty() {
        for line in std::io::stdin().lock().lines() {
            handle(&line?);
        }
    } else {
        for text in &args.text {
            handle(text);
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
