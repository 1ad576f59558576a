use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use tesslab::store::{
    BASE_PATH_KEY, DirPairStore, JsonSettings, PairRepository, SettingsStore,
    default_settings_path,
};
use tesslab::{FailurePolicy, Toolchain, TrainingJob, TrainingOptions, TrainingPipeline};

#[derive(Parser)]
#[command(name = "tesslab")]
#[command(about = "Curate OCR ground-truth pairs and fine-tune Tesseract LSTM models")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full fine-tuning workflow against a ground-truth directory
    Train(TrainArgs),
    /// Inspect and maintain image/transcription pairs
    Pairs(PairsArgs),
}

#[derive(Args)]
struct TrainArgs {
    /// Model to fine-tune (matches <model>.traineddata in the tessdata directory)
    #[arg(long)]
    model: String,

    /// Ground-truth directory; defaults to the remembered one
    #[arg(long, value_name = "DIR")]
    base_dir: Option<PathBuf>,

    /// Directory holding the reference .traineddata files
    #[arg(long, value_name = "DIR", default_value = "/usr/share/tessdata")]
    tessdata_dir: PathBuf,

    /// Output directory; defaults to <base>/<model>_finetuned
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Iteration cap for fine-tuning
    #[arg(long, default_value_t = 1000)]
    iterations: u32,

    /// Keep previous output instead of purging it before fine-tuning
    #[arg(long)]
    keep_old: bool,

    /// Halt at the first failed fatal step instead of running everything
    #[arg(long)]
    strict: bool,

    /// Directory the external training programs are resolved from
    #[arg(long, value_name = "DIR")]
    toolchain_dir: Option<PathBuf>,
}

impl From<&TrainArgs> for TrainingOptions {
    fn from(args: &TrainArgs) -> Self {
        TrainingOptions {
            iterations: args.iterations,
            purge_output: !args.keep_old,
            failure_policy: if args.strict {
                FailurePolicy::Strict
            } else {
                FailurePolicy::Lenient
            },
        }
    }
}

#[derive(Args)]
struct PairsArgs {
    /// Ground-truth directory; defaults to the remembered one
    #[arg(long, value_name = "DIR")]
    base_dir: Option<PathBuf>,

    #[command(subcommand)]
    action: PairsAction,
}

#[derive(Subcommand)]
enum PairsAction {
    /// List every live pair with a transcription preview
    List,
    /// Show one pair in full
    Show { base: String },
    /// Overwrite a pair's transcription
    Edit {
        base: String,
        #[arg(long)]
        text: String,
    },
    /// Delete a pair's files and tombstone its base name
    Remove { base: String },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "tesslab=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let settings = JsonSettings::new(default_settings_path()?);
    match cli.command {
        Commands::Train(args) => run_train(args, &settings),
        Commands::Pairs(args) => run_pairs(args, &settings),
    }
}

fn run_train(args: TrainArgs, settings: &dyn SettingsStore) -> anyhow::Result<()> {
    let base_dir = resolve_base_dir(args.base_dir.clone(), settings)?;
    let mut job = TrainingJob::new(&args.model, &base_dir, &args.tessdata_dir);
    if let Some(output_dir) = &args.output_dir {
        job = job.with_output_dir(output_dir);
    }
    let finetuned = job.finetuned_model_path();

    let mut pipeline = TrainingPipeline::new(job, TrainingOptions::from(&args));
    if let Some(dir) = &args.toolchain_dir {
        pipeline = pipeline.with_toolchain(Toolchain {
            bin_dir: Some(dir.clone()),
        });
    }
    let report = pipeline.run()?;

    println!("\n=== Training Summary ===");
    for record in &report.records {
        println!("  {}", record.summary());
    }
    println!("Log: {}", report.log_path.display());

    if report.halted {
        anyhow::bail!("training halted after a fatal step failure");
    }
    let failed = report.failed_steps().count();
    if failed > 0 {
        anyhow::bail!("{failed} step(s) failed");
    }
    println!("Finetuned model: {}", finetuned.display());
    Ok(())
}

fn run_pairs(args: PairsArgs, settings: &dyn SettingsStore) -> anyhow::Result<()> {
    let base_dir = resolve_base_dir(args.base_dir.clone(), settings)?;
    let store = DirPairStore::new(&base_dir);

    match args.action {
        PairsAction::List => {
            let pairs = store.pairs()?;
            println!("{} pair(s) in {}", pairs.len(), store.root().display());
            for pair in &pairs {
                let text = store.read_text(pair)?;
                println!("  {}  {}", pair.base, preview(&text));
            }
        }
        PairsAction::Show { base } => {
            let pair = store.pair(&base)?;
            let (width, height) = image::image_dimensions(&pair.image_path)
                .map_err(|e| anyhow::anyhow!("Failed to read {:?}: {e}", pair.image_path))?;
            println!("base:  {}", pair.base);
            println!("image: {} ({width}x{height})", pair.image_path.display());
            println!("text:  {}", store.read_text(&pair)?);
        }
        PairsAction::Edit { base, text } => {
            let pair = store.pair(&base)?;
            store.write_text(&pair, &text)?;
            println!("updated {}", pair.base);
        }
        PairsAction::Remove { base } => {
            let pair = store.pair(&base)?;
            store.remove(&pair)?;
            println!("removed {}", pair.base);
        }
    }
    Ok(())
}

/// Use the explicit directory when given (remembering it for next time),
/// otherwise fall back to the remembered one.
fn resolve_base_dir(
    explicit: Option<PathBuf>,
    settings: &dyn SettingsStore,
) -> anyhow::Result<PathBuf> {
    if let Some(dir) = explicit {
        settings.set(BASE_PATH_KEY, &dir.display().to_string())?;
        return Ok(dir);
    }
    let remembered = settings
        .get(BASE_PATH_KEY)?
        .ok_or_else(|| anyhow::anyhow!("No ground-truth directory given; pass --base-dir"))?;
    Ok(PathBuf::from(remembered))
}

fn preview(text: &str) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() > 60 {
        let head: String = line.chars().take(57).collect();
        format!("{head}...")
    } else {
        line.to_string()
    }
}
