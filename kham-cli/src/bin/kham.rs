use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use kham_engine::sheets;
use kham_engine::{
    AnthropicClient, CancelFlag, Deck, EnrichOptions, EnrichProgress, EnrichReport,
    EnrichmentDriver, RetryingModel, Settings, StopReason, WordResult, plan_cleanup,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// kham: curate a Thai vocabulary deck exported as JSON.
#[derive(Parser, Debug)]
#[command(name = "kham")]
#[command(about = "kham: curate a Thai vocabulary deck exported as JSON")]
struct Cli {
    /// Settings file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Relabel parts of speech through a spreadsheet.
    Parts {
        #[command(subcommand)]
        command: PartsCommand,
    },

    /// Inspect and fix the Thai-word field.
    Thaiwords {
        #[command(subcommand)]
        command: ThaiWordsCommand,
    },

    /// Classify every word that is not yet enriched and write one card per sense.
    ///
    /// The destination is rewritten after every word, so an interrupted run keeps
    /// everything finished so far. Ctrl-C stops after the current word.
    Enrich {
        /// Deck JSON to read
        source: PathBuf,

        /// Deck JSON to write
        dest: PathBuf,

        /// Write only the notes of words that needed enrichment
        #[arg(long)]
        only_updated: bool,
    },
}

#[derive(Subcommand, Debug)]
enum PartsCommand {
    /// Write each distinct part of speech to a `current,new` CSV.
    Export { source: PathBuf, dest: PathBuf },

    /// Apply a `current,new` CSV; `-` in `new` blanks the part of speech.
    Import {
        csv: PathBuf,
        source: PathBuf,
        dest: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum ThaiWordsCommand {
    /// Notes whose Thai word contains non-Thai characters.
    Nonthai {
        #[command(subcommand)]
        command: NonThaiCommand,
    },
}

#[derive(Subcommand, Debug)]
enum NonThaiCommand {
    /// Strip markup and classifier suffixes from malformed Thai words.
    Clean {
        source: PathBuf,
        dest: PathBuf,

        /// Print the planned changes without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Print every malformed Thai word.
    List { source: PathBuf },

    /// Write malformed Thai words to an `id,current,new` CSV.
    Export { source: PathBuf, dest: PathBuf },

    /// Apply an `id,current,new` CSV by note id.
    Import {
        csv: PathBuf,
        source: PathBuf,
        dest: PathBuf,
    },
}

// --- shared helpers ---

fn load_deck(path: &Path) -> Result<Deck> {
    Deck::load(path).with_context(|| format!("Failed to load deck from {}", path.display()))
}

fn save_deck(deck: &Deck, path: &Path) -> Result<()> {
    deck.save(path)
        .with_context(|| format!("Failed to write deck to {}", path.display()))
}

fn load_settings(config: Option<&Path>) -> Result<Settings> {
    match config {
        Some(path) => Settings::load_from(path)
            .with_context(|| format!("Failed to load settings from {}", path.display())),
        None => Settings::load(),
    }
}

// --- parts subcommand ---

fn run_parts_export(source: &Path, dest: &Path) -> Result<()> {
    let deck = load_deck(source)?;
    let file =
        File::create(dest).with_context(|| format!("Failed to create {}", dest.display()))?;
    let count = sheets::export_senses(&deck, file)?;
    info!("Exported {} parts of speech to {:?}", count, dest);
    Ok(())
}

fn run_parts_import(csv: &Path, source: &Path, dest: &Path) -> Result<()> {
    let mut deck = load_deck(source)?;
    let file = File::open(csv).with_context(|| format!("Failed to open {}", csv.display()))?;
    let rewritten = sheets::import_senses(&mut deck, file)?;
    save_deck(&deck, dest)?;
    info!("Rewrote the part of speech of {} notes", rewritten);
    Ok(())
}

// --- thaiwords nonthai subcommand ---

fn run_clean(source: &Path, dest: &Path, dry_run: bool) -> Result<()> {
    let mut deck = load_deck(source)?;
    let fixes = plan_cleanup(&deck);

    if dry_run {
        println!("{:<36}  {:<30}  Cleaned", "ID", "Original");
        for fix in &fixes {
            println!(
                "{:<36}  {:<30}  {}",
                fix.guid.as_deref().unwrap_or("-"),
                fix.original,
                fix.cleaned
            );
        }
        println!("{} notes would change", fixes.iter().filter(|f| f.changes()).count());
        return Ok(());
    }

    kham_engine::apply_cleanup(&mut deck, &fixes);
    save_deck(&deck, dest)?;
    info!(
        "Cleaned {} of {} malformed Thai words",
        fixes.iter().filter(|f| f.changes()).count(),
        fixes.len()
    );
    Ok(())
}

fn run_list(source: &Path) -> Result<()> {
    let deck = load_deck(source)?;
    let malformed = kham_engine::clean::non_thai_indices(&deck);

    println!("{:>5}  {:<36}  Word", "#", "ID");
    for (n, &index) in malformed.iter().enumerate() {
        let note = &deck.notes[index];
        println!("{:>5}  {:<36}  {}", n + 1, note.display_id(), note.fields.thai);
    }
    println!("{} malformed Thai words", malformed.len());
    Ok(())
}

fn run_words_export(source: &Path, dest: &Path) -> Result<()> {
    let deck = load_deck(source)?;
    let file =
        File::create(dest).with_context(|| format!("Failed to create {}", dest.display()))?;
    let count = sheets::export_words(&deck, file)?;
    info!("Exported {} malformed Thai words to {:?}", count, dest);
    Ok(())
}

fn run_words_import(csv: &Path, source: &Path, dest: &Path) -> Result<()> {
    let mut deck = load_deck(source)?;
    let file = File::open(csv).with_context(|| format!("Failed to open {}", csv.display()))?;
    let report = sheets::import_words(&mut deck, file)?;
    save_deck(&deck, dest)?;

    println!("Updated {} notes", report.updated.len());
    if !report.missing.is_empty() {
        println!("{} ids not found:", report.missing.len());
        for row in &report.missing {
            println!("  {}  {}", row.id, row.current);
        }
    }
    Ok(())
}

// --- enrich subcommand ---

/// Progress bar advancing once per word.
struct BarProgress {
    pb: ProgressBar,
}

impl BarProgress {
    fn new() -> Self {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        Self { pb }
    }
}

impl EnrichProgress for BarProgress {
    fn started(&mut self, words: usize) {
        self.pb.set_length(words as u64);
    }

    fn word_started(&mut self, word: &str) {
        self.pb.set_message(word.to_string());
    }

    fn word_finished(&mut self, _word: &str, result: &WordResult) {
        if let WordResult::Failed(message) = result {
            self.pb.set_message(format!("failed: {message}"));
        }
        self.pb.inc(1);
    }
}

fn print_summary(report: &EnrichReport, dest: &Path) {
    println!(
        "Enriched {}/{} words ({} notes created, {} marked {})",
        report.enriched,
        report.words_total,
        report.notes_created,
        report.notes_marked_unused,
        kham_engine::tags::UNUSED
    );
    for (word, message) in &report.failed {
        println!("  failed {word}: {message}");
    }
    match &report.stop {
        Some(StopReason::Cancelled) => println!("Stopped on request"),
        Some(StopReason::QuotaExhausted(message)) => {
            println!("Stopped early, the model refused further requests: {message}")
        }
        None => {}
    }
    println!("Saved to {}", dest.display());
}

async fn run_enrich(
    settings: Settings,
    source: &Path,
    dest: &Path,
    only_updated: bool,
) -> Result<()> {
    let mut deck = load_deck(source)?;
    let client = AnthropicClient::from_env(settings.model.clone(), settings.transport.clone())?;
    info!("Using model {}", client.model_name());
    let model = RetryingModel::new(client, settings.retry.clone());

    let cancel = CancelFlag::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Stopping after the current word");
            on_signal.cancel();
        }
    });

    let mut progress = BarProgress::new();
    let report = EnrichmentDriver::new(&model, &settings.deck, dest)
        .with_options(EnrichOptions { only_updated })
        .with_cancel(cancel)
        .run(&mut deck, &mut progress)
        .await?;
    progress.pb.finish_and_clear();

    // A quota stop still exits 0; the destination holds every finished word.
    print_summary(&report, dest);
    Ok(())
}

// --- main ---

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "kham=debug,kham_engine=debug"
    } else {
        "kham=info,kham_engine=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Parts { command } => match command {
            PartsCommand::Export { source, dest } => run_parts_export(&source, &dest),
            PartsCommand::Import { csv, source, dest } => run_parts_import(&csv, &source, &dest),
        },
        Commands::Thaiwords {
            command: ThaiWordsCommand::Nonthai { command },
        } => match command {
            NonThaiCommand::Clean {
                source,
                dest,
                dry_run,
            } => run_clean(&source, &dest, dry_run),
            NonThaiCommand::List { source } => run_list(&source),
            NonThaiCommand::Export { source, dest } => run_words_export(&source, &dest),
            NonThaiCommand::Import { csv, source, dest } => run_words_import(&csv, &source, &dest),
        },
        Commands::Enrich {
            source,
            dest,
            only_updated,
        } => {
            let settings = load_settings(cli.config.as_deref())?;
            run_enrich(settings, &source, &dest, only_updated).await
        }
    }
}
