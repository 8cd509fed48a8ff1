use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;
use wikiids::extract::{self, WikiIdExtractor};
use wikiids::language::Language;
use wikiids::stage::{self, StageSpec};
use wikiids::stats::ScanSummary;
use wikiids::theme::ThemeRegistry;
use wikiids::translate::EntityTranslator;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "wikiids")]
#[command(about = "Extract Wikipedia page ids for normalized article entities")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan dumps and write id facts, translating non-primary languages
    Extract(ExtractArgs),
    /// Translate the id facts of one language with its entity dictionary
    Translate(TranslateArgs),
    /// Print the order in which stages would run
    Plan(PlanArgs),
}

#[derive(Clone)]
struct DumpArg {
    language: Language,
    path: PathBuf,
}

fn parse_dump(s: &str) -> Result<DumpArg, String> {
    let (lang, path) = s
        .split_once('=')
        .ok_or_else(|| format!("expected LANG=PATH, got {:?}", s))?;
    if lang.trim().is_empty() || path.is_empty() {
        return Err(format!("expected LANG=PATH, got {:?}", s));
    }
    Ok(DumpArg {
        language: Language::new(lang),
        path: PathBuf::from(path),
    })
}

#[derive(Args)]
struct ExtractArgs {
    /// Directory holding input themes; output themes are written there too
    #[arg(short, long)]
    themes: PathBuf,

    /// Dump to scan, as LANG=PATH (.xml or .xml.bz2); repeatable
    #[arg(short, long = "dump", value_parser = parse_dump, required = true)]
    dumps: Vec<DumpArg>,

    /// Skip the translation follow-up for non-primary languages
    #[arg(long)]
    no_translate: bool,
}

#[derive(Args)]
struct TranslateArgs {
    /// Directory holding the themes
    #[arg(short, long)]
    themes: PathBuf,

    /// Language whose id facts are translated
    #[arg(short, long)]
    language: String,
}

#[derive(Args)]
struct PlanArgs {
    /// Directory holding input themes
    #[arg(short, long)]
    themes: PathBuf,

    /// Dump to plan for, as LANG=PATH; repeatable
    #[arg(short, long = "dump", value_parser = parse_dump, required = true)]
    dumps: Vec<DumpArg>,
}

fn extractors_for(dumps: &[DumpArg]) -> Vec<WikiIdExtractor> {
    dumps
        .iter()
        .map(|d| WikiIdExtractor::new(d.language.clone(), d.path.clone()))
        .collect()
}

/// Stage declarations for the run; without translation the follow-ups are left out.
fn specs_for(
    registry: &ThemeRegistry,
    extractors: &[WikiIdExtractor],
    translate: bool,
) -> Vec<StageSpec> {
    extractors
        .iter()
        .map(|e| {
            let mut spec = e.spec(registry);
            if !translate {
                spec.follow_ups.clear();
            }
            spec
        })
        .collect()
}

fn run_extract(args: ExtractArgs) -> Result<()> {
    let registry = ThemeRegistry::with_defaults(&args.themes);
    let extractors = extractors_for(&args.dumps);

    let specs = specs_for(&registry, &extractors, !args.no_translate);
    let order = stage::resolve_order(&specs, |key| registry.is_available(key))?;
    info!(stages = order.len(), "Stage plan resolved");

    let start_extracting = Instant::now();
    let summaries = extract::run_all(&registry, &extractors)?;
    let extraction_duration = start_extracting.elapsed();

    let start_translating = Instant::now();
    let mut translated = 0u64;
    if !args.no_translate {
        for extractor in &extractors {
            for follow_up in extractor.follow_ups() {
                let manifest = follow_up.run(&registry).with_context(|| {
                    format!("Translation failed for language {}", extractor.language())
                })?;
                translated += manifest.facts;
            }
        }
    }
    let translation_duration = start_translating.elapsed();

    println!();
    println!("=== Summary ===");
    for (extractor, summary) in extractors.iter().zip(&summaries) {
        println!(
            "[{}] titles: {}, rejected: {}, skipped ids: {}, facts: {}",
            extractor.language(),
            summary.titles_seen,
            summary.titles_rejected,
            summary.ids_skipped,
            summary.facts_emitted
        );
    }
    let total = summaries
        .iter()
        .copied()
        .fold(ScanSummary::default(), ScanSummary::combine);
    println!();
    println!("Extraction time:    {:.2}s", extraction_duration.as_secs_f64());
    println!("Translation time:   {:.2}s", translation_duration.as_secs_f64());
    println!("Titles seen:        {}", total.titles_seen);
    println!("Titles rejected:    {}", total.titles_rejected);
    println!("Ids skipped:        {}", total.ids_skipped);
    println!("Facts written:      {}", total.facts_emitted);
    println!("Facts translated:   {}", translated);

    Ok(())
}

fn run_translate(args: TranslateArgs) -> Result<()> {
    let registry = ThemeRegistry::with_defaults(&args.themes);
    let language = Language::new(&args.language);
    if language.is_primary() {
        anyhow::bail!("{} is the primary language and needs no translation", language);
    }

    let manifest = EntityTranslator::for_wikipedia_ids(&language).run(&registry)?;
    println!("Facts translated:   {}", manifest.facts);
    Ok(())
}

fn run_plan(args: PlanArgs) -> Result<()> {
    let registry = ThemeRegistry::with_defaults(&args.themes);
    let extractors = extractors_for(&args.dumps);
    let specs = specs_for(&registry, &extractors, true);
    let order = stage::resolve_order(&specs, |key| registry.is_available(key))?;

    for (i, stage) in order.iter().enumerate() {
        println!("{}. {}", i + 1, stage.name);
        for input in &stage.inputs {
            println!("     reads  {}", input);
        }
        for output in &stage.outputs {
            println!("     writes {}", output);
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    let result = match cli.command {
        Commands::Extract(args) => run_extract(args),
        Commands::Translate(args) => run_translate(args),
        Commands::Plan(args) => run_plan(args),
    };

    match result {
        Ok(()) => {
            info!("Completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Error: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
