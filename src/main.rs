use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{Context, IntoDiagnostic, Result};

use quarry_analysis::{MiningPipeline, PairOutcome};
use quarry_core::QuarryConfig;
use quarry_store::CorrelationStore;
use quarry_tools::{commit_outputs, AnalyzerCommand, DetectorCommand, RefactoringDetector};
use quarry_vcs::GitWorkspace;

#[derive(Parser)]
#[command(
    name = "quarry",
    version,
    about = "Refactoring impact miner",
    arg_required_else_help = true,
    long_about = "Quarry mines a git repository's history to correlate detected refactorings\n\
                   with code-quality metrics, code smells, and code churn, persisting the\n\
                   result in SQLite for later analysis.\n\n\
                   Examples:\n  \
                     quarry mine --repo https://github.com/acme/widgets.git \\\n      \
                       --name widgets --start 4f2a91c --end 8be03d7\n  \
                     quarry doctor                 Check tools and environment\n  \
                     quarry init                   Create a default .quarry.toml"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (default: .quarry.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Mine a repository's refactoring history into SQLite
    #[command(long_about = "Mine a repository's refactoring history into SQLite.\n\n\
        Runs the refactoring detector over the commit range, then for each\n\
        refactoring-bearing commit analyzes the commit and its first parent:\n\
        quality metrics and smells are attributed to the refactored files, and\n\
        a two-week code-churn window is computed per file. Everything lands in\n\
        one SQLite database.\n\n\
        Example:\n  quarry mine --repo ../widgets --name widgets --start 4f2a91c --end 8be03d7")]
    Mine {
        /// Repository URL or local path to mine
        #[arg(long)]
        repo: String,

        /// Repository name (used for work and output directories)
        #[arg(long)]
        name: String,

        /// First commit of the mined range
        #[arg(long)]
        start: String,

        /// Last commit of the mined range
        #[arg(long)]
        end: String,

        /// SQLite database to write (overrides config)
        #[arg(long)]
        db: Option<PathBuf>,

        /// Mining work directory (overrides config)
        #[arg(long)]
        workdir: Option<PathBuf>,
    },
    /// Create a default .quarry.toml configuration file
    #[command(long_about = "Create a default .quarry.toml configuration file.\n\n\
        Generates a commented template with all available options.\n\
        Fails if .quarry.toml already exists.")]
    Init,
    /// Check your Quarry setup and environment
    #[command(long_about = "Check your Quarry setup and environment.\n\n\
        Runs diagnostics for the JVM launcher, the detector and analyzer jars,\n\
        the work directory, and the output database.")]
    Doctor,
}

const DEFAULT_CONFIG: &str = r#"# Quarry configuration.
# All values shown are the defaults.

[database]
# SQLite database to create.
# path = "refactoring.db"

[tools]
# JVM launcher used to run both jars.
# java = "java"
# Refactoring detector jar.
# detector_jar = "RefactoringMiner.jar"
# Quality analyzer jar.
# analyzer_jar = "organic-v0.1.1-OPT.jar"

[mining]
# Work directory holding the detector's clone and its output files.
# workdir = "tmp"
"#;

fn main() -> Result<()> {
    human_panic::setup_panic!();

    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(".quarry.toml"));
    let config = if config_path.exists() {
        QuarryConfig::from_file(&config_path)
            .into_diagnostic()
            .wrap_err(format!("loading {}", config_path.display()))?
    } else if cli.config.is_some() {
        miette::bail!("config file not found: {}", config_path.display());
    } else {
        QuarryConfig::default()
    };

    match cli.command {
        Command::Mine {
            repo,
            name,
            start,
            end,
            db,
            workdir,
        } => run_mine(
            &config,
            MineArgs {
                repo,
                name,
                start,
                end,
                db,
                workdir,
                verbose: cli.verbose,
            },
        ),
        Command::Init => {
            let path = Path::new(".quarry.toml");
            if path.exists() {
                miette::bail!(".quarry.toml already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created .quarry.toml with default configuration");
            Ok(())
        }
        Command::Doctor => run_doctor(&config),
    }
}

struct MineArgs {
    repo: String,
    name: String,
    start: String,
    end: String,
    db: Option<PathBuf>,
    workdir: Option<PathBuf>,
    verbose: bool,
}

fn run_mine(config: &QuarryConfig, args: MineArgs) -> Result<()> {
    let db_path = args.db.unwrap_or_else(|| config.database.path.clone());
    let workdir = args.workdir.unwrap_or_else(|| config.mining.workdir.clone());

    let store = CorrelationStore::open(&db_path)
        .into_diagnostic()
        .wrap_err(format!("opening {}", db_path.display()))?;

    // 1. Detect refactorings over the whole range. The detector clones the
    // repository into the work directory and writes one stream file per
    // analyzed commit.
    println!("Running refactoring detector...");
    let detector = DetectorCommand::new(&config.tools, &workdir);
    let output_dir = detector
        .detect(&args.repo, &args.name, &args.start, &args.end)
        .into_diagnostic()
        .wrap_err("refactoring detection failed")?;

    let outputs = commit_outputs(&output_dir)
        .into_diagnostic()
        .wrap_err(format!("listing {}", output_dir.display()))?;
    println!("Processing {} detector output files", outputs.len());

    // 2. Ingest every commit's record stream.
    let mut pipeline = MiningPipeline::new(&store);
    let mut records_decoded = 0;
    let mut records_skipped = 0;

    let ingest_bar = progress_bar(outputs.len() as u64);
    for (commit, path) in &outputs {
        ingest_bar.set_message(short_hash(commit).to_string());
        let file = std::fs::File::open(path)
            .into_diagnostic()
            .wrap_err(format!("opening {}", path.display()))?;
        let summary = pipeline
            .ingest_commit_stream(commit, file)
            .into_diagnostic()
            .wrap_err(format!("ingesting records for {commit}"))?;
        records_decoded += summary.decoded;
        records_skipped += summary.skipped;
        ingest_bar.inc(1);
    }
    ingest_bar.finish_and_clear();
    if args.verbose && records_skipped > 0 {
        eprintln!("skipped {records_skipped} malformed records");
    }

    // 3. Select the commit pairs to deep-analyze.
    let repo_path = workdir.join(&args.name);
    let workspace = GitWorkspace::open(&repo_path)
        .into_diagnostic()
        .wrap_err(format!("opening mined clone at {}", repo_path.display()))?;

    let selection = pipeline.select(&workspace);
    if args.verbose {
        for skipped in &selection.skipped {
            eprintln!(
                "skipping {}: {}",
                short_hash(&skipped.commit),
                skipped.reason
            );
        }
    }
    println!(
        "Analyzing {} commit pairs ({} skipped)",
        selection.pairs.len(),
        selection.skipped.len()
    );

    // 4. Analyze each pair: checkout, quality analysis, attribution, churn.
    let reports_dir = workdir.join("output").join("smells");
    std::fs::create_dir_all(&reports_dir)
        .into_diagnostic()
        .wrap_err(format!("creating {}", reports_dir.display()))?;
    let analyzer = AnalyzerCommand::new(&config.tools);

    let mut pairs_analyzed = 0;
    let mut pairs_skipped = 0;
    let pair_bar = progress_bar(selection.pairs.len() as u64);
    for pair in &selection.pairs {
        if let Ok(meta) = workspace.commit_meta(&pair.commit) {
            let date = chrono::DateTime::from_timestamp(meta.timestamp, 0)
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default();
            pair_bar.set_message(format!("{} {date}", short_hash(&pair.commit)));
        }

        let outcome = pipeline
            .analyze_pair(
                &workspace,
                &analyzer,
                pair,
                &repo_path,
                &reports_dir,
                &args.name,
            )
            .into_diagnostic()
            .wrap_err(format!("analyzing pair {}", short_hash(&pair.commit)))?;

        match outcome {
            PairOutcome::Analyzed { .. } => pairs_analyzed += 1,
            PairOutcome::Skipped { reason } => {
                pairs_skipped += 1;
                if args.verbose {
                    eprintln!("skipping {}: {reason}", short_hash(&pair.commit));
                }
            }
        }
        pair_bar.inc(1);
    }
    pair_bar.finish_and_clear();

    // 5. Summarize what landed in the store.
    let stats = store.stats().into_diagnostic()?;
    println!("\nWrote {}:", db_path.display());
    println!("  commits       {}", stats.commits);
    println!(
        "  refactorings  {} ({records_decoded} records decoded)",
        stats.refactorings
    );
    println!("  files         {}", stats.files);
    println!("  metrics       {}", stats.metrics);
    println!("  smells        {}", stats.smells);
    println!("  churn rows    {}", stats.churn);
    println!(
        "  pairs         {pairs_analyzed} analyzed, {} skipped",
        pairs_skipped + selection.skipped.len()
    );

    Ok(())
}

fn progress_bar(len: u64) -> indicatif::ProgressBar {
    let bar = indicatif::ProgressBar::new(len);
    bar.set_style(
        indicatif::ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}").unwrap(),
    );
    bar
}

fn short_hash(hash: &str) -> &str {
    &hash[..hash.len().min(8)]
}

struct CheckResult {
    name: &'static str,
    status: &'static str,
    detail: String,
    hint: Option<String>,
}

impl CheckResult {
    fn pass(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: "pass",
            detail: detail.into(),
            hint: None,
        }
    }

    fn fail(name: &'static str, detail: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            name,
            status: "fail",
            detail: detail.into(),
            hint: Some(hint.into()),
        }
    }

    fn info(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: "info",
            detail: detail.into(),
            hint: None,
        }
    }

    fn symbol(&self) -> &'static str {
        match self.status {
            "pass" => "\u{2713}",
            "fail" => "\u{2717}",
            _ => "~",
        }
    }
}

fn run_doctor(config: &QuarryConfig) -> Result<()> {
    let mut checks: Vec<CheckResult> = Vec::new();

    // 1. JVM launcher
    match std::process::Command::new(&config.tools.java)
        .arg("-version")
        .output()
    {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stderr)
                .lines()
                .next()
                .unwrap_or("")
                .to_string();
            checks.push(CheckResult::pass("java", version));
        }
        Ok(output) => checks.push(CheckResult::fail(
            "java",
            format!("{} exited with {}", config.tools.java, output.status),
            "check the [tools] java setting in .quarry.toml",
        )),
        Err(e) => checks.push(CheckResult::fail(
            "java",
            format!("{}: {e}", config.tools.java),
            "install a JVM or set [tools] java in .quarry.toml",
        )),
    }

    // 2. Detector jar
    if config.tools.detector_jar.is_file() {
        checks.push(CheckResult::pass(
            "detector_jar",
            config.tools.detector_jar.display().to_string(),
        ));
    } else {
        checks.push(CheckResult::fail(
            "detector_jar",
            format!("{} not found", config.tools.detector_jar.display()),
            "set [tools] detector_jar in .quarry.toml",
        ));
    }

    // 3. Analyzer jar
    if config.tools.analyzer_jar.is_file() {
        checks.push(CheckResult::pass(
            "analyzer_jar",
            config.tools.analyzer_jar.display().to_string(),
        ));
    } else {
        checks.push(CheckResult::fail(
            "analyzer_jar",
            format!("{} not found", config.tools.analyzer_jar.display()),
            "set [tools] analyzer_jar in .quarry.toml",
        ));
    }

    // 4. Work directory
    if config.mining.workdir.exists() {
        checks.push(CheckResult::pass(
            "workdir",
            format!("{} exists", config.mining.workdir.display()),
        ));
    } else {
        checks.push(CheckResult::info(
            "workdir",
            format!(
                "{} will be created by the detector",
                config.mining.workdir.display()
            ),
        ));
    }

    // 5. Output database
    if config.database.path.exists() {
        checks.push(CheckResult::info(
            "database",
            format!(
                "{} already exists and will be appended to",
                config.database.path.display()
            ),
        ));
    } else {
        checks.push(CheckResult::pass(
            "database",
            format!("{} will be created", config.database.path.display()),
        ));
    }

    let mut failed = false;
    for check in &checks {
        println!("{} {:<14} {}", check.symbol(), check.name, check.detail);
        if let Some(hint) = &check.hint {
            println!("    hint: {hint}");
        }
        if check.status == "fail" {
            failed = true;
        }
    }

    if failed {
        miette::bail!("some checks failed");
    }
    Ok(())
}
