use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueHint};
use clap_complete::{generate, Shell};
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::io;
use std::path::PathBuf;
use tracing::{info, warn};

use family_concordance::haplogroups::{default_rules, load_rules};
use family_concordance::output::summary_text;
use family_concordance::{
    AnalysisSelection, FamilyAnalyzer, FamilyFileParser, FileDiscovery, HaplogroupClassifier,
    HaplogroupRule, ParsedFamilyData, ReportGenerator,
};

/// Family genotype concordance and maternal lineage analysis
#[derive(Parser, Debug)]
#[command(
    name = "family-concordance",
    version,
    about = "Trio consistency, mtDNA concordance, sibling IBS and haplogroup analysis",
    long_about = r#"
Analyzes four-person (father, mother, son1, son2) genotype files:
- Mendelian inheritance consistency of both sons
- Mitochondrial identity between mother and sons
- Identity-by-state allele sharing between the sons
- Maternal (mtDNA) haplogroup classification

Input files are whitespace-delimited with the columns
marker chromosome position father son1 son2 mother
and may be gzip, bzip2 or xz compressed.
"#
)]
#[command(arg_required_else_help = true)]
struct Cli {
    /// Family genotype files or directories
    #[arg(value_name = "INPUTS", num_args = 0.., value_hint = ValueHint::AnyPath)]
    inputs: Vec<PathBuf>,

    /// Recursive search for family files
    #[arg(short, long, help = "Recursively search directories")]
    recursive: bool,

    /// Interactive mode with prompts for all parameters
    #[arg(short, long, help = "Interactive mode with default values")]
    interactive: bool,

    /// Number of threads (0 = auto-detect)
    #[arg(
        short,
        long,
        default_value = "0",
        help = "Number of threads (0 = auto)"
    )]
    threads: usize,

    /// Output format
    #[arg(short, long, value_enum, default_value = "html")]
    format: OutputFormat,

    /// Output directory for reports
    #[arg(short, long, default_value = "./reports")]
    output: PathBuf,

    /// Analysis type
    #[arg(short = 'a', long, value_enum, default_value = "all")]
    analysis: AnalysisType,

    /// Haplogroup rule table (TOML or JSON) replacing the built-in table
    #[arg(long, value_name = "FILE", env = "FAMILY_CONCORDANCE_RULES", value_hint = ValueHint::FilePath)]
    rules: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Subcommands
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate shell completions
    Completions { shell: Shell },
    /// Print the haplogroup rule table in use
    Rules,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Html,
    Csv,
    Json,
    Tsv,
    All,
}

impl From<OutputFormat> for family_concordance::ReportFormat {
    fn from(format: OutputFormat) -> family_concordance::ReportFormat {
        use family_concordance::ReportFormat;
        match format {
            OutputFormat::Html => ReportFormat::Html,
            OutputFormat::Csv => ReportFormat::Csv,
            OutputFormat::Json => ReportFormat::Json,
            OutputFormat::Tsv => ReportFormat::Tsv,
            OutputFormat::All => ReportFormat::All,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum AnalysisType {
    #[default]
    All,
    Mendelian,
    Mitochondrial,
    Sibling,
    Haplogroup,
}

impl From<AnalysisType> for AnalysisSelection {
    fn from(analysis: AnalysisType) -> AnalysisSelection {
        let mut selection = AnalysisSelection::none();
        match analysis {
            AnalysisType::All => return AnalysisSelection::all(),
            AnalysisType::Mendelian => selection.mendelian = true,
            AnalysisType::Mitochondrial => selection.mitochondrial = true,
            AnalysisType::Sibling => selection.sibling_sharing = true,
            AnalysisType::Haplogroup => selection.haplogroup = true,
        }
        selection
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::Completions { shell }) = cli.command {
        generate_completions(shell);
        return Ok(());
    }

    // Initialize logging
    init_logging(cli.verbose);

    if let Some(Commands::Rules) = cli.command {
        let rules = resolve_rules(cli.rules.as_ref())?;
        list_rules(&rules);
        return Ok(());
    }

    let config = if cli.interactive {
        run_interactive_mode(&cli)?
    } else {
        AppConfig::from_cli(&cli)
    };

    init_thread_pool(config.threads)?;

    info!("Starting family concordance analysis...");
    info!("Using {} threads", rayon::current_num_threads());

    run_analysis(config)
}

fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}

fn resolve_rules(path: Option<&PathBuf>) -> Result<Vec<HaplogroupRule>> {
    match path {
        Some(path) => load_rules(path)
            .with_context(|| format!("Failed to load rule table {}", path.display())),
        None => Ok(default_rules().to_vec()),
    }
}

fn list_rules(rules: &[HaplogroupRule]) {
    println!("{}", style("Mitochondrial Haplogroup Rules:").bold().cyan());
    println!();

    for rule in rules {
        let markers: Vec<String> = rule
            .markers
            .iter()
            .map(|m| format!("{}{}", m.position, m.allele))
            .collect();
        println!(
            "  {} - {}",
            style(&rule.label).green().bold(),
            style(markers.join(" ")).yellow()
        );
        println!("         {}", style(&rule.description).dim());
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(format!("family_concordance={}", level))
        .init();
}

fn init_thread_pool(threads: usize) -> Result<()> {
    let num_threads = if threads == 0 {
        num_cpus::get()
    } else {
        threads
    };

    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
        .map_err(|e| anyhow!("Failed to initialize thread pool: {}", e))?;

    Ok(())
}

fn run_interactive_mode(cli: &Cli) -> Result<AppConfig> {
    println!(
        "{}",
        style("╔══════════════════════════════════════════════════════════════╗").cyan()
    );
    println!(
        "{}",
        style("║       Family Concordance Analysis - Interactive Mode         ║")
            .cyan()
            .bold()
    );
    println!(
        "{}",
        style("╚══════════════════════════════════════════════════════════════╝").cyan()
    );
    println!();

    let theme = ColorfulTheme::default();

    let inputs: String = Input::with_theme(&theme)
        .with_prompt("Family genotype files/directories (space-separated)")
        .interact_text()?;
    let inputs: Vec<PathBuf> = inputs.split_whitespace().map(PathBuf::from).collect();

    let recursive = Confirm::with_theme(&theme)
        .with_prompt("Enable recursive directory search?")
        .default(true)
        .interact()?;

    let analysis_types = vec![
        "All analyses",
        "Mendelian inheritance",
        "Mitochondrial concordance",
        "Sibling allele sharing",
        "Maternal haplogroup",
    ];

    let analysis_idx = Select::with_theme(&theme)
        .with_prompt("Select analysis type")
        .default(0)
        .items(&analysis_types)
        .interact()?;

    let analysis = match analysis_idx {
        1 => AnalysisType::Mendelian,
        2 => AnalysisType::Mitochondrial,
        3 => AnalysisType::Sibling,
        4 => AnalysisType::Haplogroup,
        _ => AnalysisType::All,
    };

    let rules: String = Input::with_theme(&theme)
        .with_prompt("Haplogroup rule table (empty = built-in)")
        .allow_empty(true)
        .interact_text()?;
    let rules = if rules.trim().is_empty() {
        cli.rules.clone()
    } else {
        Some(PathBuf::from(rules.trim()))
    };

    let formats = vec!["HTML", "CSV", "JSON", "TSV", "All formats"];
    let format_idx = Select::with_theme(&theme)
        .with_prompt("Select output format")
        .default(0)
        .items(&formats)
        .interact()?;

    let format = match format_idx {
        1 => OutputFormat::Csv,
        2 => OutputFormat::Json,
        3 => OutputFormat::Tsv,
        4 => OutputFormat::All,
        _ => OutputFormat::Html,
    };

    let output: String = Input::with_theme(&theme)
        .with_prompt("Output directory")
        .default("./reports".to_string())
        .interact_text()?;

    let threads: usize = Input::with_theme(&theme)
        .with_prompt("Number of threads (0 = auto-detect)")
        .default(0)
        .interact_text()?;

    Ok(AppConfig {
        inputs,
        recursive,
        threads,
        format,
        output: PathBuf::from(output),
        analysis,
        rules,
    })
}

fn run_analysis(config: AppConfig) -> Result<()> {
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")?
            .progress_chars("#>-"),
    );

    // Step 1: Discover files
    pb.set_message("Discovering family genotype files...");
    let discovery = FileDiscovery::new(config.recursive);
    let files = discovery.discover(&config.inputs)?;
    if files.is_empty() {
        return Err(anyhow!("No family genotype files found"));
    }
    pb.set_position(10);
    info!("Found {} files to analyze", files.len());

    // Step 2: Load the rule table
    pb.set_message("Loading haplogroup rules...");
    let rules = resolve_rules(config.rules.as_ref())?;
    pb.set_position(20);

    // Step 3: Parse family files in parallel
    pb.set_message("Parsing family genotype files...");
    let parser = FamilyFileParser::new();
    let families: Vec<ParsedFamilyData> = files
        .par_iter()
        .filter_map(|path| match parser.parse(path) {
            Ok(data) => Some(data),
            Err(e) => {
                warn!("Failed to parse {}: {}", path.display(), e);
                None
            }
        })
        .collect();
    if families.is_empty() {
        return Err(anyhow!("None of the {} input files could be parsed", files.len()));
    }
    pb.set_position(50);
    info!("Successfully parsed {} family files", families.len());

    // Step 4: Run analyses
    pb.set_message("Running family analyses...");
    let analyzer = FamilyAnalyzer::new(config.analysis.into(), HaplogroupClassifier::new(rules));
    let results = analyzer.analyze_all(&families);
    pb.set_position(80);

    // Step 5: Generate reports
    pb.set_message("Generating reports...");
    let generator = ReportGenerator::new(&config.output)?;
    generator.generate(&results, config.format.into())?;
    pb.set_position(100);

    pb.finish_with_message("Analysis complete!");

    for family in &results.families {
        println!();
        println!(
            "{} {}",
            style("Family").bold(),
            style(&family.metadata.family_id).cyan().bold()
        );
        print!("{}", summary_text(family));
    }

    println!(
        "\n{} Reports saved to: {}",
        style("✓").green().bold(),
        style(config.output.display()).cyan()
    );

    Ok(())
}

#[derive(Debug)]
struct AppConfig {
    inputs: Vec<PathBuf>,
    recursive: bool,
    threads: usize,
    format: OutputFormat,
    output: PathBuf,
    analysis: AnalysisType,
    rules: Option<PathBuf>,
}

impl AppConfig {
    fn from_cli(cli: &Cli) -> Self {
        Self {
            inputs: cli.inputs.clone(),
            recursive: cli.recursive,
            threads: cli.threads,
            format: cli.format,
            output: cli.output.clone(),
            analysis: cli.analysis,
            rules: cli.rules.clone(),
        }
    }
}
