use clap::error::ErrorKind;
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use qber_lens_common::{Config, IngestPolicy, MetricConvention, OutputFormat};
use qber_lens_core::{
    analyze_file, ingest_file, sweep_histogram, sweep_lines, write_csv, write_histogram, write_json,
};
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "qber-lens",
    version,
    about = "BER and visibility from detector timestamps",
    args_conflicts_with_subcommands = true,
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
    /// Timestamp CSV analysed with the configured defaults
    input: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Locate the peak window and print label,BER1,V1,BER2,V2
    Analyze(AnalyzeArgs),
    /// Search the guard-band width minimising BER and maximising visibility
    Sweep {
        input: PathBuf,
        #[command(flatten)]
        opts: AnalysisArgs,
        #[arg(long)]
        min: Option<usize>,
        #[arg(long)]
        max: Option<usize>,
        #[arg(long)]
        step: Option<usize>,
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
    },
    /// Print every non-empty histogram bin
    Histogram {
        input: PathBuf,
        #[arg(long)]
        period: Option<usize>,
        #[arg(long)]
        lenient: bool,
    },
    /// Show the effective configuration
    Config {
        #[arg(long)]
        save: bool,
    },
}

#[derive(Args)]
struct AnalyzeArgs {
    input: PathBuf,
    #[command(flatten)]
    opts: AnalysisArgs,
    #[arg(long)]
    guard_band: Option<usize>,
    #[arg(long)]
    label: Option<String>,
    #[arg(long, value_enum)]
    format: Option<FormatArg>,
    /// Also run the guard-band sweep and print its choices
    #[arg(long)]
    sweep: bool,
}

#[derive(Args)]
struct AnalysisArgs {
    #[arg(long)]
    period: Option<usize>,
    #[arg(long)]
    window: Option<usize>,
    #[arg(long, value_enum)]
    convention: Option<ConventionArg>,
    /// Skip malformed rows instead of stopping at the first one
    #[arg(long)]
    lenient: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum ConventionArg {
    ErrorFraction,
    Complementary,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Csv,
    Json,
}

impl AnalyzeArgs {
    fn defaults_for(input: PathBuf) -> Self {
        Self {
            input,
            opts: AnalysisArgs { period: None, window: None, convention: None, lenient: false },
            guard_band: None,
            label: None,
            format: None,
            sweep: false,
        }
    }
}

impl AnalysisArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(p) = self.period { config.analysis.period_ps = p; }
        if let Some(w) = self.window { config.analysis.window_ps = w; }
        if let Some(c) = self.convention {
            config.analysis.convention = match c {
                ConventionArg::ErrorFraction => MetricConvention::ErrorFraction,
                ConventionArg::Complementary => MetricConvention::Complementary,
            };
        }
        if self.lenient { config.ingest.policy = IngestPolicy::Lenient; }
    }
}

fn apply_format(config: &mut Config, format: Option<FormatArg>) {
    if let Some(f) = format {
        config.output.format = match f {
            FormatArg::Csv => OutputFormat::Csv,
            FormatArg::Json => OutputFormat::Json,
        };
    }
}

fn init_logging() {
    // stdout carries results only
    let filter = EnvFilter::try_from_env("QBER_LENS_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging();
    let mut config = Config::load()?;
    tracing::debug!(path = %Config::config_path().display(), "configuration loaded");
    let command = match (cli.command, cli.input) {
        (Some(command), _) => command,
        (None, Some(input)) => Commands::Analyze(AnalyzeArgs::defaults_for(input)),
        (None, None) => Cli::command()
            .error(ErrorKind::MissingRequiredArgument, "an input file or a subcommand is required")
            .exit(),
    };
    match command {
        Commands::Analyze(args) => {
            args.opts.apply(&mut config);
            if let Some(g) = args.guard_band { config.analysis.guard_band_ps = g; }
            if let Some(l) = args.label { config.output.label = l; }
            apply_format(&mut config, args.format);
            run_analyze(args.input, args.sweep, &config)?
        }
        Commands::Sweep { input, opts, min, max, step, format } => {
            opts.apply(&mut config);
            if let Some(v) = min { config.sweep.min_ps = v; }
            if let Some(v) = max { config.sweep.max_ps = v; }
            if let Some(v) = step { config.sweep.step_ps = v; }
            apply_format(&mut config, format);
            run_sweep(input, &config)?
        }
        Commands::Histogram { input, period, lenient } => {
            if let Some(p) = period { config.analysis.period_ps = p; }
            if lenient { config.ingest.policy = IngestPolicy::Lenient; }
            run_histogram(input, &config)?
        }
        Commands::Config { save } => run_config(save, &config)?,
    }
    Ok(())
}

fn run_analyze(input: PathBuf, sweep: bool, config: &Config) -> anyhow::Result<()> {
    let report = analyze_file(&input, config, sweep)?;
    let mut out = std::io::stdout().lock();
    match config.output.format {
        OutputFormat::Csv => write_csv(&mut out, &report)?,
        OutputFormat::Json => write_json(&mut out, &report)?,
    }
    Ok(())
}

fn run_sweep(input: PathBuf, config: &Config) -> anyhow::Result<()> {
    config.validate()?;
    let (hist, _) = ingest_file(&input, config.analysis.period_ps, config.ingest.policy)?;
    let (window, result) = sweep_histogram(&hist, config)?;
    let mut out = std::io::stdout().lock();
    match config.output.format {
        OutputFormat::Csv => {
            writeln!(out, "window_start,{}", window.start)?;
            writeln!(out, "{}", sweep_lines(&result))?;
        }
        OutputFormat::Json => {
            let doc = serde_json::json!({ "window": window, "sweep": result });
            write_json(&mut out, &doc)?;
        }
    }
    Ok(())
}

fn run_histogram(input: PathBuf, config: &Config) -> anyhow::Result<()> {
    let (hist, _) = ingest_file(&input, config.analysis.period_ps, config.ingest.policy)?;
    let mut out = std::io::stdout().lock();
    write_histogram(&mut out, &hist)?;
    Ok(())
}

fn run_config(save: bool, config: &Config) -> anyhow::Result<()> {
    config.validate()?;
    print!("{}", config.to_toml()?);
    if save {
        let path = config.save()?;
        println!("# saved to {}", path.display());
    }
    Ok(())
}
