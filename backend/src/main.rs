//! Envfin CLI - analyze client environmental finance records
//!
//! # Main Commands
//!
//! ```bash
//! envfin analyze portfolio.csv -o out/   # Derive, summarize and export both tables
//! envfin describe portfolio.csv          # Print descriptive statistics
//! envfin group portfolio.csv             # Print the country summary as CSV
//! envfin charts --resolve                # Chart catalog with resolved series (JSON)
//! envfin sample -o sample.csv            # Write the built-in sample dataset
//! ```
//!
//! Commands taking an input fall back to the built-in sample dataset when no
//! file is given.

use clap::{Parser, Subcommand};
use envfin::logs::{drain_warnings, LOG_BROADCASTER};
use envfin::{
    analyze_file, chart_catalog, export_report, render_all, run_analysis, sample_records,
    write_country_summary_csv, AnalysisOptions, AnalysisReport, CollectingSink,
    ZeroFinancingPolicy,
};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "envfin")]
#[command(about = "Derive intensity metrics, risk scores and summaries from client environmental records", long_about = None)]
struct Cli {
    /// Do not echo pipeline logs to stderr
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full pipeline: load, derive, summarize, export
    Analyze {
        /// Input CSV or JSON file (default: built-in sample)
        input: Option<PathBuf>,

        /// Output directory for the exported tables
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,

        /// JSON options file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Policy for rows with a zero financed amount
        #[arg(long, value_enum)]
        zero_financing: Option<ZeroFinancingPolicy>,

        /// Delimiter of the exported tables
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Print the full report as JSON instead of the summary table
        #[arg(long)]
        json: bool,

        /// Skip writing the CSV exports
        #[arg(long)]
        no_export: bool,
    },

    /// Print descriptive statistics
    Describe {
        /// Input CSV or JSON file (default: built-in sample)
        input: Option<PathBuf>,

        /// Output JSON instead of a text table
        #[arg(long)]
        json: bool,
    },

    /// Print per-country sums as CSV
    Group {
        /// Input CSV or JSON file (default: built-in sample)
        input: Option<PathBuf>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the chart catalog
    Charts {
        /// Input CSV or JSON file used with --resolve (default: built-in sample)
        input: Option<PathBuf>,

        /// Include the resolved series of every chart
        #[arg(long)]
        resolve: bool,
    },

    /// Write the built-in sample dataset as CSV
    Sample {
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    LOG_BROADCASTER.set_quiet(cli.quiet);
    let mut suppressed = cli.quiet.then(|| LOG_BROADCASTER.subscribe());

    let result = match cli.command {
        Commands::Analyze {
            input,
            out_dir,
            config,
            zero_financing,
            delimiter,
            json,
            no_export,
        } => cmd_analyze(
            input.as_deref(),
            &out_dir,
            config.as_deref(),
            zero_financing,
            delimiter,
            json,
            no_export,
        ),

        Commands::Describe { input, json } => cmd_describe(input.as_deref(), json),

        Commands::Group { input, output } => cmd_group(input.as_deref(), output.as_deref()),

        Commands::Charts { input, resolve } => cmd_charts(input.as_deref(), resolve),

        Commands::Sample { output } => cmd_sample(output.as_deref()),
    };

    if let Some(rx) = suppressed.as_mut() {
        let warnings = drain_warnings(rx);
        if warnings > 0 {
            eprintln!("⚠️  {} warning(s) suppressed by --quiet", warnings);
        }
    }

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

type CmdResult = Result<(), Box<dyn std::error::Error>>;

fn analyze(
    input: Option<&Path>,
    options: &AnalysisOptions,
) -> Result<AnalysisReport, Box<dyn std::error::Error>> {
    match input {
        Some(path) => Ok(analyze_file(path, options)?.1),
        None => {
            eprintln!("📄 No input given, using the built-in sample dataset");
            Ok(run_analysis(sample_records(), options)?)
        }
    }
}

fn cmd_analyze(
    input: Option<&Path>,
    out_dir: &Path,
    config: Option<&Path>,
    zero_financing: Option<ZeroFinancingPolicy>,
    delimiter: Option<char>,
    json: bool,
    no_export: bool,
) -> CmdResult {
    let mut options = match config {
        Some(path) => AnalysisOptions::from_json_file(path)?,
        None => AnalysisOptions::default(),
    };
    if let Some(policy) = zero_financing {
        options.zero_financing = policy;
    }
    if let Some(d) = delimiter {
        options.delimiter = d;
    }
    options.delimiter_byte()?;

    let report = analyze(input, &options)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Descriptive Statistics:");
        println!("{}", report.summary);
    }

    if !report.sentinel_rows.is_empty() {
        eprintln!(
            "⚠️  {} row(s) have NaN intensities (zero financed amount): {:?}",
            report.sentinel_rows.len(),
            report.sentinel_rows
        );
    }

    if !no_export {
        fs::create_dir_all(out_dir)?;
        let paths = export_report(&report, out_dir, &options)?;
        eprintln!("💾 {}", paths.derived.display());
        eprintln!("💾 {}", paths.summary.display());
    }

    eprintln!("\n✨ Analysis complete.");
    Ok(())
}

fn cmd_describe(input: Option<&Path>, json: bool) -> CmdResult {
    let report = analyze(input, &AnalysisOptions::default())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report.summary)?);
    } else {
        println!("{}", report.summary);
    }
    Ok(())
}

fn cmd_group(input: Option<&Path>, output: Option<&Path>) -> CmdResult {
    let report = analyze(input, &AnalysisOptions::default())?;

    match output {
        Some(path) => {
            write_country_summary_csv(fs::File::create(path)?, &report.countries, b',')?;
            eprintln!("💾 Output written to: {}", path.display());
        }
        None => write_country_summary_csv(std::io::stdout().lock(), &report.countries, b',')?,
    }
    Ok(())
}

fn cmd_charts(input: Option<&Path>, resolve: bool) -> CmdResult {
    let catalog = chart_catalog();

    if !resolve {
        println!("{}", serde_json::to_string_pretty(&catalog)?);
        return Ok(());
    }

    #[derive(Serialize)]
    struct ResolvedChart<'a> {
        spec: &'a envfin::ChartSpec,
        file_name: String,
        series: &'a envfin::ChartSeries,
    }

    let report = analyze(input, &AnalysisOptions::default())?;
    let mut sink = CollectingSink::default();
    let count = render_all(&mut sink, &report.derived, &catalog)?;
    eprintln!("📈 Resolved {} charts", count);

    let resolved: Vec<ResolvedChart> = sink
        .charts
        .iter()
        .map(|(spec, series)| ResolvedChart {
            spec,
            file_name: spec.file_name(),
            series,
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&resolved)?);
    Ok(())
}

fn cmd_sample(output: Option<&Path>) -> CmdResult {
    let mut buf = Vec::new();
    {
        let mut wtr = csv::Writer::from_writer(&mut buf);
        for record in sample_records() {
            wtr.serialize(record)?;
        }
        wtr.flush()?;
    }

    match output {
        Some(path) => {
            fs::write(path, &buf)?;
            eprintln!("💾 Sample written to: {}", path.display());
        }
        None => print!("{}", String::from_utf8(buf)?),
    }
    Ok(())
}
