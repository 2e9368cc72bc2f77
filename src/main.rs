use std::path::{Path, PathBuf};

use alumni_outcomes::loader::{self, LoadSummary};
use alumni_outcomes::models::{Cell, ReportMode};
use alumni_outcomes::report::render_text;
use alumni_outcomes::{
    DegreeLevel, EngineConfig, FilterParams, GenderFilter, NationalityFilter, QaaOptions, Report,
    ReportService, SchemaKind, SessionId,
};
use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{debug, warn};

#[derive(Parser)]
#[command(name = "alumni-outcomes")]
#[command(about = "Alumni employment outcome reports for Group Scholar", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// TOML file overriding the built-in lookup tables
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a roster and print its load summary
    Inspect {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        kind: Option<SchemaKind>,
    },
    /// Employment-outcome (QAA) report
    Qaa {
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long)]
        combine_all: bool,
        #[arg(long)]
        combine_years: bool,
        #[arg(long, default_value = "detailed")]
        mode: ReportMode,
        /// Print headline counts instead of building the report
        #[arg(long)]
        preview: bool,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Contact list of alumni with the given statuses
    AlumniList {
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long = "status", required = true)]
        statuses: Vec<String>,
        /// Print per-college and per-gender counts instead of the list
        #[arg(long)]
        preview: bool,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Employer and position statistics
    Workplace {
        #[command(flatten)]
        filter: FilterArgs,
        /// Print the leading employers and positions instead of the report
        #[arg(long)]
        preview: bool,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Add graduates missing from the alumni roster
    BannerDiff {
        #[arg(long)]
        banner: PathBuf,
        #[arg(long)]
        alumni: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Write the built-in configuration to a TOML file
    ConfigInit {
        #[arg(long, default_value = "alumni-outcomes.toml")]
        out: PathBuf,
    },
}

#[derive(Args)]
struct FilterArgs {
    #[arg(long)]
    input: PathBuf,
    /// College to include (repeatable; defaults to every configured college)
    #[arg(long = "college")]
    colleges: Vec<String>,
    /// Graduation term to include (repeatable; defaults to every term in the upload)
    #[arg(long = "term")]
    terms: Vec<String>,
    #[arg(long, default_value = "all")]
    degree: DegreeLevel,
    #[arg(long, default_value = "all")]
    gender: GenderFilter,
    #[arg(long, default_value = "all")]
    nationality: NationalityFilter,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Csv,
}

#[derive(Args)]
struct OutputArgs {
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
    /// File (text, json) or directory (csv) to write to; stdout when omitted
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(cli.verbose >= 2)
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => EngineConfig::load_from_file(path)
            .with_context(|| format!("failed to read configuration {}", path.display()))?,
        None => EngineConfig::default(),
    };
    debug!(verbosity = cli.verbose, "configuration ready");

    if let Commands::ConfigInit { out } = &cli.command {
        config
            .save_to_file(out)
            .with_context(|| format!("failed to write {}", out.display()))?;
        println!("Configuration written to {}.", out.display());
        return Ok(());
    }

    let mut service =
        ReportService::in_memory(config).context("configuration contains an invalid pattern")?;

    match cli.command {
        Commands::Inspect { input, kind } => {
            let (_, summary, warnings) = upload(&mut service, &input, kind)?;
            print_summary(&summary, &warnings);
        }
        Commands::Qaa {
            filter,
            combine_all,
            combine_years,
            mode,
            preview,
            output,
        } => {
            let (session, params) = upload_filtered(&mut service, &filter)?;
            if preview {
                let counts = service.preview(&session, &params, mode)?;
                println!("{}", serde_json::to_string_pretty(&counts)?);
                return Ok(());
            }
            let options = QaaOptions {
                combine_all,
                combine_years,
                mode,
            };
            let report = service.generate_qaa_report(&session, &params, options)?;
            emit("QAA Report", &report, &output)?;
        }
        Commands::AlumniList {
            filter,
            statuses,
            preview,
            output,
        } => {
            let (session, params) = upload_filtered(&mut service, &filter)?;
            if preview {
                let counts = service.preview_alumni_list(&session, &params, &statuses)?;
                println!("{}", serde_json::to_string_pretty(&counts)?);
                return Ok(());
            }
            let report = service.generate_alumni_list(&session, &params, &statuses)?;
            emit("Alumni List", &report, &output)?;
        }
        Commands::Workplace {
            filter,
            preview,
            output,
        } => {
            let (session, params) = upload_filtered(&mut service, &filter)?;
            if preview {
                let counts = service.preview_workplace(&session, &params)?;
                println!("{}", serde_json::to_string_pretty(&counts)?);
                return Ok(());
            }
            let report = service.generate_workplace_report(&session, &params)?;
            emit("Workplace Report", &report, &output)?;
        }
        Commands::BannerDiff {
            banner,
            alumni,
            output,
        } => {
            let (banner_session, _, _) = upload(&mut service, &banner, Some(SchemaKind::Banner))?;
            let (alumni_session, _, _) = upload(&mut service, &alumni, Some(SchemaKind::Alumni))?;
            let report = service.generate_banner_diff(&banner_session, &alumni_session)?;
            emit("Banner Integration", &report, &output)?;
        }
        Commands::ConfigInit { .. } => {}
    }

    Ok(())
}

fn upload(
    service: &mut ReportService,
    path: &Path,
    kind: Option<SchemaKind>,
) -> anyhow::Result<(SessionId, LoadSummary, Vec<String>)> {
    let table = loader::read_csv_path(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let source = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let upload = service
        .upload(table, kind, &source)
        .with_context(|| format!("{} was rejected", path.display()))?;
    Ok((upload.session, upload.summary, upload.warnings))
}

/// Loads the input and resolves the filter, widening empty college and term
/// lists to everything available.
fn upload_filtered(
    service: &mut ReportService,
    args: &FilterArgs,
) -> anyhow::Result<(SessionId, FilterParams)> {
    let (session, _, warnings) = upload(service, &args.input, None)?;
    for warning in &warnings {
        warn!("{warning}");
    }

    let colleges = if args.colleges.is_empty() {
        service.engine().config().college_names()
    } else {
        args.colleges.clone()
    };
    let terms = if args.terms.is_empty() {
        service.dataset(&session)?.graduation_terms.clone()
    } else {
        args.terms.clone()
    };

    Ok((
        session,
        FilterParams {
            colleges,
            terms,
            degree: args.degree,
            gender: args.gender,
            nationality: args.nationality,
        },
    ))
}

fn print_summary(summary: &LoadSummary, warnings: &[String]) {
    println!(
        "{} ({} roster): {} records across {} colleges",
        summary.source_name, summary.kind, summary.record_count, summary.unique_colleges
    );
    if let Some(range) = &summary.term_range {
        println!("Terms {} to {}", range.min, range.max);
    }
    for entry in &summary.college_distribution {
        println!("- {}: {}", entry.value, entry.count);
    }
    for entry in &summary.gender_distribution {
        println!("- {}: {}", entry.value, entry.count);
    }
    if warnings.is_empty() {
        println!("No data-quality warnings.");
    } else {
        println!("Warnings:");
        for warning in warnings {
            println!("- {warning}");
        }
    }
}

fn emit(title: &str, report: &Report, output: &OutputArgs) -> anyhow::Result<()> {
    match output.format {
        OutputFormat::Text => write_or_print(render_text(title, report), output.out.as_deref()),
        OutputFormat::Json => {
            write_or_print(serde_json::to_string_pretty(report)?, output.out.as_deref())
        }
        OutputFormat::Csv => {
            let Some(dir) = &output.out else {
                bail!("--out <DIR> is required for csv output");
            };
            write_csv_sheets(report, dir)?;
            for warning in &report.warnings {
                println!("warning: {warning}");
            }
            println!("Wrote {} sheets to {}.", report.sheets.len(), dir.display());
            Ok(())
        }
    }
}

fn write_or_print(content: String, out: Option<&Path>) -> anyhow::Result<()> {
    match out {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Report written to {}.", path.display());
        }
        None => println!("{content}"),
    }
    Ok(())
}

fn sheet_file_name(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("{stem}.csv")
}

fn write_csv_sheets(report: &Report, dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;

    for sheet in &report.sheets {
        let path = dir.join(sheet_file_name(&sheet.name));
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        writer.write_record(&sheet.columns)?;
        for row in &sheet.rows {
            writer.write_record(row.iter().map(Cell::render))?;
        }
        if !sheet.notes.is_empty() {
            writer.write_record([""])?;
            for note in &sheet.notes {
                writer.write_record([note.label.as_str(), note.value.as_str()])?;
            }
        }
        writer.flush()?;
    }
    Ok(())
}
