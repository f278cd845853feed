//! Command line tool for inspecting and excerpting SPICE kernels.

use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use jplephem::calendar::{compute_calendar_date, parse_date, seconds_to_jd, S_PER_DAY};
use jplephem::spk::Segment;
use jplephem::{write_excerpt, Backend, OpenOptions, DAF, SPK};

#[derive(Parser)]
#[command(name = "jplephem", about = "Describe an SPK kernel", version)]
struct Cli {
    /// Read files with buffered I/O instead of memory mapping them
    #[arg(long, global = true, env = "JPLEPHEM_NO_MMAP")]
    no_mmap: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a file's comment blocks
    Comment {
        /// Path to a SPICE file
        path: PathBuf,
    },

    /// List a file's raw segment descriptors
    Daf {
        /// Path to a SPICE file
        path: PathBuf,
    },

    /// Create an SPK covering a narrower range of dates
    Excerpt {
        /// Comma-separated targets to include
        #[arg(long, value_delimiter = ',')]
        targets: Vec<i32>,

        /// Start date yyyy/mm/dd
        #[arg(value_parser = date_arg)]
        start_date: (String, f64),

        /// End date yyyy/mm/dd
        #[arg(value_parser = date_arg)]
        end_date: (String, f64),

        /// Local filename of the source kernel
        input_path: PathBuf,

        /// Output file to create
        output_path: PathBuf,
    },

    /// List the segments in an SPK file
    Spk {
        /// Path to a .bsp SPICE kernel file
        path: PathBuf,

        #[arg(short, long)]
        verbose: bool,
    },
}

fn date_arg(text: &str) -> std::result::Result<(String, f64), String> {
    parse_date(text)
        .map(|jd| (text.to_string(), jd))
        .ok_or_else(|| "specify each date as YYYY or YYYY/MM or YYYY/MM/DD".to_string())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let options = if cli.no_mmap {
        OpenOptions::new().backend(Backend::Buffered)
    } else {
        OpenOptions::new()
    };

    let lines = match cli.command {
        Commands::Comment { path } => vec![open_daf(&path, &options)?.comments()?],
        Commands::Daf { path } => daf_segments(&open_daf(&path, &options)?)?,
        Commands::Spk { path, verbose } => spk_segments(&open_spk(&path, &options)?, verbose)?,
        Commands::Excerpt {
            targets,
            start_date,
            end_date,
            input_path,
            output_path,
        } => excerpt(
            &options,
            &targets,
            start_date,
            end_date,
            &input_path,
            &output_path,
        )?,
    };

    let mut text = lines.join("\n");
    if !text.ends_with('\n') {
        text.push('\n');
    }
    print!("{text}");
    Ok(())
}

fn open_daf(path: &Path, options: &OpenOptions) -> Result<DAF> {
    options
        .open(path)
        .with_context(|| format!("cannot read {}", path.display()))
}

fn open_spk(path: &Path, options: &OpenOptions) -> Result<SPK> {
    SPK::from_daf(open_daf(path, options)?)
        .with_context(|| format!("{} is not a valid SPK", path.display()))
}

fn daf_segments(daf: &DAF) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    for (i, summary) in daf.summaries().enumerate() {
        let summary = summary?;
        let values: Vec<String> = summary
            .doubles
            .iter()
            .map(|d| format!("{d:?}"))
            .chain(summary.integers.iter().map(|i| i.to_string()))
            .collect();
        lines.push(format!(
            "{:2} {} {}",
            i + 1,
            summary.name_text(),
            values.join(" ")
        ));
    }
    Ok(lines)
}

fn spk_segments(spk: &SPK, verbose: bool) -> Result<Vec<String>> {
    let catalog = spk.to_string();
    let mut lines = vec![catalog.lines().next().unwrap_or_default().to_string()];
    for segment in &spk.segments {
        lines.push(segment.to_string());
        if verbose {
            lines.extend(segment_details(segment)?);
        }
    }
    Ok(lines)
}

fn calendar_text(seconds: f64) -> String {
    let (y, m, d) = compute_calendar_date((seconds_to_jd(seconds) + 0.5) as i64, None);
    format!("{y}-{m:02}-{d:02}")
}

fn segment_details(segment: &Segment) -> Result<Vec<String>> {
    let Some(layout) = segment.chebyshev_layout()? else {
        return Ok(Vec::new());
    };
    let (plural, each) = if layout.n == 1 { ("", "") } else { ("s", " each") };
    let mut lines = vec![
        format!(
            "   {} polynomial{plural} covering {:?} days{each}",
            layout.n,
            layout.intlen / S_PER_DAY
        ),
        format!("      x {} coefficients per polynomial", layout.coefficient_count),
        format!("      x {} coordinates", layout.component_count),
        format!("      = {} double precision floats", layout.size()),
    ];

    let polynomial_start = layout.init;
    let polynomial_end = layout.final_epoch();
    if segment.start_second == polynomial_start {
        lines.push("   Polynomial start date matches segment start date".to_string());
    } else {
        lines.push(format!(
            "   First polynomial starts {:.1} days earlier than segment start date, on {}",
            (segment.start_second - polynomial_start) / S_PER_DAY,
            calendar_text(polynomial_start)
        ));
    }
    if segment.end_second == polynomial_end {
        lines.push("   Polynomial end date matches segment end date".to_string());
    } else {
        lines.push(format!(
            "   Final polynomial ends {:.1} days later than segment end date, on {}",
            (polynomial_end - segment.end_second) / S_PER_DAY,
            calendar_text(polynomial_end)
        ));
    }
    lines.push(String::new());
    Ok(lines)
}

fn excerpt(
    options: &OpenOptions,
    targets: &[i32],
    (start_text, start_jd): (String, f64),
    (end_text, end_jd): (String, f64),
    input_path: &Path,
    output_path: &Path,
) -> Result<Vec<String>> {
    let mut lines = vec![
        format!("Date {start_text:10} = JD {start_jd:?}"),
        format!("Date {end_text:10} = JD {end_jd:?}"),
    ];

    let spk = open_spk(input_path, options)?;
    let wanted: HashSet<i32> = targets.iter().copied().collect();
    let output = File::options()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(output_path)
        .with_context(|| format!("cannot create {}", output_path.display()))?;

    let daf = write_excerpt(&spk, output, start_jd, end_jd, |segment| {
        wanted.is_empty() || wanted.contains(&segment.target)
    })
    .with_context(|| format!("failed writing {}", output_path.display()))?;

    lines.push(format!(
        "\n{:?} written successfully with the following contents\n",
        output_path.display().to_string()
    ));
    lines.push(SPK::from_daf(daf)?.to_string());
    Ok(lines)
}
