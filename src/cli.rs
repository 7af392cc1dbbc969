use crate::classify::{ClassifierConfig, DecisionParams, MotifSet};
use crate::utils::Result;
use clap::{ArgAction, ArgGroup, Args, Parser, Subcommand};
use env_logger::fmt::Color;
use log::{Level, LevelFilter};
use once_cell::sync::Lazy;
use std::{
    io::Write,
    path::{Path, PathBuf},
};

pub static FULL_VERSION: Lazy<String> = Lazy::new(|| {
    format!(
        "{}-{}",
        env!("CARGO_PKG_VERSION"),
        env!("VERGEN_GIT_DESCRIBE")
    )
});

#[derive(Parser)]
#[command(name="linkerfish",
          version=&**FULL_VERSION,
          about="Real-time linker motif classifier for adaptive sampling",
          long_about = None,
          disable_help_subcommand = true,
          help_template = "{name} {version}\n{about-section}\n{usage-heading}\n    {usage}\n\n{all-args}{after-help}",
          )]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = ArgAction::Count, help = "Specify multiple times to increase verbosity level (e.g., -vv for more verbosity)")]
    pub verbosity: u8,
}

#[derive(Subcommand)]
pub enum Command {
    #[clap(about = "Classify reads as continue, accept or reject")]
    Classify(ClassifyArgs),
    #[clap(about = "Validate a motif configuration and describe the classifier")]
    Validate(ValidateArgs),
}

#[derive(Parser, Debug)]
#[command(group(ArgGroup::new("classify")))]
#[command(arg_required_else_help(true))]
pub struct ClassifyArgs {
    #[clap(required = true)]
    #[clap(short = 'r')]
    #[clap(long = "reads")]
    #[clap(help = "FASTA or FASTQ file with reads (optionally gzipped)")]
    #[clap(value_name = "READS")]
    #[arg(value_parser = check_file_exists)]
    pub reads_path: PathBuf,

    #[clap(required = true)]
    #[clap(short = 't')]
    #[clap(long = "threads")]
    #[clap(help = "Number of classification threads")]
    #[clap(value_name = "THREADS")]
    #[arg(value_parser = threads_in_range)]
    pub num_threads: usize,

    #[clap(short = 'o')]
    #[clap(long = "output")]
    #[clap(help = "Output TSV path [default: stdout]")]
    #[clap(value_name = "OUTPUT")]
    #[arg(value_parser = check_prefix_path)]
    pub output_path: Option<String>,

    #[clap(long = "batch-size")]
    #[clap(value_name = "BATCH_SIZE")]
    #[clap(help = "Number of reads submitted per batch")]
    #[clap(default_value = "512")]
    #[arg(value_parser = positive_usize)]
    pub batch_size: usize,

    #[clap(long = "chunk-len")]
    #[clap(value_name = "BASES")]
    #[clap(help = "Replay each read as prefixes growing by this many bases")]
    #[arg(value_parser = positive_usize)]
    pub chunk_len: Option<usize>,

    #[command(flatten)]
    pub classifier: ClassifierArgs,
}

#[derive(Parser, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub classifier: ClassifierArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ClassifierArgs {
    #[clap(short = 'm')]
    #[clap(long = "motifs")]
    #[clap(value_name = "MOTIFS")]
    #[clap(help = "Motif preset (polya-linkers) or TSV file: SEQUENCE, MAX_ED[, ANCHOR_LEN]")]
    #[clap(default_value = "polya-linkers")]
    pub motifs: String,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "seed")]
    #[clap(value_name = "SEED")]
    #[clap(help = "Seed sequence required before motifs are searched (empty to disable)")]
    #[clap(default_value = "AAAAAAAAAA")]
    #[arg(value_parser = check_seed)]
    pub seed: String,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "min-tail")]
    #[clap(value_name = "BASES")]
    #[clap(help = "Bases required past the first motif before later motifs are judged")]
    #[clap(default_value = "100")]
    pub min_tail: usize,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "gap-min")]
    #[clap(value_name = "BASES")]
    #[clap(help = "Exclusive lower bound on the offset between consecutive motifs")]
    #[clap(default_value = "25")]
    pub gap_min: isize,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "gap-max")]
    #[clap(value_name = "BASES")]
    #[clap(help = "Exclusive upper bound on the offset between consecutive motifs")]
    #[clap(default_value = "45")]
    pub gap_max: isize,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "min-remaining")]
    #[clap(value_name = "BASES")]
    #[clap(help = "Stop searching motifs when fewer bases remain past the last match")]
    #[clap(default_value = "15")]
    pub min_remaining: usize,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "max-prefix-len")]
    #[clap(value_name = "BASES")]
    #[clap(help = "Reject undecided reads once this many bases have been seen")]
    #[arg(value_parser = positive_usize)]
    pub max_prefix_len: Option<usize>,
}

impl ClassifierArgs {
    pub fn to_config(&self, num_threads: usize) -> Result<ClassifierConfig> {
        let motifs = MotifSet::new(&self.motifs)?;
        Ok(ClassifierConfig {
            num_threads: Some(num_threads),
            motifs: Some(motifs),
            params: DecisionParams {
                seed: self.seed.as_bytes().to_vec(),
                min_tail: self.min_tail,
                gap_min: self.gap_min,
                gap_max: self.gap_max,
                max_prefix_len: self.max_prefix_len,
            },
            min_remaining: self.min_remaining,
        })
    }
}

pub fn init_verbose(args: &Cli) {
    let filter_level: LevelFilter = match args.verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            let level = record.level();
            let mut style = buf.style();
            match record.level() {
                Level::Error => style.set_color(Color::Red),
                Level::Warn => style.set_color(Color::Yellow),
                Level::Info => style.set_color(Color::Green),
                Level::Debug => style.set_color(Color::Blue),
                Level::Trace => style.set_color(Color::Cyan),
            };

            writeln!(
                buf,
                "{} [{}] - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                style.value(level),
                record.args()
            )
        })
        .filter_level(filter_level)
        .init();
}

fn check_prefix_path(s: &str) -> Result<String> {
    let path = Path::new(s);
    if let Some(parent_dir) = path.parent() {
        if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
            return Err(format!("Path does not exist: {}", parent_dir.display()));
        }
    }
    Ok(s.to_string())
}

fn threads_in_range(s: &str) -> Result<usize> {
    let thread: usize = s
        .parse()
        .map_err(|_| format!("`{}` is not a valid thread number", s))?;
    if thread >= 1 {
        Ok(thread)
    } else {
        Err("Number of threads must be at least 1".into())
    }
}

fn positive_usize(s: &str) -> Result<usize> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("`{}` is not a valid number", s))?;
    if value >= 1 {
        Ok(value)
    } else {
        Err("Value must be at least 1".into())
    }
}

fn check_file_exists(s: &str) -> Result<PathBuf> {
    let path = Path::new(s);
    if !path.exists() {
        Err(format!("File does not exist: {}", path.display()))
    } else {
        Ok(path.to_path_buf())
    }
}

fn check_seed(s: &str) -> Result<String> {
    let seed = s.trim().to_ascii_uppercase();
    if let Some(bad) = seed.chars().find(|c| !"ACGTUN".contains(*c)) {
        Err(format!("Invalid symbol '{}' in seed", bad))
    } else {
        Ok(seed)
    }
}
