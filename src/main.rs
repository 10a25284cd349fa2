//! tss-mapper: gene annotation reconciliation and TSS classification
//!
//! Usage: tss-mapper <COMMAND> [OPTIONS]

use clap::{Args, Parser, Subcommand};
use log::{info, LevelFilter};
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use tss_mapper::commands::{GeneMerger, IgrCommand, MergeCommand, TssClassifier};
use tss_mapper::config::{
    ClassifyConfig, MergeConfig, DEFAULT_MAX_DIST_5_PRIME, DEFAULT_MAX_DIST_ANTISENSE,
};
use tss_mapper::genome::Genome;
use tss_mapper::gff::{read_genes, GffFilter, GffRecord, GffWriter};
use tss_mapper::interval::Position;
use tss_mapper::report::write_report;
use tss_mapper::tss_table::read_tss_table;
use tss_mapper::{Error, Result};

#[derive(Parser)]
#[command(name = "tss-mapper")]
#[command(version)]
#[command(about = "Reconcile gene annotations and classify transcriptional start sites", long_about = None)]
struct Cli {
    /// Number of threads to use (default: number of CPUs)
    #[arg(long, short = 't', global = true)]
    threads: Option<usize>,

    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Which GFF entries are genes and which attributes name them.
#[derive(Args)]
struct FeatureArgs {
    /// GFF feature type to read as genes
    #[arg(long, default_value = "gene")]
    feature: String,

    /// Attribute holding the gene identity
    #[arg(long, default_value = "locus_tag")]
    id_attribute: String,

    /// Attribute holding the gene name
    #[arg(long, default_value = "Name")]
    name_attribute: String,
}

impl FeatureArgs {
    fn filter(self) -> GffFilter {
        GffFilter {
            feature: self.feature,
            id_attribute: self.id_attribute,
            name_attribute: self.name_attribute,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Classify TSS against the genes of a GFF file
    MapTss {
        /// TSS table (position, strand, optional sequence id)
        tss_table: PathBuf,

        /// Gene annotation in GFF3
        gff: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Maximum leader length of a 5' TSS
        #[arg(long = "max-dist-5-prime", default_value_t = DEFAULT_MAX_DIST_5_PRIME)]
        max_dist_5_prime: Position,

        /// Flank around a gene in which an opposite-strand TSS is antisense
        #[arg(long, default_value_t = DEFAULT_MAX_DIST_ANTISENSE)]
        max_dist_antisense: Position,

        #[command(flatten)]
        features: FeatureArgs,

        /// Merge overlapping genes before classification
        #[arg(long)]
        merge_genes: bool,

        /// Minimum overlap (percent of each gene) for merging
        #[arg(long, requires = "merge_genes")]
        min_overlap_percentage: Option<f64>,
    },

    /// Merge overlapping genes of one or more GFF files
    MergeGenes {
        /// Gene annotations in GFF3, merged in the given order
        #[arg(required = true)]
        gff: Vec<PathBuf>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Minimum overlap (percent of each gene) for merging
        #[arg(long)]
        min_overlap_percentage: Option<f64>,

        /// Keep the first gene of an overlapping group instead of fusing
        #[arg(long)]
        no_merge: bool,

        #[command(flatten)]
        features: FeatureArgs,
    },

    /// Write the intergenic regions of a GFF file
    Igr {
        /// Gene annotation in GFF3
        gff: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Sequence sizes file (default: sequence-region pragmas of the GFF)
        #[arg(short = 'g', long)]
        genome: Option<PathBuf>,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(level);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}

fn open_output(path: Option<PathBuf>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) => Ok(Box::new(File::create(path)?)),
        None => Ok(Box::new(io::stdout().lock())),
    }
}

fn merge_config(min_overlap_percentage: Option<f64>, perform_merging: bool) -> Result<MergeConfig> {
    let config = MergeConfig::new().with_merging(perform_merging);
    match min_overlap_percentage {
        Some(pct) => Ok(config.with_min_overlap_percentage(pct)?),
        None => Ok(config),
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = run(cli);

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Some(n) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .map_err(|e| Error::Invalid(format!("Failed to initialize thread pool: {}", e)))?;
    }

    match cli.command {
        Commands::MapTss {
            tss_table,
            gff,
            output,
            max_dist_5_prime,
            max_dist_antisense,
            features,
            merge_genes,
            min_overlap_percentage,
        } => {
            let config = ClassifyConfig::default()
                .with_max_dist_5_prime(max_dist_5_prime)?
                .with_max_dist_antisense(max_dist_antisense)?;
            let merge = merge_genes
                .then(|| merge_config(min_overlap_percentage, true))
                .transpose()?;
            run_map_tss(tss_table, gff, output, config, features.filter(), merge)
        }

        Commands::MergeGenes {
            gff,
            output,
            min_overlap_percentage,
            no_merge,
            features,
        } => {
            let config = merge_config(min_overlap_percentage, !no_merge)?;
            run_merge_genes(gff, output, config, features.filter())
        }

        Commands::Igr {
            gff,
            output,
            genome,
        } => run_igr(gff, output, genome),
    }
}

fn run_map_tss(
    tss_table: PathBuf,
    gff: PathBuf,
    output: Option<PathBuf>,
    config: ClassifyConfig,
    filter: GffFilter,
    merge: Option<MergeConfig>,
) -> Result<()> {
    let table = read_tss_table(&tss_table)?;
    let annotation = read_genes(&gff, &filter)?;
    info!(
        "Read {} TSS ({} rows skipped) and {} genes ({} lines skipped)",
        table.points.len(),
        table.skipped,
        annotation.genes.len(),
        annotation.skipped
    );

    let genes = match merge {
        Some(merge_config) => {
            let (genes, stats) = MergeCommand::new(merge_config).merge_with_stats(annotation.genes);
            info!("{}", stats);
            genes
        }
        None => annotation.genes,
    };

    let map = TssClassifier::new(config).classify(&table.points, &genes);
    info!("{}", map.summary());

    let rows = write_report(open_output(output)?, &table.points, &genes, &map)?;
    info!("Wrote {} report rows", rows);
    Ok(())
}

fn run_merge_genes(
    inputs: Vec<PathBuf>,
    output: Option<PathBuf>,
    config: MergeConfig,
    filter: GffFilter,
) -> Result<()> {
    let mut merger: GeneMerger<GffRecord> = GeneMerger::new(config);
    for path in &inputs {
        let annotation = read_genes(path, &filter)?;
        info!(
            "{}: {} genes ({} lines skipped)",
            path.display(),
            annotation.genes.len(),
            annotation.skipped
        );
        merger.add_intervals(annotation.genes);
    }
    info!("{}", merger.stats());

    let mut writer = GffWriter::new(open_output(output)?)?;
    for interval in &merger.into_merged() {
        writer.write_interval(interval, &filter.feature)?;
    }
    writer.flush()?;
    Ok(())
}

fn run_igr(gff: PathBuf, output: Option<PathBuf>, genome_path: Option<PathBuf>) -> Result<()> {
    let annotation = read_genes(&gff, &GffFilter::default())?;
    let genome = match genome_path {
        Some(path) => Genome::from_file(path)?,
        None => annotation.genome,
    };
    if genome.is_empty() {
        return Err(Error::Invalid(format!(
            "No sequence lengths in {}; add ##sequence-region pragmas or pass a sizes file with -g",
            gff.display()
        )));
    }

    let cmd = IgrCommand::new();
    let regions = cmd.find(&annotation.genes, &genome);
    info!("Found {} intergenic regions", regions.len());

    let mut writer = GffWriter::new(open_output(output)?)?;
    cmd.write_gff(&regions, &mut writer)?;
    Ok(())
}
