use clap::Parser;
use ibd_dendrogram::cluster::{Linkage, LinkageEngine};
use ibd_dendrogram::hierarchy::DendrogramLayout;
use ibd_dendrogram::matrix::{DistanceMatrixBuilder, MatrixConfig};
use ibd_dendrogram::{io, Result};
use std::fs::File;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a `tracing` filter, e.g. `ibd_dendrogram=debug`.
const LOG_ENV: &str = "IBD_DENDROGRAM_LOG";

#[derive(Parser, Debug)]
#[command(
    name = "ibd-dendrogram",
    version,
    about = "Cluster samples by pairwise IBD sharing",
    long_about = r#"
Builds a distance matrix from pairwise IBD segment lengths (1 / length, or
1 / (cm-threshold / 2) for pairs without detected sharing) and clusters it
with Ward linkage.

Input: delimited table with a header containing pair_1, pair_2 and length.

Output files:
  <prefix>.distance_matrix.tsv   <id>\t<d_0>\t...\t<d_n-1>
  <prefix>.linkage.tsv           <cluster_a>\t<cluster_b>\t<distance>\t<size>
  <prefix>.leaves.tsv            <id>\t<case|other>, dendrogram leaf order
  <prefix>.groups.tsv            <id>\t<group>   (only with --groups)
"#
)]
struct Args {
    /// Pairwise sharing table.
    #[arg(short = 'i', long = "pairs", value_name = "FILE")]
    pairs: PathBuf,

    /// Output path prefix.
    #[arg(short = 'o', long = "output", value_name = "PREFIX")]
    output: String,

    /// Minimum detectable segment length in cM.
    #[arg(long = "cm-threshold", value_name = "CM", default_value_t = MatrixConfig::default().cm_threshold)]
    cm_threshold: f64,

    /// Field delimiter of the pairs table.
    #[arg(short = 'd', long = "delimiter", value_name = "CHAR", default_value_t = '\t')]
    delimiter: char,

    /// File with one case identity per line.
    #[arg(long = "cases", value_name = "FILE")]
    cases: Option<PathBuf>,

    /// Linkage method: single, complete, average or ward.
    #[arg(long = "linkage", value_name = "METHOD", default_value = "ward")]
    linkage: Linkage,

    /// Also cut the tree into this many groups.
    #[arg(long = "groups", value_name = "K")]
    groups: Option<usize>,

    /// Log every pair that falls back to the no-sharing distance.
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: &Args) -> Result<()> {
    let delimiter = u8::try_from(args.delimiter).map_err(|_| ibd_dendrogram::Error::InvalidInput {
        reason: format!("delimiter '{}' is not a single-byte character", args.delimiter),
    })?;

    let records = io::read_pairs_path(&args.pairs, delimiter)?;
    let (ids, matrix) = DistanceMatrixBuilder::new(args.cm_threshold).build(&records)?;

    let matrix_path = format!("{}.distance_matrix.tsv", args.output);
    io::write_matrix_path(&matrix_path, &ids, &matrix)?;
    tracing::info!(path = matrix_path.as_str(), "wrote distance matrix");

    let tree = LinkageEngine::new().with_linkage(args.linkage).cluster(&matrix)?;
    let linkage_path = format!("{}.linkage.tsv", args.output);
    io::write_linkage(File::create(&linkage_path)?, &tree)?;
    tracing::info!(path = linkage_path.as_str(), merges = tree.n_merges(), "wrote linkage");

    let cases = args.cases.as_ref().map(io::read_cases_path).transpose()?;
    let layout = DendrogramLayout::assemble(&tree, &ids, cases.as_deref())?;
    let leaves_path = format!("{}.leaves.tsv", args.output);
    io::write_layout(File::create(&leaves_path)?, &layout)?;
    tracing::info!(
        path = leaves_path.as_str(),
        cases = layout.n_cases(),
        "wrote leaf order"
    );

    if let Some(k) = args.groups {
        let labels = tree.cut_to_k(k)?;
        let groups_path = format!("{}.groups.tsv", args.output);
        io::write_groups(File::create(&groups_path)?, &ids, &labels)?;
        tracing::info!(path = groups_path.as_str(), groups = k, "wrote groups");
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    if let Err(err) = run(&args) {
        tracing::error!("{err}");
        std::process::exit(1);
    }
}
