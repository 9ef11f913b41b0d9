//! proteoscope - Proteoform variant dictionary explorer
//!
//! Derives per-position heatmaps, compositions and variability summaries from
//! a precomputed variant dictionary.
//!
//! ## Usage
//!
//! ```bash
//! proteoscope <dictionary.json>                       # feature overview
//! proteoscope <dictionary.json> -F geneA -o view.json # derived view as JSON
//! proteoscope <dictionary.json> -F geneA -c B --min-samples 3 -o -
//! ```
//!
//! Logs go to stderr; set `RUST_LOG` or use `-v` for more detail.

// Use jemalloc for better memory management (returns memory to OS)
#[cfg(not(windows))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use proteoscope::aggregate::OverviewNode;
use proteoscope::config::{AmbiguityMode, ViewSettings};
use proteoscope::controller::Session;
use proteoscope::stats::UniformityTest;
use proteoscope::view::ViewModel;

/// Ambiguity mode for command line
#[derive(Debug, Clone, Copy, ValueEnum)]
enum AmbiguityArg {
    /// Ambiguous (lower-case) calls are not counted
    Mask,
    /// Ambiguous calls are counted like confident ones
    Show,
}

impl From<AmbiguityArg> for AmbiguityMode {
    fn from(arg: AmbiguityArg) -> Self {
        match arg {
            AmbiguityArg::Mask => AmbiguityMode::Mask,
            AmbiguityArg::Show => AmbiguityMode::Show,
        }
    }
}

/// proteoscope - Explore proteoform variant dictionaries
///
/// Without -F/--feature, prints the chromosome / class / feature overview.
/// With it, derives the feature view; -o/--output writes it as JSON (use "-" for stdout).
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Variant dictionary (JSON)
    file: PathBuf,

    /// Feature to derive the view of
    #[arg(short = 'F', long = "feature")]
    feature: Option<String>,

    /// Protein chain (default: first chain of the feature's protein)
    #[arg(short = 'c', long = "chain")]
    chain: Option<String>,

    /// JSON settings file; command line options override its values
    #[arg(short = 's', long = "settings")]
    settings: Option<PathBuf>,

    /// PDB structure to use instead of the one embedded in the dictionary
    #[arg(long = "structure")]
    structure: Option<PathBuf>,

    /// Legacy residue distance map (TSV); only validated and summarized in the log
    #[arg(long = "distance-map")]
    distance_map: Option<PathBuf>,

    /// Legacy variant annotation table (TSV); only validated and summarized in the log
    #[arg(long = "annotation-table")]
    annotation_table: Option<PathBuf>,

    /// Hide proteoforms with a premature termination
    #[arg(long = "exclude-pt")]
    exclude_premature_termination: bool,

    /// Hide proteoforms observed in fewer samples
    #[arg(long = "min-samples")]
    min_samples: Option<usize>,

    /// Hide proteoforms with a lower percentage of variable positions
    #[arg(long = "min-vp")]
    min_vp: Option<f64>,

    /// Always show this proteoform (repeatable; overrides the filters above)
    #[arg(long = "proteoform")]
    proteoforms: Vec<String>,

    /// Always show proteoforms carrying this sample (repeatable)
    #[arg(long = "sample")]
    samples: Vec<String>,

    /// How ambiguous calls enter variability
    #[arg(short = 'a', long = "ambiguity", value_enum)]
    ambiguity: Option<AmbiguityArg>,

    /// Keep calls after a proteoform's first termination
    #[arg(long = "no-truncate")]
    no_truncate: bool,

    /// Hydropathicity window size (odd)
    #[arg(short = 'w', long = "window")]
    window: Option<usize>,

    /// Hydropathicity edge weight in [0, 1]
    #[arg(long = "edge-weight")]
    edge_weight: Option<f64>,

    /// Output file for the derived view. Use "-" for stdout.
    #[arg(short = 'o', long = "output")]
    output: Option<String>,

    /// More log output (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    /// Settings file (or defaults) with command line overrides applied.
    fn view_settings(&self) -> Result<ViewSettings> {
        let mut settings = match &self.settings {
            Some(path) => ViewSettings::from_file(path)
                .with_context(|| format!("Failed to load settings from {}", path.display()))?,
            None => ViewSettings::default(),
        };

        if self.exclude_premature_termination {
            settings.filter.exclude_premature_termination = true;
        }
        if let Some(min_samples) = self.min_samples {
            settings.filter.min_sample_count = min_samples;
        }
        if let Some(min_vp) = self.min_vp {
            settings.filter.min_variable_position_percent = min_vp;
        }
        settings.filter.proteoform_ids.extend(self.proteoforms.iter().cloned());
        settings.filter.sample_ids.extend(self.samples.iter().cloned());
        if let Some(ambiguity) = self.ambiguity {
            settings.ambiguity_mode = ambiguity.into();
        }
        if self.no_truncate {
            settings.truncate_after_first_termination = false;
        }
        if let Some(window) = self.window {
            settings.hydropathicity_window = window;
        }
        if let Some(edge_weight) = self.edge_weight {
            settings.hydropathicity_edge_weight = edge_weight;
        }

        settings.validate()?;
        Ok(settings)
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();
}

fn write_overview<W: Write>(out: &mut W, node: &OverviewNode, depth: usize) -> io::Result<()> {
    let indent = "  ".repeat(depth);
    match node.value {
        Some(value) => writeln!(out, "{}{}\t{:.1}", indent, node.name, value)?,
        None if node.is_leaf() && depth > 1 => writeln!(out, "{}{}\t-", indent, node.name)?,
        None => writeln!(out, "{}{}", indent, node.name)?,
    }
    for child in &node.children {
        write_overview(out, child, depth + 1)?;
    }
    Ok(())
}

fn write_summary<W: Write>(out: &mut W, view: &ViewModel) -> io::Result<()> {
    let summary = &view.summary;
    writeln!(out, "Feature\t{}", view.feature)?;
    writeln!(out, "Chain\t{}", view.chain)?;
    writeln!(out, "Proteoforms\t{}", view.proteoforms.len())?;
    writeln!(out, "Positions\t{}", summary.total_positions)?;
    writeln!(out, "Variable positions\t{:.2}%", summary.percent_variable_positions)?;
    writeln!(out, "Samples\t{}", summary.total_samples)?;
    writeln!(out, "Sample mean VP\t{:.2}", summary.mean_variable_percentage)?;
    writeln!(out, "Sample PT rate\t{:.2}%", summary.premature_termination_rate * 100.0)?;
    match &view.uniformity {
        UniformityTest::Tested(result) => {
            writeln!(out, "Uniformity D\t{:.4}", result.d)?;
            writeln!(out, "Uniformity p\t{:.4}", result.p)?;
        }
        UniformityTest::InsufficientData { variable_positions } => {
            writeln!(
                out,
                "Uniformity\tnot tested ({} variable positions)",
                variable_positions
            )?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let settings = args.view_settings()?;
    let mut session = Session::new(settings);
    session
        .load_dictionary(&args.file)
        .with_context(|| format!("Failed to load {}", args.file.display()))?;

    let Some(feature) = args.feature.as_deref() else {
        let overview = session.overview()?;
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        write_overview(&mut handle, &overview, 0)?;
        return Ok(());
    };

    session.select_feature(feature)?;
    if let Some(chain) = args.chain.as_deref() {
        session.select_chain(chain)?;
    }
    if let Some(path) = &args.structure {
        session
            .load_structure(path)
            .with_context(|| format!("Failed to load structure {}", path.display()))?;
    }
    if let Some(path) = &args.distance_map {
        let map = session.load_distance_map(path)?;
        info!(residues = map.residues().len(), contacts = map.contact_count(), "loaded distance map");
    }
    if let Some(path) = &args.annotation_table {
        let table = session.load_annotation_table(path)?;
        info!(rows = table.len(), columns = table.columns.len(), "loaded annotation table");
    }

    let view = session.view()?;
    match args.output.as_deref() {
        Some("-") => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            serde_json::to_writer_pretty(&mut handle, view)?;
            writeln!(handle)?;
        }
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path))?;
            let mut writer = io::BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, view)?;
            writer.flush()?;
            info!(path, "wrote view");
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            write_summary(&mut handle, view)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_legacy_tables_are_log_only() {
        let command = Args::command();
        for name in ["distance_map", "annotation_table"] {
            let arg = command
                .get_arguments()
                .find(|a| a.get_id() == name)
                .unwrap();
            let help = arg.get_help().unwrap().to_string();
            assert!(help.contains("only validated"), "{}: {}", name, help);
        }
    }
}
