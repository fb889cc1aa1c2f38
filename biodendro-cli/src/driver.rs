use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;

use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use biodendro::dendrogram::Orientation;
use biodendro::io::{read_components, read_mgf, ParseError};
use biodendro::{resolve, ClusteringError, PipelineParams, SpectrumIndex, Tree};

use crate::args::{ArgOrientation, ParamArgs};
use crate::plot::write_dendrogram;
use crate::write::{write_cluster_table, write_parameters, write_processed, write_summaries};

pub const DEFAULT_CONFIG_FILE: &str = "biodendro.toml";
pub const ENV_PREFIX: &str = "BIODENDRO_";

#[derive(Debug, Error)]
pub enum BioDendroError {
    #[error("An IO error occurred: {0}")]
    IOError(
        #[source]
        #[from]
        io::Error,
    ),
    #[error("Failed to read {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
    #[error("Failed to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to cluster components: {0}")]
    ClusteringError(
        #[source]
        #[from]
        ClusteringError,
    ),
    #[error("Invalid configuration: {0}")]
    ConfigError(
        #[source]
        #[from]
        figment::Error,
    ),
    #[error("Failed to draw {path}: {message}")]
    PlotError { path: PathBuf, message: String },
    #[error("Failed to create the thread pool: {0}")]
    ThreadPoolError(
        #[source]
        #[from]
        rayon::ThreadPoolBuildError,
    ),
}

impl BioDendroError {
    pub fn write_failed(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| Self::WriteFailed {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Cluster the components of an MSMS run by the fragments of their trigger spectra.
///
/// Each component is matched to its closest MSMS spectrum, the matched fragments are
/// grouped into m/z bins, and components are clustered by which bins they have.
#[derive(Parser, Debug, Serialize)]
#[command(author, version)]
pub struct BioDendroArgs {
    /// The MGF file of trigger spectra to read
    #[arg()]
    pub mgf: PathBuf,

    /// The list of components to match, one identifier per line
    #[arg()]
    pub components: PathBuf,

    /// Where to write the matched fragment table, relative to the results directory [default: processed.csv]
    #[arg(short = 'p', long = "processed")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed: Option<PathBuf>,

    /// The directory to write all results to [default: results_<timestamp>]
    #[arg(short = 'r', long = "results-dir")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results_dir: Option<PathBuf>,

    /// Where to write the dendrogram page, relative to the results directory [default: simple_dendrogram.html]
    #[arg(short = 'o', long = "output")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,

    /// The width of the dendrogram, in pixels [default: 900]
    #[arg(short = 'x', long = "width")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    /// The height of the dendrogram, in pixels [default: 400]
    #[arg(short = 'y', long = "height")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,

    /// The side of the dendrogram the leaves hang from [default: bottom]
    #[arg(long = "orientation")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<ArgOrientation>,

    /// The number of threads to use, passing a value < 1 to use all available threads
    #[arg(short = 't', long = "threads")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<i32>,

    /// A TOML configuration file to read additional parameters from.
    ///
    /// Configurations are also read from `biodendro.toml` in the working directory.
    /// Environment variables prefixed with `BIODENDRO_` will be read too, with `__`
    /// separating nested keys, e.g. `BIODENDRO_PARAMS__CUTOFF`.
    #[arg(long = "config-file")]
    #[serde(skip)]
    pub config_file: Option<PathBuf>,

    /// The path to write a log file to, in addition to STDERR
    #[arg(short = 'l', long = "log-file")]
    #[serde(skip)]
    pub log_file: Option<PathBuf>,

    /// Only log warnings and errors
    #[arg(short = 'q', long = "quiet")]
    #[serde(skip)]
    pub quiet: bool,

    #[command(flatten)]
    pub params: ParamArgs,
}

impl BioDendroArgs {
    /// Layer the configuration sources, lowest precedence first
    pub fn figment(&self) -> Figment {
        let mut config = Figment::new().merge(Toml::file(DEFAULT_CONFIG_FILE));
        if let Some(path) = self.config_file.as_ref() {
            config = config.merge(Toml::file_exact(path));
        }
        config
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Serialized::defaults(self))
    }

    pub fn load(&self) -> Result<BioDendro, BioDendroError> {
        Ok(self.figment().extract()?)
    }
}

fn default_results_dir() -> PathBuf {
    PathBuf::from(
        chrono::Local::now()
            .format("results_%Y%m%d%H%M%S")
            .to_string(),
    )
}

fn default_processed() -> PathBuf {
    PathBuf::from("processed.csv")
}

fn default_output() -> PathBuf {
    PathBuf::from("simple_dendrogram.html")
}

const fn default_width() -> u32 {
    900
}

const fn default_height() -> u32 {
    400
}

const fn default_threads() -> i32 {
    -1
}

/// A fully resolved run configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BioDendro {
    pub mgf: PathBuf,
    pub components: PathBuf,
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    #[serde(default = "default_processed")]
    pub processed: PathBuf,
    #[serde(default = "default_output")]
    pub output: PathBuf,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default)]
    pub orientation: Orientation,
    #[serde(default = "default_threads")]
    pub threads: i32,
    #[serde(default)]
    pub params: PipelineParams,
}

impl BioDendro {
    pub fn new(mgf: PathBuf, components: PathBuf, results_dir: PathBuf) -> Self {
        Self {
            mgf,
            components,
            results_dir,
            processed: default_processed(),
            output: default_output(),
            width: default_width(),
            height: default_height(),
            orientation: Orientation::default(),
            threads: default_threads(),
            params: PipelineParams::default(),
        }
    }

    fn create_threadpool(&self) -> Result<rayon::ThreadPool, BioDendroError> {
        let num_threads = if self.threads > 0 {
            self.threads as usize
        } else {
            thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        };
        debug!("Using {} cores", num_threads);
        Ok(rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()?)
    }

    /// Resolve `path` against the results directory unless it is absolute
    pub fn output_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.results_dir.join(path)
        }
    }

    pub fn main(&self) -> Result<(), BioDendroError> {
        info!(
            "biodendro v{}",
            option_env!("CARGO_PKG_VERSION").unwrap_or("unknown")
        );
        info!("Spectra: {}", self.mgf.display());
        info!("Components: {}", self.components.display());
        info!("Results: {}", self.results_dir.display());
        self.create_threadpool()?.install(|| self.run())
    }

    fn read_inputs(&self) -> Result<(SpectrumIndex, Vec<biodendro::Component>), BioDendroError> {
        let spectra = read_mgf(&self.mgf).map_err(|source| BioDendroError::ReadFailed {
            path: self.mgf.clone(),
            source,
        })?;
        info!("Read {} spectra", spectra.len());
        let components =
            read_components(&self.components).map_err(|source| BioDendroError::ReadFailed {
                path: self.components.clone(),
                source,
            })?;
        info!("Read {} components", components.len());

        let index: SpectrumIndex = spectra
            .into_iter()
            .map(|spectrum| self.params.preprocess(spectrum))
            .collect();
        Ok((index, components))
    }

    fn run(&self) -> Result<(), BioDendroError> {
        let start = Instant::now();
        let (index, components) = self.read_inputs()?;

        let (rows, summary) = resolve(
            &components,
            &index,
            self.params.mz_tolerance(),
            self.params.retention_tolerance,
            self.params.neutral_loss,
        );
        info!(
            "Matched {} of {} components ({} unmatched), {} fragment rows",
            summary.matched, summary.components, summary.unmatched, summary.rows
        );
        if summary.unmatched > 0 {
            warn!(
                "{} components had no spectrum within {} Da and {} seconds",
                summary.unmatched, self.params.mz_tolerance, self.params.retention_tolerance
            );
        }

        let tree = Tree::fit(rows, &self.params)?;

        fs::create_dir_all(&self.results_dir)
            .map_err(BioDendroError::write_failed(&self.results_dir))?;
        write_parameters(&self.output_path(Path::new("parameters.toml")), self)?;
        write_processed(&self.output_path(&self.processed), tree.rows())?;
        write_cluster_table(&self.output_path(Path::new("clusters.csv")), &tree)?;
        let summaries = write_summaries(&self.results_dir, &tree)?;
        for summary in summaries.iter() {
            debug!(
                "Cluster {} has {} members and {} bins",
                summary.cluster,
                summary.size(),
                summary.table.n_columns()
            );
        }
        write_dendrogram(
            &self.output_path(&self.output),
            &tree,
            self.orientation,
            self.width,
            self.height,
        )?;

        info!(
            "Wrote {} clusters to {} in {:0.3} seconds",
            summaries.len(),
            self.results_dir.display(),
            start.elapsed().as_secs_f64()
        );
        Ok(())
    }
}
