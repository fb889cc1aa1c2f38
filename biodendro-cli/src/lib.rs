mod args;
mod driver;
mod plot;
mod write;

pub use args::*;
pub use driver::{BioDendro, BioDendroArgs, BioDendroError, DEFAULT_CONFIG_FILE, ENV_PREFIX};
pub use plot::{figure, render_html, write_dendrogram};
pub use write::{
    draw_frequencies, write_cluster_table, write_parameters, write_processed, write_summaries,
};
