//! A basic demonstration of how to cluster components with [`biodendro::Tree`]

use std::error::Error;

use biodendro::dendrogram::Orientation;
use biodendro::io::{read_components, read_mgf};
use biodendro::{resolve, PipelineParams, SpectrumIndex, Tree};

fn main() -> Result<(), Box<dyn Error>> {
    // Every stage reads its settings from here. The defaults match 2 mDa and
    // 5 second windows and cut the tree at a Jaccard distance of 0.6.
    let params = PipelineParams::default();

    // Read the trigger spectra and index them by precursor m/z.
    let index: SpectrumIndex = read_mgf("test/data/test.mgf")?
        .into_iter()
        .map(|spectrum| params.preprocess(spectrum))
        .collect();

    // Find each component's closest spectrum and flatten its fragments into rows.
    let components = read_components("test/data/components.txt")?;
    let (rows, summary) = resolve(
        &components,
        &index,
        params.mz_tolerance(),
        params.retention_tolerance,
        params.neutral_loss,
    );
    println!(
        "Matched {} of {} components, {} fragment rows",
        summary.matched, summary.components, summary.rows
    );

    // Bin the fragments, cluster the presence matrix and cut the tree.
    let tree = Tree::fit(rows, &params)?;
    for cluster in tree.summaries() {
        println!("Cluster {} with {} members", cluster.cluster, cluster.size());
        for (bin, frequency) in cluster
            .table
            .column_labels()
            .iter()
            .zip(cluster.frequencies.iter())
        {
            println!("\t{bin}\t{frequency:.2}");
        }
    }

    // The leaves of the dendrogram, left to right.
    let geometry = tree.dendrogram(Orientation::Bottom);
    println!("{}", geometry.leaf_labels.join(", "));
    Ok(())
}
