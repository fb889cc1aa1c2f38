use std::fmt::Display;
use std::fs;
use std::io;
use std::path::Path;

use plotters::prelude::*;
use plotters::style::FontTransform;
use rayon::prelude::*;
use tracing::debug;

use biodendro::{ClusterSummary, MatchedRow, OneHotMatrix, Tree};

use crate::driver::{BioDendro, BioDendroError};

fn csv_failed(path: &Path) -> impl FnOnce(csv::Error) -> BioDendroError + '_ {
    move |err| BioDendroError::WriteFailed {
        path: path.to_path_buf(),
        source: err.into(),
    }
}

fn plot_failed<E: Display>(path: &Path) -> impl FnOnce(E) -> BioDendroError + '_ {
    move |err| BioDendroError::PlotError {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

/// Record the settings of this run next to its results
pub fn write_parameters(path: &Path, config: &BioDendro) -> Result<(), BioDendroError> {
    let text = toml::to_string_pretty(config)
        .map_err(|e| BioDendroError::write_failed(path)(io::Error::other(e)))?;
    fs::write(path, text).map_err(BioDendroError::write_failed(path))
}

/// Write the long-form matched fragment rows
pub fn write_processed(path: &Path, rows: &[MatchedRow]) -> Result<(), BioDendroError> {
    let mut writer = csv::Writer::from_path(path).map_err(csv_failed(path))?;
    writer
        .write_record(["component", "spectrum", "mz"])
        .map_err(csv_failed(path))?;
    for row in rows {
        writer
            .write_record([
                row.component.as_str(),
                row.spectrum.as_str(),
                row.mz.to_string().as_str(),
            ])
            .map_err(csv_failed(path))?;
    }
    writer
        .flush()
        .map_err(BioDendroError::write_failed(path))?;
    debug!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// Write the presence matrix with the cluster of each sample in the first column
pub fn write_cluster_table(path: &Path, tree: &Tree) -> Result<(), BioDendroError> {
    let mut writer = csv::Writer::from_path(path).map_err(csv_failed(path))?;
    let header = ["cluster", tree.sample_column().name()]
        .into_iter()
        .chain(tree.onehot().column_labels().iter().map(String::as_str));
    writer.write_record(header).map_err(csv_failed(path))?;
    for (cluster, label, row) in tree.cluster_table() {
        let record = [cluster.to_string(), label.to_string()]
            .into_iter()
            .chain(row.iter().map(|v| v.to_string()));
        writer.write_record(record).map_err(csv_failed(path))?;
    }
    writer
        .flush()
        .map_err(BioDendroError::write_failed(path))
}

fn write_matrix(path: &Path, table: &OneHotMatrix, key: &str) -> Result<(), BioDendroError> {
    let mut writer = csv::Writer::from_path(path).map_err(csv_failed(path))?;
    let header = std::iter::once(key).chain(table.column_labels().iter().map(String::as_str));
    writer.write_record(header).map_err(csv_failed(path))?;
    for (label, row) in table.iter_rows() {
        let record = std::iter::once(label.to_string()).chain(row.iter().map(|v| v.to_string()));
        writer.write_record(record).map_err(csv_failed(path))?;
    }
    writer
        .flush()
        .map_err(BioDendroError::write_failed(path))
}

/// Draw the fraction of a cluster's members having each bin as a bar chart
pub fn draw_frequencies(path: &Path, summary: &ClusterSummary) -> Result<(), BioDendroError> {
    let labels = summary.table.column_labels();
    let n = labels.len();
    let width = (40 * n as u32 + 160).max(640);

    let root = SVGBackend::new(path, (width, 560)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_failed(path))?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!(
                "Cluster {} with {} members",
                summary.cluster,
                summary.size()
            ),
            ("sans-serif", 20),
        )
        .margin(20)
        .x_label_area_size(180)
        .y_label_area_size(60)
        .build_cartesian_2d((0..n).into_segmented(), 0.0..1.05f64)
        .map_err(plot_failed(path))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&|x| match x {
            SegmentValue::CenterOf(i) if *i < n => labels[*i].clone(),
            _ => String::new(),
        })
        .x_label_style(
            ("sans-serif", 11)
                .into_font()
                .transform(FontTransform::Rotate90),
        )
        .x_desc("m/z bin")
        .y_desc("Frequency")
        .draw()
        .map_err(plot_failed(path))?;

    chart
        .draw_series(
            Histogram::vertical(&chart)
                .style(BLUE.mix(0.7).filled())
                .margin(4)
                .data(summary.frequencies.iter().enumerate().map(|(i, f)| (i, *f))),
        )
        .map_err(plot_failed(path))?;

    root.present().map_err(plot_failed(path))?;
    Ok(())
}

fn write_cluster(
    directory: &Path,
    summary: &ClusterSummary,
    key: &str,
) -> Result<(), BioDendroError> {
    let stem = summary.file_stem();
    write_matrix(
        &directory.join(format!("{stem}.csv")),
        &summary.table,
        key,
    )?;
    draw_frequencies(&directory.join(format!("{stem}.svg")), summary)
}

/// Write the member table and frequency chart of every cluster into `directory`
pub fn write_summaries(
    directory: &Path,
    tree: &Tree,
) -> Result<Vec<ClusterSummary>, BioDendroError> {
    let summaries = tree.summaries();
    let key = tree.sample_column().name();
    summaries
        .par_iter()
        .map(|summary| write_cluster(directory, summary, key))
        .collect::<Result<Vec<()>, BioDendroError>>()?;
    Ok(summaries)
}

#[cfg(test)]
mod test {
    use super::*;

    use biodendro::PipelineParams;

    fn scratch_dir(name: &str) -> io::Result<std::path::PathBuf> {
        let dir = Path::new("tmp").join(name);
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    fn tree() -> Tree {
        let rows = [
            ("a", 10.0),
            ("a", 20.0),
            ("b", 10.0),
            ("b", 20.0),
            ("c", 30.0),
        ]
        .into_iter()
        .map(|(c, mz)| MatchedRow::new(c.to_string(), format!("{c}_spectrum"), mz))
        .collect();
        Tree::fit(rows, &PipelineParams::default()).unwrap()
    }

    #[test]
    fn test_write_tables() -> Result<(), Box<dyn std::error::Error>> {
        let dir = scratch_dir("write_tables")?;
        let tree = tree();

        let processed = dir.join("processed.csv");
        write_processed(&processed, tree.rows())?;
        let text = fs::read_to_string(&processed)?;
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("component,spectrum,mz"));
        assert_eq!(lines.next(), Some("a,a_spectrum,10"));
        assert_eq!(text.lines().count(), 6);

        let clusters = dir.join("clusters.csv");
        write_cluster_table(&clusters, &tree)?;
        let text = fs::read_to_string(&clusters)?;
        let header = text.lines().next().unwrap();
        assert!(header.starts_with("cluster,component,"));
        assert_eq!(header.split(',').count(), 5);
        assert_eq!(text.lines().count(), 4);
        Ok(())
    }

    #[test]
    fn test_draw_frequencies_reports_path() -> Result<(), Box<dyn std::error::Error>> {
        let dir = scratch_dir("draw_missing_dir")?;
        let chart = dir.join("absent").join("chart.svg");
        let summary = tree().summaries().remove(0);
        let err = draw_frequencies(&chart, &summary).unwrap_err();
        assert!(
            matches!(&err, BioDendroError::PlotError { path, .. } if path == &chart),
            "{err:?}"
        );
        assert!(err.to_string().contains("chart.svg"));
        Ok(())
    }

    #[test]
    fn test_write_summaries() -> Result<(), Box<dyn std::error::Error>> {
        let dir = scratch_dir("write_summaries")?;
        let tree = tree();
        let summaries = write_summaries(&dir, &tree)?;
        assert_eq!(summaries.len(), 2);
        for summary in summaries {
            let stem = summary.file_stem();
            assert!(dir.join(format!("{stem}.csv")).exists());
            let svg = fs::read_to_string(dir.join(format!("{stem}.svg")))?;
            assert!(svg.contains("<svg"));
        }
        Ok(())
    }
}
