//! Render the cluster tree as an interactive plotly page
use std::fs;
use std::path::Path;

use serde_json::{json, Value};

use biodendro::dendrogram::{DendrogramGeometry, Orientation};
use biodendro::Tree;

use crate::driver::BioDendroError;

const PLOTLY_SRC: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

/// Scales the margin under the leaf labels, per character of the longest label
const MARGIN_SCALE: usize = 12;

fn axis_defaults() -> Value {
    json!({
        "type": "linear",
        "ticks": "outside",
        "mirror": "allticks",
        "rangemode": "tozero",
        "showticklabels": true,
        "zeroline": false,
        "showgrid": false,
        "showline": true,
    })
}

fn merge(target: &mut Value, source: Value) {
    if let (Some(target), Value::Object(source)) = (target.as_object_mut(), source) {
        target.extend(source);
    }
}

/// One line trace per link, with hover text naming the leaves a link touches
fn traces(tree: &Tree, geometry: &DendrogramGeometry) -> Vec<Value> {
    let clusters = tree.clusters().by_label();
    let hover = |label: Option<&str>| -> Value {
        label
            .map(|label| {
                let cluster = clusters
                    .get(label)
                    .map(|c| c.to_string())
                    .unwrap_or_default();
                Value::from(format!("cluster: {cluster}, component: {label}"))
            })
            .unwrap_or(Value::Null)
    };

    geometry
        .segments
        .iter()
        .map(|segment| {
            let [left, right] = geometry.segment_ends(segment).map(&hover);
            json!({
                "type": "scatter",
                "x": segment.xs,
                "y": segment.ys,
                "mode": "lines",
                "marker": {"color": segment.color.rgb()},
                "text": [left.clone(), left, right.clone(), right],
                "hoverinfo": "text",
                "xaxis": "x",
                "yaxis": "y",
            })
        })
        .collect()
}

fn layout(tree: &Tree, geometry: &DendrogramGeometry, width: u32, height: u32) -> Value {
    let orientation = geometry.orientation;
    let mut leaf_axis = json!({"title": "Components"});
    let mut distance_axis = json!({"title": "Distance"});
    if !geometry.leaf_labels.is_empty() {
        merge(
            &mut leaf_axis,
            json!({
                "tickvals": geometry.tick_values,
                "ticktext": geometry.leaf_labels,
                "tickmode": "array",
            }),
        );
    }
    merge(&mut leaf_axis, axis_defaults());
    merge(&mut distance_axis, axis_defaults());

    let (xaxis, yaxis) = if orientation.leaves_on_x() {
        (leaf_axis, distance_axis)
    } else {
        (distance_axis, leaf_axis)
    };

    let longest_label = geometry
        .leaf_labels
        .iter()
        .map(|label| label.chars().count())
        .max()
        .unwrap_or_default();
    let margin_side = &orientation.name()[..1];

    json!({
        "title": format!(
            "Component clusters. method = {}, cutoff = {}, threshold = {}",
            tree.metric(),
            tree.cutoff(),
            tree.bin_threshold()
        ),
        "xaxis": xaxis,
        "yaxis": yaxis,
        "showlegend": false,
        "autosize": false,
        "hovermode": "closest",
        "width": width,
        "height": height,
        "margin": {(margin_side): MARGIN_SCALE * (longest_label + 1)},
    })
}

/// The plotly figure of `tree` as `{"data": [...], "layout": {...}}`
pub fn figure(tree: &Tree, orientation: Orientation, width: u32, height: u32) -> Value {
    let geometry = tree.dendrogram(orientation);
    json!({
        "data": traces(tree, &geometry),
        "layout": layout(tree, &geometry, width, height),
    })
}

pub fn render_html(figure: &Value) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8" />
<title>Component clusters</title>
<script src="{PLOTLY_SRC}"></script>
</head>
<body>
<div id="dendrogram"></div>
<script>
const figure = {figure};
Plotly.newPlot("dendrogram", figure.data, figure.layout);
</script>
</body>
</html>
"#
    )
}

/// Write the dendrogram of `tree` as a standalone HTML page
pub fn write_dendrogram(
    path: &Path,
    tree: &Tree,
    orientation: Orientation,
    width: u32,
    height: u32,
) -> Result<(), BioDendroError> {
    let figure = figure(tree, orientation, width, height);
    fs::write(path, render_html(&figure)).map_err(BioDendroError::write_failed(path))
}
