/*! Drawable dendrogram geometry for a [`LinkageTree`].

Each merge becomes a four point polyline shaped like an upside-down "U": two legs
rising from the merged sub-clusters joined by a bar at the merge distance. Leaves
are laid out ten units apart starting at five, in the tree's own left-to-right
traversal order so no lines cross.
*/
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;

use crate::linkage::LinkageTree;

/// Which side of the plot the leaves hang from
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Orientation {
    Top,
    #[default]
    Bottom,
    Left,
    Right,
}

impl Orientation {
    /// Whether the leaves are spread along the horizontal axis
    pub fn leaves_on_x(&self) -> bool {
        matches!(self, Self::Top | Self::Bottom)
    }

    /// The multipliers applied to the `(x, y)` plot coordinates
    pub fn signs(&self) -> (f64, f64) {
        let x = if matches!(self, Self::Left | Self::Bottom) {
            1.0
        } else {
            -1.0
        };
        let y = if matches!(self, Self::Right | Self::Bottom) {
            1.0
        } else {
            -1.0
        };
        (x, y)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

impl Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "top" => Ok(Self::Top),
            "bottom" => Ok(Self::Bottom),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            _ => Err(format!("Unknown orientation {s:?}")),
        }
    }
}

/// The color of a dendrogram link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkColor {
    Blue,
    Cyan,
    Green,
    Black,
    Magenta,
    Red,
    Yellow,
}

impl LinkColor {
    /// The cycle of colors given to sub-trees below the color threshold
    pub const PALETTE: [LinkColor; 6] = [
        LinkColor::Green,
        LinkColor::Red,
        LinkColor::Cyan,
        LinkColor::Magenta,
        LinkColor::Yellow,
        LinkColor::Black,
    ];

    /// The color shared by every link at or above the color threshold
    pub const ABOVE_THRESHOLD: LinkColor = LinkColor::Blue;

    pub const fn rgb(&self) -> &'static str {
        match self {
            Self::Blue => "rgb(0,116,217)",
            Self::Cyan => "rgb(35,205,205)",
            Self::Green => "rgb(61,153,112)",
            Self::Black => "rgb(40,35,35)",
            Self::Magenta => "rgb(133,20,75)",
            Self::Red => "rgb(255,65,54)",
            Self::Yellow => "rgb(255,220,0)",
        }
    }
}

/// Link coordinates in tree space, before orientation is applied
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DendrogramLayout {
    /// The leaf-axis coordinates of each link
    pub icoord: Vec<[f64; 4]>,
    /// The distance-axis coordinates of each link
    pub dcoord: Vec<[f64; 4]>,
    pub colors: Vec<LinkColor>,
    /// Leaf indices in left-to-right order
    pub leaves: Vec<usize>,
}

struct LayoutBuilder<'a> {
    tree: &'a LinkageTree,
    color_threshold: f64,
    current_color: usize,
    below_threshold: bool,
    layout: DendrogramLayout,
}

impl LayoutBuilder<'_> {
    /// Returns the center, width and height of the sub-tree rooted at `node`
    fn walk(&mut self, node: usize, offset: f64) -> (f64, f64, f64) {
        let Some(step) = self.tree.step(node).copied() else {
            self.layout.leaves.push(node);
            return (offset + 5.0, 10.0, 0.0);
        };

        let (left_center, left_width, left_height) = self.walk(step.left, offset);

        let height = step.distance;
        let color = if height >= self.color_threshold || self.color_threshold <= 0.0 {
            if self.below_threshold {
                self.current_color = (self.current_color + 1) % LinkColor::PALETTE.len();
            }
            self.below_threshold = false;
            LinkColor::ABOVE_THRESHOLD
        } else {
            self.below_threshold = true;
            LinkColor::PALETTE[self.current_color]
        };

        let (right_center, right_width, right_height) =
            self.walk(step.right, offset + left_width);

        self.layout
            .icoord
            .push([left_center, left_center, right_center, right_center]);
        self.layout
            .dcoord
            .push([left_height, height, height, right_height]);
        self.layout.colors.push(color);

        (
            (left_center + right_center) / 2.0,
            left_width + right_width,
            height,
        )
    }
}

impl DendrogramLayout {
    /// Lay out `tree`, coloring each sub-tree merged below `color_threshold`
    /// distinctly
    pub fn from_tree(tree: &LinkageTree, color_threshold: f64) -> Self {
        let mut builder = LayoutBuilder {
            tree,
            color_threshold,
            current_color: 0,
            below_threshold: false,
            layout: DendrogramLayout::default(),
        };
        if let Some(root) = tree.root() {
            builder.walk(root, 0.0);
        }
        builder.layout
    }

    /// The leaf-axis positions of the leaves, in order.
    ///
    /// These are read back as the distinct positions where a link touches zero
    /// distance. Three or more identical samples also put merge bars at zero, so
    /// when more such positions appear than there are leaves, the positions are
    /// instead regenerated as evenly spaced integers across the observed range.
    ///
    /// The trigger `positions > n_leaves` is the same test as `positions >
    /// merges + 1`, since a tree over `n_leaves` leaves has `n_leaves - 1` merges.
    pub fn leaf_positions(&self) -> Vec<f64> {
        let mut zero_positions: Vec<f64> = self
            .icoord
            .iter()
            .zip(self.dcoord.iter())
            .flat_map(|(xs, ys)| xs.iter().zip(ys.iter()))
            .filter(|(_, y)| **y == 0.0)
            .map(|(x, _)| *x)
            .collect();
        zero_positions.sort_by(f64::total_cmp);
        zero_positions.dedup();

        let n_leaves = self.leaves.len();
        if zero_positions.len() > n_leaves && n_leaves > 1 {
            let low = zero_positions[0].trunc();
            let high = zero_positions[zero_positions.len() - 1].trunc();
            let step = ((high - low) / (n_leaves - 1) as f64).trunc();
            (0..n_leaves).map(|i| low + step * i as f64).collect()
        } else {
            zero_positions
        }
    }
}

/// One oriented link, ready to draw
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub xs: [f64; 4],
    pub ys: [f64; 4],
    pub color: LinkColor,
}

/// The full drawable payload of a dendrogram
#[derive(Debug, Clone, PartialEq)]
pub struct DendrogramGeometry {
    pub orientation: Orientation,
    pub segments: Vec<Segment>,
    /// Leaf indices in left-to-right order
    pub leaves: Vec<usize>,
    /// The labels of `leaves`, in the same order
    pub leaf_labels: Vec<String>,
    /// The signed leaf-axis tick position of each entry in `leaf_labels`
    pub tick_values: Vec<f64>,
    /// `tick_values` bit patterns to their index in `leaf_labels`
    ticks: HashMap<u64, usize>,
}

/// -0.0 and 0.0 compare equal but differ in bits
fn position_key(position: f64) -> u64 {
    if position == 0.0 {
        0.0f64.to_bits()
    } else {
        position.to_bits()
    }
}

/// Convert `tree` into oriented link segments with leaf ordering and colors
pub fn extract(
    tree: &LinkageTree,
    labels: &[String],
    orientation: Orientation,
    color_threshold: f64,
) -> DendrogramGeometry {
    let layout = DendrogramLayout::from_tree(tree, color_threshold);
    let (sign_x, sign_y) = orientation.signs();

    let segments = layout
        .icoord
        .iter()
        .zip(layout.dcoord.iter())
        .zip(layout.colors.iter())
        .map(|((icoord, dcoord), color)| {
            let (xs, ys) = if orientation.leaves_on_x() {
                (*icoord, *dcoord)
            } else {
                (*dcoord, *icoord)
            };
            Segment {
                xs: xs.map(|x| x * sign_x),
                ys: ys.map(|y| y * sign_y),
                color: *color,
            }
        })
        .collect();

    let leaf_sign = if orientation.leaves_on_x() {
        sign_x
    } else {
        sign_y
    };
    let tick_values: Vec<f64> = layout
        .leaf_positions()
        .into_iter()
        .map(|x| x * leaf_sign)
        .collect();
    let mut ticks = HashMap::with_capacity(tick_values.len());
    for (i, v) in tick_values.iter().enumerate() {
        ticks.entry(position_key(*v)).or_insert(i);
    }
    let leaf_labels = layout
        .leaves
        .iter()
        .map(|i| labels.get(*i).cloned().unwrap_or_else(|| i.to_string()))
        .collect();

    DendrogramGeometry {
        orientation,
        segments,
        leaves: layout.leaves,
        leaf_labels,
        tick_values,
        ticks,
    }
}

impl DendrogramGeometry {
    /// The label of the leaf drawn at signed leaf-axis position `position`
    pub fn label_at(&self, position: f64) -> Option<&str> {
        self.ticks
            .get(&position_key(position))
            .and_then(|i| self.leaf_labels.get(*i))
            .map(String::as_str)
    }

    /// The leaf labels touched by the first and last point of `segment`, when
    /// that end sits at zero distance
    pub fn segment_ends<'a>(&'a self, segment: &Segment) -> [Option<&'a str>; 2] {
        let (leaf_axis, dist_axis) = if self.orientation.leaves_on_x() {
            (&segment.xs, &segment.ys)
        } else {
            (&segment.ys, &segment.xs)
        };
        [0, 3].map(|i| {
            if dist_axis[i] == 0.0 {
                self.label_at(leaf_axis[i])
            } else {
                None
            }
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::linkage::MergeStep;

    fn labels(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("s{i}")).collect()
    }

    fn five_point_tree() -> LinkageTree {
        LinkageTree::new(
            5,
            vec![
                MergeStep::new(0, 1, 1.0, 2),
                MergeStep::new(3, 4, 2.0, 2),
                MergeStep::new(2, 5, 4.0, 3),
                MergeStep::new(6, 7, 9.0, 5),
            ],
        )
    }

    #[test]
    fn test_layout() {
        let layout = DendrogramLayout::from_tree(&five_point_tree(), 3.0);
        assert_eq!(layout.leaves, [3, 4, 2, 0, 1]);
        assert_eq!(
            layout.icoord,
            [
                [5.0, 5.0, 15.0, 15.0],
                [35.0, 35.0, 45.0, 45.0],
                [25.0, 25.0, 40.0, 40.0],
                [10.0, 10.0, 32.5, 32.5],
            ]
        );
        assert_eq!(
            layout.dcoord,
            [
                [0.0, 2.0, 2.0, 0.0],
                [0.0, 1.0, 1.0, 0.0],
                [0.0, 4.0, 4.0, 1.0],
                [2.0, 9.0, 9.0, 4.0],
            ]
        );
        assert_eq!(
            layout.colors,
            [
                LinkColor::Green,
                LinkColor::Red,
                LinkColor::Blue,
                LinkColor::Blue
            ]
        );
        assert_eq!(layout.leaf_positions(), [5.0, 15.0, 25.0, 35.0, 45.0]);
    }

    #[test]
    fn test_threshold_zero_is_all_above() {
        let layout = DendrogramLayout::from_tree(&five_point_tree(), 0.0);
        assert!(layout.colors.iter().all(|c| *c == LinkColor::ABOVE_THRESHOLD));
    }

    #[test]
    fn test_extract_orientations() {
        let tree = five_point_tree();
        let geom = extract(&tree, &labels(5), Orientation::Bottom, 3.0);
        assert_eq!(geom.leaf_labels, ["s3", "s4", "s2", "s0", "s1"]);
        assert_eq!(geom.tick_values, [5.0, 15.0, 25.0, 35.0, 45.0]);
        assert_eq!(geom.segments[0].xs, [5.0, 5.0, 15.0, 15.0]);
        assert_eq!(geom.segments[0].ys, [0.0, 2.0, 2.0, 0.0]);

        let geom = extract(&tree, &labels(5), Orientation::Top, 3.0);
        assert_eq!(geom.segments[0].xs, [-5.0, -5.0, -15.0, -15.0]);
        assert_eq!(geom.segments[0].ys, [-0.0, -2.0, -2.0, -0.0]);
        assert_eq!(geom.tick_values[1], -15.0);

        let geom = extract(&tree, &labels(5), Orientation::Right, 3.0);
        assert_eq!(geom.segments[0].xs, [-0.0, -2.0, -2.0, -0.0]);
        assert_eq!(geom.segments[0].ys, [5.0, 5.0, 15.0, 15.0]);
        assert_eq!(geom.tick_values[0], 5.0);

        let geom = extract(&tree, &labels(5), Orientation::Left, 3.0);
        assert_eq!(geom.segments[0].xs, [0.0, 2.0, 2.0, 0.0]);
        assert_eq!(geom.tick_values[0], -5.0);
    }

    #[test]
    fn test_segment_ends() {
        let geom = extract(&five_point_tree(), &labels(5), Orientation::Bottom, 3.0);
        assert_eq!(geom.segment_ends(&geom.segments[0]), [Some("s3"), Some("s4")]);
        assert_eq!(geom.segment_ends(&geom.segments[2]), [Some("s2"), None]);
        assert_eq!(geom.segment_ends(&geom.segments[3]), [None, None]);
    }

    /// Seven tight pairs chained together above the color threshold
    fn seven_pair_tree() -> LinkageTree {
        let mut steps: Vec<MergeStep> = (0..7)
            .map(|k| MergeStep::new(2 * k, 2 * k + 1, 1.0, 2))
            .collect();
        steps.push(MergeStep::new(14, 15, 5.0, 4));
        for k in 0..5 {
            steps.push(MergeStep::new(21 + k, 16 + k, 6.0 + k as f64, 6 + 2 * k));
        }
        LinkageTree::new(14, steps)
    }

    #[test]
    fn test_palette_wraps() {
        let layout = DendrogramLayout::from_tree(&seven_pair_tree(), 3.0);
        let pair_colors: Vec<LinkColor> = layout
            .dcoord
            .iter()
            .zip(layout.colors.iter())
            .filter(|(d, _)| d[1] == 1.0)
            .map(|(_, c)| *c)
            .collect();
        assert_eq!(
            pair_colors,
            [
                LinkColor::Green,
                LinkColor::Red,
                LinkColor::Cyan,
                LinkColor::Magenta,
                LinkColor::Yellow,
                LinkColor::Black,
                LinkColor::Green,
            ]
        );
        assert_eq!(
            layout
                .colors
                .iter()
                .filter(|c| **c == LinkColor::ABOVE_THRESHOLD)
                .count(),
            6
        );
    }

    #[test]
    fn test_label_lookup() {
        let labels = labels(14);
        for orientation in [Orientation::Bottom, Orientation::Top, Orientation::Right] {
            let geom = extract(&seven_pair_tree(), &labels, orientation, 3.0);
            assert_eq!(geom.leaf_labels.len(), 14);
            for (v, label) in geom.tick_values.iter().zip(geom.leaf_labels.iter()) {
                assert_eq!(geom.label_at(*v), Some(label.as_str()));
            }
            assert_eq!(geom.label_at(1.0), None);
            let touching = geom
                .segments
                .iter()
                .flat_map(|s| geom.segment_ends(s))
                .flatten()
                .count();
            assert_eq!(touching, 14);
        }
    }

    #[test]
    fn test_identical_leaves_regenerate_positions() {
        // Three identical samples merge at zero, putting a bar at zero height
        let tree = LinkageTree::new(
            4,
            vec![
                MergeStep::new(0, 1, 0.0, 2),
                MergeStep::new(2, 4, 0.0, 3),
                MergeStep::new(3, 5, 1.0, 4),
            ],
        );
        let layout = DendrogramLayout::from_tree(&tree, 0.5);
        assert_eq!(layout.leaves, [3, 2, 0, 1]);
        assert_eq!(layout.leaf_positions(), [5.0, 15.0, 25.0, 35.0]);
    }
}
