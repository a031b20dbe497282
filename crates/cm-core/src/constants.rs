/// Default DBSCAN neighborhood radius on L2-normalized vectors.
/// Corresponds to a cosine similarity of roughly 0.595.
pub const DEFAULT_EPS: f64 = 0.9;

/// Default DBSCAN minimum neighborhood size (self included).
pub const DEFAULT_MIN_PTS: usize = 1;

/// Canvas height used to spread cluster slots vertically.
pub const CANVAS_HEIGHT: f64 = 800.0;

/// Canvas width, informational for renderers.
pub const CANVAS_WIDTH: f64 = 1200.0;

/// Fixed column for trigger nodes.
pub const TRIGGER_X: f64 = 200.0;

/// Fixed column for thought nodes.
pub const THOUGHT_X: f64 = 600.0;

/// Fixed column for response nodes.
pub const RESPONSE_X: f64 = 1000.0;

/// Vertical distance between stacked members of one cluster.
pub const NODE_SPACING: f64 = 40.0;

/// Extra height added to a cluster region beyond its members.
pub const REGION_PADDING: f64 = 60.0;

/// Horizontal extent of a cluster region around its column.
pub const REGION_WIDTH: f64 = 200.0;

/// Node circle radius.
pub const NODE_RADIUS: f64 = 15.0;

/// Label used when a record has no text for a family.
pub const PLACEHOLDER_LABEL: &str = "Unknown content";

/// Characters of a label shown on-canvas before truncation.
pub const LABEL_PREVIEW_CHARS: usize = 20;

/// Pastel palette cycled across clusters.
pub const DEFAULT_PALETTE: [&str; 8] = [
    "#ff7f7f", "#7fbfff", "#7fff7f", "#ff7fff", "#ffbf7f", "#7fffff", "#bf7fff", "#ffff7f",
];

/// Layout refiner: iteration budget (matches a d3 simulation's default cooling).
pub const REFINE_ITERATIONS: usize = 300;

/// Layout refiner: minimum vertical gap between nodes sharing a column.
pub const MIN_SEPARATION: f64 = 40.0;

/// Layout refiner: below this largest per-iteration move the layout is settled.
pub const REFINE_TOLERANCE: f64 = 1e-3;

/// Layout refiner: RNG seed for splitting coincident nodes.
pub const REFINE_SEED: u64 = 42;
