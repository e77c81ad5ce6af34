//! Global constants for the annotator

/// Zoom step applied per wheel notch
pub const ZOOM_FACTOR: f32 = 1.1;

/// Maximum view scale (no minimum is enforced)
pub const MAX_SCALE: f32 = 10.0;

/// Below this scale, zooming out starts pulling the image toward the canvas center
pub const CENTER_BLEND_START_SCALE: f32 = 2.0;

/// Centering weight reached at scale 1.0
pub const MAX_CENTER_WEIGHT: f32 = 0.6;

/// Screen-space radius for hovering a prompt point
pub const POINT_HIT_RADIUS_PX: f32 = 30.0;

/// Mask value above which a hover hit test succeeds
pub const HIT_OCCUPANCY_THRESHOLD: f32 = 0.2;

/// Mask value above which a pixel counts as set for extents and contours
pub const MASK_THRESHOLD: f32 = 0.5;

/// Contour simplification tolerance as a fraction of the perimeter
pub const CONTOUR_EPSILON_RATIO: f64 = 0.001;

/// Contours with fewer points than this are not exported
pub const MIN_CONTOUR_POINTS: usize = 4;

/// Canvas size assumed before the first resize event
pub const DEFAULT_CANVAS_SIZE: (u32, u32) = (1000, 800);

/// Name of the class map written next to the label files
pub const CLASSES_FILENAME: &str = "classes.txt";

/// Suffix of the overlay preview written per image
pub const OVERLAY_SUFFIX: &str = "_segmented.png";

/// Opacity of committed masks in the overlay preview
pub const OVERLAY_ALPHA: f32 = 0.5;
