//! Parametric bar layout.
//!
//! Turns a list of bar heights into the ordered slot features the CAD kernel
//! cuts into the base model. The kernel receives a [`BuildPlan`] as JSON and
//! is responsible for the geometry; everything about *where* and *how big*
//! each bar is lives here.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Layout constants
// ---------------------------------------------------------------------------

/// X coordinate of the first bar's center.
pub const FIRST_BAR_X: f64 = 15.5;

/// Distance between consecutive bar centers along X.
pub const BAR_PITCH: f64 = 1.88;

/// Y coordinate shared by every bar center.
pub const BAR_CENTER_Y: f64 = 7.5;

/// Slot length per unit of bar height.
pub const SLOT_LENGTH_PER_HEIGHT: f64 = 9.0 / 5.0;

/// Slot width (thickness of a bar).
pub const SLOT_WIDTH: f64 = 1.0;

/// Slot rotation in degrees; bars stand upright.
pub const SLOT_ANGLE_DEG: f64 = 90.0;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One bar, as a sketch slot extruded onto the accumulated model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotFeature {
    /// 0-based position of the bar.
    pub index: usize,
    /// Sketch-plane center `[x, y]`.
    pub center: [f64; 2],
    /// Slot length (end to end).
    pub length: f64,
    /// Slot width.
    pub width: f64,
    /// Slot rotation in degrees.
    pub angle_deg: f64,
}

/// Everything the CAD kernel needs to produce one STL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildPlan {
    /// STEP file to load as the starting geometry.
    pub base_model: PathBuf,
    /// Where the kernel must write the exported STL.
    pub output: PathBuf,
    /// Extrusion depth applied to every slot.
    pub extrusion_height: f64,
    /// Slots in application order. Each composes onto the previous result.
    pub slots: Vec<SlotFeature>,
}

impl SlotFeature {
    /// Slot for bar `index` with the given height.
    pub fn for_bar(index: usize, height: f64) -> Self {
        Self {
            index,
            center: [FIRST_BAR_X + index as f64 * BAR_PITCH, BAR_CENTER_Y],
            length: SLOT_LENGTH_PER_HEIGHT * height,
            width: SLOT_WIDTH,
            angle_deg: SLOT_ANGLE_DEG,
        }
    }
}

/// Lay out one slot per bar height, preserving order.
pub fn layout_slots(bar_heights: &[f64]) -> Vec<SlotFeature> {
    bar_heights
        .iter()
        .enumerate()
        .map(|(index, &height)| SlotFeature::for_bar(index, height))
        .collect()
}
