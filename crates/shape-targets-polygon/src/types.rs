use serde::{Deserialize, Serialize};

use crate::contour::Contour;
use crate::polygon::Polygon;
use crate::refine::RefineStatus;

/// Why a contour did not produce a polygon.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    /// Contour touches the image border.
    TouchesBorder,
    /// Bounding size below the minimum (pixels).
    TooSmall { size: usize },
    /// Fitted vertex count not among the allowed ones.
    SideCount { sides: usize },
    NotConvex,
    /// Weakest edge support below the threshold.
    WeakEdges { score: f32 },
}

/// Fate of one traced contour, reported with diagnostics enabled.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ContourOutcome {
    /// Index into [`PolygonDetectionResult::polygons`].
    Accepted { polygon: usize },
    Rejected(RejectReason),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectedPolygon {
    /// Refined, orientation-normalized polygon.
    pub polygon: Polygon,
    /// Index of the source contour in extraction order.
    pub contour_index: usize,
    /// Weakest edge support; `None` when edge scoring is disabled.
    pub edge_intensity: Option<f32>,
    pub refinement: RefineStatus,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PolygonDetectionResult {
    /// Accepted polygons in contour order.
    pub polygons: Vec<DetectedPolygon>,
    /// Every traced contour (diagnostics only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contours: Option<Vec<Contour>>,
    /// One entry per traced contour (diagnostics only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcomes: Option<Vec<ContourOutcome>>,
}

impl PolygonDetectionResult {
    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Plain polygons, without per-detection metadata.
    pub fn polygons(&self) -> impl Iterator<Item = &Polygon> + '_ {
        self.polygons.iter().map(|d| &d.polygon)
    }
}
