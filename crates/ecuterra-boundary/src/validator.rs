//! Selection validation against the boundary and the area cap.

use crate::{BoundaryStore, SelectionError};
use ecuterra_common::{BoundingBox, GeoPoint};
use std::sync::Arc;
use tracing::debug;

/// Turns two clicked points into a bounding box the pipeline may process.
#[derive(Debug, Clone)]
pub struct SelectionValidator {
    boundary: Arc<BoundaryStore>,
}

impl SelectionValidator {
    /// Create a validator over a shared boundary.
    pub fn new(boundary: Arc<BoundaryStore>) -> Self {
        Self { boundary }
    }

    /// The boundary this validator checks against.
    pub fn boundary(&self) -> &Arc<BoundaryStore> {
        &self.boundary
    }

    /// Validate a selection.
    ///
    /// Checks run in order: degenerate box, containment of both points and
    /// the whole box, then area. A box whose area equals `max_area_km2`
    /// passes.
    pub fn validate(
        &self,
        p1: GeoPoint,
        p2: GeoPoint,
        max_area_km2: f64,
    ) -> Result<BoundingBox, SelectionError> {
        let bbox = BoundingBox::from_corners(p1, p2);
        if p1 == p2 || bbox.is_degenerate() {
            return Err(SelectionError::DegenerateSelection);
        }

        if !self.boundary.contains_point(p1)
            || !self.boundary.contains_point(p2)
            || !self.boundary.contains_box(&bbox)
        {
            debug!(%bbox, "Selection not contained in boundary");
            return Err(SelectionError::OutOfBounds);
        }

        let area_km2 = bbox.area_km2();
        if area_km2 > max_area_km2 {
            debug!(%bbox, area_km2, max_area_km2, "Selection exceeds area cap");
            return Err(SelectionError::AreaTooLarge {
                area_km2,
                max_km2: max_area_km2,
            });
        }

        debug!(%bbox, area_km2, "Selection accepted");
        Ok(bbox)
    }
}
