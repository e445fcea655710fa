//! # ecuterra-boundary
//!
//! Country boundary geometry and validation of rectangular selections.
//!
//! The [`BoundaryStore`] is loaded once from GeoJSON and shared read-only;
//! the [`SelectionValidator`] turns two corner points into a
//! [`BoundingBox`](ecuterra_common::BoundingBox) after checking that the box
//! is non-degenerate, fully inside the boundary and under the area cap.
//!
//! ```no_run
//! use std::sync::Arc;
//! use ecuterra_boundary::{BoundaryStore, SelectionValidator};
//! use ecuterra_common::GeoPoint;
//!
//! let store = Arc::new(BoundaryStore::from_path("data/ecuador_simplified.geojson")?);
//! let validator = SelectionValidator::new(store);
//! let bbox = validator.validate(
//!     GeoPoint::new(-0.20, -78.52)?,
//!     GeoPoint::new(-0.10, -78.42)?,
//!     2000.0,
//! )?;
//! println!("{} km²", bbox.area_km2());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod store;
mod validator;

pub use error::{BoundaryError, SelectionError};
pub use store::BoundaryStore;
pub use validator::SelectionValidator;
