//! Country outline loaded once and queried read-only.

use crate::BoundaryError;
use ecuterra_common::{BoundingBox, GeoPoint};
use geo::{BooleanOps, BoundingRect, Contains, Coord, Intersects, LineString, MultiPolygon, Point, Polygon, Rect};
use geojson::{GeoJson, Geometry, Value};
use std::path::Path;
use tracing::{debug, info};

/// Immutable boundary geometry used for containment checks.
///
/// Built once at startup and shared behind an `Arc`; every query takes
/// `&self` so concurrent readers need no locking.
#[derive(Debug, Clone)]
pub struct BoundaryStore {
    /// Union of all polygons in the source, in (lon, lat) coordinates.
    geometry: MultiPolygon<f64>,
    /// Envelope of `geometry`, checked before the exact test.
    envelope: Rect<f64>,
}

impl BoundaryStore {
    /// Load a boundary from a GeoJSON file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, BoundaryError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| BoundaryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let store = Self::from_geojson_str(&content)?;
        info!(path = %path.display(), polygons = store.geometry.0.len(), "Loaded boundary");
        Ok(store)
    }

    /// Parse a boundary from GeoJSON text.
    ///
    /// Accepts a FeatureCollection, a single Feature or a bare Geometry.
    /// Polygon and MultiPolygon members are unioned; other geometry types
    /// are ignored.
    pub fn from_geojson_str(content: &str) -> Result<Self, BoundaryError> {
        let geojson: GeoJson = content.parse()?;

        let geometries: Vec<Geometry> = match geojson {
            GeoJson::FeatureCollection(fc) => {
                fc.features.into_iter().filter_map(|f| f.geometry).collect()
            }
            GeoJson::Feature(f) => f.geometry.into_iter().collect(),
            GeoJson::Geometry(g) => vec![g],
        };

        let mut polygons = Vec::new();
        for geometry in &geometries {
            collect_polygons(&geometry.value, &mut polygons)?;
        }
        debug!(polygons = polygons.len(), "Parsed boundary polygons");

        Self::from_multipolygon(MultiPolygon::new(polygons))
    }

    /// Build a store from an existing multipolygon.
    ///
    /// Overlapping or touching members are merged so that a box spanning two
    /// adjacent regions counts as contained.
    pub fn from_multipolygon(geometry: MultiPolygon<f64>) -> Result<Self, BoundaryError> {
        let mut members = geometry.0.into_iter();
        let first = members.next().ok_or(BoundaryError::NoPolygons)?;
        let geometry = members.fold(MultiPolygon::new(vec![first]), |acc, polygon| {
            acc.union(&MultiPolygon::new(vec![polygon]))
        });
        let envelope = geometry.bounding_rect().ok_or(BoundaryError::NoPolygons)?;
        Ok(Self { geometry, envelope })
    }

    /// True if the point lies strictly inside the boundary.
    pub fn contains_point(&self, point: GeoPoint) -> bool {
        let p = Point::new(point.lon, point.lat);
        self.envelope.intersects(&p) && self.geometry.contains(&p)
    }

    /// True if the whole box lies inside the boundary.
    pub fn contains_box(&self, bbox: &BoundingBox) -> bool {
        let outer = self.bounds();
        if !outer.contains_box(bbox) {
            return false;
        }
        self.geometry.contains(&box_polygon(bbox))
    }

    /// True if the box overlaps the boundary at all.
    pub fn intersects_box(&self, bbox: &BoundingBox) -> bool {
        self.geometry.intersects(&box_polygon(bbox))
    }

    /// Envelope of the boundary as a bounding box.
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox {
            min_lat: self.envelope.min().y,
            min_lon: self.envelope.min().x,
            max_lat: self.envelope.max().y,
            max_lon: self.envelope.max().x,
        }
    }

    /// The underlying geometry.
    pub fn geometry(&self) -> &MultiPolygon<f64> {
        &self.geometry
    }
}

fn box_polygon(bbox: &BoundingBox) -> Polygon<f64> {
    Rect::new(
        Coord { x: bbox.min_lon, y: bbox.min_lat },
        Coord { x: bbox.max_lon, y: bbox.max_lat },
    )
    .to_polygon()
}

fn collect_polygons(value: &Value, out: &mut Vec<Polygon<f64>>) -> Result<(), BoundaryError> {
    match value {
        Value::Polygon(rings) => out.push(polygon_from_rings(rings)?),
        Value::MultiPolygon(polys) => {
            for rings in polys {
                out.push(polygon_from_rings(rings)?);
            }
        }
        Value::GeometryCollection(geoms) => {
            for g in geoms {
                collect_polygons(&g.value, out)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn polygon_from_rings(rings: &[Vec<Vec<f64>>]) -> Result<Polygon<f64>, BoundaryError> {
    let mut rings = rings.iter().map(|r| ring_from_positions(r));
    let exterior = rings
        .next()
        .ok_or_else(|| BoundaryError::MalformedRing("polygon without exterior ring".into()))??;
    let interiors = rings.collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn ring_from_positions(positions: &[Vec<f64>]) -> Result<LineString<f64>, BoundaryError> {
    if positions.len() < 4 {
        return Err(BoundaryError::MalformedRing(format!(
            "ring has {} positions, need at least 4",
            positions.len()
        )));
    }
    positions
        .iter()
        .map(|p| match p.as_slice() {
            [x, y, ..] => Ok(Coord { x: *x, y: *y }),
            _ => Err(BoundaryError::MalformedRing("position with fewer than 2 coordinates".into())),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(LineString::new)
}
