//! Heightfield to triangle mesh conversion.

use crate::colormap::{height_color, BASE_COLOR, NODATA_COLOR};
use crate::mesh::Mesh;
use crate::{MeshError, Result};
use ecuterra_common::{meters_per_degree_lon, METERS_PER_DEGREE};
use ecuterra_dem::ElevationGrid;
use tracing::{debug, info};

/// Base height below the lowest point, as a fraction of the relief.
const BASE_MARGIN: f64 = 0.10;

/// Options for [`MeshBuilder`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuildOptions {
    /// Multiplier on horizontal distances.
    pub horizontal_scale: f64,
    /// Multiplier on elevations (vertical exaggeration).
    pub vertical_scale: f64,
    /// Close the surface with a flat bottom and perimeter walls.
    pub add_base: bool,
    /// Bottom height in scaled units; derived from the relief when `None`.
    pub base_height: Option<f64>,
    /// Attach per-vertex colors.
    pub vertex_colors: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            horizontal_scale: 1.0,
            vertical_scale: 1.5,
            add_base: true,
            base_height: None,
            vertex_colors: true,
        }
    }
}

/// Converts elevation grids into triangle meshes.
#[derive(Debug, Clone, Default)]
pub struct MeshBuilder {
    options: BuildOptions,
}

impl MeshBuilder {
    /// Builder with the given options.
    pub fn new(options: BuildOptions) -> Self {
        Self { options }
    }

    /// Options in effect.
    pub fn options(&self) -> BuildOptions {
        self.options
    }

    /// Triangulate a grid, optionally closing it into a solid.
    ///
    /// The grid center becomes the origin. Nodata samples are raised to the
    /// lowest valid elevation so the surface has no holes.
    pub fn build(&self, grid: ElevationGrid) -> Result<Mesh> {
        let (rows, cols) = (grid.rows(), grid.cols());
        if rows < 2 || cols < 2 {
            return Err(MeshError::EmptyGrid(format!(
                "{}x{} grid needs at least 2 rows and 2 columns",
                rows, cols
            )));
        }
        let (min_elev, max_elev) = grid
            .min_max()
            .ok_or_else(|| MeshError::EmptyGrid("no valid elevation samples".into()))?;

        let opts = &self.options;
        let t = grid.transform();
        let center_lat = grid.bounds().center().lat;
        let sx = t.dx * meters_per_degree_lon(center_lat) * opts.horizontal_scale;
        let sy = t.dy * METERS_PER_DEGREE * opts.horizontal_scale;
        let half_c = (cols - 1) as f64 / 2.0;
        let half_r = (rows - 1) as f64 / 2.0;

        let n = rows * cols;
        let mut positions = Vec::with_capacity(if opts.add_base { 2 * n } else { n });
        let mut filled = Vec::with_capacity(n);
        for r in 0..rows {
            let y = (half_r - r as f64) * sy;
            for c in 0..cols {
                let x = (c as f64 - half_c) * sx;
                let (elev, void) = match grid.get(r, c) {
                    Some(v) => (v, false),
                    None => (min_elev, true),
                };
                positions.push([x, y, elev as f64 * opts.vertical_scale]);
                filled.push(void);
            }
        }

        let min_z = min_elev as f64 * opts.vertical_scale;
        let max_z = max_elev as f64 * opts.vertical_scale;

        let quads = (rows - 1) * (cols - 1);
        let perimeter = 2 * (rows - 1) + 2 * (cols - 1);
        let mut faces = Vec::with_capacity(if opts.add_base {
            4 * quads + 2 * perimeter
        } else {
            2 * quads
        });
        push_grid_faces(&mut faces, rows, cols, 0, false);

        let mut colors = opts.vertex_colors.then(|| {
            positions
                .iter()
                .zip(&filled)
                .map(|(p, &void)| if void { NODATA_COLOR } else { height_color(p[2], min_z, max_z) })
                .collect::<Vec<_>>()
        });

        if opts.add_base {
            let base = match opts.base_height {
                Some(h) if h >= min_z => {
                    return Err(MeshError::InvalidMesh(format!(
                        "base height {} is not below the lowest terrain point {}",
                        h, min_z
                    )))
                }
                Some(h) => h,
                None => min_z - BASE_MARGIN * (max_z - min_z).max(1.0),
            };

            let offset = n as u32;
            for i in 0..n {
                let [x, y, _] = positions[i];
                positions.push([x, y, base]);
            }
            push_grid_faces(&mut faces, rows, cols, offset, true);
            push_wall_faces(&mut faces, rows, cols, offset);
            if let Some(colors) = colors.as_mut() {
                colors.extend(std::iter::repeat(BASE_COLOR).take(n));
            }
            debug!(base, walls = 2 * perimeter, "Added base and walls");
        }

        let mut mesh = Mesh::new(positions, faces);
        mesh.colors = colors;
        mesh.compute_normals();

        info!(
            rows,
            cols,
            vertices = mesh.vertex_count(),
            faces = mesh.face_count(),
            solid = opts.add_base,
            "Built terrain mesh"
        );
        Ok(mesh)
    }
}

/// Two triangles per grid cell; `reversed` winds them downward.
fn push_grid_faces(faces: &mut Vec<[u32; 3]>, rows: usize, cols: usize, offset: u32, reversed: bool) {
    let cols32 = cols as u32;
    for r in 0..rows as u32 - 1 {
        for c in 0..cols32 - 1 {
            let v0 = offset + r * cols32 + c;
            let v1 = v0 + 1;
            let v2 = v0 + cols32;
            let v3 = v2 + 1;
            if reversed {
                faces.push([v0, v1, v2]);
                faces.push([v1, v3, v2]);
            } else {
                faces.push([v0, v2, v1]);
                faces.push([v1, v2, v3]);
            }
        }
    }
}

/// Grid indices around the rim, clockwise seen from above starting at the
/// north-west corner.
fn perimeter(rows: usize, cols: usize) -> Vec<u32> {
    let idx = |r: usize, c: usize| (r * cols + c) as u32;
    let mut ring = Vec::with_capacity(2 * (rows - 1) + 2 * (cols - 1));
    ring.extend((0..cols).map(|c| idx(0, c)));
    ring.extend((1..rows).map(|r| idx(r, cols - 1)));
    ring.extend((0..cols - 1).rev().map(|c| idx(rows - 1, c)));
    ring.extend((1..rows - 1).rev().map(|r| idx(r, 0)));
    ring
}

/// Outward-facing quads joining each rim edge to its copy on the base.
fn push_wall_faces(faces: &mut Vec<[u32; 3]>, rows: usize, cols: usize, offset: u32) {
    let ring = perimeter(rows, cols);
    for (k, &t0) in ring.iter().enumerate() {
        let t1 = ring[(k + 1) % ring.len()];
        let (b0, b1) = (t0 + offset, t1 + offset);
        faces.push([t0, t1, b0]);
        faces.push([t1, b1, b0]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ecuterra_dem::{GeoTransform, SRTM_VOID};

    fn grid(rows: usize, cols: usize, data: Vec<f32>) -> ElevationGrid {
        let transform = GeoTransform {
            origin_lon: -78.6,
            origin_lat: 0.0,
            dx: 0.001,
            dy: 0.001,
        };
        ElevationGrid::new(data, rows, cols, transform, SRTM_VOID).unwrap()
    }

    fn surface_only() -> MeshBuilder {
        MeshBuilder::new(BuildOptions {
            add_base: false,
            ..Default::default()
        })
    }

    #[test]
    fn test_perimeter_ring() {
        assert_eq!(perimeter(3, 3), vec![0, 1, 2, 5, 8, 7, 6, 3]);
        assert_eq!(perimeter(2, 2), vec![0, 1, 3, 2]);
    }

    #[test]
    fn test_surface_faces_point_up() {
        let mesh = surface_only().build(grid(3, 4, vec![100.0; 12])).unwrap();
        assert_eq!(mesh.face_count(), 2 * 2 * 3);
        for f in 0..mesh.face_count() {
            assert!(mesh.face_normal(f).unwrap()[2] > 0.99);
        }
    }

    #[test]
    fn test_centered_and_scaled() {
        let mesh = surface_only().build(grid(3, 3, vec![1000.0; 9])).unwrap();
        // Center sample sits at the origin with z = elevation * 1.5
        assert_relative_eq!(mesh.positions[4][0], 0.0);
        assert_relative_eq!(mesh.positions[4][1], 0.0);
        assert_relative_eq!(mesh.positions[4][2], 1500.0);
        // North-west corner: west and north of the origin
        let nw = mesh.positions[0];
        assert!(nw[0] < 0.0 && nw[1] > 0.0);
        assert_relative_eq!(nw[1], 111.32, epsilon = 1e-6);
    }

    #[test]
    fn test_nodata_filled_with_minimum() {
        let mesh = surface_only()
            .build(grid(2, 2, vec![500.0, SRTM_VOID, 300.0, 400.0]))
            .unwrap();
        assert_relative_eq!(mesh.positions[1][2], 450.0);
        assert_eq!(mesh.colors.as_ref().unwrap()[1], NODATA_COLOR);
    }

    #[test]
    fn test_empty_grids_rejected() {
        let err = surface_only().build(grid(1, 4, vec![1.0; 4]));
        assert!(matches!(err, Err(MeshError::EmptyGrid(_))));

        let err = surface_only().build(grid(2, 2, vec![SRTM_VOID; 4]));
        assert!(matches!(err, Err(MeshError::EmptyGrid(_))));
    }

    #[test]
    fn test_base_height_default_and_explicit() {
        let mesh = MeshBuilder::default()
            .build(grid(2, 2, vec![100.0, 200.0, 300.0, 400.0]))
            .unwrap();
        // Scaled relief is 150..600, base 45 below the minimum
        assert_relative_eq!(mesh.positions[4][2], 150.0 - 45.0);

        let flat = MeshBuilder::default().build(grid(2, 2, vec![10.0; 4])).unwrap();
        assert_relative_eq!(flat.positions[4][2], 15.0 - 0.1);

        let builder = MeshBuilder::new(BuildOptions {
            base_height: Some(-50.0),
            ..Default::default()
        });
        let mesh = builder.build(grid(2, 2, vec![10.0; 4])).unwrap();
        assert_relative_eq!(mesh.positions[7][2], -50.0);

        let builder = MeshBuilder::new(BuildOptions {
            base_height: Some(20.0),
            ..Default::default()
        });
        assert!(builder.build(grid(2, 2, vec![10.0; 4])).is_err());
    }

    #[test]
    fn test_base_colored_brown() {
        let mesh = MeshBuilder::default().build(grid(2, 3, vec![1.0; 6])).unwrap();
        let colors = mesh.colors.unwrap();
        assert_eq!(colors.len(), 12);
        assert!(colors[6..].iter().all(|c| *c == BASE_COLOR));
    }
}
