use super::{ATTRIBUTE_GAUGE, ATTRIBUTE_GRIP};
use crate::fem::MeshTags;
use crate::StrError;
use gemlab::mesh::{Cell, Mesh, Point};
use gemlab::shapes::GeoKind;
use russell_tensor::{Mandel, Tensor2};
use serde::{Deserialize, Serialize};

/// Holds the dimensions and discretization of a prismatic tensile specimen
///
/// ```text
///            grip          gauge (l0)           grip
///       |---------|-------------------------|---------|
///       +---------+-------------------------+---------+  ↑
///  ←ū   |  (1)    |           (2)           |   (1)   |  d0   ū→
///       +---------+-------------------------+---------+  ↓
///     -L/2      -l0/2          0           l0/2      L/2
///
/// (#) indicates the cell attribute; the cross-section is a d0 × d0 square
/// ```
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct Specimen {
    /// Length of the gauge region
    pub l0: f64,

    /// Side length of the square cross-section
    pub d0: f64,

    /// Length of each grip region
    pub l_grip: f64,

    /// Number of divisions along x in the gauge region
    pub nx_gauge: usize,

    /// Number of divisions along x in each grip region
    pub nx_grip: usize,

    /// Number of divisions along y and z
    pub n_section: usize,
}

impl Specimen {
    /// Returns the sample specimen (lengths in m)
    pub fn sample() -> Self {
        Specimen {
            l0: 0.10,
            d0: 0.02,
            l_grip: 0.03,
            nx_gauge: 10,
            nx_grip: 2,
            n_section: 2,
        }
    }

    /// Returns the total length of the specimen
    pub fn length(&self) -> f64 {
        self.l0 + 2.0 * self.l_grip
    }

    /// Generates the mesh with Tet4 cells
    ///
    /// Each hexahedral block is split into six tetrahedra sharing the main diagonal.
    pub fn mesh(&self) -> Result<Mesh, StrError> {
        if self.l0 <= 0.0 || self.d0 <= 0.0 || self.l_grip <= 0.0 {
            return Err("specimen dimensions must be positive");
        }
        if self.nx_gauge < 1 || self.nx_grip < 1 || self.n_section < 1 {
            return Err("specimen divisions must be at least one");
        }

        // x coordinates
        let half = self.length() / 2.0;
        let mut xx = Vec::new();
        let dx_grip = self.l_grip / (self.nx_grip as f64);
        let dx_gauge = self.l0 / (self.nx_gauge as f64);
        for i in 0..self.nx_grip {
            xx.push(-half + (i as f64) * dx_grip);
        }
        for i in 0..self.nx_gauge {
            xx.push(-self.l0 / 2.0 + (i as f64) * dx_gauge);
        }
        for i in 0..self.nx_grip {
            xx.push(self.l0 / 2.0 + (i as f64) * dx_grip);
        }
        xx.push(half);

        // y and z coordinates
        let ns = self.n_section;
        let yy: Vec<_> = (0..=ns)
            .map(|j| -self.d0 / 2.0 + (j as f64) * self.d0 / (ns as f64))
            .collect();

        // points
        let nxp = xx.len();
        let nyp = yy.len();
        let index = |i: usize, j: usize, k: usize| i + nxp * (j + nyp * k);
        let mut points = Vec::with_capacity(nxp * nyp * nyp);
        for k in 0..nyp {
            for j in 0..nyp {
                for i in 0..nxp {
                    let id = index(i, j, k);
                    points.push(Point {
                        id,
                        marker: 0,
                        coords: vec![xx[i], yy[j], yy[k]],
                    });
                }
            }
        }

        // cells
        const PERMUTATIONS: [[usize; 3]; 6] = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];
        let mut cells = Vec::new();
        for k in 0..(nyp - 1) {
            for j in 0..(nyp - 1) {
                for i in 0..(nxp - 1) {
                    let xc = (xx[i] + xx[i + 1]) / 2.0;
                    let attribute = if f64::abs(xc) < self.l0 / 2.0 {
                        ATTRIBUTE_GAUGE
                    } else {
                        ATTRIBUTE_GRIP
                    };
                    for perm in &PERMUTATIONS {
                        // walk from corner 000 to corner 111 along the axes in `perm`
                        let mut ijk = [i, j, k];
                        let mut tet = vec![index(ijk[0], ijk[1], ijk[2])];
                        for axis in perm {
                            ijk[*axis] += 1;
                            tet.push(index(ijk[0], ijk[1], ijk[2]));
                        }
                        if signed_volume(&points, &tet)? < 0.0 {
                            tet.swap(1, 2);
                        }
                        cells.push(Cell {
                            id: cells.len(),
                            attribute,
                            kind: GeoKind::Tet4,
                            points: tet,
                        });
                    }
                }
            }
        }
        Ok(Mesh { ndim: 3, points, cells })
    }

    /// Returns the named subdomains and boundary surfaces of the specimen
    ///
    /// * `domain_gauge`, `domain_grip` -- cells by attribute
    /// * `surface_grip_left`, `surface_grip_right` -- the end faces at x = ∓L/2
    /// * `surface_y_min`, `surface_z_min` -- the lateral faces used to suppress rigid body motions
    pub fn tags<'a>(&self, mesh: &'a Mesh) -> Result<MeshTags<'a>, StrError> {
        let half = self.length() / 2.0;
        let mut tags = MeshTags::new(mesh);
        tags.add_subdomain("domain_gauge", ATTRIBUTE_GAUGE)?;
        tags.add_subdomain("domain_grip", ATTRIBUTE_GRIP)?;
        tags.add_surface_x("surface_grip_left", -half)?;
        tags.add_surface_x("surface_grip_right", half)?;
        tags.add_surface_y("surface_y_min", -self.d0 / 2.0)?;
        tags.add_surface_z("surface_z_min", -self.d0 / 2.0)?;
        Ok(tags)
    }
}

/// Returns six times the signed volume of a tetrahedron
fn signed_volume(points: &[Point], tet: &[usize]) -> Result<f64, StrError> {
    let x0 = &points[tet[0]].coords;
    let mut edges = [[0.0; 3]; 3];
    for r in 0..3 {
        let x = &points[tet[r + 1]].coords;
        for c in 0..3 {
            edges[r][c] = x[c] - x0[c];
        }
    }
    Ok(Tensor2::from_matrix(&edges, Mandel::General)?.determinant())
}

/// Holds small meshes for unit tests
pub struct SampleMeshes {}

impl SampleMeshes {
    /// Returns a mesh with a single tetrahedron
    ///
    /// ```text
    ///       z
    ///       3
    ///       |
    ///       |
    ///       0------2 y
    ///      /
    ///     1
    ///    x
    /// ```
    #[rustfmt::skip]
    pub fn one_tet4() -> Mesh {
        Mesh {
            ndim: 3,
            points: vec![
                Point { id: 0, marker: 0, coords: vec![0.0, 0.0, 0.0] },
                Point { id: 1, marker: 0, coords: vec![1.0, 0.0, 0.0] },
                Point { id: 2, marker: 0, coords: vec![0.0, 1.0, 0.0] },
                Point { id: 3, marker: 0, coords: vec![0.0, 0.0, 1.0] },
            ],
            cells: vec![
                Cell { id: 0, attribute: ATTRIBUTE_GAUGE, kind: GeoKind::Tet4, points: vec![0, 1, 2, 3] },
            ],
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
