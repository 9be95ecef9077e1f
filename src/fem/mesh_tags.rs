use super::Rank;
use crate::expr::Measure;
use crate::StrError;
use gemlab::mesh::{At, Features, Mesh, PointId};
use gemlab::util::any_x;
use std::collections::HashMap;

/// Holds named subdomains (cell attributes) and named interfaces (boundary faces) of a mesh
pub struct MeshTags<'a> {
    /// The mesh
    pub mesh: &'a Mesh,

    /// Maps subdomain names to cell attributes
    subdomains: HashMap<String, usize>,

    /// Maps interface names to the sorted ids of the points on the tagged faces
    interfaces: HashMap<String, Vec<PointId>>,
}

impl<'a> MeshTags<'a> {
    /// Allocates a new instance without tags
    pub fn new(mesh: &'a Mesh) -> Self {
        MeshTags {
            mesh,
            subdomains: HashMap::new(),
            interfaces: HashMap::new(),
        }
    }

    /// Tags all cells with the given attribute
    pub fn add_subdomain(&mut self, name: &str, attribute: usize) -> Result<(), StrError> {
        if !self.mesh.cells.iter().any(|c| c.attribute == attribute) {
            return Err("there are no cells with the given attribute");
        }
        self.subdomains.insert(name.to_string(), attribute);
        Ok(())
    }

    /// Tags the boundary faces on the plane x = constant
    pub fn add_surface_x(&mut self, name: &str, x: f64) -> Result<(), StrError> {
        self.add_surface(name, At::X(x))
    }

    /// Tags the boundary faces on the plane y = constant
    pub fn add_surface_y(&mut self, name: &str, y: f64) -> Result<(), StrError> {
        self.add_surface(name, At::Y(y))
    }

    /// Tags the boundary faces on the plane z = constant
    pub fn add_surface_z(&mut self, name: &str, z: f64) -> Result<(), StrError> {
        self.add_surface(name, At::Z(z))
    }

    fn add_surface(&mut self, name: &str, at: At) -> Result<(), StrError> {
        let features = Features::new(self.mesh, false);
        let faces = features.search_faces(at, any_x)?;
        let mut points: Vec<_> = faces.iter().flat_map(|f| f.points.iter().copied()).collect();
        points.sort();
        points.dedup();
        self.interfaces.insert(name.to_string(), points);
        Ok(())
    }

    /// Returns the integration measure of a named subdomain
    pub fn measure(&self, name: &str) -> Result<Measure, StrError> {
        match self.subdomains.get(name) {
            Some(attribute) => Ok(Measure::Subdomain(*attribute)),
            None => Err("cannot find subdomain with the given name"),
        }
    }

    /// Returns the sorted ids of the points of a named interface
    pub fn points(&self, name: &str) -> Result<&[PointId], StrError> {
        match self.interfaces.get(name) {
            Some(points) => Ok(points),
            None => Err("cannot find interface with the given name"),
        }
    }

    /// Returns the sorted DOF numbers of a nodal field on a named interface
    ///
    /// `component` selects one component; None selects all of them.
    pub fn locate_dofs(&self, name: &str, rank: Rank, component: Option<usize>) -> Result<Vec<usize>, StrError> {
        let nc = rank.ncomp();
        if let Some(c) = component {
            if c >= nc {
                return Err("component is out of bounds");
            }
        }
        let points = self.points(name)?;
        let mut dofs = Vec::with_capacity(points.len() * nc);
        for point in points {
            match component {
                Some(c) => dofs.push(point * nc + c),
                None => dofs.extend((0..nc).map(|c| point * nc + c)),
            }
        }
        Ok(dofs)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
