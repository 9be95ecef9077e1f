use crate::StrError;
use russell_lab::Vector;

/// Holds a vector split into owned entries followed by ghost entries
///
/// Each ghost entry mirrors one owned entry (given by `ghosts[k]`) and is refreshed by [DistVector::sync].
/// With a single process the owner of a ghost is always a local entry.
#[derive(Clone, Debug)]
pub struct DistVector {
    values: Vector,
    n_owned: usize,
    ghosts: Vec<usize>,
}

impl DistVector {
    /// Allocates a new instance with all values equal to zero
    ///
    /// # Input
    ///
    /// * `n_owned` -- number of owned entries
    /// * `ghosts` -- (n_ghost) indices of the owned entries mirrored by the ghost entries
    pub fn new(n_owned: usize, ghosts: Vec<usize>) -> Result<Self, StrError> {
        if ghosts.iter().any(|g| *g >= n_owned) {
            return Err("ghost entry must refer to an owned entry");
        }
        Ok(DistVector {
            values: Vector::new(n_owned + ghosts.len()),
            n_owned,
            ghosts,
        })
    }

    /// Returns the number of owned entries
    pub fn n_owned(&self) -> usize {
        self.n_owned
    }

    /// Returns the number of ghost entries
    pub fn n_ghost(&self) -> usize {
        self.ghosts.len()
    }

    /// Returns the indices of the owned entries mirrored by the ghost entries
    pub fn ghosts(&self) -> &[usize] {
        &self.ghosts
    }

    /// Returns the owned entries
    pub fn owned(&self) -> &[f64] {
        &self.values.as_data()[..self.n_owned]
    }

    /// Returns the owned entries for modification
    ///
    /// Call [DistVector::sync] afterwards.
    pub fn owned_mut(&mut self) -> &mut [f64] {
        &mut self.values.as_mut_data()[..self.n_owned]
    }

    /// Returns all entries (owned then ghost)
    pub fn all(&self) -> &[f64] {
        self.values.as_data()
    }

    /// Copies the owned values into the ghost entries
    pub fn sync(&mut self) {
        let data = self.values.as_mut_data();
        for (k, owner) in self.ghosts.iter().enumerate() {
            data[self.n_owned + k] = data[*owner];
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
