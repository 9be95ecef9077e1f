use super::{DistVector, FieldId, FieldSet};
use crate::StrError;
use std::collections::HashSet;

/// Defines how the values of several fields are packed into a buffer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferLayout {
    /// One vector per field
    Segmented,

    /// One vector; the owned entries of each field occupy consecutive ranges in the given order
    Flat,
}

/// Holds the values of several fields packed into a buffer
#[derive(Clone, Debug)]
pub enum BlockVector {
    Segmented(Vec<DistVector>),
    Flat(DistVector),
}

impl BlockVector {
    /// Allocates a buffer matching the given fields and copies their values into it
    ///
    /// For the flat layout, the ghost map is the concatenation of the ghost maps of
    /// the fields shifted by the owned offsets.
    pub fn from_fields(fields: &FieldSet, ids: &[FieldId], layout: BufferLayout) -> Result<Self, StrError> {
        field_sizes(fields, ids)?;
        let mut buffer = match layout {
            BufferLayout::Segmented => {
                let mut segments = Vec::with_capacity(ids.len());
                for id in ids {
                    let values = &fields.get(*id).values;
                    segments.push(DistVector::new(values.n_owned(), values.ghosts().to_vec())?);
                }
                BlockVector::Segmented(segments)
            }
            BufferLayout::Flat => {
                let mut offset = 0;
                let mut ghosts = Vec::new();
                for id in ids {
                    let values = &fields.get(*id).values;
                    ghosts.extend(values.ghosts().iter().map(|g| g + offset));
                    offset += values.n_owned();
                }
                BlockVector::Flat(DistVector::new(offset, ghosts)?)
            }
        };
        fields_to_buffer(fields, ids, &mut buffer)?;
        Ok(buffer)
    }

    /// Returns the layout
    pub fn layout(&self) -> BufferLayout {
        match self {
            BlockVector::Segmented(..) => BufferLayout::Segmented,
            BlockVector::Flat(..) => BufferLayout::Flat,
        }
    }

    /// Returns the total number of owned entries
    pub fn n_owned(&self) -> usize {
        match self {
            BlockVector::Segmented(segments) => segments.iter().map(|s| s.n_owned()).sum(),
            BlockVector::Flat(vector) => vector.n_owned(),
        }
    }

    /// Checks that the buffer can hold the owned values of fields with the given sizes
    fn check_sizes(&self, sizes: &[usize]) -> Result<(), StrError> {
        match self {
            BlockVector::Segmented(segments) => {
                if segments.len() != sizes.len() {
                    return Err("number of segments does not match the number of fields");
                }
                if segments.iter().zip(sizes).any(|(segment, n)| segment.n_owned() != *n) {
                    return Err("buffer size does not match the sum of field sizes");
                }
            }
            BlockVector::Flat(vector) => {
                if vector.n_owned() != sizes.iter().sum::<usize>() {
                    return Err("buffer size does not match the sum of field sizes");
                }
            }
        }
        Ok(())
    }
}

/// Copies the owned values of the fields into the buffer and synchronizes the buffer
///
/// Nothing is written if the ids or the sizes are inconsistent.
pub fn fields_to_buffer(fields: &FieldSet, ids: &[FieldId], buffer: &mut BlockVector) -> Result<(), StrError> {
    let sizes = field_sizes(fields, ids)?;
    buffer.check_sizes(&sizes)?;
    match buffer {
        BlockVector::Segmented(segments) => {
            for (segment, id) in segments.iter_mut().zip(ids) {
                segment.owned_mut().copy_from_slice(fields.get(*id).values.owned());
                segment.sync();
            }
        }
        BlockVector::Flat(vector) => {
            let mut offset = 0;
            for id in ids {
                let source = fields.get(*id).values.owned();
                vector.owned_mut()[offset..offset + source.len()].copy_from_slice(source);
                offset += source.len();
            }
            vector.sync();
        }
    }
    Ok(())
}

/// Copies the owned values of the buffer into the fields and synchronizes the fields
///
/// Nothing is written if the ids or the sizes are inconsistent.
pub fn buffer_to_fields(buffer: &BlockVector, fields: &mut FieldSet, ids: &[FieldId]) -> Result<(), StrError> {
    let sizes = field_sizes(fields, ids)?;
    buffer.check_sizes(&sizes)?;
    match buffer {
        BlockVector::Segmented(segments) => {
            for (segment, id) in segments.iter().zip(ids) {
                let target = fields.get_mut(*id);
                target.values.owned_mut().copy_from_slice(segment.owned());
                target.sync();
            }
        }
        BlockVector::Flat(vector) => {
            let mut offset = 0;
            for (id, n) in ids.iter().zip(&sizes) {
                let target = fields.get_mut(*id);
                target.values.owned_mut().copy_from_slice(&vector.owned()[offset..offset + n]);
                target.sync();
                offset += n;
            }
        }
    }
    Ok(())
}

/// Returns the number of owned values of each field after checking the ids
fn field_sizes(fields: &FieldSet, ids: &[FieldId]) -> Result<Vec<usize>, StrError> {
    check_unique(ids)?;
    ids.iter().map(|id| Ok(fields.try_get(*id)?.values.n_owned())).collect()
}

fn check_unique(ids: &[FieldId]) -> Result<(), StrError> {
    let set: HashSet<_> = ids.iter().collect();
    if set.len() != ids.len() {
        return Err("field ids must be unique");
    }
    Ok(())
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
