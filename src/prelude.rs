//! Makes available common structures needed to run a simulation
//!
//! You may write `use plastsim::prelude::*` in your code and obtain
//! access to commonly used functionality.

pub use crate::base::{Config, LineSearch, ParamJ2, SampleMeshes, Specimen};
pub use crate::expr::{ExprArena, ExprId, Form, Measure, Shape, Value};
pub use crate::fem::{BcSet, Dof, Essential, FemSpace, Field, FieldId, FieldSet, FileIo, MeshTags};
pub use crate::fem::{BlockVector, BufferLayout, LoadSchedule, LoadStepDriver, Rank, ResultsSeries, Space};
pub use crate::fem::{ConvergedReason, SolverNewton, SolverStatus};
pub use crate::material::{FlowRule, J2Fields, J2Model};
pub use crate::StrError;
