use super::{Assembler, BlockProblem, Essential, FemSpace, FieldSet, FileIo, MeshTags, ResultsSeries, SolverNewton};
use crate::base::{Config, CONSISTENCY_TOL_DF, CONSISTENCY_TOL_F};
use crate::expr::{ExprArena, ExprId, Form, Measure};
use crate::material::J2Model;
use crate::StrError;
use russell_lab::Vector;

/// Holds the sequence of load factors
#[derive(Clone, Debug, PartialEq)]
pub struct LoadSchedule {
    pub factors: Vec<f64>,
}

impl LoadSchedule {
    /// Allocates a new instance with the given factors
    pub fn new(factors: &[f64]) -> Result<Self, StrError> {
        if factors.is_empty() {
            return Err("load schedule must have at least one factor");
        }
        Ok(LoadSchedule {
            factors: factors.to_vec(),
        })
    }

    /// Allocates a monotonic loading from 0 to 1 in `k` steps (k + 1 factors)
    pub fn monotonic(k: usize) -> Result<Self, StrError> {
        if k < 1 {
            return Err("number of steps per phase must be at least one");
        }
        let load = Vector::linspace(0.0, 1.0, k + 1)?;
        LoadSchedule::new(load.as_data())
    }

    /// Allocates `z` cycles of loading, unloading, reversed loading, and reversed unloading
    ///
    /// Each phase has `k + 1` factors, thus the schedule has `4 (k + 1) z` factors.
    pub fn cyclic(k: usize, z: usize) -> Result<Self, StrError> {
        if k < 1 {
            return Err("number of steps per phase must be at least one");
        }
        if z < 1 {
            return Err("number of cycles must be at least one");
        }
        let load = Vector::linspace(0.0, 1.0, k + 1)?;
        let unload = Vector::linspace(1.0, 0.0, k + 1)?;
        let mut cycle = Vec::with_capacity(4 * (k + 1));
        cycle.extend(load.as_data());
        cycle.extend(unload.as_data());
        cycle.extend(load.as_data().iter().map(|x| -x));
        cycle.extend(unload.as_data().iter().map(|x| -x));
        let factors: Vec<_> = cycle.iter().copied().cycle().take(cycle.len() * z).collect();
        LoadSchedule::new(&factors)
    }

    /// Returns the number of steps
    pub fn len(&self) -> usize {
        self.factors.len()
    }
}

/// Drives the monolithic solution over a load schedule
///
/// For each load factor the driver rebuilds the boundary conditions, solves, records the
/// volume averages over the gauge region, checks the consistency of the plastic state,
/// writes the output, and commits the converged state to the shadow fields.
pub struct LoadStepDriver<'a> {
    config: &'a Config,
    tags: &'a MeshTags<'a>,
    model: &'a J2Model,
    assembler: Assembler<'a>,
    solver: SolverNewton<'a>,
    gauge: Measure,
    volume: f64,

    /// Holds the volume-averaged results of all converged steps
    pub results: ResultsSeries,
}

impl<'a> LoadStepDriver<'a> {
    /// Allocates a new instance
    ///
    /// The tags must contain the `domain_gauge` subdomain.
    pub fn new(
        config: &'a Config,
        arena: &'a ExprArena,
        fem: &'a FemSpace<'a>,
        tags: &'a MeshTags<'a>,
        model: &'a J2Model,
        problem: BlockProblem,
        fields: &FieldSet,
    ) -> Result<Self, StrError> {
        let gauge = tags.measure("domain_gauge")?;
        let volume = fem.volume(gauge);
        if volume <= 0.0 {
            return Err("gauge region must have a positive volume");
        }
        Ok(LoadStepDriver {
            config,
            tags,
            model,
            assembler: Assembler::new(arena, fem),
            solver: SolverNewton::new(config, arena, fem, fields, problem)?,
            gauge,
            volume,
            results: ResultsSeries::new(),
        })
    }

    /// Runs all load steps
    ///
    /// On error, the summary and the results obtained so far are written before returning.
    pub fn run(
        &mut self,
        schedule: &LoadSchedule,
        essential: &Essential,
        fields: &mut FieldSet,
        file_io: &mut FileIo,
    ) -> Result<(), StrError> {
        // helper macro to save the summary before returning an error
        macro_rules! run {
            ($e:expr) => {
                match $e {
                    Ok(val) => val,
                    Err(err) => {
                        match file_io.write_self() {
                            Ok(_) => (),
                            Err(e) => println!("ERROR-ON-ERROR: cannot write summary due to: {}", e),
                        }
                        match self.write_results(file_io) {
                            Ok(_) => (),
                            Err(e) => println!("ERROR-ON-ERROR: cannot write results due to: {}", e),
                        }
                        return Err(err);
                    }
                }
            };
        }

        let check = |ok: bool, msg: StrError| if ok { Ok(()) } else { Err(msg) };
        let j2 = self.model.fields;
        self.solver.control().print_header();
        for (step, factor) in schedule.factors.iter().enumerate() {
            self.solver.control().print_step(step, *factor);

            // boundary conditions
            let bcs = run!(essential.build(self.tags, fields, j2.u, *factor));
            run!(self.solver.set_bcs(&bcs));

            // solve
            let reason = run!(self.solver.solve(fields));
            if !reason.converged() && self.config.verbose_steps {
                println!("ERROR: converged reason = {:?} ({})", reason, reason.code());
            }
            run!(check(reason.converged(), "nonlinear solver did not converge"));

            // volume averages over the gauge region
            let strain = run!(self.average(fields, self.model.axial_strain));
            let stress = run!(self.average(fields, self.model.axial_stress));
            let plastic_strain = run!(self.average(fields, self.model.axial_plastic_strain));
            let hardening = run!(self.average(fields, self.model.hardening));
            self.results.push(*factor, strain, stress, plastic_strain, hardening);

            // consistency checks
            let dlambda_df = run!(self.average(fields, self.model.dlambda_df));
            let dlambda_f = run!(self.average(fields, self.model.dlambda_f));
            run!(check(
                dlambda_df < CONSISTENCY_TOL_DF,
                "consistency check failed: avg(dλ·df) is not zero"
            ));
            run!(check(
                dlambda_f < CONSISTENCY_TOL_F,
                "consistency check failed: avg(dλ·f) is not zero"
            ));

            // output: u, then the cell averages of P, B, S, h
            run!(file_io.write_field("u", fields.get(j2.u), step, *factor));
            let projections = [
                ("P", self.model.plastic_strain, j2.pp_cell),
                ("B", self.model.back_stress, j2.bb_cell),
                ("S", self.model.stress, j2.ss_cell),
                ("h", self.model.hardening, j2.h_cell),
            ];
            for (name, expr, target) in projections {
                run!(self.assembler.project_cell_average(fields, expr, target));
                run!(file_io.write_field(name, fields.get(target), step, *factor));
            }

            // shadow state
            run!(self.commit(fields));
        }
        self.solver.control().print_footer();
        file_io.write_self()?;
        self.write_results(file_io)
    }

    /// Copies the converged state into the shadow fields
    ///
    /// The stress is interpolated into S0 and the primary fields u, P, h, B are copied
    /// into u0, P0, h0, B0 (followed by synchronization).
    pub fn commit(&self, fields: &mut FieldSet) -> Result<(), StrError> {
        let j2 = self.model.fields;
        self.assembler.interpolate(fields, self.model.stress, j2.ss0)?;
        for (source, target) in j2.shadows() {
            fields.copy_values(source, target)?;
        }
        Ok(())
    }

    /// Returns the volume average of a scalar expression over the gauge region
    pub fn average(&self, fields: &FieldSet, expr: ExprId) -> Result<f64, StrError> {
        let form = Form {
            integrand: expr,
            measure: self.gauge,
        };
        Ok(self.assembler.functional(fields, &form)? / self.volume)
    }

    fn write_results(&self, file_io: &FileIo) -> Result<(), StrError> {
        if file_io.enabled() {
            self.results.write_json(&file_io.path_results())?;
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{LoadSchedule, LoadStepDriver};
    use crate::base::{Config, ParamJ2, SampleMeshes, Specimen};
    use crate::expr::ExprArena;
    use crate::fem::{Dof, Essential, FemSpace, FieldSet, FileIo, MeshTags};
    use crate::material::{FlowRule, J2Fields, J2Model};
    use russell_lab::approx_eq;

    #[test]
    fn load_schedule_works() {
        assert_eq!(LoadSchedule::new(&[]).err(), Some("load schedule must have at least one factor"));
        assert_eq!(
            LoadSchedule::monotonic(0).err(),
            Some("number of steps per phase must be at least one")
        );
        assert_eq!(LoadSchedule::cyclic(2, 0).err(), Some("number of cycles must be at least one"));

        let monotonic = LoadSchedule::monotonic(4).unwrap();
        assert_eq!(monotonic.factors, &[0.0, 0.25, 0.5, 0.75, 1.0]);

        let cyclic = LoadSchedule::cyclic(2, 2).unwrap();
        assert_eq!(cyclic.len(), 4 * 3 * 2);
        let one_cycle = [
            0.0, 0.5, 1.0, 1.0, 0.5, 0.0, -0.0, -0.5, -1.0, -1.0, -0.5, -0.0,
        ];
        assert_eq!(&cyclic.factors[0..12], &one_cycle);
        assert_eq!(&cyclic.factors[12..24], &one_cycle);
    }

    #[test]
    fn new_captures_errors() {
        let mesh = SampleMeshes::one_tet4();
        let fem = FemSpace::new(&mesh, Some(1)).unwrap();
        let mut fields = FieldSet::new();
        let j2 = J2Fields::new(&fem, &mut fields).unwrap();
        let mut arena = ExprArena::new();
        let model = J2Model::new(&mut arena, &fields, &j2, &ParamJ2::sample(), FlowRule::Associative).unwrap();
        let problem = model.block_problem(&mut arena, &fields).unwrap();
        let tags = MeshTags::new(&mesh);
        let config = Config::new();
        assert_eq!(
            LoadStepDriver::new(&config, &arena, &fem, &tags, &model, problem, &fields).err(),
            Some("cannot find subdomain with the given name")
        );
    }

    #[test]
    fn elastic_bar_works() {
        let specimen = Specimen {
            l0: 0.1,
            d0: 0.02,
            l_grip: 0.03,
            nx_gauge: 2,
            nx_grip: 1,
            n_section: 1,
        };
        let mesh = specimen.mesh().unwrap();
        let tags = specimen.tags(&mesh).unwrap();
        let fem = FemSpace::new(&mesh, Some(1)).unwrap();
        let mut fields = FieldSet::new();
        let j2 = J2Fields::new(&fem, &mut fields).unwrap();
        let mut arena = ExprArena::new();
        let param = ParamJ2::sample_elastic();
        let model = J2Model::new(&mut arena, &fields, &j2, &param, FlowRule::Associative).unwrap();
        let problem = model.block_problem(&mut arena, &fields).unwrap();
        let mut config = Config::new();
        config.set_verbose(false, false);

        // uniaxial stress with rollers
        let a = 0.001;
        let mut essential = Essential::new();
        essential
            .on("surface_grip_left", &[Dof::Ux], |_, lf| [-lf * a, 0.0, 0.0])
            .on("surface_grip_right", &[Dof::Ux], |_, lf| [lf * a, 0.0, 0.0])
            .on("surface_y_min", &[Dof::Uy], |_, _| [0.0; 3])
            .on("surface_z_min", &[Dof::Uz], |_, _| [0.0; 3]);
        let mut driver = LoadStepDriver::new(&config, &arena, &fem, &tags, &model, problem, &fields).unwrap();
        let mut file_io = FileIo::new();
        let schedule = LoadSchedule::monotonic(2).unwrap();
        driver.run(&schedule, &essential, &mut fields, &mut file_io).unwrap();

        assert_eq!(driver.results.len(), 3);
        assert_eq!(driver.results.load_factor, &[0.0, 0.5, 1.0]);
        approx_eq(driver.results.strain[0], 0.0, 1e-15);
        for i in 1..3 {
            let e = driver.results.strain[i];
            let stretch = 1.0 + 2.0 * a * schedule.factors[i] / specimen.length();
            approx_eq(e, 0.5 * (stretch * stretch - 1.0), 1e-10);
            approx_eq(driver.results.stress[i] / e, param.young(), 1e-8);
            approx_eq(driver.results.plastic_strain[i], 0.0, 1e-15);
        }

        // the shadow fields hold the last converged state
        assert_eq!(fields.get(j2.u0).values.all(), fields.get(j2.u).values.all());
        assert_eq!(fields.get(j2.h0).values.all(), fields.get(j2.h).values.all());
        let sxx_cell = fields.get(j2.ss_cell).values.owned()[0];
        let sxx_prev = fields.get(j2.ss0).values.owned()[0];
        approx_eq(sxx_cell, sxx_prev, 1e-10);
    }
}
