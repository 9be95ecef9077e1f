use plastsim::fem::Assembler;
use plastsim::prelude::*;

// Bending of a bar with cells yielding at different load steps
//
// TEST GOAL
//
// Verifies the Newton iterations when the plastic multiplier max(f, 0) selects different
// branches in different cells and the branches change between iterations and load steps.
// Every iteration refactorizes the same linear system; thus the sparsity pattern of the
// Jacobian must not depend on the branches.
//
// MESH
//
// Specimen with 4 divisions in the gauge region, one division in the grips, and 2
// divisions along y and z
//
// BOUNDARY CONDITIONS
//
// * Rotation of the end sections: ux = ∓λ·c·y and uy = 0 on the left and right grip faces
// * uz = 0 on the face z = -d0/2
//
// The axial strain 2cy/L varies linearly over the section. With one integration point per
// tetrahedron, the cells have centroids at |y| = d0/8, d0/4, and 3d0/8; at the last load
// step the strain at these points is about 0.8, 1.7, and 2.5 times the yield strain. Thus
// the plastic zone grows from the top and bottom faces and the cells close to the neutral
// axis stay elastic.
//
// CONFIGURATION AND PARAMETERS
//
// * Sample parameters (Sy = 0.3, μ = 100, λ = 10)
// * 8 monotonic load steps

const N_STEPS: usize = 8;

#[test]
fn test_mixed_yielding() -> Result<(), StrError> {
    // mesh
    let specimen = Specimen {
        nx_gauge: 4,
        nx_grip: 1,
        n_section: 2,
        ..Specimen::sample()
    };
    let mesh = specimen.mesh()?;
    let tags = specimen.tags(&mesh)?;
    let ncell = mesh.cells.len();

    // fields and weak form
    let param = ParamJ2::sample();
    let fem = FemSpace::new(&mesh, Some(1))?;
    let mut fields = FieldSet::new();
    let j2 = J2Fields::new(&fem, &mut fields)?;
    let multiplier_cell = fields.add(&fem, "dlambda", Rank::Scalar, Space::Cell)?;
    let mut arena = ExprArena::new();
    let model = J2Model::new(&mut arena, &fields, &j2, &param, FlowRule::Associative)?;
    let problem = model.block_problem(&mut arena, &fields)?;

    // essential boundary conditions
    let yield_strain = param.sy / param.young();
    let c = 2.5 * yield_strain * specimen.length() / (2.0 * 3.0 * specimen.d0 / 8.0);
    let mut essential = Essential::new();
    essential
        .on("surface_grip_left", &[Dof::Ux, Dof::Uy], |x, lf| [-lf * c * x[1], 0.0, 0.0])
        .on("surface_grip_right", &[Dof::Ux, Dof::Uy], |x, lf| [lf * c * x[1], 0.0, 0.0])
        .on("surface_z_min", &[Dof::Uz], |_, _| [0.0; 3]);

    // configuration
    let mut config = Config::new();
    config.set_verbose(false, false).set_n_max_iterations(25);

    // solver and helpers
    let mut solver = SolverNewton::new(&config, &arena, &fem, &fields, problem)?;
    let assembler = Assembler::new(&arena, &fem);

    // run
    let schedule = LoadSchedule::monotonic(N_STEPS)?;
    let mut n_factorizations = 0;
    let mut n_plastic = Vec::new();
    for factor in &schedule.factors[1..] {
        let bcs = essential.build(&tags, &fields, j2.u, *factor)?;
        solver.set_bcs(&bcs)?;
        let reason = solver.solve(&mut fields)?;
        assert!(reason.converged());
        assert_eq!(solver.status(), SolverStatus::Converged);
        n_factorizations += solver.n_iterations();

        // cells with a positive plastic multiplier
        assembler.project_cell_average(&mut fields, model.multiplier, multiplier_cell)?;
        let count = fields.get(multiplier_cell).values.owned().iter().filter(|v| **v > 0.0).count();
        n_plastic.push(count);

        // commit
        assembler.interpolate(&mut fields, model.stress, j2.ss0)?;
        for (source, target) in j2.shadows() {
            fields.copy_values(source, target)?;
        }
    }
    println!("number of plastic cells per step = {:?}", n_plastic);

    // many refactorizations of the same system
    assert!(n_factorizations > N_STEPS);

    // the first step is elastic and the plastic zone grows but never takes the whole bar
    assert_eq!(n_plastic[0], 0);
    let first = n_plastic.iter().position(|n| *n > 0).ok_or("the bar must yield")?;
    let last = n_plastic[N_STEPS - 1];
    assert!(last > n_plastic[first]);
    assert!(last < ncell);
    Ok(())
}
