use plastsim::prelude::*;
use plastsim::util::save_stress_strain;
use structopt::StructOpt;

/// Command line options
#[derive(StructOpt, Debug)]
#[structopt(
    name = "plasticity_monolithic",
    about = "Runs the tension test of a 3D specimen with J2 plasticity (monolithic formulation)"
)]
struct Options {
    /// Number of load steps per loading phase
    #[structopt(long, default_value = "25")]
    steps: usize,

    /// Number of load cycles
    #[structopt(long, default_value = "2")]
    cycles: usize,

    /// Runs a monotonic loading with a huge yield stress
    #[structopt(long)]
    elastic: bool,

    /// Output directory
    #[structopt(long)]
    out_dir: Option<String>,

    /// Number of divisions along x in the gauge region
    #[structopt(long, default_value = "10")]
    ndiv: usize,

    /// Disables the convergence messages
    #[structopt(long)]
    quiet: bool,
}

fn main() -> Result<(), StrError> {
    // parse options
    let options = Options::from_args();
    let stem = "plasticity_monolithic";

    // mesh and tags
    let coarse = (options.ndiv / 5).max(1);
    let specimen = Specimen {
        nx_gauge: options.ndiv,
        nx_grip: coarse,
        n_section: coarse,
        ..Specimen::sample()
    };
    let mesh = specimen.mesh()?;
    let tags = specimen.tags(&mesh)?;

    // configuration
    let mut config = Config::new();
    config
        .set_option("snes_type", "newtonls")?
        .set_option("snes_linesearch_type", "basic")?
        .set_option("snes_atol", "1e-12")?
        .set_option("snes_rtol", "1e-9")?
        .set_option("snes_max_it", "12")?
        .set_option("ksp_type", "preonly")?
        .set_option("pc_type", "lu")?
        .set_option("pc_factor_mat_solver_type", "umfpack")?;
    config.set_verbose(!options.quiet, !options.quiet);

    // material parameters and loading
    let (param, schedule) = if options.elastic {
        (ParamJ2::sample_elastic(), LoadSchedule::monotonic(options.steps)?)
    } else {
        (ParamJ2::sample(), LoadSchedule::cyclic(options.steps, options.cycles)?)
    };

    // fields and weak form
    let fem = FemSpace::new(&mesh, config.ngauss)?;
    let mut fields = FieldSet::new();
    let j2 = J2Fields::new(&fem, &mut fields)?;
    let mut arena = ExprArena::new();
    let model = J2Model::new(&mut arena, &fields, &j2, &param, FlowRule::Associative)?;
    let problem = model.block_problem(&mut arena, &fields)?;

    // essential boundary conditions: the grips are pulled apart along x
    let amplitude = specimen.l0 * 0.01;
    let all = [Dof::Ux, Dof::Uy, Dof::Uz];
    let mut essential = Essential::new();
    essential
        .on("surface_grip_left", &all, |x, lf| [lf * amplitude * x[0].signum(), 0.0, 0.0])
        .on("surface_grip_right", &all, |x, lf| [lf * amplitude * x[0].signum(), 0.0, 0.0]);

    // run
    let mut file_io = FileIo::new_enabled(&mesh, stem, options.out_dir.as_deref())?;
    let mut driver = LoadStepDriver::new(&config, &arena, &fem, &tags, &model, problem, &fields)?;
    driver.run(&schedule, &essential, &mut fields, &mut file_io)?;

    // plot
    let path_figure = file_io.path_results().replace("-results.json", ".svg");
    save_stress_strain(&driver.results, &path_figure)?;

    // message
    let path_results = file_io.path_results();
    let thin_line = format!("{:─^1$}", "", path_results.len());
    println!("\n\n{}", thin_line);
    println!("Results series and stress-strain curve:");
    println!("{}", path_results);
    println!("{}", path_figure);
    println!("{}\n\n", thin_line);
    Ok(())
}
