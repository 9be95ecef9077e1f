use crate::fem::ResultsSeries;
use crate::StrError;
use plotpy::{Curve, Plot};
use std::ffi::OsStr;

/// Draws the volume-averaged stress versus the volume-averaged strain
///
/// Returns the plot so that the caller may add curves or change the figure size before saving.
pub fn plot_stress_strain(series: &ResultsSeries) -> Result<Plot, StrError> {
    if series.len() < 2 {
        return Err("at least two results are needed to plot the stress-strain curve");
    }
    let mut curve = Curve::new();
    curve
        .set_label("$S-E$ curve")
        .set_line_color("#1f77b4")
        .set_line_width(1.0)
        .set_marker_style(".")
        .set_marker_size(4.0)
        .draw(&series.strain, &series.stress);
    let mut plot = Plot::new();
    plot.add(&curve)
        .set_title("Rate-independent plasticity: $J_2$, monolithic formulation, 3D")
        .grid_labels_legend(
            "volume-averaged strain $\\frac{1}{V}\\int n^T E n \\, dV$ [-]",
            "volume-averaged stress $\\frac{1}{V}\\int n^T S n \\, dV$",
        );
    Ok(plot)
}

/// Draws and saves the stress-strain curve
///
/// # Input
///
/// * `figure_path` -- may be a String, &str, or Path (the extension selects the format)
pub fn save_stress_strain<S>(series: &ResultsSeries, figure_path: &S) -> Result<(), StrError>
where
    S: AsRef<OsStr> + ?Sized,
{
    let mut plot = plot_stress_strain(series)?;
    plot.set_figure_size_points(600.0, 450.0).save(figure_path)
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
