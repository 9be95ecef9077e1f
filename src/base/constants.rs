/// Defines the directory where the simulation result files are saved
pub const DEFAULT_OUT_DIR: &str = "/tmp/plastsim/results";

/// Defines an auxiliary directory where the test result files are saved
pub const DEFAULT_TEST_DIR: &str = "/tmp/plastsim/test";

/// Defines the magnitude below which the square root of J2 is taken as exactly zero
pub const RJ2_THRESHOLD: f64 = 1e-12;

/// Defines the maximum allowed volume average of dλ·df after a converged step
pub const CONSISTENCY_TOL_DF: f64 = 1e-3;

/// Defines the maximum allowed volume average of dλ·f after a converged step
pub const CONSISTENCY_TOL_F: f64 = 1e-6;

/// Defines the smallest allowed tolerance (Config)
pub const CONFIG_MIN_TOL: f64 = 1e-15;

/// Defines the cell attribute of the grip regions of the specimen
pub const ATTRIBUTE_GRIP: usize = 1;

/// Defines the cell attribute of the gauge region of the specimen
pub const ATTRIBUTE_GAUGE: usize = 2;
