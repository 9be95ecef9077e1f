use super::{Field, Rank, Space};
use crate::base::DEFAULT_OUT_DIR;
use crate::StrError;
use gemlab::mesh::Mesh;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

/// Holds the values of a field at one load step
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldSnapshot {
    /// Name of the field
    pub name: String,

    /// Index of the load step
    pub step: usize,

    /// Load factor of the step
    pub load_factor: f64,

    /// Rank of the field
    pub rank: Rank,

    /// Discretization space of the field
    pub space: Space,

    /// Owned values of the field
    pub values: Vec<f64>,
}

impl FieldSnapshot {
    /// Reads a JSON file containing this struct
    pub fn read_json<P>(full_path: &P) -> Result<Self, StrError>
    where
        P: AsRef<OsStr> + ?Sized,
    {
        let path = Path::new(full_path).to_path_buf();
        let file = File::open(path).map_err(|_| "cannot open file")?;
        let buffered = BufReader::new(file);
        let snapshot = serde_json::from_reader(buffered).map_err(|_| "cannot parse JSON file")?;
        Ok(snapshot)
    }
}

/// Assists in generating output files
///
/// Each call to [FileIo::write_field] writes `{stem}-{name}-{step:0>8}.json` and records
/// the (step, name) entry in the summary.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileIo {
    /// Holds a flag to enable/disable the file generation
    enabled: bool,

    /// Defines the output directory
    output_dir: String,

    /// Defines the filename stem
    filename_stem: String,

    /// Holds the (step, field name) of all written snapshots (in writing order)
    pub entries: Vec<(usize, String)>,

    /// Holds the load factor of each step with output
    pub load_factors: Vec<f64>,
}

impl FileIo {
    /// Allocates a new instance with deactivated generation of files
    pub fn new() -> Self {
        FileIo {
            enabled: false,
            output_dir: String::new(),
            filename_stem: String::new(),
            entries: Vec::new(),
            load_factors: Vec::new(),
        }
    }

    /// Allocates a new instance and writes the mesh
    ///
    /// # Input
    ///
    /// * `mesh` -- the mesh
    /// * `filename_stem` -- the last part of the filename without extension, e.g., "tension"
    /// * `output_directory` -- the directory to save the output files.
    ///   None means that the default directory will be used; see [DEFAULT_OUT_DIR]
    pub fn new_enabled(mesh: &Mesh, filename_stem: &str, output_directory: Option<&str>) -> Result<Self, StrError> {
        let out_dir = match output_directory {
            Some(d) => d,
            None => DEFAULT_OUT_DIR,
        };
        fs::create_dir_all(out_dir).map_err(|_| "cannot create output directory")?;
        let path = format!("{}/{}-mesh.json", out_dir, filename_stem);
        mesh.write_json(&path)?;
        Ok(FileIo {
            enabled: true,
            output_dir: out_dir.to_string(),
            filename_stem: filename_stem.to_string(),
            entries: Vec::new(),
            load_factors: Vec::new(),
        })
    }

    /// Returns true if the generation of files is enabled
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Generates the filename path for the mesh file
    pub fn path_mesh(&self) -> String {
        if self.enabled {
            format!("{}/{}-mesh.json", self.output_dir, self.filename_stem)
        } else {
            "".to_string()
        }
    }

    /// Generates the filename path for the summary file
    pub fn path_summary(&self) -> String {
        if self.enabled {
            format!("{}/{}-summary.json", self.output_dir, self.filename_stem)
        } else {
            "".to_string()
        }
    }

    /// Generates the filename path for the results series file
    pub fn path_results(&self) -> String {
        if self.enabled {
            format!("{}/{}-results.json", self.output_dir, self.filename_stem)
        } else {
            "".to_string()
        }
    }

    /// Generates the filename path for a field snapshot
    pub fn path_field(&self, name: &str, step: usize) -> String {
        if self.enabled {
            format!("{}/{}-{}-{:0>8}.json", self.output_dir, self.filename_stem, name, step)
        } else {
            "".to_string()
        }
    }

    /// Reads a JSON file containing this struct
    ///
    /// # Input
    ///
    /// * `full_path` -- may be a String, &str, or Path
    pub fn read_json<P>(full_path: &P) -> Result<Self, StrError>
    where
        P: AsRef<OsStr> + ?Sized,
    {
        let path = Path::new(full_path).to_path_buf();
        let file = File::open(path).map_err(|_| "cannot open file")?;
        let buffered = BufReader::new(file);
        let summary = serde_json::from_reader(buffered).map_err(|_| "cannot parse JSON file")?;
        Ok(summary)
    }

    /// Writes a JSON file with this struct
    ///
    /// # Input
    ///
    /// * `full_path` -- may be a String, &str, or Path
    pub fn write_json<P>(&self, full_path: &P) -> Result<(), StrError>
    where
        P: AsRef<OsStr> + ?Sized,
    {
        write_json(self, full_path)
    }

    /// Writes the owned values of a field at a load step under the given name
    ///
    /// **Note:** No output is generated if the instance is disabled.
    pub fn write_field(&mut self, name: &str, field: &Field, step: usize, load_factor: f64) -> Result<(), StrError> {
        if self.enabled {
            let snapshot = FieldSnapshot {
                name: name.to_string(),
                step,
                load_factor,
                rank: field.rank,
                space: field.space,
                values: field.values.owned().to_vec(),
            };
            write_json(&snapshot, &self.path_field(name, step))?;
            if self.load_factors.len() == step {
                self.load_factors.push(load_factor);
            }
            self.entries.push((step, name.to_string()));
        }
        Ok(())
    }

    /// Writes this struct to the summary file
    pub fn write_self(&self) -> Result<(), StrError> {
        if self.enabled {
            let path = self.path_summary();
            self.write_json(&path)?;
        }
        Ok(())
    }
}

/// Writes a serializable struct to a JSON file (creating the directory if needed)
pub(crate) fn write_json<T, P>(data: &T, full_path: &P) -> Result<(), StrError>
where
    T: Serialize,
    P: AsRef<OsStr> + ?Sized,
{
    let path = Path::new(full_path).to_path_buf();
    if let Some(p) = path.parent() {
        fs::create_dir_all(p).map_err(|_| "cannot create directory")?;
    }
    let mut file = File::create(&path).map_err(|_| "cannot create file")?;
    serde_json::to_writer(&mut file, data).map_err(|_| "cannot write file")?;
    Ok(())
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{FieldSnapshot, FileIo};
    use crate::base::{SampleMeshes, DEFAULT_TEST_DIR};
    use crate::fem::{FemSpace, FieldSet, Rank, Space};

    #[test]
    fn disabled_file_io_works() {
        let mut file_io = FileIo::new();
        assert!(!file_io.enabled());
        assert_eq!(file_io.path_mesh(), "");
        assert_eq!(file_io.path_summary(), "");
        assert_eq!(file_io.path_results(), "");
        assert_eq!(file_io.path_field("u", 0), "");
        let mesh = SampleMeshes::one_tet4();
        let fem = FemSpace::new(&mesh, Some(1)).unwrap();
        let mut fields = FieldSet::new();
        let u = fields.add(&fem, "u", Rank::Vector, Space::Nodal).unwrap();
        file_io.write_field("u", fields.get(u), 0, 0.0).unwrap();
        file_io.write_self().unwrap();
        assert_eq!(file_io.entries.len(), 0);
    }

    #[test]
    fn enabled_file_io_works() {
        let mesh = SampleMeshes::one_tet4();
        let fem = FemSpace::new(&mesh, Some(1)).unwrap();
        let mut fields = FieldSet::new();
        let u = fields.add(&fem, "u", Rank::Vector, Space::Nodal).unwrap();
        let h = fields.add(&fem, "h", Rank::Scalar, Space::Quadrature).unwrap();
        fields.get_mut(u).values.owned_mut()[3] = 0.5;

        let mut file_io = FileIo::new_enabled(&mesh, "test_file_io", Some(DEFAULT_TEST_DIR)).unwrap();
        assert_eq!(file_io.path_mesh(), "/tmp/plastsim/test/test_file_io-mesh.json");
        assert_eq!(
            file_io.path_field("u", 3),
            "/tmp/plastsim/test/test_file_io-u-00000003.json"
        );
        file_io.write_field("u", fields.get(u), 0, 0.25).unwrap();
        file_io.write_field("h", fields.get(h), 0, 0.25).unwrap();
        file_io.write_self().unwrap();
        assert_eq!(file_io.entries, &[(0, "u".to_string()), (0, "h".to_string())]);
        assert_eq!(file_io.load_factors, &[0.25]);

        let snapshot = FieldSnapshot::read_json(&file_io.path_field("u", 0)).unwrap();
        assert_eq!(snapshot.name, "u");
        assert_eq!(snapshot.rank, Rank::Vector);
        assert_eq!(snapshot.space, Space::Nodal);
        assert_eq!(snapshot.load_factor, 0.25);
        assert_eq!(snapshot.values[3], 0.5);

        let summary = FileIo::read_json(&file_io.path_summary()).unwrap();
        assert_eq!(summary.entries, file_io.entries);
        assert_eq!(FileIo::read_json("/tmp/not-found/plastsim.json").err(), Some("cannot open file"));
    }
}
