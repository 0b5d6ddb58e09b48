use fepflow::engine::config::BoxShape;

pub struct DefaultsConfig {
    pub binary: String,
    pub mpi_ranks: u32,
    pub production_threads: u32,
    pub solute: String,
    pub topology: String,
    pub box_shape: BoxShape,
    pub padding_nm: f64,
    pub solvent: String,
    pub windows: usize,
    pub schedule: Vec<f64>,
    pub couple_moltype: String,
    pub parallel: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            binary: "gmx".to_string(),
            mpi_ranks: 1,
            production_threads: 1,
            solute: "ethanol.gro".to_string(),
            topology: "topol.top".to_string(),
            box_shape: BoxShape::Dodecahedron,
            padding_nm: 1.0,
            solvent: "spc216.gro".to_string(),
            windows: 2,
            schedule: vec![0.0, 0.2, 0.4, 0.6, 0.8, 0.9, 1.0],
            couple_moltype: "ethanol".to_string(),
            parallel: 1,
        }
    }
}
