/// Values used when neither the config file nor the command line sets them.
///
/// They describe CO on a Pt(111) slab: a 2x2 surface cell four layers deep
/// with the bottom two fixed, plane-wave PBE settings and a Γ-only gas box.
pub struct DefaultsConfig {
    pub element: String,
    pub facet: String,
    pub size: [usize; 3],
    pub vacuum: f64,
    pub fixed_layers: usize,
    pub adsorbate_species: Vec<String>,
    pub bond_length: f64,
    pub gas_box_size: f64,
    pub on_top_height: f64,
    pub bridge_height: f64,
    pub layer_tolerance: f64,
    pub min_height: f64,
    pub min_distance: f64,
    pub fmax: f64,
    pub max_steps: usize,
    pub max_step: f64,
    pub oracle_kind: String,
    pub method: String,
    pub xc: String,
    pub cutoff: f64,
    pub kpts: [u32; 3],
    pub gas_kpts: [u32; 3],
    pub smearing: f64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            element: "Pt".to_string(),
            facet: "fcc111".to_string(),
            size: [2, 2, 4],
            vacuum: 15.0,
            fixed_layers: 2,
            adsorbate_species: vec!["C".to_string(), "O".to_string()],
            bond_length: 1.15,
            gas_box_size: 15.0,
            on_top_height: 1.85,
            bridge_height: 2.4,
            layer_tolerance: 1e-3,
            min_height: 1.2,
            min_distance: 1.6,
            fmax: 0.05,
            max_steps: 200,
            max_step: 0.2,
            oracle_kind: "morse".to_string(),
            method: "pw".to_string(),
            xc: "PBE".to_string(),
            cutoff: 400.0,
            kpts: [4, 4, 1],
            gas_kpts: [1, 1, 1],
            smearing: 0.1,
        }
    }
}
