//! The fixed parameter blocks of the tutorial protocol.
//!
//! Each preset reproduces the settings of its stage; configuration overrides are
//! applied on top with [`MdpBlock::set`].

use super::MdpBlock;

/// Steepest-descent energy minimization with PME electrostatics and dispersion.
pub fn minimization() -> MdpBlock {
    MdpBlock::new()
        .param("integrator", "steep")
        .param("nsteps", 500)
        .param("coulombtype", "pme")
        .param("vdw-type", "pme")
}

/// 40 ps NPT equilibration at 300 K and 1 bar with all bonds constrained.
pub fn equilibration() -> MdpBlock {
    MdpBlock::new()
        .param("integrator", "md")
        .param("nsteps", 20000)
        .param("dt", "0.002")
        .param("nstenergy", 100)
        .param("rlist", "1.0")
        .param("nstlist", 10)
        .param("vdw-type", "pme")
        .param("rvdw", "1.0")
        .param("coulombtype", "pme")
        .param("rcoulomb", "1.0")
        .param("fourierspacing", "0.12")
        .param("constraints", "all-bonds")
        .param("tcoupl", "v-rescale")
        .param("tc-grps", "system")
        .param("tau-t", "0.2")
        .param("ref-t", 300)
        .param("pcoupl", "berendsen")
        .param("ref-p", 1)
        .param("compressibility", "4.5e-5")
        .param("tau-p", 5)
        .param("gen-vel", "yes")
        .param("gen-temp", 300)
}

/// Stochastic-dynamics production run for one lambda window.
///
/// `lambda_state` is the index of this window into `schedule` and ends up as
/// `init-lambda-state`. The molecule named by `couple_moltype` is decoupled from
/// the solvent, with intramolecular interactions kept at every lambda.
pub fn production(lambda_state: usize, schedule: &[f64], couple_moltype: &str) -> MdpBlock {
    MdpBlock::new()
        .comment("we'll use the sd integrator with 100000 time steps (200ps)")
        .param("integrator", "sd")
        .param("nsteps", 100000)
        .param("dt", "0.002")
        .param("nstenergy", 1000)
        .param("nstlog", 5000)
        .comment("cut-offs at 1.0nm")
        .param("rlist", "1.0")
        .param("dispcorr", "EnerPres")
        .param("vdw-type", "pme")
        .param("rvdw", "1.0")
        .comment("Coulomb interactions")
        .param("coulombtype", "pme")
        .param("rcoulomb", "1.0")
        .param("fourierspacing", "0.12")
        .comment("Constraints")
        .param("constraints", "all-bonds")
        .comment("set temperature to 300K")
        .param("tcoupl", "v-rescale")
        .param("tc-grps", "system")
        .param("tau-t", "0.2")
        .param("ref-t", 300)
        .comment("set pressure to 1 bar with a barostat that gives a correct")
        .comment("thermodynamic ensemble")
        .param("pcoupl", "parrinello-rahman")
        .param("ref-p", 1)
        .param("compressibility", "4.5e-5")
        .param("tau-p", 5)
        .blank()
        .comment("and set the free energy parameters")
        .param("free-energy", "yes")
        .param("couple-moltype", couple_moltype)
        .comment("these 'soft-core' parameters make sure we never get overlapping")
        .comment("charges as lambda goes to 0")
        .param("sc-power", 1)
        .param("sc-sigma", "0.3")
        .param("sc-alpha", "1.0")
        .comment("we still want the molecule to interact with itself at lambda=0")
        .param("couple-intramol", "no")
        .param("couple-lambda1", "vdwq")
        .param("couple-lambda0", "none")
        .param("init-lambda-state", lambda_state)
        .comment("These are the lambda states at which we simulate")
        .param("fep-lambdas", format_schedule(schedule))
}

pub fn format_schedule(schedule: &[f64]) -> String {
    schedule
        .iter()
        .map(|v| format!("{:?}", v))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEDULE: [f64; 7] = [0.0, 0.2, 0.4, 0.6, 0.8, 0.9, 1.0];

    #[test]
    fn minimization_preset_uses_steepest_descent() {
        let block = minimization();
        assert_eq!(block.get("integrator"), Some("steep"));
        assert_eq!(block.get("nsteps"), Some("500"));
        assert_eq!(block.get("coulombtype"), Some("pme"));
        assert_eq!(block.get("vdw-type"), Some("pme"));
    }

    #[test]
    fn equilibration_preset_couples_temperature_and_pressure() {
        let block = equilibration();
        assert_eq!(block.get("integrator"), Some("md"));
        assert_eq!(block.get("nsteps"), Some("20000"));
        assert_eq!(block.get("tcoupl"), Some("v-rescale"));
        assert_eq!(block.get("pcoupl"), Some("berendsen"));
        assert_eq!(block.get("constraints"), Some("all-bonds"));
        assert_eq!(block.get("gen-vel"), Some("yes"));
    }

    #[test]
    fn production_preset_embeds_lambda_state() {
        let block = production(4, &SCHEDULE, "ethanol");
        assert_eq!(block.get("integrator"), Some("sd"));
        assert_eq!(block.get("init-lambda-state"), Some("4"));
        assert_eq!(block.get("couple-moltype"), Some("ethanol"));
        assert_eq!(block.get("free-energy"), Some("yes"));
        assert_eq!(block.get("sc-alpha"), Some("1.0"));
    }

    #[test]
    fn production_preset_renders_schedule_with_decimal_points() {
        let block = production(0, &SCHEDULE, "ethanol");
        assert_eq!(
            block.get("fep-lambdas"),
            Some("0.0 0.2 0.4 0.6 0.8 0.9 1.0")
        );
    }

    #[test]
    fn production_blocks_for_different_windows_differ_only_in_state() {
        let first = production(0, &SCHEDULE, "ethanol");
        let second = production(1, &SCHEDULE, "ethanol");

        assert_ne!(first.render(), second.render());
        let differing: Vec<_> = first
            .parameters()
            .zip(second.parameters())
            .filter(|(a, b)| a != b)
            .map(|(a, _)| a.0)
            .collect();
        assert_eq!(differing, vec!["init-lambda-state"]);
    }

    #[test]
    fn production_render_contains_commented_sections() {
        let rendered = production(1, &SCHEDULE, "ethanol").render();
        assert!(rendered.starts_with("; we'll use the sd integrator"));
        assert!(rendered.contains("\n; and set the free energy parameters\n"));
        assert!(rendered.contains("init-lambda-state        = 1\n"));
    }
}
