use chemisorb::core::energy::adsorption::AdsorptionEnergy;
use chemisorb::core::geometry::sites::SiteKind;
use chemisorb::workflows::inspect::InspectionReport;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Renders the adsorption energy table printed after `run` and `energies`.
pub fn energy_table(
    energies: &BTreeMap<SiteKind, AdsorptionEnergy>,
    best_site: Option<SiteKind>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "  {:<8} {:>12} {:>14} {:>14} {:>12}",
        "Site", "E_ads (eV)", "E_complex", "E_slab", "E_gas"
    );
    for (kind, energy) in energies {
        let marker = if Some(*kind) == best_site { " *" } else { "" };
        let status = if energy.converged { "" } else { " (not converged)" };
        let _ = writeln!(
            out,
            "  {:<8} {:>12.4} {:>14.4} {:>14.4} {:>12.4}{}{}",
            kind.as_str(),
            energy.value,
            energy.complex,
            energy.bare,
            energy.gas,
            status,
            marker
        );
    }
    out
}

pub fn print_energies(
    energies: &BTreeMap<SiteKind, AdsorptionEnergy>,
    best_site: Option<SiteKind>,
    endothermic: &[SiteKind],
) {
    print!("{}", energy_table(energies, best_site));
    match best_site {
        Some(site) => println!(
            "✓ Most stable site: {} ({:.4} eV)",
            site,
            energies[&site].value
        ),
        None => println!("No site energies were computed."),
    }
    for site in endothermic {
        println!("⚠ Adsorption at the {} site is endothermic.", site);
    }
    for energy in energies.values().filter(|e| !e.converged) {
        println!(
            "⚠ The {} energy uses a relaxation that did not reach fmax.",
            energy.site
        );
    }
}

pub fn print_inspection(report: &InspectionReport) {
    println!("  Anchor atom:        #{}", report.anchor_index);
    println!("  Surface atoms:      {}", report.surface_atoms);
    println!("  Height:             {:.3} Å", report.height);
    println!(
        "  Closest approach:   {:.3} Å (surface atom #{})",
        report.min_distance, report.nearest_surface_atom
    );
    if report.accepted {
        println!("✓ Geometry passes the placement guard.");
    } else {
        println!("⚠ Geometry fails the placement guard.");
    }
}
