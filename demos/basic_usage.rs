//! Basic usage example for the expdesign library.
//!
//! This example walks through a screening fraction, a response-surface
//! follow-up and a blocked comparison of treatments.

use expdesign::analysis::{block_anova, block_effectiveness};
use expdesign::construct::{
    compare_rsm_designs, decode, AliasResolver, CcdType, CentralComposite, FractionalFactorial,
    RandomizedBlock,
};
use expdesign::{list_common_designs, GeneratorExpression, UnitPool};

fn main() {
    println!("expdesign - Basic Usage Example\n");

    // Screening: 5 factors in 8 runs
    println!("Constructing a 2^(5-2) fractional factorial...");
    let screening = FractionalFactorial::new(42)
        .with_randomization(false)
        .create_design(5, 8, None)
        .expect("Failed to construct fraction");

    let summary = screening.summary();
    println!("  Runs: {}", screening.len());
    println!("  Generators: {}", summary.generators.join(", "));
    println!("  Resolution: {:?}", summary.resolution);
    println!();
    println!("{screening}");

    if let Some(aliases) = &summary.alias_structure {
        println!("Alias structure (simplified):");
        print!("{aliases}");
    }

    let names: Vec<String> = screening.factor_names().iter().map(|s| s.to_string()).collect();
    let generators: Vec<GeneratorExpression> = summary
        .generators
        .iter()
        .map(|g| g.parse().expect("valid generator"))
        .collect();
    let resolver = AliasResolver::new(&names, 3, &generators).expect("valid generators");
    println!("Defining relation: I = {}", resolver.defining_relation().join(" = "));
    println!(
        "Exact aliases of AB: {}",
        resolver.aliases_of("AB").expect("known effect").join(", ")
    );
    println!();

    println!("Common designs: {}", list_common_designs().join(", "));
    println!();

    // Optimization: rotatable CCD in physical units
    println!("Constructing a rotatable CCD for 2 factors...");
    let ccd = CentralComposite::new(42)
        .with_factor_names(["Temperature", "Time"])
        .create_design(2, CcdType::Rotatable, 5, None)
        .expect("Failed to construct CCD");
    println!("  Alpha: {:.4}", ccd.summary().alpha.unwrap_or(1.0));

    let physical = decode(&ccd, &[("Temperature", 150.0, 200.0), ("Time", 10.0, 30.0)])
        .expect("Failed to decode");
    println!("{}", physical.in_standard_order());

    match compare_rsm_designs(3) {
        Ok(comparison) => {
            println!("RSM comparison for 3 factors:");
            println!("  CCD runs: {}", comparison.central_composite.total_runs);
            if let Some(bbd) = comparison.box_behnken {
                println!("  Box-Behnken runs: {}", bbd.total_runs);
            }
        }
        Err(err) => println!("  comparison failed: {err}"),
    }
    println!();

    // Blocked comparison: 3 treatments in 4 fields
    println!("Constructing an RBD over 4 fields...");
    let fields: Vec<Option<String>> = (0..12).map(|i| Some(format!("field-{}", i / 3))).collect();
    let pool = UnitPool::with_sequential_ids("plot", 12)
        .with_categorical("field", fields)
        .expect("Failed to build unit pool");
    let rbd = RandomizedBlock::new(42)
        .create_design(&pool, &["A", "B", "C"], "field", 1)
        .expect("Failed to construct RBD");

    // simulated yields: treatment effect plus a field effect
    let yields: Vec<f64> = rbd
        .runs()
        .iter()
        .map(|run| {
            let treatment = match run.levels()[0].to_string().as_str() {
                "A" => 10.0,
                "B" => 12.0,
                _ => 13.0,
            };
            let field = run.block().map_or(0.0, |b| if b.ends_with('0') { 3.0 } else { 0.5 });
            treatment + field + (run.std_order() % 2) as f64 * 0.3
        })
        .collect();
    let rbd = rbd.with_response("yield", yields).expect("Failed to attach response");

    let anova = block_anova(&rbd, "treatment", "yield").expect("Analysis failed");
    println!(
        "  Treatment: F = {:.3}, p = {:.4}",
        anova.treatment.f_statistic, anova.treatment.p_value
    );
    println!(
        "  Block:     F = {:.3}, p = {:.4}",
        anova.block.f_statistic, anova.block.p_value
    );
    println!("  Relative efficiency: {:.2}", anova.relative_efficiency);

    let effectiveness = block_effectiveness(&rbd, "yield").expect("Analysis failed");
    println!(
        "  ICC: {:.3} ({:?}), keep blocking: {}",
        effectiveness.icc, effectiveness.verdict, effectiveness.keep_blocking
    );
}
