use expdesign::analysis::block_anova;
use expdesign::construct::{
    BoxBehnken, CcdType, CentralComposite, CompletelyRandomized, FractionalFactorial,
    FullFactorial, RandomizedBlock,
};
use expdesign::{Factor, PointType, UnitPool};
use proptest::prelude::*;

fn factor_with_levels(idx: usize, n: usize) -> Factor {
    Factor::new(format!("F{idx}"), (0..n).map(|l| format!("L{l}"))).unwrap()
}

fn blocked_pool(blocks: usize, per_block: usize) -> UnitPool {
    let n = blocks * per_block;
    UnitPool::with_sequential_ids("unit", n)
        .with_categorical(
            "block",
            (0..n).map(|i| Some(format!("B{}", i / per_block))).collect(),
        )
        .unwrap()
}

proptest! {
    #[test]
    fn factorial_levels_are_balanced(
        levels in prop::collection::vec(1usize..5, 1..4),
        replications in 1usize..4,
        seed in any::<u64>(),
    ) {
        let factors: Vec<Factor> = levels
            .iter()
            .enumerate()
            .map(|(i, &n)| factor_with_levels(i, n))
            .collect();
        let product: usize = levels.iter().product();
        let table = FullFactorial::new(seed).create_design(factors, replications, true).unwrap();

        prop_assert_eq!(table.len(), product * replications);
        for (factor, &n) in table.factors().iter().zip(&levels) {
            let column = table.column(factor.name()).unwrap();
            for level in factor.levels() {
                let count = column.iter().filter(|l| **l == level).count();
                prop_assert_eq!(count, product / n * replications);
            }
        }
    }

    #[test]
    fn fractional_designs_have_resolution_three_or_better(
        k in 3usize..9,
        m in 2usize..8,
        seed in any::<u64>(),
    ) {
        prop_assume!(m < k);
        let run_count = 1usize << m;
        let table = FractionalFactorial::new(seed).create_design(k, run_count, None).unwrap();
        let summary = table.summary();

        prop_assert_eq!(table.len(), run_count);
        prop_assert!(summary.resolution.unwrap() >= 3);
        let aliases = summary.alias_structure.as_ref().unwrap();
        for name in table.factor_names() {
            prop_assert_eq!(aliases.get(name).unwrap()[0].as_str(), name);
        }
        // every column is a balanced ±1 column
        let m = table.numeric_matrix().unwrap();
        for col in m.columns() {
            prop_assert_eq!(col.sum(), 0.0);
        }
    }

    #[test]
    fn ccd_axial_rows_sit_on_one_axis(
        k in 2usize..7,
        center in 0usize..7,
        design in prop::sample::select(vec![CcdType::FaceCentered, CcdType::Rotatable, CcdType::Orthogonal]),
    ) {
        let table = CentralComposite::new(1).create_design(k, design, center, None).unwrap();
        let alpha = table.summary().alpha.unwrap();

        prop_assert_eq!(table.len(), (1 << k) + 2 * k + center);
        for run in table.runs().iter().filter(|r| r.point_type() == Some(PointType::Axial)) {
            prop_assert_eq!(run.nonzero_count(), 1);
            let value = run
                .levels()
                .iter()
                .filter_map(|l| l.as_f64())
                .find(|v| *v != 0.0)
                .unwrap();
            prop_assert!((value.abs() - alpha).abs() < 1e-12);
        }
    }

    #[test]
    fn box_behnken_rows_have_at_most_two_nonzero(k in 3usize..8, center in 0usize..5) {
        let table = BoxBehnken::new(1).create_design(k, center).unwrap();
        prop_assert_eq!(table.len(), 4 * k * (k - 1) / 2 + center);
        prop_assert!(table.runs().iter().all(|r| r.nonzero_count() <= 2));
    }

    #[test]
    fn block_anova_sums_of_squares_add_up(
        treatments in 2usize..5,
        blocks in 2usize..6,
        values in prop::collection::vec(-100.0f64..100.0, 30),
        seed in any::<u64>(),
    ) {
        let labels: Vec<String> = (0..treatments).map(|t| format!("T{t}")).collect();
        let pool = blocked_pool(blocks, treatments);
        let table = RandomizedBlock::new(seed)
            .create_design(&pool, &labels, "block", 1)
            .unwrap();
        let response = values[..table.len()].to_vec();
        let table = table.with_response("y", response).unwrap();

        let anova = block_anova(&table, "treatment", "y").unwrap();
        let residual = anova.ss_total
            - anova.treatment.sum_of_squares
            - anova.block.sum_of_squares
            - anova.error.sum_of_squares;
        prop_assert!(residual.abs() <= 1e-6 * anova.ss_total.max(1.0));
        prop_assert_eq!(anova.error.df, (treatments - 1) * (blocks - 1));
    }

    #[test]
    fn same_seed_same_allocation(seed in any::<u64>(), n in 3usize..60) {
        let pool = UnitPool::with_sequential_ids("id", n);
        let a = CompletelyRandomized::new(seed).create_design(&pool, &["A", "B", "C"], None).unwrap();
        let b = CompletelyRandomized::new(seed).create_design(&pool, &["A", "B", "C"], None).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn randomized_generators_ignore_other_instances(
        seed in any::<u64>(),
        other in any::<u64>(),
        k in 3usize..5,
    ) {
        prop_assume!(seed != other);
        let factors = || -> Vec<Factor> { (0..k).map(|i| factor_with_levels(i, 3)).collect() };

        let mut first = FullFactorial::new(seed);
        let mut interloper = FullFactorial::new(other);
        let mut second = FullFactorial::new(seed);
        let a = first.create_design(factors(), 2, true).unwrap();
        interloper.create_design(factors(), 2, true).unwrap();
        let b = second.create_design(factors(), 2, true).unwrap();
        prop_assert_eq!(a, b);

        let a = CentralComposite::new(seed).create_design(k, CcdType::Rotatable, 4, None).unwrap();
        CentralComposite::new(other).create_design(k, CcdType::Orthogonal, 2, None).unwrap();
        BoxBehnken::new(other).create_design(k, 1).unwrap();
        let b = CentralComposite::new(seed).create_design(k, CcdType::Rotatable, 4, None).unwrap();
        prop_assert_eq!(a, b);

        // created before, used after an unrelated generator ran
        let mut later = BoxBehnken::new(seed);
        let a = BoxBehnken::new(seed).create_design(k, 3).unwrap();
        FullFactorial::new(other).create_design(factors(), 1, true).unwrap();
        let b = later.create_design(k, 3).unwrap();
        prop_assert_eq!(a, b);
    }
}
