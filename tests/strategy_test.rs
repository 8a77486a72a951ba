#[cfg(test)]
mod strategy_tests {
    use onenas::config::Config;
    use onenas::genome::backprop::TimeSeries;
    use onenas::node::CellKind;
    use onenas::scheduler::EpisodeStore;
    use onenas::strategy::island_speciation::IslandSpeciation;
    use onenas::strategy::onenas::OnlineController;
    use onenas::strategy::reporter::Noop;
    use onenas::weight_update::Sgd;
    use onenas::GenerationalController;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn linear_series(len: usize, slope: f64) -> TimeSeries {
        TimeSeries {
            inputs: (0..len).map(|t| vec![t as f64 * 0.1]).collect(),
            outputs: (0..len).map(|t| vec![t as f64 * slope]).collect(),
        }
    }

    #[test]
    fn multi_generation_run_produces_a_global_best_with_finite_fitness() {
        let speciation =
            IslandSpeciation::new(3, 4, 4, CellKind::Simple, vec!["x".into()], vec!["y".into()]);
        let mut scheduler = EpisodeStore::new(40);
        scheduler.current_index = 8;
        let online = OnlineController::new(speciation, scheduler);
        let config = Config {
            num_training_sets: 3,
            num_validation_sets: 2,
            bp_iterations: 2,
            write_to_file: false,
            ..Config::default()
        };
        let mut controller = GenerationalController::new(online, config);
        let series: Vec<TimeSeries> = (0..40).map(|i| linear_series(6, 0.1 + i as f64 * 0.001)).collect();
        let mut optimizer = Sgd;
        let mut reporter = Noop;
        let mut rng = SmallRng::seed_from_u64(123);

        controller.run(10, &series, &mut optimizer, &mut reporter, &mut rng);

        assert_eq!(controller.current_generation(), 10);
        assert!(controller.best_generation() >= 1);
        let best = controller.online.global_best.as_ref().expect("a global best should exist after 10 generations");
        assert!(best.fitness.is_finite());
    }
}
