#[cfg(test)]
mod island_tests {
    use onenas::genome::Genome;
    use onenas::island::{rank_for_extinction, Island, IslandStatus};
    use onenas::node::CellKind;

    fn seeded(fitness: f64) -> Genome {
        let mut g = Genome::new_seed(vec!["x".into()], vec!["y".into()], CellKind::Simple);
        g.fitness = fitness;
        g
    }

    #[test]
    fn fills_transitions_erases_and_recovers() {
        let mut island = Island::new(0, 2, 2);
        assert_eq!(island.status, IslandStatus::Initializing);
        island.insert_generated(seeded(0.5));
        assert_eq!(island.status, IslandStatus::Initializing);
        island.insert_elite(seeded(0.5));
        island.insert_elite(seeded(0.2));
        assert_eq!(island.status, IslandStatus::Filled);

        island.erase(false);
        assert_eq!(island.status, IslandStatus::Repopulating);
        assert!(!island.can_be_erased_again());

        island.decay_cooldown();
        assert!(island.can_be_erased_again());

        island.insert_elite(seeded(0.1));
        island.insert_elite(seeded(0.3));
        assert_eq!(island.status, IslandStatus::Filled);
    }

    #[test]
    fn extinction_ranking_over_three_islands_picks_worst_first() {
        let mut islands = vec![
            Island::new(0, 4, 4),
            Island::new(1, 4, 4),
            Island::new(2, 4, 4),
        ];
        islands[0].insert_elite(seeded(3.0));
        islands[1].insert_elite(seeded(1.0));
        islands[2].insert_elite(seeded(2.0));

        let ranked = rank_for_extinction(&islands, 2);
        assert_eq!(ranked, vec![0, 2]);
    }
}
