#[cfg(test)]
mod population_tests {
    use onenas::genome::Genome;
    use onenas::node::CellKind;
    use onenas::Population;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn seeded(fitness: f64) -> Genome {
        let mut g = Genome::new_seed(vec!["x".into()], vec!["y".into()], CellKind::Simple);
        g.fitness = fitness;
        g
    }

    #[test]
    fn stays_sorted_and_caps_at_max_size_across_many_inserts() {
        let mut population = Population::new(3);
        for (extra_nodes, fitness) in [0.9, 0.1, 0.5, 0.05, 0.7].into_iter().enumerate() {
            let mut rng = SmallRng::seed_from_u64(extra_nodes as u64);
            let mut g = seeded(fitness);
            for _ in 0..extra_nodes {
                let _ = g.mutate_add_node(&mut rng, CellKind::Simple);
            }
            g.fitness = fitness;
            population.insert(g);
        }
        assert!(population.len() <= 3);
        let fitnesses: Vec<f64> = population.iter().map(|g| g.fitness).collect();
        let mut sorted = fitnesses.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(fitnesses, sorted);
        assert_eq!(population.best().unwrap().fitness, 0.05);
    }

    #[test]
    fn identical_structure_worse_fitness_does_not_displace_better_one() {
        let mut population = Population::new(5);
        let good = seeded(0.1);
        let mut bad = good.clone();
        bad.fitness = 0.9;
        population.insert(good);
        population.insert(bad);
        assert_eq!(population.len(), 1);
        assert_eq!(population.best().unwrap().fitness, 0.1);
    }
}
