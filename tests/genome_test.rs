#[cfg(test)]
mod genome_tests {
    use onenas::genome::Genome;
    use onenas::node::CellKind;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn mutation_then_serialization_round_trips() {
        let mut rng = SmallRng::seed_from_u64(42);
        let mut genome = Genome::new_seed(
            vec!["in_a".into(), "in_b".into()],
            vec!["out".into()],
            CellKind::Simple,
        );
        for _ in 0..5 {
            let _ = genome.mutate_add_node(&mut rng, CellKind::Simple);
        }
        assert!(!genome.outputs_unreachable());

        let original_hash = genome.structural_hash();
        let bytes = genome.to_bytes();
        let restored = Genome::from_bytes(&bytes).unwrap();
        assert_eq!(restored.structural_hash(), original_hash);
        assert!(!restored.outputs_unreachable());
    }

    #[test]
    fn crossover_of_mutated_parents_keeps_reachable_outputs() {
        let mut rng = SmallRng::seed_from_u64(7);
        let mut a = Genome::new_seed(vec!["x".into()], vec!["y".into()], CellKind::Simple);
        let mut b = a.clone();
        let _ = a.mutate_add_node(&mut rng, CellKind::Simple);
        let _ = b.mutate_add_edge(&mut rng);
        a.fitness = 0.1;
        b.fitness = 0.2;

        let child = onenas::genome::crossover::crossover(&b, &a, &mut rng);
        assert!(!child.outputs_unreachable());
    }
}
