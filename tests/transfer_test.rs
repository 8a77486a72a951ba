#[cfg(test)]
mod transfer_tests {
    use onenas::config::TransferLearningVersion;
    use onenas::genome::Genome;
    use onenas::node::{CellKind, LayerType};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn v1_keeps_shared_input_drops_unmatched_and_stays_reachable() {
        let mut rng = SmallRng::seed_from_u64(5);
        let mut genome = Genome::new_seed(
            vec!["shared".into(), "dropped".into()],
            vec!["out".into()],
            CellKind::Simple,
        );
        genome.set_weights(&vec![0.42; genome.get_number_weights()]);

        genome.rewrite_schema(
            &["shared".into(), "new_input".into()],
            &["out".into()],
            TransferLearningVersion::V1,
            false,
            CellKind::Simple,
            &mut rng,
        );

        assert!(!genome.outputs_unreachable());
        assert_eq!(genome.input_parameter_names, vec!["shared", "new_input"]);
        let input_names: Vec<&str> = genome
            .nodes
            .iter()
            .filter(|n| matches!(n.layer_type, LayerType::Input))
            .filter_map(|n| n.parameter_name.as_deref())
            .collect();
        assert_eq!(input_names.len(), 2);
        assert!(!input_names.contains(&"dropped"));
    }

    #[test]
    fn transfer_v1_worked_example_matches_spec_scenario() {
        // Old schema inputs={a,b}, outputs={y}; new schema inputs={a,c},
        // outputs={y,z}. v1 adds c->y, c->z, a->z; b and its edges vanish.
        let mut rng = SmallRng::seed_from_u64(6);
        let mut genome = Genome::new_seed(
            vec!["a".into(), "b".into()],
            vec!["y".into()],
            CellKind::Simple,
        );
        genome.rewrite_schema(
            &["a".into(), "c".into()],
            &["y".into(), "z".into()],
            TransferLearningVersion::V1,
            true,
            CellKind::Simple,
            &mut rng,
        );

        let input_names: Vec<&str> = genome
            .nodes
            .iter()
            .filter(|n| matches!(n.layer_type, LayerType::Input))
            .filter_map(|n| n.parameter_name.as_deref())
            .collect();
        assert_eq!(input_names.len(), 2);
        assert!(input_names.contains(&"a"));
        assert!(input_names.contains(&"c"));

        let output_names: Vec<&str> = genome
            .nodes
            .iter()
            .filter(|n| matches!(n.layer_type, LayerType::Output))
            .filter_map(|n| n.parameter_name.as_deref())
            .collect();
        assert_eq!(output_names.len(), 2);
        assert!(output_names.contains(&"y"));
        assert!(output_names.contains(&"z"));

        assert!(!genome.outputs_unreachable());
    }

    #[test]
    fn v1v2_connects_new_nodes_to_hidden_layer() {
        let mut rng = SmallRng::seed_from_u64(7);
        let mut genome = Genome::new_seed(
            vec!["a".into(), "b".into()],
            vec!["out".into()],
            CellKind::Simple,
        );
        genome.mutate_add_node(&mut rng, CellKind::Simple).unwrap();

        genome.rewrite_schema(
            &["renamed_a".into(), "renamed_b".into()],
            &["out".into()],
            TransferLearningVersion::V1V2,
            true,
            CellKind::Simple,
            &mut rng,
        );
        assert!(!genome.outputs_unreachable());
        assert_eq!(genome.input_parameter_names.len(), 2);
    }
}
