#[cfg(test)]
mod serialize_tests {
    use onenas::genome::Genome;
    use onenas::node::CellKind;

    #[test]
    fn rejects_truncated_and_corrupted_streams() {
        let genome = Genome::new_seed(vec!["x".into()], vec!["y".into()], CellKind::Lstm);
        let bytes = genome.to_bytes();

        for cut in [0, 1, bytes.len() / 2, bytes.len() - 1] {
            let truncated = &bytes[..cut];
            assert!(Genome::from_bytes(truncated).is_err());
        }
    }

    #[test]
    fn preserves_weights_and_parameter_names_across_cell_kinds() {
        for kind in [
            CellKind::Simple,
            CellKind::Gru,
            CellKind::Lstm,
            CellKind::Delta,
        ] {
            let genome = Genome::new_seed(vec!["in".into()], vec!["out".into()], kind);
            let bytes = genome.to_bytes();
            let restored = Genome::from_bytes(&bytes).unwrap();
            assert_eq!(restored.get_weights(), genome.get_weights());
            assert_eq!(restored.input_parameter_names, genome.input_parameter_names);
            assert_eq!(restored.output_parameter_names, genome.output_parameter_names);
        }
    }
}
