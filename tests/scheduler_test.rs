#[cfg(test)]
mod scheduler_tests {
    use onenas::config::TrainDataSampler;
    use onenas::scheduler::EpisodeStore;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn rewarded_episode_is_favored_once_temperature_sharpens_selection() {
        let mut store = EpisodeStore::new(50);
        store.current_index = 10;
        let mut rng = SmallRng::seed_from_u64(1);

        let first_pick = store.select_training_indices(TrainDataSampler::Per, 3, 1.0, &mut rng);
        store.record_training_history(1, first_pick, TrainDataSampler::Per);
        store.reward_generation(1);
        store.reward_generation(1);
        store.reward_generation(1);

        assert!(store.training_history(1).is_some());

        let mut wins_for_rewarded = 0;
        let rewarded = store.training_history(1).unwrap().to_vec();
        for seed in 0..30 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let picks = store.select_training_indices(TrainDataSampler::Per, 1, 0.05, &mut rng);
            if picks.iter().any(|p| rewarded.contains(p)) {
                wins_for_rewarded += 1;
            }
        }
        assert!(wins_for_rewarded > 0);
    }

    #[test]
    fn gc_clears_old_generations_but_keeps_recent_ones() {
        let mut store = EpisodeStore::new(20);
        store.current_index = 10;
        store.record_training_history(1, vec![0], TrainDataSampler::Per);
        store.record_training_history(40, vec![1], TrainDataSampler::Per);
        store.gc_training_history(40);
        assert!(store.training_history(1).is_none());
        assert!(store.training_history(40).is_some());
    }
}
