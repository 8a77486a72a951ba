//! Online episode scheduler: tracks which time-series windows are
//! "available" as the stream advances, and picks training indices either
//! uniformly or via tempered prioritized experience replay.
use crate::config::TrainDataSampler;
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;
use rustc_hash::FxHashMap;

/// Below this, a zero/negative training score would make `score^(1/τ)`
/// degenerate; scores are floored here before tempering.
pub const SCORE_FLOOR: f64 = 0.001;

#[derive(Debug, Clone)]
pub struct EpisodeStore {
    pub current_index: usize,
    pub total_episodes: usize,
    scores: Vec<i64>,
    training_history: FxHashMap<u64, Vec<usize>>,
}

impl EpisodeStore {
    pub fn new(total_episodes: usize) -> Self {
        Self {
            current_index: 0,
            total_episodes,
            scores: vec![0; total_episodes],
            training_history: FxHashMap::default(),
        }
    }

    /// `current_index = generation + num_training_sets`: the window slides
    /// forward by exactly the training-set width every generation.
    pub fn set_current_index(&mut self, generation: u64, num_training_sets: usize) {
        self.current_index = generation as usize + num_training_sets;
    }

    pub fn validation_window(&self, num_validation_sets: usize) -> Vec<usize> {
        (0..num_validation_sets)
            .map(|i| self.current_index + i)
            .filter(|&idx| idx < self.total_episodes)
            .collect()
    }

    pub fn test_index(&self, num_validation_sets: usize) -> usize {
        self.current_index + num_validation_sets
    }

    /// Picks `num_training_sets` distinct episode indices from
    /// `[0, current_index)` per `sampler`.
    pub fn select_training_indices<R: Rng>(
        &self,
        sampler: TrainDataSampler,
        num_training_sets: usize,
        temperature: f64,
        rng: &mut R,
    ) -> Vec<usize> {
        match sampler {
            TrainDataSampler::Uniform => self.uniform_sample(num_training_sets, rng),
            TrainDataSampler::Per => self.tempered_per_sample(num_training_sets, temperature, rng),
        }
    }

    fn uniform_sample<R: Rng>(&self, num_training_sets: usize, rng: &mut R) -> Vec<usize> {
        let mut available: Vec<usize> = (0..self.current_index).collect();
        available.shuffle(rng);
        available.truncate(num_training_sets);
        available
    }

    /// The mandatory hybrid: the `num_training_sets/2` most-recent episodes
    /// are taken deterministically from `[current_index-k, current_index)`;
    /// the rest are sampled without replacement from the older pool
    /// `[0, current_index-k)` with `P(i) ∝ max(score_i, SCORE_FLOOR)^(1/τ)`.
    /// τ → 0 collapses the older-pool draw onto the single highest-scoring
    /// episode.
    fn tempered_per_sample<R: Rng>(
        &self,
        num_training_sets: usize,
        temperature: f64,
        rng: &mut R,
    ) -> Vec<usize> {
        if num_training_sets == 0 || self.current_index == 0 {
            return Vec::new();
        }
        let num_recent = (num_training_sets / 2).min(self.current_index);
        let older_end = self.current_index - num_recent;
        let mut selected: Vec<usize> = (older_end..self.current_index).collect();

        let mut older: Vec<usize> = (0..older_end).collect();
        let mut weights: Vec<f64> = older
            .iter()
            .map(|&idx| {
                let score = self.scores[idx].max(0) as f64;
                let base = if score > 0.0 { score } else { SCORE_FLOOR };
                base.powf(1.0 / temperature)
            })
            .collect();

        while selected.len() < num_training_sets && !older.is_empty() {
            let dist = match WeightedIndex::new(&weights) {
                Ok(d) => d,
                Err(_) => break,
            };
            let pick = dist.sample(rng);
            selected.push(older[pick]);
            older.remove(pick);
            weights.remove(pick);
        }
        selected
    }

    pub fn record_training_history(&mut self, generation_id: u64, indices: Vec<usize>, sampler: TrainDataSampler) {
        if matches!(sampler, TrainDataSampler::Uniform) {
            return;
        }
        self.training_history.insert(generation_id, indices);
    }

    pub fn training_history(&self, generation_id: u64) -> Option<&[usize]> {
        self.training_history.get(&generation_id).map(|v| v.as_slice())
    }

    /// Increments the training score of every episode used by `generation_id`
    /// by one; called once that generation's elite genome is confirmed good.
    pub fn reward_generation(&mut self, generation_id: u64) {
        if let Some(indices) = self.training_history.get(&generation_id).cloned() {
            for idx in indices {
                if let Some(score) = self.scores.get_mut(idx) {
                    *score += 1;
                }
            }
        }
    }

    /// Drops training-history entries for generations that can never be
    /// referenced again: every entry strictly below the smallest surviving
    /// elite generation id.
    pub fn gc_training_history(&mut self, min_keep_generation: u64) {
        self.training_history.retain(|&gen, _| gen >= min_keep_generation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn uniform_sample_is_distinct_and_in_range() {
        let mut store = EpisodeStore::new(100);
        store.current_index = 20;
        let mut rng = SmallRng::seed_from_u64(1);
        let sample = store.select_training_indices(TrainDataSampler::Uniform, 5, 1.0, &mut rng);
        assert_eq!(sample.len(), 5);
        assert!(sample.iter().all(|&i| i < 20));
        let unique: std::collections::HashSet<_> = sample.iter().collect();
        assert_eq!(unique.len(), 5);
    }

    #[test]
    fn low_temperature_favors_highest_scoring_episode() {
        let mut store = EpisodeStore::new(10);
        store.current_index = 4;
        store.scores = vec![1, 1, 1, 9, 0, 0, 0, 0, 0, 0];
        let mut rng = SmallRng::seed_from_u64(2);
        let mut count_picked_best = 0;
        for _ in 0..20 {
            let sample =
                store.select_training_indices(TrainDataSampler::Per, 1, 0.0001, &mut rng);
            if sample == vec![3] {
                count_picked_best += 1;
            }
        }
        assert!(count_picked_best >= 18);
    }

    #[test]
    fn high_temperature_is_closer_to_uniform() {
        let mut store = EpisodeStore::new(10);
        store.current_index = 4;
        store.scores = vec![1, 1, 1, 9, 0, 0, 0, 0, 0, 0];
        let mut rng = SmallRng::seed_from_u64(3);
        let mut picks: FxHashMap<usize, usize> = FxHashMap::default();
        for _ in 0..200 {
            let sample =
                store.select_training_indices(TrainDataSampler::Per, 1, 1_000_000.0, &mut rng);
            *picks.entry(sample[0]).or_insert(0) += 1;
        }
        assert!(picks.len() > 1);
    }

    #[test]
    fn gc_drops_generations_older_than_the_smallest_elite() {
        let mut store = EpisodeStore::new(50);
        store.current_index = 10;
        store.record_training_history(1, vec![0, 1], TrainDataSampler::Per);
        store.record_training_history(50, vec![2, 3], TrainDataSampler::Per);
        store.gc_training_history(50);
        assert!(store.training_history(1).is_none());
        assert!(store.training_history(50).is_some());
    }

    #[test]
    fn tempered_sample_always_includes_the_deterministic_recent_half() {
        let mut store = EpisodeStore::new(20);
        store.current_index = 10;
        let mut rng = SmallRng::seed_from_u64(4);
        let sample = store.select_training_indices(TrainDataSampler::Per, 4, 1.0, &mut rng);
        assert_eq!(sample.len(), 4);
        assert!(sample.contains(&8));
        assert!(sample.contains(&9));
    }

    #[test]
    fn uniform_sampler_never_records_history() {
        let mut store = EpisodeStore::new(50);
        store.record_training_history(1, vec![0, 1], TrainDataSampler::Uniform);
        assert!(store.training_history(1).is_none());
    }
}
