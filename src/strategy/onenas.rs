//! The online generational variant: advances one time step per generation,
//! training candidate genomes against a rolling window and comparing the
//! population's best against a naive last-value baseline.
use super::island_speciation::IslandSpeciation;
use super::reporter::StrategyReporter;
use crate::config::{Config, SizeControlMethod};
use crate::genome::backprop::TimeSeries;
use crate::genome::Genome;
use crate::scheduler::EpisodeStore;
use crate::weight_update::WeightUpdate;
use rand::Rng;

#[derive(Debug, Clone)]
pub struct NaiveBaselineStats {
    pub generations_compared: u64,
    pub times_search_won: u64,
}

impl Default for NaiveBaselineStats {
    fn default() -> Self {
        Self {
            generations_compared: 0,
            times_search_won: 0,
        }
    }
}

pub struct OnlineController {
    pub speciation: IslandSpeciation,
    pub scheduler: EpisodeStore,
    pub global_best: Option<Genome>,
    pub naive_baseline: NaiveBaselineStats,
    size_control_triggered: bool,
}

impl OnlineController {
    pub fn new(speciation: IslandSpeciation, scheduler: EpisodeStore) -> Self {
        Self {
            speciation,
            scheduler,
            global_best: None,
            naive_baseline: NaiveBaselineStats::default(),
            size_control_triggered: false,
        }
    }

    /// Runs one full online round: generate and train `G` candidates per
    /// island, merge each island's survivors into its elite, recompute the
    /// global best from scratch, and slide the episode window forward.
    /// `global_best` is never touched outside this one recomputation — see
    /// [`IslandSpeciation::best_elite`].
    pub fn finalize_generation<R: Rng>(
        &mut self,
        generation: u64,
        config: &Config,
        series_by_index: &[TimeSeries],
        optimizer: &mut dyn WeightUpdate,
        reporter: &mut dyn StrategyReporter,
        rng: &mut R,
    ) -> Option<Vec<Vec<f64>>> {
        let training_indices = self.scheduler.select_training_indices(
            config.get_train_data_by,
            config.num_training_sets,
            config.temperature,
            rng,
        );
        self.scheduler
            .record_training_history(generation, training_indices.clone(), config.get_train_data_by);

        let training_series: Vec<TimeSeries> = training_indices
            .iter()
            .filter_map(|&idx| series_by_index.get(idx).cloned())
            .collect();
        let validation_indices = self.scheduler.validation_window(config.num_validation_sets);
        let validation_series: Vec<TimeSeries> = validation_indices
            .iter()
            .filter_map(|&idx| series_by_index.get(idx).cloned())
            .collect();

        if training_series.is_empty() || validation_series.is_empty() {
            self.scheduler.set_current_index(generation, config.num_training_sets);
            return None;
        }

        // (a) re-score every elite against the new validation window.
        self.speciation.rescore_elites(&validation_series);

        let candidates_per_island = self
            .speciation
            .islands
            .first()
            .map(|island| island.generated.max_size())
            .unwrap_or(0);
        let round_size = candidates_per_island * self.speciation.islands.len();

        for _ in 0..round_size {
            let generated = match self.speciation.generate(config, rng) {
                Ok(generated) => generated,
                Err(_) => continue,
            };
            let island_id = generated.island_id;
            let mut genome = generated.genome;
            genome.generation_id = generation;

            genome.train(
                &training_series,
                &validation_series,
                config.bp_iterations,
                config.learning_rate,
                config.stochastic,
                optimizer,
                rng,
            );

            if !genome.is_dead() {
                self.scheduler.reward_generation(generation);
            }

            self.speciation.submit_candidate(super::GeneratedGenome {
                genome,
                island_id,
                kind: generated.kind,
            });
        }

        // (b, c) merge generated+elite, keep the top E, clear generated.
        self.speciation.finalize_round();

        // (d) global_best = argmin validation MSE across all islands' elites.
        self.global_best = self.speciation.best_elite().cloned();
        if let Some(best) = &self.global_best {
            reporter.on_new_global_best(generation, best);
        }

        // (e) predictions on the test window.
        let test_index = self.scheduler.test_index(config.num_validation_sets);
        let predictions = self
            .global_best
            .as_ref()
            .and_then(|best| series_by_index.get(test_index).map(|series| best.predict(series)));

        // (g) naive-baseline comparison.
        if config.compare_with_naive {
            if let Some(validation) = validation_series.first() {
                self.compare_with_naive_baseline(validation);
            }
        }

        // (h) size control, once, past generation 10.
        self.maybe_trigger_size_control(config, generation);

        // Training-history GC keyed off the smallest surviving elite
        // generation id, not a fixed window.
        if let Some(min_keep_generation) = self.speciation.min_elite_generation() {
            self.scheduler.gc_training_history(min_keep_generation);
        }

        // (i) extinction/repopulation, gated on the strategy's own warmup.
        if let Ok(erased) = self.speciation.maybe_repopulate(config, generation, rng) {
            for island_id in erased {
                reporter.on_island_erased(island_id, generation);
            }
        }

        self.scheduler.set_current_index(generation, config.num_training_sets);

        reporter.on_generation_complete(
            generation,
            self.global_best.as_ref().map(|g| g.fitness).unwrap_or(f64::MAX),
        );

        predictions
    }

    /// A last-value-repeats baseline: predicts `y[t] = y[t-1]` for every
    /// output. Tracked so a search that can't beat doing nothing is visible.
    fn compare_with_naive_baseline(&mut self, validation: &TimeSeries) {
        let Some(best) = &self.global_best else {
            return;
        };
        let mut naive_sq_error = 0.0;
        let mut search_sq_error = 0.0;
        let mut count = 0;
        let predictions = best.predict(validation);
        for t in 1..validation.outputs.len() {
            for (feature, &target) in validation.outputs[t].iter().enumerate() {
                let naive_pred = validation.outputs[t - 1].get(feature).copied().unwrap_or(target);
                let search_pred = predictions.get(t).and_then(|row| row.get(feature)).copied().unwrap_or(target);
                naive_sq_error += (naive_pred - target).powi(2);
                search_sq_error += (search_pred - target).powi(2);
                count += 1;
            }
        }
        if count == 0 {
            return;
        }
        self.naive_baseline.generations_compared += 1;
        if search_sq_error < naive_sq_error {
            self.naive_baseline.times_search_won += 1;
        }
    }

    /// After generation 10, if the global best has beaten the naive
    /// baseline more often than not, shrinks every island's `generated`
    /// capacity to a quarter of its current size (floor, minimum 1). Fires
    /// at most once per run.
    fn maybe_trigger_size_control(&mut self, config: &Config, generation: u64) {
        if self.size_control_triggered || matches!(config.control_size_method, SizeControlMethod::None) {
            return;
        }
        if generation <= 10 {
            return;
        }
        let naive_better_count = self.naive_baseline.generations_compared - self.naive_baseline.times_search_won;
        if self.naive_baseline.times_search_won <= naive_better_count {
            return;
        }
        self.size_control_triggered = true;
        for island in self.speciation.islands.iter_mut() {
            let shrunk = ((island.generated.max_size() as f64 * 0.25).floor() as usize).max(1);
            island.generated.set_max_size(shrunk);
        }
        log::info!(
            "generation {generation}: network size control triggered ({:?})",
            config.control_size_method
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::CellKind;
    use crate::strategy::reporter::Noop;
    use crate::weight_update::Sgd;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn flat_series(len: usize) -> TimeSeries {
        TimeSeries {
            inputs: (0..len).map(|t| vec![t as f64 * 0.1]).collect(),
            outputs: (0..len).map(|t| vec![t as f64 * 0.2]).collect(),
        }
    }

    #[test]
    fn finalize_generation_runs_end_to_end() {
        let speciation =
            IslandSpeciation::new(2, 4, 4, CellKind::Simple, vec!["x".into()], vec!["y".into()]);
        let scheduler = EpisodeStore::new(20);
        let mut controller = OnlineController::new(speciation, scheduler);
        controller.scheduler.current_index = 5;
        let series: Vec<TimeSeries> = (0..20).map(|_| flat_series(6)).collect();
        let config = Config {
            num_training_sets: 2,
            num_validation_sets: 1,
            bp_iterations: 1,
            ..Config::default()
        };
        let mut optimizer = Sgd;
        let mut reporter = Noop;
        let mut rng = SmallRng::seed_from_u64(5);
        controller.finalize_generation(1, &config, &series, &mut optimizer, &mut reporter, &mut rng);
        // set_current_index(generation, num_training_sets) = 1 + 2.
        assert_eq!(controller.scheduler.current_index, 3);
        assert!(controller.global_best.is_some());
        assert!(controller
            .speciation
            .islands
            .iter()
            .all(|island| !island.elite.is_empty()));
    }
}
