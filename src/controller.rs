//! The top-level generational loop: drives [`OnlineController`] one
//! generation at a time, writing predictions and score traces as it goes.
use crate::config::Config;
use crate::genome::backprop::TimeSeries;
use crate::output;
use crate::strategy::onenas::OnlineController;
use crate::strategy::reporter::StrategyReporter;
use crate::weight_update::WeightUpdate;
use rand::Rng;
use std::path::PathBuf;

pub struct GenerationalController {
    pub online: OnlineController,
    pub config: Config,
    current_generation: u64,
    best_generation: u64,
}

impl GenerationalController {
    pub fn new(online: OnlineController, config: Config) -> Self {
        Self {
            online,
            config,
            current_generation: 0,
            best_generation: 0,
        }
    }

    pub fn current_generation(&self) -> u64 {
        self.current_generation
    }

    pub fn best_generation(&self) -> u64 {
        self.best_generation
    }

    /// Runs `num_generations` generations, writing CSV output under
    /// `config.output_directory` when `config.write_to_file` is set.
    pub fn run<R: Rng>(
        &mut self,
        num_generations: u64,
        series_by_index: &[TimeSeries],
        optimizer: &mut dyn WeightUpdate,
        reporter: &mut dyn StrategyReporter,
        rng: &mut R,
    ) {
        for _ in 0..num_generations {
            self.current_generation += 1;
            let best_before = self.online.global_best.as_ref().map(|g| g.fitness);

            let predictions = self.online.finalize_generation(
                self.current_generation,
                &self.config,
                series_by_index,
                optimizer,
                reporter,
                rng,
            );

            if self.online.global_best.as_ref().map(|g| g.fitness) != best_before {
                self.best_generation = self.current_generation;
            }

            if self.config.write_to_file {
                self.write_generation_output(predictions.as_deref());
            }
        }
    }

    fn write_generation_output(&self, predictions: Option<&[Vec<f64>]>) {
        let dir = PathBuf::from(&self.config.output_directory);
        if std::fs::create_dir_all(&dir).is_err() {
            log::warn!("could not create output directory {}", dir.display());
            return;
        }
        if let Some(best) = &self.online.global_best {
            let _ = output::write_score_trace_csv(
                &dir.join("score_trace.csv"),
                self.current_generation,
                best.fitness,
            );
        }
        if let Some(predictions) = predictions {
            if let Some(best) = &self.online.global_best {
                let _ = output::write_predictions_csv(
                    &dir.join("predictions.csv"),
                    &best.output_parameter_names,
                    predictions,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::CellKind;
    use crate::scheduler::EpisodeStore;
    use crate::strategy::island_speciation::IslandSpeciation;
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
    fn run_advances_generation_counter() {
        let speciation =
            IslandSpeciation::new(2, 3, 3, CellKind::Simple, vec!["x".into()], vec!["y".into()]);
        let mut scheduler = EpisodeStore::new(30);
        scheduler.current_index = 5;
        let online = OnlineController::new(speciation, scheduler);
        let config = Config {
            num_training_sets: 2,
            num_validation_sets: 1,
            bp_iterations: 1,
            write_to_file: false,
            ..Config::default()
        };
        let mut controller = GenerationalController::new(online, config);
        let series: Vec<TimeSeries> = (0..30).map(|_| flat_series(6)).collect();
        let mut optimizer = Sgd;
        let mut reporter = Noop;
        let mut rng = SmallRng::seed_from_u64(11);
        controller.run(3, &series, &mut optimizer, &mut reporter, &mut rng);
        assert_eq!(controller.current_generation(), 3);
    }
}
