//! Strategy-progress reporting: a silent default and a `log`-backed one
//! for interactive runs.
use crate::genome::Genome;

pub trait StrategyReporter: Send {
    fn on_new_global_best(&mut self, _generation: u64, _genome: &Genome) {}
    fn on_generation_complete(&mut self, _generation: u64, _best_fitness: f64) {}
    fn on_island_erased(&mut self, _island_id: usize, _generation: u64) {}
}

#[derive(Default)]
pub struct Noop;
impl StrategyReporter for Noop {}

#[derive(Default)]
pub struct Simple {
    pub every_n_generations: u64,
}

impl Simple {
    pub fn new(every_n_generations: u64) -> Self {
        Self { every_n_generations }
    }
}

impl StrategyReporter for Simple {
    fn on_new_global_best(&mut self, generation: u64, genome: &Genome) {
        log::info!(
            "generation {generation}: new global best, validation MSE = {:.6}",
            genome.fitness
        );
    }

    fn on_generation_complete(&mut self, generation: u64, best_fitness: f64) {
        let interval = self.every_n_generations.max(1);
        if generation % interval == 0 {
            log::info!("generation {generation} complete, best fitness so far = {best_fitness:.6}");
        }
    }

    fn on_island_erased(&mut self, island_id: usize, generation: u64) {
        log::info!("generation {generation}: island {island_id} erased for repopulation");
    }
}
