//! Round-robin island speciation: each call to [`IslandSpeciation::generate`]
//! advances to the next island and produces one candidate genome for it,
//! either by seeding, mutating an elite parent, crossing over two elites,
//! or repopulating after an extinction event.
use super::{GenerationKind, GeneratedGenome};
use crate::config::{Config, RepopulationMethod};
use crate::error::EmptyParentPoolError;
use crate::genome::crossover::crossover;
use crate::genome::Genome;
use crate::island::{rank_for_extinction, Island, IslandStatus};
use crate::node::{CellKind, LayerType};
use rand::Rng;

pub struct IslandSpeciation {
    pub islands: Vec<Island>,
    next_island: usize,
    cell_kind: CellKind,
    input_names: Vec<String>,
    output_names: Vec<String>,
    generations_since_repopulation_check: usize,
}

impl IslandSpeciation {
    pub fn new(
        num_islands: usize,
        island_population_size: usize,
        island_elite_size: usize,
        cell_kind: CellKind,
        input_names: Vec<String>,
        output_names: Vec<String>,
    ) -> Self {
        let islands = (0..num_islands)
            .map(|id| Island::new(id, island_population_size, island_elite_size))
            .collect();
        Self {
            islands,
            next_island: 0,
            cell_kind,
            input_names,
            output_names,
            generations_since_repopulation_check: 0,
        }
    }

    fn advance_island(&mut self) -> usize {
        let id = self.next_island;
        self.next_island = (self.next_island + 1) % self.islands.len();
        id
    }

    /// The current best elite across every island, recomputed on demand
    /// rather than tracked incrementally on insertion.
    fn current_global_best(&self) -> Option<&Genome> {
        self.islands
            .iter()
            .filter_map(|island| island.elite.best())
            .min_by(|a, b| a.fitness.partial_cmp(&b.fitness).unwrap())
    }

    /// Produces one candidate genome for the next island in round-robin
    /// order. A rejected mutation/crossover leaves the clone at its last
    /// known-reachable state rather than being retried, so the result is
    /// always valid.
    pub fn generate<R: Rng>(
        &mut self,
        config: &Config,
        rng: &mut R,
    ) -> Result<GeneratedGenome, EmptyParentPoolError> {
        let island_id = self.advance_island();
        let status = self.islands[island_id].status;

        let (genome, kind) = match status {
            IslandStatus::Initializing if self.islands[island_id].elite.is_empty() => {
                let mut genome = Genome::new_seed(
                    self.input_names.clone(),
                    self.output_names.clone(),
                    self.cell_kind,
                );
                for _ in 0..config.seed_stirs {
                    self.apply_random_mutation(&mut genome, rng);
                }
                (genome, GenerationKind::Seed)
            }
            IslandStatus::Initializing => {
                let parent = self.islands[island_id]
                    .elite
                    .iter()
                    .nth(rng.gen_range(0..self.islands[island_id].elite.len()))
                    .expect("non-empty elite");
                let mut child = parent.clone();
                child.fitness = crate::genome::EXAMM_MAX_DOUBLE;
                child.best_validation_mse = crate::genome::EXAMM_MAX_DOUBLE;
                child.best_validation_mae = crate::genome::EXAMM_MAX_DOUBLE;
                self.apply_random_mutation(&mut child, rng);
                (child, GenerationKind::Mutation)
            }
            IslandStatus::Filled => self.mutate_or_cross(island_id, config, rng),
            IslandStatus::Repopulating => {
                self.repopulation_candidate(island_id, config.repopulation_method, rng)?
            }
        };

        Ok(GeneratedGenome {
            genome,
            island_id,
            kind,
        })
    }

    fn mutate_or_cross<R: Rng>(
        &self,
        island_id: usize,
        config: &Config,
        rng: &mut R,
    ) -> (Genome, GenerationKind) {
        let island = &self.islands[island_id];
        let parent = island
            .elite
            .best()
            .expect("filled island has a full, non-empty elite");

        let filled_count = self
            .islands
            .iter()
            .filter(|i| matches!(i.status, IslandStatus::Filled))
            .count();
        let (mutation_threshold, intra_threshold) = config.speciation_thresholds();
        let r: f64 = rng.gen_range(0.0..1.0);

        if filled_count <= 1 || r < mutation_threshold {
            let mut child = parent.clone();
            child.fitness = crate::genome::EXAMM_MAX_DOUBLE;
            child.best_validation_mse = crate::genome::EXAMM_MAX_DOUBLE;
            child.best_validation_mae = crate::genome::EXAMM_MAX_DOUBLE;
            self.apply_random_mutation(&mut child, rng);
            return (child, GenerationKind::Mutation);
        }

        if r < intra_threshold && island.elite.len() >= 2 {
            let mut other_idx = rng.gen_range(0..island.elite.len());
            if other_idx == 0 {
                other_idx = rng.gen_range(1..island.elite.len());
            }
            let other = island.elite.get(other_idx).unwrap_or(parent);
            let (first, second) = order_by_fitness(parent, other);
            let child = crossover(first, second, rng);
            return (child, GenerationKind::Crossover);
        }

        let other_filled: Vec<usize> = (0..self.islands.len())
            .filter(|&i| i != island_id && matches!(self.islands[i].status, IslandStatus::Filled))
            .collect();
        if !other_filled.is_empty() {
            let other_id = other_filled[rng.gen_range(0..other_filled.len())];
            if let Some(other_best) = self.islands[other_id].elite.best() {
                let (first, second) = order_by_fitness(parent, other_best);
                let child = crossover(first, second, rng);
                return (child, GenerationKind::Crossover);
            }
        }

        let mut child = parent.clone();
        child.fitness = crate::genome::EXAMM_MAX_DOUBLE;
        self.apply_random_mutation(&mut child, rng);
        (child, GenerationKind::Mutation)
    }

    /// Dispatches a single repopulation candidate for an island in
    /// `Repopulating` status. Called once per `generate()` invocation for
    /// that island, so the island fills up one candidate at a time exactly
    /// like every other status.
    fn repopulation_candidate<R: Rng>(
        &self,
        island_id: usize,
        method: RepopulationMethod,
        rng: &mut R,
    ) -> Result<(Genome, GenerationKind), EmptyParentPoolError> {
        let other_filled: Vec<usize> = (0..self.islands.len())
            .filter(|&i| i != island_id && matches!(self.islands[i].status, IslandStatus::Filled))
            .collect();

        match method {
            RepopulationMethod::BestGenome => {
                let best = self.current_global_best().ok_or(EmptyParentPoolError)?;
                let mut child = best.clone();
                child.fitness = crate::genome::EXAMM_MAX_DOUBLE;
                child.best_validation_mse = crate::genome::EXAMM_MAX_DOUBLE;
                child.best_validation_mae = crate::genome::EXAMM_MAX_DOUBLE;
                self.apply_random_mutation(&mut child, rng);
                Ok((child, GenerationKind::Repopulation))
            }
            RepopulationMethod::BestIsland => {
                let &best_id = other_filled
                    .iter()
                    .max_by(|&&a, &&b| {
                        self.islands[b]
                            .best_fitness()
                            .partial_cmp(&self.islands[a].best_fitness())
                            .unwrap()
                    })
                    .ok_or(EmptyParentPoolError)?;
                let donor = &self.islands[best_id].elite;
                if donor.is_empty() {
                    return Err(EmptyParentPoolError);
                }
                let idx = rng.gen_range(0..donor.len());
                let mut child = donor.get(idx).cloned().ok_or(EmptyParentPoolError)?;
                child.fitness = crate::genome::EXAMM_MAX_DOUBLE;
                child.best_validation_mse = crate::genome::EXAMM_MAX_DOUBLE;
                child.best_validation_mae = crate::genome::EXAMM_MAX_DOUBLE;
                self.apply_random_mutation(&mut child, rng);
                Ok((child, GenerationKind::Repopulation))
            }
            RepopulationMethod::RandomParents | RepopulationMethod::BestParents => {
                if other_filled.len() < 2 {
                    return Err(EmptyParentPoolError);
                }
                let (donor_a, donor_b) = match method {
                    RepopulationMethod::BestParents => {
                        let mut ranked = other_filled.clone();
                        ranked.sort_by(|&a, &b| {
                            self.islands[a]
                                .best_fitness()
                                .partial_cmp(&self.islands[b].best_fitness())
                                .unwrap()
                        });
                        (ranked[0], ranked[1])
                    }
                    _ => {
                        let i = rng.gen_range(0..other_filled.len());
                        let mut j = rng.gen_range(0..other_filled.len());
                        while j == i {
                            j = rng.gen_range(0..other_filled.len());
                        }
                        (other_filled[i], other_filled[j])
                    }
                };
                let pa = self.islands[donor_a].elite.best().ok_or(EmptyParentPoolError)?;
                let pb = self.islands[donor_b].elite.best().ok_or(EmptyParentPoolError)?;
                let (first, second) = order_by_fitness(pa, pb);
                let mut child = crossover(first, second, rng);
                self.apply_random_mutation(&mut child, rng);
                Ok((child, GenerationKind::Repopulation))
            }
        }
    }

    fn apply_random_mutation<R: Rng>(&self, genome: &mut Genome, rng: &mut R) {
        let choice = rng.gen_range(0..10);
        let result = match choice {
            0 => genome.mutate_add_edge(rng),
            1 => genome.mutate_add_recurrent_edge(rng, 1, 5),
            2 => genome.mutate_disable_edge(rng),
            3 => genome.mutate_enable_edge(rng),
            4 => genome.mutate_split_edge(rng, self.cell_kind),
            5 => genome.mutate_add_node(rng, self.cell_kind),
            6 => genome.mutate_disable_node(rng),
            7 => genome.mutate_enable_node(rng),
            8 => genome.mutate_split_node(rng, self.cell_kind),
            _ => {
                let hidden: Vec<usize> = genome
                    .nodes
                    .iter()
                    .enumerate()
                    .filter(|(_, n)| matches!(n.layer_type, LayerType::Hidden) && n.enabled)
                    .map(|(i, _)| i)
                    .collect();
                if hidden.len() >= 2 {
                    let i = rng.gen_range(0..hidden.len());
                    let mut j = rng.gen_range(0..hidden.len());
                    while j == i {
                        j = rng.gen_range(0..hidden.len());
                    }
                    genome.mutate_merge_node(hidden[i], hidden[j])
                } else {
                    Ok(())
                }
            }
        };
        // A rejected mutation (unreachable output) just leaves the clone
        // unmodified; the caller still gets a valid, if unchanged, genome.
        let _ = result;
    }

    /// Inserts a generated genome into the island it was produced for, and
    /// promotes it into the elite population on success. Does not track a
    /// running global best; that is only ever recomputed on demand.
    pub fn absorb(&mut self, generated: GeneratedGenome) {
        let island = &mut self.islands[generated.island_id];
        let elite_candidate = generated.genome.clone();
        island.insert_generated(generated.genome);
        island.insert_elite(elite_candidate);
    }

    /// Collects a trained candidate into its island's `generated` pool
    /// only, without touching `elite`. Used by the online round-based
    /// variant, where elite only refills at [`IslandSpeciation::finalize_round`].
    pub fn submit_candidate(&mut self, generated: GeneratedGenome) {
        self.islands[generated.island_id].insert_generated(generated.genome);
    }

    /// Ends one online round: merges each island's `generated` candidates
    /// into its `elite`, keeping the top `max_size` by fitness, then
    /// clears `generated`. Mirrors [`Population::insert`]'s dedup/sort/cap
    /// rules rather than reimplementing them.
    pub fn finalize_round(&mut self) {
        for island in self.islands.iter_mut() {
            let merged: Vec<Genome> = island
                .elite
                .genomes()
                .iter()
                .cloned()
                .chain(island.generated.genomes().iter().cloned())
                .collect();
            island.elite.clear();
            for genome in merged {
                island.elite.insert(genome);
            }
            island.generated.clear();
            island.generation_check();
        }
    }

    /// The argmin-fitness elite across all islands, recomputed fresh. The
    /// online controller calls this once per round, never per insertion.
    pub fn best_elite(&self) -> Option<&Genome> {
        self.current_global_best()
    }

    /// Re-scores every elite genome against the newest validation window and
    /// re-sorts each island's elite afterward.
    pub fn rescore_elites(&mut self, validation: &[crate::genome::backprop::TimeSeries]) {
        for island in self.islands.iter_mut() {
            for genome in island.elite.iter_mut() {
                genome.evaluate_validation(validation);
            }
            island.elite.resort();
        }
    }

    /// The smallest generation id among all current elites, or `None` if
    /// every island's elite is empty. Training history older than this can
    /// never be referenced by a future scoring pass.
    pub fn min_elite_generation(&self) -> Option<u64> {
        self.islands
            .iter()
            .flat_map(|island| island.elite.iter())
            .map(|genome| genome.generation_id)
            .min()
    }

    /// Runs the periodic extinction/repopulation sweep: only takes effect
    /// past `2 * repopulation_frequency` generations, and then once every
    /// `repopulation_frequency` rounds thereafter.
    pub fn maybe_repopulate<R: Rng>(
        &mut self,
        config: &Config,
        generation: u64,
        _rng: &mut R,
    ) -> Result<Vec<usize>, EmptyParentPoolError> {
        let warmup = 2 * config.repopulation_frequency as u64;
        if generation < warmup {
            return Ok(Vec::new());
        }

        self.generations_since_repopulation_check += 1;
        if self.generations_since_repopulation_check < config.repopulation_frequency {
            return Ok(Vec::new());
        }
        self.generations_since_repopulation_check = 0;

        for island in self.islands.iter_mut() {
            island.decay_cooldown();
        }

        let erased = rank_for_extinction(&self.islands, config.islands_to_exterminate);
        for &island_id in &erased {
            self.islands[island_id].erase(config.repeat_extinction);
        }
        Ok(erased)
    }
}

/// Orders two parents so the more-fit one (lower fitness) comes first, as
/// `crossover` expects.
fn order_by_fitness<'a>(a: &'a Genome, b: &'a Genome) -> (&'a Genome, &'a Genome) {
    if a.fitness <= b.fitness {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn strategy() -> IslandSpeciation {
        IslandSpeciation::new(3, 4, 4, CellKind::Simple, vec!["x".into()], vec!["y".into()])
    }

    #[test]
    fn round_robin_visits_every_island() {
        let mut strat = strategy();
        let config = Config::default();
        let mut rng = SmallRng::seed_from_u64(1);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..3 {
            let g = strat.generate(&config, &mut rng).unwrap();
            seen.insert(g.island_id);
            strat.absorb(g);
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn extinction_with_given_fitnesses_picks_worst() {
        let mut strat = IslandSpeciation::new(3, 4, 1, CellKind::Simple, vec!["x".into()], vec!["y".into()]);
        let mut rng = SmallRng::seed_from_u64(2);
        for (i, fitness) in [3.0, 1.0, 2.0].into_iter().enumerate() {
            let mut genome = Genome::new_seed(vec!["x".into()], vec!["y".into()], CellKind::Simple);
            genome.fitness = fitness;
            strat.islands[i].insert_generated(genome.clone());
            strat.islands[i].insert_elite(genome);
        }
        let config = Config {
            repopulation_frequency: 1,
            islands_to_exterminate: 1,
            ..Config::default()
        };
        let erased = strat.maybe_repopulate(&config, 2, &mut rng).unwrap();
        assert_eq!(erased, vec![0]);
    }

    #[test]
    fn repopulating_island_produces_candidates_via_configured_method() {
        let mut strat = IslandSpeciation::new(2, 4, 1, CellKind::Simple, vec!["x".into()], vec!["y".into()]);
        let mut rng = SmallRng::seed_from_u64(3);
        let mut donor = Genome::new_seed(vec!["x".into()], vec!["y".into()], CellKind::Simple);
        donor.fitness = 0.2;
        strat.islands[1].insert_elite(donor);
        assert_eq!(strat.islands[1].status, IslandStatus::Filled);

        strat.islands[0].erase(false);
        assert_eq!(strat.islands[0].status, IslandStatus::Repopulating);

        let config = Config {
            repopulation_method: RepopulationMethod::BestIsland,
            ..Config::default()
        };
        let generated = strat.generate(&config, &mut rng).unwrap();
        assert_eq!(generated.island_id, 0);
        assert_eq!(generated.kind, GenerationKind::Repopulation);
    }
}
