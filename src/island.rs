//! Islands: isolated sub-populations with their own fill/erase lifecycle.
use crate::genome::Genome;
use crate::population::Population;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IslandStatus {
    Initializing,
    Filled,
    Repopulating,
}

#[derive(Debug, Clone)]
pub struct Island {
    pub id: usize,
    pub generated: Population,
    pub elite: Population,
    pub status: IslandStatus,
    pub latest_generation: u64,
    /// Counts how many consecutive extinction cycles have targeted this
    /// island; `repeat_extinction = false` skips islands whose counter is
    /// still positive.
    pub erase_again_counter: usize,
}

impl Island {
    pub fn new(id: usize, max_generated: usize, max_elite: usize) -> Self {
        Self {
            id,
            generated: Population::new(max_generated),
            elite: Population::new(max_elite),
            status: IslandStatus::Initializing,
            latest_generation: 0,
            erase_again_counter: 0,
        }
    }

    pub fn insert_generated(&mut self, genome: Genome) -> Option<usize> {
        let idx = self.generated.insert(genome);
        self.generation_check();
        idx
    }

    pub fn insert_elite(&mut self, genome: Genome) -> Option<usize> {
        let idx = self.elite.insert(genome);
        self.generation_check();
        idx
    }

    /// Transitions `Initializing -> Filled` and `Repopulating -> Filled`
    /// once the elite population has reached capacity; never demotes a
    /// `Filled` island back down on its own (only [`Island::erase`] does
    /// that).
    pub fn generation_check(&mut self) {
        if matches!(self.status, IslandStatus::Initializing | IslandStatus::Repopulating)
            && self.elite.is_full()
        {
            self.status = IslandStatus::Filled;
        }
    }

    /// Clears both populations and marks the island for repopulation.
    pub fn erase(&mut self, repeat_extinction: bool) {
        self.generated.clear();
        self.elite.clear();
        self.status = IslandStatus::Repopulating;
        if !repeat_extinction {
            self.erase_again_counter = 1;
        }
    }

    /// Decays the erase-again cooldown by one; called once per extinction
    /// round regardless of which islands were erased that round.
    pub fn decay_cooldown(&mut self) {
        if self.erase_again_counter > 0 {
            self.erase_again_counter -= 1;
        }
    }

    pub fn can_be_erased_again(&self) -> bool {
        self.erase_again_counter == 0
    }

    pub fn best_fitness(&self) -> f64 {
        self.elite
            .best()
            .or_else(|| self.generated.best())
            .map(|g| g.fitness)
            .unwrap_or(f64::MAX)
    }
}

/// Ranks islands by their best fitness (ascending) and returns the indices
/// of the `count` worst eligible islands for erasure. Islands still
/// under an `erase_again_counter` cooldown are skipped.
pub fn rank_for_extinction(islands: &[Island], count: usize) -> Vec<usize> {
    let mut eligible: Vec<usize> = islands
        .iter()
        .enumerate()
        .filter(|(_, island)| {
            matches!(island.status, IslandStatus::Filled) && island.can_be_erased_again()
        })
        .map(|(i, _)| i)
        .collect();
    eligible.sort_by(|&a, &b| {
        islands[b]
            .best_fitness()
            .partial_cmp(&islands[a].best_fitness())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    eligible.into_iter().take(count).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::CellKind;

    fn genome_with_fitness(fitness: f64) -> Genome {
        let mut g = Genome::new_seed(vec!["x".into()], vec!["y".into()], CellKind::Simple);
        g.fitness = fitness;
        g
    }

    #[test]
    fn island_fills_when_elite_fills_not_generated() {
        let mut island = Island::new(0, 5, 1);
        assert_eq!(island.status, IslandStatus::Initializing);
        island.insert_generated(genome_with_fitness(1.0));
        assert_eq!(island.status, IslandStatus::Initializing);
        island.insert_elite(genome_with_fitness(1.0));
        assert_eq!(island.status, IslandStatus::Filled);
    }

    #[test]
    fn repopulating_island_refills_to_filled_via_elite() {
        let mut island = Island::new(0, 5, 1);
        island.insert_elite(genome_with_fitness(1.0));
        island.erase(false);
        assert_eq!(island.status, IslandStatus::Repopulating);
        assert!(island.elite.is_empty());
        island.insert_elite(genome_with_fitness(2.0));
        assert_eq!(island.status, IslandStatus::Filled);
    }

    #[test]
    fn extinction_ranks_worst_first() {
        let islands: Vec<Island> = vec![3.0, 1.0, 2.0, 4.0]
            .into_iter()
            .enumerate()
            .map(|(i, fitness)| {
                let mut island = Island::new(i, 5, 1);
                island.insert_elite(genome_with_fitness(fitness));
                island
            })
            .collect();
        let worst = rank_for_extinction(&islands, 1);
        assert_eq!(worst, vec![3]);
    }

    #[test]
    fn erase_again_counter_blocks_immediate_re_erasure() {
        let mut island = Island::new(0, 5, 1);
        island.insert_elite(genome_with_fitness(1.0));
        island.erase(false);
        assert!(!island.can_be_erased_again());
        island.decay_cooldown();
        assert!(island.can_be_erased_again());
    }
}
