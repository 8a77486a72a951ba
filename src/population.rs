//! A fitness-ordered, structurally-deduplicated container for genomes,
//! keeping the fittest up to a fixed capacity and rejecting duplicate
//! structures by structural hash rather than raw equality.
use crate::genome::Genome;
use rustc_hash::FxHashMap;

/// Ascending by fitness (lower validation MSE is better); `EXAMM_MAX_DOUBLE`
/// genomes sort last, `NaN` (dead) genomes sort last of all.
#[derive(Clone, Debug)]
pub struct Population {
    genomes: Vec<Genome>,
    max_size: usize,
    /// Maps structural hash to the index holding that structure, so
    /// insertion can reject or replace a duplicate in O(1) expected time.
    buckets: FxHashMap<(u64, u64, u64), usize>,
}

fn fitness_cmp(a: f64, b: f64) -> std::cmp::Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => std::cmp::Ordering::Equal,
        (true, false) => std::cmp::Ordering::Greater,
        (false, true) => std::cmp::Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap(),
    }
}

impl Population {
    pub fn new(max_size: usize) -> Self {
        Self {
            genomes: Vec::with_capacity(max_size),
            max_size,
            buckets: FxHashMap::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.genomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genomes.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.genomes.len() >= self.max_size
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn iter(&self) -> impl Iterator<Item = &Genome> {
        self.genomes.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Genome> {
        self.genomes.iter_mut()
    }

    pub fn best(&self) -> Option<&Genome> {
        self.genomes.first()
    }

    pub fn worst(&self) -> Option<&Genome> {
        self.genomes.last()
    }

    pub fn get(&self, index: usize) -> Option<&Genome> {
        self.genomes.get(index)
    }

    fn reindex_buckets(&mut self) {
        self.buckets.clear();
        for (i, genome) in self.genomes.iter().enumerate() {
            self.buckets.insert(genome.structural_hash(), i);
        }
    }

    /// Inserts `genome` keeping the population fitness-sorted and capped at
    /// `max_size`. Returns the insertion index, or `None` if a
    /// structurally-identical genome already occupies a fitter (or equal)
    /// slot, or if the population is full and `genome` is no better than
    /// the current worst member.
    pub fn insert(&mut self, genome: Genome) -> Option<usize> {
        let hash = genome.structural_hash();
        if let Some(&existing_idx) = self.buckets.get(&hash) {
            let existing_fitness = self.genomes[existing_idx].fitness;
            if fitness_cmp(genome.fitness, existing_fitness) != std::cmp::Ordering::Less {
                return None;
            }
            self.genomes[existing_idx] = genome;
            self.genomes
                .sort_by(|a, b| fitness_cmp(a.fitness, b.fitness));
            self.reindex_buckets();
            return self.genomes.iter().position(|g| g.structural_hash() == hash);
        }

        if self.is_full() {
            let worst_fitness = self.genomes.last().map(|g| g.fitness).unwrap_or(f64::MAX);
            if fitness_cmp(genome.fitness, worst_fitness) != std::cmp::Ordering::Less {
                return None;
            }
        }

        let pos = self
            .genomes
            .binary_search_by(|g| fitness_cmp(g.fitness, genome.fitness))
            .unwrap_or_else(|e| e);
        self.genomes.insert(pos, genome);
        if self.genomes.len() > self.max_size {
            self.genomes.truncate(self.max_size);
        }
        self.reindex_buckets();
        self.genomes
            .iter()
            .position(|g| g.structural_hash() == hash)
    }

    pub fn clear(&mut self) {
        self.genomes.clear();
        self.buckets.clear();
    }

    pub fn genomes(&self) -> &[Genome] {
        &self.genomes
    }

    /// Re-sorts by fitness and rebuilds the structural-hash index; needed
    /// after mutating fitness in place via [`Population::iter_mut`].
    pub fn resort(&mut self) {
        self.genomes.sort_by(|a, b| fitness_cmp(a.fitness, b.fitness));
        self.reindex_buckets();
    }

    /// Shrinks (or grows) the capacity, truncating the worst members if the
    /// population is currently over the new size.
    pub fn set_max_size(&mut self, max_size: usize) {
        self.max_size = max_size;
        if self.genomes.len() > max_size {
            self.genomes.truncate(max_size);
            self.reindex_buckets();
        }
    }
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
    fn population_stays_sorted_ascending() {
        let mut pop = Population::new(10);
        // distinct structures: mutate one genome so the hash differs.
        let mut a = genome_with_fitness(3.0);
        a.add_edge_raw(0, 1, 0.1);
        let mut b = genome_with_fitness(1.0);
        b.add_edge_raw(0, 1, 0.2);
        b.add_edge_raw(0, 1, 0.2); // forces a distinct hash from `a`'s single extra edge
        pop.insert(a);
        pop.insert(b);
        let fitnesses: Vec<f64> = pop.iter().map(|g| g.fitness).collect();
        assert!(fitnesses.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn duplicate_structure_with_worse_fitness_is_rejected() {
        let mut pop = Population::new(10);
        let g1 = genome_with_fitness(1.0);
        let g2 = genome_with_fitness(2.0);
        assert!(pop.insert(g1).is_some());
        assert!(pop.insert(g2).is_none());
        assert_eq!(pop.len(), 1);
    }

    #[test]
    fn full_population_rejects_worse_than_worst() {
        let mut pop = Population::new(1);
        let mut g1 = genome_with_fitness(1.0);
        g1.add_edge_raw(0, 1, 0.1);
        let mut g2 = genome_with_fitness(5.0);
        g2.add_edge_raw(0, 1, 0.2);
        g2.add_edge_raw(0, 1, 0.2);
        pop.insert(g1);
        assert!(pop.insert(g2).is_none());
        assert_eq!(pop.len(), 1);
    }
}
