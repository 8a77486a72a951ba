//! Structural and weight mutation operators.
use super::Genome;
use crate::node::{CellKind, LayerType};
use rand::Rng;

/// Per-operation outcome: `Ok(())` when the genome's reachability was
/// recomputed and every output stayed reachable, `Err` when the candidate
/// mutation would orphan an output and was rolled back.
pub type MutateResult = Result<(), crate::error::OutputsUnreachableError>;

impl Genome {
    fn try_commit<F: FnOnce(&mut Genome)>(&mut self, apply: F) -> MutateResult {
        let before = self.clone();
        apply(self);
        self.assign_reachability();
        if self.outputs_unreachable() {
            *self = before;
            return Err(crate::error::OutputsUnreachableError);
        }
        Ok(())
    }

    /// Adds a new enabled forward edge between two existing nodes with
    /// strictly increasing depth and no pre-existing edge between them.
    pub fn mutate_add_edge<R: Rng>(&mut self, rng: &mut R) -> MutateResult {
        let candidates: Vec<(usize, usize)> = self
            .nodes
            .iter()
            .enumerate()
            .flat_map(|(u, nu)| {
                self.nodes.iter().enumerate().filter_map(move |(v, nv)| {
                    if u != v && nu.depth < nv.depth && self.find_edge(u, v).is_none() {
                        Some((u, v))
                    } else {
                        None
                    }
                })
            })
            .collect();
        if candidates.is_empty() {
            return Ok(());
        }
        let (u, v) = candidates[rng.gen_range(0..candidates.len())];
        let weight = rng.gen_range(-0.5..0.5);
        self.try_commit(|g| {
            g.add_edge_raw(u, v, weight);
        })
    }

    /// Adds a recurrent edge `u -> v` with a randomly chosen delay in
    /// `[min_recurrent_depth, max_recurrent_depth]`.
    pub fn mutate_add_recurrent_edge<R: Rng>(
        &mut self,
        rng: &mut R,
        min_recurrent_depth: usize,
        max_recurrent_depth: usize,
    ) -> MutateResult {
        if self.nodes.is_empty() {
            return Ok(());
        }
        let u = rng.gen_range(0..self.nodes.len());
        let v = rng.gen_range(0..self.nodes.len());
        let depth = rng.gen_range(min_recurrent_depth..=max_recurrent_depth.max(min_recurrent_depth));
        if self.find_recurrent_edge(u, v, depth).is_some() {
            return Ok(());
        }
        let weight = rng.gen_range(-0.5..0.5);
        self.try_commit(|g| {
            g.add_recurrent_edge_raw(u, v, depth, weight);
        })
    }

    pub fn mutate_disable_edge<R: Rng>(&mut self, rng: &mut R) -> MutateResult {
        let enabled: Vec<usize> = self
            .edges
            .iter()
            .enumerate()
            .filter(|(_, e)| e.enabled)
            .map(|(i, _)| i)
            .collect();
        if enabled.is_empty() {
            return Ok(());
        }
        let idx = enabled[rng.gen_range(0..enabled.len())];
        self.try_commit(|g| g.edges[idx].enabled = false)
    }

    pub fn mutate_enable_edge<R: Rng>(&mut self, rng: &mut R) -> MutateResult {
        let disabled: Vec<usize> = self
            .edges
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.enabled)
            .map(|(i, _)| i)
            .collect();
        if disabled.is_empty() {
            return Ok(());
        }
        let idx = disabled[rng.gen_range(0..disabled.len())];
        self.try_commit(|g| g.edges[idx].enabled = true)
    }

    pub fn mutate_disable_node<R: Rng>(&mut self, rng: &mut R) -> MutateResult {
        let hidden: Vec<usize> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| matches!(n.layer_type, LayerType::Hidden) && n.enabled)
            .map(|(i, _)| i)
            .collect();
        if hidden.is_empty() {
            return Ok(());
        }
        let idx = hidden[rng.gen_range(0..hidden.len())];
        self.try_commit(|g| g.nodes[idx].enabled = false)
    }

    /// Splits an enabled edge `u -> v` into `u -> m -> v`, disabling the
    /// original. `m` is a fresh hidden node at the midpoint depth.
    pub fn mutate_split_edge<R: Rng>(&mut self, rng: &mut R, cell_kind: CellKind) -> MutateResult {
        let enabled: Vec<usize> = self
            .edges
            .iter()
            .enumerate()
            .filter(|(_, e)| e.enabled)
            .map(|(i, _)| i)
            .collect();
        if enabled.is_empty() {
            return Ok(());
        }
        let edge_idx = enabled[rng.gen_range(0..enabled.len())];
        let (u, v) = (self.edges[edge_idx].input_node, self.edges[edge_idx].output_node);
        let mid_depth = (self.nodes[u].depth + self.nodes[v].depth) / 2.0;
        self.try_commit(|g| {
            g.edges[edge_idx].enabled = false;
            let m = g.push_node(LayerType::Hidden, cell_kind, mid_depth);
            g.add_edge_raw(u, m, 1.0);
            g.add_edge_raw(m, v, g.edges[edge_idx].weight);
        })
    }

    /// Inserts a fresh hidden node wired from a random shallower node to a
    /// random deeper one.
    pub fn mutate_add_node<R: Rng>(&mut self, rng: &mut R, cell_kind: CellKind) -> MutateResult {
        if self.nodes.len() < 2 {
            return Ok(());
        }
        let u = rng.gen_range(0..self.nodes.len());
        let v = rng.gen_range(0..self.nodes.len());
        let (lo, hi) = if self.nodes[u].depth <= self.nodes[v].depth {
            (u, v)
        } else {
            (v, u)
        };
        if lo == hi {
            return Ok(());
        }
        let mid_depth = (self.nodes[lo].depth + self.nodes[hi].depth) / 2.0;
        self.try_commit(|g| {
            let m = g.push_node(LayerType::Hidden, cell_kind, mid_depth);
            g.add_edge_raw(lo, m, rng_weight());
            g.add_edge_raw(m, hi, rng_weight());
        })
    }

    /// Re-enables a disabled hidden node, leaving its incident edges exactly
    /// as they were (any still disabled need their own enable-edge mutation).
    pub fn mutate_enable_node<R: Rng>(&mut self, rng: &mut R) -> MutateResult {
        let disabled: Vec<usize> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| matches!(n.layer_type, LayerType::Hidden) && !n.enabled)
            .map(|(i, _)| i)
            .collect();
        if disabled.is_empty() {
            return Ok(());
        }
        let idx = disabled[rng.gen_range(0..disabled.len())];
        self.try_commit(|g| g.nodes[idx].enabled = true)
    }

    /// Splits an enabled, reachable hidden node's incident edges into two
    /// random groups, disables the node, and routes each group through a
    /// fresh replacement node at the group's mean incident depth.
    pub fn mutate_split_node<R: Rng>(&mut self, rng: &mut R, cell_kind: CellKind) -> MutateResult {
        let hidden: Vec<usize> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| matches!(n.layer_type, LayerType::Hidden) && n.enabled && n.reachable())
            .map(|(i, _)| i)
            .collect();
        if hidden.is_empty() {
            return Ok(());
        }
        let node_idx = hidden[rng.gen_range(0..hidden.len())];

        let incoming: Vec<usize> = self
            .edges
            .iter()
            .enumerate()
            .filter(|(_, e)| e.enabled && e.output_node == node_idx)
            .map(|(i, _)| i)
            .collect();
        let outgoing: Vec<usize> = self
            .edges
            .iter()
            .enumerate()
            .filter(|(_, e)| e.enabled && e.input_node == node_idx)
            .map(|(i, _)| i)
            .collect();
        let incoming_set: std::collections::HashSet<usize> = incoming.iter().copied().collect();
        let mut touching = incoming;
        touching.extend(outgoing);
        if touching.len() < 2 {
            return Ok(());
        }

        use rand::seq::SliceRandom;
        touching.shuffle(rng);
        let split_at = rng.gen_range(1..touching.len());
        let (group_a, group_b) = touching.split_at(split_at);
        let (group_a, group_b) = (group_a.to_vec(), group_b.to_vec());

        let depth_of = |edge_idx: usize| -> f64 {
            if incoming_set.contains(&edge_idx) {
                self.nodes[self.edges[edge_idx].input_node].depth
            } else {
                self.nodes[self.edges[edge_idx].output_node].depth
            }
        };
        let mean_depth = |group: &[usize]| -> f64 {
            group.iter().map(|&e| depth_of(e)).sum::<f64>() / group.len() as f64
        };
        let depth_a = mean_depth(&group_a);
        let depth_b = mean_depth(&group_b);
        let is_jordan = matches!(self.nodes[node_idx].cell_kind, CellKind::Jordan);
        let is_elman = matches!(self.nodes[node_idx].cell_kind, CellKind::Elman);

        self.try_commit(|g| {
            g.nodes[node_idx].enabled = false;
            let a = g.push_node(LayerType::Hidden, cell_kind, depth_a);
            let b = g.push_node(LayerType::Hidden, cell_kind, depth_b);
            for (group, replacement) in [(&group_a, a), (&group_b, b)] {
                for &edge_idx in group.iter() {
                    let is_incoming = g.edges[edge_idx].output_node == node_idx;
                    let weight = g.edges[edge_idx].weight;
                    g.edges[edge_idx].enabled = false;
                    if is_incoming {
                        let source = g.edges[edge_idx].input_node;
                        g.add_edge_raw(source, replacement, weight);
                    } else {
                        let target = g.edges[edge_idx].output_node;
                        g.add_edge_raw(replacement, target, weight);
                    }
                }
                if is_jordan || is_elman {
                    g.add_recurrent_edge_raw(replacement, replacement, 1, 1.0);
                }
            }
        })
    }

    /// Merges two enabled hidden nodes into a fresh replacement node at their
    /// average depth. The union of their enabled incident edges is
    /// redirected onto the replacement, deduped by `(input, output)` so the
    /// merge never produces parallel edges.
    pub fn mutate_merge_node(&mut self, a: usize, b: usize) -> MutateResult {
        if a == b || a >= self.nodes.len() || b >= self.nodes.len() {
            return Ok(());
        }
        if !matches!(self.nodes[a].layer_type, LayerType::Hidden)
            || !matches!(self.nodes[b].layer_type, LayerType::Hidden)
            || !self.nodes[a].enabled
            || !self.nodes[b].enabled
        {
            return Ok(());
        }
        let avg_depth = (self.nodes[a].depth + self.nodes[b].depth) / 2.0;
        let cell_kind = self.nodes[a].cell_kind;
        self.try_commit(|g| {
            let replacement = g.push_node(LayerType::Hidden, cell_kind, avg_depth);
            g.nodes[a].enabled = false;
            g.nodes[b].enabled = false;

            let mut seen: std::collections::HashSet<(usize, usize)> = std::collections::HashSet::new();
            let mut redirected = Vec::new();
            for edge in g.edges.iter() {
                if !edge.enabled {
                    continue;
                }
                let touches_a_or_b = edge.input_node == a
                    || edge.input_node == b
                    || edge.output_node == a
                    || edge.output_node == b;
                if !touches_a_or_b {
                    continue;
                }
                let u = if edge.input_node == a || edge.input_node == b {
                    replacement
                } else {
                    edge.input_node
                };
                let v = if edge.output_node == a || edge.output_node == b {
                    replacement
                } else {
                    edge.output_node
                };
                if u == v || !seen.insert((u, v)) {
                    continue;
                }
                redirected.push((u, v, edge.weight));
            }
            for edge in g.edges.iter_mut() {
                if edge.input_node == a || edge.input_node == b || edge.output_node == a || edge.output_node == b {
                    edge.enabled = false;
                }
            }
            for (u, v, w) in redirected {
                g.add_edge_raw(u, v, w);
            }
        })
    }

    /// Adds the canonical Jordan-style self loop: output node feeds back to
    /// itself with a one-step delay.
    pub fn add_jordan_loop(&mut self, output_node: usize) -> MutateResult {
        self.try_commit(|g| {
            g.add_recurrent_edge_raw(output_node, output_node, 1, 1.0);
        })
    }

    /// Adds the canonical Elman-style loop: each hidden node feeds back to
    /// itself with a one-step delay.
    pub fn add_elman_loops(&mut self) -> MutateResult {
        let hidden: Vec<usize> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| matches!(n.layer_type, LayerType::Hidden))
            .map(|(i, _)| i)
            .collect();
        self.try_commit(|g| {
            for h in hidden {
                g.add_recurrent_edge_raw(h, h, 1, 1.0);
            }
        })
    }
}

fn rng_weight() -> f64 {
    0.1
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn seed() -> Genome {
        Genome::new_seed(
            vec!["a".into(), "b".into()],
            vec!["y".into()],
            CellKind::Simple,
        )
    }

    #[test]
    fn add_edge_keeps_outputs_reachable() {
        let mut genome = seed();
        let mut rng = SmallRng::seed_from_u64(1);
        genome.mutate_add_node(&mut rng, CellKind::Simple).unwrap();
        genome.mutate_add_edge(&mut rng).unwrap();
        assert!(!genome.outputs_unreachable());
    }

    #[test]
    fn disabling_last_output_edge_is_rejected() {
        let mut genome = seed();
        // Disable every input -> output edge one at a time; only the last
        // one that cuts reachability should be rejected.
        let edges: Vec<usize> = (0..genome.edges.len()).collect();
        let mut last_result = Ok(());
        for idx in edges {
            if genome.edges[idx].enabled {
                last_result = genome.try_commit(|g| g.edges[idx].enabled = false);
            }
        }
        assert!(last_result.is_err() || !genome.outputs_unreachable());
    }

    #[test]
    fn split_edge_preserves_reachability() {
        let mut genome = seed();
        let mut rng = SmallRng::seed_from_u64(7);
        genome.mutate_split_edge(&mut rng, CellKind::Simple).unwrap();
        assert!(!genome.outputs_unreachable());
    }
}
