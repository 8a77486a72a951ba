//! Transfer-learning schema rewrite: reattaching a trained genome to a new
//! set of input/output parameter names.
use super::Genome;
use crate::config::TransferLearningVersion;
use crate::node::cell::gaussian;
use crate::node::{CellKind, LayerType, Node};
use rand::Rng;
use std::collections::HashSet;

impl Genome {
    /// Rewrites this genome's input/output schema to `new_inputs`/
    /// `new_outputs`. A new I/O name reuses the old node of the same
    /// parameter name if one exists; every old I/O node whose name isn't in
    /// the new schema is physically removed, along with its incident edges.
    /// The freshly created I/O nodes are then reconnected per `version`.
    /// `epigenetic_weights=true` preserves every surviving weight and
    /// freshly initializes only what's new; `false` randomizes every weight
    /// in the rewritten genome into `[-0.5, 0.5]`.
    pub fn rewrite_schema<R: Rng>(
        &mut self,
        new_inputs: &[String],
        new_outputs: &[String],
        version: TransferLearningVersion,
        epigenetic_weights: bool,
        cell_kind: CellKind,
        rng: &mut R,
    ) {
        let (mean, std) = self.weight_mean_std();
        let mu = mean.first().copied().unwrap_or(0.0);
        let sigma = std.first().copied().unwrap_or(1.0);

        let keep_inputs: HashSet<&str> = new_inputs.iter().map(String::as_str).collect();
        let keep_outputs: HashSet<&str> = new_outputs.iter().map(String::as_str).collect();
        let to_remove: Vec<usize> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| match n.layer_type {
                LayerType::Input => !n
                    .parameter_name
                    .as_deref()
                    .is_some_and(|p| keep_inputs.contains(p)),
                LayerType::Output => !n
                    .parameter_name
                    .as_deref()
                    .is_some_and(|p| keep_outputs.contains(p)),
                LayerType::Hidden => false,
            })
            .map(|(i, _)| i)
            .collect();
        self.remove_nodes(to_remove);

        let new_input_idx: Vec<usize> = new_inputs
            .iter()
            .filter(|name| {
                !self.nodes.iter().any(|n| {
                    matches!(n.layer_type, LayerType::Input)
                        && n.parameter_name.as_deref() == Some(name.as_str())
                })
            })
            .map(|name| {
                let innovation = self.next_innovation_number();
                let mut node = Node::new(innovation, LayerType::Input, CellKind::Simple, 0.0);
                node.parameter_name = Some(name.clone());
                node.weights = if epigenetic_weights {
                    vec![gaussian(rng, mu, sigma)]
                } else {
                    vec![rng.gen_range(-0.5..0.5)]
                };
                self.nodes.push(node);
                self.nodes.len() - 1
            })
            .collect();

        let new_output_idx: Vec<usize> = new_outputs
            .iter()
            .filter(|name| {
                !self.nodes.iter().any(|n| {
                    matches!(n.layer_type, LayerType::Output)
                        && n.parameter_name.as_deref() == Some(name.as_str())
                })
            })
            .map(|name| {
                let innovation = self.next_innovation_number();
                let mut node = Node::new(innovation, LayerType::Output, cell_kind, 1.0);
                node.parameter_name = Some(name.clone());
                if epigenetic_weights {
                    node.init_lamarckian(&[mu], &[sigma], rng);
                } else {
                    node.init_uniform(rng);
                }
                self.nodes.push(node);
                self.nodes.len() - 1
            })
            .collect();

        let all_inputs: Vec<usize> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| matches!(n.layer_type, LayerType::Input) && n.enabled)
            .map(|(i, _)| i)
            .collect();
        let all_outputs: Vec<usize> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| matches!(n.layer_type, LayerType::Output) && n.enabled)
            .map(|(i, _)| i)
            .collect();
        let hidden: Vec<usize> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| matches!(n.layer_type, LayerType::Hidden) && n.enabled)
            .map(|(i, _)| i)
            .collect();

        let recurrent_fraction = self.recurrent_fraction();

        if matches!(
            version,
            TransferLearningVersion::V1 | TransferLearningVersion::V1V2 | TransferLearningVersion::V1V3
        ) {
            for &i in &new_input_idx {
                for &o in &all_outputs {
                    self.connect(i, o, recurrent_fraction, epigenetic_weights, mu, sigma, rng);
                }
            }
            for &o in &new_output_idx {
                for &i in &all_inputs {
                    self.connect(i, o, recurrent_fraction, epigenetic_weights, mu, sigma, rng);
                }
            }
        }

        if matches!(version, TransferLearningVersion::V2 | TransferLearningVersion::V1V2) && !hidden.is_empty() {
            let subset_size = gaussian_subset_size(hidden.len(), rng);
            for &i in new_input_idx.iter().chain(new_output_idx.iter()) {
                let is_input = matches!(self.nodes[i].layer_type, LayerType::Input);
                let mut pool = hidden.clone();
                shuffle(&mut pool, rng);
                for &h in pool.iter().take(subset_size) {
                    if is_input {
                        self.connect(i, h, recurrent_fraction, epigenetic_weights, mu, sigma, rng);
                    } else {
                        self.connect(h, i, recurrent_fraction, epigenetic_weights, mu, sigma, rng);
                    }
                }
            }
        }

        if matches!(version, TransferLearningVersion::V3 | TransferLearningVersion::V1V3) {
            for &i in new_input_idx.iter().chain(new_output_idx.iter()) {
                let is_input = matches!(self.nodes[i].layer_type, LayerType::Input);
                for &h in &hidden {
                    if is_input {
                        self.connect(i, h, recurrent_fraction, epigenetic_weights, mu, sigma, rng);
                    } else {
                        self.connect(h, i, recurrent_fraction, epigenetic_weights, mu, sigma, rng);
                    }
                }
            }
        }

        self.assign_reachability();
        self.inject_fallback_edges(rng);
        self.assign_reachability();

        if !epigenetic_weights {
            for edge in self.edges.iter_mut() {
                edge.weight = rng.gen_range(-0.5..0.5);
            }
            for edge in self.recurrent_edges.iter_mut() {
                edge.weight = rng.gen_range(-0.5..0.5);
            }
            for node in self.nodes.iter_mut() {
                node.weights = node.weights.iter().map(|_| rng.gen_range(-0.5..0.5)).collect();
            }
        }

        self.input_parameter_names = new_inputs.to_vec();
        self.output_parameter_names = new_outputs.to_vec();

        self.initial_parameters = self.get_weights();
        self.best_parameters = self.initial_parameters.clone();
        self.fitness = super::EXAMM_MAX_DOUBLE;
        self.best_validation_mse = super::EXAMM_MAX_DOUBLE;
        self.best_validation_mae = super::EXAMM_MAX_DOUBLE;
    }

    /// Current fraction of enabled connections that are recurrent; used to
    /// bias new transfer-learning connections toward the same mix.
    fn recurrent_fraction(&self) -> f64 {
        let forward = self.edges.iter().filter(|e| e.enabled).count();
        let recurrent = self.recurrent_edges.iter().filter(|e| e.enabled).count();
        let total = forward + recurrent;
        if total == 0 {
            0.0
        } else {
            recurrent as f64 / total as f64
        }
    }

    /// Adds an edge `u -> v` if one doesn't already exist, picking forward
    /// vs. one-step recurrent by `recurrent_fraction`.
    fn connect<R: Rng>(
        &mut self,
        u: usize,
        v: usize,
        recurrent_fraction: f64,
        epigenetic_weights: bool,
        mu: f64,
        sigma: f64,
        rng: &mut R,
    ) {
        let weight = if epigenetic_weights {
            gaussian(rng, mu, sigma)
        } else {
            rng.gen_range(-0.5..0.5)
        };
        if rng.gen_bool(recurrent_fraction.clamp(0.0, 1.0)) {
            if self.find_recurrent_edge(u, v, 1).is_none() {
                self.add_recurrent_edge_raw(u, v, 1, weight);
            }
        } else if self.find_edge(u, v).is_none() {
            self.add_edge_raw(u, v, weight);
        }
    }

    /// Guarantees every enabled input/output has at least one incident
    /// enabled edge, injecting a direct input-to-output edge otherwise.
    fn inject_fallback_edges<R: Rng>(&mut self, rng: &mut R) {
        let any_output = self
            .nodes
            .iter()
            .position(|n| matches!(n.layer_type, LayerType::Output) && n.enabled);
        let any_input = self
            .nodes
            .iter()
            .position(|n| matches!(n.layer_type, LayerType::Input) && n.enabled);

        let missing_inputs: Vec<usize> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(i, n)| {
                matches!(n.layer_type, LayerType::Input)
                    && n.enabled
                    && !self.edges.iter().any(|e| e.enabled && e.input_node == *i)
                    && !self.recurrent_edges.iter().any(|e| e.enabled && e.input_node == *i)
            })
            .map(|(i, _)| i)
            .collect();
        if let Some(output) = any_output {
            for input in missing_inputs {
                if self.find_edge(input, output).is_none() {
                    let weight = rng.gen_range(-0.5..0.5);
                    self.add_edge_raw(input, output, weight);
                }
            }
        }

        let missing_outputs: Vec<usize> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(i, n)| {
                matches!(n.layer_type, LayerType::Output)
                    && n.enabled
                    && !self.edges.iter().any(|e| e.enabled && e.output_node == *i)
                    && !self.recurrent_edges.iter().any(|e| e.enabled && e.output_node == *i)
            })
            .map(|(i, _)| i)
            .collect();
        if let Some(input) = any_input {
            for output in missing_outputs {
                if self.find_edge(input, output).is_none() {
                    let weight = rng.gen_range(-0.5..0.5);
                    self.add_edge_raw(input, output, weight);
                }
            }
        }
    }
}

/// Gaussian-sized subset count for transfer v2: `|N(0.5, 0.25)| * hidden_count`,
/// clamped to `[1, hidden_count]`.
fn gaussian_subset_size<R: Rng>(hidden_count: usize, rng: &mut R) -> usize {
    let fraction = gaussian(rng, 0.5, 0.25).abs().min(1.0);
    ((fraction * hidden_count as f64).round() as usize).clamp(1, hidden_count)
}

fn shuffle<R: Rng>(items: &mut [usize], rng: &mut R) {
    use rand::seq::SliceRandom;
    items.shuffle(rng);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn v1_keeps_shared_input_removes_unmatched_and_reconnects() {
        let mut genome = Genome::new_seed(
            vec!["a".into(), "b".into()],
            vec!["y".into()],
            CellKind::Simple,
        );
        let mut rng = SmallRng::seed_from_u64(1);
        genome.rewrite_schema(
            &["a".to_string(), "c".to_string()],
            &["y".to_string(), "z".to_string()],
            TransferLearningVersion::V1,
            true,
            CellKind::Simple,
            &mut rng,
        );

        let input_names: Vec<&str> = genome
            .nodes
            .iter()
            .filter(|n| matches!(n.layer_type, LayerType::Input))
            .filter_map(|n| n.parameter_name.as_deref())
            .collect();
        assert_eq!(input_names.len(), 2);
        assert!(input_names.contains(&"a"));
        assert!(input_names.contains(&"c"));
        assert!(!input_names.contains(&"b"));

        let output_names: Vec<&str> = genome
            .nodes
            .iter()
            .filter(|n| matches!(n.layer_type, LayerType::Output))
            .filter_map(|n| n.parameter_name.as_deref())
            .collect();
        assert_eq!(output_names.len(), 2);
        assert!(output_names.contains(&"y"));
        assert!(output_names.contains(&"z"));

        assert!(!genome.outputs_unreachable());
    }

    #[test]
    fn non_epigenetic_transfer_randomizes_every_weight() {
        let mut genome = Genome::new_seed(
            vec!["a".into(), "b".into()],
            vec!["y".into()],
            CellKind::Simple,
        );
        let mut rng = SmallRng::seed_from_u64(2);
        genome.rewrite_schema(
            &["a".to_string()],
            &["y".to_string()],
            TransferLearningVersion::V1,
            false,
            CellKind::Simple,
            &mut rng,
        );
        assert!(genome.edges.iter().all(|e| (-0.5..0.5).contains(&e.weight)));
    }
}
