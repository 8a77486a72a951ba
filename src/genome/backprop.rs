//! Backpropagation-through-time with one-step truncation (see module-level
//! note in [`crate::node::cell`]). Supports batch (parallel over a fixed
//! worker pool, one evaluator clone per thread) and stochastic (one
//! randomly ordered time series at a time) training.
use super::Genome;
use crate::node::{LayerType, WEIGHT_BOUND};
use crate::weight_update::WeightUpdate;
use rand::seq::SliceRandom;
use rand::Rng;
use rayon::prelude::*;
use std::cell::RefCell;
use thread_local::ThreadLocal;

/// One univariate multi-input/output observation: `inputs[t][feature]`.
#[derive(Debug, Clone)]
pub struct TimeSeries {
    pub inputs: Vec<Vec<f64>>,
    pub outputs: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrainingOutcome {
    Converged,
    Diverged,
}

/// Per-thread forward/backward scratch state so a shared [`Genome`] can be
/// evaluated from many rayon worker threads without per-call allocation.
struct Evaluator {
    node_values: Vec<f64>,
    node_cell_states: Vec<f64>,
    node_scratches: Vec<Vec<f64>>,
}

impl Evaluator {
    fn new(num_nodes: usize) -> Self {
        Self {
            node_values: vec![0.0; num_nodes],
            node_cell_states: vec![0.0; num_nodes],
            node_scratches: vec![Vec::new(); num_nodes],
        }
    }
}

impl Genome {
    /// Runs truncated BPTT for `bp_iterations` over `series`, updating
    /// `self.best_parameters` and `self.fitness` (validation MSE) in place.
    /// A `NaN`/`inf` gradient at any iteration aborts training and marks the
    /// genome dead (`fitness = NaN`), distinct from [`super::EXAMM_MAX_DOUBLE`]
    /// which only ever means "not yet evaluated".
    pub fn train<R: Rng>(
        &mut self,
        training: &[TimeSeries],
        validation: &[TimeSeries],
        bp_iterations: usize,
        learning_rate: f64,
        stochastic: bool,
        optimizer: &mut dyn WeightUpdate,
        rng: &mut R,
    ) -> TrainingOutcome {
        let mut weights = self.get_weights();
        let pool = ThreadLocal::new();
        let mut order: Vec<usize> = (0..training.len()).collect();

        for _iteration in 0..bp_iterations {
            if stochastic {
                order.shuffle(rng);
            }
            let gradient = if stochastic {
                let mut accum = vec![0.0; weights.len()];
                for &idx in &order {
                    let series = &training[idx];
                    let g = self.gradient_for_series(series, &weights, &pool);
                    for (a, b) in accum.iter_mut().zip(g.iter()) {
                        *a += b;
                    }
                }
                accum
            } else {
                training
                    .par_iter()
                    .map(|series| self.gradient_for_series(series, &weights, &pool))
                    .reduce(
                        || vec![0.0; weights.len()],
                        |mut acc, g| {
                            for (a, b) in acc.iter_mut().zip(g.iter()) {
                                *a += b;
                            }
                            acc
                        },
                    )
            };

            if gradient.iter().any(|g| !g.is_finite()) {
                self.fitness = f64::NAN;
                return TrainingOutcome::Diverged;
            }

            optimizer.apply(&mut weights, &gradient, learning_rate);
            for w in weights.iter_mut() {
                *w = w.clamp(-WEIGHT_BOUND, WEIGHT_BOUND);
            }
            self.set_weights(&weights);
        }

        let mse = self.validation_mse(validation, &pool);
        if !mse.is_finite() {
            self.fitness = f64::NAN;
            return TrainingOutcome::Diverged;
        }
        if mse < self.best_validation_mse {
            self.best_validation_mse = mse;
            self.best_validation_mae = self.validation_mae(validation, &pool);
            self.best_parameters = weights;
        }
        self.fitness = self.best_validation_mse;
        TrainingOutcome::Converged
    }

    fn gradient_for_series(
        &self,
        series: &TimeSeries,
        weights: &[f64],
        pool: &ThreadLocal<RefCell<Evaluator>>,
    ) -> Vec<f64> {
        let cell = pool.get_or(|| RefCell::new(Evaluator::new(self.nodes.len())));
        let mut evaluator = cell.borrow_mut();
        self.backward_through_series(series, weights, &mut evaluator)
    }

    fn forward_step(
        &self,
        evaluator: &mut Evaluator,
        weights: &[f64],
        t: usize,
        inputs: &[f64],
        history: &mut Vec<Vec<f64>>,
    ) {
        let mut node_weight_offsets = vec![0usize; self.nodes.len()];
        let mut cursor = 0;
        for (i, node) in self.nodes.iter().enumerate() {
            node_weight_offsets[i] = cursor;
            cursor += node.num_weights();
        }

        for (i, node) in self.nodes.iter().enumerate() {
            if matches!(node.layer_type, LayerType::Input) {
                let feature_idx = self
                    .input_parameter_names
                    .iter()
                    .position(|n| Some(n.as_str()) == node.parameter_name.as_deref())
                    .unwrap_or(0);
                evaluator.node_values[i] = inputs.get(feature_idx).copied().unwrap_or(0.0);
            }
        }

        let mut incoming = vec![0.0; self.nodes.len()];
        for edge in self.edges.iter().filter(|e| e.enabled && e.reachable()) {
            incoming[edge.output_node] += weights[self.edge_weight_offset(edge)] * evaluator.node_values[edge.input_node];
        }
        for edge in self.recurrent_edges.iter().filter(|e| e.enabled && e.reachable()) {
            if t >= edge.recurrent_depth {
                let past = &history[t - edge.recurrent_depth];
                incoming[edge.output_node] +=
                    weights[self.recurrent_weight_offset(edge)] * past[edge.input_node];
            }
        }

        for (i, node) in self.nodes.iter().enumerate() {
            if matches!(node.layer_type, LayerType::Input) {
                continue;
            }
            let node_weights = &weights[node_weight_offsets[i]..node_weight_offsets[i] + node.cell_kind.num_weights()];
            let h_prev = evaluator.node_values[i];
            let c_prev = evaluator.node_cell_states[i];
            let (out, scratch, c_new) =
                node.cell_kind.forward(node_weights, incoming[i], h_prev, c_prev);
            evaluator.node_values[i] = out;
            evaluator.node_cell_states[i] = c_new;
            evaluator.node_scratches[i] = scratch;
        }
    }

    fn edge_weight_offset(&self, edge: &crate::edge::Edge) -> usize {
        let node_weights: usize = self.nodes.iter().map(|n| n.num_weights()).sum();
        let position = self.edges.iter().position(|e| e.innovation == edge.innovation).unwrap();
        node_weights + position
    }

    fn recurrent_weight_offset(&self, edge: &crate::edge::RecurrentEdge) -> usize {
        let node_weights: usize = self.nodes.iter().map(|n| n.num_weights()).sum();
        let edge_weights = self.edges.len();
        let position = self
            .recurrent_edges
            .iter()
            .position(|e| e.innovation == edge.innovation)
            .unwrap();
        node_weights + edge_weights + position
    }

    fn backward_through_series(
        &self,
        series: &TimeSeries,
        weights: &[f64],
        evaluator: &mut Evaluator,
    ) -> Vec<f64> {
        let mut gradient = vec![0.0; weights.len()];
        let mut history: Vec<Vec<f64>> = Vec::with_capacity(series.inputs.len());

        for (t, inputs) in series.inputs.iter().enumerate() {
            self.forward_step(evaluator, weights, t, inputs, &mut history);
            history.push(evaluator.node_values.clone());

            let outputs = &series.outputs[t];
            for (i, node) in self.nodes.iter().enumerate() {
                if !matches!(node.layer_type, LayerType::Output) || !node.enabled {
                    continue;
                }
                let feature_idx = self
                    .output_parameter_names
                    .iter()
                    .position(|n| Some(n.as_str()) == node.parameter_name.as_deref())
                    .unwrap_or(0);
                let target = outputs.get(feature_idx).copied().unwrap_or(0.0);
                let predicted = evaluator.node_values[i];
                let d_out = 2.0 * (predicted - target) / (series.inputs.len() as f64);

                let node_offset = {
                    let node_weights: usize =
                        self.nodes[..i].iter().map(|n| n.num_weights()).sum();
                    node_weights
                };
                let node_weights_slice = &weights
                    [node_offset..node_offset + node.cell_kind.num_weights()];
                let (_d_in, d_weights) = node.cell_kind.backward(
                    node_weights_slice,
                    &evaluator.node_scratches[i],
                    history.get(t.wrapping_sub(1)).map(|h| h[i]).unwrap_or(0.0),
                    d_out,
                );
                for (g, d) in gradient[node_offset..node_offset + d_weights.len()]
                    .iter_mut()
                    .zip(d_weights.iter())
                {
                    *g += d;
                }
            }
        }
        gradient
    }

    fn validation_mse(&self, validation: &[TimeSeries], pool: &ThreadLocal<RefCell<Evaluator>>) -> f64 {
        let weights = self.get_weights();
        let (sum, count) = validation
            .iter()
            .map(|series| self.series_squared_error(series, &weights, pool))
            .fold((0.0, 0usize), |(sa, ca), (s, c)| (sa + s, ca + c));
        if count == 0 {
            return super::EXAMM_MAX_DOUBLE;
        }
        sum / count as f64
    }

    fn validation_mae(&self, validation: &[TimeSeries], pool: &ThreadLocal<RefCell<Evaluator>>) -> f64 {
        let weights = self.get_weights();
        let (sum, count) = validation
            .iter()
            .map(|series| self.series_absolute_error(series, &weights, pool))
            .fold((0.0, 0usize), |(sa, ca), (s, c)| (sa + s, ca + c));
        if count == 0 {
            return super::EXAMM_MAX_DOUBLE;
        }
        sum / count as f64
    }

    fn series_squared_error(
        &self,
        series: &TimeSeries,
        weights: &[f64],
        pool: &ThreadLocal<RefCell<Evaluator>>,
    ) -> (f64, usize) {
        let cell = pool.get_or(|| RefCell::new(Evaluator::new(self.nodes.len())));
        let mut evaluator = cell.borrow_mut();
        let mut history = Vec::with_capacity(series.inputs.len());
        let mut sum = 0.0;
        let mut count = 0;
        for (t, inputs) in series.inputs.iter().enumerate() {
            self.forward_step(&mut evaluator, weights, t, inputs, &mut history);
            history.push(evaluator.node_values.clone());
            for (i, node) in self.nodes.iter().enumerate() {
                if !matches!(node.layer_type, LayerType::Output) || !node.enabled {
                    continue;
                }
                let feature_idx = self
                    .output_parameter_names
                    .iter()
                    .position(|n| Some(n.as_str()) == node.parameter_name.as_deref())
                    .unwrap_or(0);
                let target = series.outputs[t].get(feature_idx).copied().unwrap_or(0.0);
                let err = evaluator.node_values[i] - target;
                sum += err * err;
                count += 1;
            }
        }
        (sum, count)
    }

    fn series_absolute_error(
        &self,
        series: &TimeSeries,
        weights: &[f64],
        pool: &ThreadLocal<RefCell<Evaluator>>,
    ) -> (f64, usize) {
        let cell = pool.get_or(|| RefCell::new(Evaluator::new(self.nodes.len())));
        let mut evaluator = cell.borrow_mut();
        let mut history = Vec::with_capacity(series.inputs.len());
        let mut sum = 0.0;
        let mut count = 0;
        for (t, inputs) in series.inputs.iter().enumerate() {
            self.forward_step(&mut evaluator, weights, t, inputs, &mut history);
            history.push(evaluator.node_values.clone());
            for (i, node) in self.nodes.iter().enumerate() {
                if !matches!(node.layer_type, LayerType::Output) || !node.enabled {
                    continue;
                }
                let feature_idx = self
                    .output_parameter_names
                    .iter()
                    .position(|n| Some(n.as_str()) == node.parameter_name.as_deref())
                    .unwrap_or(0);
                let target = series.outputs[t].get(feature_idx).copied().unwrap_or(0.0);
                sum += (evaluator.node_values[i] - target).abs();
                count += 1;
            }
        }
        (sum, count)
    }

    /// Re-scores this genome against `validation` using its
    /// `best_parameters`, without any further training. Used to keep an
    /// elite's fitness current as the validation window slides forward.
    pub fn evaluate_validation(&mut self, validation: &[TimeSeries]) -> f64 {
        let pool = ThreadLocal::new();
        let weights = self.best_parameters.clone();
        let (sum, count) = validation
            .iter()
            .map(|series| self.series_squared_error(series, &weights, &pool))
            .fold((0.0, 0usize), |(sa, ca), (s, c)| (sa + s, ca + c));
        let mse = if count == 0 { super::EXAMM_MAX_DOUBLE } else { sum / count as f64 };
        self.fitness = mse;
        if mse < self.best_validation_mse {
            self.best_validation_mse = mse;
        }
        mse
    }

    /// Produces predictions for one series using `self.best_parameters`.
    pub fn predict(&self, series: &TimeSeries) -> Vec<Vec<f64>> {
        let weights = self.best_parameters.clone();
        let mut evaluator = Evaluator::new(self.nodes.len());
        let mut history = Vec::with_capacity(series.inputs.len());
        let mut predictions = Vec::with_capacity(series.inputs.len());
        for (t, inputs) in series.inputs.iter().enumerate() {
            self.forward_step(&mut evaluator, &weights, t, inputs, &mut history);
            history.push(evaluator.node_values.clone());
            let row: Vec<f64> = self
                .nodes
                .iter()
                .enumerate()
                .filter(|(_, n)| matches!(n.layer_type, LayerType::Output) && n.enabled)
                .map(|(i, _)| evaluator.node_values[i])
                .collect();
            predictions.push(row);
        }
        predictions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::CellKind;
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
    fn training_produces_finite_fitness_on_well_behaved_series() {
        let mut genome = Genome::new_seed(vec!["x".into()], vec!["y".into()], CellKind::Simple);
        let series = vec![flat_series(5)];
        let mut optimizer = Sgd;
        let mut rng = SmallRng::seed_from_u64(42);
        let outcome = genome.train(&series, &series, 3, 0.01, false, &mut optimizer, &mut rng);
        assert_eq!(outcome, TrainingOutcome::Converged);
        assert!(genome.fitness.is_finite());
    }

    #[test]
    fn predict_returns_one_row_per_timestep() {
        let genome = Genome::new_seed(vec!["x".into()], vec!["y".into()], CellKind::Simple);
        let series = flat_series(4);
        let predictions = genome.predict(&series);
        assert_eq!(predictions.len(), 4);
    }
}
