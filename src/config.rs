//! Key-value configuration, parsed into a validated struct.
use crate::error::ConfigError;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainDataSampler {
    Uniform,
    Per,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RnnType {
    Lstm,
    Gru,
    Delta,
    Mgu,
    Ugrnn,
    Ff,
    Jordan,
    Elman,
    Dnas,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepopulationMethod {
    RandomParents,
    BestParents,
    BestGenome,
    BestIsland,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IslandRankingMethod {
    EraseWorst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferLearningVersion {
    V1,
    V2,
    V3,
    V1V2,
    V1V3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeControlMethod {
    ReduceMutationRate,
    ReduceAddMutation,
    None,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub std_message_level: crate::logging::MessageLevel,
    pub file_message_level: crate::logging::MessageLevel,
    pub output_directory: String,
    pub write_to_file: bool,
    pub max_header_length: usize,
    pub max_message_length: usize,
    pub time_offset: usize,

    pub num_validation_sets: usize,
    pub num_training_sets: usize,
    pub num_test_sets: usize,

    pub get_train_data_by: TrainDataSampler,
    pub start_score_tracking_generation: usize,
    pub temperature: f64,

    pub bp_iterations: usize,
    pub learning_rate: f64,
    pub stochastic: bool,

    pub rnn_type: RnnType,
    pub num_hidden_layers: usize,
    pub max_recurrent_depth: usize,
    pub min_recurrent_depth: usize,

    pub repopulation_method: RepopulationMethod,
    pub island_ranking_method: IslandRankingMethod,
    pub repopulation_frequency: usize,
    pub islands_to_exterminate: usize,
    pub repeat_extinction: bool,

    pub transfer_learning: bool,
    pub transfer_learning_version: TransferLearningVersion,
    pub seed_stirs: usize,
    pub tl_epigenetic_weights: bool,

    pub control_size_method: SizeControlMethod,
    pub compare_with_naive: bool,

    pub mutation_rate: f64,
    pub intra_island_crossover_rate: f64,
    pub inter_island_crossover_rate: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            std_message_level: crate::logging::MessageLevel::Info,
            file_message_level: crate::logging::MessageLevel::None,
            output_directory: "output".to_string(),
            write_to_file: false,
            max_header_length: 1024,
            max_message_length: 4096,
            time_offset: 1,

            num_validation_sets: 2,
            num_training_sets: 10,
            num_test_sets: 1,

            get_train_data_by: TrainDataSampler::Uniform,
            start_score_tracking_generation: 0,
            temperature: 1.0,

            bp_iterations: 10,
            learning_rate: 0.001,
            stochastic: false,

            rnn_type: RnnType::Lstm,
            num_hidden_layers: 1,
            max_recurrent_depth: 5,
            min_recurrent_depth: 1,

            repopulation_method: RepopulationMethod::BestParents,
            island_ranking_method: IslandRankingMethod::EraseWorst,
            repopulation_frequency: 10,
            islands_to_exterminate: 1,
            repeat_extinction: false,

            transfer_learning: false,
            transfer_learning_version: TransferLearningVersion::V1,
            seed_stirs: 0,
            tl_epigenetic_weights: true,

            control_size_method: SizeControlMethod::None,
            compare_with_naive: true,

            mutation_rate: 0.7,
            intra_island_crossover_rate: 0.2,
            inter_island_crossover_rate: 0.1,
        }
    }
}

impl Config {
    /// Parses `key = value` lines, one option per line, `#` starts a comment.
    /// Unknown keys and unknown enum-valued options are fatal config errors.
    pub fn parse(source: &str) -> Result<Self, ConfigError> {
        let mut raw: HashMap<String, String> = HashMap::new();
        for line in source.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| {
                ConfigError(format!("malformed config line (expected 'key = value'): {line}"))
            })?;
            raw.insert(key.trim().to_string(), value.trim().to_string());
        }

        let mut config = Config::default();
        for (key, value) in raw {
            config.apply(&key, &value)?;
        }
        Ok(config)
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        macro_rules! parse_num {
            ($field:expr, $ty:ty) => {
                $field = value
                    .parse::<$ty>()
                    .map_err(|_| ConfigError(format!("invalid value for {key}: {value}")))?
            };
        }
        match key {
            "std_message_level" => {
                self.std_message_level = crate::logging::MessageLevel::parse(value)
                    .ok_or_else(|| ConfigError(format!("unknown message level: {value}")))?
            }
            "file_message_level" => {
                self.file_message_level = crate::logging::MessageLevel::parse(value)
                    .ok_or_else(|| ConfigError(format!("unknown message level: {value}")))?
            }
            "output_directory" => self.output_directory = value.to_string(),
            "write_to_file" => parse_num!(self.write_to_file, bool),
            "max_header_length" => parse_num!(self.max_header_length, usize),
            "max_message_length" => parse_num!(self.max_message_length, usize),
            "time_offset" => parse_num!(self.time_offset, usize),
            "num_validation_sets" => parse_num!(self.num_validation_sets, usize),
            "num_training_sets" => parse_num!(self.num_training_sets, usize),
            "num_test_sets" => parse_num!(self.num_test_sets, usize),
            "get_train_data_by" => {
                self.get_train_data_by = match value.to_ascii_lowercase().as_str() {
                    "uniform" => TrainDataSampler::Uniform,
                    "per" => TrainDataSampler::Per,
                    _ => return Err(ConfigError(format!("unknown sampler: {value}"))),
                }
            }
            "start_score_tracking_generation" => {
                parse_num!(self.start_score_tracking_generation, usize)
            }
            "temperature" => parse_num!(self.temperature, f64),
            "bp_iterations" => parse_num!(self.bp_iterations, usize),
            "learning_rate" => parse_num!(self.learning_rate, f64),
            "stochastic" => parse_num!(self.stochastic, bool),
            "rnn_type" => {
                self.rnn_type = match value.to_ascii_lowercase().as_str() {
                    "lstm" => RnnType::Lstm,
                    "gru" => RnnType::Gru,
                    "delta" => RnnType::Delta,
                    "mgu" => RnnType::Mgu,
                    "ugrnn" => RnnType::Ugrnn,
                    "ff" => RnnType::Ff,
                    "jordan" => RnnType::Jordan,
                    "elman" => RnnType::Elman,
                    "dnas" => RnnType::Dnas,
                    _ => return Err(ConfigError(format!("unknown rnn_type: {value}"))),
                }
            }
            "num_hidden_layers" => parse_num!(self.num_hidden_layers, usize),
            "max_recurrent_depth" => parse_num!(self.max_recurrent_depth, usize),
            "min_recurrent_depth" => parse_num!(self.min_recurrent_depth, usize),
            "repopulation_method" => {
                self.repopulation_method = match value.to_ascii_lowercase().as_str() {
                    "random-parents" | "random_parents" => RepopulationMethod::RandomParents,
                    "best-parents" | "best_parents" => RepopulationMethod::BestParents,
                    "best-genome" | "best_genome" => RepopulationMethod::BestGenome,
                    "best-island" | "best_island" => RepopulationMethod::BestIsland,
                    _ => return Err(ConfigError(format!("unknown repopulation_method: {value}"))),
                }
            }
            "island_ranking_method" => {
                self.island_ranking_method = match value.to_ascii_lowercase().as_str() {
                    "erase_worst" | "erase-worst" | "eraseworst" => IslandRankingMethod::EraseWorst,
                    _ => {
                        return Err(ConfigError(format!(
                            "unknown island_ranking_method: {value}"
                        )))
                    }
                }
            }
            "repopulation_frequency" => parse_num!(self.repopulation_frequency, usize),
            "islands_to_exterminate" => parse_num!(self.islands_to_exterminate, usize),
            "repeat_extinction" => parse_num!(self.repeat_extinction, bool),
            "transfer_learning" => parse_num!(self.transfer_learning, bool),
            "transfer_learning_version" => {
                self.transfer_learning_version = match value.to_ascii_lowercase().as_str() {
                    "v1" => TransferLearningVersion::V1,
                    "v2" => TransferLearningVersion::V2,
                    "v3" => TransferLearningVersion::V3,
                    "v1+v2" => TransferLearningVersion::V1V2,
                    "v1+v3" => TransferLearningVersion::V1V3,
                    _ => {
                        return Err(ConfigError(format!(
                            "unknown transfer_learning_version: {value}"
                        )))
                    }
                }
            }
            "seed_stirs" => parse_num!(self.seed_stirs, usize),
            "tl_epigenetic_weights" => parse_num!(self.tl_epigenetic_weights, bool),
            "control_size_method" => {
                self.control_size_method = match value.to_ascii_lowercase().as_str() {
                    "reduce_mutation_rate" => SizeControlMethod::ReduceMutationRate,
                    "reduce_add_mutation" => SizeControlMethod::ReduceAddMutation,
                    "none" => SizeControlMethod::None,
                    _ => {
                        return Err(ConfigError(format!(
                            "unknown control_size_method: {value}"
                        )))
                    }
                }
            }
            "compare_with_naive" => parse_num!(self.compare_with_naive, bool),
            "mutation_rate" => parse_num!(self.mutation_rate, f64),
            "intra_island_crossover_rate" => parse_num!(self.intra_island_crossover_rate, f64),
            "inter_island_crossover_rate" => parse_num!(self.inter_island_crossover_rate, f64),
            other => return Err(ConfigError(format!("unknown config key: {other}"))),
        }
        Ok(())
    }

    /// The three speciation rates normalized to sum to 1 and accumulated
    /// into thresholds against a single `r ∈ [0,1)` draw: `r < t.0` picks
    /// mutation, `r < t.1` picks intra-island crossover, else inter-island.
    pub fn speciation_thresholds(&self) -> (f64, f64) {
        let total = self.mutation_rate + self.intra_island_crossover_rate + self.inter_island_crossover_rate;
        if total <= 0.0 {
            return (1.0, 1.0);
        }
        let mutation = self.mutation_rate / total;
        let intra = self.intra_island_crossover_rate / total;
        (mutation, mutation + intra)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_keys() {
        let config = Config::parse(
            "num_training_sets = 20\nget_train_data_by = PER\ntemperature = 0.5\n",
        )
        .unwrap();
        assert_eq!(config.num_training_sets, 20);
        assert_eq!(config.get_train_data_by, TrainDataSampler::Per);
        assert!((config.temperature - 0.5).abs() < 1e-12);
    }

    #[test]
    fn rejects_unknown_key() {
        let err = Config::parse("not_a_real_key = 1\n").unwrap_err();
        assert!(err.0.contains("not_a_real_key"));
    }

    #[test]
    fn rejects_unknown_sampler() {
        let err = Config::parse("get_train_data_by = bogus\n").unwrap_err();
        assert!(err.0.contains("sampler"));
    }
}
