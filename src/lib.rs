//! Island-speciated neuro-evolution of recurrent network topologies over
//! an online time-series stream.
//!
//! A population of candidate recurrent networks ([`genome::Genome`]) is
//! organized into isolated [`island::Island`]s, each mutated and crossed
//! over independently and periodically re-seeded from the best performers
//! elsewhere ([`strategy::island_speciation`]). The online variant
//! ([`strategy::onenas`]) advances through a time-series stream one episode
//! at a time, training each generation's candidate via truncated
//! backpropagation-through-time ([`genome::backprop`]) against a window
//! selected by the [`scheduler`].
pub mod config;
pub mod controller;
pub mod edge;
pub mod error;
pub mod genome;
pub mod island;
pub mod logging;
pub mod node;
pub mod output;
pub mod population;
pub mod scheduler;
pub mod serialize_helpers;
pub mod strategy;
pub mod weight_update;

pub use config::Config;
pub use controller::GenerationalController;
pub use genome::Genome;
pub use island::Island;
pub use population::Population;
