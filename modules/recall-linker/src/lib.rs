pub mod ground_truth;
pub mod input;
pub mod interrupt;
pub mod negatives;
pub mod output;
pub mod resolver;
pub mod stats;

pub use ground_truth::GroundTruthDriver;
pub use input::{load_threads, parse_threads};
pub use interrupt::{InterruptSender, Interrupts};
pub use negatives::NegativeMiner;
pub use resolver::{BookLinker, MentionResolver, MovieLinker};
pub use stats::RunStats;
