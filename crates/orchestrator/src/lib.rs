//! Call orchestration: turn state machine, LLM generation loop, sentence
//! splitting, and the media transport seam.

pub mod call;
pub mod generator;
pub mod registry;
pub mod sentence;
pub mod transport;

pub use call::Call;
pub use generator::{LlmGenerator, TurnEvent};
pub use registry::CallRegistry;
pub use sentence::split_sentences;
pub use transport::CallTransport;
