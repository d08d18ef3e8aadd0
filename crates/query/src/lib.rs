pub mod retriever;
pub mod synthesizer;

pub use retriever::{ContextFragment, MultiHopRetriever, RetrieverOptions};
pub use synthesizer::{Synthesizer, SynthesizerOptions};
