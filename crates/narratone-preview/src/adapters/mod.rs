//! Concrete collaborator implementations behind the core ports.

mod http_synthesis;
mod process_effects;

pub use http_synthesis::HttpSynthesisProvider;
pub use process_effects::ProcessToolEffects;
