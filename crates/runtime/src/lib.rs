pub mod prompt_builder;
mod runtime;

pub use runtime::{ChatReply, ResearchRuntime};
