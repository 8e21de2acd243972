pub mod client;
pub mod enrichment;
pub mod prompts;
pub mod types;

pub use client::*;
pub use enrichment::*;
pub use types::*;
