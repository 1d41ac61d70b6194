//! Tower middleware layers.
//!
//! - [`traced`]: runs each call of the wrapped service inside a span

pub mod traced;

pub use traced::{TracedLayer, TracedService};
