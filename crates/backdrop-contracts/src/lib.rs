pub mod error;
pub mod events;
pub mod gallery;
pub mod generation;
pub mod prompts;
pub mod session;

pub use error::BackdropError;
