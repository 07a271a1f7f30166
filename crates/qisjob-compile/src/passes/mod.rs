//! Built-in compilation passes.

mod layout;
mod optimization;
mod routing;
pub(crate) mod translation;

pub use layout::{DenseLayout, TrivialLayout};
pub use optimization::{CancelInversePairs, Optimize1qGates};
pub use routing::BasicRouting;
pub use translation::{BasisTranslation, Unroll3qOrMore};
