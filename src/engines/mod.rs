//! Engines bundled with the front-end binary.

pub mod material;
pub mod position;
pub mod random;
mod table;
pub mod time;

pub use material::{MaterialEngine, MATERIAL_ENGINE_ID};
pub use random::{RandomEngine, RANDOM_ENGINE_ID};

use crate::engine::{self, SharedEngine};

/// All bundled engines; the first one is the default.
#[must_use]
pub fn bundled_engines() -> Vec<SharedEngine> {
    vec![
        engine::shared(MaterialEngine::new()),
        engine::shared(RandomEngine::new()),
    ]
}
