pub mod bar;
pub mod loader;
pub mod synthetic;

pub use bar::{closes, validate_series, Bar, BarError};
pub use loader::load_csv;
pub use synthetic::{from_closes, random_walk, RandomWalkParams};
