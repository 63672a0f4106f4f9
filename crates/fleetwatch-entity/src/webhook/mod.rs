pub mod delivery;
pub mod model;
