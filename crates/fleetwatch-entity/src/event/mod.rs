pub mod model;
pub mod severity;

pub use model::Event;
pub use severity::Severity;
