pub mod envelope;
pub mod notice;
pub mod replay;
pub mod scalar;
pub mod simulation;

pub use envelope::*;
pub use notice::*;
pub use replay::*;
pub use scalar::*;
pub use simulation::*;
