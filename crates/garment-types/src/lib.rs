pub mod intent;
pub mod roles;

pub use intent::*;
pub use roles::*;
