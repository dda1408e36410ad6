pub mod enums;
pub mod receipt;

pub use enums::*;
pub use receipt::*;
