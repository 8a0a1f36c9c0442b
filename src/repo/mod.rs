pub mod flag;

pub use flag::*;
