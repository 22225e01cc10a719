pub mod macros;
pub mod plan;
