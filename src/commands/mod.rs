pub mod calculate;
pub mod validate;
