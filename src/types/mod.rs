pub mod amount;
pub mod common;
