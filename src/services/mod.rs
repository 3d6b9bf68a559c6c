pub mod errors;
pub mod study;
