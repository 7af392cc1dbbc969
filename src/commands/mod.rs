pub mod classify;
pub mod validate;
