//! Input expansion and validation

pub mod scanner;
pub mod validator;

pub use scanner::expand_inputs;
pub use validator::{FileValidator, Validation};
