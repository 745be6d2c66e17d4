pub mod files;
pub mod input_validation;
