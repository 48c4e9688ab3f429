pub mod results;
pub mod settings;
