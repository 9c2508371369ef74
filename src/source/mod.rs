pub mod loader;

pub use loader::{load_definitions, register_all, LoadError, RuleLoader};
