//! Domain configuration: raw parsing, validation and the verified IR.

pub mod loader;
pub mod raw;
pub mod settings;
pub mod types;
pub mod validator;

pub use loader::{from_yaml_str, load_config, load_raw};
pub use raw::{RawDomainConfig, ValidationRules};
pub use settings::GeneratorSettings;
pub use types::*;
pub use validator::{check, is_valid_name, validate, ValidationReport, ValidationWarning};
