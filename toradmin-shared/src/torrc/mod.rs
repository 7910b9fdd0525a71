//! The torrc core: a lossless line model, the option catalog, and the
//! validators that gate every write.

pub mod error;
pub mod file;
pub mod options;
pub mod validate;

pub use error::TorrcError;
pub use file::{HIDDEN_SERVICE_DIR, Torrc, TorrcEntry, backup_path};
pub use options::{OptionType, TorOption};
pub use validate::{FieldRule, validate_option};
