// Infrastructure layer modules
pub mod config;
pub mod context;
pub mod logging;
pub mod template_writer;

// Re-exports
pub use config::{SynthConfig, SynthConfigError};
pub use context::{BlockSelection, ConfigError, ContextDocument};
pub use logging::{init_logging, LogFormat};
pub use template_writer::{write_template, TemplateDestination, WriteError};
