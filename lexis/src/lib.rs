// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    SettingsOverrides, init_tracing, load_settings, validate_settings, write_default_config,
};

// Re-export extract functionality from lexis-core
pub use lexis_core::extract::{
    ExtractOptions, ExtractProgressCallback, Extraction, execute_extraction,
    generate_extraction_summary,
};
