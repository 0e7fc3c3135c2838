//! Report layout and export.

pub mod generator;
pub mod layout;
pub mod measure;
pub mod pdf;

pub use generator::{
    generate_history_listing, json_filename, resolve_output_path, write_json_report,
    write_pdf_report,
};
pub use layout::{LayoutEngine, RenderOptions};
