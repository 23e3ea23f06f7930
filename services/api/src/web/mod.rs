pub mod rest;
pub mod state;

// Re-export the handlers to make them easily accessible
// to the binary that builds the web server router.
pub use rest::{ai_status_handler, analyze_class_handler, analyze_student_handler};
