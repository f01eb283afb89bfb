//! Annotation producers
//!
//! Independent producers that turn scanner, classifier, and resolver output
//! into editor-facing shapes: diagnostics, quick fixes, code lenses, hover
//! markdown, and completions. Each producer is best-effort: whatever the
//! resolver cannot supply is omitted from the response rather than failing
//! the request.

pub mod actions;
pub mod completion;
pub mod diagnostics;
pub mod hover;
pub mod lens;

pub use actions::quick_fixes;
pub use completion::completion_items;
pub use diagnostics::document_diagnostics;
pub use hover::hover_for_position;
pub use lens::{code_lenses, resolve_lens};
