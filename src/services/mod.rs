//! Domain services used by the session coordinator and the CLI.
//!
//! ARCHITECTURE
//! ============
//! Service modules own the two outward-facing collaborators (completion and
//! the law catalog) behind traits, so the session coordinator can be driven
//! by in-process fakes in tests.

pub mod completion;
pub mod laws;
