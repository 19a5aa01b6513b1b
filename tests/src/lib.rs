//! End-to-end scenarios live in `tests/`; this crate intentionally exports
//! nothing.
