//! Website content checker: breadth-first crawls with grammar, spelling,
//! custom-term and broken-link checks, plus blog exports for content
//! migration.

pub mod app;
