//! Core library for pagegrab
//!
//! This crate implements the **Functional Core** of pagegrab, following the
//! Functional Core - Imperative Shell architectural pattern.
//!
//! # Architecture Overview
//!
//! pagegrab retrieves a URL with one *fetch strategy* and transforms the result
//! with one *process strategy*. The two axes are independent: any fetcher's
//! output is acceptable input to any processor.
//!
//! - **`pagegrab_core`** (this crate): pure pieces with zero I/O. Method enums,
//!   options and results, the error taxonomy, URL and header validation, and
//!   every process strategy.
//! - **`pagegrab`**: fetch strategies (HTTP and headless Chrome), the
//!   orchestrator and the CLI (the Imperative Shell).
//!
//! ## Functional Core Principles
//!
//! - **Pure functions**: processors are `&str -> Processed` transforms
//! - **No side effects**: no network, no filesystem, no browser
//! - **Testable**: everything here is tested with inline HTML fixtures
//!
//! # Module Organization
//!
//! - [`error`]: [`FetchError`], [`ProcessError`] and the pipeline-wide [`Error`]
//! - [`types`]: [`FetchMethod`], [`ProcessMethod`], [`FetchOptions`] and results
//! - [`validate`]: URL and header checks, content-type allow-list, truncation
//! - [`process`]: the [`Processor`] trait with the raw, markdown and readability strategies
//!
//! # Example Usage
//!
//! ```rust
//! use pagegrab_core::process::{MarkdownProcessor, Processor};
//!
//! let html = "<html><body><script>evil()</script><p>Hello</p></body></html>";
//! let output = MarkdownProcessor.process(html).unwrap();
//!
//! assert!(output.content.contains("Hello"));
//! assert!(!output.content.contains("evil()"));
//! ```

pub mod error;
pub mod process;
pub mod types;
pub mod validate;

pub use error::{Error, ErrorKind, FetchError, ProcessError};
pub use process::Processor;
pub use types::{
    ContentResult, Degraded, FetchMethod, FetchOptions, FetchResult, ProcessMethod, Processed,
};
