//! Re-exports the tracing ecosystem crates used throughout the workspace so
//! every crate pulls in the same versions.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]

pub use tracing;
