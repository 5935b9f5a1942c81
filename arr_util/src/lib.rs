//! Supporting utilities (C9): coordinate-to-linear-index mapping, a small
//! arena allocator for bounded-lifetime intermediate data, and the
//! `RowCollection` buffer used by group-by-shaped operators.
//!
//! `PointerRange<T>` from the original source is not reproduced as its own
//! type: a Rust `&[T]` slice already is a non-owning view into someone
//! else's contiguous storage, which is the entire point of that C++ type.
//! Functions that would have taken a `PointerRange<Coordinate const>` take
//! `&[i64]` instead.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(missing_debug_implementations, clippy::clone_on_ref_ptr)]

pub mod arena;
pub mod coord_mapper;
pub mod row_collection;

pub use coord_mapper::CoordMapper;
pub use row_collection::RowCollection;
