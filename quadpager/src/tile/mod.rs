//! Tile data types
//!
//! This module provides the value types that flow between the paging
//! loader and its collaborators: source descriptors ([`TileInfo`],
//! [`TileSource`]), fetch requests ([`TileFetchRequest`]), and the
//! per-fetch result container ([`LoaderReturn`]).

mod info;
mod request;
mod result;

pub use info::{TileInfo, TileSource};
pub use request::TileFetchRequest;
pub use result::{LoaderReturn, ObjectLoaderReturn, ReturnFactory};

pub(crate) use result::default_return_factory;
