//! Billion-scale paged collections used by the training core.
//!
//! [`huge_array`] backs column storage for the chunked frame (`TREE`/`WORK`/
//! `NIDS` scratch columns) and the tree node arena; [`cursor`] gives
//! zero-copy, page-aware iteration over it for the parallel histogram
//! builder.

pub mod array_util;
pub mod cursor;
pub mod huge_array;
pub mod page_util;

pub use array_util::ArrayUtil;
pub use cursor::{HugeCursor, HugeCursorSupport, PagedCursor, SinglePageCursor};
pub use huge_array::{HugeDoubleArray, HugeLongArray};
pub use page_util::PageUtil;
