//! HugeArray - Paged arrays supporting billions of elements
//!
//! Arrays are split into pages of manageable size once they exceed
//! [`crate::collections::PageUtil::MAX_ARRAY_LENGTH`], with automatic selection
//! between single-page and multi-page implementations. These back column
//! storage in the training core (feature/residual/prediction columns, and
//! the tree node arena's scratch columns).
//!
//! ## Architecture
//!
//! ```text
//! Logical Array: [0][1][2][3][4][5][6][7][8][9]...
//! Physical Pages:
//!   Page 0: [0,1,2,3]
//!   Page 1: [4,5,6,7]
//!   Page 2: [8,9,...]
//! ```
//!
//! ## Design Philosophy
//!
//! - **Fixed size**: Arrays don't grow/shrink after creation
//! - **Dense storage**: Optimized for dense data
//! - **Zero defaults**: All elements initialize to 0/0.0

pub mod huge_double_array;
pub mod huge_long_array;

pub use huge_double_array::HugeDoubleArray;
pub use huge_long_array::HugeLongArray;
