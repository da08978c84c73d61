//! Array, Layout, and Storage types

mod array;
mod layout;
mod storage;

pub use array::{Array, Nested};
pub use layout::{Layout, Shape, Strides};
pub use storage::Storage;
