//! Block device over the whole flash bank
//!
//! [`FlashArray`] joins every flash chip on the board into one run of erase
//! blocks and implements [`BlockDevice`], the typed form of the four-call
//! contract a filesystem needs.

mod array;
mod device;

pub use array::FlashArray;
pub use device::BlockDevice;
