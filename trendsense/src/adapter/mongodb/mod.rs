//! MongoDB adapter, built on the blocking `mongodb` driver.

mod convert;
mod store;

pub use store::*;
