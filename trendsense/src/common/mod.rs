mod constants;
mod sort_order;
mod value;

pub use constants::*;
pub use sort_order::*;
pub use value::*;

pub use serde_json::{json, Map, Number, Value};
