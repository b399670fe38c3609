mod document;
mod find_options;
mod id;
mod update;
mod write;

pub use document::*;
pub use find_options::*;
pub use id::*;
pub use update::*;
pub(crate) use write::*;
