pub mod apply;
pub mod settings;

pub use apply::{PatchError, apply};
pub use settings::{Condition, Directive, FilterFn, Settings};
