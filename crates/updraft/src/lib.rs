//! Declarative, structurally shared updates for immutable JSON-like values.
//!
//! The crate revolves around one operation: [`apply`], which takes a
//! [`Value`] and a [`Settings`] patch description and returns a new value
//! in which only the touched paths are replaced. Untouched containers keep
//! their allocation, so consumers detect change with [`Value::shares`]
//! instead of deep comparison.
//!
//! ```
//! use updraft::{Settings, Value, apply};
//!
//! let before = Value::from(serde_json::json!({
//!     "a": { "name": "hari" },
//!     "b": { "name": "shyam" },
//! }));
//! let settings = Settings::new().field(
//!     "b",
//!     Settings::new().auto(Settings::new().field("name", Settings::new().set("gita"))),
//! );
//!
//! let after = apply(&before, &settings)?;
//! assert_eq!(after.get("b").and_then(|b| b.get("name")).and_then(Value::as_text), Some("gita"));
//! assert!(after.get("a").unwrap().shares(before.get("a").unwrap()));
//! # Ok::<(), updraft::PatchError>(())
//! ```

pub mod patch;
pub mod store;
pub mod value;

pub use patch::{Condition, Directive, FilterFn, PatchError, Settings, apply};
pub use store::Store;
pub use value::{Value, ValueKind};

///
/// Prelude
///
/// Domain vocabulary only; no errors or helpers.
///

pub mod prelude {
    pub use crate::{
        patch::{Condition, Settings, apply},
        store::Store,
        value::Value,
    };
}
