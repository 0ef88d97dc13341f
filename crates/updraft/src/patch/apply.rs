//! Application of a [`Settings`] description to a [`Value`].
//!
//! The evaluator is a pure recursive descent: directives first, field
//! sub-patches second, both in declaration order. Only touched paths are
//! rebuilt; every untouched container comes back with its original
//! allocation so callers can detect change with [`Value::shares`].

use crate::{
    patch::settings::{Directive, Settings},
    value::Value,
};
use std::{collections::BTreeMap, sync::Arc};
use thiserror::Error as ThisError;

///
/// PatchError
///
/// Structured failures for patch application. Every variant is a
/// fail-fast construction bug in the caller's settings, never a
/// recoverable condition; nothing is retried.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum PatchError {
    #[error("`{operation}` has no value to apply to: the field is absent and the operation does not create one")]
    MissingTarget { operation: &'static str },

    #[error("`{operation}` expects {expected}, found {actual}")]
    TypeMismatch {
        operation: &'static str,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("patch failed at {path}: {source}")]
    Context {
        path: String,
        #[source]
        source: Box<Self>,
    },
}

impl PatchError {
    /// Prepend a field segment to the error path.
    #[must_use]
    pub fn with_field(self, field: impl AsRef<str>) -> Self {
        self.with_segment(field.as_ref())
    }

    /// Prepend an index segment to the error path.
    #[must_use]
    pub fn with_index(self, index: usize) -> Self {
        self.with_segment(format!("[{index}]"))
    }

    /// Full contextual path, when the error carries one.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Context { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Innermost, non-context error variant.
    #[must_use]
    pub fn leaf(&self) -> &Self {
        match self {
            Self::Context { source, .. } => source.leaf(),
            _ => self,
        }
    }

    fn with_segment(self, segment: impl Into<String>) -> Self {
        let segment = segment.into();
        match self {
            Self::Context { path, source } => Self::Context {
                path: join_segments(&segment, &path),
                source,
            },
            other => Self::Context {
                path: segment,
                source: Box::new(other),
            },
        }
    }
}

fn join_segments(prefix: &str, suffix: &str) -> String {
    if suffix.starts_with('[') {
        format!("{prefix}{suffix}")
    } else {
        format!("{prefix}.{suffix}")
    }
}

const fn shape_error(operation: &'static str, expected: &'static str, found: &Value) -> PatchError {
    PatchError::TypeMismatch {
        operation,
        expected,
        actual: found.kind().as_str(),
    }
}

/// A value position during evaluation.
///
/// `Absent` means the enclosing mapping has no such key, which is distinct
/// from a present `Null`. `Auto`/`AutoSeq` seed absent slots, `Unset`
/// empties them.
enum Slot {
    Present(Value),
    Absent,
}

fn require_present(slot: Slot, operation: &'static str) -> Result<Value, PatchError> {
    match slot {
        Slot::Present(value) => Ok(value),
        Slot::Absent => Err(PatchError::MissingTarget { operation }),
    }
}

/// Apply a settings description to a value.
///
/// Returns a new value in which only the touched paths are replaced. The
/// input is never mutated; untouched containers share their allocation
/// with the input. Empty settings return the input as-is.
///
/// A top-level `Unset` has no parent mapping to remove from and yields
/// `Null`.
pub fn apply(value: &Value, settings: &Settings) -> Result<Value, PatchError> {
    if settings.is_empty() {
        return Ok(value.clone());
    }
    match eval(Slot::Present(value.clone()), settings)? {
        Slot::Present(next) => Ok(next),
        Slot::Absent => Ok(Value::Null),
    }
}

fn eval(mut slot: Slot, settings: &Settings) -> Result<Slot, PatchError> {
    for directive in &settings.directives {
        slot = eval_directive(slot, directive)?;
    }

    if settings.fields.is_empty() {
        return Ok(slot);
    }

    let current = require_present(slot, "field patch")?;
    let entries: Arc<BTreeMap<String, Value>> = match current {
        Value::Map(entries) => entries,
        other => return Err(shape_error("field patch", "a mapping", &other)),
    };

    // Copy-on-write: the map is cloned once, on the first field that
    // actually changes. Later fields read through the working copy so
    // duplicate field keys compose left-to-right.
    let mut working: Option<BTreeMap<String, Value>> = None;
    for (name, inner) in &settings.fields {
        let before = match &working {
            Some(rebuilt) => rebuilt.get(name).cloned(),
            None => entries.get(name).cloned(),
        };
        let child = before.clone().map_or(Slot::Absent, Slot::Present);
        let after = eval(child, inner).map_err(|err| err.with_field(name))?;

        match after {
            Slot::Present(value) => {
                let unchanged = before.as_ref().is_some_and(|old| old.shares(&value));
                if !unchanged {
                    working
                        .get_or_insert_with(|| entries.as_ref().clone())
                        .insert(name.clone(), value);
                }
            }
            Slot::Absent => {
                if before.is_some() {
                    working
                        .get_or_insert_with(|| entries.as_ref().clone())
                        .remove(name);
                }
            }
        }
    }

    Ok(Slot::Present(match working {
        Some(rebuilt) => Value::Map(Arc::new(rebuilt)),
        None => Value::Map(entries),
    }))
}

fn eval_directive(slot: Slot, directive: &Directive) -> Result<Slot, PatchError> {
    match directive {
        // `Set` produces its value from nothing, so it also materializes
        // absent fields; this is what lets `Auto` compose with nested
        // field patches on the freshly created empty mapping.
        Directive::Set(replacement) => Ok(Slot::Present(replacement.clone())),

        Directive::Unset => Ok(Slot::Absent),

        Directive::Auto(inner) => {
            let seeded = match slot {
                Slot::Present(value) => value,
                Slot::Absent => Value::empty_map(),
            };
            eval(Slot::Present(seeded), inner)
        }

        Directive::AutoSeq(inner) => {
            let seeded = match slot {
                Slot::Present(value) => value,
                Slot::Absent => Value::empty_seq(),
            };
            eval(Slot::Present(seeded), inner)
        }

        Directive::If {
            cond,
            then,
            otherwise,
        } => {
            let current = require_present(slot, directive.name())?;
            if cond.eval(&current) {
                eval(Slot::Present(current), then)
            } else if let Some(otherwise) = otherwise {
                eval(Slot::Present(current), otherwise)
            } else {
                Ok(Slot::Present(current))
            }
        }

        Directive::Filter(pred) => {
            let current = require_present(slot, directive.name())?;
            let Value::Seq(items) = &current else {
                return Err(shape_error(directive.name(), "a sequence", &current));
            };
            let kept: Vec<Value> = items
                .iter()
                .enumerate()
                .filter(|&(index, item)| pred(item, index))
                .map(|(_, item)| item.clone())
                .collect();
            if kept.len() == items.len() {
                Ok(Slot::Present(current))
            } else {
                Ok(Slot::Present(Value::Seq(Arc::new(kept))))
            }
        }

        Directive::Push(values) => {
            let current = require_present(slot, directive.name())?;
            let Value::Seq(items) = &current else {
                return Err(shape_error(directive.name(), "a sequence", &current));
            };
            if values.is_empty() {
                return Ok(Slot::Present(current));
            }
            let mut extended = items.as_ref().clone();
            extended.extend(values.iter().cloned());
            Ok(Slot::Present(Value::Seq(Arc::new(extended))))
        }

        Directive::Bulk(steps) => {
            let mut slot = Slot::Present(require_present(slot, directive.name())?);
            for (index, step) in steps.iter().enumerate() {
                slot = eval(slot, step).map_err(|err| err.with_index(index))?;
            }
            Ok(slot)
        }
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::settings::Condition;
    use serde_json::json;

    fn value(json: serde_json::Value) -> Value {
        Value::from(json)
    }

    #[test]
    fn auto_creates_mapping_only_when_absent() {
        let before = value(json!({
            "a": { "name": "hari" },
            "b": { "name": "shyam" },
        }));
        let settings = Settings::new()
            .field(
                "b",
                Settings::new().auto(Settings::new().set(value(json!({ "name": "chyame" })))),
            )
            .field(
                "c",
                Settings::new().auto(Settings::new().set(value(json!({ "name": "gita" })))),
            );

        let after = apply(&before, &settings).expect("auto patch should apply");
        assert_eq!(
            after,
            value(json!({
                "a": { "name": "hari" },
                "b": { "name": "chyame" },
                "c": { "name": "gita" },
            }))
        );
    }

    #[test]
    fn auto_seq_creates_sequence_only_when_absent() {
        let before = value(json!({ "a": ["hari"], "b": ["shyam"] }));
        let settings = Settings::new()
            .field(
                "b",
                Settings::new().auto_seq(Settings::new().push(["chyame"])),
            )
            .field(
                "c",
                Settings::new().auto_seq(Settings::new().push(["gita"])),
            );

        let after = apply(&before, &settings).expect("auto_seq patch should apply");
        assert_eq!(
            after,
            value(json!({
                "a": ["hari"],
                "b": ["shyam", "chyame"],
                "c": ["gita"],
            }))
        );
    }

    #[test]
    fn auto_never_replaces_a_present_falsy_value() {
        let before = value(json!({ "b": null }));
        let settings = Settings::new().field("b", Settings::new().auto(Settings::new()));

        let after = apply(&before, &settings).expect("auto on present null should apply");
        assert_eq!(after, value(json!({ "b": null })));
    }

    #[test]
    fn auto_composes_with_nested_field_patches() {
        let before = value(json!({}));
        let settings = Settings::new().field(
            "c",
            Settings::new().auto(Settings::new().field("name", Settings::new().set("gita"))),
        );

        let after = apply(&before, &settings).expect("auto with nested fields should apply");
        assert_eq!(after, value(json!({ "c": { "name": "gita" } })));
    }

    #[test]
    fn if_applies_the_selected_branch() {
        let before = value(json!({
            "a": { "name": "hari" },
            "b": { "name": "shyam" },
        }));
        let settings = Settings::new()
            .field(
                "a",
                Settings::new().when(false, Settings::new().set(value(json!({ "name": "chyame" })))),
            )
            .field(
                "b",
                Settings::new().when(true, Settings::new().set(value(json!({ "name": "gita" })))),
            );

        let after = apply(&before, &settings).expect("conditional patch should apply");
        assert_eq!(
            after,
            value(json!({
                "a": { "name": "hari" },
                "b": { "name": "gita" },
            }))
        );
    }

    #[test]
    fn if_with_otherwise_takes_the_false_branch() {
        let before = value(json!({ "a": 1 }));
        let settings = Settings::new().field(
            "a",
            Settings::new().when_else(
                Condition::test(|v| v.as_int() == Some(0)),
                Settings::new().set(10),
                Settings::new().set(20),
            ),
        );

        let after = apply(&before, &settings).expect("conditional patch should apply");
        assert_eq!(after, value(json!({ "a": 20 })));
    }

    #[test]
    fn if_without_otherwise_leaves_the_value_shared() {
        let before = value(json!({ "a": { "name": "hari" } }));
        let settings = Settings::new().field(
            "a",
            Settings::new().when(false, Settings::new().set(1)),
        );

        let after = apply(&before, &settings).expect("no-op conditional should apply");
        assert!(after.shares(&before), "untouched root should keep its allocation");
    }

    #[test]
    fn filter_keeps_matching_elements_in_order() {
        let before = value(json!({ "a": ["hari"], "b": ["shyam", "chyame"] }));
        let settings = Settings::new().field(
            "b",
            Settings::new().filter(|word, _| word.as_text().is_some_and(|s| s.len() <= 5)),
        );

        let after = apply(&before, &settings).expect("filter patch should apply");
        assert_eq!(after, value(json!({ "a": ["hari"], "b": ["shyam"] })));
    }

    #[test]
    fn filter_passes_pre_filter_indices() {
        let before = value(json!(["a", "b", "c", "d"]));
        let settings = Settings::new().filter(|_, index| index % 2 == 0);

        let after = apply(&before, &settings).expect("filter patch should apply");
        assert_eq!(after, value(json!(["a", "c"])));
    }

    #[test]
    fn bulk_composes_steps_left_to_right() {
        let before = value(json!({ "a": ["hari"], "b": ["shyam", "chyame"] }));
        let settings = Settings::new().field(
            "b",
            Settings::new().bulk([
                Settings::new().filter(|word, _| word.as_text().is_some_and(|s| s.len() <= 5)),
                Settings::new().push(["sundar"]),
            ]),
        );

        let after = apply(&before, &settings).expect("bulk patch should apply");
        assert_eq!(
            after,
            value(json!({ "a": ["hari"], "b": ["shyam", "sundar"] }))
        );
    }

    #[test]
    fn empty_bulk_returns_the_value_unchanged() {
        let before = value(json!({ "b": [1, 2] }));
        let settings = Settings::new().field("b", Settings::new().bulk([]));

        let after = apply(&before, &settings).expect("empty bulk should apply");
        assert!(after.shares(&before));
    }

    #[test]
    fn set_is_idempotent() {
        let before = value(json!({ "a": 1 }));
        let settings = Settings::new().field("a", Settings::new().set(7));

        let once = apply(&before, &settings).expect("set should apply");
        let twice = apply(&once, &settings).expect("set should apply again");
        assert_eq!(once, twice);
    }

    #[test]
    fn set_materializes_an_absent_field() {
        let before = value(json!({}));
        let settings = Settings::new().field("a", Settings::new().set(1));

        let after = apply(&before, &settings).expect("set should create the field");
        assert_eq!(after, value(json!({ "a": 1 })));
    }

    #[test]
    fn empty_settings_return_the_input_shared() {
        let before = value(json!({ "a": [1, 2], "b": { "c": 3 } }));
        let after = apply(&before, &Settings::new()).expect("empty settings should apply");
        assert_eq!(after, before);
        assert!(after.shares(&before));
    }

    #[test]
    fn untouched_siblings_keep_their_allocation() {
        let before = value(json!({
            "a": { "keep": true },
            "b": { "name": "shyam" },
        }));
        let settings = Settings::new().field("b", Settings::new().set(1));

        let after = apply(&before, &settings).expect("patch should apply");
        assert!(!after.shares(&before), "the patched root must be rebuilt");
        assert!(
            after.get("a").expect("a").shares(before.get("a").expect("a")),
            "untouched siblings must share their allocation"
        );
    }

    #[test]
    fn unset_removes_the_field() {
        let before = value(json!({ "a": 1, "b": 2 }));
        let settings = Settings::new().field("b", Settings::new().unset());

        let after = apply(&before, &settings).expect("unset should apply");
        assert_eq!(after, value(json!({ "a": 1 })));
    }

    #[test]
    fn unset_of_an_absent_field_is_a_shared_noop() {
        let before = value(json!({ "a": 1 }));
        let settings = Settings::new().field("missing", Settings::new().unset());

        let after = apply(&before, &settings).expect("unset on absent field should apply");
        assert!(after.shares(&before));
    }

    #[test]
    fn top_level_unset_yields_null() {
        let before = value(json!({ "a": 1 }));
        let after = apply(&before, &Settings::new().unset()).expect("unset should apply");
        assert_eq!(after, Value::Null);
    }

    #[test]
    fn push_of_nothing_keeps_the_allocation() {
        let before = value(json!({ "b": [1, 2] }));
        let settings = Settings::new().field("b", Settings::new().push(Vec::<Value>::new()));

        let after = apply(&before, &settings).expect("empty push should apply");
        assert!(after.shares(&before));
    }

    #[test]
    fn filter_that_keeps_everything_keeps_the_allocation() {
        let before = value(json!({ "b": [1, 2] }));
        let settings = Settings::new().field("b", Settings::new().filter(|_, _| true));

        let after = apply(&before, &settings).expect("keep-all filter should apply");
        assert!(after.shares(&before));
    }

    #[test]
    fn filter_on_a_non_sequence_fails_with_path() {
        let before = value(json!({ "b": { "c": 1 } }));
        let settings = Settings::new().field("b", Settings::new().filter(|_, _| true));

        let err = apply(&before, &settings).expect_err("filter on mapping should fail");
        assert_eq!(err.path(), Some("b"));
        assert_eq!(
            err.leaf(),
            &PatchError::TypeMismatch {
                operation: "filter",
                expected: "a sequence",
                actual: "a mapping",
            }
        );
    }

    #[test]
    fn push_on_a_scalar_fails() {
        let before = value(json!({ "b": 1 }));
        let settings = Settings::new().field("b", Settings::new().push([2]));

        let err = apply(&before, &settings).expect_err("push on integer should fail");
        assert!(matches!(
            err.leaf(),
            PatchError::TypeMismatch {
                operation: "push",
                ..
            }
        ));
    }

    #[test]
    fn field_patch_on_a_scalar_fails() {
        let before = value(json!({ "b": 1 }));
        let settings = Settings::new().field(
            "b",
            Settings::new().field("inner", Settings::new().set(2)),
        );

        let err = apply(&before, &settings).expect_err("field patch on integer should fail");
        assert_eq!(err.path(), Some("b"));
        assert!(matches!(
            err.leaf(),
            PatchError::TypeMismatch {
                operation: "field patch",
                ..
            }
        ));
    }

    #[test]
    fn non_creating_directive_on_an_absent_field_fails() {
        let before = value(json!({}));
        let settings = Settings::new().field("missing", Settings::new().push([1]));

        let err = apply(&before, &settings).expect_err("push on absent field should fail");
        assert_eq!(err.path(), Some("missing"));
        assert_eq!(
            err.leaf(),
            &PatchError::MissingTarget { operation: "push" }
        );
    }

    #[test]
    fn nested_errors_report_the_full_path() {
        let before = value(json!({ "a": { "b": 1 } }));
        let settings = Settings::new().field(
            "a",
            Settings::new().field("b", Settings::new().filter(|_, _| true)),
        );

        let err = apply(&before, &settings).expect_err("nested filter should fail");
        assert_eq!(err.path(), Some("a.b"));
    }

    #[test]
    fn failing_bulk_steps_report_their_index() {
        let before = value(json!({ "b": 1 }));
        let settings = Settings::new().field(
            "b",
            Settings::new().bulk([Settings::new().filter(|_, _| true)]),
        );

        let err = apply(&before, &settings).expect_err("bulk filter on integer should fail");
        assert_eq!(err.path(), Some("b[0]"));
    }

    #[test]
    fn input_is_never_mutated() {
        let before = value(json!({ "a": ["x"], "b": { "c": 1 } }));
        let snapshot = before.clone();
        let settings = Settings::new()
            .field("a", Settings::new().push(["y"]))
            .field("b", Settings::new().unset());

        let _after = apply(&before, &settings).expect("patch should apply");
        assert_eq!(before, snapshot);
    }

    mod property {
        use super::*;
        use proptest::prelude::*;

        // Floats are excluded so structural equality stays reflexive.
        fn arb_value() -> impl Strategy<Value = Value> {
            let leaf = prop_oneof![
                Just(Value::Null),
                any::<bool>().prop_map(Value::from),
                any::<i64>().prop_map(Value::from),
                "[a-z0-9]{0,6}".prop_map(Value::from),
            ];
            leaf.prop_recursive(3, 24, 4, |inner| {
                prop_oneof![
                    prop::collection::vec(inner.clone(), 0..4).prop_map(Value::from),
                    prop::collection::btree_map("[a-z]{1,3}", inner, 0..4)
                        .prop_map(Value::from),
                ]
            })
        }

        proptest! {
            #[test]
            fn identity_shares_the_input(v in arb_value()) {
                let out = apply(&v, &Settings::new()).expect("identity should apply");
                prop_assert_eq!(&out, &v);
                prop_assert!(out.shares(&v));
            }

            #[test]
            fn set_is_idempotent(v in arb_value(), w in arb_value()) {
                let settings = Settings::new().set(w);
                let once = apply(&v, &settings).expect("set should apply");
                let twice = apply(&once, &settings).expect("set should apply again");
                prop_assert_eq!(once, twice);
            }

            #[test]
            fn apply_never_mutates_its_input(v in arb_value(), w in arb_value()) {
                let snapshot = v.clone();
                let _ = apply(&v, &Settings::new().set(w));
                prop_assert_eq!(&v, &snapshot);
            }

            #[test]
            fn filter_yields_an_ordered_subset(items in prop::collection::vec(any::<i64>(), 0..8)) {
                let seq = Value::seq(items.clone());
                let settings = Settings::new()
                    .filter(|item, _| item.as_int().is_some_and(|i| i >= 0));

                let out = apply(&seq, &settings).expect("filter should apply");
                let kept: Vec<i64> = out
                    .as_seq()
                    .expect("filter output should stay a sequence")
                    .iter()
                    .filter_map(Value::as_int)
                    .collect();
                let expected: Vec<i64> = items.iter().copied().filter(|i| *i >= 0).collect();
                prop_assert_eq!(kept, expected);
            }
        }
    }
}
