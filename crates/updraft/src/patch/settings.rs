use crate::value::Value;
use std::{fmt, sync::Arc};

/// Caller-supplied element predicate for [`Directive::Filter`].
///
/// Receives the element and its position in the pre-filter sequence.
/// Predicates are black boxes: never retried, never caught, expected pure.
pub type FilterFn = Arc<dyn Fn(&Value, usize) -> bool>;

///
/// Condition
///
/// Branch selector for [`Directive::If`]: a literal, or a caller-supplied
/// predicate over the current value.
///

#[derive(Clone)]
pub enum Condition {
    Const(bool),
    Test(Arc<dyn Fn(&Value) -> bool>),
}

impl Condition {
    /// Wrap a predicate over the current value.
    pub fn test<F>(pred: F) -> Self
    where
        F: Fn(&Value) -> bool + 'static,
    {
        Self::Test(Arc::new(pred))
    }

    pub(crate) fn eval(&self, value: &Value) -> bool {
        match self {
            Self::Const(flag) => *flag,
            Self::Test(test) => test(value),
        }
    }
}

impl From<bool> for Condition {
    fn from(flag: bool) -> Self {
        Self::Const(flag)
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Const(flag) => f.debug_tuple("Const").field(flag).finish(),
            Self::Test(_) => f.write_str("Test(<predicate>)"),
        }
    }
}

///
/// Directive
///
/// Operations applied to the value a settings node is attached to.
/// Closed vocabulary; construction fixes each operation's arity.
///
/// - `Set` replaces the value wholesale, whatever its shape.
/// - `If` applies one branch; a false condition with no false-branch
///   leaves the value unchanged.
/// - `Auto`/`AutoSeq` synthesize an empty mapping/sequence only when the
///   target field is strictly absent from its parent, then apply the
///   inner settings. Falsy or empty existing values are never replaced.
/// - `Filter`/`Push` require a sequence. `Filter` preserves order and
///   passes pre-filter indices; `Push` appends after existing elements.
/// - `Unset` removes the field from its parent mapping; at the top level
///   there is no parent and the result is `Null`.
/// - `Bulk` applies its steps strictly left-to-right, each seeing the
///   previous step's output. An empty list is a no-op.
///

#[derive(Clone)]
pub enum Directive {
    Set(Value),
    If {
        cond: Condition,
        then: Box<Settings>,
        otherwise: Option<Box<Settings>>,
    },
    Auto(Box<Settings>),
    AutoSeq(Box<Settings>),
    Filter(FilterFn),
    Push(Vec<Value>),
    Unset,
    Bulk(Vec<Settings>),
}

impl Directive {
    /// Stable operation name used in diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Set(_) => "set",
            Self::If { .. } => "if",
            Self::Auto(_) => "auto",
            Self::AutoSeq(_) => "auto_seq",
            Self::Filter(_) => "filter",
            Self::Push(_) => "push",
            Self::Unset => "unset",
            Self::Bulk(_) => "bulk",
        }
    }
}

impl fmt::Debug for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Set(value) => f.debug_tuple("Set").field(value).finish(),
            Self::If {
                cond,
                then,
                otherwise,
            } => f
                .debug_struct("If")
                .field("cond", cond)
                .field("then", then)
                .field("otherwise", otherwise)
                .finish(),
            Self::Auto(inner) => f.debug_tuple("Auto").field(inner).finish(),
            Self::AutoSeq(inner) => f.debug_tuple("AutoSeq").field(inner).finish(),
            Self::Filter(_) => f.write_str("Filter(<predicate>)"),
            Self::Push(values) => f.debug_tuple("Push").field(values).finish(),
            Self::Unset => f.write_str("Unset"),
            Self::Bulk(steps) => f.debug_tuple("Bulk").field(steps).finish(),
        }
    }
}

///
/// Settings
///
/// Ordered patch description for one value: directives on the value
/// itself, then per-field sub-patches into a mapping. Both partitions
/// apply in declaration (builder call) order. An empty node means
/// "no change".
///
/// Settings are built ad hoc per invocation and carry no identity;
/// `Clone` shares the captured predicates.
///

#[derive(Clone, Debug, Default)]
pub struct Settings {
    pub(crate) directives: Vec<Directive>,
    pub(crate) fields: Vec<(String, Settings)>,
}

impl Settings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.directives.is_empty() && self.fields.is_empty()
    }

    ///
    /// BUILDERS
    ///

    /// Append a raw directive.
    #[must_use]
    pub fn directive(mut self, directive: Directive) -> Self {
        self.directives.push(directive);
        self
    }

    /// Append a sub-patch for the named field of a mapping value.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, inner: Self) -> Self {
        self.fields.push((name.into(), inner));
        self
    }

    /// Replace the current value wholesale.
    #[must_use]
    pub fn set(self, value: impl Into<Value>) -> Self {
        self.directive(Directive::Set(value.into()))
    }

    /// Apply `then` when the condition holds; otherwise leave the value
    /// unchanged.
    #[must_use]
    pub fn when(self, cond: impl Into<Condition>, then: Self) -> Self {
        self.directive(Directive::If {
            cond: cond.into(),
            then: Box::new(then),
            otherwise: None,
        })
    }

    /// Apply `then` or `otherwise` depending on the condition.
    #[must_use]
    pub fn when_else(self, cond: impl Into<Condition>, then: Self, otherwise: Self) -> Self {
        self.directive(Directive::If {
            cond: cond.into(),
            then: Box::new(then),
            otherwise: Some(Box::new(otherwise)),
        })
    }

    /// Create an empty mapping when the field is absent, then apply
    /// `inner` to it.
    #[must_use]
    pub fn auto(self, inner: Self) -> Self {
        self.directive(Directive::Auto(Box::new(inner)))
    }

    /// Create an empty sequence when the field is absent, then apply
    /// `inner` to it.
    #[must_use]
    pub fn auto_seq(self, inner: Self) -> Self {
        self.directive(Directive::AutoSeq(Box::new(inner)))
    }

    /// Keep only sequence elements satisfying `pred(element, index)`.
    #[must_use]
    pub fn filter<F>(self, pred: F) -> Self
    where
        F: Fn(&Value, usize) -> bool + 'static,
    {
        self.directive(Directive::Filter(Arc::new(pred)))
    }

    /// Append elements to a sequence, in the given order.
    #[must_use]
    pub fn push<V, I>(self, values: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        self.directive(Directive::Push(
            values.into_iter().map(Into::into).collect(),
        ))
    }

    /// Remove the current field from its parent mapping.
    #[must_use]
    pub fn unset(self) -> Self {
        self.directive(Directive::Unset)
    }

    /// Apply a list of settings left-to-right, threading the value
    /// through each step.
    #[must_use]
    pub fn bulk<I>(self, steps: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        self.directive(Directive::Bulk(steps.into_iter().collect()))
    }
}

///
/// TESTS
///
