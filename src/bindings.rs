//! Canonical bindings construction.
//!
//! Legacy callers pass the same method a named object, a positional array,
//! variadic scalars, an optional trailing callback, or explicit `undefined`
//! placeholders for omitted arguments. All of those shapes funnel through the
//! single [`normalize`] function; call sites never classify arguments
//! themselves.

use crate::error::DriverError;
use crate::values::BindValue;

/// One element of a legacy call's argument tail.
pub enum Argument<C> {
    /// A binding value
    Value(BindValue),
    /// An explicit placeholder for an omitted argument
    Undefined,
    /// The caller's completion callback
    Callback(C),
}

impl<C> Argument<C> {
    /// Wrap a binding value.
    pub fn value(v: impl Into<BindValue>) -> Self {
        Argument::Value(v.into())
    }

    /// Wrap a completion callback.
    pub fn callback(cb: C) -> Self {
        Argument::Callback(cb)
    }
}

/// Canonical bindings for one statement execution.
///
/// Built fresh per call, immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub enum Bindings {
    /// No bindings supplied
    None,
    /// Ordered positional values
    Positional(Vec<BindValue>),
    /// Named values, keyed by parameter name, insertion order preserved
    Named(Vec<(String, BindValue)>),
}

impl Bindings {
    /// Recursively coerce booleans to integers in every bound value.
    #[must_use]
    pub fn coerce_booleans(self) -> Bindings {
        match self {
            Bindings::None => Bindings::None,
            Bindings::Positional(items) => {
                Bindings::Positional(items.into_iter().map(BindValue::coerce_booleans).collect())
            }
            Bindings::Named(entries) => Bindings::Named(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, v.coerce_booleans()))
                    .collect(),
            ),
        }
    }

    /// Strip legacy prefix sigils (`$`, `@`, `:`) from named keys.
    ///
    /// Positional and absent bindings pass through unchanged. Two keys that
    /// strip to the same name are a caller error; the shim does not defend
    /// against the collision, and the later entry wins at bind time.
    #[must_use]
    pub fn strip_named_prefixes(self) -> Bindings {
        match self {
            Bindings::Named(entries) => Bindings::Named(
                entries
                    .into_iter()
                    .map(|(key, value)| {
                        let stripped = match key.chars().next() {
                            Some('$' | '@' | ':') => key[1..].to_string(),
                            _ => key,
                        };
                        (stripped, value)
                    })
                    .collect(),
            ),
            other => other,
        }
    }
}

/// Turn a heterogeneous argument tail into canonical bindings plus the
/// optional trailing callback.
///
/// The callback is popped first, then trailing `Undefined` placeholders are
/// stripped; the order matters, since a genuine `undefined` bind value in
/// the middle of the tail must survive (it binds as SQL NULL). What remains
/// is classified: a lone map becomes named bindings, a lone list flattens
/// into the positional bindings, anything else is positional.
///
/// # Errors
///
/// Returns `DriverError::ParameterError` if a callback appears anywhere but
/// the final position.
pub fn normalize<C>(mut args: Vec<Argument<C>>) -> Result<(Bindings, Option<C>), DriverError> {
    let callback = match args.last() {
        Some(Argument::Callback(_)) => match args.pop() {
            Some(Argument::Callback(cb)) => Some(cb),
            _ => unreachable!(),
        },
        _ => None,
    };

    if args
        .iter()
        .any(|arg| matches!(arg, Argument::Callback(_)))
    {
        return Err(DriverError::ParameterError(
            "callback argument must be in the final position".into(),
        ));
    }

    while matches!(args.last(), Some(Argument::Undefined)) {
        args.pop();
    }

    let mut values: Vec<BindValue> = args
        .into_iter()
        .map(|arg| match arg {
            Argument::Value(v) => v,
            // an explicit placeholder before the tail binds as NULL
            Argument::Undefined => BindValue::Null,
            Argument::Callback(_) => unreachable!(),
        })
        .collect();

    let bindings = match values.len() {
        0 => Bindings::None,
        1 => match values.pop() {
            Some(BindValue::Map(entries)) => Bindings::Named(entries),
            Some(BindValue::List(items)) => Bindings::Positional(items),
            Some(single) => Bindings::Positional(vec![single]),
            None => unreachable!(),
        },
        _ => Bindings::Positional(values),
    };

    Ok((bindings, callback))
}
