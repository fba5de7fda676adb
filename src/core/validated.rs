// ============================================================================
// Validated input
// ============================================================================
//
// Error-accumulating validation. A `Validated<A>` is an ordinary `Result`
// whose error side is a non-empty list of messages; the combinators below
// keep going after a failure so that every independent problem in one
// request is reported together.
//
// ============================================================================

use serde::Serialize;
use std::fmt;

/// Non-empty, ordered list of validation messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputErrors(Vec<String>);

pub type Validated<A> = std::result::Result<A, InputErrors>;

impl InputErrors {
    pub fn single(message: impl Into<String>) -> Self {
        Self(vec![message.into()])
    }

    /// Builds from a list of messages, `None` if the list is empty.
    pub fn from_messages(messages: Vec<String>) -> Option<Self> {
        if messages.is_empty() {
            None
        } else {
            Some(Self(messages))
        }
    }

    pub fn concat(mut self, other: InputErrors) -> Self {
        self.0.extend(other.0);
        self
    }

    /// Prefixes every message, e.g. with the id of the entity it concerns.
    pub fn prefixed(self, prefix: impl fmt::Display) -> Self {
        Self(self.0.into_iter().map(|m| format!("{prefix}: {m}")).collect())
    }

    pub fn messages(&self) -> &[String] {
        &self.0
    }

    pub fn into_messages(self) -> Vec<String> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Display for InputErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("; "))
    }
}

pub fn valid<A>(a: A) -> Validated<A> {
    Ok(a)
}

pub fn invalid<A>(message: impl Into<String>) -> Validated<A> {
    Err(InputErrors::single(message))
}

pub trait ValidatedExt<A> {
    /// Applicative product: both successes become a tuple, failures concatenate.
    fn zip<B>(self, other: Validated<B>) -> Validated<(A, B)>;
}

impl<A> ValidatedExt<A> for Validated<A> {
    fn zip<B>(self, other: Validated<B>) -> Validated<(A, B)> {
        match (self, other) {
            (Ok(a), Ok(b)) => Ok((a, b)),
            (Err(a), Err(b)) => Err(a.concat(b)),
            (Err(a), Ok(_)) => Err(a),
            (Ok(_), Err(b)) => Err(b),
        }
    }
}

/// Validates each item, collecting every failure instead of stopping at the first.
pub fn traverse<T, B>(
    items: impl IntoIterator<Item = T>,
    f: impl FnMut(T) -> Validated<B>,
) -> Validated<Vec<B>> {
    let mut values = Vec::new();
    let mut errors: Option<InputErrors> = None;
    for result in items.into_iter().map(f) {
        match result {
            Ok(b) => values.push(b),
            Err(e) => {
                errors = Some(match errors {
                    Some(acc) => acc.concat(e),
                    None => e,
                })
            }
        }
    }
    match errors {
        Some(e) => Err(e),
        None => Ok(values),
    }
}

/// Optional validation: absent stays absent, present is validated.
pub fn optional<T, B>(value: Option<T>, f: impl FnOnce(T) -> Validated<B>) -> Validated<Option<B>> {
    value.map(f).transpose()
}

/// Requires a value to be present.
pub fn required<T>(value: Option<T>, field: &str) -> Validated<T> {
    value.ok_or_else(|| InputErrors::single(format!("{field} is required")))
}

/// Succeeds iff exactly one of the named alternatives is present.
///
/// Alternatives are `(name, Option<value>)` pairs of a common type, usually an
/// enum wrapping the possible choices.
pub fn exactly_one<T>(group: &str, alternatives: Vec<(&str, Option<T>)>) -> Validated<T> {
    let names: Vec<&str> = alternatives.iter().map(|(n, _)| *n).collect();
    let mut supplied = Vec::new();
    let mut found = None;
    for (name, value) in alternatives {
        if let Some(v) = value {
            supplied.push(name);
            found = Some(v);
        }
    }
    match (supplied.len(), found) {
        (1, Some(v)) => Ok(v),
        (0, _) => invalid(format!(
            "{group}: exactly one of {} must be provided, but none was",
            names.join(", ")
        )),
        _ => invalid(format!(
            "{group}: exactly one of {} must be provided, but {} were supplied",
            names.join(", "),
            supplied.join(" and ")
        )),
    }
}

/// Like [`exactly_one`] but also accepts no alternative at all.
pub fn at_most_one<T>(group: &str, alternatives: Vec<(&str, Option<T>)>) -> Validated<Option<T>> {
    if alternatives.iter().all(|(_, v)| v.is_none()) {
        Ok(None)
    } else {
        exactly_one(group, alternatives).map(Some)
    }
}

/// Combines any number of named validations, accumulating every failure.
///
/// ```ignore
/// let target = validate! {
///     name = non_empty(input.name, "name"),
///     tracking = tracking_input.validate(),
///     => Target { name, tracking }
/// };
/// ```
#[macro_export]
macro_rules! validate {
    ($($name:ident = $e:expr),+ $(,)? => $body:expr) => {{
        let mut __messages: Vec<String> = Vec::new();
        $(
            let $name = match $e {
                Ok(v) => Some(v),
                Err(e) => {
                    __messages.extend($crate::core::validated::InputErrors::into_messages(e));
                    None
                }
            };
        )+
        match ($($name,)+) {
            ($(Some($name),)+) => Ok($body),
            _ => Err($crate::core::validated::InputErrors::from_messages(__messages)
                .unwrap_or_else(|| $crate::core::validated::InputErrors::single("invalid input"))),
        }
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zip_concatenates_in_order() {
        let a: Validated<i32> = invalid("a");
        let b: Validated<i32> = invalid("b");
        assert_eq!(a.zip(b).unwrap_err().messages(), ["a", "b"]);

        let ok: Validated<i32> = valid(1);
        assert_eq!(ok.zip(valid("x")).unwrap(), (1, "x"));
    }

    #[test]
    fn test_success_and_failure_is_failure() {
        let ok: Validated<i32> = valid(1);
        let bad: Validated<&str> = invalid("nope");
        assert_eq!(ok.zip(bad).unwrap_err().messages(), ["nope"]);
    }

    #[test]
    fn test_exactly_one() {
        let none: Validated<u8> = exactly_one("tracking", vec![("sidereal", None), ("nonsidereal", None)]);
        let err = none.unwrap_err();
        assert!(err.messages()[0].contains("none was"));

        let both = exactly_one("tracking", vec![("sidereal", Some(1)), ("nonsidereal", Some(2))]);
        let err = both.unwrap_err();
        assert!(err.messages()[0].contains("sidereal and nonsidereal"));

        let one = exactly_one("tracking", vec![("sidereal", None), ("nonsidereal", Some(2))]);
        assert_eq!(one.unwrap(), 2);
    }

    #[test]
    fn test_at_most_one_accepts_none() {
        let r: Validated<Option<u8>> = at_most_one("mode", vec![("a", None), ("b", None)]);
        assert_eq!(r.unwrap(), None);
    }

    #[test]
    fn test_traverse_accumulates() {
        let r = traverse(vec![1, -1, 2, -2], |n| {
            if n > 0 { valid(n) } else { invalid(format!("{n} is negative")) }
        });
        assert_eq!(r.unwrap_err().messages(), ["-1 is negative", "-2 is negative"]);
    }

    #[test]
    fn test_validate_macro() {
        let r: Validated<(i32, i32)> = crate::validate! {
            a = invalid::<i32>("a missing"),
            b = valid(2),
            c = invalid::<i32>("c out of range"),
            => (a + b, c)
        };
        assert_eq!(r.unwrap_err().messages(), ["a missing", "c out of range"]);

        let r: Validated<i32> = crate::validate! { a = valid(1), b = valid(2) => a + b };
        assert_eq!(r.unwrap(), 3);
    }
}
