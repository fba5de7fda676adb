use std::fmt;
use std::sync::Arc;

type Getter<S, A> = Arc<dyn Fn(&S) -> A + Send + Sync>;
type Setter<S, A> = Arc<dyn Fn(&S, A) -> S + Send + Sync>;

/// A get/set pair focusing on one part of an immutable value.
///
/// `set` and `modify` return a new whole; everything outside the focus is
/// cloned from the original, which for `im` collections and `Arc` fields means
/// shared rather than copied.
pub struct Lens<S, A> {
    get: Getter<S, A>,
    set: Setter<S, A>,
}

impl<S, A> Clone for Lens<S, A> {
    fn clone(&self) -> Self {
        Self {
            get: Arc::clone(&self.get),
            set: Arc::clone(&self.set),
        }
    }
}

impl<S, A> fmt::Debug for Lens<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Lens")
    }
}

impl<S: 'static, A: 'static> Lens<S, A> {
    pub fn new(
        get: impl Fn(&S) -> A + Send + Sync + 'static,
        set: impl Fn(&S, A) -> S + Send + Sync + 'static,
    ) -> Self {
        Self {
            get: Arc::new(get),
            set: Arc::new(set),
        }
    }

    pub fn get(&self, whole: &S) -> A {
        (self.get)(whole)
    }

    pub fn set(&self, whole: &S, part: A) -> S {
        (self.set)(whole, part)
    }

    pub fn modify(&self, whole: &S, f: impl FnOnce(A) -> A) -> S {
        self.set(whole, f(self.get(whole)))
    }

    /// Like `modify` for an update that can fail.
    pub fn try_modify<E>(&self, whole: &S, f: impl FnOnce(A) -> Result<A, E>) -> Result<S, E> {
        Ok(self.set(whole, f(self.get(whole))?))
    }

    /// Focuses further into the part.
    pub fn compose<B: 'static>(&self, inner: Lens<A, B>) -> Lens<S, B> {
        let outer_get = Arc::clone(&self.get);
        let outer = self.clone();
        let inner_get = Arc::clone(&inner.get);
        Lens {
            get: Arc::new(move |s: &S| inner_get(&outer_get(s))),
            set: Arc::new(move |s: &S, b: B| {
                let part = outer.get(s);
                outer.set(s, inner.set(&part, b))
            }),
        }
    }
}

/// Builds a lens over a named struct field.
///
/// `field_lens!(Observation, constraint_set: ConstraintSet)`
#[macro_export]
macro_rules! field_lens {
    ($whole:ty, $field:ident : $part:ty) => {
        $crate::core::optics::Lens::<$whole, $part>::new(
            |w: &$whole| w.$field.clone(),
            |w: &$whole, p: $part| {
                let mut next = w.clone();
                next.$field = p;
                next
            },
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Inner {
        value: u32,
        label: String,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Outer {
        inner: Inner,
        other: Arc<Vec<u32>>,
    }

    #[test]
    fn test_compose_sets_deep_field_and_shares_rest() {
        let inner = crate::field_lens!(Outer, inner: Inner);
        let value = crate::field_lens!(Inner, value: u32);
        let deep = inner.compose(value);

        let outer = Outer {
            inner: Inner { value: 1, label: "x".into() },
            other: Arc::new(vec![1, 2, 3]),
        };

        let updated = deep.modify(&outer, |v| v + 41);
        assert_eq!(deep.get(&updated), 42);
        assert_eq!(updated.inner.label, "x");
        assert!(Arc::ptr_eq(&updated.other, &outer.other));
        assert_eq!(outer.inner.value, 1);
    }

    #[test]
    fn test_try_modify_propagates_failure() {
        let value = crate::field_lens!(Inner, value: u32);
        let inner = Inner { value: 1, label: String::new() };
        let r: Result<Inner, &str> = value.try_modify(&inner, |_| Err("nope"));
        assert_eq!(r.unwrap_err(), "nope");
    }
}
