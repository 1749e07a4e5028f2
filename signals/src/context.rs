//! Context - Ambient values for a lexical region.
//!
//! A strictly LIFO stack of type-keyed values. Providing a context
//! returns a guard; the guard must be released in reverse provide order,
//! which ties context lifetime to lexical scope without borrowing.
//! Lookup scans top-to-bottom, so an inner provide shadows an outer one
//! of the same type.

use std::any::{Any, TypeId};
use std::rc::Rc;

use crate::runtime::{with_runtime, ContextEntry};

// =============================================================================
// Provide / Use
// =============================================================================

/// Guard for a provided context value. Must be released in LIFO order.
#[must_use = "the context stays provided until the guard is released"]
pub struct ContextGuard {
    index: usize,
}

/// Push a context value keyed by its type. Everything created before the
/// guard is released can look it up with [`use_context`].
pub fn provide_context<T: 'static>(value: T) -> ContextGuard {
    with_runtime(|rt| {
        let mut stack = rt.contexts.borrow_mut();
        stack.push(ContextEntry {
            key: TypeId::of::<T>(),
            value: Rc::new(value),
        });
        ContextGuard {
            index: stack.len() - 1,
        }
    })
}

impl ContextGuard {
    /// Pop the provided value. The guard must be the most recently
    /// provided one still live.
    pub fn release(self) {
        with_runtime(|rt| {
            let mut stack = rt.contexts.borrow_mut();
            assert_eq!(
                stack.len() - 1,
                self.index,
                "context released out of LIFO order"
            );
            stack.pop();
        });
    }
}

/// Find the nearest provided value of type `T`, innermost first.
pub fn use_context<T: 'static>() -> Option<Rc<T>> {
    with_runtime(|rt| {
        let stack = rt.contexts.borrow();
        stack
            .iter()
            .rev()
            .find(|entry| entry.key == TypeId::of::<T>())
            .and_then(|entry| Rc::downcast::<T>(entry.value.clone()).ok())
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::reset_runtime;

    #[derive(Debug, PartialEq)]
    struct Theme(&'static str);

    #[derive(Debug, PartialEq)]
    struct Locale(&'static str);

    #[test]
    fn test_use_returns_nearest() {
        reset_runtime();

        assert!(use_context::<Theme>().is_none());

        let outer = provide_context(Theme("dark"));
        assert_eq!(*use_context::<Theme>().unwrap(), Theme("dark"));

        let inner = provide_context(Theme("light"));
        assert_eq!(*use_context::<Theme>().unwrap(), Theme("light"));

        inner.release();
        assert_eq!(*use_context::<Theme>().unwrap(), Theme("dark"));

        outer.release();
        assert!(use_context::<Theme>().is_none());
    }

    #[test]
    fn test_types_do_not_collide() {
        reset_runtime();

        let theme = provide_context(Theme("dark"));
        let locale = provide_context(Locale("en"));

        assert_eq!(*use_context::<Theme>().unwrap(), Theme("dark"));
        assert_eq!(*use_context::<Locale>().unwrap(), Locale("en"));

        locale.release();
        theme.release();
    }

    #[test]
    #[should_panic(expected = "LIFO")]
    fn test_out_of_order_release_panics() {
        reset_runtime();

        let outer = provide_context(Theme("dark"));
        let _inner = provide_context(Locale("en"));
        outer.release();
    }
}
