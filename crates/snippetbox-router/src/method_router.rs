//! HTTP method-based routing.
//!
//! [`MethodRouter`] maps HTTP methods to values for a single path pattern.

use http::Method;
use smallvec::SmallVec;

/// Maps HTTP methods to values for a single route pattern.
///
/// Most patterns carry one or two methods (`GET` and `POST` of a form), so
/// entries are stored inline.
///
/// # Example
///
/// ```rust
/// use snippetbox_router::MethodRouter;
/// use http::Method;
///
/// let router = MethodRouter::new()
///     .get("signup_form")
///     .post("signup");
///
/// assert_eq!(router.get_value(&Method::GET), Some(&"signup_form"));
/// assert_eq!(router.get_value(&Method::POST), Some(&"signup"));
/// assert_eq!(router.get_value(&Method::DELETE), None);
/// ```
#[derive(Debug, Clone)]
pub struct MethodRouter<T> {
    entries: SmallVec<[(Method, T); 2]>,
}

impl<T> Default for MethodRouter<T> {
    fn default() -> Self {
        Self {
            entries: SmallVec::new(),
        }
    }
}

impl<T> MethodRouter<T> {
    /// Creates a new empty method router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a GET value.
    #[must_use]
    pub fn get(self, value: T) -> Self {
        self.method(Method::GET, value)
    }

    /// Registers a POST value.
    #[must_use]
    pub fn post(self, value: T) -> Self {
        self.method(Method::POST, value)
    }

    /// Registers a value for an arbitrary method, replacing any previous one.
    #[must_use]
    pub fn method(mut self, method: Method, value: T) -> Self {
        if let Some(slot) = self.entries.iter_mut().find(|(m, _)| *m == method) {
            slot.1 = value;
        } else {
            self.entries.push((method, value));
        }
        self
    }

    /// Adds a value for `method`, handing it back if the method is taken.
    pub fn try_insert(&mut self, method: Method, value: T) -> Result<(), T> {
        if self.contains(&method) {
            return Err(value);
        }
        self.entries.push((method, value));
        Ok(())
    }

    /// Returns the value registered for `method`.
    #[must_use]
    pub fn get_value(&self, method: &Method) -> Option<&T> {
        self.entries
            .iter()
            .find(|(m, _)| m == method)
            .map(|(_, v)| v)
    }

    /// Returns true if `method` has a value.
    #[must_use]
    pub fn contains(&self, method: &Method) -> bool {
        self.entries.iter().any(|(m, _)| m == method)
    }

    /// Merges another method router into this one.
    ///
    /// Methods already present in `self` are kept; the duplicates from `other`
    /// are returned so the caller can report them.
    pub fn merge(&mut self, other: MethodRouter<T>) -> Vec<Method> {
        let mut rejected = Vec::new();
        for (method, value) in other.entries {
            if self.try_insert(method.clone(), value).is_err() {
                rejected.push(method);
            }
        }
        rejected
    }

    /// Returns true if any methods are registered.
    #[must_use]
    pub fn has_any_method(&self) -> bool {
        !self.entries.is_empty()
    }

    /// Returns the registered methods in registration order.
    #[must_use]
    pub fn allowed_methods(&self) -> Vec<Method> {
        self.entries.iter().map(|(m, _)| m.clone()).collect()
    }
}
