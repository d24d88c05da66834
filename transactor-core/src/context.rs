use std::{
    any::Any,
    fmt::{self, Debug},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

/// Opaque identity under which a [`Transactor`](crate::Transactor) stores its
/// active handle in a [`Context`].
///
/// Every call to [`ScopeKey::new`] returns a key different from all the
/// previous ones, so two transactors never read each other's scope.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ScopeKey(u64);

impl ScopeKey {
    pub fn new() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ScopeKey {
    fn default() -> Self {
        Self::new()
    }
}

struct Binding {
    key: ScopeKey,
    value: Arc<dyn Any + Send + Sync>,
    transaction: bool,
    parent: Option<Arc<Binding>>,
}

/// Immutable, request scoped bag of values passed down the call chain.
///
/// Deriving a context never changes the original one: `with_value` returns a
/// new context that sees every binding of its parent plus the new one. Cloning
/// is cheap.
#[derive(Clone, Default)]
pub struct Context {
    head: Option<Arc<Binding>>,
}

impl Context {
    /// Empty context, not inside any scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a context carrying `value` under `key`.
    pub fn with_value(&self, key: ScopeKey, value: Arc<dyn Any + Send + Sync>) -> Context {
        self.bind(key, value, false)
    }

    /// Derive a context carrying the transaction handle `value` under `key`.
    ///
    /// Same as [`Context::with_value`] but also marks the derived context as
    /// being inside a transaction, see [`Context::is_within_any_transaction`].
    pub fn with_transaction(&self, key: ScopeKey, value: Arc<dyn Any + Send + Sync>) -> Context {
        self.bind(key, value, true)
    }

    fn bind(&self, key: ScopeKey, value: Arc<dyn Any + Send + Sync>, transaction: bool) -> Context {
        Context {
            head: Some(Arc::new(Binding {
                key,
                value,
                transaction,
                parent: self.head.clone(),
            })),
        }
    }

    fn bindings(&self) -> impl Iterator<Item = &Binding> {
        let mut current = self.head.as_deref();
        std::iter::from_fn(move || {
            let binding = current?;
            current = binding.parent.as_deref();
            Some(binding)
        })
    }

    /// The innermost value bound under `key`, if any.
    pub fn value(&self, key: ScopeKey) -> Option<&Arc<dyn Any + Send + Sync>> {
        self.bindings()
            .find(|binding| binding.key == key)
            .map(|binding| &binding.value)
    }

    /// The innermost value bound under `key`, downcast to `T`.
    ///
    /// # Panics
    /// When the value under `key` is not a `T`. Keys are owned by a single
    /// transactor which always binds the same type, any other shape is a
    /// wiring bug.
    pub fn resolve<T: Any + Send + Sync>(&self, key: ScopeKey) -> Option<Arc<T>> {
        let value = self.value(key)?.clone();
        match value.downcast::<T>() {
            Ok(value) => Some(value),
            Err(..) => panic!(
                "The value bound to {:?} is not a `{}`",
                key,
                std::any::type_name::<T>()
            ),
        }
    }

    pub fn contains(&self, key: ScopeKey) -> bool {
        self.value(key).is_some()
    }

    /// True when any transactor bound a transaction in this context. Use
    /// `is_within_transaction` on a specific transactor to ask about that
    /// one only.
    pub fn is_within_any_transaction(&self) -> bool {
        self.bindings().any(|binding| binding.transaction)
    }
}

impl Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.bindings().map(|binding| binding.key))
            .finish()
    }
}
