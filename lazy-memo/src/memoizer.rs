use std::convert::Infallible;

use crate::{ComputeOnce, Error, Guarantee, Strategy};

/// A [`ComputeOnce`] whose [`Strategy`] is chosen at runtime.
///
/// The factory is bound at construction. The first [`Self::get`] runs it; every later call,
/// from any thread, returns a reference to the same value without running it again.
pub struct LazyMemoizer<T, E = Infallible> {
    strategy: Strategy,
    inner: Box<dyn ComputeOnce<Value = T, Error = E>>,
}

impl<T, E> LazyMemoizer<T, E>
where
    T: Send + Sync + 'static,
    E: 'static,
{
    pub fn new<F>(strategy: Strategy, factory: F) -> Self
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        LazyMemoizer {
            strategy,
            inner: strategy.build(factory),
        }
    }

    /// Like [`Self::new`], but for callers that may not have a factory at hand.
    ///
    /// A missing factory is rejected right away rather than on first use.
    pub fn from_optional<F>(strategy: Strategy, factory: Option<F>) -> Result<Self, Error>
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        match factory {
            Some(factory) => Ok(Self::new(strategy, factory)),
            None => Err(Error::InvalidArgument("factory must be present")),
        }
    }

    /// See [`ComputeOnce::get`].
    #[inline]
    pub fn get(&self) -> Result<&T, E> {
        self.inner.get()
    }

    pub fn is_computed(&self) -> bool {
        self.inner.is_computed()
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn guarantee(&self) -> Guarantee {
        self.inner.guarantee()
    }
}

impl<T> LazyMemoizer<T, Infallible>
where
    T: Send + Sync + 'static,
{
    pub fn infallible<F>(strategy: Strategy, factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::new(strategy, move || Ok(factory()))
    }

    pub fn value(&self) -> &T {
        match self.get() {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }
}

impl<T, E> std::fmt::Debug for LazyMemoizer<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyMemoizer")
            .field("strategy", &self.strategy)
            .field("computed", &self.inner.is_computed())
            .finish()
    }
}
