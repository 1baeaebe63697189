//! Immutable, ordered middleware chains.

use std::fmt;

use tracing::debug;

use crate::dispatcher::default_dispatcher;
use crate::error::Error;
use crate::handler::{BoxedHandler, Handler};

use super::BoxedConstructor;

/// An ordered list of middleware constructors.
///
/// A chain is a value. Nothing mutates it after [`Chain::new`]: [`append`]
/// and [`extend`] return a new chain backed by its own storage, so a chain can
/// be shared between threads and used as the base for several routes without
/// locking.
///
/// ```rust
/// use obi::middleware::Chain;
///
/// let base = Chain::default();
/// let api = base.append([]);
/// assert_eq!(base.len(), 0);
/// assert_eq!(api.len(), 0);
/// ```
///
/// [`append`]: Chain::append
/// [`extend`]: Chain::extend
#[derive(Clone, Default)]
pub struct Chain {
    constructors: Vec<BoxedConstructor>,
}

impl Chain {
    /// Creates a chain holding `constructors` in iteration order.
    ///
    /// Constructors are not run here. A constructor that would fail only does
    /// so when the chain is materialized with [`then`](Chain::then).
    pub fn new<I>(constructors: I) -> Self
    where
        I: IntoIterator<Item = BoxedConstructor>,
    {
        Self { constructors: constructors.into_iter().collect() }
    }

    /// Returns a new chain with `more` after this chain's constructors.
    ///
    /// `self` is left as it was.
    pub fn append<I>(&self, more: I) -> Self
    where
        I: IntoIterator<Item = BoxedConstructor>,
    {
        let more = more.into_iter();
        let mut constructors = Vec::with_capacity(self.len() + more.size_hint().0);
        constructors.extend(self.constructors.iter().cloned());
        constructors.extend(more);
        Self { constructors }
    }

    /// Returns a new chain with `other`'s constructors after this chain's.
    ///
    /// Neither input is changed.
    pub fn extend(&self, other: &Chain) -> Self {
        self.append(other.constructors.iter().cloned())
    }

    /// Number of constructors in the chain.
    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    /// Whether the chain has no constructors.
    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }

    /// Composes the chain around `terminal` into a single handler.
    ///
    /// The first constructor ends up outermost, so at request time the layers
    /// run in the order they were declared, then the terminal. `None` stands
    /// for the process-wide [default dispatcher](crate::dispatcher). An empty
    /// chain returns the terminal itself, not a wrapper around it.
    ///
    /// # Errors
    ///
    /// Constructors are applied last to first. The first one to fail stops the
    /// build and its error is returned; constructors before it are never
    /// called.
    pub fn then(&self, terminal: Option<BoxedHandler>) -> Result<BoxedHandler, Error> {
        let terminal = terminal.unwrap_or_else(default_dispatcher);
        if self.is_empty() {
            return Ok(terminal);
        }

        debug!(layers = self.len(), "composing middleware chain");

        self.constructors
            .iter()
            .enumerate()
            .rev()
            .try_fold(terminal, |next, (index, constructor)| {
                constructor.wrap(next).map_err(|e| {
                    debug!(index, error = %e, "middleware constructor failed");
                    Error::construct(index, e)
                })
            })
    }

    /// Like [`then`](Chain::then), for a plain handler function.
    ///
    /// `None` maps to the default dispatcher exactly as in `then`.
    pub fn then_fn<H: Handler>(&self, terminal: Option<H>) -> Result<BoxedHandler, Error> {
        // Boxing first would hide `None` behind a handler.
        match terminal {
            Some(f) => self.then(Some(f.into_boxed_handler())),
            None => self.then(None),
        }
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain").field("layers", &self.len()).finish()
    }
}
