//! Async option resolver for select columns.
//!
//! Option lists for columns with a fetcher are cached per
//! `(row identity, column key, value of the depends_on column)`. Switching the
//! dependency value produces a new key, so stale lists are never reused and no
//! explicit invalidation exists.
//!
//! The engine never drives futures itself. [`OptionResolver::ensure`] hands
//! back an [`OptionLoad`] that the host spawns on its local executor; when it
//! settles the cache is updated and [`OptionResolver::revision`] moves, which
//! is the host's cue to re-render. The in-flight marker is cleared when the
//! load succeeds, fails, or is dropped unfinished.

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use rustc_hash::{FxHashMap, FxHashSet};

use crate::column::{ColumnDef, SelectOption};
use crate::value::Row;

/// Future returned by a column's option fetcher.
pub type OptionsFuture = Pin<Box<dyn Future<Output = Result<Vec<SelectOption>, OptionFetchError>>>>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OptionFetchError {
    #[error("option source unavailable: {0}")]
    Unavailable(String),
    #[error("option fetch failed: {0}")]
    Failed(String),
}

/// Cache key for one option list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OptionKey {
    pub row_id: String,
    pub column: String,
    pub dependency: String,
}

#[derive(Debug, Default)]
struct ResolverState {
    cache: FxHashMap<OptionKey, Vec<SelectOption>>,
    in_flight: FxHashSet<OptionKey>,
    revision: u64,
}

/// Shared handle to the option cache. Clones see the same cache.
#[derive(Debug, Clone)]
pub struct OptionResolver {
    state: Rc<RefCell<ResolverState>>,
    id_key: Rc<str>,
}

impl OptionResolver {
    pub fn new(id_key: &str) -> Self {
        Self {
            state: Rc::default(),
            id_key: Rc::from(id_key),
        }
    }

    pub fn key_for(&self, row: &Row, col: &ColumnDef) -> OptionKey {
        OptionKey {
            row_id: row.text(&self.id_key),
            column: col.key.clone(),
            dependency: col.depends_on.as_deref().map(|k| row.text(k)).unwrap_or_default(),
        }
    }

    /// Start fetching options for `(row, col)` unless they are static, cached
    /// or already being fetched.
    pub fn ensure(&self, row: &Row, col: &ColumnDef) -> Option<OptionLoad> {
        if col.options.is_some() {
            return None;
        }
        let fetcher = col.fetcher.as_ref()?;
        let key = self.key_for(row, col);
        {
            let mut state = self.state.borrow_mut();
            if state.cache.contains_key(&key) || state.in_flight.contains(&key) {
                return None;
            }
            state.in_flight.insert(key.clone());
        }
        log::debug!("fetching options for {}/{} ({})", key.row_id, key.column, key.dependency);

        let guard = InFlightGuard {
            key,
            state: Rc::clone(&self.state),
        };
        Some(OptionLoad {
            fetch: fetcher(row),
            guard: Some(guard),
        })
    }

    /// Static options, or the cached list (empty until resolved).
    pub fn options(&self, row: &Row, col: &ColumnDef) -> Vec<SelectOption> {
        if let Some(options) = &col.options {
            return options.clone();
        }
        let key = self.key_for(row, col);
        self.state.borrow().cache.get(&key).cloned().unwrap_or_default()
    }

    /// Like [`options`](Self::options) but `None` while no list is known.
    pub fn resolved(&self, row: &Row, col: &ColumnDef) -> Option<Vec<SelectOption>> {
        if let Some(options) = &col.options {
            return Some(options.clone());
        }
        col.fetcher.as_ref()?;
        let key = self.key_for(row, col);
        self.state.borrow().cache.get(&key).cloned()
    }

    /// Static options, or a fetched list that has landed.
    pub fn is_resolved(&self, row: &Row, col: &ColumnDef) -> bool {
        self.resolved(row, col).is_some()
    }

    pub fn is_loading(&self, row: &Row, col: &ColumnDef) -> bool {
        let key = self.key_for(row, col);
        self.state.borrow().in_flight.contains(&key)
    }

    /// Bumped every time a load settles.
    pub fn revision(&self) -> u64 {
        self.state.borrow().revision
    }
}

/// Clears the in-flight marker however the load ends.
struct InFlightGuard {
    key: OptionKey,
    state: Rc<RefCell<ResolverState>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut state = self.state.borrow_mut();
        state.in_flight.remove(&self.key);
        state.revision += 1;
    }
}

/// A pending option fetch. Spawn it on a local executor.
#[must_use = "an OptionLoad does nothing unless polled"]
pub struct OptionLoad {
    fetch: OptionsFuture,
    guard: Option<InFlightGuard>,
}

impl OptionLoad {
    pub fn key(&self) -> Option<&OptionKey> {
        self.guard.as_ref().map(|g| &g.key)
    }
}

impl Future for OptionLoad {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();
        if this.guard.is_none() {
            return Poll::Ready(());
        }
        let result = match this.fetch.as_mut().poll(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(result) => result,
        };
        if let Some(guard) = this.guard.take() {
            match result {
                Ok(options) => {
                    guard.state.borrow_mut().cache.insert(guard.key.clone(), options);
                }
                Err(e) => {
                    log::warn!("{e} for {}/{}", guard.key.row_id, guard.key.column);
                }
            }
        }
        Poll::Ready(())
    }
}

/// Options whose label contains `query`, case-insensitively. Used by the
/// select menu while the user types.
pub fn filter_options<'a>(options: &'a [SelectOption], query: &str) -> Vec<&'a SelectOption> {
    let q = query.to_lowercase();
    options
        .iter()
        .filter(|o| q.is_empty() || o.label.to_lowercase().contains(&q))
        .collect()
}
