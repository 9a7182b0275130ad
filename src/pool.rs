use crate::{destroy_safe, PoolConfig, PoolError, Poolable};
use log::{debug, trace, warn};
use std::{
    cell::{Ref, RefCell, RefMut},
    fmt,
    rc::{Rc, Weak},
};

/// A recycling pool of `Rc<T>` handles, for use on a single thread.
///
/// Every handle the pool ever created is kept in `all`; the ones available
/// for allocation are also in `free`. A handle that is in `all` but not in
/// `free` is in use. `Pool` is a cheap reference counted handle, cloning it
/// yields another reference to the same pool.
pub struct Pool<T: Poolable> {
    inner: Rc<PoolInner<T>>,
}

struct PoolInner<T: Poolable> {
    template: Rc<T>,
    parent: Option<Rc<T::Parent>>,
    state: RefCell<PoolState<T>>,
}

struct PoolState<T> {
    // creation order, shrinks only in `clear_nulls`
    all: Vec<Rc<T>>,
    free: Vec<Rc<T>>,
    max_instances: Option<usize>,
}

/// Point in time counters of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoolStats {
    /// Handles created and not yet swept as stale.
    pub total: usize,
    /// Handles ready for allocation.
    pub free: usize,
    /// Handles handed out and not returned.
    pub in_use: usize,
    /// Current cap, `None` if unbounded.
    pub max_instances: Option<usize>,
}

#[inline]
fn same<T>(a: &Rc<T>, b: &T) -> bool {
    Rc::as_ptr(a) == b as *const T
}

impl<T> PoolState<T> {
    fn has_room(&self) -> bool {
        self.max_instances.map_or(true, |max| self.all.len() < max)
    }

    fn is_free(&self, handle: &T) -> bool {
        self.free.iter().any(|h| same(h, handle))
    }

    fn tracked(&self, handle: &T) -> Option<&Rc<T>> {
        self.all.iter().find(|h| same(h, handle))
    }
}

impl<T: Poolable> Pool<T> {
    /// Creates a pool bound to `template` and immediately manufactures
    /// `prespawn` free instances.
    ///
    /// Newly created instances are attached under `parent` when one is
    /// given.
    pub fn new(template: Rc<T>, prespawn: usize, parent: Option<Rc<T::Parent>>) -> Self {
        Self::with_config(template, PoolConfig::new().prespawn(prespawn), parent)
    }

    /// Creates a pool from a [`PoolConfig`].
    ///
    /// The cap is applied before prespawning, so a prespawn count above the
    /// cap stops at the cap. An invalid cap is ignored and the pool starts
    /// unbounded.
    pub fn with_config(template: Rc<T>, config: PoolConfig, parent: Option<Rc<T::Parent>>) -> Self {
        let pool = Pool {
            inner: Rc::new(PoolInner {
                template,
                parent,
                state: RefCell::new(PoolState {
                    all: Vec::with_capacity(config.prespawn),
                    free: Vec::with_capacity(config.prespawn),
                    max_instances: None,
                }),
            }),
        };
        if let Some(max) = config.max_instances {
            pool.set_max_instances(max);
        }
        pool.add_instances(config.prespawn);
        pool
    }

    fn state(&self) -> Ref<'_, PoolState<T>> {
        self.inner.state.borrow()
    }

    fn state_mut(&self) -> RefMut<'_, PoolState<T>> {
        self.inner.state.borrow_mut()
    }

    /// Returns a non-owning reference to this pool, suitable for storing
    /// inside the handles it creates.
    pub fn downgrade(&self) -> WeakPool<T> {
        WeakPool {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Returns true if both values refer to the same pool.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Rc::ptr_eq(&this.inner, &other.inner)
    }

    /// The template new instances are manufactured from.
    pub fn template(&self) -> &Rc<T> {
        &self.inner.template
    }

    /// Manufactures one new instance and leaves it free.
    ///
    /// This is the only way the pool grows. Returns `None` without touching
    /// the pool once the cap is reached.
    pub fn add_instance(&self) -> Option<Rc<T>> {
        if !self.state().has_room() {
            trace!("pool at capacity, not creating a new instance");
            return None;
        }
        let handle = self.inner.template.instantiate();
        handle.deactivate();
        handle.bind_pool(self.downgrade());
        {
            let mut state = self.state_mut();
            // the calls above may have grown the pool themselves
            if !state.has_room() {
                drop(state);
                trace!("pool filled up while creating an instance, discarding it");
                handle.destroy();
                return None;
            }
            state.all.push(handle.clone());
            state.free.push(handle.clone());
            trace!("created pooled instance #{}", state.all.len());
        }
        if let Some(parent) = &self.inner.parent {
            handle.attach_to(parent);
        }
        Some(handle)
    }

    /// Calls [`Self::add_instance`] `count` times. Calls past the cap are
    /// harmless no-ops.
    pub fn add_instances(&self, count: usize) {
        for _ in 0..count {
            let _ = self.add_instance();
        }
    }

    /// Hands out an active instance.
    ///
    /// The first valid free instance is reused; stale ones are skipped but
    /// left for [`Self::clear_nulls`]. If nothing is free a new instance is
    /// created, and `None` is returned when the cap forbids that.
    pub fn get_instance(&self) -> Option<Rc<T>> {
        let reused = loop {
            let free = self.state().free.clone();
            let Some(candidate) = free.into_iter().find(|h| h.is_valid()) else {
                break None;
            };
            let mut state = self.state_mut();
            // is_valid may have reentered the pool and taken it already
            if let Some(i) = state.free.iter().position(|h| Rc::ptr_eq(h, &candidate)) {
                state.free.remove(i);
                break Some(candidate);
            }
        };
        let handle = match reused {
            Some(handle) => {
                trace!("reusing pooled instance");
                handle
            }
            None => {
                let handle = self.add_instance()?;
                let mut state = self.state_mut();
                if let Some(i) = state.free.iter().rposition(|h| Rc::ptr_eq(h, &handle)) {
                    state.free.remove(i);
                }
                handle
            }
        };
        handle.activate();
        Some(handle)
    }

    /// Puts `handle` back in the free list and deactivates it.
    ///
    /// Handles that are already free, or that this pool never created, are
    /// ignored.
    pub fn return_instance(&self, handle: &T) {
        let handle = {
            let mut state = self.state_mut();
            if state.is_free(handle) {
                debug!("ignoring return of an instance that is already free");
                return;
            }
            let Some(tracked) = state.tracked(handle).cloned() else {
                debug!("ignoring return of an instance this pool does not own");
                return;
            };
            state.free.push(tracked.clone());
            tracked
        };
        handle.deactivate();
        trace!("instance returned to pool");
    }

    /// Safe-destroys every instance currently in use, which normally sends
    /// each one back to this pool along with its pooled children.
    pub fn return_all_instances(&self) {
        let in_use: Vec<Rc<T>> = {
            let state = self.state();
            state
                .all
                .iter()
                .filter(|h| !state.is_free(h))
                .cloned()
                .collect()
        };
        debug!("returning {} in-use instances", in_use.len());
        for handle in &in_use {
            // an earlier cascade may have returned it already
            if self.is_free(handle) {
                continue;
            }
            destroy_safe(&**handle);
        }
    }

    /// Drops instances whose underlying resource no longer exists from both
    /// lists, keeping the order of the survivors.
    pub fn clear_nulls(&self) {
        let all = self.state().all.clone();
        let stale: Vec<Rc<T>> = all.into_iter().filter(|h| !h.is_valid()).collect();
        if stale.is_empty() {
            return;
        }
        let is_stale = |h: &Rc<T>| stale.iter().any(|s| Rc::ptr_eq(s, h));
        let mut state = self.state_mut();
        let before = state.all.len();
        state.all.retain(|h| !is_stale(h));
        state.free.retain(|h| !is_stale(h));
        let removed = before - state.all.len();
        if removed > 0 {
            debug!("cleared {removed} stale instances, {} remain", state.all.len());
        }
    }

    /// Caps the number of instances this pool may create.
    ///
    /// A cap of zero is rejected and the previous cap is kept.
    pub fn set_max_instances(&self, max: usize) {
        if let Err(err) = self.try_set_max_instances(max) {
            warn!("{err}");
        }
    }

    /// Like [`Self::set_max_instances`] but reports a rejected cap.
    pub fn try_set_max_instances(&self, max: usize) -> Result<(), PoolError> {
        if max == 0 {
            return Err(PoolError::ZeroMaxInstances);
        }
        self.state_mut().max_instances = Some(max);
        Ok(())
    }

    /// Removes the cap.
    pub fn clear_max_instances(&self) {
        self.state_mut().max_instances = None;
    }

    /// The current cap, `None` if unbounded.
    pub fn max_instances(&self) -> Option<usize> {
        self.state().max_instances
    }

    /// Number of instances created and not yet swept as stale.
    ///
    /// Instances destroyed by the host keep counting against the cap until
    /// the next [`Self::clear_nulls`].
    pub fn len(&self) -> usize {
        self.state().all.len()
    }

    /// Returns `true` if the pool has never created an instance, or every
    /// instance it created was swept as stale.
    pub fn is_empty(&self) -> bool {
        self.state().all.is_empty()
    }

    /// Number of instances ready to be handed out, stale ones included.
    pub fn free_count(&self) -> usize {
        self.state().free.len()
    }

    /// Number of instances handed out and not returned.
    pub fn in_use_count(&self) -> usize {
        let state = self.state();
        state.all.len() - state.free.len()
    }

    /// Whether this pool created `handle`.
    pub fn contains(&self, handle: &T) -> bool {
        self.state().tracked(handle).is_some()
    }

    /// Whether `handle` is currently in the free list.
    pub fn is_free(&self, handle: &T) -> bool {
        self.state().is_free(handle)
    }

    /// Snapshot of the pool counters.
    pub fn stats(&self) -> PoolStats {
        let state = self.state();
        PoolStats {
            total: state.all.len(),
            free: state.free.len(),
            in_use: state.all.len() - state.free.len(),
            max_instances: state.max_instances,
        }
    }
}

impl<T: Poolable> Clone for Pool<T> {
    fn clone(&self) -> Self {
        Pool {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Poolable> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.state.try_borrow() {
            Ok(state) => f
                .debug_struct("Pool")
                .field("total", &state.all.len())
                .field("free", &state.free.len())
                .field("max_instances", &state.max_instances)
                .finish(),
            Err(_) => f.debug_struct("Pool").finish_non_exhaustive(),
        }
    }
}

/// A non-owning reference to a [`Pool`].
///
/// Handles keep one of these so a pooled resource can find its owner without
/// keeping the pool alive.
pub struct WeakPool<T: Poolable> {
    inner: Weak<PoolInner<T>>,
}

impl<T: Poolable> WeakPool<T> {
    /// Returns the pool if it still exists.
    pub fn upgrade(&self) -> Option<Pool<T>> {
        self.inner.upgrade().map(|inner| Pool { inner })
    }
}

impl<T: Poolable> Clone for WeakPool<T> {
    fn clone(&self) -> Self {
        WeakPool {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Poolable> fmt::Debug for WeakPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakPool")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}
