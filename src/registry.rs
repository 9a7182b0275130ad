use crate::{DisplayNode, Pool, PoolConfig, Poolable};
use log::debug;
use std::{
    any::{Any, TypeId},
    cell::RefCell,
    collections::HashMap,
    fmt,
    rc::Rc,
};

/// Type erased view of a pool, enough for registry wide sweeps.
trait ManagedPool {
    fn return_all_instances(&self);
    fn clear_nulls(&self);
    fn as_any(&self) -> &dyn Any;
}

impl<T: Poolable> ManagedPool for Pool<T> {
    fn return_all_instances(&self) {
        Pool::return_all_instances(self)
    }

    fn clear_nulls(&self) {
        Pool::clear_nulls(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

type NameKey = (TypeId, String);
type TemplateKey = (TypeId, usize);

fn template_key<T: Poolable>(template: &Rc<T>) -> TemplateKey {
    // The pool keeps its template alive, so the address stays unique for as
    // long as the entry exists.
    (TypeId::of::<T>(), Rc::as_ptr(template) as *const () as usize)
}

fn downcast<T: Poolable>(pool: &Rc<dyn ManagedPool>) -> Option<Pool<T>> {
    pool.as_any().downcast_ref::<Pool<T>>().cloned()
}

thread_local! {
    static GLOBAL: Registry = Registry::new();
}

/// Lookup of pools by name or by template, plus maintenance sweeps over
/// every pool it knows about.
///
/// Names are scoped per resource type, so `"fx"` can name one pool of
/// sparks and another of decals. Entries are never removed: they live as
/// long as the registry.
///
/// Every method takes `&self` and releases its internal borrow before
/// calling into pools, so resources may reach the registry from their own
/// callbacks.
#[derive(Default)]
pub struct Registry {
    by_name: RefCell<HashMap<NameKey, Rc<dyn ManagedPool>>>,
    by_template: RefCell<HashMap<TemplateKey, Rc<dyn ManagedPool>>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` against this thread's registry, creating it on first use.
    ///
    /// The registry lives until the thread exits; there is no teardown.
    pub fn with_global<R>(f: impl FnOnce(&Registry) -> R) -> R {
        GLOBAL.with(f)
    }

    /// Returns the pool registered under `name`, creating it from
    /// `template` with `prespawn` free instances if there is none.
    ///
    /// Repeat calls return the existing pool and ignore their arguments.
    pub fn register_named<T: Poolable>(&self, name: &str, template: Rc<T>, prespawn: usize) -> Pool<T> {
        self.register_named_with_config(name, template, PoolConfig::new().prespawn(prespawn), None)
    }

    /// Like [`Self::register_named`], building a new pool from `config`
    /// and attaching its instances under `parent`.
    pub fn register_named_with_config<T: Poolable>(
        &self,
        name: &str,
        template: Rc<T>,
        config: PoolConfig,
        parent: Option<Rc<T::Parent>>,
    ) -> Pool<T> {
        if let Some(pool) = self.lookup_named::<T>(name) {
            return pool;
        }
        // Built outside the borrow, prespawning runs host code.
        let pool = Pool::with_config(template, config, parent);
        let entry = self
            .by_name
            .borrow_mut()
            .entry((TypeId::of::<T>(), name.to_owned()))
            .or_insert_with(|| Rc::new(pool.clone()) as Rc<dyn ManagedPool>)
            .clone();
        debug!("registered pool {name:?}");
        downcast(&entry).unwrap_or(pool)
    }

    /// Returns the pool registered under `name`, if any.
    pub fn lookup_named<T: Poolable>(&self, name: &str) -> Option<Pool<T>> {
        let key = (TypeId::of::<T>(), name.to_owned());
        let by_name = self.by_name.borrow();
        by_name.get(&key).and_then(downcast)
    }

    /// Returns the pool for `template`, creating an empty one on first use.
    ///
    /// Templates are compared by identity, not by value.
    pub fn lookup_by_template<T: Poolable>(&self, template: &Rc<T>) -> Pool<T> {
        let key = template_key(template);
        if let Some(pool) = self.by_template.borrow().get(&key).and_then(downcast) {
            return pool;
        }
        let pool = Pool::new(template.clone(), 0, None);
        let erased: Rc<dyn ManagedPool> = Rc::new(pool.clone());
        self.by_template.borrow_mut().insert(key, erased);
        debug!("created pool for template {:p}", Rc::as_ptr(template));
        pool
    }

    /// Takes an instance from the pool of `template`.
    pub fn spawn<T: Poolable>(&self, template: &Rc<T>) -> Option<Rc<T>> {
        self.lookup_by_template(template).get_instance()
    }

    /// Number of pools across both maps.
    pub fn pool_count(&self) -> usize {
        self.by_name.borrow().len() + self.by_template.borrow().len()
    }

    fn snapshot(&self) -> Vec<Rc<dyn ManagedPool>> {
        let by_name = self.by_name.borrow();
        let by_template = self.by_template.borrow();
        by_name.values().chain(by_template.values()).cloned().collect()
    }

    /// Calls [`Pool::return_all_instances`] on every registered pool.
    pub fn return_global_instances(&self) {
        let pools = self.snapshot();
        debug!("returning instances of {} pools", pools.len());
        for pool in pools {
            pool.return_all_instances();
        }
    }

    /// Calls [`Pool::clear_nulls`] on every registered pool.
    pub fn clear_global_nulls(&self) {
        let pools = self.snapshot();
        debug!("clearing stale instances of {} pools", pools.len());
        for pool in pools {
            pool.clear_nulls();
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("named", &self.by_name.borrow().len())
            .field("by_template", &self.by_template.borrow().len())
            .finish()
    }
}

/// Safe-destroys every poolable resource below `root`, leaving `root` itself
/// alone.
///
/// The walk stops at the nearest poolable descendant on each branch; that
/// resource's own safe destroy takes care of whatever hangs below it, so
/// every pooled resource is destroyed exactly once.
pub fn cascade_safe_destroy(root: &dyn DisplayNode) {
    let mut pending = root.children();
    while let Some(node) = pending.pop() {
        match node.recyclable() {
            Some(resource) => resource.destroy_safe(),
            None => pending.extend(node.children()),
        }
    }
}
