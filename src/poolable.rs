use crate::{cascade_safe_destroy, Pool, WeakPool};
use std::rc::Rc;

/// A node of the host's display tree.
///
/// The pool never owns display nodes. It only walks them when a composite
/// resource is torn down, see [`cascade_safe_destroy`].
pub trait DisplayNode {
    /// Returns a snapshot of the direct children of this node.
    ///
    /// A snapshot is required because destroying a child may detach it from
    /// this node while the sweep is still running.
    fn children(&self) -> Vec<Rc<dyn DisplayNode>>;

    /// Returns the poolable component living on this node, if any.
    fn recyclable(&self) -> Option<Rc<dyn Recyclable>>;
}

/// Object safe view of a poolable resource, used by cascade destroy to reach
/// resources of any type hanging below a display node.
pub trait Recyclable {
    /// Tears the resource down the safe way: pooled children first, then
    /// the resource itself goes back to its pool, or is destroyed for real if
    /// it has no pool.
    fn destroy_safe(&self);
}

/// A trait defining the capability contract of a pooled resource.
///
/// Handles are `Rc<Self>`; the pool identifies them by address. Every method
/// is a host side effect the pool treats as opaque, and may call back into
/// the pool.
pub trait Poolable: Sized + 'static {
    /// Grouping context newly created instances are attached under.
    type Parent: ?Sized;

    /// Creates a new instance using `self` as the template.
    fn instantiate(&self) -> Rc<Self>;

    /// Makes the instance live (shown, ticking, ...).
    fn activate(&self);

    /// Puts the instance to sleep while it sits in the free list.
    fn deactivate(&self);

    /// Whether the underlying resource still exists.
    ///
    /// By default, this method always returns true. Override it when the
    /// host can destroy resources behind the pool's back.
    #[inline(always)]
    fn is_valid(&self) -> bool {
        true
    }

    /// The display object that is shown or hidden for this instance. Its
    /// sub-tree is swept by [`cascade_safe_destroy`].
    fn display(&self) -> Rc<dyn DisplayNode>;

    /// Stores a back-reference to the pool that owns this instance.
    fn bind_pool(&self, pool: WeakPool<Self>);

    /// Returns the owning pool if one is bound and still alive.
    fn current_pool(&self) -> Option<Pool<Self>>;

    /// Attaches the instance under `parent`.
    ///
    /// By default, this method does nothing.
    #[inline(always)]
    fn attach_to(&self, _parent: &Self::Parent) {}

    /// Destroys the instance for real. Only used for instances that are not
    /// bound to a pool.
    fn destroy(&self);
}

impl<T: Poolable> Recyclable for T {
    fn destroy_safe(&self) {
        destroy_safe(self)
    }
}

/// Returns the pooled children of `handle` to their pools, then returns
/// `handle` to its own pool, or destroys it if it is not pooled.
pub fn destroy_safe<T: Poolable>(handle: &T) {
    cascade_safe_destroy(&*handle.display());
    match handle.current_pool() {
        Some(pool) => pool.return_instance(handle),
        None => handle.destroy(),
    }
}
