#![allow(dead_code)]

use recycle_pool::*;
use std::{
    cell::{Cell, RefCell},
    rc::{Rc, Weak},
};

/// Minimal display tree node.
pub struct Node {
    pub alive: Cell<bool>,
    pub active: Cell<bool>,
    children: RefCell<Vec<Rc<Node>>>,
    component: RefCell<Option<Weak<dyn Recyclable>>>,
}

impl Node {
    pub fn new() -> Rc<Self> {
        Rc::new(Node {
            alive: Cell::new(true),
            active: Cell::new(true),
            children: RefCell::new(Vec::new()),
            component: RefCell::new(None),
        })
    }

    pub fn add_child(&self, child: Rc<Node>) {
        self.children.borrow_mut().push(child);
    }

    pub fn child_count(&self) -> usize {
        self.children.borrow().len()
    }
}

impl DisplayNode for Node {
    fn children(&self) -> Vec<Rc<dyn DisplayNode>> {
        self.children
            .borrow()
            .iter()
            .map(|c| c.clone() as Rc<dyn DisplayNode>)
            .collect()
    }

    fn recyclable(&self) -> Option<Rc<dyn Recyclable>> {
        self.component.borrow().as_ref().and_then(Weak::upgrade)
    }
}

/// Pooled resource backed by a `Node`.
pub struct Effect {
    pub node: Rc<Node>,
    pool: RefCell<Option<WeakPool<Effect>>>,
    created: Rc<Cell<usize>>,
    pub destroyed: Cell<bool>,
    pub destroy_calls: Cell<usize>,
}

impl Effect {
    /// A template; counts every instance made from it.
    pub fn template() -> Rc<Self> {
        Self::spawn(Rc::new(Cell::new(0)))
    }

    fn spawn(created: Rc<Cell<usize>>) -> Rc<Self> {
        let effect = Rc::new(Effect {
            node: Node::new(),
            pool: RefCell::new(None),
            created,
            destroyed: Cell::new(false),
            destroy_calls: Cell::new(0),
        });
        let weak: Weak<Effect> = Rc::downgrade(&effect);
        *effect.node.component.borrow_mut() = Some(weak as Weak<dyn Recyclable>);
        effect
    }

    pub fn created(&self) -> usize {
        self.created.get()
    }

    pub fn is_active(&self) -> bool {
        self.node.active.get()
    }

    /// Destroys the backing node the way a host would, bypassing the pool.
    pub fn kill(&self) {
        self.node.alive.set(false);
    }
}

impl Poolable for Effect {
    type Parent = Node;

    fn instantiate(&self) -> Rc<Self> {
        self.created.set(self.created.get() + 1);
        Effect::spawn(self.created.clone())
    }

    fn activate(&self) {
        self.node.active.set(true);
    }

    fn deactivate(&self) {
        self.node.active.set(false);
    }

    fn is_valid(&self) -> bool {
        self.node.alive.get()
    }

    fn display(&self) -> Rc<dyn DisplayNode> {
        self.node.clone()
    }

    fn bind_pool(&self, pool: WeakPool<Self>) {
        *self.pool.borrow_mut() = Some(pool);
    }

    fn current_pool(&self) -> Option<Pool<Self>> {
        self.pool.borrow().as_ref().and_then(WeakPool::upgrade)
    }

    fn attach_to(&self, parent: &Node) {
        parent.add_child(self.node.clone());
    }

    fn destroy(&self) {
        self.destroyed.set(true);
        self.destroy_calls.set(self.destroy_calls.get() + 1);
        self.node.alive.set(false);
    }
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
