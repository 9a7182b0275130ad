use criterion::{black_box, criterion_group, criterion_main, Criterion};
use recycle_pool::*;
use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

struct Leaf;

impl DisplayNode for Leaf {
    fn children(&self) -> Vec<Rc<dyn DisplayNode>> {
        Vec::new()
    }

    fn recyclable(&self) -> Option<Rc<dyn Recyclable>> {
        None
    }
}

struct Particle {
    display: Rc<Leaf>,
    active: Cell<bool>,
    buffer: RefCell<Vec<u8>>,
    pool: RefCell<Option<WeakPool<Particle>>>,
}

const PARTICLE_BUFFER_SIZE: usize = 64 * 1024;

impl Particle {
    fn template() -> Rc<Self> {
        Rc::new(Particle {
            display: Rc::new(Leaf),
            active: Cell::new(false),
            buffer: RefCell::new(Vec::with_capacity(PARTICLE_BUFFER_SIZE)),
            pool: RefCell::new(None),
        })
    }
}

impl Poolable for Particle {
    type Parent = ();

    fn instantiate(&self) -> Rc<Self> {
        Particle::template()
    }

    #[inline(always)]
    fn activate(&self) {
        self.active.set(true);
    }

    #[inline(always)]
    fn deactivate(&self) {
        self.active.set(false);
        self.buffer.borrow_mut().clear();
    }

    fn display(&self) -> Rc<dyn DisplayNode> {
        self.display.clone()
    }

    fn bind_pool(&self, pool: WeakPool<Self>) {
        *self.pool.borrow_mut() = Some(pool);
    }

    fn current_pool(&self) -> Option<Pool<Self>> {
        self.pool.borrow().as_ref().and_then(WeakPool::upgrade)
    }

    fn destroy(&self) {}
}

fn allocate(c: &mut Criterion) {
    c.bench_function("pool_get_return", |b| {
        let pool = Pool::new(Particle::template(), 64, None);
        b.iter(|| {
            let obj = black_box(pool.get_instance()).unwrap();
            black_box(obj.buffer.borrow().capacity());
            pool.return_instance(&obj);
        })
    });
    c.bench_function("pool_destroy_safe", |b| {
        let pool = Pool::new(Particle::template(), 64, None);
        b.iter(|| {
            let obj = black_box(pool.get_instance()).unwrap();
            obj.destroy_safe();
        })
    });
    c.bench_function("system", |b| {
        b.iter(|| {
            let obj = black_box(Particle::template());
            black_box(obj.buffer.borrow().capacity())
        })
    });
}

fn allocate_burst(c: &mut Criterion) {
    c.bench_function("pool_burst_return_all", |b| {
        let registry = Registry::new();
        let template = Particle::template();
        registry.lookup_by_template(&template).add_instances(256);
        b.iter(|| {
            for _ in 0..256 {
                black_box(registry.spawn(&template));
            }
            registry.return_global_instances();
        })
    });
}

fn allocate_multi(c: &mut Criterion) {
    use rayon::prelude::*;
    // Pools are !Send: every task churns a pool of its own.
    c.bench_function("pool_multi", |b| {
        b.iter(|| {
            (0..64).into_par_iter().for_each(|_i| {
                let pool = Pool::new(Particle::template(), 8, None);
                for _ in 0..128 {
                    let obj = black_box(pool.get_instance()).unwrap();
                    pool.return_instance(&obj);
                }
            });
        })
    });

    c.bench_function("system_multi", |b| {
        b.iter(|| {
            (0..64).into_par_iter().for_each(|_i| {
                for _ in 0..128 {
                    let obj = black_box(Particle::template());
                    black_box(obj.buffer.borrow().capacity());
                }
            });
        })
    });
}
criterion_group!(benches, allocate, allocate_burst, allocate_multi);
criterion_main!(benches);
