use crate::{Gc, GcConfig, GcState, Heap, Local, Root, Trace};
use std::cell::Cell;
use std::mem::{align_of, size_of};
use std::ptr::NonNull;

#[derive(Trace)]
struct Link {
    value: usize,
    next: Cell<Option<Gc<Link>>>,
}

impl Link {
    fn new(value: usize) -> Self {
        Self {
            value,
            next: Cell::new(None),
        }
    }
}

#[test]
fn alloc_and_read() {
    let heap = Heap::new();

    heap.scope(|s| {
        let num = s.alloc(69usize).unwrap();

        assert_eq!(*num, 69);
        assert_eq!(heap.object_count(), 1);
    });
}

#[test]
fn handles_are_released_with_their_scope() {
    let heap = Heap::new();

    heap.scope(|s| {
        s.alloc(1usize).unwrap();
        s.alloc(2usize).unwrap();

        assert_eq!(heap.metrics().handles, 2);
        assert_eq!(heap.metrics().open_scopes, 1);
    });

    let metrics = heap.metrics();

    assert_eq!(metrics.handles, 0);
    assert_eq!(metrics.open_scopes, 0);
    assert_eq!(heap.collect().reclaimed, 2);
}

#[test]
fn copying_a_local_does_not_register() {
    let heap = Heap::new();

    heap.scope(|s| {
        let a = s.alloc(Link::new(1)).unwrap();
        let b = a;
        let _c = b;

        assert_eq!(heap.metrics().handles, 1);
    });
}

#[test]
fn rebinding_the_same_object_is_a_noop() {
    let heap = Heap::new();

    heap.scope(|s| {
        let a = s.alloc(Link::new(1)).unwrap();
        let b = s.alloc(Link::new(2)).unwrap();
        let mut local: Local<'_, Link> = Local::empty();

        local.set(s, a.gc());
        local.set(s, a.gc());
        assert_eq!(heap.metrics().handles, 3);

        local.set(s, b.gc());
        assert_eq!(heap.metrics().handles, 4);
        assert_eq!(local.value, 2);
    });
}

#[test]
#[should_panic]
fn deref_unbound_local() {
    let local: Local<'_, usize> = Local::empty();

    assert!(*local == 123);
}

#[test]
#[should_panic]
fn bind_through_outer_scope() {
    let heap = Heap::new();

    heap.scope(|outer| {
        let a = outer.alloc(1usize).unwrap();

        outer.nested(|_inner| {
            outer.bind(a.gc());
        });
    });
}

#[test]
#[should_panic]
fn escape_from_outer_scope() {
    let heap = Heap::new();

    heap.scope(|outer| {
        outer.nested(|_inner| {
            let _ = outer.escape(|s| s.alloc(1usize));
        });
    });
}

#[derive(Trace)]
struct Greedy;

struct CollectOnMark<'h> {
    heap: &'h Heap,
}

impl<'h> crate::GcObserver for CollectOnMark<'h> {
    fn mark_start(&self, _: &Heap) {
        self.heap.collect();
    }
}

#[test]
#[should_panic]
fn reentrant_collection() {
    let heap: &'static Heap = Box::leak(Box::new(Heap::new()));

    heap.set_observer(std::rc::Rc::new(CollectOnMark { heap }));
    heap.collect();
}

#[test]
fn state_is_idle_between_collections() {
    let heap = Heap::new();

    assert_eq!(heap.state(), GcState::Idle);
    heap.collect();
    assert_eq!(heap.state(), GcState::Idle);
}

#[test]
fn unit_struct_is_a_leaf() {
    assert!(<Greedy as Trace>::IS_LEAF);
    assert!(!<Link as Trace>::IS_LEAF);
}

#[test]
fn root_keeps_chain_alive() {
    let heap = Heap::new();
    let root = heap.scope(|s| {
        let a = s.alloc(Link::new(1)).unwrap();
        let b = s.alloc(Link::new(2)).unwrap();

        a.next.set(Some(b.gc()));

        Root::new(&heap, a.gc())
    });

    for _ in 0..10 {
        assert_eq!(heap.collect().survivors, 2);
    }

    assert_eq!(root.value, 1);
    heap.scope(|s| assert_eq!(s.bind(root.next.get().unwrap()).value, 2));
    assert_eq!(heap.metrics().roots, 1);

    drop(root);

    assert_eq!(heap.metrics().roots, 0);
    assert_eq!(heap.collect().reclaimed, 2);
}

#[test]
fn rooting_a_local_and_binding_it_back() {
    let heap = Heap::new();

    heap.scope(|s| {
        let root = s.root(s.alloc(Link::new(5)).unwrap());

        assert_eq!(heap.metrics().roots, 1);

        s.nested(|inner| {
            let local = inner.bind_root(&root);

            assert_eq!(local.gc(), root.gc());
            assert_eq!(heap.metrics().handles, 2);
        });
    });

    assert_eq!(heap.metrics().roots, 0);
    assert_eq!(heap.collect().reclaimed, 1);
}

#[test]
fn retargeting_a_root() {
    let heap = Heap::new();
    let (mut root, other) = heap.scope(|s| {
        let a = s.alloc(Link::new(1)).unwrap();
        let b = s.alloc(Link::new(2)).unwrap();

        (Root::new(&heap, a.gc()), Root::new(&heap, b.gc()))
    });

    root.set(other.gc());
    drop(other);

    let stats = heap.collect();

    assert_eq!(stats.survivors, 1);
    assert_eq!(stats.reclaimed, 1);
    assert_eq!(root.value, 2);
}

#[test]
fn cloned_root_is_a_separate_registration() {
    let heap = Heap::new();
    let root = heap.scope(|s| Root::new(&heap, s.alloc(Link::new(7)).unwrap().gc()));
    let clone = root.clone();

    assert_eq!(heap.metrics().roots, 2);
    drop(root);

    assert_eq!(heap.collect().survivors, 1);
    assert_eq!(clone.value, 7);
}

#[test]
fn zero_threshold_collects_on_every_alloc() {
    let heap = Heap::with_config(GcConfig::new().with_collect_threshold(0));

    heap.scope(|s| {
        for i in 0..10 {
            s.alloc(i).unwrap();
        }
    });

    assert_eq!(heap.metrics().collections, 10);
    assert_eq!(heap.object_count(), 10);
}

#[test]
fn gc_size_and_align_equals_nonnull() {
    assert_eq!(size_of::<Gc<()>>(), size_of::<NonNull<()>>());
    assert_eq!(align_of::<Gc<()>>(), align_of::<NonNull<()>>());
    assert_eq!(size_of::<Option<Gc<Link>>>(), size_of::<NonNull<()>>());
}

#[test]
#[should_panic(expected = "not a live object")]
fn binding_a_reclaimed_object() {
    let heap = Heap::new();
    let stale = heap.scope(|s| s.alloc(Link::new(1)).unwrap().gc());

    assert_eq!(heap.collect().reclaimed, 1);

    heap.scope(|s| {
        s.bind(stale);
    });
}

#[test]
#[should_panic(expected = "not a live object")]
fn rooting_a_reclaimed_object() {
    let heap = Heap::new();
    let stale = heap.scope(|s| s.alloc(Link::new(1)).unwrap().gc());

    heap.collect();
    Root::new(&heap, stale);
}

#[test]
#[should_panic(expected = "not a live object")]
fn binding_through_another_heap() {
    let a = Heap::new();
    let b = Heap::new();

    a.scope(|sa| {
        let link = sa.alloc(Link::new(1)).unwrap();

        b.scope(|sb| {
            sb.bind(link.gc());
        });
    });
}

#[test]
fn bind_opt_follows_optional_links() {
    let heap = Heap::new();

    heap.scope(|s| {
        let a = s.alloc(Link::new(1)).unwrap();
        let b = s.alloc(Link::new(2)).unwrap();

        a.next.set(Some(b.gc()));

        let next = s.bind_opt(a.next.get()).unwrap();

        assert_eq!(next.value, 2);
        assert!(s.bind_opt(next.next.get()).is_none());
    });
}

#[test]
fn reclaimed_references_are_not_traced() {
    let heap = Heap::new();
    let stale = heap.scope(|s| s.alloc(Link::new(1)).unwrap().gc());

    assert_eq!(heap.collect().reclaimed, 1);

    heap.scope(|s| {
        let holder = s.alloc(Link::new(2)).unwrap();

        holder.next.set(Some(stale));

        let stats = heap.collect();

        assert_eq!(stats.survivors, 1);
        assert_eq!(stats.reclaimed, 0);
        assert_eq!(holder.value, 2);
    });
}
