use super::gc::Gc;
use super::header::GcHeader;
use super::heap::Heap;
use super::trace::Trace;

use std::fmt;
use std::ops::Deref;
use std::ptr::NonNull;

pub(crate) type RootId = usize;

struct RootNode {
    target: Option<NonNull<GcHeader>>,
    prev: Option<RootId>,
    next: Option<RootId>,
}

/// Doubly linked list of persistent roots. Nodes live in a vector and are
/// addressed by stable index, so insertion and removal are both O(1).
/// Removed nodes are threaded onto a free list through their `next` link.
pub(crate) struct RootList {
    nodes: Vec<RootNode>,
    head: Option<RootId>,
    free: Option<RootId>,
    len: usize,
}

impl RootList {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            head: None,
            free: None,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn insert(&mut self, target: Option<NonNull<GcHeader>>) -> RootId {
        let node = RootNode {
            target,
            prev: None,
            next: self.head,
        };

        let id = match self.free {
            Some(id) => {
                self.free = self.nodes[id].next;
                self.nodes[id] = node;
                id
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        };

        if let Some(head) = self.head {
            self.nodes[head].prev = Some(id);
        }

        self.head = Some(id);
        self.len += 1;

        id
    }

    pub fn remove(&mut self, id: RootId) {
        let (prev, next) = {
            let node = &self.nodes[id];
            (node.prev, node.next)
        };

        match prev {
            Some(prev) => self.nodes[prev].next = next,
            None => self.head = next,
        }

        if let Some(next) = next {
            self.nodes[next].prev = prev;
        }

        self.nodes[id] = RootNode {
            target: None,
            prev: None,
            next: self.free,
        };
        self.free = Some(id);
        self.len -= 1;
    }

    pub fn set(&mut self, id: RootId, target: Option<NonNull<GcHeader>>) {
        self.nodes[id].target = target;
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<NonNull<GcHeader>>> + '_ {
        let mut current = self.head;

        std::iter::from_fn(move || {
            let node = &self.nodes[current?];
            current = node.next;
            Some(node.target)
        })
    }
}

/// A persistent root. The object it references survives every collection
/// for as long as the `Root` exists, independent of any scope.
///
/// Dropping the `Root` unregisters it. Cloning registers a second root for
/// the same object.
pub struct Root<'h, T: Trace> {
    heap: &'h Heap,
    id: RootId,
    gc: Gc<T>,
}

impl<'h, T: Trace> Root<'h, T> {
    /// Registers `gc` as a root of `heap`.
    ///
    /// # Panics
    /// If `gc` is not a live `T` of `heap`.
    pub fn new(heap: &'h Heap, gc: Gc<T>) -> Self {
        heap.assert_owns(gc);

        let id = heap.register_root(Some(gc.header()));

        Self { heap, id, gc }
    }

    pub fn gc(&self) -> Gc<T> {
        self.gc
    }

    /// Points this root at another object.
    ///
    /// # Panics
    /// If `gc` is not a live `T` of this root's heap.
    pub fn set(&mut self, gc: Gc<T>) {
        self.heap.assert_owns(gc);
        self.heap.update_root(self.id, Some(gc.header()));
        self.gc = gc;
    }
}

impl<'h, T: Trace> Deref for Root<'h, T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { self.gc.as_ref() }
    }
}

impl<'h, T: Trace> Clone for Root<'h, T> {
    fn clone(&self) -> Self {
        Root::new(self.heap, self.gc)
    }
}

impl<'h, T: Trace> Drop for Root<'h, T> {
    fn drop(&mut self) {
        self.heap.unregister_root(self.id);
    }
}

impl<'h, T: Trace> fmt::Debug for Root<'h, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Root")
            .field("id", &self.id)
            .field("gc", &self.gc)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ptr(n: usize) -> Option<NonNull<GcHeader>> {
        NonNull::new((n * 64) as *mut GcHeader)
    }

    #[test]
    fn insert_and_iterate_newest_first() {
        let mut list = RootList::new();

        list.insert(ptr(1));
        list.insert(ptr(2));
        list.insert(ptr(3));

        let targets: Vec<_> = list.iter().collect();

        assert_eq!(targets, vec![ptr(3), ptr(2), ptr(1)]);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn remove_head_middle_and_tail() {
        let mut list = RootList::new();
        let a = list.insert(ptr(1));
        let b = list.insert(ptr(2));
        let c = list.insert(ptr(3));
        let d = list.insert(ptr(4));

        list.remove(b);
        assert_eq!(list.iter().collect::<Vec<_>>(), vec![ptr(4), ptr(3), ptr(1)]);

        list.remove(d);
        assert_eq!(list.iter().collect::<Vec<_>>(), vec![ptr(3), ptr(1)]);

        list.remove(a);
        assert_eq!(list.iter().collect::<Vec<_>>(), vec![ptr(3)]);

        list.remove(c);
        assert_eq!(list.iter().count(), 0);
        assert_eq!(list.len(), 0);
    }

    #[test]
    fn removed_slots_are_reused() {
        let mut list = RootList::new();
        let a = list.insert(ptr(1));
        let _b = list.insert(ptr(2));

        list.remove(a);
        let c = list.insert(ptr(3));

        assert_eq!(a, c);
        assert_eq!(list.nodes.len(), 2);
        assert_eq!(list.iter().collect::<Vec<_>>(), vec![ptr(3), ptr(2)]);
    }

    #[test]
    fn set_updates_target() {
        let mut list = RootList::new();
        let a = list.insert(ptr(1));

        list.set(a, None);

        assert_eq!(list.iter().collect::<Vec<_>>(), vec![None]);
    }
}
