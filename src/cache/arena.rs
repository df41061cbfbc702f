//! Doubly linked list stored in a `Vec`.
//!
//! Nodes are addressed by stable `usize` handles; freed slots go on a
//! free-list and are reused by later pushes. Handles stay valid until the
//! node they name is removed.

#[derive(Debug)]
struct Node<T> {
    value: T,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug)]
pub(crate) struct ArenaList<T> {
    slots: Vec<Option<Node<T>>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl<T> ArenaList<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// Append at the tail, returning the new node's handle.
    pub fn push_back(&mut self, value: T) -> usize {
        let node = Node {
            value,
            prev: self.tail,
            next: None,
        };
        let handle = match self.free.pop() {
            Some(handle) => {
                self.slots[handle] = Some(node);
                handle
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };
        match self.tail {
            Some(tail) => self.link_mut(tail).next = Some(handle),
            None => self.head = Some(handle),
        }
        self.tail = Some(handle);
        self.len += 1;
        handle
    }

    pub fn pop_front(&mut self) -> Option<T> {
        self.head.and_then(|head| self.remove(head))
    }

    /// Unlink `handle`. Returns `None` if it is not a live node.
    pub fn remove(&mut self, handle: usize) -> Option<T> {
        let node = self.slots.get_mut(handle)?.take()?;
        match node.prev {
            Some(prev) => self.link_mut(prev).next = node.next,
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => self.link_mut(next).prev = node.prev,
            None => self.tail = node.prev,
        }
        self.free.push(handle);
        self.len -= 1;
        Some(node.value)
    }

    fn link_mut(&mut self, handle: usize) -> &mut Node<T> {
        match self.slots[handle].as_mut() {
            Some(node) => node,
            None => unreachable!("linked handle {} points at a free slot", handle),
        }
    }

    #[cfg(test)]
    fn values(&self) -> Vec<&T> {
        let mut out = Vec::with_capacity(self.len);
        let mut cursor = self.head;
        while let Some(handle) = cursor {
            let node = self.slots[handle].as_ref().unwrap();
            out.push(&node.value);
            cursor = node.next;
        }
        out
    }
}
