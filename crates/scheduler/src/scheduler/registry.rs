//! Ordered task registry.
//!
//! Task nodes live in a generation-tagged arena so that a [`TaskId`] stays
//! valid only as long as the node it names. Active nodes are additionally
//! threaded through an intrusive doubly linked list that defines the
//! scheduling order. Paused nodes (parents waiting on a chained child) stay
//! in the arena but are not linked.

use std::fmt;

use super::routine::Routine;

/// Identifier of a task node: slot index plus slot generation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId {
    index: u32,
    generation: u32,
}

impl TaskId {
    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TaskId({}:{})", self.index, self.generation)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.index, self.generation)
    }
}

/// Bookkeeping record for one routine.
pub struct TaskNode {
    /// `None` while the routine is out of the node being stepped.
    pub(crate) routine: Option<Box<dyn Routine>>,
    /// Parent to re-queue once this node completes. Non-owning.
    pub(crate) resume_link: Option<TaskId>,
    /// Set when the chain is canceled mid-step; released once the step returns.
    pub(crate) cancel_requested: bool,
    prev: Option<TaskId>,
    next: Option<TaskId>,
    linked: bool,
}

impl TaskNode {
    pub fn name(&self) -> &str {
        self.routine.as_deref().map_or("<stepping>", |r| r.name())
    }

    /// Whether the node's routine is currently running a step.
    pub fn is_stepping(&self) -> bool {
        self.routine.is_none()
    }

    pub fn resume_link(&self) -> Option<TaskId> {
        self.resume_link
    }

    pub fn is_linked(&self) -> bool {
        self.linked
    }
}

impl fmt::Debug for TaskNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskNode")
            .field("name", &self.name())
            .field("resume_link", &self.resume_link)
            .field("linked", &self.linked)
            .finish()
    }
}

enum Slot {
    Occupied { node: TaskNode, generation: u32 },
    Vacant { next_free: Option<u32>, generation: u32 },
}

/// Arena of task nodes plus the ordered list of active ones.
pub struct TaskRegistry {
    slots: Vec<Slot>,
    free_head: Option<u32>,
    head: Option<TaskId>,
    tail: Option<TaskId>,
    /// Number of linked (active) nodes.
    active: usize,
    /// Number of occupied slots (active + paused).
    live: usize,
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_head: None,
            head: None,
            tail: None,
            active: 0,
            live: 0,
        }
    }

    /// Number of active (scheduled) nodes.
    pub fn len(&self) -> usize {
        self.active
    }

    pub fn is_empty(&self) -> bool {
        self.active == 0
    }

    /// Number of nodes held by the arena, active or paused.
    pub fn live(&self) -> usize {
        self.live
    }

    pub fn head(&self) -> Option<TaskId> {
        self.head
    }

    pub fn tail(&self) -> Option<TaskId> {
        self.tail
    }

    /// Store a new, unlinked node and return its id.
    pub fn insert(&mut self, routine: Box<dyn Routine>, resume_link: Option<TaskId>) -> TaskId {
        let node = TaskNode {
            routine: Some(routine),
            resume_link,
            cancel_requested: false,
            prev: None,
            next: None,
            linked: false,
        };
        self.live += 1;

        if let Some(index) = self.free_head {
            let slot = &mut self.slots[index as usize];
            let (next_free, generation) = match slot {
                Slot::Vacant { next_free, generation } => (*next_free, *generation),
                Slot::Occupied { .. } => unreachable!("free list pointed to occupied slot"),
            };
            self.free_head = next_free;
            *slot = Slot::Occupied { node, generation };
            TaskId { index, generation }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot::Occupied { node, generation: 0 });
            TaskId { index, generation: 0 }
        }
    }

    pub fn get(&self, id: TaskId) -> Option<&TaskNode> {
        match self.slots.get(id.index as usize)? {
            Slot::Occupied { node, generation } if *generation == id.generation => Some(node),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, id: TaskId) -> Option<&mut TaskNode> {
        match self.slots.get_mut(id.index as usize)? {
            Slot::Occupied { node, generation } if *generation == id.generation => Some(node),
            _ => None,
        }
    }

    /// Whether `id` still names a node (active or paused).
    pub fn contains(&self, id: TaskId) -> bool {
        self.get(id).is_some()
    }

    /// Whether `id` names an active node.
    pub fn is_linked(&self, id: TaskId) -> bool {
        self.get(id).is_some_and(|n| n.linked)
    }

    pub fn resume_link(&self, id: TaskId) -> Option<TaskId> {
        self.get(id).and_then(|n| n.resume_link)
    }

    /// Live successor of an active node.
    pub fn next(&self, id: TaskId) -> Option<TaskId> {
        self.get(id).filter(|n| n.linked).and_then(|n| n.next)
    }

    /// Append a node to the tail. Returns false if the id is stale or
    /// the node is already scheduled.
    pub fn push_back(&mut self, id: TaskId) -> bool {
        let old_tail = self.tail;
        match self.get_mut(id) {
            Some(node) if !node.linked => {
                node.linked = true;
                node.prev = old_tail;
                node.next = None;
            }
            _ => return false,
        }
        match old_tail.and_then(|t| self.get_mut(t)) {
            Some(tail) => tail.next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        self.active += 1;
        true
    }

    /// Take a node out of the scheduling order, keeping it in the arena.
    pub fn unlink(&mut self, id: TaskId) -> bool {
        let (prev, next) = match self.get_mut(id) {
            Some(node) if node.linked => {
                node.linked = false;
                (node.prev.take(), node.next.take())
            }
            _ => return false,
        };
        match prev.and_then(|p| self.get_mut(p)) {
            Some(p) => p.next = next,
            None => self.head = next,
        }
        match next.and_then(|n| self.get_mut(n)) {
            Some(n) => n.prev = prev,
            None => self.tail = prev,
        }
        self.active -= 1;
        true
    }

    /// Drop a node from the arena, unlinking it first if needed. The slot's
    /// generation is bumped so every outstanding id for it goes stale.
    pub fn release(&mut self, id: TaskId) -> Option<TaskNode> {
        if !self.contains(id) {
            return None;
        }
        self.unlink(id);
        let slot = &mut self.slots[id.index as usize];
        let vacant = Slot::Vacant {
            next_free: self.free_head,
            generation: id.generation.wrapping_add(1),
        };
        match std::mem::replace(slot, vacant) {
            Slot::Occupied { node, .. } => {
                self.free_head = Some(id.index);
                self.live -= 1;
                Some(node)
            }
            Slot::Vacant { .. } => unreachable!("contains() checked occupancy"),
        }
    }

    /// Release `id` and every paused ancestor reachable through resume links.
    /// Returns how many nodes were dropped.
    pub fn release_chain(&mut self, id: TaskId) -> usize {
        let mut released = 0;
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            match self.release(current) {
                Some(node) => {
                    released += 1;
                    cursor = node.resume_link;
                }
                None => break,
            }
        }
        released
    }

    /// Walk `id`'s resume links (starting with `id` itself) looking for `root`.
    pub fn chain_reaches(&self, id: TaskId, root: TaskId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == root {
                return true;
            }
            cursor = self.resume_link(current);
        }
        false
    }

    /// Active ids in scheduling order.
    pub fn iter(&self) -> impl Iterator<Item = TaskId> + '_ {
        std::iter::successors(self.head, move |id| self.next(*id))
    }

    /// Release every node. Slots are kept so their generations survive and
    /// ids issued before the clear stay stale.
    pub fn clear(&mut self) {
        let mut free_head = None;
        for (index, slot) in self.slots.iter_mut().enumerate().rev() {
            let generation = match slot {
                Slot::Occupied { generation, .. } => generation.wrapping_add(1),
                Slot::Vacant { generation, .. } => *generation,
            };
            *slot = Slot::Vacant {
                next_free: free_head,
                generation,
            };
            free_head = Some(index as u32);
        }
        self.free_head = free_head;
        self.head = None;
        self.tail = None;
        self.active = 0;
        self.live = 0;
    }
}

impl fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("active", &self.iter().collect::<Vec<_>>())
            .field("live", &self.live)
            .finish()
    }
}
