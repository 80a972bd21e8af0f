use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts drops of the [`DropCounter`] values it hands out.
#[derive(Clone, Debug, Default)]
pub struct DropTracker {
    drops: Arc<AtomicUsize>,
}

impl DropTracker {
    pub fn new() -> DropTracker {
        DropTracker::default()
    }

    /// A new tracked value.
    pub fn item(&self, value: usize) -> DropCounter {
        DropCounter {
            value,
            drops: self.drops.clone(),
        }
    }

    /// Number of tracked values dropped so far.
    pub fn dropped(&self) -> usize {
        self.drops.load(Ordering::SeqCst)
    }
}

/// A value that bumps its tracker's counter when dropped. Clones are tracked too.
#[derive(Debug)]
pub struct DropCounter {
    pub value: usize,
    drops: Arc<AtomicUsize>,
}

impl Clone for DropCounter {
    fn clone(&self) -> Self {
        DropCounter {
            value: self.value,
            drops: self.drops.clone(),
        }
    }
}

impl PartialEq for DropCounter {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Drop for DropCounter {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

/// A tracked value whose clones start panicking once a shared fuse runs out.
///
/// All clones share the fuse, so `CloneBomb::new(tracker.item(0), 3)` allows three
/// clones in total (of the original or of any clone) and panics on the fourth.
#[derive(Debug)]
pub struct CloneBomb {
    pub item: DropCounter,
    fuse: Arc<AtomicUsize>,
}

impl CloneBomb {
    pub fn new(item: DropCounter, clones: usize) -> CloneBomb {
        CloneBomb {
            item,
            fuse: Arc::new(AtomicUsize::new(clones)),
        }
    }

    /// Clones still allowed before the next one panics.
    pub fn remaining(&self) -> usize {
        self.fuse.load(Ordering::SeqCst)
    }
}

impl Clone for CloneBomb {
    fn clone(&self) -> Self {
        let left = self
            .fuse
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if left.is_err() {
            panic!("clone bomb {} went off", self.item.value);
        }
        CloneBomb {
            item: self.item.clone(),
            fuse: self.fuse.clone(),
        }
    }
}
