use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

const BITS_PER_WHEEL: u32 = 8;
const WHEELS: usize = 4;
const SLOTS: usize = 1 << BITS_PER_WHEEL;
const SLOT_MASK: u32 = (SLOTS - 1) as u32;

/// Longest delay a timer can be armed with.
///
/// Expiries are compared on the wrapping 32-bit clock, so anything 2^31 or
/// more ticks ahead would read as already past. [`TimerQueue::insert`]
/// clamps longer delays to this value: such a timer fires late, never
/// early.
pub const MAX_DELAY_TICKS: u32 = (1 << 31) - 1;

/// Handle of an armed timer, unique for the lifetime of a wheel
pub type TimerId = u64;

/// Wrap-around safe `a < b` on the 32-bit tick counter
pub fn less_ts(a: u32, b: u32) -> bool {
    a.wrapping_sub(b) > 1 << 31
}

/// A timer that fired, with the payload it was armed with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expired<T> {
    pub id: TimerId,
    pub payload: T,
}

enum Request<T> {
    Insert {
        id: TimerId,
        expires: u32,
        payload: T,
    },
    Remove(TimerId),
}

struct Shared<T> {
    clock: AtomicU32,
    next_id: AtomicU64,
    pending: Mutex<Vec<Request<T>>>,
}

/// Sending side of a [`TimerWheel`].
///
/// Insertions and removals are queued and applied at the start of the
/// wheel's next tick, so callers never contend with the tick itself.
pub struct TimerQueue<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for TimerQueue<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> fmt::Debug for TimerQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TimerQueue(now={})", self.now())
    }
}

impl<T> TimerQueue<T> {
    /// Current value of the wheel's tick counter
    pub fn now(&self) -> u32 {
        self.shared.clock.load(Ordering::Acquire)
    }

    /// Arms a timer expiring `delay` ticks from now
    pub fn insert(&self, delay: u32, payload: T) -> TimerId {
        let expires = self.now().wrapping_add(delay.min(MAX_DELAY_TICKS));
        self.insert_at(expires, payload)
    }

    /// Arms a timer expiring at the absolute tick `expires`.
    ///
    /// An expiry already in the past fires on the next tick.
    pub fn insert_at(&self, expires: u32, payload: T) -> TimerId {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        self.shared.pending.lock().push(Request::Insert {
            id,
            expires,
            payload,
        });
        id
    }

    /// Cancels a timer; a no-op if it already fired or was removed
    pub fn remove(&self, id: TimerId) {
        self.shared.pending.lock().push(Request::Remove(id));
    }
}

struct Entry<T> {
    id: TimerId,
    expires: u32,
    payload: T,
    prev: Option<usize>,
    next: Option<usize>,
    slot: usize,
}

/// Hierarchical timing wheel: four levels of 256 slots over a 32-bit
/// tick counter.
///
/// Entries live in a slab and are linked into slots by index. A timer
/// sits in the lowest level whose digit differs from the clock; when a
/// level's digit rolls over, the slot reached is cascaded one level down.
pub struct TimerWheel<T> {
    shared: Arc<Shared<T>>,
    clock: u32,
    heads: Vec<Option<usize>>,
    entries: Vec<Option<Entry<T>>>,
    free: Vec<usize>,
    index: HashMap<TimerId, usize>,
}

impl<T> Default for TimerWheel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerWheel<T> {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Creates a wheel whose tick counter starts at `clock`
    pub fn starting_at(clock: u32) -> Self {
        Self {
            shared: Arc::new(Shared {
                clock: AtomicU32::new(clock),
                next_id: AtomicU64::new(1),
                pending: Mutex::new(Vec::new()),
            }),
            clock,
            heads: vec![None; WHEELS * SLOTS],
            entries: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Returns a handle for arming timers from other threads
    pub fn queue(&self) -> TimerQueue<T> {
        TimerQueue {
            shared: self.shared.clone(),
        }
    }

    pub fn now(&self) -> u32 {
        self.clock
    }

    /// Number of timers placed in the wheel; queued requests are not counted
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Absolute expiry tick of a timer placed in the wheel
    pub fn expiry(&self, id: TimerId) -> Option<u32> {
        let idx = self.index.get(&id)?;
        self.entries[*idx].as_ref().map(|e| e.expires)
    }

    /// Advances the clock by one tick and returns the timers that expired
    pub fn tick(&mut self) -> Vec<Expired<T>> {
        // levels whose digit rolls over with this tick
        let mut rolled = 0;
        let mut mask = SLOT_MASK;
        while rolled < WHEELS - 1 && self.clock & mask == mask {
            rolled += 1;
            mask <<= BITS_PER_WHEEL;
        }

        self.clock = self.clock.wrapping_add(1);
        self.shared.clock.store(self.clock, Ordering::Release);

        for wheel in (1..=rolled).rev() {
            let pos = self.digit(self.clock, wheel);
            for idx in self.detach(wheel, pos) {
                self.place_from(idx, wheel - 1);
            }
        }

        let requests = std::mem::take(&mut *self.shared.pending.lock());
        for request in requests {
            match request {
                Request::Insert {
                    id,
                    expires,
                    payload,
                } => self.insert_entry(id, expires, payload),
                Request::Remove(id) => self.remove_entry(id),
            }
        }

        let pos = self.digit(self.clock, 0);
        let due = self.detach(0, pos);
        let mut expired = Vec::with_capacity(due.len());
        for idx in due {
            if let Some(entry) = self.entries[idx].take() {
                self.free.push(idx);
                self.index.remove(&entry.id);
                expired.push(Expired {
                    id: entry.id,
                    payload: entry.payload,
                });
            }
        }
        if !expired.is_empty() {
            trace!(tick = self.clock, count = expired.len(), "Timers expired");
        }
        expired
    }

    fn digit(&self, value: u32, wheel: usize) -> usize {
        ((value >> (wheel as u32 * BITS_PER_WHEEL)) & SLOT_MASK) as usize
    }

    fn insert_entry(&mut self, id: TimerId, expires: u32, payload: T) {
        let entry = Entry {
            id,
            expires,
            payload,
            prev: None,
            next: None,
            slot: 0,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.entries[idx] = Some(entry);
                idx
            }
            None => {
                self.entries.push(Some(entry));
                self.entries.len() - 1
            }
        };
        self.index.insert(id, idx);

        if less_ts(expires, self.clock) {
            // late timers go to the slot processed by this tick
            let pos = self.digit(self.clock, 0);
            self.link(idx, pos);
        } else {
            self.place_from(idx, WHEELS - 1);
        }
    }

    fn remove_entry(&mut self, id: TimerId) {
        if let Some(idx) = self.index.remove(&id) {
            self.unlink(idx);
            self.entries[idx] = None;
            self.free.push(idx);
        }
    }

    fn place_from(&mut self, idx: usize, top: usize) {
        let Some(expires) = self.entries[idx].as_ref().map(|e| e.expires) else {
            return;
        };
        let diff = expires ^ self.clock;
        let mut wheel = top;
        while wheel > 0 && self.digit(diff, wheel) == 0 {
            wheel -= 1;
        }
        let slot = wheel * SLOTS + self.digit(expires, wheel);
        self.link(idx, slot);
    }

    fn link(&mut self, idx: usize, slot: usize) {
        let head = self.heads[slot];
        if let Some(entry) = self.entries[idx].as_mut() {
            entry.prev = None;
            entry.next = head;
            entry.slot = slot;
        }
        if let Some(next) = head.and_then(|h| self.entries[h].as_mut()) {
            next.prev = Some(idx);
        }
        self.heads[slot] = Some(idx);
    }

    fn unlink(&mut self, idx: usize) {
        let Some((prev, next, slot)) = self.entries[idx].as_ref().map(|e| (e.prev, e.next, e.slot)) else {
            return;
        };
        match prev {
            Some(p) => {
                if let Some(entry) = self.entries[p].as_mut() {
                    entry.next = next;
                }
            }
            None => self.heads[slot] = next,
        }
        if let Some(entry) = next.and_then(|n| self.entries[n].as_mut()) {
            entry.prev = prev;
        }
    }

    /// Empties a slot, returning the entries that were linked into it
    fn detach(&mut self, wheel: usize, pos: usize) -> Vec<usize> {
        let mut cursor = self.heads[wheel * SLOTS + pos].take();
        let mut detached = Vec::new();
        while let Some(idx) = cursor {
            cursor = self.entries[idx].as_mut().and_then(|e| {
                e.prev = None;
                e.next.take()
            });
            detached.push(idx);
        }
        detached
    }
}

impl<T> fmt::Debug for TimerWheel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerWheel")
            .field("clock", &self.clock)
            .field("armed", &self.index.len())
            .finish()
    }
}
