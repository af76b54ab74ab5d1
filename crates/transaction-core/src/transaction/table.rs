use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, MutexGuard};
use sigcore_sip_core::Message;
use tracing::trace;

use super::matching::{match_reply, match_request};
use super::{TimerPayload, Transaction, TransactionId, TransactionType};
use crate::timer::TimerQueue;

/// Fixed-size hash table of transactions.
///
/// Each bucket has its own lock, so traffic of unrelated transactions
/// never contends. A request and everything that belongs to it hash to
/// the same bucket since only the Call-ID and the CSeq number are hashed.
#[derive(Debug)]
pub struct TransactionTable {
    buckets: Box<[Mutex<Bucket>]>,
    serial: AtomicU64,
}

impl TransactionTable {
    pub fn new(bucket_count: usize) -> Self {
        let buckets = (0..bucket_count.max(1))
            .map(|index| {
                Mutex::new(Bucket {
                    index: index as u32,
                    transactions: Vec::new(),
                })
            })
            .collect();
        Self {
            buckets,
            serial: AtomicU64::new(1),
        }
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Bucket index for a Call-ID and a CSeq number
    pub fn bucket_index(&self, call_id: &[u8], cseq_num: &[u8]) -> u32 {
        let mut hasher = DefaultHasher::new();
        hasher.write(call_id);
        hasher.write(cseq_num);
        (hasher.finish() % self.buckets.len() as u64) as u32
    }

    /// Bucket index for a message
    pub fn bucket_of(&self, msg: &Message) -> u32 {
        self.bucket_index(msg.call_id.as_bytes(), msg.cseq.num_str.as_bytes())
    }

    /// Locks a bucket; out of range indices wrap around
    pub fn lock(&self, index: u32) -> MutexGuard<'_, Bucket> {
        self.buckets[index as usize % self.buckets.len()].lock()
    }

    /// Allocates the id of a new transaction in `bucket`
    pub fn next_id(&self, bucket: u32) -> TransactionId {
        TransactionId {
            bucket,
            serial: self.serial.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Number of live transactions, locking each bucket in turn
    pub fn len(&self) -> usize {
        self.buckets.iter().map(|b| b.lock().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The transactions of one table slot
#[derive(Debug)]
pub struct Bucket {
    index: u32,
    transactions: Vec<Transaction>,
}

impl Bucket {
    pub fn index(&self) -> u32 {
        self.index
    }

    /// First server transaction the request belongs to
    pub fn match_request(&mut self, msg: &Message) -> Option<&mut Transaction> {
        self.transactions.iter_mut().find(|t| match_request(t, msg))
    }

    /// First client transaction the reply belongs to
    pub fn match_reply(&mut self, msg: &Message) -> Option<&mut Transaction> {
        self.transactions.iter_mut().find(|t| match_reply(t, msg))
    }

    pub fn find(&mut self, id: TransactionId) -> Option<&mut Transaction> {
        self.transactions.iter_mut().find(|t| t.id == id)
    }

    pub fn get(&self, id: TransactionId) -> Option<&Transaction> {
        self.transactions.iter().find(|t| t.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Transaction> {
        self.transactions.iter_mut()
    }

    /// Creates a transaction for `request` in its initial state
    pub fn add_transaction(
        &mut self,
        id: TransactionId,
        request: Message,
        kind: TransactionType,
    ) -> &mut Transaction {
        debug_assert_eq!(id.bucket, self.index);
        let t = Transaction::new(id, kind, request);
        trace!(id = %id, kind = ?kind, state = ?t.state, "Transaction added");
        self.transactions.push(t);
        let last = self.transactions.len() - 1;
        &mut self.transactions[last]
    }

    /// Unlinks a transaction after cancelling all of its timers
    pub fn remove_transaction(
        &mut self,
        id: TransactionId,
        queue: &TimerQueue<TimerPayload>,
    ) -> Option<Transaction> {
        let pos = self.transactions.iter().position(|t| t.id == id)?;
        let mut t = self.transactions.remove(pos);
        t.reset_all_timers(queue);
        trace!(id = %id, state = ?t.state, "Transaction removed");
        Some(t)
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}
