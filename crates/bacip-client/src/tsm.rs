//! Transaction state manager.
//!
//! Hands out invoke ids from a fixed pool and routes each confirmed reply to
//! the task that sent the request. A [`Transaction`] owns its id until it is
//! waited on, released or dropped, so ids cannot leak through cancelled
//! futures and a stale id never frees another caller's slot.

use crate::ClientError;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;

/// What the dispatcher hands a waiting request: the raw APDU of a reply, or
/// the error it decoded into.
pub type Reply = Result<Vec<u8>, ClientError>;

pub const DEFAULT_POOL_SIZE: usize = 20;
const MAX_POOL_SIZE: usize = 256;

#[derive(Debug, Default)]
struct Slot {
    in_use: bool,
    mailbox: Option<oneshot::Sender<Reply>>,
}

#[derive(Debug)]
struct Pool {
    slots: Box<[Mutex<Slot>]>,
    free: Mutex<VecDeque<u8>>,
}

impl Pool {
    fn release(&self, invoke_id: u8) {
        {
            let mut slot = lock(&self.slots[invoke_id as usize]);
            if !slot.in_use {
                return;
            }
            slot.in_use = false;
            slot.mailbox = None;
        }
        lock(&self.free).push_back(invoke_id);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Pool of invoke ids shared by the request path and the dispatcher.
#[derive(Debug, Clone)]
pub struct Tsm {
    pool: Arc<Pool>,
}

impl Default for Tsm {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_SIZE)
    }
}

impl Tsm {
    /// Creates a pool of `size` ids, clamped to `1..=256`.
    pub fn new(size: usize) -> Self {
        let size = size.clamp(1, MAX_POOL_SIZE);
        let slots = (0..size).map(|_| Mutex::new(Slot::default())).collect();
        let free = (0..size).map(|id| id as u8).collect();
        Self {
            pool: Arc::new(Pool {
                slots,
                free: Mutex::new(free),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.pool.slots.len()
    }

    /// Number of ids currently held by a [`Transaction`].
    pub fn in_use(&self) -> usize {
        self.capacity() - lock(&self.pool.free).len()
    }

    pub fn is_in_use(&self, invoke_id: u8) -> bool {
        self.pool
            .slots
            .get(invoke_id as usize)
            .is_some_and(|slot| lock(slot).in_use)
    }

    /// Reserves the id that has been free the longest.
    pub fn allocate(&self) -> Result<Transaction, ClientError> {
        let invoke_id = lock(&self.pool.free)
            .pop_front()
            .ok_or(ClientError::PoolExhausted)?;

        let (tx, rx) = oneshot::channel();
        {
            let mut slot = lock(&self.pool.slots[invoke_id as usize]);
            slot.in_use = true;
            slot.mailbox = Some(tx);
        }
        log::trace!("allocated invoke id {invoke_id}");

        Ok(Transaction {
            invoke_id,
            reply: Some(rx),
            pool: Some(self.pool.clone()),
        })
    }

    /// Delivers `reply` to the transaction holding `invoke_id`.
    ///
    /// Never blocks. Fails with [`ClientError::UnknownTransaction`] when the
    /// id is free, already answered, or its waiter has gone away.
    pub fn send(&self, invoke_id: u8, reply: Reply) -> Result<(), ClientError> {
        let unknown = ClientError::UnknownTransaction(invoke_id);
        let Some(slot) = self.pool.slots.get(invoke_id as usize) else {
            return Err(unknown);
        };
        let mailbox = {
            let mut slot = lock(slot);
            if !slot.in_use {
                return Err(unknown);
            }
            slot.mailbox.take()
        };
        mailbox
            .ok_or(ClientError::UnknownTransaction(invoke_id))?
            .send(reply)
            .map_err(|_| unknown)
    }
}

/// An outstanding confirmed request.
#[derive(Debug)]
pub struct Transaction {
    invoke_id: u8,
    reply: Option<oneshot::Receiver<Reply>>,
    pool: Option<Arc<Pool>>,
}

impl Transaction {
    pub fn invoke_id(&self) -> u8 {
        self.invoke_id
    }

    /// Waits up to `timeout` for the reply, then frees the id whatever the
    /// outcome.
    pub async fn wait(mut self, timeout: Duration) -> Reply {
        let Some(reply) = self.reply.take() else {
            return Err(ClientError::UnknownTransaction(self.invoke_id));
        };
        let result = match tokio::time::timeout(timeout, reply).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => Err(ClientError::UnknownTransaction(self.invoke_id)),
            Err(_) => {
                log::debug!("invoke id {} timed out after {timeout:?}", self.invoke_id);
                Err(ClientError::Timeout)
            }
        };
        self.release_slot();
        result
    }

    /// Gives the id back without waiting.
    pub fn release(mut self) {
        self.release_slot();
    }

    fn release_slot(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.release(self.invoke_id);
            log::trace!("released invoke id {}", self.invoke_id);
        }
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        self.release_slot();
    }
}
