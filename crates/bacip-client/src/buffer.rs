use std::sync::{Mutex, PoisonError};

/// Recycles receive buffers between the loop and its handler tasks.
#[derive(Debug)]
pub(crate) struct BufferPool {
    frame_len: usize,
    idle: Mutex<Vec<Vec<u8>>>,
    max_idle: usize,
}

impl BufferPool {
    pub(crate) fn new(frame_len: usize, max_idle: usize) -> Self {
        Self {
            frame_len,
            idle: Mutex::new(Vec::new()),
            max_idle,
        }
    }

    /// A zero-filled buffer of `frame_len` bytes.
    pub(crate) fn take(&self) -> Vec<u8> {
        let recycled = self
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();
        match recycled {
            Some(mut buf) => {
                buf.clear();
                buf.resize(self.frame_len, 0);
                buf
            }
            None => vec![0; self.frame_len],
        }
    }

    pub(crate) fn give_back(&self, buf: Vec<u8>) {
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        if idle.len() < self.max_idle {
            idle.push(buf);
        }
    }
}
