use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// Single-outstanding-request gate for compile requests from one code editor.
///
/// The UI thread takes a [`CompileTicket`] before posting a compile; the ticket travels with
/// the request and releases the gate when the engine thread drops it.
#[derive(Debug, Default)]
pub struct CompilationThrottle {
    pending: Mutex<bool>,
}

impl CompilationThrottle {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn is_pending(&self) -> bool {
        *self.lock()
    }

    pub fn try_acquire(self: &Arc<Self>) -> Option<CompileTicket> {
        let mut pending = self.lock();
        if *pending {
            return None;
        }
        *pending = true;
        Some(CompileTicket { throttle: Arc::clone(self) })
    }

    fn release(&self) {
        *self.lock() = false;
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub struct CompileTicket {
    throttle: Arc<CompilationThrottle>,
}

impl fmt::Debug for CompileTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CompileTicket")
    }
}

impl Drop for CompileTicket {
    fn drop(&mut self) {
        self.throttle.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn only_one_ticket_outstanding() {
        let throttle = CompilationThrottle::new();
        let ticket = throttle.try_acquire().expect("first ticket");
        assert!(throttle.is_pending());
        assert!(throttle.try_acquire().is_none());
        drop(ticket);
        assert!(!throttle.is_pending());
        assert!(throttle.try_acquire().is_some());
    }

    #[test]
    fn ticket_released_on_another_thread() {
        let throttle = CompilationThrottle::new();
        let ticket = throttle.try_acquire().expect("ticket");
        thread::spawn(move || drop(ticket)).join().expect("join");
        assert!(!throttle.is_pending());
    }
}
