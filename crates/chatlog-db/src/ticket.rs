use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rusqlite::{Connection, InterruptHandle};

enum TicketState {
    Queued,
    Running(InterruptHandle),
    Finished,
    Cancelled,
}

/// What [`WriteTicket::cancel`] did to the write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cancellation {
    /// The write had not reached the connection and will never run.
    NotStarted,
    /// The write was executing; its statement was interrupted. The write
    /// may still have committed if it was already past its last statement,
    /// so the writer's own result is authoritative.
    Interrupted,
    /// The write had already completed.
    AlreadyFinished,
}

/// Links one queued append to the caller waiting on it, so the caller can
/// give up without the write landing afterwards.
///
/// The writer moves the ticket to running once it holds the connection and
/// back to finished before releasing it. Both transitions and
/// [`WriteTicket::cancel`] happen under the ticket's lock, so an interrupt
/// can only reach the connection while this ticket's write owns it.
#[derive(Clone)]
pub struct WriteTicket {
    state: Arc<Mutex<TicketState>>,
}

impl Default for WriteTicket {
    fn default() -> Self {
        Self::new()
    }
}

impl WriteTicket {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(TicketState::Queued)),
        }
    }

    pub fn cancel(&self) -> Cancellation {
        let mut state = self.lock();
        match &*state {
            TicketState::Queued => {
                *state = TicketState::Cancelled;
                Cancellation::NotStarted
            }
            TicketState::Running(handle) => {
                handle.interrupt();
                Cancellation::Interrupted
            }
            TicketState::Finished => Cancellation::AlreadyFinished,
            TicketState::Cancelled => Cancellation::NotStarted,
        }
    }

    /// Whether the writer has reached the connection.
    pub fn has_started(&self) -> bool {
        matches!(*self.lock(), TicketState::Running(_) | TicketState::Finished)
    }

    /// Claims the ticket for a write on `conn`. `false` if it was cancelled.
    pub(crate) fn begin(&self, conn: &Connection) -> bool {
        let mut state = self.lock();
        match *state {
            TicketState::Queued => {
                *state = TicketState::Running(conn.get_interrupt_handle());
                true
            }
            _ => false,
        }
    }

    pub(crate) fn finish(&self) {
        *self.lock() = TicketState::Finished;
    }

    fn lock(&self) -> MutexGuard<'_, TicketState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
