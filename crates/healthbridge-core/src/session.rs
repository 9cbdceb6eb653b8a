//! Per-screen holder for one conversational session.
//!
//! `Uninitialized -> Ready -> Disposed`. Opening is a guarded transition: repeated
//! `ensure` calls while `Ready` hand back the same session, and nothing can be
//! opened once the slot is disposed.

use crate::ai::{ChatCapability, ChatSession};
use crate::error::{AiError, AiResult};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

#[derive(Default)]
pub enum SessionSlot {
    #[default]
    Uninitialized,
    Ready(Arc<dyn ChatSession>),
    Disposed,
}

impl SessionSlot {
    pub fn new() -> Self {
        Self::Uninitialized
    }

    /// Open on first call, reuse afterwards. Fails with `SessionDisposed` after [`dispose`](Self::dispose).
    pub fn ensure(&mut self, chat: &dyn ChatCapability, preamble: &str) -> AiResult<Arc<dyn ChatSession>> {
        match self {
            SessionSlot::Ready(session) => Ok(Arc::clone(session)),
            SessionSlot::Disposed => Err(AiError::SessionDisposed),
            SessionSlot::Uninitialized => {
                let session = chat.open_session(preamble)?;
                debug!("chat session opened");
                *self = SessionSlot::Ready(Arc::clone(&session));
                Ok(session)
            }
        }
    }

    pub fn session(&self) -> Option<Arc<dyn ChatSession>> {
        match self {
            SessionSlot::Ready(s) => Some(Arc::clone(s)),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, SessionSlot::Ready(_))
    }

    pub fn is_disposed(&self) -> bool {
        matches!(self, SessionSlot::Disposed)
    }

    /// Drops the session handle. Terminal.
    pub fn dispose(&mut self) {
        *self = SessionSlot::Disposed;
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionSlot::Uninitialized => "uninitialized",
            SessionSlot::Ready(_) => "ready",
            SessionSlot::Disposed => "disposed",
        }
    }
}

impl fmt::Debug for SessionSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::ChatReply;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Echo;

    #[async_trait]
    impl ChatSession for Echo {
        async fn send(&self, text: &str) -> AiResult<ChatReply> {
            Ok(ChatReply {
                text: text.to_string(),
                sources: Vec::new(),
            })
        }
    }

    #[derive(Default)]
    struct CountingChat {
        opened: AtomicUsize,
    }

    impl ChatCapability for CountingChat {
        fn open_session(&self, _preamble: &str) -> AiResult<Arc<dyn ChatSession>> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Echo))
        }
    }

    #[test]
    fn ensure_is_idempotent_while_ready() {
        let chat = CountingChat::default();
        let mut slot = SessionSlot::new();
        let a = slot.ensure(&chat, "p").unwrap();
        let b = slot.ensure(&chat, "p").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(chat.opened.load(Ordering::SeqCst), 1);
        assert!(slot.is_ready());
    }

    #[test]
    fn disposed_slot_never_reopens() {
        let chat = CountingChat::default();
        let mut slot = SessionSlot::new();
        slot.ensure(&chat, "p").unwrap();
        slot.dispose();
        assert!(matches!(slot.ensure(&chat, "p"), Err(AiError::SessionDisposed)));
        assert!(slot.session().is_none());
        assert_eq!(chat.opened.load(Ordering::SeqCst), 1);
    }
}
