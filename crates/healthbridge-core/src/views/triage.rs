//! Symptom-triage chat screen.
//!
//! Phases: `Empty -> AwaitingFirstMessage -> (SendPending -> Idle)* -> Disposed`.
//!
//! A send is three steps so the await happens without borrowing the screen:
//! [`TriageScreen::begin_send`] records the user turn and hands out a [`PendingSend`];
//! [`PendingSend::resolve`] talks to the session; [`TriageScreen::complete`] folds the
//! result back in if the screen is still the one that asked. Only one send may be
//! pending at a time, and every failure becomes [`TRIAGE_FALLBACK_MESSAGE`].
//!
//! A send dropped before it completes (a caller timeout, a `select!` branch that
//! lost, a [`PendingSend`] never resolved) counts as failed: the fallback reply is
//! appended and the screen accepts the next message.

use crate::ai::{ChatCapability, ChatReply, ChatSession, RetryPolicy};
use crate::error::{AiError, AiResult, ChatError};
use crate::lifecycle::{Ticket, ViewLifetime};
use crate::model::{ChatMessage, GroundingSource, UserProfile};
use crate::prompts::{triage_preamble, TRIAGE_FALLBACK_MESSAGE};
use crate::session::SessionSlot;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatPhase {
    Empty,
    AwaitingFirstMessage,
    SendPending,
    Idle,
    Disposed,
}

pub struct TriageScreen {
    chat: Arc<dyn ChatCapability>,
    policy: RetryPolicy,
    slot: SessionSlot,
    preamble: String,
    transcript: Vec<ChatMessage>,
    sources: Vec<GroundingSource>,
    phase: ChatPhase,
    lifetime: ViewLifetime,
    in_flight: Option<Arc<AtomicBool>>,
}

/// Raises the shared flag when dropped before [`TriageScreen::complete`] disarms it.
struct AbandonFlag {
    flag: Arc<AtomicBool>,
    armed: bool,
}

impl AbandonFlag {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for AbandonFlag {
    fn drop(&mut self) {
        if self.armed {
            self.flag.store(true, Ordering::Release);
        }
    }
}

/// A send in flight. Owns everything it needs; the screen is free while it runs.
pub struct PendingSend {
    session: AiResult<Arc<dyn ChatSession>>,
    text: String,
    policy: RetryPolicy,
    ticket: Ticket,
    abandon: AbandonFlag,
}

/// Result of a [`PendingSend`], to be handed back to [`TriageScreen::complete`].
pub struct SendCompletion {
    ticket: Ticket,
    outcome: AiResult<ChatReply>,
    abandon: AbandonFlag,
}

impl PendingSend {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub async fn resolve(self) -> SendCompletion {
        let PendingSend {
            session,
            text,
            policy,
            ticket,
            abandon,
        } = self;
        let outcome = match session {
            Ok(session) => {
                policy
                    .run("triage_send", || {
                        let session = Arc::clone(&session);
                        let text = text.clone();
                        async move { session.send(&text).await }
                    })
                    .await
            }
            Err(e) => Err(e),
        };
        SendCompletion { ticket, outcome, abandon }
    }
}

impl TriageScreen {
    pub fn new(chat: Arc<dyn ChatCapability>, policy: RetryPolicy) -> Self {
        Self {
            chat,
            policy,
            slot: SessionSlot::new(),
            preamble: String::new(),
            transcript: Vec::new(),
            sources: Vec::new(),
            phase: ChatPhase::Empty,
            lifetime: ViewLifetime::new(),
            in_flight: None,
        }
    }

    /// Open the session for `profile`. Repeat calls (re-renders) change nothing.
    /// A session that fails to open is retried on the next send.
    pub fn mount(&mut self, profile: &UserProfile) -> Result<(), ChatError> {
        match self.phase {
            ChatPhase::Disposed => return Err(ChatError::Disposed),
            ChatPhase::Empty => {}
            _ => return Ok(()),
        }
        self.preamble = triage_preamble(profile);
        if let Err(e) = self.slot.ensure(self.chat.as_ref(), &self.preamble) {
            warn!(error = %e, "could not open triage session; will retry on first send");
        }
        self.phase = ChatPhase::AwaitingFirstMessage;
        info!(province = %profile.province, "triage screen mounted");
        Ok(())
    }

    pub fn begin_send(&mut self, text: &str) -> Result<PendingSend, ChatError> {
        self.recover_abandoned_send();
        match self.phase {
            ChatPhase::Empty => return Err(ChatError::NotMounted),
            ChatPhase::Disposed => return Err(ChatError::Disposed),
            ChatPhase::SendPending => return Err(ChatError::SendInFlight),
            ChatPhase::AwaitingFirstMessage | ChatPhase::Idle => {}
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        self.transcript.push(ChatMessage::user(text));
        self.phase = ChatPhase::SendPending;
        let flag = Arc::new(AtomicBool::new(false));
        self.in_flight = Some(Arc::clone(&flag));
        Ok(PendingSend {
            session: self.slot.ensure(self.chat.as_ref(), &self.preamble),
            text: text.to_string(),
            policy: self.policy,
            ticket: self.lifetime.issue(),
            abandon: AbandonFlag { flag, armed: true },
        })
    }

    /// Settle a pending send whose [`PendingSend`] or [`SendCompletion`] was dropped
    /// unfinished. Returns true if one was found.
    pub fn recover_abandoned_send(&mut self) -> bool {
        let abandoned = self
            .in_flight
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Acquire));
        if abandoned {
            self.abandon_pending();
        }
        abandoned
    }

    fn abandon_pending(&mut self) {
        self.in_flight = None;
        if self.phase == ChatPhase::SendPending {
            warn!("triage send abandoned before completing; showing fallback");
            self.transcript.push(ChatMessage::assistant(TRIAGE_FALLBACK_MESSAGE));
            self.sources.clear();
            self.phase = ChatPhase::Idle;
        }
    }

    /// Fold a finished send. Returns false when the completion is stale (the screen
    /// was unmounted meanwhile) and was dropped.
    pub fn complete(&mut self, completion: SendCompletion) -> bool {
        let SendCompletion { ticket, outcome, abandon } = completion;
        abandon.disarm();
        if !self.lifetime.accepts(&ticket) {
            debug!(seq = ticket.seq(), "dropping stale triage reply");
            return false;
        }
        self.in_flight = None;
        let reply = outcome.and_then(|r| {
            if r.text.trim().is_empty() {
                Err(AiError::EmptyResponse)
            } else {
                Ok(r)
            }
        });
        match reply {
            Ok(r) => {
                self.transcript.push(ChatMessage::assistant(r.text));
                self.sources = r.sources;
            }
            Err(e) => {
                warn!(error = %e, "triage send failed; showing fallback");
                self.transcript.push(ChatMessage::assistant(TRIAGE_FALLBACK_MESSAGE));
                self.sources.clear();
            }
        }
        self.phase = ChatPhase::Idle;
        true
    }

    /// Begin, resolve, and complete in one call. Returns the assistant's reply.
    /// Dropping the future part-way leaves the screen idle with the fallback reply.
    pub async fn send(&mut self, text: &str) -> Result<ChatMessage, ChatError> {
        let pending = self.begin_send(text)?;
        let mut guard = SendGuard {
            screen: self,
            finished: false,
        };
        let completion = pending.resolve().await;
        guard.screen.complete(completion);
        guard.finished = true;
        guard.screen.transcript.last().cloned().ok_or(ChatError::Disposed)
    }

    /// Tear down: dispose the session, drop the transcript, reject late replies.
    pub fn unmount(&mut self) {
        self.lifetime.dispose();
        self.slot.dispose();
        self.transcript.clear();
        self.sources.clear();
        self.in_flight = None;
        self.phase = ChatPhase::Disposed;
        debug!("triage screen unmounted");
    }

    pub fn phase(&self) -> ChatPhase {
        self.phase
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    /// Citations attached to the latest reply.
    pub fn sources(&self) -> &[GroundingSource] {
        &self.sources
    }

    pub fn is_sending(&self) -> bool {
        self.phase == ChatPhase::SendPending
    }

    pub fn session_state(&self) -> &'static str {
        self.slot.label()
    }
}

struct SendGuard<'a> {
    screen: &'a mut TriageScreen,
    finished: bool,
}

impl Drop for SendGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.screen.abandon_pending();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChatRole, Province};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Scripted {
        fail: bool,
    }

    #[async_trait]
    impl ChatSession for Scripted {
        async fn send(&self, text: &str) -> AiResult<ChatReply> {
            if self.fail {
                Err(AiError::Status { status: 400, body: "raw upstream error".into() })
            } else {
                Ok(ChatReply {
                    text: format!("re: {}", text),
                    sources: vec![GroundingSource { title: "t".into(), uri: "https://x".into() }],
                })
            }
        }
    }

    struct Capability {
        fail: bool,
        opened: AtomicUsize,
    }

    impl ChatCapability for Capability {
        fn open_session(&self, _preamble: &str) -> AiResult<Arc<dyn ChatSession>> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Scripted { fail: self.fail }))
        }
    }

    fn screen(fail: bool) -> (TriageScreen, Arc<Capability>) {
        let cap = Arc::new(Capability { fail, opened: AtomicUsize::new(0) });
        let s = TriageScreen::new(cap.clone(), RetryPolicy::no_retry(Duration::from_secs(5)));
        (s, cap)
    }

    fn profile() -> UserProfile {
        UserProfile {
            name: "Zanele".into(),
            province: Province::EasternCape,
            onboarded: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn happy_path_appends_user_then_assistant() {
        let (mut s, cap) = screen(false);
        s.mount(&profile()).unwrap();
        s.mount(&profile()).unwrap();
        assert_eq!(cap.opened.load(Ordering::SeqCst), 1);
        assert_eq!(s.phase(), ChatPhase::AwaitingFirstMessage);

        let reply = s.send("headache").await.unwrap();
        assert_eq!(reply.text, "re: headache");
        assert_eq!(s.transcript().len(), 2);
        assert_eq!(s.transcript()[0].role, ChatRole::User);
        assert_eq!(s.sources().len(), 1);
        assert_eq!(s.phase(), ChatPhase::Idle);
    }

    #[tokio::test]
    async fn failure_becomes_fallback_text() {
        let (mut s, _) = screen(true);
        s.mount(&profile()).unwrap();
        let reply = s.send("dizzy").await.unwrap();
        assert_eq!(reply.text, TRIAGE_FALLBACK_MESSAGE);
        assert!(!s.transcript().iter().any(|m| m.text.contains("raw upstream")));
    }

    #[tokio::test]
    async fn second_send_while_pending_is_refused() {
        let (mut s, _) = screen(false);
        s.mount(&profile()).unwrap();
        let pending = s.begin_send("one").unwrap();
        assert!(s.is_sending());
        assert!(matches!(s.begin_send("two"), Err(ChatError::SendInFlight)));
        let done = pending.resolve().await;
        assert!(s.complete(done));
        assert_eq!(s.transcript().len(), 2);
    }

    #[tokio::test]
    async fn reply_after_unmount_is_dropped() {
        let (mut s, _) = screen(false);
        s.mount(&profile()).unwrap();
        let pending = s.begin_send("late").unwrap();
        s.unmount();
        let done = pending.resolve().await;
        assert!(!s.complete(done));
        assert!(s.transcript().is_empty());
        assert_eq!(s.phase(), ChatPhase::Disposed);
        assert!(matches!(s.mount(&profile()), Err(ChatError::Disposed)));
    }

    struct Slow;

    #[async_trait]
    impl ChatSession for Slow {
        async fn send(&self, text: &str) -> AiResult<ChatReply> {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(ChatReply { text: format!("re: {}", text), sources: Vec::new() })
        }
    }

    struct SlowCapability;

    impl ChatCapability for SlowCapability {
        fn open_session(&self, _preamble: &str) -> AiResult<Arc<dyn ChatSession>> {
            Ok(Arc::new(Slow))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_send_leaves_screen_ready() {
        let mut s = TriageScreen::new(Arc::new(SlowCapability), RetryPolicy::no_retry(Duration::from_secs(5)));
        s.mount(&profile()).unwrap();

        let cut_short = tokio::time::timeout(Duration::from_millis(10), s.send("hi")).await;
        assert!(cut_short.is_err());
        assert_eq!(s.phase(), ChatPhase::Idle);
        assert_eq!(s.transcript().len(), 2);
        assert_eq!(s.transcript()[1].text, TRIAGE_FALLBACK_MESSAGE);

        let reply = s.send("hello again").await.unwrap();
        assert_eq!(reply.text, "re: hello again");
        assert_eq!(s.transcript().len(), 4);
        assert_eq!(s.phase(), ChatPhase::Idle);
    }

    #[tokio::test]
    async fn dropped_pending_send_is_settled_on_next_send() {
        let (mut s, _) = screen(false);
        s.mount(&profile()).unwrap();
        drop(s.begin_send("lost").unwrap());
        assert!(s.recover_abandoned_send());
        assert_eq!(s.phase(), ChatPhase::Idle);
        assert_eq!(s.transcript()[1].text, TRIAGE_FALLBACK_MESSAGE);

        let resolved = s.begin_send("resolved but not folded").unwrap().resolve().await;
        drop(resolved);
        let reply = s.send("third").await.unwrap();
        assert_eq!(reply.text, "re: third");
        let texts: Vec<&str> = s.transcript().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "lost",
                TRIAGE_FALLBACK_MESSAGE,
                "resolved but not folded",
                TRIAGE_FALLBACK_MESSAGE,
                "third",
                "re: third"
            ]
        );
    }

    #[test]
    fn guards_before_mount_and_on_blank_text() {
        let (mut s, _) = screen(false);
        assert!(matches!(s.begin_send("hi"), Err(ChatError::NotMounted)));
        s.mount(&profile()).unwrap();
        assert!(matches!(s.begin_send("   "), Err(ChatError::EmptyMessage)));
        assert!(s.transcript().is_empty());
    }
}
