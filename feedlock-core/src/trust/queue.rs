//! The trust-confirmation queue.
//!
//! Multiple feeds can hit not-yet-trusted keys at the same time; each files
//! a [`TrustRequest`] and waits. The queue serializes the decisions: the
//! head request is the only one ever shown to the user, and when a
//! resolution lands, queued requests whose keys have become trusted in the
//! meantime are resolved automatically instead of re-asking. The cascade is
//! an explicit loop bounded by queue length, not a callback chain.
//!
//! [`TrustQueue`] is the synchronous state machine; [`TrustBroker`] owns
//! one process-wide instance and suspends each asking task until its
//! request is decided. The queue starts empty and is expected to be drained
//! again before the host process assumes no decisions are pending.

use crate::trust::error::TrustError;
use crate::trust::key::Fingerprint;
use crate::trust::presenter::{Presenter, Verdict};
use crate::trust::signature::TrustRequest;
use crate::trust::store::{TrustStore, TrustSync};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Opaque ticket for a queued request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestHandle(u64);

impl RequestHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// How one queued request ended
#[derive(Debug, Clone)]
pub struct Resolution {
    pub handle: RequestHandle,

    /// Fingerprints newly trusted as part of this resolution
    pub newly_trusted: Vec<Fingerprint>,

    /// True when the cascade resolved it without presenting
    pub auto: bool,
}

/// Everything one `resolve` call settled
#[derive(Debug, Default)]
pub struct ResolveReport {
    /// The resolved head plus any cascade auto-resolutions, in order
    pub resolved: Vec<Resolution>,

    /// New head that still needs the user, if any
    pub next_active: Option<RequestHandle>,
}

/// FIFO of pending trust decisions; the head is the active request
pub struct TrustQueue {
    next_handle: u64,
    pending: VecDeque<(RequestHandle, Arc<TrustRequest>)>,
}

impl TrustQueue {
    pub fn new() -> Self {
        Self {
            next_handle: 0,
            pending: VecDeque::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Append a request. Returns its handle and whether it became active
    /// (the queue was empty, so the caller must now present it).
    pub fn enqueue(&mut self, request: TrustRequest) -> (RequestHandle, bool) {
        let handle = RequestHandle(self.next_handle);
        self.next_handle += 1;

        let became_active = self.pending.is_empty();
        info!(
            uri = %request.interface_uri,
            handle = handle.0,
            active = became_active,
            "queued trust confirmation request"
        );
        self.pending.push_back((handle, Arc::new(request)));
        (handle, became_active)
    }

    /// The request currently owed to the user, if any
    pub fn active(&self) -> Option<(RequestHandle, Arc<TrustRequest>)> {
        self.pending
            .front()
            .map(|(handle, request)| (*handle, Arc::clone(request)))
    }

    /// Resolve the active request with the user's chosen fingerprints.
    ///
    /// Applies trust for each chosen key, runs the synchronization step,
    /// removes the request, then cascades: queued requests whose valid
    /// signatures are all trusted by now resolve themselves with an empty
    /// chosen set. Resolving anything but the active request is a
    /// programming error and fails fatally.
    pub fn resolve(
        &mut self,
        handle: RequestHandle,
        chosen: &[Fingerprint],
        store: &dyn TrustStore,
        sync: &TrustSync,
    ) -> Result<ResolveReport, TrustError> {
        match self.pending.front() {
            Some((head, _)) if *head == handle => {}
            _ => {
                let err = TrustError::ResolveNotActive { handle: handle.0 };
                err.log_if_fatal();
                return Err(err);
            }
        }

        let mut report = ResolveReport::default();
        self.settle_head(chosen, false, store, sync, &mut report)?;

        // Cascade: anything now fully satisfied resolves without a prompt.
        while let Some((_, request)) = self.pending.front() {
            let all_trusted = request
                .valid_signatures()
                .iter()
                .all(|signature| store.is_trusted(&signature.fingerprint));

            if all_trusted {
                debug!(uri = %request.interface_uri, "auto-resolving satisfied trust request");
                self.settle_head(&[], true, store, sync, &mut report)?;
            } else {
                report.next_active = self.pending.front().map(|(handle, _)| *handle);
                break;
            }
        }

        Ok(report)
    }

    /// Resolve the active request trusting nothing
    pub fn cancel(
        &mut self,
        handle: RequestHandle,
        store: &dyn TrustStore,
        sync: &TrustSync,
    ) -> Result<ResolveReport, TrustError> {
        self.resolve(handle, &[], store, sync)
    }

    /// Trust the chosen keys, run the sync step, and pop the head.
    fn settle_head(
        &mut self,
        chosen: &[Fingerprint],
        auto: bool,
        store: &dyn TrustStore,
        sync: &TrustSync,
        report: &mut ResolveReport,
    ) -> Result<(), TrustError> {
        let (handle, request) = match self.pending.front() {
            Some((handle, request)) => (*handle, Arc::clone(request)),
            None => return Ok(()),
        };

        for fingerprint in chosen {
            store.trust_key(fingerprint)?;
        }

        // The sync step runs even for empty resolutions; cancellation is
        // not a no-op short-circuit.
        match sync {
            TrustSync::Notify(sink) => sink.trust_changed(),
            TrustSync::Recheck(cache) => {
                let trusted_now = cache.recheck(&request)?;
                let should_verify = request
                    .valid_signatures()
                    .iter()
                    .any(|signature| store.is_trusted(&signature.fingerprint));
                if should_verify && !trusted_now {
                    let err = TrustError::TrustUpdateIneffective {
                        uri: request.interface_uri.clone(),
                    };
                    err.log_if_fatal();
                    return Err(err);
                }
            }
        }

        self.pending.pop_front();
        info!(
            uri = %request.interface_uri,
            handle = handle.0,
            trusted = chosen.len(),
            auto,
            "trust request resolved"
        );
        report.resolved.push(Resolution {
            handle,
            newly_trusted: chosen.to_vec(),
            auto,
        });
        Ok(())
    }
}

impl Default for TrustQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// What a waiting feed learns when its request is decided
#[derive(Debug, Clone)]
pub struct Outcome {
    /// Keys the user newly trusted while deciding this request
    pub newly_trusted: Vec<Fingerprint>,

    /// True when the user dismissed the request without a decision
    pub cancelled: bool,
}

struct BrokerState {
    queue: TrustQueue,
    waiters: HashMap<u64, oneshot::Sender<Outcome>>,
}

/// Process-wide owner of the trust queue.
///
/// `confirm` suspends the calling task until its request is decided, while
/// exactly one task at a time drives presentation of the queue head.
#[derive(Clone)]
pub struct TrustBroker {
    shared: Arc<BrokerShared>,
}

struct BrokerShared {
    presenter: Arc<dyn Presenter>,
    store: Arc<dyn TrustStore>,
    sync: TrustSync,
    state: Mutex<BrokerState>,
}

impl TrustBroker {
    pub fn new(presenter: Arc<dyn Presenter>, store: Arc<dyn TrustStore>, sync: TrustSync) -> Self {
        Self {
            shared: Arc::new(BrokerShared {
                presenter,
                store,
                sync,
                state: Mutex::new(BrokerState {
                    queue: TrustQueue::new(),
                    waiters: HashMap::new(),
                }),
            }),
        }
    }

    /// The trust store this broker applies decisions to
    pub fn store(&self) -> &Arc<dyn TrustStore> {
        &self.shared.store
    }

    /// True when no decisions are pending. The host process should not
    /// shut down while this is false.
    pub fn is_drained(&self) -> bool {
        self.lock_state().queue.is_empty()
    }

    /// Ask the user to confirm trust for the keys behind `request`.
    ///
    /// Returns once the request is resolved - by the user, or by the
    /// cascade when an earlier decision already covered its keys.
    pub async fn confirm(&self, request: TrustRequest) -> Result<Outcome, TrustError> {
        let uri = request.interface_uri.clone();
        let (sender, receiver) = oneshot::channel();

        let (handle, became_active) = {
            let mut state = self.lock_state();
            let (handle, became_active) = state.queue.enqueue(request);
            state.waiters.insert(handle.id(), sender);
            (handle, became_active)
        };

        if became_active {
            if let Err(err) = self.drive(handle, Some(handle)).await {
                self.fail_waiters();
                return Err(err);
            }
        }

        match receiver.await {
            Ok(outcome) => Ok(outcome),
            Err(_) => Err(TrustError::Interrupted { uri }),
        }
    }

    /// Present and resolve queue heads starting at `active`.
    ///
    /// When `own` is resolved and more requests remain, the rest of the
    /// queue is handed to a background task so the caller can proceed.
    async fn drive(
        &self,
        active: RequestHandle,
        own: Option<RequestHandle>,
    ) -> Result<(), TrustError> {
        let mut active = active;
        loop {
            let request = {
                let state = self.lock_state();
                match state.queue.active() {
                    Some((handle, request)) if handle == active => request,
                    _ => return Ok(()),
                }
            };

            // Presentation happens outside the lock; the queue can grow
            // behind this await.
            let verdict = self
                .shared
                .presenter
                .present(&request)
                .await
                .map_err(|source| TrustError::Presenter {
                    uri: request.interface_uri.clone(),
                    source,
                })?;

            let (chosen, cancelled) = match verdict {
                Verdict::Trust(fingerprints) => {
                    let mut chosen = fingerprints;
                    chosen.retain(|fingerprint| {
                        let involved = request.involves(fingerprint);
                        if !involved {
                            warn!(
                                key = %fingerprint,
                                uri = %request.interface_uri,
                                "ignoring chosen key that is not part of the request"
                            );
                        }
                        involved
                    });
                    (chosen, false)
                }
                Verdict::Cancelled => (Vec::new(), true),
            };

            let report = {
                let mut state = self.lock_state();
                state
                    .queue
                    .resolve(active, &chosen, self.shared.store.as_ref(), &self.shared.sync)?
            };
            self.dispatch(&report, cancelled);

            match report.next_active {
                None => return Ok(()),
                Some(next) => {
                    let own_resolved = own
                        .is_some_and(|own| report.resolved.iter().any(|r| r.handle == own));
                    if own_resolved {
                        self.hand_off(next);
                        return Ok(());
                    }
                    active = next;
                }
            }
        }
    }

    /// Continue driving the queue from a background task
    fn hand_off(&self, next: RequestHandle) {
        let broker = self.clone();
        tokio::spawn(async move {
            if let Err(err) = Box::pin(broker.drive(next, None)).await {
                err.log_if_fatal();
                broker.fail_waiters();
            }
        });
    }

    /// Deliver outcomes to the tasks waiting on resolved requests
    fn dispatch(&self, report: &ResolveReport, head_cancelled: bool) {
        let mut state = self.lock_state();
        for (index, resolution) in report.resolved.iter().enumerate() {
            if let Some(sender) = state.waiters.remove(&resolution.handle.id()) {
                let outcome = Outcome {
                    newly_trusted: resolution.newly_trusted.clone(),
                    cancelled: index == 0 && head_cancelled,
                };
                // A dropped receiver just means the asker gave up waiting.
                let _ = sender.send(outcome);
            }
        }
    }

    /// Drop every waiter so parked `confirm` calls fail with `Interrupted`
    fn fail_waiters(&self) {
        let mut state = self.lock_state();
        state.waiters.clear();
    }

    fn lock_state(&self) -> MutexGuard<'_, BrokerState> {
        match self.shared.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
