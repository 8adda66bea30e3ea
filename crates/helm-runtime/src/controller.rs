//! Run controller — drives the context → model → tool dispatch → persist
//! cycle for every run.
//!
//! Concurrency discipline: a per-session async lock strictly serializes runs
//! that address the same transcript; a global semaphore bounds total
//! concurrent runs. The live-run index holds a run from creation until its
//! terminal transition, at which point it is evicted and the terminal record
//! is returned to the caller.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use tokio::sync::{Mutex, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use helm_core::events::{BaseEvent, RunEvent};
use helm_core::ids::RunId;
use helm_core::messages::Message;
use helm_llm::gateway::{CompletionOptions, ModelGateway};
use helm_sessions::{Session, SessionStore};
use helm_settings::BusyPolicy;
use helm_tools::{ToolBroker, ToolContext};

use crate::context::build_context;
use crate::emitter::EventEmitter;
use crate::errors::RunError;
use crate::types::{ControllerConfig, Run, RunStatus};

/// A live run: its mutable record plus the cancellation token.
struct ActiveRun {
    run: parking_lot::RwLock<Run>,
    cancel: CancellationToken,
}

impl ActiveRun {
    fn new(run: Run) -> Self {
        Self {
            run: parking_lot::RwLock::new(run),
            cancel: CancellationToken::new(),
        }
    }

    fn snapshot(&self) -> Run {
        self.run.read().clone()
    }
}

/// The agent loop state machine.
pub struct RunController {
    store: Arc<SessionStore>,
    gateway: Arc<dyn ModelGateway>,
    broker: Arc<ToolBroker>,
    emitter: Arc<EventEmitter>,
    config: ControllerConfig,
    active: DashMap<String, Arc<ActiveRun>>,
    session_locks: DashMap<String, Arc<Mutex<()>>>,
    run_permits: Arc<Semaphore>,
}

impl RunController {
    /// Create a controller over the given collaborators.
    #[must_use]
    pub fn new(
        store: Arc<SessionStore>,
        gateway: Arc<dyn ModelGateway>,
        broker: Arc<ToolBroker>,
        config: ControllerConfig,
    ) -> Self {
        let run_permits = Arc::new(Semaphore::new(config.max_concurrent_runs));
        Self {
            store,
            gateway,
            broker,
            emitter: Arc::new(EventEmitter::new()),
            config,
            active: DashMap::new(),
            session_locks: DashMap::new(),
            run_permits,
        }
    }

    /// The emitter runs publish their events through.
    #[must_use]
    pub fn emitter(&self) -> &Arc<EventEmitter> {
        &self.emitter
    }

    /// Subscribe to the full run-event stream.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<RunEvent> {
        self.emitter.subscribe()
    }

    /// Session store backing this controller.
    #[must_use]
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Begin a run and drive it to a terminal state.
    ///
    /// Returns the terminal [`Run`] record; intermediate progress is
    /// observable only via emitted events. `Err` is reserved for
    /// precondition failures — empty message, duplicate run id, busy session
    /// under the reject policy, or storage failure before the loop starts.
    #[instrument(skip_all, fields(session_id = session_id, run_id))]
    pub async fn start(
        &self,
        session_id: &str,
        message: &str,
        run_id: Option<String>,
    ) -> Result<Run, RunError> {
        if message.trim().is_empty() {
            return Err(RunError::InvalidArgument("message must not be empty".into()));
        }

        let run_id = run_id.unwrap_or_else(|| RunId::new().into_inner());
        let _ = tracing::Span::current().record("run_id", run_id.as_str());

        let entry = Arc::new(ActiveRun::new(Run::new(&run_id, session_id)));
        {
            use dashmap::mapref::entry::Entry;
            match self.active.entry(run_id.clone()) {
                Entry::Occupied(_) => {
                    return Err(RunError::InvalidArgument(format!(
                        "run '{run_id}' is already active"
                    )));
                }
                Entry::Vacant(slot) => {
                    let _ = slot.insert(entry.clone());
                }
            }
        }

        let result = self.execute(session_id, message, &run_id, &entry).await;
        // Terminal (or refused) — evict from the live index either way.
        let _ = self.active.remove(&run_id);
        result
    }

    /// Request cancellation of an in-flight run.
    ///
    /// Returns `true` iff the run was active and this call initiated its
    /// transition to `cancelled`; `false` for unknown, already-terminal
    /// (evicted), or already-cancelling runs. Cooperative: takes effect at
    /// the next suspension point, never by killing an in-flight tool.
    pub fn cancel(&self, run_id: &str) -> bool {
        match self.active.get(run_id) {
            Some(entry) if !entry.cancel.is_cancelled() => {
                debug!(run_id, "cancellation requested");
                entry.cancel.cancel();
                true
            }
            _ => false,
        }
    }

    /// Snapshot of a currently tracked run (`None` once terminal and evicted).
    #[must_use]
    pub fn get_run(&self, run_id: &str) -> Option<Run> {
        self.active.get(run_id).map(|e| e.snapshot())
    }

    /// IDs of currently tracked runs.
    #[must_use]
    pub fn active_run_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.active.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Number of currently tracked runs.
    #[must_use]
    pub fn active_run_count(&self) -> usize {
        self.active.len()
    }

    // ── Internals ───────────────────────────────────────────────────────────

    async fn execute(
        &self,
        session_id: &str,
        message: &str,
        run_id: &str,
        entry: &Arc<ActiveRun>,
    ) -> Result<Run, RunError> {
        // Per-session serialization: at most one run mutates a transcript.
        let lock = self
            .session_locks
            .entry(session_id.to_owned())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let _guard = match self.config.busy_policy {
            BusyPolicy::Reject => lock
                .try_lock_owned()
                .map_err(|_| RunError::SessionBusy(session_id.to_owned()))?,
            BusyPolicy::Queue => tokio::select! {
                guard = lock.lock_owned() => guard,
                () = entry.cancel.cancelled() => {
                    return Ok(self.finish_cancelled(entry, run_id, session_id));
                }
            },
        };

        // Global concurrency bound.
        let _permit = tokio::select! {
            permit = self.run_permits.clone().acquire_owned() => {
                match permit {
                    Ok(p) => p,
                    Err(_) => {
                        return Err(RunError::InvalidArgument(
                            "controller is shutting down".into(),
                        ));
                    }
                }
            }
            () = entry.cancel.cancelled() => {
                return Ok(self.finish_cancelled(entry, run_id, session_id));
            }
        };

        let mut session = self.store.get_or_create(session_id)?;
        session.append(Message::user(message));
        self.store.save(&mut session)?;

        entry.run.write().status = RunStatus::Running;
        let _ = self.emitter.emit(RunEvent::RunStarted {
            base: BaseEvent::now(run_id, session_id),
        });
        info!(session_id, run_id, "run started");

        Ok(self.run_loop(entry, run_id, session_id, session).await)
    }

    #[allow(clippy::too_many_lines)]
    async fn run_loop(
        &self,
        entry: &Arc<ActiveRun>,
        run_id: &str,
        session_id: &str,
        mut session: Session,
    ) -> Run {
        let options = CompletionOptions {
            effort: self.config.effort.clone(),
            ..CompletionOptions::default()
        };

        for turn in 1..=self.config.max_turns {
            // Suspension point: before the model call.
            if entry.cancel.is_cancelled() {
                return self.finish_cancelled(entry, run_id, session_id);
            }

            let turn_start = Instant::now();
            let _ = self.emitter.emit(RunEvent::TurnStarted {
                base: BaseEvent::now(run_id, session_id),
                turn,
            });

            let context =
                build_context(&session, self.broker.catalog(), self.config.context_window);

            let response = match tokio::time::timeout(
                self.config.model_timeout,
                self.gateway.complete(&context, &options),
            )
            .await
            {
                Ok(Ok(resp)) => resp,
                Ok(Err(e)) => {
                    warn!(run_id, turn, error = %e, "model backend failed");
                    return self.finish_error(
                        entry,
                        run_id,
                        session_id,
                        format!("model backend error: {e}"),
                    );
                }
                Err(_elapsed) => {
                    warn!(run_id, turn, "model call timed out");
                    return self.finish_error(
                        entry,
                        run_id,
                        session_id,
                        format!(
                            "model call timed out after {}s",
                            self.config.model_timeout.as_secs()
                        ),
                    );
                }
            };

            {
                let mut run = entry.run.write();
                run.turns = turn;
                run.usage = run.usage.add(response.usage);
            }

            // Cancellation observed while suspended on the model call:
            // discard this turn's partially-built output.
            if entry.cancel.is_cancelled() {
                return self.finish_cancelled(entry, run_id, session_id);
            }

            let text = response.text.clone().unwrap_or_default();
            if !text.is_empty() {
                let _ = self.emitter.emit(RunEvent::Content {
                    base: BaseEvent::now(run_id, session_id),
                    text: text.clone(),
                });
            }

            if response.tool_calls.is_empty() {
                // Final answer: persist and complete.
                session.append(Message::assistant(text, vec![]));
                if let Err(e) = self.store.save(&mut session) {
                    return self.finish_error(
                        entry,
                        run_id,
                        session_id,
                        format!("failed to persist transcript: {e}"),
                    );
                }
                let _ = self.emitter.emit(RunEvent::TurnCompleted {
                    base: BaseEvent::now(run_id, session_id),
                    turn,
                    duration_ms: duration_ms(turn_start),
                    token_usage: Some(response.usage),
                });
                return self.finish_completed(entry, run_id, session_id, turn);
            }

            // Dispatch each tool call; a failure is reported to the model on
            // the next turn, never aborts the run.
            let mut results = Vec::with_capacity(response.tool_calls.len());
            for call in &response.tool_calls {
                // Suspension point: before each tool dispatch.
                if entry.cancel.is_cancelled() {
                    return self.finish_cancelled(entry, run_id, session_id);
                }

                let _ = self.emitter.emit(RunEvent::ToolStarted {
                    base: BaseEvent::now(run_id, session_id),
                    call_id: call.id.clone(),
                    name: call.name.clone(),
                    arguments: call.arguments.clone(),
                });

                let dispatch_start = Instant::now();
                let ctx = ToolContext {
                    call_id: call.id.clone(),
                    session_id: session_id.to_owned(),
                    workspace_dir: self.config.workspace_dir.clone(),
                    cancellation: entry.cancel.clone(),
                };
                let result = self.broker.execute(call, &ctx).await;

                // The in-flight tool ran to completion; if cancellation
                // arrived meanwhile its result is discarded, not applied.
                if entry.cancel.is_cancelled() {
                    return self.finish_cancelled(entry, run_id, session_id);
                }

                let _ = self.emitter.emit(RunEvent::ToolCompleted {
                    base: BaseEvent::now(run_id, session_id),
                    call_id: call.id.clone(),
                    name: call.name.clone(),
                    duration_ms: duration_ms(dispatch_start),
                    result: result.clone(),
                });
                results.push(result);
            }

            session.append(Message::assistant(text, response.tool_calls.clone()));
            for result in results {
                session.append(Message::tool(vec![result]));
            }
            if let Err(e) = self.store.save(&mut session) {
                return self.finish_error(
                    entry,
                    run_id,
                    session_id,
                    format!("failed to persist transcript: {e}"),
                );
            }

            let _ = self.emitter.emit(RunEvent::TurnCompleted {
                base: BaseEvent::now(run_id, session_id),
                turn,
                duration_ms: duration_ms(turn_start),
                token_usage: Some(response.usage),
            });
        }

        self.finish_error(
            entry,
            run_id,
            session_id,
            format!("iteration limit exceeded after {} turns", self.config.max_turns),
        )
    }

    fn finish_completed(
        &self,
        entry: &Arc<ActiveRun>,
        run_id: &str,
        session_id: &str,
        turns: u32,
    ) -> Run {
        let run = finalize(entry, RunStatus::Completed, None);
        info!(run_id, session_id, turns, "run completed");
        let _ = self.emitter.emit(RunEvent::RunCompleted {
            base: BaseEvent::now(run_id, session_id),
            turns,
        });
        run
    }

    fn finish_error(
        &self,
        entry: &Arc<ActiveRun>,
        run_id: &str,
        session_id: &str,
        error: String,
    ) -> Run {
        let run = finalize(entry, RunStatus::Error, Some(error.clone()));
        warn!(run_id, session_id, error, "run failed");
        let _ = self.emitter.emit(RunEvent::RunFailed {
            base: BaseEvent::now(run_id, session_id),
            error,
        });
        run
    }

    fn finish_cancelled(&self, entry: &Arc<ActiveRun>, run_id: &str, session_id: &str) -> Run {
        let run = finalize(entry, RunStatus::Cancelled, None);
        info!(run_id, session_id, "run cancelled");
        let _ = self.emitter.emit(RunEvent::RunCancelled {
            base: BaseEvent::now(run_id, session_id),
        });
        run
    }
}

fn finalize(entry: &Arc<ActiveRun>, status: RunStatus, error: Option<String>) -> Run {
    let mut run = entry.run.write();
    run.status = status;
    run.error = error;
    run.ended_at = Some(chrono::Utc::now().to_rfc3339());
    run.clone()
}

#[allow(clippy::cast_possible_truncation)]
fn duration_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
