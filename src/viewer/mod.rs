//! Polling viewer that keeps a local countdown in step with the server clock.
//!
//! [`ClockViewer::spawn`] runs three tasks per viewer: a one second ticker, a
//! poller (interval plus on-demand refreshes) and a reducer that owns the
//! [`ClockEngine`] and feeds it both streams. Advancement requests run on
//! their own tasks and report back to the reducer.

pub mod api;
pub mod engine;
pub mod error;
pub mod polling;

use std::{sync::Arc, time::Duration};

use time::OffsetDateTime;
use tokio::{
    sync::{Notify, mpsc, oneshot, watch},
    task::{JoinHandle, JoinSet},
    time::{Instant, MissedTickBehavior, interval_at},
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::dto::clock::AdvanceLevelResponse;

pub use self::{
    api::{ClockApi, ClockSnapshot, HttpClockApi},
    engine::{ClockEngine, ClockView},
    error::{ApiError, LevelRequestError, ViewerError},
    polling::PollingClient,
};
use self::{
    engine::{AdvanceOutcome, AdvanceRequest, AdvanceResolution, ClockCommand, ClockInput},
    polling::DEFAULT_POLL_INTERVAL,
};

/// Timing settings of a viewer.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub tick_interval: Duration,
    pub poll_interval: Duration,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

type LevelReply = oneshot::Sender<Result<AdvanceLevelResponse, ViewerError>>;

enum Control {
    RequestLevel { target: usize, reply: LevelReply },
    Shutdown,
}

/// Handle to a running viewer. Dropping it stops every task.
pub struct ClockViewer {
    session_id: Uuid,
    view: watch::Receiver<ClockView>,
    control: mpsc::UnboundedSender<Control>,
    refresh: Arc<Notify>,
    timers: Vec<JoinHandle<()>>,
    reducer: Option<JoinHandle<()>>,
}

impl ClockViewer {
    /// Fetch the session once and start ticking and polling.
    ///
    /// A failing first fetch is returned; later poll failures only log.
    pub async fn spawn(
        api: Arc<dyn ClockApi>,
        session_id: Uuid,
        privileged: bool,
        config: ViewerConfig,
    ) -> Result<Self, ViewerError> {
        let mut polling = PollingClient::new(Arc::clone(&api), session_id);
        let snapshot = polling
            .initial_fetch()
            .await
            .map_err(ViewerError::InitialFetch)?;

        let engine = ClockEngine::new(snapshot, privileged, OffsetDateTime::now_utc());
        let (view_tx, view_rx) = watch::channel(engine.view());
        let (tick_tx, tick_rx) = mpsc::unbounded_channel();
        let (poll_tx, poll_rx) = mpsc::unbounded_channel();
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (resolved_tx, resolved_rx) = mpsc::unbounded_channel();
        let refresh = Arc::new(Notify::new());

        let timers = vec![
            tokio::spawn(run_ticks(config.tick_interval, tick_tx)),
            tokio::spawn(run_polls(
                polling,
                config.poll_interval,
                Arc::clone(&refresh),
                poll_tx,
            )),
        ];

        let reducer = Reducer {
            engine,
            api,
            session_id,
            view: view_tx,
            refresh: Arc::clone(&refresh),
            requests: JoinSet::new(),
            resolved_tx,
        };
        let reducer = tokio::spawn(reducer.run(Inputs {
            ticks: tick_rx,
            polls: poll_rx,
            control: control_rx,
            resolved: resolved_rx,
        }));

        info!(%session_id, privileged, "clock viewer started");
        Ok(Self {
            session_id,
            view: view_rx,
            control: control_tx,
            refresh,
            timers,
            reducer: Some(reducer),
        })
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Receiver of view updates.
    pub fn view(&self) -> watch::Receiver<ClockView> {
        self.view.clone()
    }

    /// Latest published view.
    pub fn current(&self) -> ClockView {
        self.view.borrow().clone()
    }

    /// Poll now instead of waiting for the next interval.
    pub fn refresh(&self) {
        self.refresh.notify_one();
    }

    /// Ask the server to jump to `target`, regardless of the countdown.
    ///
    /// The display follows once a poll confirms the change.
    pub async fn request_level(&self, target: usize) -> Result<AdvanceLevelResponse, ViewerError> {
        let (reply, response) = oneshot::channel();
        self.control
            .send(Control::RequestLevel { target, reply })
            .map_err(|_| ViewerError::ShutDown)?;
        response.await.map_err(|_| ViewerError::ShutDown)?
    }

    /// Stop all tasks; responses still in flight are discarded.
    pub async fn shutdown(mut self) {
        let _ = self.control.send(Control::Shutdown);
        for timer in self.timers.drain(..) {
            timer.abort();
        }
        if let Some(reducer) = self.reducer.take() {
            let _ = reducer.await;
        }
        info!(session_id = %self.session_id, "clock viewer stopped");
    }
}

impl Drop for ClockViewer {
    fn drop(&mut self) {
        for task in self.timers.iter().chain(self.reducer.iter()) {
            task.abort();
        }
    }
}

async fn run_ticks(period: Duration, ticks: mpsc::UnboundedSender<()>) {
    let mut interval = interval_at(Instant::now() + period, period);
    loop {
        interval.tick().await;
        if ticks.send(()).is_err() {
            break;
        }
    }
}

async fn run_polls(
    mut client: PollingClient,
    period: Duration,
    refresh: Arc<Notify>,
    polls: mpsc::UnboundedSender<ClockSnapshot>,
) {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = refresh.notified() => {}
        }

        let Some(snapshot) = client.poll().await.cloned() else {
            continue;
        };
        if polls.send(snapshot).is_err() {
            break;
        }
    }
}

struct Inputs {
    ticks: mpsc::UnboundedReceiver<()>,
    polls: mpsc::UnboundedReceiver<ClockSnapshot>,
    control: mpsc::UnboundedReceiver<Control>,
    resolved: mpsc::UnboundedReceiver<AdvanceResolution>,
}

struct Reducer {
    engine: ClockEngine,
    api: Arc<dyn ClockApi>,
    session_id: Uuid,
    view: watch::Sender<ClockView>,
    refresh: Arc<Notify>,
    requests: JoinSet<()>,
    resolved_tx: mpsc::UnboundedSender<AdvanceResolution>,
}

impl Reducer {
    async fn run(mut self, mut inputs: Inputs) {
        loop {
            // polls win over ticks that are ready at the same time
            let input = tokio::select! {
                biased;
                control = inputs.control.recv() => match control {
                    Some(Control::RequestLevel { target, reply }) => {
                        self.request_level(target, reply);
                        continue;
                    }
                    Some(Control::Shutdown) | None => break,
                },
                Some(snapshot) = inputs.polls.recv() => ClockInput::Poll(snapshot),
                Some(resolution) = inputs.resolved.recv() => ClockInput::AdvanceResolved(resolution),
                Some(()) = inputs.ticks.recv() => ClockInput::Tick,
                Some(_) = self.requests.join_next(), if !self.requests.is_empty() => continue,
                else => break,
            };

            let commands = self.engine.apply(input, OffsetDateTime::now_utc());
            self.execute(commands);
            self.publish();
        }

        self.engine.invalidate();
        self.requests.abort_all();
        debug!(session_id = %self.session_id, "clock reducer stopped");
    }

    fn request_level(&mut self, target: usize, reply: LevelReply) {
        match self.engine.request_level(target) {
            Ok(request) => {
                info!(session_id = %self.session_id, target, "manual level request");
                self.send(request, Some(reply));
            }
            Err(err) => {
                debug!(session_id = %self.session_id, target, error = %err, "manual level request refused");
                let _ = reply.send(Err(err.into()));
            }
        }
    }

    fn execute(&mut self, commands: Vec<ClockCommand>) {
        for command in commands {
            match command {
                ClockCommand::Advance(request) => self.send(request, None),
                ClockCommand::Refresh => self.refresh.notify_one(),
            }
        }
    }

    fn send(&mut self, request: AdvanceRequest, reply: Option<LevelReply>) {
        let api = Arc::clone(&self.api);
        let resolved = self.resolved_tx.clone();
        let session_id = self.session_id;

        self.requests.spawn(async move {
            let result = api.advance_level(session_id, request.target).await;
            let _ = resolved.send(AdvanceResolution {
                generation: request.generation,
                request_id: request.request_id,
                outcome: AdvanceOutcome::from_result(&result),
            });
            if let Some(reply) = reply {
                let _ = reply.send(result.map_err(ViewerError::Api));
            }
        });
    }

    fn publish(&self) {
        let view = self.engine.view();
        self.view.send_if_modified(|current| {
            if *current == view {
                false
            } else {
                *current = view;
                true
            }
        });
    }
}
