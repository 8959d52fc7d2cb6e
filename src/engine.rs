use crate::Config;
use crate::controls::ControlInput;
use crate::error::{LoadError, RequestError};
use crate::events::{Control, Event};
use crate::midi::{NoteSink, TransportConsumer};
use crate::protocol::{LoadRequest, LoadResponse, StatusSnapshot};
use crate::timing::{Debouncer, PlaybackEngine, SequenceStore, TickScaler, TransportArbiter};
use arc_swap::ArcSwap;
use crossbeam::channel::{Receiver, Sender};
use ringbuf::traits::Consumer;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Loaded(Result<LoadResponse, LoadError>),
    Status(StatusSnapshot),
}

/// The whole device state: the stored phrase, the playback cursor and the
/// transport flags. Only the polling loop owns it.
#[derive(Debug, Clone)]
pub struct Engine {
    store: SequenceStore,
    player: PlaybackEngine,
    arbiter: TransportArbiter,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl Engine {
    pub fn new(config: &Config) -> Self {
        Self {
            store: SequenceStore::new(
                config.default_channel,
                config.default_velocity,
                TickScaler::new(config.auto_scale_enabled),
            ),
            player: PlaybackEngine::new(config.loop_enabled),
            arbiter: TransportArbiter::new(config.secondary_trigger_enabled),
        }
    }

    pub fn store(&self) -> &SequenceStore {
        &self.store
    }

    pub fn player(&self) -> &PlaybackEngine {
        &self.player
    }

    pub fn dispatch(&mut self, event: Event, out: &mut impl NoteSink) -> Option<Reply> {
        match event {
            Event::ClockPulse => self.on_clock_pulse(out),
            Event::Start => self.on_transport_start(out),
            Event::Stop => self.on_transport_stop(out),
            Event::Continue => self.on_transport_continue(out),
            Event::ControlEdge { control, pressed } => self.on_control_edge(control, pressed, out),
            Event::LoadRequest(request) => {
                return Some(Reply::Loaded(self.load_sequence(&request, out)));
            }
            Event::QueryStatus => return Some(Reply::Status(self.status())),
        }
        None
    }

    /// Validate and install a new phrase. Any playing phrase is silenced
    /// before the new one becomes visible; a rejected request changes
    /// nothing.
    pub fn load_sequence(
        &mut self,
        request: &LoadRequest,
        out: &mut impl NoteSink,
    ) -> Result<LoadResponse, LoadError> {
        let sequence = self.store.prepare(request).inspect_err(|e| {
            warn!(code = e.code(), error = %e, "load rejected");
        })?;

        self.arbiter.stop_playback(&mut self.player, out, false);
        self.store.replace(sequence);

        Ok(LoadResponse {
            events_loaded: self.store.sequence().len(),
            channel: self.store.sequence().channel(),
            sequence_loaded: self.store.is_loaded(),
            transport_running: self.arbiter.is_running(),
        })
    }

    pub fn status(&self) -> StatusSnapshot {
        let sequence = self.store.sequence();
        StatusSnapshot {
            sequence_loaded: self.store.is_loaded(),
            event_count: sequence.len(),
            channel: sequence.channel(),
            playing: self.player.is_playing(),
            pending: self.arbiter.is_pending(),
            transport_running: self.arbiter.is_running(),
            timing: sequence.timing(),
        }
    }

    pub fn on_clock_pulse(&mut self, out: &mut impl NoteSink) {
        self.arbiter.on_clock_pulse(&mut self.player, &self.store, out);
    }

    pub fn on_transport_start(&mut self, out: &mut impl NoteSink) {
        self.arbiter.on_start(&mut self.player, &self.store, out);
    }

    pub fn on_transport_stop(&mut self, out: &mut impl NoteSink) {
        self.arbiter.on_stop(&mut self.player, out);
    }

    pub fn on_transport_continue(&mut self, out: &mut impl NoteSink) {
        self.arbiter.on_continue(&mut self.player, &self.store, out);
    }

    pub fn on_control_edge(&mut self, control: Control, pressed: bool, out: &mut impl NoteSink) {
        self.arbiter
            .on_control_edge(control, pressed, &mut self.player, &self.store, out);
    }

    pub fn shutdown(&mut self, out: &mut impl NoteSink) {
        if let Some((note, _)) = self.player.sounding_note() {
            info!(note, "releasing held note");
        }
        self.arbiter.stop_playback(&mut self.player, out, false);
    }
}

#[derive(Debug)]
pub enum Request {
    Load {
        request: LoadRequest,
        reply: Sender<Result<LoadResponse, LoadError>>,
    },
    Status {
        reply: Sender<StatusSnapshot>,
    },
    Shutdown,
}

/// The single cooperative loop that owns the [`Engine`].
///
/// Each cycle samples both controls, drains every queued clock/transport
/// signal in arrival order, then services at most one request.
pub struct PollLoop<S, C> {
    engine: Engine,
    sink: S,
    controls: C,
    primary: Debouncer,
    trigger: Debouncer,
    transport: TransportConsumer,
    requests: Receiver<Request>,
    status: Arc<ArcSwap<StatusSnapshot>>,
    epoch: Instant,
    interval: Duration,
}

impl<S: NoteSink, C: ControlInput> PollLoop<S, C> {
    pub fn new(
        config: &Config,
        sink: S,
        controls: C,
        transport: TransportConsumer,
        requests: Receiver<Request>,
        status: Arc<ArcSwap<StatusSnapshot>>,
        epoch: Instant,
    ) -> Self {
        Self {
            engine: Engine::new(config),
            sink,
            controls,
            primary: Debouncer::new(config.debounce_ms),
            trigger: Debouncer::new(config.debounce_ms),
            transport,
            requests,
            status,
            epoch,
            interval: Duration::from_millis(config.poll_interval_ms),
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Run one cycle at `now_ms` on the loop's clock. Returns `false` once a
    /// shutdown was requested or every request sender is gone.
    pub fn cycle_at(&mut self, now_ms: u64) -> bool {
        for (control, debouncer) in [
            (Control::Primary, &mut self.primary),
            (Control::Trigger, &mut self.trigger),
        ] {
            let level = self.controls.level(control, now_ms);
            if let Some(pressed) = debouncer.sample(level, now_ms) {
                debug!(?control, pressed, "control edge");
                self.engine
                    .dispatch(Event::ControlEdge { control, pressed }, &mut self.sink);
            }
        }

        while let Some(signal) = self.transport.try_pop() {
            self.engine.dispatch(signal.into(), &mut self.sink);
        }

        let keep_running = match self.requests.try_recv() {
            Ok(request) => self.serve(request),
            Err(crossbeam::channel::TryRecvError::Empty) => true,
            Err(crossbeam::channel::TryRecvError::Disconnected) => false,
        };

        self.status.store(Arc::new(self.engine.status()));
        keep_running
    }

    fn serve(&mut self, request: Request) -> bool {
        match request {
            Request::Load { request, reply } => {
                let result = self.engine.load_sequence(&request, &mut self.sink);
                let _ = reply.send(result);
            }
            Request::Status { reply } => {
                let _ = reply.send(self.engine.status());
            }
            Request::Shutdown => return false,
        }
        true
    }

    pub fn run(mut self) {
        info!("engine loop running");
        loop {
            let now_ms = self.epoch.elapsed().as_millis() as u64;
            if !self.cycle_at(now_ms) {
                break;
            }
            std::thread::sleep(self.interval);
        }
        self.engine.shutdown(&mut self.sink);
        self.status.store(Arc::new(self.engine.status()));
        info!("engine loop stopped");
    }
}

pub struct EngineHandle {
    request_tx: Sender<Request>,
    status: Arc<ArcSwap<StatusSnapshot>>,
    thread: Option<JoinHandle<()>>,
}

impl EngineHandle {
    pub fn requests(&self) -> Sender<Request> {
        self.request_tx.clone()
    }

    pub fn load(&self, request: LoadRequest) -> Result<LoadResponse, RequestError> {
        load_via(&self.request_tx, request)
    }

    pub fn query_status(&self) -> Result<StatusSnapshot, RequestError> {
        let (reply, rx) = crossbeam::channel::bounded(1);
        self.request_tx
            .send(Request::Status { reply })
            .map_err(|_| RequestError::EngineGone)?;
        rx.recv().map_err(|_| RequestError::EngineGone)
    }

    pub fn latest_status(&self) -> StatusSnapshot {
        **self.status.load()
    }

    pub fn shutdown(mut self) {
        let _ = self.request_tx.send(Request::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

pub fn load_via(requests: &Sender<Request>, request: LoadRequest) -> Result<LoadResponse, RequestError> {
    let (reply, rx) = crossbeam::channel::bounded(1);
    requests
        .send(Request::Load { request, reply })
        .map_err(|_| RequestError::EngineGone)?;
    let result = rx.recv().map_err(|_| RequestError::EngineGone)?;
    Ok(result?)
}

/// Start the polling loop on its own thread. The sink is built on that
/// thread so it never has to cross threads.
pub fn spawn_engine<S, C, F>(
    config: &Config,
    make_sink: F,
    controls: C,
    transport: TransportConsumer,
    epoch: Instant,
) -> EngineHandle
where
    S: NoteSink,
    C: ControlInput + Send + 'static,
    F: FnOnce() -> S + Send + 'static,
{
    let (request_tx, request_rx) = crossbeam::channel::unbounded();
    let status = Arc::new(ArcSwap::from_pointee(StatusSnapshot::default()));
    let config = config.clone();
    let status_loop = status.clone();

    let thread = std::thread::spawn(move || {
        let sink = make_sink();
        PollLoop::new(&config, sink, controls, transport, request_rx, status_loop, epoch).run();
    });

    EngineHandle {
        request_tx,
        status,
        thread: Some(thread),
    }
}
