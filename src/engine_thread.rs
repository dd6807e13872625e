//! The engine worker thread and the two channels connecting it to the UI.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::application::{load_application, ApplicationSource, LoadedApplication};
use crate::asset_lib::AssetLibrary;
use crate::console::LogChannel;
use crate::controllers::{ControllerContext, Dispatcher, Flow};
use crate::events::{EditorEvent, EventSender};
use crate::message::EditorRequest;
use crate::runtime::Runtime;

pub const ENGINE_THREAD_NAME: &str = "pegasus-engine";

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub asset_root: PathBuf,
    pub application: ApplicationSource,
    pub tick: Duration,
}

/// UI-side end of the request channel.
#[derive(Debug, Clone)]
pub struct RequestSender {
    tx: Sender<EditorRequest>,
}

impl RequestSender {
    pub fn new(tx: Sender<EditorRequest>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, Receiver<EditorRequest>) {
        let (tx, rx) = mpsc::channel();
        (Self::new(tx), rx)
    }

    /// Posts a request; returns false once the engine thread is gone.
    pub fn post(&self, request: EditorRequest) -> bool {
        match self.tx.send(request) {
            Ok(()) => true,
            Err(mpsc::SendError(request)) => {
                log::warn!("[editor] engine stopped, dropped {}", request.label());
                false
            }
        }
    }
}

/// Everything the UI thread holds of the engine: where to post requests and where events arrive.
#[derive(Debug)]
pub struct EditorLink {
    requests: RequestSender,
    events: Receiver<EditorEvent>,
}

impl EditorLink {
    pub fn new(requests: RequestSender, events: Receiver<EditorEvent>) -> Self {
        Self { requests, events }
    }

    pub fn requests(&self) -> &RequestSender {
        &self.requests
    }

    pub fn post(&self, request: EditorRequest) -> bool {
        self.requests.post(request)
    }

    pub fn drain_events(&self) -> Vec<EditorEvent> {
        self.events.try_iter().collect()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EditorEvent> {
        self.events.recv_timeout(timeout).ok()
    }
}

pub struct EngineThread {
    requests: RequestSender,
    join: Option<JoinHandle<()>>,
}

impl EngineThread {
    pub fn spawn(options: EngineOptions) -> Result<(Self, EditorLink)> {
        let (requests, request_rx) = RequestSender::channel();
        let (events, event_rx) = EventSender::channel();
        let join = thread::Builder::new()
            .name(ENGINE_THREAD_NAME.to_string())
            .spawn(move || run_engine(options, request_rx, events))
            .context("spawn engine thread")?;
        let link = EditorLink::new(requests.clone(), event_rx);
        Ok((Self { requests, join: Some(join) }, link))
    }

    pub fn is_running(&self) -> bool {
        self.join.as_ref().is_some_and(|join| !join.is_finished())
    }

    /// Asks the engine loop to stop and waits for it. The UI end must already be gone or
    /// drained: an assertion still queued for the UI keeps the engine blocked. Use
    /// [`EngineThread::shutdown_with`] while the UI still holds its link.
    pub fn shutdown(&mut self) {
        if self.join.is_some() {
            self.requests.post(EditorRequest::Shutdown);
        }
        self.join();
    }

    /// Stops the engine and releases the UI end before waiting. Assertions still waiting for
    /// an answer resolve to `Break`.
    pub fn shutdown_with(&mut self, link: EditorLink) {
        if self.join.is_some() {
            self.requests.post(EditorRequest::Shutdown);
        }
        let EditorLink { events, .. } = link;
        let unanswered = events.try_iter().filter(|event| matches!(event, EditorEvent::Assertion(_))).count();
        if unanswered > 0 {
            log::warn!("[engine] {unanswered} assertion(s) left unanswered at shutdown");
        }
        drop(events);
        self.join();
    }

    fn join(&mut self) {
        let Some(join) = self.join.take() else {
            return;
        };
        if join.join().is_err() {
            log::error!("[engine] engine thread panicked");
        }
    }
}

impl Drop for EngineThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_engine(options: EngineOptions, requests: Receiver<EditorRequest>, events: EventSender) {
    let mut runtime = Runtime::new(AssetLibrary::new(&options.asset_root), events.clone());
    let mut loaded = match load_application(&options.application) {
        Ok(loaded) => loaded,
        Err(error) => {
            runtime.log(LogChannel::Critical, format!("application failed to load: {error}"));
            events.send(EditorEvent::ApplicationLoadFailed { error });
            LoadedApplication::builtin()
        }
    };
    if let Err(err) = loaded.app_mut().initialize(&mut runtime) {
        runtime.log(LogChannel::Error, format!("{} failed to initialize: {err:#}", loaded.name()));
    }
    events.send(EditorEvent::ApplicationLoaded { name: loaded.name().to_string() });
    log::info!("[engine] running '{}' on {}", loaded.name(), options.asset_root.display());

    let tick = options.tick.max(Duration::from_millis(1));
    let mut dispatcher = Dispatcher::new();
    let mut last_frame = Instant::now();
    'engine: loop {
        let first = match requests.recv_timeout(tick) {
            Ok(request) => Some(request),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => break,
        };
        let mut next = first;
        while let Some(request) = next.take() {
            let mut ctx = ControllerContext { runtime: &mut runtime, app: loaded.app_mut() };
            if dispatcher.dispatch(&mut ctx, request) == Flow::Shutdown {
                break 'engine;
            }
            next = match requests.try_recv() {
                Ok(request) => Some(request),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => break 'engine,
            };
        }

        let elapsed = last_frame.elapsed();
        if elapsed < tick {
            continue;
        }
        last_frame = Instant::now();
        if runtime.poll_tree_changes() {
            match runtime.asset_tree() {
                Ok(tree) => events.send(EditorEvent::AssetTree(tree)),
                Err(err) => runtime.log(LogChannel::Warning, format!("asset tree refresh failed: {err}")),
            }
        }
        if let Err(err) = loaded.app_mut().frame(&mut runtime, elapsed.as_secs_f32()) {
            runtime.log(LogChannel::Error, format!("frame failed: {err:#}"));
        }
        runtime.advance_frame();
    }

    loaded.app_mut().shutdown(&mut runtime);
    log::info!("[engine] stopped after {} frames", runtime.frames());
    events.send(EditorEvent::ApplicationStopped);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::AssetInstanceHandle;
    use crate::message::{Dock, GraphIoMessage};

    #[test]
    fn builtin_engine_starts_and_stops() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (mut engine, link) = EngineThread::spawn(EngineOptions {
            asset_root: dir.path().to_path_buf(),
            application: ApplicationSource::Builtin,
            tick: Duration::from_millis(2),
        })
        .expect("spawn");
        let mut loaded = None;
        while let Some(event) = link.recv_timeout(Duration::from_secs(5)) {
            if let EditorEvent::ApplicationLoaded { name } = event {
                loaded = Some(name);
                break;
            }
        }
        assert_eq!(loaded.as_deref(), Some("builtin"));
        engine.shutdown();
        assert!(!engine.is_running());
        let tail: Vec<String> = link.drain_events().into_iter().map(|event| event.to_string()).collect();
        assert_eq!(tail.last().map(String::as_str), Some("ApplicationStopped"));
        assert!(!link.post(EditorRequest::Shutdown));
    }

    #[test]
    fn failed_library_falls_back_to_builtin() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (_engine, link) = EngineThread::spawn(EngineOptions {
            asset_root: dir.path().to_path_buf(),
            application: ApplicationSource::Library(dir.path().join("libabsent.so")),
            tick: Duration::from_millis(2),
        })
        .expect("spawn");
        let mut seen = Vec::new();
        while let Some(event) = link.recv_timeout(Duration::from_secs(5)) {
            let done = matches!(event, EditorEvent::ApplicationLoaded { .. });
            if !matches!(event, EditorEvent::Log { .. }) {
                seen.push(event.to_string());
            }
            if done {
                break;
            }
        }
        assert_eq!(seen.len(), 2);
        assert!(seen[0].starts_with("ApplicationLoadFailed cannot load application"));
        assert_eq!(seen[1], "ApplicationLoaded name=builtin");
    }

    #[test]
    fn shutdown_releases_an_engine_blocked_on_an_assertion() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (mut engine, link) = EngineThread::spawn(EngineOptions {
            asset_root: dir.path().to_path_buf(),
            application: ApplicationSource::Builtin,
            tick: Duration::from_millis(2),
        })
        .expect("spawn");
        link.post(EditorRequest::Graph(Dock::ProgramEditor, GraphIoMessage::ViewGraph {
            handle: AssetInstanceHandle::new(7),
        }));
        // The prompt request follows this log line; leave it queued and unanswered.
        let mut raised = false;
        while let Some(event) = link.recv_timeout(Duration::from_secs(5)) {
            if matches!(event, EditorEvent::Log { channel: LogChannel::Assert, .. }) {
                raised = true;
                break;
            }
        }
        engine.shutdown_with(link);
        assert!(raised);
        assert!(!engine.is_running());
    }
}
