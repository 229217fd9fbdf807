//! Async session driver
//!
//! One tokio task owns one `Session`. Control commands and timer ticks both
//! arrive on that task, so every mutation runs to completion before the next
//! one starts and no locking is needed around the session itself.

use log::{debug, info, warn};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::core::config::EngineConfig;
use crate::core::scheduler::{TimerId, TokioScheduler};
use crate::core::session::{FrameObserver, Session};
use crate::types::{ConfigError, EngineError, EngineResult, SessionSnapshot};

/// Capacity of the snapshot broadcast channel
const UPDATE_CHANNEL_CAPACITY: usize = 100;

/// Capacity of the control command channel
const COMMAND_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug)]
enum Command {
    Start(oneshot::Sender<SessionSnapshot>),
    Stop(oneshot::Sender<SessionSnapshot>),
    Reset(oneshot::Sender<SessionSnapshot>),
    Snapshot(oneshot::Sender<SessionSnapshot>),
}

/// Cloneable handle to a running session task
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    updates: broadcast::Sender<SessionSnapshot>,
    shutdown: CancellationToken,
}

/// Validate `config` and spawn the session task. Must be called inside a tokio runtime.
pub fn spawn_session(config: EngineConfig) -> Result<SessionHandle, ConfigError> {
    spawn_session_inner(config, None)
}

/// As [`spawn_session`], consulting `observer` at the top of every tick
pub fn spawn_session_with_observer(
    config: EngineConfig,
    observer: impl FrameObserver + 'static,
) -> Result<SessionHandle, ConfigError> {
    spawn_session_inner(config, Some(Box::new(observer)))
}

fn spawn_session_inner(
    config: EngineConfig,
    observer: Option<Box<dyn FrameObserver>>,
) -> Result<SessionHandle, ConfigError> {
    let (tick_tx, tick_rx) = mpsc::unbounded_channel();
    let scheduler = TokioScheduler::new(tick_tx);
    let mut session = Session::new(config, Box::new(scheduler))?;
    if let Some(observer) = observer {
        session = session.with_boxed_frame_observer(observer);
    }

    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    let (update_tx, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
    let shutdown = CancellationToken::new();

    tokio::spawn(drive(
        session,
        cmd_rx,
        tick_rx,
        update_tx.clone(),
        shutdown.clone(),
    ));

    Ok(SessionHandle {
        commands: cmd_tx,
        updates: update_tx,
        shutdown,
    })
}

async fn drive(
    mut session: Session,
    mut commands: mpsc::Receiver<Command>,
    mut ticks: mpsc::UnboundedReceiver<TimerId>,
    updates: broadcast::Sender<SessionSnapshot>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                debug!("session task shutting down");
                break;
            }

            command = commands.recv() => {
                let Some(command) = command else {
                    debug!("all session handles dropped");
                    break;
                };
                let (reply, changed) = match command {
                    Command::Start(reply) => (reply, session.start()),
                    Command::Stop(reply) => (reply, session.stop()),
                    Command::Reset(reply) => {
                        session.reset();
                        (reply, true)
                    }
                    Command::Snapshot(reply) => (reply, false),
                };
                let snapshot = session.snapshot();
                if changed {
                    let _ = updates.send(snapshot.clone());
                }
                let _ = reply.send(snapshot);
            }

            Some(id) = ticks.recv() => {
                match session.tick(id) {
                    Ok(Some(_)) => {
                        let _ = updates.send(session.snapshot());
                    }
                    Ok(None) => {}
                    Err(err) => {
                        warn!("session stopped: {}", err);
                        let _ = updates.send(session.snapshot());
                    }
                }
            }
        }
    }

    // Disposal: cancel any outstanding timer on every exit path
    session.reset();
    info!("session disposed");
}

impl SessionHandle {
    async fn request(&self, make: fn(oneshot::Sender<SessionSnapshot>) -> Command) -> EngineResult<SessionSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .await
            .map_err(|_| EngineError::SessionClosed)?;
        rx.await.map_err(|_| EngineError::SessionClosed)
    }

    pub async fn start(&self) -> EngineResult<SessionSnapshot> {
        self.request(Command::Start).await
    }

    pub async fn stop(&self) -> EngineResult<SessionSnapshot> {
        self.request(Command::Stop).await
    }

    pub async fn reset(&self) -> EngineResult<SessionSnapshot> {
        self.request(Command::Reset).await
    }

    pub async fn snapshot(&self) -> EngineResult<SessionSnapshot> {
        self.request(Command::Snapshot).await
    }

    /// Snapshots pushed after every applied tick and every state change
    pub fn subscribe(&self) -> broadcast::Receiver<SessionSnapshot> {
        self.updates.subscribe()
    }

    /// Dispose the session; later requests fail with `SessionClosed`
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled() || self.commands.is_closed()
    }
}
