//! Session supervisor: the public reset/step/close contract
//!
//! The supervisor owns the game process, the gateway, the frame channel,
//! and the driver thread as one unit; the four are created and torn down
//! together. Crashes flip an atomic state cell from the driver thread and
//! surface on the caller's next `step` as a degraded outcome; a forced full
//! relaunch runs every `restart_frequency` matches.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use fightice_bridge::{FrameObserver, GameInstall, GatewayClient, free_port};
use fightice_core::{
    ActionId, ActionSpace, FightIceError, FrameMessage, Observation, Result, StepOutcome,
};
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

use crate::channel::{CallerEndpoint, frame_channel};
use crate::driver::spawn_match_driver;
use crate::observer::{ChannelObserver, Opponent};
use crate::process::SharedGameProcess;

/// Rounds the game plays per match
const ROUNDS_PER_MATCH: u32 = 3;

/// Name player 1 registers under
const PLAYER_ONE: &str = "EnvObserver";

/// Session lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Stopped = 0,
    Starting = 1,
    Running = 2,
    Crashed = 3,
}

/// Atomic state cell. Written by the caller thread at lifecycle
/// transitions; the driver thread writes only the crash flip.
#[derive(Debug, Default)]
pub struct StateCell(AtomicU8);

impl StateCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> SessionState {
        match self.0.load(Ordering::SeqCst) {
            1 => SessionState::Starting,
            2 => SessionState::Running,
            3 => SessionState::Crashed,
            _ => SessionState::Stopped,
        }
    }

    pub fn set(&self, state: SessionState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.get() == SessionState::Running
    }
}

/// Environment configuration
#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// Root of the game install (cwd of the spawned process)
    pub install_root: PathBuf,
    /// Gateway port; picked from the OS when absent
    pub port: Option<u16>,
    /// Matches between forced full relaunches of process and bridge
    pub restart_frequency: u32,
    /// Warm-up wait between spawn and gateway connect
    pub settle_delay: Duration,
    /// Gateway connection timeout
    pub connect_timeout: Duration,
    /// Character selection for both sides
    pub character_1: String,
    pub character_2: String,
}

impl EnvConfig {
    pub fn new(install_root: impl Into<PathBuf>) -> Self {
        Self {
            install_root: install_root.into(),
            port: None,
            restart_frequency: 3,
            settle_delay: Duration::from_secs(3),
            connect_timeout: Duration::from_secs(30),
            character_1: "ZEN".into(),
            character_2: "ZEN".into(),
        }
    }
}

/// Owner-only resources: the install, the config, and the runtime that
/// carries bridge IO under the synchronous surface.
struct OwnerParts {
    config: EnvConfig,
    install: GameInstall,
    runtime: Runtime,
}

/// Handle for building the second supervisor of a two-player match
pub struct PeerHandle {
    pub(crate) caller: CallerEndpoint,
    pub(crate) process: SharedGameProcess,
}

/// Supervisor for one player's view of the game
pub struct SessionSupervisor {
    owner: Option<OwnerParts>,
    state: Arc<StateCell>,
    process: Option<SharedGameProcess>,
    gateway: Option<Arc<GatewayClient>>,
    caller: Option<CallerEndpoint>,
    driver: Option<thread::JoinHandle<()>>,
    round_count: u32,
    port: u16,
}

impl SessionSupervisor {
    /// Validate the install and claim a port. Fatal configuration problems
    /// (missing runtime, missing install assets) surface here, before any
    /// process is spawned.
    pub fn new(config: EnvConfig) -> Result<Self> {
        let install = GameInstall::locate(&config.install_root)?;
        let port = match config.port {
            Some(port) => port,
            None => free_port()?,
        };
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .map_err(|e| FightIceError::Config(format!("tokio runtime: {}", e)))?;

        info!(port, root = %config.install_root.display(), "session supervisor ready");
        Ok(Self {
            owner: Some(OwnerParts {
                config,
                install,
                runtime,
            }),
            state: Arc::new(StateCell::new()),
            process: Some(SharedGameProcess::new(port)),
            gateway: None,
            caller: None,
            driver: None,
            round_count: 0,
            port,
        })
    }

    /// Build the second supervisor of a two-player match from the handle the
    /// owner produced with [`SessionSupervisor::peer_player`]. Peer sessions
    /// drive their own frame stream but never manage the process or bridge.
    pub fn join_peer(handle: PeerHandle) -> Self {
        let port = handle.process.port();
        info!(port, "peer session attached");
        Self {
            owner: None,
            state: Arc::new(StateCell::new()),
            process: Some(handle.process),
            gateway: None,
            caller: Some(handle.caller),
            driver: None,
            round_count: 0,
            port,
        }
    }

    /// Create the player-2 half of a two-supervisor match: the opponent this
    /// session passes to `reset`, and the handle its peer is built from.
    /// Both sessions share the process; it dies with whichever closes last.
    pub fn peer_player(&self, name: impl Into<String>) -> Result<(Opponent, PeerHandle)> {
        let process = self
            .process
            .clone()
            .ok_or_else(|| FightIceError::Config("session is closed".into()))?;
        let name = name.into();
        let (caller, handler) = frame_channel();
        let link = Arc::new(Mutex::new(handler));
        let opponent = Opponent::local(move || {
            Box::new(ChannelObserver::from_link(name.clone(), link.clone()))
                as Box<dyn FrameObserver>
        });
        Ok((opponent, PeerHandle { caller, process }))
    }

    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    pub fn round_count(&self) -> u32 {
        self.round_count
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn action_space(&self) -> ActionSpace {
        ActionSpace::default()
    }

    /// Begin a new round, (re)starting the game as needed.
    ///
    /// A session that is not running is torn down best-effort and launched
    /// fresh. A running session that has consumed `restart_frequency`
    /// matches' worth of rounds gets a forced full relaunch of process and
    /// bridge; failure there is fatal.
    pub fn reset(&mut self, p2: &Opponent) -> Result<Observation> {
        let forced_at = self
            .owner
            .as_ref()
            .map(|o| o.config.restart_frequency * ROUNDS_PER_MATCH);

        if let Some(forced_at) = forced_at {
            if !self.state.is_running() {
                for e in self.teardown() {
                    warn!("suppressed during teardown: {}", e);
                }
                self.start(p2)?;
            } else if self.round_count == forced_at {
                info!(rounds = self.round_count, "forced periodic restart");
                for e in self.teardown() {
                    warn!("suppressed during restart teardown: {}", e);
                }
                self.start(p2)
                    .map_err(|e| FightIceError::RestartFailed(e.to_string()))?;
            }
        } else if !self.state.is_running() {
            // Peer sessions attach to the match the owner runs
            self.state.set(SessionState::Running);
        }

        let caller = self.caller.as_ref().ok_or(FightIceError::ChannelClosed)?;
        caller.send(FrameMessage::Reset)?;
        self.round_count += 1;
        let outcome = caller.recv()?;
        debug!(round = self.round_count, "round reset");
        Ok(outcome.observation)
    }

    /// Apply one action for one frame step.
    ///
    /// On a session that is not running (a crash was detected since the last
    /// call) this returns immediately with the degraded outcome: zero
    /// reward, `SessionCrashed`, and the pre-crash info flag. The caller is
    /// expected to `reset` next.
    pub fn step(&mut self, action: usize) -> Result<StepOutcome> {
        if !self.state.is_running() {
            debug!("step on a session that is not running");
            return Ok(StepOutcome::crashed());
        }
        let action = ActionId::new(action)?;

        let Some(caller) = self.caller.as_ref() else {
            self.state.set(SessionState::Crashed);
            return Ok(StepOutcome::crashed());
        };
        if caller.send(FrameMessage::Step { action }).is_err() {
            self.state.set(SessionState::Crashed);
            return Ok(StepOutcome::crashed());
        }
        match caller.recv() {
            Ok(outcome) => Ok(outcome),
            Err(FightIceError::ChannelClosed) => {
                self.state.set(SessionState::Crashed);
                Ok(StepOutcome::crashed())
            }
            Err(e) => Err(e),
        }
    }

    /// Tear down process, bridge, and channel together. Idempotent.
    pub fn close(&mut self) {
        if self.gateway.is_none() && self.caller.is_none() && self.process.is_none() {
            return;
        }
        for e in self.teardown() {
            warn!("suppressed during close: {}", e);
        }
        // Release our share; the process dies with the last session holding it
        self.process = None;
        info!("session closed");
    }

    /// Launch the process, connect the bridge, register the players, create
    /// the match, and hand it to a fresh driver thread.
    fn start(&mut self, p2: &Opponent) -> Result<()> {
        let Some(owner) = self.owner.as_ref() else {
            return Err(FightIceError::Config(
                "peer sessions cannot launch the game".into(),
            ));
        };
        self.state.set(SessionState::Starting);

        let process = self
            .process
            .get_or_insert_with(|| SharedGameProcess::new(self.port));
        process.install(owner.install.spawn(self.port)?);

        // No ready signal exists; the JVM needs its warm-up time
        thread::sleep(owner.config.settle_delay);

        let gateway = Arc::new(owner.runtime.block_on(GatewayClient::connect(
            self.port,
            owner.config.connect_timeout,
        ))?);

        let (caller, handler) = frame_channel();
        owner.runtime.block_on(
            gateway.register_handler(Box::new(ChannelObserver::new(PLAYER_ONE, handler))),
        )?;

        let p2_name = match p2 {
            Opponent::Builtin(name) => name.clone(),
            Opponent::Local(factory) => {
                let observer = factory();
                let name = observer.name().to_string();
                owner.runtime.block_on(gateway.register_handler(observer))?;
                name
            }
        };

        let descriptor = owner.runtime.block_on(gateway.create_game(
            &owner.config.character_1,
            &owner.config.character_2,
            PLAYER_ONE,
            &p2_name,
            owner.config.restart_frequency,
        ))?;

        let driver = {
            let state = self.state.clone();
            spawn_match_driver(
                owner.runtime.handle().clone(),
                gateway.clone(),
                descriptor,
                move |_note| state.set(SessionState::Crashed),
            )
            .map_err(|e| FightIceError::Launch(format!("match driver thread: {}", e)))?
        };

        self.gateway = Some(gateway);
        self.caller = Some(caller);
        self.driver = Some(driver);
        self.round_count = 0;
        self.state.set(SessionState::Running);
        info!(port = self.port, player2 = %p2_name, "session running");
        Ok(())
    }

    /// Best-effort release of bridge, driver, and channel. Failures are
    /// returned for logging, never propagated, so a broken previous session
    /// cannot block establishing a new one.
    fn teardown(&mut self) -> Vec<FightIceError> {
        let mut suppressed = Vec::new();

        if let (Some(gateway), Some(owner)) = (self.gateway.take(), self.owner.as_ref()) {
            owner.runtime.block_on(gateway.disconnect());
        }

        // Dropping the caller endpoint frees an observer blocked on the channel
        self.caller = None;

        if let Some(driver) = self.driver.take() {
            if driver.join().is_err() {
                suppressed.push(FightIceError::GameCrashed("match driver panicked".into()));
            }
        }

        // A process we alone hold goes down with the rest of the unit; a
        // shared one is left to the last session, or replaced on relaunch.
        if let Some(process) = self.process.as_ref() {
            if process.sessions() == 1 {
                process.kill();
            }
        }

        self.state.set(SessionState::Stopped);
        suppressed
    }
}

impl Drop for SessionSupervisor {
    fn drop(&mut self) {
        self.close();
    }
}
