//! Java process launcher
//!
//! Validates the game install and the Java runtime before anything is
//! spawned, assembles the per-platform classpath, and owns the OS process
//! handle. The game resolves its resources relative to cwd, so the child
//! always runs with the install root as its working directory.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use fightice_core::{FightIceError, Result};
use tracing::{debug, info};

/// Install pieces that must exist before a launch is attempted
const REQUIRED_JAR: &str = "FightingICE.jar";
const REQUIRED_DIRS: [&str; 2] = ["data", "lib"];

/// Target platform for classpath and JVM flag selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
}

impl Platform {
    pub fn current() -> Self {
        match std::env::consts::OS {
            "macos" => Platform::MacOs,
            "windows" => Platform::Windows,
            _ => Platform::Linux,
        }
    }

    fn natives_dir_name(self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::MacOs => "macos",
            Platform::Windows => "windows",
        }
    }

    fn classpath_separator(self) -> char {
        match self {
            Platform::Windows => ';',
            _ => ':',
        }
    }
}

/// Architecture directory under the LWJGL natives tree
pub fn current_arch_dir() -> &'static str {
    match std::env::consts::ARCH {
        "x86" | "x86_64" => "amd64",
        _ => "arm64",
    }
}

/// A validated game install, ready to spawn processes from
#[derive(Debug, Clone)]
pub struct GameInstall {
    root: PathBuf,
    platform: Platform,
    classpath: String,
}

impl GameInstall {
    /// Validate the install layout and the Java runtime for the host
    /// platform. Fatal configuration errors, raised before any launch.
    pub fn locate(root: impl Into<PathBuf>) -> Result<Self> {
        let install = Self::locate_for(root, Platform::current(), current_arch_dir())?;
        let major = probe_java()?;
        debug!(major, "java runtime detected");
        Ok(install)
    }

    /// Layout validation only, for an explicit platform/arch combination.
    pub fn locate_for(
        root: impl Into<PathBuf>,
        platform: Platform,
        arch: &str,
    ) -> Result<Self> {
        let root = root.into();
        let natives = natives_path(platform, arch);

        let mut required: Vec<PathBuf> = vec![PathBuf::from(REQUIRED_JAR)];
        required.extend(REQUIRED_DIRS.iter().map(PathBuf::from));
        required.push(natives.clone());

        for piece in &required {
            if !root.join(piece).exists() {
                return Err(FightIceError::Config(format!(
                    "FightingICE is not installed at {}: missing {}",
                    root.display(),
                    piece.display()
                )));
            }
        }

        let classpath = assemble_classpath(platform, arch);
        Ok(Self {
            root,
            platform,
            classpath,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn classpath(&self) -> &str {
        &self.classpath
    }

    /// Spawn the game on the given gateway port. The caller must wait the
    /// configured settle delay before connecting a bridge; the process needs
    /// warm-up time and gives no ready signal.
    pub fn spawn(&self, port: u16) -> Result<GameProcess> {
        let mut cmd = Command::new("java");

        match self.platform {
            // Windows needs explicit heap bounds or the JVM under-allocates
            Platform::Windows => {
                cmd.args(["-Xms1024m", "-Xmx1024m"]);
            }
            // LWJGL requires the first thread on macOS
            Platform::MacOs => {
                cmd.arg("-XstartOnFirstThread");
            }
            Platform::Linux => {}
        }

        cmd.arg("-cp")
            .arg(&self.classpath)
            .arg("Main")
            .arg("--port")
            .arg(port.to_string())
            .args(["--py4j", "--fastmode", "--grey-bg", "--mute"])
            .args(["--inverted-player", "1"])
            .args(["--limithp", "400", "400"])
            .current_dir(&self.root)
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let child = cmd
            .spawn()
            .map_err(|e| FightIceError::Launch(format!("java spawn failed: {}", e)))?;

        info!(pid = child.id(), port, root = %self.root.display(), "game process started");
        Ok(GameProcess {
            child,
            killed: false,
        })
    }
}

/// A running game process; force-killed on drop if still alive
#[derive(Debug)]
pub struct GameProcess {
    child: Child,
    killed: bool,
}

impl GameProcess {
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Force-terminate and reap. Idempotent.
    pub fn kill(&mut self) {
        if self.killed {
            return;
        }
        if let Err(e) = self.child.kill() {
            debug!("kill on exited game process: {}", e);
        }
        let _ = self.child.wait();
        self.killed = true;
        info!("game process stopped");
    }

    /// Whether the process is still running
    pub fn is_alive(&mut self) -> bool {
        !self.killed && matches!(self.child.try_wait(), Ok(None))
    }
}

impl Drop for GameProcess {
    fn drop(&mut self) {
        self.kill();
    }
}

fn natives_path(platform: Platform, arch: &str) -> PathBuf {
    ["lib", "lwjgl", "natives", platform.natives_dir_name(), arch]
        .iter()
        .collect()
}

/// Classpath segments are relative to the install root (the child's cwd).
/// The JVM accepts `/` separators on every platform; only the entry
/// separator differs.
fn assemble_classpath(platform: Platform, arch: &str) -> String {
    let natives = format!(
        "lib/lwjgl/natives/{}/{}/*",
        platform.natives_dir_name(),
        arch
    );
    [
        REQUIRED_JAR.to_string(),
        "lib/lwjgl/*".to_string(),
        natives,
        "lib/*".to_string(),
        "data/ai/*".to_string(),
    ]
    .join(&platform.classpath_separator().to_string())
}

/// Check that a `java` runtime is invocable and parse its major version.
pub fn probe_java() -> Result<u32> {
    let output = Command::new("java")
        .arg("-version")
        .output()
        .map_err(|e| FightIceError::Config(format!("java runtime not found: {}", e)))?;

    // `java -version` reports on stderr
    let text = String::from_utf8_lossy(&output.stderr);
    let first = text.lines().next().unwrap_or_default();
    parse_java_major(first)
}

/// Parse the major version from the first `java -version` line.
///
/// Typical shapes:
/// - `openjdk version "21.0.2" 2024-01-16`
/// - `java version "1.8.0_402"`
/// - `openjdk 21.0.2 2024-01-16` (no quotes)
fn parse_java_major(first_line: &str) -> Result<u32> {
    let version = if let Some(quoted) = first_line.split('"').nth(1) {
        quoted
    } else {
        first_line
            .split_whitespace()
            .find(|t| t.chars().next().is_some_and(|c| c.is_ascii_digit()))
            .ok_or_else(|| {
                FightIceError::Config(format!(
                    "could not parse java version output: {}",
                    first_line
                ))
            })?
    };

    // Legacy "1.8.x" form puts the major second
    let major_token = if let Some(rest) = version.strip_prefix("1.") {
        rest.split('.').next().unwrap_or("")
    } else {
        version.split('.').next().unwrap_or("")
    };

    let digits_end = major_token
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(major_token.len());
    major_token[..digits_end].parse::<u32>().map_err(|_| {
        FightIceError::Config(format!("could not parse java major from: {}", version))
    })
}

/// Ask the OS for a currently free TCP port.
pub fn free_port() -> Result<u16> {
    let listener = std::net::TcpListener::bind(("127.0.0.1", 0))
        .map_err(|e| FightIceError::Ipc(format!("free port probe failed: {}", e)))?;
    let port = listener
        .local_addr()
        .map_err(|e| FightIceError::Ipc(format!("free port probe failed: {}", e)))?
        .port();
    Ok(port)
}
