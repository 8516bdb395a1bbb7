//! Remote control via Unix socket
//!
//! Accepts line commands over a Unix socket (`fire 10 20`, `reset`, ...)
//! and forwards them to the front-end as if the user had clicked or
//! pressed a key.

use crate::command::{parse_command, Command};
use crate::error::{BlastError, Result};
use std::io::{BufRead, BufReader};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const SOCKET_PATH: &str = "/tmp/blastfield.sock";

/// Controller that listens for commands on a Unix socket
pub struct Controller {
    receiver: Receiver<Command>,
    path: PathBuf,
    _listener_thread: thread::JoinHandle<()>,
}

impl Controller {
    /// Listen on the default socket path
    pub fn new() -> Result<Self> {
        Self::bind(SOCKET_PATH)
    }

    /// Listen on `path`, replacing a stale socket file
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let _ = std::fs::remove_file(&path);

        let listener = UnixListener::bind(&path)
            .map_err(|e| BlastError::Control(format!("failed to bind {}: {}", path.display(), e)))?;

        // Non-blocking so the accept loop can notice a closed socket
        listener.set_nonblocking(true)?;

        let (sender, receiver) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("blast-control".into())
            .spawn(move || Self::listener_loop(listener, sender))?;

        info!(path = %path.display(), "control socket listening");

        Ok(Self {
            receiver,
            path,
            _listener_thread: handle,
        })
    }

    fn listener_loop(listener: UnixListener, sender: Sender<Command>) {
        loop {
            match listener.accept() {
                Ok((stream, _)) => {
                    let sender = sender.clone();
                    thread::spawn(move || {
                        Self::handle_client(stream, sender);
                    });
                },
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(50));
                },
                Err(e) => {
                    warn!(error = %e, "control socket closed");
                    break;
                },
            }
        }
    }

    fn handle_client(stream: UnixStream, sender: Sender<Command>) {
        // Accepted streams inherit non-blocking mode on some platforms
        let _ = stream.set_nonblocking(false);
        let reader = BufReader::new(stream);
        for line in reader.lines().map_while(std::result::Result::ok) {
            match parse_command(&line) {
                Some(cmd) => {
                    if sender.send(cmd).is_err() {
                        break;
                    }
                },
                None => debug!(line = %line, "ignoring unknown control command"),
            }
        }
    }

    /// Get any pending commands (non-blocking)
    pub fn poll(&self) -> Vec<Command> {
        self.receiver.try_iter().collect()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
