use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::sync::oneshot;

use procsup::exec::backend::{BoxedReader, ExitFuture, ExitInfo, LaunchedProcess, ProcessBackend};
use procsup::exec::CommandInvocation;

const PIPE_CAPACITY: usize = 64 * 1024;

#[derive(Debug, Clone)]
enum Step {
    Stdout(Vec<u8>),
    Stderr(Vec<u8>),
    Sleep(Duration),
}

/// What a fake process does once launched.
#[derive(Debug, Clone)]
pub struct Script {
    steps: Vec<Step>,
    exit_code: Option<i32>,
    launch_error: Option<io::ErrorKind>,
    hang: bool,
    pipes_linger: Option<Duration>,
}

impl Script {
    /// Write nothing and exit with `code`.
    pub fn exits(code: i32) -> Self {
        Self {
            steps: Vec::new(),
            exit_code: Some(code),
            launch_error: None,
            hang: false,
            pipes_linger: None,
        }
    }

    pub fn succeeds() -> Self {
        Self::exits(0)
    }

    /// Fail to launch, as if the executable did not exist.
    pub fn not_found() -> Self {
        Self {
            launch_error: Some(io::ErrorKind::NotFound),
            ..Self::succeeds()
        }
    }

    pub fn stdout(mut self, data: impl AsRef<[u8]>) -> Self {
        self.steps.push(Step::Stdout(data.as_ref().to_vec()));
        self
    }

    pub fn stderr(mut self, data: impl AsRef<[u8]>) -> Self {
        self.steps.push(Step::Stderr(data.as_ref().to_vec()));
        self
    }

    pub fn sleep_ms(mut self, ms: u64) -> Self {
        self.steps.push(Step::Sleep(Duration::from_millis(ms)));
        self
    }

    /// Keep both pipes open for `ms` after the process exits, like a
    /// background grandchild that inherited them.
    pub fn pipes_linger_ms(mut self, ms: u64) -> Self {
        self.pipes_linger = Some(Duration::from_millis(ms));
        self
    }

    /// After the scripted steps, keep running until signalled.
    pub fn hangs(mut self) -> Self {
        self.hang = true;
        self
    }
}

/// A fake `ProcessBackend` that:
/// - plays back a [`Script`] per program name (default: exit 0 silently)
/// - records every launched invocation and every signalled pid.
///
/// Clones share state, so a test can keep one clone for assertions.
#[derive(Clone)]
pub struct ScriptedBackend {
    scripts: Arc<Mutex<HashMap<String, Script>>>,
    launches: Arc<Mutex<Vec<CommandInvocation>>>,
    signals: Arc<Mutex<Vec<u32>>>,
    kill_switches: Arc<Mutex<HashMap<u32, oneshot::Sender<()>>>>,
    next_pid: Arc<AtomicU32>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            scripts: Arc::new(Mutex::new(HashMap::new())),
            launches: Arc::new(Mutex::new(Vec::new())),
            signals: Arc::new(Mutex::new(Vec::new())),
            kill_switches: Arc::new(Mutex::new(HashMap::new())),
            next_pid: Arc::new(AtomicU32::new(1000)),
        }
    }

    pub fn with_script(self, program: &str, script: Script) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(program.to_string(), script);
        self
    }

    pub fn launches(&self) -> Vec<CommandInvocation> {
        self.launches.lock().unwrap().clone()
    }

    pub fn signals(&self) -> Vec<u32> {
        self.signals.lock().unwrap().clone()
    }
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn no_such_process(pid: u32) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("no process with pid {pid}"))
}

impl ProcessBackend for ScriptedBackend {
    fn launch(&self, invocation: &CommandInvocation) -> io::Result<LaunchedProcess> {
        self.launches.lock().unwrap().push(invocation.clone());

        let script = self
            .scripts
            .lock()
            .unwrap()
            .get(invocation.program())
            .cloned()
            .unwrap_or_else(Script::succeeds);

        if let Some(kind) = script.launch_error {
            return Err(io::Error::new(
                kind,
                format!("{}: command not found", invocation.program()),
            ));
        }

        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
        let (kill_tx, kill_rx) = oneshot::channel::<()>();
        self.kill_switches.lock().unwrap().insert(pid, kill_tx);

        let (stdout_r, mut stdout_w) = tokio::io::duplex(PIPE_CAPACITY);
        let (stderr_r, mut stderr_w) = tokio::io::duplex(PIPE_CAPACITY);
        let Script {
            steps,
            exit_code,
            hang,
            pipes_linger,
            ..
        } = script;

        let run = async move {
            for step in steps {
                match step {
                    Step::Stdout(data) => {
                        let _ = stdout_w.write_all(&data).await;
                    }
                    Step::Stderr(data) => {
                        let _ = stderr_w.write_all(&data).await;
                    }
                    Step::Sleep(d) => tokio::time::sleep(d).await,
                }
            }
            match pipes_linger {
                Some(linger) => {
                    tokio::spawn(async move {
                        tokio::time::sleep(linger).await;
                        drop((stdout_w, stderr_w));
                    });
                }
                None => drop((stdout_w, stderr_w)),
            }
            if hang {
                std::future::pending::<()>().await;
            }
        };

        // A signal ends the process (and closes its pipes) wherever it is.
        let driver = tokio::spawn(async move {
            tokio::select! {
                _ = run => exit_code,
                Ok(()) = kill_rx => None,
            }
        });

        let exit: ExitFuture = Box::pin(async move {
            driver
                .await
                .map(|code| ExitInfo { code })
                .map_err(io::Error::other)
        });

        Ok(LaunchedProcess {
            pid: Some(pid),
            stdout: Some(Box::pin(stdout_r) as BoxedReader),
            stderr: Some(Box::pin(stderr_r) as BoxedReader),
            exit,
        })
    }

    fn signal(&self, pid: u32) -> io::Result<()> {
        self.signals.lock().unwrap().push(pid);

        let switch = self.kill_switches.lock().unwrap().remove(&pid);
        match switch {
            Some(tx) => tx.send(()).map_err(|_| no_such_process(pid)),
            None => Err(no_such_process(pid)),
        }
    }
}
