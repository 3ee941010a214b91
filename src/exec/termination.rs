// src/exec/termination.rs

use crate::platform::Platform;

/// How a live process is stopped, picked from the platform family.
///
/// A single signal does not reliably take down a process tree on Windows,
/// so there the whole tree is force-killed with `taskkill`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Send SIGTERM straight to the pid.
    Signal,
    /// Run `taskkill /pid <pid> /T /F` through the shell.
    TaskTree,
}

impl Termination {
    pub fn for_platform(platform: Platform) -> Self {
        match platform {
            Platform::Windows => Termination::TaskTree,
            Platform::Unix => Termination::Signal,
        }
    }

    /// Command line that force-kills `pid` and all of its descendants.
    pub fn task_tree_command(pid: u32) -> String {
        format!("taskkill /pid {pid} /T /F")
    }
}
