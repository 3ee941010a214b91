// src/platform.rs

//! Host platform detection.

/// Platform family, as far as process handling is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Unix,
}

impl Platform {
    /// Platform this binary was built for.
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }

    /// Program and leading arguments used to run a full command line.
    pub fn shell(self) -> (&'static str, &'static str) {
        match self {
            Platform::Windows => ("cmd", "/C"),
            Platform::Unix => ("sh", "-c"),
        }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Platform::current()
    }
}
