use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::MemorySource;

const THP_ENABLED: &str = "/sys/kernel/mm/transparent_hugepage/enabled";
const FALLBACK_PAGE_SIZE: u64 = 4096;

/// Reads everything from a procfs mount, `/proc` unless told otherwise.
#[derive(Debug, Clone)]
pub struct ProcFs {
    root: PathBuf,
}

impl Default for ProcFs {
    fn default() -> Self {
        Self::new("/proc")
    }
}

impl ProcFs {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn read(&self, relative: &str) -> io::Result<String> {
        fs::read_to_string(self.root.join(relative))
    }
}

impl MemorySource for ProcFs {
    fn meminfo(&self) -> io::Result<String> {
        self.read("meminfo")
    }

    fn vmstat(&self) -> io::Result<String> {
        self.read("vmstat")
    }

    fn slabinfo(&self) -> io::Result<String> {
        self.read("slabinfo")
    }

    fn zoneinfo(&self) -> io::Result<String> {
        self.read("zoneinfo")
    }

    fn thp_enabled(&self) -> io::Result<String> {
        fs::read_to_string(THP_ENABLED)
    }

    fn process_status(&self, pid: u32) -> io::Result<String> {
        self.read(&format!("{pid}/status"))
    }

    fn process_statm(&self, pid: u32) -> io::Result<String> {
        self.read(&format!("{pid}/statm"))
    }

    fn process_smaps(&self, pid: u32) -> io::Result<String> {
        self.read(&format!("{pid}/smaps"))
    }

    fn command_output(&self, program: &str, args: &[&str]) -> io::Result<String> {
        let output = Command::new(program).args(args).output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(io::Error::other(format!(
                "{program} exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn is_privileged(&self) -> bool {
        // SAFETY: geteuid has no preconditions and cannot fail.
        unsafe { libc::geteuid() == 0 }
    }

    fn page_size(&self) -> u64 {
        // SAFETY: sysconf only reads a configuration value.
        let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if size > 0 {
            size as u64
        } else {
            FALLBACK_PAGE_SIZE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_root_reports_not_found() {
        let source = ProcFs::new("/definitely/not/a/procfs");
        let err = source.meminfo().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn reads_from_custom_root() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("meminfo"), "MemTotal: 1 kB\n").unwrap();
        let source = ProcFs::new(dir.path());
        assert_eq!(source.meminfo().unwrap(), "MemTotal: 1 kB\n");
    }

    #[test]
    fn failing_command_is_an_error() {
        let source = ProcFs::default();
        assert!(source.command_output("false", &[]).is_err());
    }
}
