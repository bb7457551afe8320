//! Raw access to the kernel's memory interfaces.
//!
//! The collector only talks to a [`MemorySource`]; the native implementation
//! is chosen here so the rest of the crate stays free of `target_os` gates.

use std::io;

/// Text sources the collector reads. Every method returns the raw contents;
/// parsing lives in `system::procfs` and `system::commands`.
pub trait MemorySource {
    fn meminfo(&self) -> io::Result<String>;
    fn vmstat(&self) -> io::Result<String>;
    fn slabinfo(&self) -> io::Result<String>;
    fn zoneinfo(&self) -> io::Result<String>;
    fn thp_enabled(&self) -> io::Result<String>;
    fn process_status(&self, pid: u32) -> io::Result<String>;
    fn process_statm(&self, pid: u32) -> io::Result<String>;
    fn process_smaps(&self, pid: u32) -> io::Result<String>;
    /// Runs `program` and returns its stdout. A non-zero exit is an error.
    fn command_output(&self, program: &str, args: &[&str]) -> io::Result<String>;
    /// True when running with an effective uid of 0.
    fn is_privileged(&self) -> bool;
    fn page_size(&self) -> u64;
}

#[cfg(target_os = "linux")]
mod linux;
#[cfg(not(target_os = "linux"))]
mod fallback;

#[cfg(target_os = "linux")]
pub use linux::ProcFs as NativeSource;
#[cfg(not(target_os = "linux"))]
pub use fallback::Unsupported as NativeSource;
