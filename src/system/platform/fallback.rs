use std::io;

use super::MemorySource;

/// Used on kernels without procfs: every read reports `Unsupported`, so
/// snapshots still form but carry no kernel data.
#[derive(Debug, Clone, Default)]
pub struct Unsupported;

fn unsupported() -> io::Result<String> {
    Err(io::Error::from(io::ErrorKind::Unsupported))
}

impl MemorySource for Unsupported {
    fn meminfo(&self) -> io::Result<String> {
        unsupported()
    }

    fn vmstat(&self) -> io::Result<String> {
        unsupported()
    }

    fn slabinfo(&self) -> io::Result<String> {
        unsupported()
    }

    fn zoneinfo(&self) -> io::Result<String> {
        unsupported()
    }

    fn thp_enabled(&self) -> io::Result<String> {
        unsupported()
    }

    fn process_status(&self, _pid: u32) -> io::Result<String> {
        unsupported()
    }

    fn process_statm(&self, _pid: u32) -> io::Result<String> {
        unsupported()
    }

    fn process_smaps(&self, _pid: u32) -> io::Result<String> {
        unsupported()
    }

    fn command_output(&self, _program: &str, _args: &[&str]) -> io::Result<String> {
        unsupported()
    }

    fn is_privileged(&self) -> bool {
        false
    }

    fn page_size(&self) -> u64 {
        4096
    }
}
