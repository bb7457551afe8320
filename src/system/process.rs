use serde::{Deserialize, Serialize};

/// Number of argv words kept in `cmdline_prefix`.
const CMDLINE_WORDS: usize = 3;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcessMemory {
    pub pid: u32,
    pub name: String,
    pub cmdline_prefix: String,
    pub memory_percent: f64,
    pub rss_bytes: u64,
    pub vms_bytes: u64,
    pub shared_bytes: u64,
    pub text_bytes: u64,
    pub data_bytes: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MlockedProcess {
    pub pid: u32,
    pub name: String,
    pub mlocked_bytes: u64,
}

pub fn cmdline_prefix<I, S>(args: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    args.into_iter()
        .take(CMDLINE_WORDS)
        .map(|s| s.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Memory percentage of `rss` against `total`, rounded to two decimals.
pub fn memory_percent(rss: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let pct = rss as f64 / total as f64 * 100.0;
    (pct * 100.0).round() / 100.0
}

/// Sort by memory percent (largest first) and keep the top `limit`.
///
/// Everything past `limit` is dropped for good; later consumers never see it.
pub fn rank_by_memory_percent(mut processes: Vec<ProcessMemory>, limit: usize) -> Vec<ProcessMemory> {
    processes.sort_by(|a, b| b.memory_percent.total_cmp(&a.memory_percent));
    processes.truncate(limit);
    processes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn process(pid: u32, percent: f64) -> ProcessMemory {
        ProcessMemory {
            pid,
            name: format!("proc{pid}"),
            cmdline_prefix: String::new(),
            memory_percent: percent,
            rss_bytes: 0,
            vms_bytes: 0,
            shared_bytes: 0,
            text_bytes: 0,
            data_bytes: 0,
        }
    }

    #[test]
    fn ranking_sorts_descending_and_truncates() {
        let procs = vec![process(1, 0.5), process(2, 12.0), process(3, 3.25), process(4, 7.0)];
        let ranked = rank_by_memory_percent(procs, 3);
        let pids: Vec<u32> = ranked.iter().map(|p| p.pid).collect();
        assert_eq!(pids, vec![2, 4, 3]);
    }

    #[test]
    fn cmdline_keeps_three_words() {
        let prefix = cmdline_prefix(["/usr/bin/postgres", "-D", "/var/lib/pg", "-c", "x=y"]);
        assert_eq!(prefix, "/usr/bin/postgres -D /var/lib/pg");
    }

    #[test]
    fn memory_percent_rounds_and_guards_zero_total() {
        assert_eq!(memory_percent(1, 3), 33.33);
        assert_eq!(memory_percent(100, 0), 0.0);
    }
}
