//! Parsers for the output of `df`, `ls`, `ipcs` and `dmesg`.

use super::snapshot::{PosixShmEntry, SysvSegment, TmpfsMount};

/// `df -h -t tmpfs`: header line, then one mount per line.
pub fn parse_df_tmpfs(output: &str) -> Vec<TmpfsMount> {
    output
        .lines()
        .skip(1)
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 6 {
                return None;
            }
            Some(TmpfsMount {
                filesystem: parts[0].to_string(),
                size: parts[1].to_string(),
                used: parts[2].to_string(),
                available: parts[3].to_string(),
                use_percent: parts[4].to_string(),
                mountpoint: parts[5..].join(" "),
            })
        })
        .collect()
}

/// `ls -la /dev/shm/`: skips the `total` line and the `.`/`..` entries.
pub fn parse_ls_shm(output: &str) -> Vec<PosixShmEntry> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty() && !line.starts_with("total"))
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 9 {
                return None;
            }
            let name = parts[8..].join(" ");
            if name == "." || name == ".." {
                return None;
            }
            Some(PosixShmEntry {
                name,
                size_bytes: parts[4].parse().unwrap_or(0),
                permissions: parts[0].to_string(),
                owner: parts[2].to_string(),
            })
        })
        .collect()
}

/// `ipcs -m`. Columns are located by the header row, so both the util-linux
/// layout (with a leading `key` column) and narrower variants parse.
pub fn parse_ipcs(output: &str) -> Vec<SysvSegment> {
    let mut columns: Option<Vec<String>> = None;
    let mut segments = Vec::new();

    for line in output.lines() {
        let lower = line.to_lowercase();
        if lower.contains("shmid") && lower.contains("owner") {
            columns = Some(lower.split_whitespace().map(str::to_string).collect());
            continue;
        }
        let Some(columns) = columns.as_ref() else {
            continue;
        };
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 5 {
            continue;
        }
        let get = |name: &str| -> &str {
            columns
                .iter()
                .position(|c| c == name)
                .and_then(|idx| parts.get(idx).copied())
                .unwrap_or("")
        };
        segments.push(SysvSegment {
            shmid: get("shmid").to_string(),
            owner: get("owner").to_string(),
            perms: get("perms").to_string(),
            bytes: get("bytes").parse().unwrap_or(0),
            attached: get("nattch").parse().unwrap_or(0),
            status: get("status").to_string(),
        });
    }
    segments
}

/// Kernel log lines that mention both `mlock` and `fail`, case-insensitively.
pub fn count_mlock_failures(dmesg: &str) -> usize {
    dmesg
        .lines()
        .map(str::to_lowercase)
        .filter(|line| line.contains("mlock") && line.contains("fail"))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn df_rows_become_mounts() {
        let out = "\
Filesystem      Size  Used Avail Use% Mounted on
tmpfs           3.2G  2.1M  3.2G   1% /run
tmpfs            16G  120M   16G   1% /dev/shm
";
        let mounts = parse_df_tmpfs(out);
        assert_eq!(mounts.len(), 2);
        assert_eq!(mounts[1].mountpoint, "/dev/shm");
        assert_eq!(mounts[1].used, "120M");
    }

    #[test]
    fn ls_skips_total_and_dot_entries() {
        let out = "\
total 8
drwxrwxrwt  2 root root     60 Oct 19 10:00 .
drwxr-xr-x 20 root root   4200 Oct 19 09:00 ..
-rw-------  1 pg   pg   1048576 Oct 19 10:00 PostgreSQL.1234
";
        let entries = parse_ls_shm(out);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "PostgreSQL.1234");
        assert_eq!(entries[0].size_bytes, 1048576);
        assert_eq!(entries[0].owner, "pg");
    }

    #[test]
    fn ipcs_uses_header_columns() {
        let out = "
------ Shared Memory Segments --------
key        shmid      owner      perms      bytes      nattch     status
0x00000000 32768      alice      600        524288     2          dest
0x51000abc 65537      postgres   600        56         6
";
        let segments = parse_ipcs(out);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].shmid, "32768");
        assert_eq!(segments[0].bytes, 524288);
        assert_eq!(segments[0].attached, 2);
        assert_eq!(segments[0].status, "dest");
        assert_eq!(segments[1].status, "");
    }

    #[test]
    fn mlock_failures_need_both_words() {
        let log = "\
[  1.0] mlock: Failed to lock pages
[  2.0] MLOCK FAIL in app
[  3.0] mlock ok
[  4.0] allocation failure
";
        assert_eq!(count_mlock_failures(log), 2);
    }
}
