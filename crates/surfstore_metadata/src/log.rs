#[cfg(test)]
#[path = "log_test.rs"]
mod log_test;

// The replicated log (spec.md §3, "LogEntry"): an append-only sequence of
// (cmd, filename, version, blocklist) tuples, identical on every replica
// that is caught up with the leader.

use surfstore_proto::surfstore::Log;

/// `"mod"` or `"del"`, matching the on-wire `cmd` field exactly
/// (spec.md §3: "LogEntry: a tuple {cmd in {"mod","del"}, ...}").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmd {
    Mod,
    Del,
}

impl Cmd {
    pub fn as_str(self) -> &'static str {
        match self {
            Cmd::Mod => "mod",
            Cmd::Del => "del",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub cmd: Cmd,
    pub filename: String,
    pub version: u32,
    pub blocklist: Vec<String>,
}

impl LogEntry {
    pub fn modify(filename: String, version: u32, blocklist: Vec<String>) -> Self {
        Self { cmd: Cmd::Mod, filename, version, blocklist }
    }

    pub fn delete(filename: String, version: u32) -> Self {
        Self {
            cmd: Cmd::Del,
            filename,
            version,
            blocklist: vec![crate::file_table::DELETED_SENTINEL.to_string()],
        }
    }

    pub fn to_proto(&self) -> Log {
        Log {
            cmd: self.cmd.as_str().to_string(),
            filename: self.filename.clone(),
            version: self.version as i32,
            blocklist: self.blocklist.clone(),
        }
    }

    /// Parses a `Log` received over the wire. A follower trusts the leader
    /// (spec.md §4.5): an unrecognised `cmd` is a protocol violation, not a
    /// value this function tries to repair.
    pub fn from_proto(log: Log) -> Result<Self, String> {
        let cmd = match log.cmd.as_str() {
            "mod" => Cmd::Mod,
            "del" => Cmd::Del,
            other => return Err(format!("unrecognised log cmd {other:?}")),
        };
        Ok(Self { cmd, filename: log.filename, version: log.version as u32, blocklist: log.blocklist })
    }
}
