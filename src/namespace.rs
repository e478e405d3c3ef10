//! Namespace targets for spawned commands.
//!
//! Each namespace kind either stays with the daemon (`0`) or is taken from
//! `/proc/<pid>/...` of another process. Attachment is delegated to
//! `nsenter`, which enters the namespaces before exec'ing the command.

use serde::{Deserialize, Serialize};
use std::ffi::OsString;

/// Which process's namespaces a command runs in, per namespace kind.
///
/// A value of `0` means "the daemon's own".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "TargetRepr")]
pub struct NamespaceTarget {
    /// `/proc/<pid>/ns/mnt`
    pub mount: u32,
    /// `/proc/<pid>/ns/uts`
    pub uts: u32,
    /// `/proc/<pid>/ns/ipc`
    pub ipc: u32,
    /// `/proc/<pid>/ns/net`
    pub net: u32,
    /// `/proc/<pid>/ns/pid`
    pub pid: u32,
    /// `/proc/<pid>/root`
    pub root: u32,
    /// `/proc/<pid>/cwd`
    pub cwd: u32,
}

impl NamespaceTarget {
    /// Stay in the daemon's own namespaces.
    pub const SELF: Self = Self {
        mount: 0,
        uts: 0,
        ipc: 0,
        net: 0,
        pid: 0,
        root: 0,
        cwd: 0,
    };

    /// Attach everything to PID 1, i.e. the host when the daemon runs in a
    /// container with `hostPID`.
    pub const INIT: Self = Self::all(1);

    /// Attach every kind to `pid`.
    pub const fn all(pid: u32) -> Self {
        Self {
            mount: pid,
            uts: pid,
            ipc: pid,
            net: pid,
            pid,
            root: pid,
            cwd: pid,
        }
    }

    /// True when no namespace kind leaves the daemon.
    pub fn is_self(&self) -> bool {
        *self == Self::SELF
    }

    /// `nsenter` options for this target, ending with `--`.
    ///
    /// Entering a PID namespace makes `nsenter` fork, so the command runs as
    /// its child. `--kill-child` ties the command's lifetime to `nsenter`'s:
    /// killing `nsenter` kills the command too.
    pub fn nsenter_args(&self) -> Vec<OsString> {
        let entries = [
            ("mount", self.mount, "ns/mnt"),
            ("uts", self.uts, "ns/uts"),
            ("ipc", self.ipc, "ns/ipc"),
            ("net", self.net, "ns/net"),
            ("pid", self.pid, "ns/pid"),
            ("root", self.root, "root"),
            ("wd", self.cwd, "cwd"),
        ];

        let mut args: Vec<_> = entries
            .iter()
            .map(|(option, pid, path)| {
                let owner = match *pid {
                    0 => "self".to_string(),
                    pid => pid.to_string(),
                };
                OsString::from(format!("--{option}=/proc/{owner}/{path}"))
            })
            .collect();
        args.push("--kill-child".into());
        args.push("--".into());
        args
    }
}

/// Policy files may name a target (`init`, `self`) or spell out pids.
#[derive(Deserialize)]
#[serde(untagged)]
enum TargetRepr {
    Named(NamedTarget),
    Explicit(ExplicitTarget),
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum NamedTarget {
    Init,
    #[serde(rename = "self")]
    Own,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ExplicitTarget {
    #[serde(default)]
    mount: u32,
    #[serde(default)]
    uts: u32,
    #[serde(default)]
    ipc: u32,
    #[serde(default)]
    net: u32,
    #[serde(default)]
    pid: u32,
    #[serde(default)]
    root: u32,
    #[serde(default)]
    cwd: u32,
}

impl From<TargetRepr> for NamespaceTarget {
    fn from(repr: TargetRepr) -> Self {
        match repr {
            TargetRepr::Named(NamedTarget::Init) => NamespaceTarget::INIT,
            TargetRepr::Named(NamedTarget::Own) => NamespaceTarget::SELF,
            TargetRepr::Explicit(t) => NamespaceTarget {
                mount: t.mount,
                uts: t.uts,
                ipc: t.ipc,
                net: t.net,
                pid: t.pid,
                root: t.root,
                cwd: t.cwd,
            },
        }
    }
}
