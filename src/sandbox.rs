//! Post-init process hardening: resource-limit hygiene via `prctl`, a
//! filesystem access allow-list via landlock, and a syscall allow-list via
//! seccomp-bpf. All three are applied once, after the gamma dispatcher and
//! PID file are already in place, and are irreversible for the life of the
//! process — exactly the posture the steady-state loop needs and nothing
//! more.

use std::path::Path;

use landlock::{
    ABI, Access, AccessFs, PathBeneath, PathFd, Ruleset, RulesetAttr, RulesetCreatedAttr,
    RulesetError,
};
use seccompiler::{BpfProgram, SeccompAction, SeccompFilter, SeccompRule};
use std::collections::BTreeMap;

use crate::error::AbraxasError;

/// `PR_SET_TIMERSLACK`, `PR_SET_NO_NEW_PRIVS`, `PR_SET_DUMPABLE` aren't
/// wrapped by `nix`; they're plain `prctl(2)` calls against well-known
/// integer constants, same spirit as the raw DRM ioctls in
/// [`crate::backend::drm`].
pub fn harden_process() -> Result<(), AbraxasError> {
    unsafe {
        // 1ns slack: trade a little power efficiency for precise tick timing.
        if libc::prctl(libc::PR_SET_TIMERSLACK, 1, 0, 0, 0) != 0 {
            return Err(AbraxasError::BackendInit("PR_SET_TIMERSLACK failed".into()));
        }
        if libc::prctl(libc::PR_SET_NO_NEW_PRIVS, 1, 0, 0, 0) != 0 {
            return Err(AbraxasError::BackendInit("PR_SET_NO_NEW_PRIVS failed".into()));
        }
        if libc::prctl(libc::PR_SET_DUMPABLE, 0, 0, 0, 0) != 0 {
            return Err(AbraxasError::BackendInit("PR_SET_DUMPABLE failed".into()));
        }
    }
    Ok(())
}

/// Restrict filesystem access to exactly what the steady-state loop and the
/// weather fetcher's child process need. Read-only everywhere except the
/// config directory and `/tmp`, where the daemon may also create/remove
/// regular files and directories.
pub fn install_filesystem_sandbox(config_dir: &Path) -> Result<(), AbraxasError> {
    let abi = ABI::V3;
    let read_only = AccessFs::from_read(abi);
    let read_write = AccessFs::from_read(abi) | AccessFs::from_write(abi);
    let read_execute = AccessFs::from_read(abi) | AccessFs::Execute;

    let ruleset = Ruleset::default()
        .handle_access(AccessFs::from_all(abi))
        .map_err(landlock_err)?
        .create()
        .map_err(landlock_err)?;

    let mut rules = Vec::new();
    for dir in [config_dir, Path::new("/tmp")] {
        if let Ok(fd) = PathFd::new(dir) {
            rules.push(PathBeneath::new(fd, read_write));
        }
    }
    for dir in ["/dev", "/proc", "/etc", "/lib", "/lib64"] {
        if let Ok(fd) = PathFd::new(dir) {
            rules.push(PathBeneath::new(fd, read_only));
        }
    }
    if let Ok(fd) = PathFd::new("/usr") {
        rules.push(PathBeneath::new(fd, read_execute));
    }

    ruleset
        .add_rules(rules.into_iter().map(Ok))
        .map_err(landlock_err)?
        .restrict_self()
        .map_err(landlock_err)?;

    Ok(())
}

fn landlock_err(e: RulesetError) -> AbraxasError {
    AbraxasError::BackendInit(format!("landlock: {e}"))
}

/// Allow exactly the syscalls the steady-state loop and the weather child's
/// spawn/reap path use; anything else kills the process. `SeccompAction::KillProcess`
/// rather than `KillThread` since this daemon is single-threaded and a
/// violation means something has already gone badly wrong.
pub fn install_syscall_filter() -> Result<(), AbraxasError> {
    let allowed: &[i64] = &[
        libc::SYS_read,
        libc::SYS_write,
        libc::SYS_close,
        libc::SYS_openat,
        libc::SYS_fstat,
        libc::SYS_newfstatat,
        libc::SYS_lseek,
        libc::SYS_unlink,
        libc::SYS_unlinkat,
        libc::SYS_rename,
        libc::SYS_renameat,
        libc::SYS_renameat2,
        libc::SYS_mkdir,
        libc::SYS_mkdirat,
        libc::SYS_ftruncate,
        libc::SYS_fcntl,
        libc::SYS_ppoll,
        libc::SYS_poll,
        libc::SYS_inotify_add_watch,
        libc::SYS_signalfd4,
        libc::SYS_rt_sigprocmask,
        libc::SYS_rt_sigreturn,
        libc::SYS_ioctl,
        libc::SYS_mmap,
        libc::SYS_munmap,
        libc::SYS_mprotect,
        libc::SYS_brk,
        libc::SYS_clone,
        libc::SYS_clone3,
        libc::SYS_execve,
        libc::SYS_wait4,
        libc::SYS_kill,
        libc::SYS_exit,
        libc::SYS_exit_group,
        libc::SYS_getpid,
        libc::SYS_getrandom,
        libc::SYS_pipe2,
        libc::SYS_dup2,
        libc::SYS_dup3,
        libc::SYS_memfd_create,
        libc::SYS_connect,
        libc::SYS_socket,
        libc::SYS_sendto,
        libc::SYS_recvfrom,
        libc::SYS_getsockopt,
        libc::SYS_setsockopt,
        libc::SYS_clock_gettime,
        libc::SYS_clock_nanosleep,
        libc::SYS_nanosleep,
        libc::SYS_futex,
        libc::SYS_prctl,
        libc::SYS_sched_yield,
        libc::SYS_statx,
    ];

    let mut rules: BTreeMap<i64, Vec<SeccompRule>> = BTreeMap::new();
    for &nr in allowed {
        rules.insert(nr, vec![]);
    }

    let filter = SeccompFilter::new(
        rules,
        SeccompAction::KillProcess,
        SeccompAction::Allow,
        std::env::consts::ARCH.try_into().map_err(|_| AbraxasError::BackendInit("unsupported arch".into()))?,
    )
    .map_err(|e| AbraxasError::BackendInit(format!("seccomp filter: {e}")))?;

    let program: BpfProgram = filter
        .try_into()
        .map_err(|e| AbraxasError::BackendInit(format!("seccomp compile: {e}")))?;

    seccompiler::apply_filter(&program).map_err(|e| AbraxasError::BackendInit(format!("seccomp apply: {e}")))?;

    Ok(())
}
