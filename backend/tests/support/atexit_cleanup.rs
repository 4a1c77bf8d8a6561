//! Shared embedded PostgreSQL cluster with process-exit shutdown.
//!
//! `pg-embed-setup-unpriv` leaks the shared cluster guard so the server lives
//! as long as the test process. Under `nextest` every test binary is its own
//! process and a postmaster left running blocks the next binary from booting
//! on the same data directory. [`shared_cluster_handle`] therefore registers a
//! `libc::atexit` hook that stops the postmaster when the binary exits.

#[cfg(unix)]
use std::ffi::CString;
#[cfg(unix)]
use std::os::unix::ffi::OsStrExt;
#[cfg(unix)]
use std::path::{Path, PathBuf};
#[cfg(unix)]
use std::sync::OnceLock;
#[cfg(unix)]
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

#[cfg(unix)]
use color_eyre::eyre::eyre;
#[cfg(unix)]
use pg_embedded_setup_unpriv::BootstrapError;
use pg_embedded_setup_unpriv::{BootstrapResult, ClusterHandle};

const BOOT_ATTEMPTS: usize = 5;
const BOOT_RETRY_DELAY: Duration = Duration::from_millis(500);
const STABLE_PASSWORD: &str = "fleet_embedded_test";
#[cfg(unix)]
const PROCESS_LOCK_FILE: &str = "fleet-pg-embedded-shared-cluster.lock";
#[cfg(unix)]
const SHUTDOWN_POLLS: usize = 50;
#[cfg(unix)]
const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[cfg(unix)]
static POSTMASTER_PID: AtomicI32 = AtomicI32::new(0);
#[cfg(unix)]
static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();
#[cfg(unix)]
static PROCESS_LOCK_FD: OnceLock<i32> = OnceLock::new();

/// Serialise cluster bootstrap across test processes with an `flock`.
#[cfg(unix)]
fn acquire_process_lock() -> BootstrapResult<()> {
    if PROCESS_LOCK_FD.get().is_some() {
        return Ok(());
    }

    let path = std::env::temp_dir().join(PROCESS_LOCK_FILE);
    let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|error| {
        BootstrapError::from(eyre!("encode lock path '{}': {error}", path.display()))
    })?;

    // SAFETY: `c_path` is NUL-terminated and outlives the call.
    let fd = unsafe { libc::open(c_path.as_ptr(), libc::O_CREAT | libc::O_RDWR, 0o600) };
    if fd < 0 {
        let error = std::io::Error::last_os_error();
        return Err(BootstrapError::from(eyre!(
            "open lock file '{}': {error}",
            path.display()
        )));
    }

    // SAFETY: `fd` was returned by `open` above.
    if unsafe { libc::flock(fd, libc::LOCK_EX) } != 0 {
        let error = std::io::Error::last_os_error();
        // SAFETY: `fd` is open and owned here.
        unsafe {
            libc::close(fd);
        }
        return Err(BootstrapError::from(eyre!(
            "lock '{}': {error}",
            path.display()
        )));
    }

    if PROCESS_LOCK_FD.set(fd).is_err() {
        // SAFETY: another caller stored its descriptor first; this one is ours.
        unsafe {
            libc::close(fd);
        }
    }
    Ok(())
}

/// Shared cluster for this test binary, stopped again at process exit.
///
/// ```rust,ignore
/// let cluster = shared_cluster_handle().expect("embedded cluster");
/// let database = provision_template_database(cluster).expect("database");
/// ```
pub fn shared_cluster_handle() -> BootstrapResult<&'static ClusterHandle> {
    ensure_stable_password();
    #[cfg(unix)]
    acquire_process_lock()?;

    let mut attempt = 1;
    loop {
        match pg_embedded_setup_unpriv::test_support::shared_cluster_handle() {
            Ok(handle) => {
                #[cfg(unix)]
                register_exit_hook(handle);
                return Ok(handle);
            }
            Err(error) if attempt >= BOOT_ATTEMPTS => return Err(error),
            Err(_) => {
                std::thread::sleep(BOOT_RETRY_DELAY);
                attempt += 1;
            }
        }
    }
}

/// Pin `PG_PASSWORD` so a data directory initialised by an earlier process
/// still accepts this one.
fn ensure_stable_password() {
    if std::env::var_os("PG_PASSWORD").is_none() {
        // SAFETY: runs before the cluster library spawns threads and at most
        // once per process behind the shared cluster mutex.
        unsafe {
            std::env::set_var("PG_PASSWORD", STABLE_PASSWORD);
        }
    }
}

#[cfg(unix)]
fn read_postmaster_pid(data_dir: &Path) -> Option<i32> {
    let dir = cap_std::fs::Dir::open_ambient_dir(data_dir, cap_std::ambient_authority()).ok()?;
    let content = dir.read_to_string("postmaster.pid").ok()?;
    content.lines().next()?.trim().parse().ok()
}

/// `atexit` hook: SIGTERM the postmaster, escalating to SIGKILL.
///
/// Signals only while `postmaster.pid` still names the recorded process.
#[cfg(unix)]
extern "C" fn stop_postmaster() {
    let recorded = POSTMASTER_PID.load(Ordering::Relaxed);
    if recorded <= 0 {
        return;
    }
    let current = DATA_DIR.get().and_then(|dir| read_postmaster_pid(dir));
    if current != Some(recorded) {
        return;
    }

    // SAFETY: `recorded` matches the live `postmaster.pid`.
    if unsafe { libc::kill(recorded, libc::SIGTERM) } != 0 {
        return;
    }
    for _ in 0..SHUTDOWN_POLLS {
        std::thread::sleep(SHUTDOWN_POLL_INTERVAL);
        // SAFETY: signal 0 only probes for existence.
        if unsafe { libc::kill(recorded, 0) } != 0 {
            return;
        }
    }
    // SAFETY: same process as above; graceful shutdown timed out.
    unsafe {
        libc::kill(recorded, libc::SIGKILL);
    }
}

#[cfg(unix)]
fn register_exit_hook(handle: &ClusterHandle) {
    let data_dir = &handle.settings().data_dir;
    let Some(pid) = read_postmaster_pid(data_dir) else {
        return;
    };
    if POSTMASTER_PID
        .compare_exchange(0, pid, Ordering::Relaxed, Ordering::Relaxed)
        .is_err()
    {
        return;
    }
    let _ = DATA_DIR.set(data_dir.clone());

    // SAFETY: `stop_postmaster` is a plain `extern "C"` fn with no arguments.
    let rc = unsafe { libc::atexit(stop_postmaster) };
    if rc != 0 {
        eprintln!("pg-embed: atexit registration failed (rc={rc}); postmaster {pid} may linger");
    }
}

#[cfg(test)]
mod tests {
    #[cfg(unix)]
    fn write_pid_file(dir: &std::path::Path, content: &str) {
        let dir = cap_std::fs::Dir::open_ambient_dir(dir, cap_std::ambient_authority())
            .expect("open dir");
        dir.write("postmaster.pid", content).expect("write pid file");
    }

    #[cfg(unix)]
    #[test]
    fn pid_is_read_from_the_first_line() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_pid_file(dir.path(), "4242\n/var/lib/pg\n5432\n");
        assert_eq!(super::read_postmaster_pid(dir.path()), Some(4242));
    }

    #[cfg(unix)]
    #[test]
    fn missing_or_garbled_pid_files_yield_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(super::read_postmaster_pid(dir.path()), None);
        write_pid_file(dir.path(), "postmaster\n");
        assert_eq!(super::read_postmaster_pid(dir.path()), None);
    }

    #[test]
    fn existing_password_is_kept() {
        let _guard = env_lock::lock_env([("PG_PASSWORD", Some("operator_choice"))]);
        super::ensure_stable_password();
        assert_eq!(
            std::env::var("PG_PASSWORD").expect("PG_PASSWORD set"),
            "operator_choice"
        );
    }
}
