//! Runs embedded `PostgreSQL` lifecycle steps on behalf of the integration
//! tests when they execute as root.
//!
//! ```text
//! pg_worker <setup|start|stop> <payload.json>
//! ```
//!
//! The payload is a serialized [`WorkerPayload`]: `PostgreSQL` settings plus
//! environment overrides. `PostgreSQL` refuses to run as root, so the worker
//! re-executes itself as `nobody` before touching the cluster.

/// Boxed error type for the main result.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[cfg(unix)]
fn main() -> Result<(), BoxError> {
    unix::run().map_err(Into::into)
}

#[cfg(not(unix))]
fn main() -> Result<(), BoxError> {
    Err("pg_worker only runs on Unix platforms".into())
}

#[cfg(unix)]
mod unix {
    use super::BoxError;
    use camino::{Utf8Path, Utf8PathBuf};
    use nix::unistd::{Uid, User, initgroups, setgid, setuid};
    use pg_embedded_setup_unpriv::ambient_dir_and_path;
    use pg_embedded_setup_unpriv::worker::{PlainSecret, WorkerPayload};
    use postgresql_embedded::{PostgreSQL, Status};
    use std::env;
    use std::ffi::CString;
    use std::io::{self, Read};
    use std::process::{Command, ExitStatus};
    use tasktree::worker::shell_escape;
    use thiserror::Error;
    use tokio::runtime::Builder;

    const REEXEC_MARKER: &str = "TASKTREE_PG_WORKER_REEXEC";
    const SAFE_PATH: &str = "/usr/sbin:/usr/bin:/sbin:/bin";
    const UNPRIVILEGED_USER: &str = "nobody";

    #[derive(Debug, Error)]
    pub(super) enum WorkerFailure {
        #[error("invalid arguments: {0}")]
        Arguments(String),
        #[error("cannot read payload: {0}")]
        PayloadRead(#[source] BoxError),
        #[error("cannot parse payload: {0}")]
        PayloadParse(#[source] serde_json::Error),
        #[error("invalid settings: {0}")]
        Settings(String),
        #[error("cannot build runtime: {0}")]
        Runtime(#[source] io::Error),
        #[error("cannot drop privileges: {0}")]
        Privileges(String),
        #[error("postgres {step} failed: {message}")]
        Postgres { step: &'static str, message: String },
    }

    #[derive(Debug, Clone, Copy)]
    enum Step {
        Setup,
        Start,
        Stop,
    }

    impl Step {
        fn parse(raw: &str) -> Result<Self, WorkerFailure> {
            match raw {
                "setup" => Ok(Self::Setup),
                "start" => Ok(Self::Start),
                "stop" => Ok(Self::Stop),
                other => Err(WorkerFailure::Arguments(format!(
                    "unknown step '{other}', expected setup, start, or stop"
                ))),
            }
        }

        const fn name(self) -> &'static str {
            match self {
                Self::Setup => "setup",
                Self::Start => "start",
                Self::Stop => "stop",
            }
        }
    }

    pub(super) fn run() -> Result<(), WorkerFailure> {
        let args = utf8_args()?;
        reexec_unprivileged(&args)?;
        let (step, payload_path) = parse_args(&args)?;
        let payload = load_payload(&payload_path)?;
        drop_privileges()?;
        let settings = payload
            .settings
            .into_settings()
            .map_err(|err| WorkerFailure::Settings(err.to_string()))?;

        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(WorkerFailure::Runtime)?;
        apply_environment(&payload.environment);
        let mut postgres = PostgreSQL::new(settings);
        runtime.block_on(async {
            match step {
                Step::Setup => {
                    postgres
                        .setup()
                        .await
                        .map_err(|err| postgres_failure(step, &err))?;
                    start_if_stopped(&mut postgres, step).await
                }
                Step::Start => {
                    start_if_stopped(&mut postgres, step).await?;
                    // The server must outlive this process.
                    std::mem::forget(postgres);
                    Ok(())
                }
                Step::Stop => postgres
                    .stop()
                    .await
                    .map_err(|err| postgres_failure(step, &err)),
            }
        })
    }

    fn utf8_args() -> Result<Vec<Utf8PathBuf>, WorkerFailure> {
        env::args_os()
            .map(|arg| {
                arg.into_string()
                    .map(Utf8PathBuf::from)
                    .map_err(|_| WorkerFailure::Arguments("argument is not valid UTF-8".into()))
            })
            .collect()
    }

    fn parse_args(args: &[Utf8PathBuf]) -> Result<(Step, Utf8PathBuf), WorkerFailure> {
        match args {
            [_, step, payload] => Ok((Step::parse(step.as_str())?, payload.clone())),
            [_, _, _, extra, ..] => Err(WorkerFailure::Arguments(format!(
                "unexpected extra argument: {extra}"
            ))),
            _ => Err(WorkerFailure::Arguments(
                "usage: pg_worker <setup|start|stop> <payload.json>".into(),
            )),
        }
    }

    /// Replaces the current process with a copy running as `nobody` when
    /// started as root.
    fn reexec_unprivileged(args: &[Utf8PathBuf]) -> Result<(), WorkerFailure> {
        if !Uid::effective().is_root() || env::var_os(REEXEC_MARKER).is_some() {
            return Ok(());
        }

        let exe = env::current_exe()
            .map_err(WorkerFailure::Runtime)?
            .into_os_string()
            .into_string()
            .map(Utf8PathBuf::from)
            .map_err(|_| {
                WorkerFailure::Runtime(io::Error::other("executable path is not valid UTF-8"))
            })?;
        let forwarded = args.get(1..).unwrap_or_default();
        let status = match Command::new("runuser")
            .args(["-u", UNPRIVILEGED_USER, "--"])
            .arg(exe.as_std_path())
            .args(forwarded.iter().map(|arg| arg.as_std_path()))
            .env(REEXEC_MARKER, "1")
            .env("PATH", SAFE_PATH)
            .status()
        {
            Ok(status) => status,
            Err(err) if err.kind() == io::ErrorKind::NotFound => reexec_via_su(&exe, forwarded)?,
            Err(err) => return Err(WorkerFailure::Privileges(err.to_string())),
        };
        std::process::exit(status.code().unwrap_or(1));
    }

    fn reexec_via_su(exe: &Utf8Path, forwarded: &[Utf8PathBuf]) -> Result<ExitStatus, WorkerFailure> {
        let command = std::iter::once(shell_escape(exe.as_str()))
            .chain(forwarded.iter().map(|arg| shell_escape(arg.as_str())))
            .collect::<Vec<_>>()
            .join(" ");
        Command::new("/bin/su")
            .args(["-s", "/bin/sh", UNPRIVILEGED_USER, "-c"])
            .arg(format!("{REEXEC_MARKER}=1 exec {command}"))
            .env("PATH", SAFE_PATH)
            .status()
            .map_err(|err| WorkerFailure::Privileges(err.to_string()))
    }

    fn load_payload(path: &Utf8Path) -> Result<WorkerPayload, WorkerFailure> {
        let bytes = read_file(path).map_err(WorkerFailure::PayloadRead)?;
        serde_json::from_slice(&bytes).map_err(WorkerFailure::PayloadParse)
    }

    fn read_file(path: &Utf8Path) -> Result<Vec<u8>, BoxError> {
        let (dir, relative) = ambient_dir_and_path(path)?;
        let mut bytes = Vec::new();
        dir.open(relative.as_std_path())?.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    fn drop_privileges() -> Result<(), WorkerFailure> {
        if !Uid::effective().is_root() {
            return Ok(());
        }
        let privileges = |err: nix::Error| WorkerFailure::Privileges(err.to_string());
        let user = User::from_name(UNPRIVILEGED_USER)
            .map_err(privileges)?
            .ok_or_else(|| {
                WorkerFailure::Privileges(format!("user '{UNPRIVILEGED_USER}' not found"))
            })?;
        let user_name = CString::new(user.name.clone())
            .map_err(|err| WorkerFailure::Privileges(err.to_string()))?;
        initgroups(&user_name, user.gid).map_err(privileges)?;
        setgid(user.gid).map_err(privileges)?;
        setuid(user.uid).map_err(privileges)?;

        // SAFETY: no other thread exists yet; the runtime is built afterwards.
        unsafe {
            env::set_var("HOME", &user.dir);
            env::set_var("USER", &user.name);
            env::set_var("LOGNAME", &user.name);
        }
        Ok(())
    }

    fn apply_environment(environment: &[(String, Option<PlainSecret>)]) {
        for (key, value) in environment {
            // SAFETY: the current-thread runtime has not started any task, so
            // nothing reads the environment concurrently.
            unsafe {
                match value {
                    Some(secret) => env::set_var(key, secret.expose()),
                    None => env::remove_var(key),
                }
            }
        }
    }

    async fn start_if_stopped(postgres: &mut PostgreSQL, step: Step) -> Result<(), WorkerFailure> {
        if matches!(postgres.status(), Status::Started) {
            return Ok(());
        }
        postgres
            .start()
            .await
            .map_err(|err| postgres_failure(step, &err))
    }

    fn postgres_failure(step: Step, err: &impl std::fmt::Display) -> WorkerFailure {
        WorkerFailure::Postgres {
            step: step.name(),
            message: err.to_string(),
        }
    }
}
