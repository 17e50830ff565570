//! Reads back values `PostgreSQL` writes to disk during bootstrap.

use super::BoxError;
use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use postgresql_embedded::Settings;
use std::io::ErrorKind;
use std::path::Path;

/// Line of `postmaster.pid` that holds the listening port.
const PID_FILE_PORT_LINE: usize = 3;

/// Opens the directory holding `path` and returns it with the file name.
pub(super) fn open_parent_dir(path: &Utf8Path) -> Result<(Dir, &str), BoxError> {
    let file_name = path.file_name().ok_or_else(|| {
        Box::new(std::io::Error::other(format!("{path} has no file name"))) as BoxError
    })?;
    let parent = path.parent().unwrap_or_else(|| Utf8Path::new("."));
    let dir =
        Dir::open_ambient_dir(parent, ambient_authority()).map_err(|err| Box::new(err) as BoxError)?;
    Ok((dir, file_name))
}

/// Uses the generated password file, when present, as the connection
/// password.
pub(super) fn sync_password_from_file(settings: &mut Settings) -> Result<(), BoxError> {
    if let Some(contents) = read_optional(&settings.password_file)? {
        let password = contents.trim_end();
        if !password.is_empty() {
            password.clone_into(&mut settings.password);
        }
    }
    Ok(())
}

/// Uses the port the running server recorded in `postmaster.pid`.
pub(super) fn sync_port_from_pid(settings: &mut Settings) -> Result<(), BoxError> {
    let pid_file = settings.data_dir.join("postmaster.pid");
    let recorded = read_optional(&pid_file)?.and_then(|contents| {
        contents
            .lines()
            .nth(PID_FILE_PORT_LINE)
            .and_then(|line| line.trim().parse::<u16>().ok())
    });
    if let Some(port) = recorded {
        settings.port = port;
    }
    Ok(())
}

fn read_optional(path: &Path) -> Result<Option<String>, BoxError> {
    let lossy = path.to_string_lossy();
    let (dir, file_name) = open_parent_dir(Utf8Path::new(lossy.as_ref()))?;
    match dir.read_to_string(file_name) {
        Ok(contents) => Ok(Some(contents)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(Box::new(err) as BoxError),
    }
}
