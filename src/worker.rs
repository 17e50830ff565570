//! Shell quoting shared by the `pg_worker` binary and its test wrappers.

/// Quotes `value` as a single POSIX shell word.
///
/// The value is wrapped in single quotes and each embedded quote becomes
/// `'\''`.
#[must_use]
pub fn shell_escape(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for ch in value.chars() {
        match ch {
            '\'' => quoted.push_str("'\\''"),
            other => quoted.push(other),
        }
    }
    quoted.push('\'');
    quoted
}
