//! Privileged command construction for the device shell.

use crate::core::types::PrivilegeMethod;

/// Harmless command used to test whether a method really grants root.
pub const CAPABILITY_PROBE: &str = "id -u";

/// Quote `arg` for a POSIX shell using single quotes.
pub fn shell_quote(arg: &str) -> String {
    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('\'');
    for ch in arg.chars() {
        if ch == '\'' {
            quoted.push_str("'\\''");
        } else {
            quoted.push(ch);
        }
    }
    quoted.push('\'');
    quoted
}

/// Wrap `command` so it runs as root through `method`.
///
/// Returns `None` for [`PrivilegeMethod::None`]: there is no way to run it privileged.
pub fn wrap_command(method: PrivilegeMethod, command: &str) -> Option<String> {
    let wrapped = match method {
        PrivilegeMethod::Su => format!("su -c {}", shell_quote(command)),
        PrivilegeMethod::Sudo => format!("sudo sh -c {}", shell_quote(command)),
        PrivilegeMethod::Rootshell => format!("rootshell -c {}", shell_quote(command)),
        PrivilegeMethod::AlreadyRoot => command.to_string(),
        PrivilegeMethod::None => return None,
    };
    Some(wrapped)
}

/// True when the capability probe printed uid 0.
///
/// Some `su` builds print a banner before the command output, so only the last
/// non-empty line counts.
pub fn reports_root_uid(stdout: &str) -> bool {
    stdout
        .lines()
        .map(str::trim)
        .rfind(|line| !line.is_empty())
        .is_some_and(|line| line == "0")
}
