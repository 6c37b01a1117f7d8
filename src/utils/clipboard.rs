use std::io::Write;
use std::process::{Command, Stdio};

/// Programs tried in order; the first that accepts the text wins.
#[cfg(target_os = "macos")]
const CLIPBOARD_COMMANDS: &[(&str, &[&str])] = &[("pbcopy", &[])];

#[cfg(target_os = "windows")]
const CLIPBOARD_COMMANDS: &[(&str, &[&str])] = &[("cmd", &["/C", "clip"])];

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const CLIPBOARD_COMMANDS: &[(&str, &[&str])] = &[
    ("wl-copy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("xsel", &["--clipboard", "--input"]),
];

/// Put `text` on the system clipboard exactly as given.
pub fn copy_to_clipboard(text: &str) -> Result<(), String> {
    copy_with(CLIPBOARD_COMMANDS, text)
}

fn copy_with(commands: &[(&str, &[&str])], text: &str) -> Result<(), String> {
    let mut last_error = None;
    for (cmd, args) in commands {
        match run_with_stdin(cmd, args, text) {
            Ok(()) => return Ok(()),
            Err(err) => last_error = Some(err),
        }
    }
    Err(last_error.unwrap_or_else(|| "No clipboard command configured".to_string()))
}

fn run_with_stdin(cmd: &str, args: &[&str], input: &str) -> Result<(), String> {
    let mut child = Command::new(cmd)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|_| format!("Clipboard command `{cmd}` not available"))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(input.as_bytes())
            .map_err(|err| format!("Clipboard command `{cmd}` rejected input: {err}"))?;
    }
    match child.wait() {
        Ok(status) if status.success() => Ok(()),
        _ => Err(format!("Clipboard command `{cmd}` failed")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_last_failure_when_nothing_works() {
        let missing: &[(&str, &[&str])] = &[("cardchat-no-such-clipboard", &[])];
        let err = copy_with(missing, "x").expect_err("fails");
        assert!(err.contains("cardchat-no-such-clipboard"));
        assert!(copy_with(&[], "x").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn falls_through_to_a_working_command() {
        let commands: &[(&str, &[&str])] = &[
            ("cardchat-no-such-clipboard", &[]),
            ("sh", &["-c", "cat >/dev/null"]),
        ];
        assert_eq!(copy_with(commands, "print(1)\n"), Ok(()));
    }
}
