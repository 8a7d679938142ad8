//! Small process-output helper, merging stdout/stderr into one
//! diagnostic blob at the one call site this core actually needs.

use std::process::Output;

/// Merges a completed child's stdout and stderr into one diagnostic
/// blob and extracts its exit code.
pub fn command_output(output: Output) -> (i32, String) {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.is_empty() {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(&stderr);
    }
    let exit_code = output.status.code().unwrap_or(-1);
    (exit_code, text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;

    #[test]
    fn merges_stdout_and_stderr() {
        let output = Command::new("sh")
            .args(["-c", "echo out; echo err 1>&2"])
            .output()
            .unwrap();
        let (code, text) = command_output(output);
        assert_eq!(code, 0);
        assert!(text.contains("out"));
        assert!(text.contains("err"));
    }
}
