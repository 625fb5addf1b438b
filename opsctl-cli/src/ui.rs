//! Progress feedback for long-running opsctl commands
//!
//! Spinners are suppressed when:
//! - `--quiet` flag is passed
//! - `OPSCTL_QUIET=1` environment variable is set
//! - stderr is not a TTY (CI jobs, piped output)

use std::io::IsTerminal;
use std::sync::OnceLock;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

static QUIET_MODE: OnceLock<bool> = OnceLock::new();

fn quiet_from(flag: bool, env_value: Option<&str>, stderr_is_tty: bool) -> bool {
    flag || env_value == Some("1") || !stderr_is_tty
}

/// Call once at startup with the --quiet flag value
pub fn init_quiet_mode(quiet_flag: bool) {
    let env_value = std::env::var("OPSCTL_QUIET").ok();
    let is_quiet = quiet_from(
        quiet_flag,
        env_value.as_deref(),
        std::io::stderr().is_terminal(),
    );

    QUIET_MODE.set(is_quiet).ok();
}

pub fn is_quiet() -> bool {
    *QUIET_MODE.get().unwrap_or(&false)
}

/// How a spinner line ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Finish {
    Done,
    Failed,
}

impl Finish {
    fn line(self, msg: &str) -> String {
        let glyph = match self {
            Finish::Done => '✓',
            Finish::Failed => '✗',
        };
        format!("{} {}", glyph, msg)
    }
}

fn spinner(msg: &str) -> Option<ProgressBar> {
    if is_quiet() {
        return None;
    }

    let pb = ProgressBar::new_spinner()
        .with_style(ProgressStyle::with_template("{spinner:.cyan} {msg}").ok()?)
        .with_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

fn finish(pb: Option<ProgressBar>, how: Finish, msg: &str) {
    let Some(pb) = pb else { return };
    if let Ok(style) = ProgressStyle::with_template("{msg}") {
        pb.set_style(style);
    }
    pb.finish_with_message(how.line(msg));
}

/// Run a future under a spinner, finishing with `done_msg` or the error text
pub async fn with_spinner_async<T, E: std::fmt::Display>(
    msg: impl Into<String>,
    done_msg: impl Into<String>,
    f: impl std::future::Future<Output = Result<T, E>>,
) -> Result<T, E> {
    let msg = msg.into();
    let pb = spinner(&msg);

    let result = f.await;
    match &result {
        Ok(_) => finish(pb, Finish::Done, &done_msg.into()),
        Err(e) => finish(pb, Finish::Failed, &format!("{}: {}", msg, e)),
    }
    result
}
