//! Subprocess Guest Runtime
//!
//! Runs a guest interpreter as a long-lived child process and talks to it over
//! a pair of pipes with a length-framed protocol:
//!
//! ```text
//! request:  <op> <name> <byte-length>\n<payload>      op: E (eval, name "-") | X (export)
//! response: <OK|ERR> <byte-length>\n<payload>
//! ```
//!
//! The interpreter reads requests from descriptor 3 and writes replies to
//! descriptor 4. Its stdin is `/dev/null` and its stdout goes to the server's
//! stderr, so guest code that prints, reads stdin or runs shell commands
//! cannot corrupt the protocol stream.
//!
//! The interpreter runs a small bootstrap program (embedded in this crate)
//! that implements the loop. The child is spawned lazily on first use. If it
//! dies, the failing call reports `RuntimeUnavailable` and the next call
//! spawns a fresh interpreter; guest state from the old one is gone.

use std::io::{self, BufRead, BufReader, PipeReader, PipeWriter, Write};
use std::process::{Child, Command, Stdio};

use polyeval_common::protocol::error::{PolyevalError, Result};
use tempfile::NamedTempFile;

use crate::runtime::guest::GuestRuntime;

const R_BOOTSTRAP: &str = include_str!("bootstrap/guest.R");
const RUBY_BOOTSTRAP: &str = include_str!("bootstrap/guest.rb");

/// Largest payload accepted in a single response frame (64 MB).
const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

/// Descriptor the guest reads requests from.
pub const REQUEST_FD: i32 = 3;

/// Descriptor the guest writes replies to.
pub const REPLY_FD: i32 = 4;

/// Frame operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eval,
    Export,
}

impl Op {
    fn code(self) -> &'static str {
        match self {
            Op::Eval => "E",
            Op::Export => "X",
        }
    }
}

/// Decoded response frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Ok(String),
    Err(String),
}

/// Interpreter commands for the subprocess-backed guests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestCommands {
    /// Command running an R script file (default `Rscript`)
    pub r_command: String,
    /// Command running a Ruby script file (default `ruby`)
    pub ruby_command: String,
}

impl Default for GuestCommands {
    fn default() -> Self {
        Self {
            r_command: "Rscript".to_string(),
            ruby_command: "ruby".to_string(),
        }
    }
}

/// Writes one request frame.
pub fn write_request<W: Write>(writer: &mut W, op: Op, name: &str, payload: &str) -> io::Result<()> {
    writeln!(writer, "{} {} {}", op.code(), name, payload.len())?;
    writer.write_all(payload.as_bytes())?;
    writer.flush()
}

/// Reads one response frame.
pub fn read_reply<R: BufRead>(reader: &mut R) -> io::Result<Reply> {
    let mut header = String::new();
    if reader.read_line(&mut header)? == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "guest closed its output"));
    }

    let (status, len) = header
        .trim_end()
        .split_once(' ')
        .ok_or_else(|| invalid_data(format!("malformed reply header: {:?}", header)))?;
    let len: usize = len
        .parse()
        .map_err(|_| invalid_data(format!("malformed reply length: {:?}", len)))?;
    if len > MAX_FRAME_SIZE {
        return Err(invalid_data(format!("reply of {} bytes exceeds limit", len)));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    let payload = String::from_utf8_lossy(&payload).into_owned();

    match status {
        "OK" => Ok(Reply::Ok(payload)),
        "ERR" => Ok(Reply::Err(payload)),
        other => Err(invalid_data(format!("unknown reply status: {:?}", other))),
    }
}

fn invalid_data(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

/// Installs the protocol pipes as the child's descriptors 3 and 4.
///
/// Runs between fork and exec, so it only makes raw system calls. Both ends
/// are first moved above the target range so neither `dup2` clobbers the other.
#[cfg(unix)]
fn install_protocol_fds(request: i32, reply: i32) -> io::Result<()> {
    fn check(ret: libc::c_int) -> io::Result<libc::c_int> {
        if ret == -1 {
            Err(io::Error::last_os_error())
        } else {
            Ok(ret)
        }
    }

    unsafe {
        let request = check(libc::fcntl(request, libc::F_DUPFD_CLOEXEC, 10))?;
        let reply = check(libc::fcntl(reply, libc::F_DUPFD_CLOEXEC, 10))?;
        check(libc::dup2(request, REQUEST_FD))?;
        check(libc::dup2(reply, REPLY_FD))?;
    }
    Ok(())
}

struct GuestProcess {
    child: Child,
    requests: PipeWriter,
    replies: BufReader<PipeReader>,
    // Kept alive for as long as the interpreter may read it.
    _script: NamedTempFile,
}

impl Drop for GuestProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// A guest interpreter living in a child process.
pub struct ProcessRuntime {
    language: &'static str,
    program: String,
    bootstrap: &'static str,
    suffix: &'static str,
    process: Option<GuestProcess>,
}

impl ProcessRuntime {
    /// R runtime driven through `command` (e.g. `Rscript`).
    pub fn r(command: impl Into<String>) -> Self {
        Self::new("R", command, R_BOOTSTRAP, ".R")
    }

    /// Ruby runtime driven through `command` (e.g. `ruby`).
    pub fn ruby(command: impl Into<String>) -> Self {
        Self::new("Ruby", command, RUBY_BOOTSTRAP, ".rb")
    }

    fn new(
        language: &'static str,
        program: impl Into<String>,
        bootstrap: &'static str,
        suffix: &'static str,
    ) -> Self {
        Self {
            language,
            program: program.into(),
            bootstrap,
            suffix,
            process: None,
        }
    }

    /// Whether an interpreter process is currently running.
    pub fn is_running(&self) -> bool {
        self.process.is_some()
    }

    fn spawn(&self) -> Result<GuestProcess> {
        let mut script = tempfile::Builder::new()
            .prefix("polyeval-")
            .suffix(self.suffix)
            .tempfile()?;
        script.write_all(self.bootstrap.as_bytes())?;
        script.flush()?;

        let (request_reader, request_writer) = io::pipe()?;
        let (reply_reader, reply_writer) = io::pipe()?;

        let mut command = Command::new(&self.program);
        command
            .arg(script.path())
            .stdin(Stdio::null())
            .stdout(Stdio::from(io::stderr()))
            .stderr(Stdio::inherit());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt as _;
            use std::os::fd::AsRawFd as _;
            let request = request_reader.as_raw_fd();
            let reply = reply_writer.as_raw_fd();
            unsafe {
                command.pre_exec(move || install_protocol_fds(request, reply));
            }
        }

        let child = command.spawn().map_err(|e| {
            PolyevalError::RuntimeUnavailable(format!(
                "failed to start {} runtime '{}': {}",
                self.language, self.program, e
            ))
        })?;

        // The child holds its own copies; ours would keep the pipes from reporting EOF.
        drop(command);
        drop(request_reader);
        drop(reply_writer);

        tracing::info!("Started {} runtime (pid {})", self.language, child.id());

        Ok(GuestProcess {
            child,
            requests: request_writer,
            replies: BufReader::new(reply_reader),
            _script: script,
        })
    }

    fn call(&mut self, op: Op, name: &str, payload: &str) -> Result<String> {
        if self.process.is_none() {
            self.process = Some(self.spawn()?);
        }
        let process = self.process.as_mut().ok_or_else(|| {
            PolyevalError::RuntimeUnavailable(format!("{} runtime is not running", self.language))
        })?;

        let reply = write_request(&mut process.requests, op, name, payload)
            .and_then(|()| read_reply(&mut process.replies));

        match reply {
            Ok(Reply::Ok(out)) => Ok(out),
            Ok(Reply::Err(msg)) => Err(PolyevalError::GuestEvaluation(msg)),
            Err(e) => {
                tracing::warn!(
                    "{} runtime failed ({}); it will be restarted on next use",
                    self.language,
                    e
                );
                self.process = None;
                Err(PolyevalError::RuntimeUnavailable(format!("{} runtime: {}", self.language, e)))
            }
        }
    }
}

impl GuestRuntime for ProcessRuntime {
    fn export(&mut self, name: &str, value: &str) -> Result<()> {
        self.call(Op::Export, name, value).map(|_| ())
    }

    fn eval(&mut self, source: &str) -> Result<String> {
        self.call(Op::Eval, "-", source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn interpreter_available(program: &str) -> bool {
        Command::new(program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok()
    }

    #[test]
    fn test_write_request_frame() {
        let mut out = Vec::new();
        write_request(&mut out, Op::Export, "code", "puts 'héllo'").unwrap();
        assert_eq!(out, "X code 13\nputs 'héllo'".as_bytes());
    }

    #[test]
    fn test_write_eval_frame() {
        let mut out = Vec::new();
        write_request(&mut out, Op::Eval, "-", "1 + 1").unwrap();
        assert_eq!(out, b"E - 5\n1 + 1");
    }

    #[test]
    fn test_read_ok_reply() {
        let mut input = Cursor::new(b"OK 3\n[1]E - 0\n".to_vec());
        assert_eq!(read_reply(&mut input).unwrap(), Reply::Ok("[1]".into()));
    }

    #[test]
    fn test_read_err_reply_with_newlines() {
        let mut input = Cursor::new(b"ERR 11\nline1\nline2".to_vec());
        assert_eq!(read_reply(&mut input).unwrap(), Reply::Err("line1\nline2".into()));
    }

    #[test]
    fn test_read_empty_payload() {
        let mut input = Cursor::new(b"OK 0\n".to_vec());
        assert_eq!(read_reply(&mut input).unwrap(), Reply::Ok(String::new()));
    }

    #[test]
    fn test_read_consecutive_replies() {
        let mut input = Cursor::new(b"OK 1\naERR 1\nb".to_vec());
        assert_eq!(read_reply(&mut input).unwrap(), Reply::Ok("a".into()));
        assert_eq!(read_reply(&mut input).unwrap(), Reply::Err("b".into()));
    }

    #[test]
    fn test_read_eof() {
        let mut input = Cursor::new(Vec::new());
        let err = read_reply(&mut input).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_read_truncated_payload() {
        let mut input = Cursor::new(b"OK 10\nabc".to_vec());
        let err = read_reply(&mut input).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_read_malformed_header() {
        let mut input = Cursor::new(b"garbage\n".to_vec());
        assert_eq!(read_reply(&mut input).unwrap_err().kind(), io::ErrorKind::InvalidData);

        let mut input = Cursor::new(b"OK many\n".to_vec());
        assert_eq!(read_reply(&mut input).unwrap_err().kind(), io::ErrorKind::InvalidData);

        let mut input = Cursor::new(b"MAYBE 0\n".to_vec());
        assert_eq!(read_reply(&mut input).unwrap_err().kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_missing_interpreter_is_unavailable() {
        let mut runtime = ProcessRuntime::ruby("polyeval-no-such-interpreter");
        let err = runtime.eval("1").unwrap_err();
        assert!(matches!(err, PolyevalError::RuntimeUnavailable(_)), "got {:?}", err);
        assert!(!runtime.is_running());
    }

    /// Echoes every payload back while printing to stdout and draining stdin.
    #[cfg(unix)]
    const NOISY_SHELL_GUEST: &str = r#"
while read -r op name len <&3; do
  payload=$(dd bs=1 count="$len" 2>/dev/null <&3)
  echo "stray output"
  cat >/dev/null
  printf 'OK %s\n%s' "${#payload}" "$payload" >&4
done
"#;

    fn pid(runtime: &ProcessRuntime) -> Option<u32> {
        runtime.process.as_ref().map(|p| p.child.id())
    }

    #[cfg(unix)]
    #[test]
    fn test_guest_stdio_is_separate_from_protocol() {
        let mut runtime = ProcessRuntime::new("Shell", "sh", NOISY_SHELL_GUEST, ".sh");
        assert_eq!(runtime.eval("first").unwrap(), "first");
        let started = pid(&runtime);
        assert!(started.is_some());

        runtime.export("code", "second").unwrap();
        assert_eq!(runtime.eval("third").unwrap(), "third");
        assert_eq!(pid(&runtime), started);
    }

    #[cfg(unix)]
    #[test]
    fn test_exited_guest_is_restarted_on_next_call() {
        let mut runtime = ProcessRuntime::new("Shell", "sh", "exit 0\n", ".sh");
        let err = runtime.eval("1").unwrap_err();
        assert!(matches!(err, PolyevalError::RuntimeUnavailable(_)), "got {:?}", err);
        assert!(!runtime.is_running());
    }

    #[test]
    fn test_live_ruby_runtime_keeps_state() {
        if !interpreter_available("ruby") {
            eprintln!("ruby not installed; skipping");
            return;
        }
        let mut runtime = ProcessRuntime::ruby("ruby");
        runtime.export("code", "x = 20").unwrap();
        assert_eq!(runtime.eval("polyeval_import('code')").unwrap(), "x = 20");
        assert_eq!(runtime.eval("$y = 21").unwrap(), "21");
        assert_eq!(runtime.eval("$y * 2").unwrap(), "42");
        assert_eq!(runtime.eval("puts 'noise'; 'quiet'").unwrap(), "quiet");

        let started = pid(&runtime);
        let out = runtime.eval("STDOUT.puts 'raw'; system('echo hi'); STDIN.read").unwrap();
        assert_eq!(out, "");
        assert_eq!(runtime.eval("$y").unwrap(), "21");
        assert_eq!(pid(&runtime), started);

        let err = runtime.eval("raise 'boom'").unwrap_err();
        assert!(matches!(err, PolyevalError::GuestEvaluation(ref m) if m == "boom"));
        assert!(runtime.is_running());
    }

    #[test]
    fn test_live_r_runtime_keeps_state() {
        if !interpreter_available("Rscript") {
            eprintln!("Rscript not installed; skipping");
            return;
        }
        let mut runtime = ProcessRuntime::r("Rscript");
        runtime.export("code", "1 + 1").unwrap();
        assert_eq!(runtime.eval("code").unwrap(), "1 + 1");
        runtime.eval("y <- 41").unwrap();
        assert_eq!(runtime.eval("y + 1").unwrap(), "42");

        let started = pid(&runtime);
        let out = runtime.eval("system('echo hi'); readLines('stdin')").unwrap();
        assert_eq!(out, "character(0)");
        assert_eq!(runtime.eval("y").unwrap(), "41");
        assert_eq!(pid(&runtime), started);

        let err = runtime.eval("stop('boom')").unwrap_err();
        assert!(matches!(err, PolyevalError::GuestEvaluation(ref m) if m == "boom"));
    }
}
