use anyhow::Context;
use std::ffi::{OsStr, OsString};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::thread;

/// An external command as a program plus an argument vector.
///
/// Arguments are passed through verbatim; anything the equivalent shell
/// invocation would expand (globs, list files) is expanded by the caller
/// instead.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    program: PathBuf,
    args: Vec<OsString>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Single-line rendering used in logs and error messages.
    pub fn display(&self) -> String {
        let mut out = self.program.display().to_string();
        for arg in &self.args {
            out.push(' ');
            out.push_str(&arg.to_string_lossy());
        }
        out
    }

    fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command
    }
}

/// One consumer of captured process output. The runner fans every line out
/// to all sinks, in order, as it arrives.
pub trait OutputSink {
    fn write_line(&mut self, line: &str) -> anyhow::Result<()>;
}

/// Echoes lines to stdout unchanged, the interactive view of a run.
pub struct ConsoleSink;

impl OutputSink for ConsoleSink {
    fn write_line(&mut self, line: &str) -> anyhow::Result<()> {
        println!("{line}");
        Ok(())
    }
}

/// Appends lines to a file. Interrupted runs keep everything written so far.
pub struct FileSink {
    path: PathBuf,
    file: File,
}

impl FileSink {
    /// Open `path` for appending, creating it and any missing parent
    /// directories first.
    pub fn append(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory {:?}", parent))?;
        }
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file {:?}", path))?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OutputSink for FileSink {
    fn write_line(&mut self, line: &str) -> anyhow::Result<()> {
        writeln!(self.file, "{line}")
            .with_context(|| format!("Failed to append to {:?}", self.path))?;
        Ok(())
    }
}

/// How one external command ended.
#[derive(Debug, Clone, Copy)]
pub struct CommandOutcome {
    status: ExitStatus,
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Exit code, or `None` when the process died to a signal.
    pub fn exit_code(&self) -> Option<i32> {
        self.status.code()
    }
}

/// Run one command, forwarding its combined stdout and stderr line by line
/// to every sink while it runs, then wait for it to exit.
///
/// Lines from the two streams are merged in arrival order; the interleaving
/// between streams is whatever the pipes deliver. A non-zero exit is not an
/// error here, it is a [`CommandOutcome`]; `Err` means the process could not
/// be run or observed at all.
pub fn run_streamed(
    spec: &CommandSpec,
    sinks: &mut [&mut dyn OutputSink],
) -> anyhow::Result<CommandOutcome> {
    tracing::info!("running: {}", spec.display());

    let mut child = spec
        .to_command()
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to launch {}", spec.display()))?;

    let (tx, rx) = mpsc::channel::<String>();
    let mut readers = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        readers.push(spawn_line_reader(stdout, tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(spawn_line_reader(stderr, tx.clone()));
    }
    // The receive loop ends once both reader threads hang up.
    drop(tx);

    for line in rx {
        for sink in sinks.iter_mut() {
            sink.write_line(&line)?;
        }
    }

    for reader in readers {
        let _ = reader.join();
    }

    let status = child
        .wait()
        .with_context(|| format!("Failed to wait for {}", spec.display()))?;
    if status.success() {
        tracing::info!("command completed: {}", spec.display());
    } else {
        match status.code() {
            Some(code) => {
                tracing::error!("command failed with exit code {code}: {}", spec.display());
            }
            None => tracing::error!("command terminated by signal: {}", spec.display()),
        }
    }
    Ok(CommandOutcome { status })
}

fn spawn_line_reader<R>(stream: R, tx: mpsc::Sender<String>) -> thread::JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        // Read raw bytes rather than `lines()`: a single invalid-UTF-8 line
        // from the child must not drop the rest of its output, and the log
        // file is the only record of a run.
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    while matches!(buf.last(), Some(b'\n' | b'\r')) {
                        buf.pop();
                    }
                    if tx.send(String::from_utf8_lossy(&buf).into_owned()).is_err() {
                        break;
                    }
                }
            }
        }
    })
}
