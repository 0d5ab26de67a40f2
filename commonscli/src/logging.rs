use anyhow::{Context, Result};
use chrono::Local;
use env_logger::{Builder, Target};
use log::LevelFilter;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Writes every log line to the log file, and to stderr too when asked.
struct LogSink {
    file: File,
    echo: bool,
}

impl Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write_all(buf)?;
        if self.echo {
            io::stderr().write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()?;
        if self.echo {
            io::stderr().flush()?;
        }
        Ok(())
    }
}

fn builder(log_file: &Path, print_log: bool) -> Result<Builder> {
    if let Some(dir) = log_file.parent() {
        fs::create_dir_all(dir)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("Failed to open log file {}", log_file.display()))?;

    let mut builder = Builder::new();
    builder
        .filter_level(LevelFilter::Debug)
        .parse_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
                record.level(),
                record.args()
            )
        })
        .target(Target::Pipe(Box::new(LogSink {
            file,
            echo: print_log,
        })));
    Ok(builder)
}

/// Log to `log_file` at debug level (`RUST_LOG` overrides), mirrored to stderr with `print_log`.
pub fn init(log_file: &Path, print_log: bool) -> Result<()> {
    builder(log_file, print_log)?
        .try_init()
        .context("Logger already initialized")?;
    Ok(())
}
