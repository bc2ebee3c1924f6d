//! Logger module
//!
//! Console and file logging for the server: startup banner, access log
//! entries in combined/common/json formats, and error reporting. Targets
//! are fixed at startup; before `init` runs, output goes to stdout/stderr.

use crate::config::Config;
use chrono::Local;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

static LOG_WRITER: OnceLock<LogWriter> = OnceLock::new();

enum LogTarget {
    Stdout,
    Stderr,
    File(Mutex<File>),
}

struct LogWriter {
    access: LogTarget,
    error: LogTarget,
}

impl LogWriter {
    fn new(access_log_file: Option<&str>, error_log_file: Option<&str>) -> io::Result<Self> {
        Ok(Self {
            access: target_for(access_log_file, LogTarget::Stdout)?,
            error: target_for(error_log_file, LogTarget::Stderr)?,
        })
    }
}

fn target_for(path: Option<&str>, fallback: LogTarget) -> io::Result<LogTarget> {
    match path {
        Some(p) => Ok(LogTarget::File(Mutex::new(open_log_file(p)?))),
        None => Ok(fallback),
    }
}

/// Open or create a log file for appending.
fn open_log_file(path: &str) -> io::Result<File> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(path)
}

fn write_to(target: &LogTarget, message: &str) {
    match target {
        LogTarget::Stdout => println!("{message}"),
        LogTarget::Stderr => eprintln!("{message}"),
        LogTarget::File(file) => {
            if let Ok(mut f) = file.lock() {
                let _ = writeln!(f, "{message}");
            }
        }
    }
}

/// Initialize the global log writer from configuration.
///
/// Should be called once at application startup. Fails when a configured
/// log file cannot be opened.
pub fn init(config: &Config) -> io::Result<()> {
    let writer = LogWriter::new(
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
    )?;
    LOG_WRITER.set(writer).map_err(|_| {
        io::Error::new(
            io::ErrorKind::AlreadyExists,
            "Log writer already initialized",
        )
    })
}

fn write_info(message: &str) {
    match LOG_WRITER.get() {
        Some(writer) => write_to(&writer.access, message),
        None => println!("{message}"),
    }
}

fn write_error(message: &str) {
    match LOG_WRITER.get() {
        Some(writer) => write_to(&writer.error, message),
        None => eprintln!("{message}"),
    }
}

pub fn log_server_start(addr: &SocketAddr, root: &Path, config: &Config) {
    write_info("======================================");
    write_info("Static asset server started");
    write_info(&format!("Listening on: http://{addr}"));
    write_info(&format!("Serving files from: {}", root.display()));
    write_info(&format!("Log level: {}", config.logging.level));
    if let Some(workers) = config.server.workers {
        write_info(&format!("Worker threads: {workers}"));
    }
    if let Some(ref path) = config.logging.access_log_file {
        write_info(&format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        write_info(&format!("Error log: {path}"));
    }
    write_info("======================================\n");
}

pub fn log_error(message: &str) {
    write_error(&format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write_error(&format!("[WARN] {message}"));
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    write_error(&format!("[ERROR] Failed to serve connection: {err:?}"));
}

pub fn log_port_in_use(port: u16) {
    write_error(&format!("[ERROR] Port {port} is already in use"));
    write_error("        Stop the other process or configure a different port");
}

/// One access log line worth of request/response information.
#[derive(Debug, Clone)]
pub struct AccessLogEntry {
    pub remote_addr: String,
    pub time: chrono::DateTime<Local>,
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub status: u16,
    pub body_bytes: usize,
    pub request_time_us: u64,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
}

impl AccessLogEntry {
    /// Create an entry stamped with the current time.
    pub fn new(remote_addr: String, method: String, path: String) -> Self {
        Self {
            remote_addr,
            time: Local::now(),
            method,
            path,
            query: None,
            status: 200,
            body_bytes: 0,
            request_time_us: 0,
            referer: None,
            user_agent: None,
        }
    }

    /// Format according to the configured access log format.
    pub fn format(&self, format: &str) -> String {
        match format {
            "common" => self.format_common(),
            "json" => self.format_json(),
            _ => self.format_combined(),
        }
    }

    fn request_line(&self) -> String {
        format!(
            "{} {}{} HTTP/1.1",
            self.method,
            self.path,
            self.query
                .as_ref()
                .map(|q| format!("?{q}"))
                .unwrap_or_default()
        )
    }

    /// Common Log Format (CLF)
    fn format_common(&self) -> String {
        format!(
            "{} - - [{}] \"{}\" {} {}",
            self.remote_addr,
            self.time.format("%d/%b/%Y:%H:%M:%S %z"),
            self.request_line(),
            self.status,
            self.body_bytes,
        )
    }

    /// Apache/Nginx combined format: CLF plus referer and user-agent.
    fn format_combined(&self) -> String {
        format!(
            "{} \"{}\" \"{}\"",
            self.format_common(),
            self.referer.as_deref().unwrap_or("-"),
            self.user_agent.as_deref().unwrap_or("-"),
        )
    }

    fn format_json(&self) -> String {
        serde_json::json!({
            "time": self.time.to_rfc3339(),
            "remote_addr": self.remote_addr,
            "method": self.method,
            "path": self.path,
            "query": self.query,
            "status": self.status,
            "body_bytes": self.body_bytes,
            "request_time_us": self.request_time_us,
            "referer": self.referer,
            "user_agent": self.user_agent,
        })
        .to_string()
    }
}

/// Write a formatted access log entry.
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    let line = entry.format(format);
    match LOG_WRITER.get() {
        Some(writer) => write_to(&writer.access, &line),
        None => println!("{line}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> AccessLogEntry {
        let mut entry = AccessLogEntry::new(
            "127.0.0.1".to_string(),
            "GET".to_string(),
            "/style.css".to_string(),
        );
        entry.query = Some("v=1".to_string());
        entry.status = 200;
        entry.body_bytes = 6;
        entry
    }

    #[test]
    fn common_format_contains_request_line() {
        let line = entry().format("common");
        assert!(line.starts_with("127.0.0.1 - - ["));
        assert!(line.contains("\"GET /style.css?v=1 HTTP/1.1\" 200 6"));
    }

    #[test]
    fn combined_format_defaults_missing_headers_to_dash() {
        let line = entry().format("combined");
        assert!(line.ends_with("\"-\" \"-\""));
    }

    #[test]
    fn json_format_is_valid_json() {
        let line = entry().format("json");
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["status"], 200);
        assert_eq!(value["path"], "/style.css");
        assert_eq!(value["referer"], serde_json::Value::Null);
    }
}
