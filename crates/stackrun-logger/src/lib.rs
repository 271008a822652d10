use colored::Colorize;
use log::Level;
use std::sync::OnceLock;

#[derive(Clone)]
pub struct Logger;

impl log::Log for Logger {
  fn enabled(&self, metadata: &log::Metadata) -> bool {
    metadata.level() <= log::max_level()
  }

  fn log(&self, record: &log::Record) {
    if !self.enabled(record.metadata()) {
      return;
    }

    let time = chrono::Local::now()
      .format("%Y-%m-%d %H:%M:%S")
      .to_string()
      .magenta();

    let level = match record.level() {
      Level::Error => "ERROR".red(),
      Level::Warn => "WARN".yellow(),
      Level::Info => "INFO".green(),
      Level::Debug => "DEBUG".blue(),
      Level::Trace => "TRACE".dimmed(),
    };

    let prefix = match (record.file(), record.line()) {
      (Some(file), Some(line)) => format!("{}:{} ", file, line).cyan(),
      _ => String::new().normal(),
    };

    // stderr, so command output on stdout stays machine readable
    eprintln!("{}{} {} {}", prefix, time, level, record.args());
  }

  fn flush(&self) {}
}

static LOGGER: OnceLock<bool> = OnceLock::new();

pub fn init_logger() {
  init_logger_with_level(Level::Info);
}

/// Installs the logger once. Later calls only change the level.
pub fn init_logger_with_level(level: Level) {
  let installed = *LOGGER.get_or_init(|| log::set_logger(&Logger).is_ok());

  if installed {
    log::set_max_level(level.to_level_filter());
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_init_logger_twice() {
    init_logger();
    init_logger_with_level(Level::Trace);

    assert_eq!(log::max_level(), log::LevelFilter::Trace);
    log::trace!("logger installed");
  }
}
