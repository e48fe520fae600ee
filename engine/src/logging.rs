//! A [`log`] sink that forwards records over a channel.
//!
//! A host bridge usually cannot write to stdout directly. It installs a [`ChannelLogger`] and
//! drains the receiver on its own schedule, forwarding each [`LogMessage`] to the host console.

use crossbeam::channel::{Receiver, Sender, unbounded};
use log::{Level, LevelFilter, Metadata, Record, SetLoggerError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    pub level: Level,
    pub target: String,
    pub message: String,
}

pub struct ChannelLogger {
    sender: Sender<LogMessage>,
    level: LevelFilter,
}

impl ChannelLogger {
    /// Forward records at `Info` and above to `sender`.
    pub fn new(sender: Sender<LogMessage>) -> Self {
        Self {
            sender,
            level: LevelFilter::Info,
        }
    }

    /// Create a logger together with the receiving end of its channel.
    pub fn with_receiver() -> (Self, Receiver<LogMessage>) {
        let (sender, receiver) = unbounded();
        (Self::new(sender), receiver)
    }

    /// Forward records up to `level` instead.
    pub fn with_level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }

    /// Install as the global logger. Fails if a logger is already installed.
    pub fn install(self) -> Result<(), SetLoggerError> {
        let level = self.level;
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(level);
        Ok(())
    }
}

impl log::Log for ChannelLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            // A dropped receiver just means nobody is listening any more.
            let _ = self.sender.try_send(LogMessage {
                level: record.level(),
                target: record.target().to_string(),
                message: format!("{}", record.args()),
            });
        }
    }

    fn flush(&self) {}
}
