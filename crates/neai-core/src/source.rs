//! Line-oriented input from the device

use crate::error::NeaiResult;

/// Anything that yields newline-delimited lines with a read timeout
pub trait LineSource: Send {
    /// Block for at most one read timeout.
    ///
    /// `Ok(None)` means the timeout expired without a complete line.
    fn read_line(&mut self) -> NeaiResult<Option<String>>;

    /// Human-readable name of the source, for logs and the status bar
    fn describe(&self) -> String;
}

impl<T: LineSource + ?Sized> LineSource for Box<T> {
    fn read_line(&mut self) -> NeaiResult<Option<String>> {
        (**self).read_line()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
