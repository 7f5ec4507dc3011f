//! Operator-facing output

use colored::Colorize;

/// Sink for everything a command tells the operator
pub trait Ui: Send + Sync {
    /// Normal output, written to stdout
    fn output(&self, message: &str);

    /// Error output, written to stderr
    fn error(&self, message: &str);
}

/// Terminal UI; errors are rendered in red when stderr supports colour
#[derive(Debug, Default)]
pub struct ConsoleUi;

impl Ui for ConsoleUi {
    fn output(&self, message: &str) {
        println!("{}", message);
    }

    fn error(&self, message: &str) {
        eprintln!("{}", message.red());
    }
}

/// Records messages instead of printing them
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockUi {
    output: std::sync::Mutex<Vec<String>>,
    errors: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl MockUi {
    pub fn output_messages(&self) -> Vec<String> {
        self.output.lock().unwrap().clone()
    }

    pub fn error_messages(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl Ui for MockUi {
    fn output(&self, message: &str) {
        self.output.lock().unwrap().push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}
