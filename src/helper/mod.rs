//! Controller helper capability
//!
//! What a running test program gets from the harness: somewhere to write
//! output and a way to say it is ready.

mod output;
mod readiness;

pub use output::OutputSink;
pub use readiness::Readiness;

/// Bundle of output sink and readiness signal handed to one program run.
#[derive(Clone, Debug)]
pub struct ControllerHelper {
    name: String,
    output: OutputSink,
    readiness: Readiness,
}

impl ControllerHelper {
    pub fn new(name: impl Into<String>, output: OutputSink, readiness: Readiness) -> Self {
        Self {
            name: name.into(),
            output,
            readiness,
        }
    }

    /// Identifier the program was launched under
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn output(&self) -> &OutputSink {
        &self.output
    }

    pub fn write(&self, message: impl Into<String>) {
        self.output.write(message);
    }

    pub fn write_line(&self, message: impl Into<String>) {
        self.output.write_line(message);
    }

    /// Signal that setup is complete. Later calls are no-ops.
    pub fn server_ready(&self) {
        self.readiness.signal();
    }

    pub async fn wait_ready(&self) {
        self.readiness.wait().await;
    }

    pub fn is_ready(&self) -> bool {
        self.readiness.is_signaled()
    }
}
