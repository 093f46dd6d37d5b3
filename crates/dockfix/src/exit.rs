use std::process::ExitCode;

/// What a command wants the process to finish with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exit {
    status: ExitStatus,
    message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitStatus {
    Success,
    /// Findings, unparsable files, or files that could not be written.
    Error,
}

impl Exit {
    #[must_use]
    pub fn success() -> Self {
        Self {
            status: ExitStatus::Success,
            message: None,
        }
    }

    #[must_use]
    pub fn error() -> Self {
        Self {
            status: ExitStatus::Error,
            message: None,
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Print the message, if any, to stderr and turn into an exit code.
    pub fn report(self) -> ExitCode {
        if let Some(message) = &self.message {
            eprintln!("{message}");
        }
        match self.status {
            ExitStatus::Success => ExitCode::SUCCESS,
            ExitStatus::Error => ExitCode::FAILURE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders() {
        assert_eq!(Exit::success().status, ExitStatus::Success);
        let exit = Exit::error().with_message("Found 1 error in 1 file.");
        assert_eq!(exit.status, ExitStatus::Error);
        assert_eq!(exit.message.as_deref(), Some("Found 1 error in 1 file."));
    }
}
