use jit_cleaner_core::AppError;

/// What the drain loop does with a message whose processing failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDisposition {
    /// Republish under the error origin and acknowledge the original.
    Quarantine,
    /// Leave unacknowledged so the queue redelivers it.
    LeavePending,
}

impl FailureDisposition {
    /// Maps an error raised while routing one message to its recovery.
    #[must_use]
    pub fn for_error(error: &AppError) -> Self {
        match error {
            AppError::Payload(_)
            | AppError::DateFormat(_)
            | AppError::PolicyAccess(_)
            | AppError::Credential(_)
            | AppError::Queue(_)
            | AppError::Validation(_)
            | AppError::Internal(_) => Self::Quarantine,
            // Redelivery retries the write against a fresh policy.
            AppError::Conflict(_) => Self::LeavePending,
        }
    }

    /// Returns a stable label for logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quarantine => "quarantine",
            Self::LeavePending => "leave_pending",
        }
    }
}
