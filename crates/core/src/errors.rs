use thiserror::Error;

/// Unified error type for the entire expense-ledger-core library.
/// Every fallible public function returns `Result<T, LedgerError>`.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ── Validation ──────────────────────────────────────────────────
    #[error("Invalid expense draft: {0}")]
    InvalidExpenseDraft(String),

    #[error("Invalid amortization input: {0}")]
    InvalidAmortizationInput(String),

    // ── Lookup ──────────────────────────────────────────────────────
    #[error("Occurrence not found: {0}")]
    NotFound(String),

    // ── Persistence ─────────────────────────────────────────────────
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<std::io::Error> for LedgerError {
    fn from(e: std::io::Error) -> Self {
        LedgerError::PersistenceFailure(e.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(e: serde_json::Error) -> Self {
        LedgerError::Deserialization(e.to_string())
    }
}
