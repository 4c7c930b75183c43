use thiserror::Error;

/// First form rule that failed, in evaluation order. The messages are the
/// ones shown next to the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    #[error("Por favor, selecione um mês")]
    MissingMonth,
    #[error("Ano inválido")]
    InvalidYear,
    #[error("Dias frequentados inválidos")]
    InvalidDaysAttended,
    #[error("Total de dias inválido")]
    InvalidTotalDays,
    #[error("Dias frequentados maior que o total")]
    DaysExceedTotal,
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("storage io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("database query failed: {0}")]
    Database(#[from] sqlx::Error),
    #[error("stored records under `{key}` are unreadable: {source}")]
    Corrupted {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize records: {0}")]
    Encode(#[source] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error(transparent)]
    Validation(#[from] ValidationFailure),
    #[error("Nenhum registro para exportar")]
    NothingToExport,
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("Erro ao ler o arquivo CSV: {0}")]
    MalformedImportSource(String),
}

/// Why a single import line was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineRejection {
    #[error("expected at least 7 fields, found {0}")]
    TooFewFields(usize),
    #[error(transparent)]
    Invalid(#[from] ValidationFailure),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {reason}")]
pub struct ImportLineError {
    pub line: usize,
    pub reason: LineRejection,
}
