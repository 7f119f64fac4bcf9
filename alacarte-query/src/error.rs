//! Error types for selection, cardinality and execution failures.
//!
//! Every fallible operation in this crate returns a [`QueryError`], which
//! carries an [`ErrorCode`] for programmatic handling plus context about the
//! model, field and SQL involved.
//!
//! # Error Codes
//!
//! Error codes follow a pattern: P{category}{number}
//! - 1xxx: Selection errors (unknown field, unknown relation, schema conflicts)
//! - 2xxx: Cardinality errors (no rows, too many rows)
//! - 3xxx: Connection errors
//! - 5xxx: Execution errors (invalid query, database failure, cancellation)
//! - 6xxx: Data errors (row scanning)
//! - 7xxx: Configuration errors
//! - 9xxx: Internal errors
//!
//! ```rust
//! use alacarte_query::{QueryError, ErrorCode};
//!
//! let err = QueryError::no_such_field("Author", "nickname");
//! assert_eq!(err.code, ErrorCode::NoSuchField);
//! assert!(err.to_string().contains("nickname"));
//! ```

use std::fmt;
use thiserror::Error;

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Selection errors (1xxx)
    /// No field or relation with that name (P1001).
    NoSuchField = 1001,
    /// A nested path was requested below something that is not a relation (P1002).
    NoSuchRelation = 1002,
    /// One or more selection paths were invalid (P1003).
    InvalidSelect = 1003,
    /// A field and a relation were registered under the same name (P1004).
    SchemaConflict = 1004,

    // Cardinality errors (2xxx)
    /// No record matched where exactly one was required (P2001).
    RecordNotFound = 2001,
    /// More than one record matched where exactly one was required (P2002).
    NotUnique = 2002,

    // Connection errors (3xxx)
    /// Database connection failed (P3001).
    ConnectionFailed = 3001,

    // Execution errors (5xxx)
    /// The query could not be built (P5001).
    InvalidQuery = 5001,
    /// General database error (P5002).
    DatabaseError = 5002,
    /// Execution was cancelled (P5003).
    Cancelled = 5003,

    // Data errors (6xxx)
    /// A row could not be scanned into the record (P6001).
    DeserializationError = 6001,

    // Configuration errors (7xxx)
    /// Invalid configuration (P7001).
    InvalidConfiguration = 7001,

    // Internal errors (9xxx)
    /// Internal error (P9001).
    Internal = 9001,
}

impl ErrorCode {
    /// Get the error code string (e.g., "P1001").
    pub fn code(&self) -> String {
        format!("P{}", *self as u16)
    }

    /// Get a short description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::NoSuchField => "Field does not exist",
            Self::NoSuchRelation => "Relation does not exist",
            Self::InvalidSelect => "Invalid selection",
            Self::SchemaConflict => "Conflicting schema definition",
            Self::RecordNotFound => "Record not found",
            Self::NotUnique => "Too many results",
            Self::ConnectionFailed => "Database connection failed",
            Self::InvalidQuery => "Invalid query",
            Self::DatabaseError => "Database error",
            Self::Cancelled => "Query cancelled",
            Self::DeserializationError => "Row scan failed",
            Self::InvalidConfiguration => "Invalid configuration",
            Self::Internal => "Internal error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Suggestion for fixing an error.
#[derive(Debug, Clone)]
pub struct Suggestion {
    /// The suggestion text.
    pub text: String,
    /// Optional code example.
    pub code: Option<String>,
}

impl Suggestion {
    /// Create a new suggestion.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            code: None,
        }
    }

    /// Add a code example.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// Additional context for an error.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The model (table) involved.
    pub model: Option<String>,
    /// The field or path involved.
    pub field: Option<String>,
    /// The SQL query (if available).
    pub sql: Option<String>,
    /// Suggestions for fixing the error.
    pub suggestions: Vec<Suggestion>,
    /// Help text.
    pub help: Option<String>,
    /// Messages of the individual errors folded into a composite error.
    pub related: Vec<String>,
}

/// Errors that can occur while planning or executing a selection.
#[derive(Error, Debug)]
pub struct QueryError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// Additional context.
    pub context: ErrorContext,
    /// The source error (if any).
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl QueryError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Add a suggestion for fixing the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context.suggestions.push(Suggestion::new(suggestion));
        self
    }

    /// Add a code suggestion.
    pub fn with_code_suggestion(mut self, text: impl Into<String>, code: impl Into<String>) -> Self {
        self.context
            .suggestions
            .push(Suggestion::new(text).with_code(code));
        self
    }

    /// Add help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.context.help = Some(help.into());
        self
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.context.model = Some(model.into());
        self
    }

    /// Set the field.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.context.field = Some(field.into());
        self
    }

    /// Set the SQL query.
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.context.sql = Some(sql.into());
        self
    }

    /// Set the source error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // ============== Constructor Functions ==============

    /// A path segment that is neither a field nor a relation.
    pub fn no_such_field(model: impl Into<String>, field: impl Into<String>) -> Self {
        let model = model.into();
        let field = field.into();
        Self::new(
            ErrorCode::NoSuchField,
            format!("field does not exist: {}", field),
        )
        .with_model(&model)
        .with_field(&field)
        .with_suggestion(format!("Check the fields and relations declared on {}", model))
    }

    /// A nested path below something that cannot nest (a field or `*`).
    pub fn no_such_relation(model: impl Into<String>, field: impl Into<String>) -> Self {
        let model = model.into();
        let field = field.into();
        Self::new(
            ErrorCode::NoSuchRelation,
            format!("relation does not exist: {}", field),
        )
        .with_model(&model)
        .with_field(&field)
        .with_help("Only relations can be followed by a dotted path; fields are leaves")
    }

    /// Fold every accumulated selection error into one composite error.
    pub fn invalid_selection(model: impl Into<String>, errors: &[QueryError]) -> Self {
        let model = model.into();
        let related: Vec<String> = errors.iter().map(|e| e.message.clone()).collect();
        let mut err = Self::new(
            ErrorCode::InvalidSelect,
            format!("invalid selection on {}: {}", model, related.join("; ")),
        )
        .with_model(&model);
        err.context.related = related;
        err
    }

    /// A field and a relation share one name on the same schema.
    pub fn schema_conflict(model: impl Into<String>, name: impl Into<String>) -> Self {
        let model = model.into();
        let name = name.into();
        Self::new(
            ErrorCode::SchemaConflict,
            format!("{} is registered as both a field and a relation on {}", name, model),
        )
        .with_model(&model)
        .with_field(&name)
        .with_suggestion("Rename either the field or the relation")
    }

    /// Create a not found error.
    pub fn not_found(model: impl Into<String>) -> Self {
        let model = model.into();
        Self::new(
            ErrorCode::RecordNotFound,
            format!("no {} record found matching the query", model),
        )
        .with_model(&model)
        .with_suggestion("Use collect() if zero results are acceptable")
    }

    /// Create a not unique error.
    pub fn not_unique(model: impl Into<String>, found: usize) -> Self {
        let model = model.into();
        Self::new(
            ErrorCode::NotUnique,
            format!("too many results for collect_one on {}: found {}", model, found),
        )
        .with_model(&model)
        .with_suggestion("Add more specific filters to narrow down to a single record")
        .with_suggestion("Use collect() if you expect multiple results")
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::ConnectionFailed, format!("Connection error: {}", message))
            .with_suggestion("Verify the connection URL is correct")
    }

    /// The query accumulator could not render a statement.
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidQuery, message.into())
    }

    /// Create a general database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message.into())
            .with_suggestion("Check the database logs for more details")
    }

    /// Execution stopped because the cancellation token fired.
    pub fn cancelled() -> Self {
        Self::new(ErrorCode::Cancelled, "query execution was cancelled")
    }

    /// Create a deserialization error.
    pub fn deserialization(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(
            ErrorCode::DeserializationError,
            format!("Failed to scan row: {}", message),
        )
        .with_suggestion("Check that every field projects as many columns as it scans")
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidConfiguration, message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::Internal, format!("Internal error: {}", message))
    }

    // ============== Error Checks ==============

    /// Check if this error came from validating selection paths.
    pub fn is_selection_error(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::NoSuchField
                | ErrorCode::NoSuchRelation
                | ErrorCode::InvalidSelect
                | ErrorCode::SchemaConflict
        )
    }

    /// Check if this is a zero-or-many error from `collect_one`.
    pub fn is_cardinality_error(&self) -> bool {
        matches!(self.code, ErrorCode::RecordNotFound | ErrorCode::NotUnique)
    }

    /// Check if this is a not found error.
    pub fn is_not_found(&self) -> bool {
        self.code == ErrorCode::RecordNotFound
    }

    /// Check if execution was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.code == ErrorCode::Cancelled
    }

    /// Messages of the individual errors behind a composite error.
    pub fn related(&self) -> &[String] {
        &self.context.related
    }

    /// Display the full error with all context and suggestions.
    pub fn display_full(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("Error [{}]: {}\n", self.code.code(), self.message));

        if let Some(ref model) = self.context.model {
            output.push_str(&format!("  → Model: {}\n", model));
        }
        if let Some(ref field) = self.context.field {
            output.push_str(&format!("  → Field: {}\n", field));
        }

        // SQL (truncated to 200 characters)
        if let Some(ref sql) = self.context.sql {
            let sql_display = match sql.char_indices().nth(200) {
                Some((cut, _)) => format!("{}...", &sql[..cut]),
                None => sql.clone(),
            };
            output.push_str(&format!("  → SQL: {}\n", sql_display));
        }

        if !self.context.related.is_empty() {
            output.push_str("\nCaused by:\n");
            for message in &self.context.related {
                output.push_str(&format!("  - {}\n", message));
            }
        }

        if !self.context.suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for (i, suggestion) in self.context.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion.text));
                if let Some(ref code) = suggestion.code {
                    output.push_str(&format!(
                        "     ```\n     {}\n     ```\n",
                        code.replace('\n', "\n     ")
                    ));
                }
            }
        }

        if let Some(ref help) = self.context.help {
            output.push_str(&format!("\nHelp: {}\n", help));
        }

        output
    }
}
