pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("invalid document id: {0}")]
    ObjectId(#[from] mongodb::bson::oid::Error),

    #[error("document field access: {0}")]
    Field(#[from] mongodb::bson::document::ValueAccessError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("connection to {endpoint} database failed: {source}")]
    Connection {
        endpoint: &'static str,
        #[source]
        source: mongodb::error::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Validation(String),

    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("file is {size} bytes, exceeding the {cap} byte limit")]
    TooLarge { size: u64, cap: u64 },
}

/// Shorten an error message for inline display.
///
/// Driver errors can carry multi-line topology dumps; the UI only ever
/// shows the head of the message.
pub fn truncate_message(msg: &str, max_chars: usize) -> String {
    let line = msg.lines().next().unwrap_or("");
    if line.chars().count() <= max_chars {
        return line.to_string();
    }
    let mut out: String = line.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_messages() {
        assert_eq!(truncate_message("all good", 200), "all good");
    }

    #[test]
    fn truncate_cuts_long_messages() {
        let long = "x".repeat(300);
        let out = truncate_message(&long, 200);
        assert_eq!(out.chars().count(), 203);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn truncate_drops_extra_lines() {
        let msg = "head line\ntopology dump line";
        assert_eq!(truncate_message(msg, 200), "head line");
    }
}
