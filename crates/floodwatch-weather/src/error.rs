use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("provider returned invalid response: {0}")]
    InvalidResponse(String),

    #[error("provider API error: status={status}, body={body}")]
    Api { status: u16, body: String },
}

impl ProviderError {
    /// Upstream HTTP status, when the provider answered at all.
    pub const fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Message safe to log: the given secrets and any `key=` query value are
    /// masked, since request URLs carry the API key.
    pub fn redacted(&self, secrets: &[&str]) -> String {
        let mut out = self.to_string();
        for secret in secrets {
            if !secret.is_empty() {
                out = out.replace(secret, "[REDACTED]");
            }
        }
        redact_query_param(&out, "key=")
    }
}

fn redact_query_param(input: &str, marker: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find(marker) {
        let (head, tail) = rest.split_at(pos + marker.len());
        out.push_str(head);
        let end = tail
            .find(['&', ' ', '"', '\'', ')', '\n'])
            .unwrap_or(tail.len());
        out.push_str("[REDACTED]");
        rest = tail.split_at(end).1;
    }
    out.push_str(rest);
    out
}
