use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use hubwire_protocol::Envelope;
use serde::Serialize;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// One decoded frame, flattened for display.
#[derive(Serialize)]
pub struct EnvelopeRow {
    pub seq: usize,
    pub kind: String,
    pub invocation_id: Option<String>,
    pub detail: String,
}

impl EnvelopeRow {
    pub fn from_envelope(seq: usize, envelope: &Envelope) -> Self {
        Self {
            seq,
            kind: envelope.kind_name().to_string(),
            invocation_id: envelope.invocation_id().map(str::to_string),
            detail: detail_for(envelope),
        }
    }

    pub fn fallback(seq: usize, body_len: usize) -> Self {
        Self {
            seq,
            kind: "Fallback".to_string(),
            invocation_id: None,
            detail: format!("{body_len} bytes deferred to external codec"),
        }
    }
}

fn detail_for(envelope: &Envelope) -> String {
    match envelope {
        Envelope::CancelInvocation { headers, .. } => format!("{} header(s)", headers.len()),
        Envelope::Close { error } => match error {
            Some(error) => format!("error: {error}"),
            None => "clean close".to_string(),
        },
        Envelope::Completion {
            error, has_result, ..
        } => match error {
            Some(error) => format!("error: {error}"),
            None if *has_result => "result".to_string(),
            None => "no result".to_string(),
        },
        Envelope::HandshakeRequest {
            protocol,
            version,
            minor_version,
        } => format!("{protocol} v{version}.{minor_version}"),
        Envelope::HandshakeResponse {
            error,
            minor_version,
        } => match error {
            Some(error) => format!("rejected: {error}"),
            None => format!("accepted (minor {minor_version})"),
        },
        Envelope::Invocation {
            target, arguments, ..
        } => format!("target={target}, {} argument slot(s)", arguments.len()),
        Envelope::Ping => String::new(),
        Envelope::StreamInvocation {
            target,
            arguments,
            stream_ids,
            ..
        } => format!(
            "target={target}, {} argument slot(s), {} stream(s)",
            arguments.len(),
            stream_ids.len()
        ),
        Envelope::StreamItem { .. } => "stream item".to_string(),
        Envelope::InvocationBindingFailure { target, error, .. } => {
            format!("target={target}, binding failure: {error}")
        }
        Envelope::StreamBindingFailure { error, .. } => format!("binding failure: {error}"),
    }
}

pub fn print_rows(rows: &[EnvelopeRow], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for row in rows {
                println!(
                    "{}",
                    serde_json::to_string(row).unwrap_or_else(|_| "{}".to_string())
                );
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["#", "KIND", "INVOCATION", "DETAIL"]);
            for row in rows {
                table.add_row(vec![
                    row.seq.to_string(),
                    row.kind.clone(),
                    row.invocation_id.clone().unwrap_or_default(),
                    row.detail.clone(),
                ]);
            }
            println!("{table}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn invocation_row_carries_target_and_id() {
        let envelope = Envelope::Invocation {
            invocation_id: Some("42".into()),
            target: "Foo".into(),
            headers: HashMap::new(),
            stream_ids: Vec::new(),
            arguments: Vec::new(),
        };
        let row = EnvelopeRow::from_envelope(3, &envelope);
        assert_eq!(row.seq, 3);
        assert_eq!(row.kind, "Invocation");
        assert_eq!(row.invocation_id.as_deref(), Some("42"));
        assert!(row.detail.contains("target=Foo"));
    }

    #[test]
    fn fallback_row_reports_size() {
        let row = EnvelopeRow::fallback(0, 128);
        assert_eq!(row.kind, "Fallback");
        assert!(row.detail.contains("128"));
    }
}
