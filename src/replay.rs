//! History replay: persisted conversation rows re-synthesized into a source
//! stream the live decode path consumes unchanged.
//!
//! The rendering layer never special-cases history: stored rows become
//! multiplex wire records, and the same framer + decoder reproduce the event
//! sequence a live run would have produced.

use crate::decoder::WireFormat;
use crate::event::SideChannels;
use crate::pipeline::{EventStream, PipelineBuilder};
use crate::source::{self, ChunkStream};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashSet;
use tracing::warn;

/// One persisted question/answer exchange, as served by the record store.
///
/// `answer_payload` holds the stored content message (string-encoded JSON,
/// the shape the live stream carried); `result_payload` holds the stored
/// structured result, when the exchange produced one.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConversationRow {
    pub uuid: String,
    pub chat_id: String,
    pub question: String,
    #[serde(rename = "to2_answer", default)]
    pub answer_payload: Option<String>,
    #[serde(rename = "to4_answer", default)]
    pub result_payload: Option<Value>,
    #[serde(default)]
    pub qa_type: String,
    #[serde(default)]
    pub file_key: Option<String>,
}

impl ConversationRow {
    /// Rebuild the wire records this row contributes, in emission order:
    /// the content record first, then the structured result. Content and
    /// structured-result reconstruction fail independently.
    fn records(&self) -> Vec<String> {
        let mut records = Vec::with_capacity(2);

        if let Some(stored) = &self.answer_payload {
            match serde_json::from_str::<Value>(stored) {
                Ok(message) => {
                    let content = message
                        .pointer("/data/content")
                        .and_then(Value::as_str)
                        .filter(|c| !c.is_empty());
                    match content {
                        Some(content) => records.push(
                            json!({"dataType": "t02", "data": {"content": content}}).to_string(),
                        ),
                        None => {
                            warn!(uuid = %self.uuid, "stored answer has no content, skipped")
                        }
                    }
                }
                Err(e) => {
                    warn!(uuid = %self.uuid, error = %e, "stored answer failed to parse, skipped")
                }
            }
        }

        if let Some(result) = &self.result_payload
            && !result.is_null()
        {
            records.push(json!({"dataType": "t04", "data": result}).to_string());
        }

        records
    }
}

/// Synthesize a source stream equivalent to the live answer stream for an
/// ordered list of rows.
///
/// Rows reconstructing zero records are skipped entirely; duplicate `uuid`s
/// (a known backend anomaly) keep the first occurrence only.
pub fn replay_source(rows: &[ConversationRow]) -> ChunkStream {
    let mut seen = HashSet::new();
    let mut chunks = Vec::new();
    for row in rows {
        if !seen.insert(row.uuid.clone()) {
            warn!(uuid = %row.uuid, "duplicate row, keeping first occurrence");
            continue;
        }
        for record in row.records() {
            chunks.push(Bytes::from(format!("{record}\n")));
        }
    }
    source::from_chunks(chunks)
}

/// Replay rows through the same framer + decoder the live path uses.
///
/// Stored rows carry no terminal record, so exhausting the synthetic source
/// is the replay's natural completion.
pub fn replay_events(rows: &[ConversationRow], side_channels: SideChannels) -> EventStream {
    PipelineBuilder::new(WireFormat::Qwen2)
        .side_channels(side_channels)
        .finish_on_close(true)
        .events(replay_source(rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(uuid: &str, answer: Option<&str>, result: Option<Value>) -> ConversationRow {
        ConversationRow {
            uuid: uuid.to_string(),
            chat_id: "chat-1".to_string(),
            question: "q".to_string(),
            answer_payload: answer.map(str::to_string),
            result_payload: result,
            qa_type: "DATABASE_QA".to_string(),
            file_key: None,
        }
    }

    #[test]
    fn rebuilds_content_and_result_records_in_order() {
        let stored = r#"{"data":{"messageType":"continue","content":"answer text"},"dataType":"t02"}"#;
        let records = row("u1", Some(stored), Some(json!({"chart": "bar"}))).records();
        assert_eq!(records.len(), 2);
        assert!(records[0].contains("\"t02\""));
        assert!(records[0].contains("answer text"));
        assert!(records[1].contains("\"t04\""));
    }

    #[test]
    fn unparseable_answer_still_yields_result_record() {
        let records = row("u2", Some("{broken"), Some(json!({"k": 1}))).records();
        assert_eq!(records.len(), 1);
        assert!(records[0].contains("\"t04\""));
    }

    #[test]
    fn null_result_payload_is_skipped() {
        let stored = r#"{"data":{"content":"text"},"dataType":"t02"}"#;
        let records = row("u3", Some(stored), Some(Value::Null)).records();
        assert_eq!(records.len(), 1);
        assert!(records[0].contains("\"t02\""));
    }

    #[test]
    fn deserializes_stored_row_names() {
        let raw = r#"{
            "uuid": "u4",
            "chat_id": "c4",
            "question": "what changed",
            "to2_answer": "{\"data\":{\"content\":\"x\"}}",
            "to4_answer": {"table": []},
            "qa_type": "COMMON_QA",
            "file_key": null
        }"#;
        let parsed: ConversationRow = serde_json::from_str(raw).expect("row parses");
        assert_eq!(parsed.uuid, "u4");
        assert!(parsed.answer_payload.is_some());
        assert!(parsed.result_payload.is_some());
    }
}
