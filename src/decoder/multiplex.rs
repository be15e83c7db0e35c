//! Decoder for the internally tagged multiplex protocol (qwen2 family).
//!
//! Wire envelope: `{dataType: string, data: any, task_id?: string}`. One
//! stream multiplexes transcript content, structured business results,
//! progress milestones and bookkeeping notifications behind the `dataType`
//! discriminator; unrecognized tags are ignored, never an error.

use super::{
    DONE_MARKER, RecordDecoder, content_signal, message_envelope_content, nested_data_content,
    non_empty_str, parse_progress, record_payload,
};
use crate::event::{DecodeSignal, StreamEvent};
use serde_json::Value;

/// Known `dataType` tags.
const TAG_CONTENT: &str = "t02";
const TAG_STRUCTURED_RESULT: &str = "t04";
const TAG_QUESTION_ECHO: &str = "t11";
const TAG_RECORD_ID: &str = "t12";
const TAG_PROGRESS: &str = "t14";
const TAG_STREAM_END: &str = "t99";

#[derive(Debug, Clone, Default)]
pub struct MultiplexDecoder {
    question: Option<String>,
}

impl MultiplexDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provide the submitted question, echoed back on `t11` records.
    pub fn with_question(mut self, question: impl Into<String>) -> Self {
        self.question = Some(question.into());
        self
    }

    fn decode_tagged(&self, tag: &str, value: &Value) -> Vec<DecodeSignal> {
        let data = value.get("data");
        let mut signals = Vec::new();

        // Envelope-level task id rides alongside any tag.
        if let Some(task_id) = non_empty_str(value, "task_id") {
            signals.push(DecodeSignal::TaskId(task_id.to_string()));
        }

        match tag {
            TAG_CONTENT => {
                if let Some(text) = data
                    .and_then(|d| d.get("content"))
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                {
                    signals.push(DecodeSignal::Event(StreamEvent::content(text)));
                }
            }
            TAG_STRUCTURED_RESULT => {
                if let Some(result) = data.filter(|d| !d.is_null()) {
                    signals.push(DecodeSignal::StructuredResult(result.clone()));
                }
            }
            TAG_QUESTION_ECHO => {
                let echo = self.question.clone().or_else(|| {
                    data.and_then(|d| d.get("content"))
                        .and_then(Value::as_str)
                        .map(str::to_string)
                });
                if let Some(text) = echo.filter(|s| !s.is_empty()) {
                    signals.push(DecodeSignal::Event(StreamEvent::Content { text }));
                }
            }
            TAG_RECORD_ID => {
                if let Some(data) = data
                    && let Some(id) = non_empty_str(data, "id")
                {
                    signals.push(DecodeSignal::TaskId(id.to_string()));
                }
            }
            TAG_PROGRESS => {
                if let Some(progress) = data.and_then(|d| parse_progress(d, false)) {
                    signals.push(DecodeSignal::Event(StreamEvent::Progress(progress)));
                }
            }
            TAG_STREAM_END => signals.push(DecodeSignal::Event(StreamEvent::Done)),
            // Unknown tags are bookkeeping for someone else.
            _ => {}
        }
        signals
    }

    fn decode_untagged(&self, value: &Value) -> Vec<DecodeSignal> {
        if let Some(progress) = parse_progress(value, false) {
            return vec![DecodeSignal::Event(StreamEvent::Progress(progress))];
        }
        if let Some(content) = message_envelope_content(value) {
            return content_signal(content);
        }
        if let Some(content) = nested_data_content(value) {
            return content_signal(content);
        }
        if let Some(content) = value.get("content") {
            return content_signal(content.as_str().unwrap_or_default().to_string());
        }
        Vec::new()
    }
}

impl RecordDecoder for MultiplexDecoder {
    fn decode_record(&self, record: &str) -> Vec<DecodeSignal> {
        let payload = record_payload(record);
        if payload == DONE_MARKER {
            return vec![DecodeSignal::Event(StreamEvent::Done)];
        }

        let value: Value = match serde_json::from_str(payload) {
            Ok(value) => value,
            Err(_) => return content_signal(payload.to_string()),
        };

        match value.get("dataType").and_then(Value::as_str) {
            Some(tag) => self.decode_tagged(tag, &value),
            None => self.decode_untagged(&value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ProgressStatus;
    use serde_json::json;

    fn decode(record: &str) -> Vec<DecodeSignal> {
        MultiplexDecoder::new().decode_record(record)
    }

    #[test]
    fn t02_content() {
        let record = r#"data:{"data":{"messageType":"continue","content":"tok"},"dataType":"t02"}"#;
        assert_eq!(
            decode(record),
            vec![DecodeSignal::Event(StreamEvent::content("tok"))]
        );
    }

    #[test]
    fn t02_without_content_is_bookkeeping() {
        assert!(decode(r#"{"data":{"messageType":"begin"},"dataType":"t02"}"#).is_empty());
    }

    #[test]
    fn t04_routes_to_structured_result_side_channel() {
        let signals = decode(r#"{"dataType":"t04","data":{"chart":"bar"}}"#);
        assert_eq!(
            signals,
            vec![DecodeSignal::StructuredResult(json!({"chart": "bar"}))]
        );
    }

    #[test]
    fn t11_echoes_configured_question() {
        let decoder = MultiplexDecoder::new().with_question("why is the sky blue");
        let signals = decoder.decode_record(r#"{"dataType":"t11","data":{"id":"c-9"}}"#);
        assert_eq!(
            signals,
            vec![DecodeSignal::Event(StreamEvent::content(
                "why is the sky blue"
            ))]
        );
    }

    #[test]
    fn t11_falls_back_to_record_content() {
        let signals = decode(r#"{"dataType":"t11","data":{"content":"stored question"}}"#);
        assert_eq!(
            signals,
            vec![DecodeSignal::Event(StreamEvent::content("stored question"))]
        );
    }

    #[test]
    fn t12_routes_record_id_to_task_channel() {
        let signals = decode(r#"{"dataType":"t12","data":{"id":"rec-42"}}"#);
        assert_eq!(signals, vec![DecodeSignal::TaskId("rec-42".to_string())]);
    }

    #[test]
    fn t14_nested_progress_without_step_name() {
        let record = r#"data: {"dataType":"t14","data":{"type":"step_progress","step":"s2","status":"start","progressId":"p2"}}"#;
        match &decode(record)[..] {
            [DecodeSignal::Event(StreamEvent::Progress(p))] => {
                assert_eq!(p.step, "s2");
                assert_eq!(p.step_name, None);
                assert_eq!(p.status, ProgressStatus::Start);
            }
            other => panic!("unexpected signals: {other:?}"),
        }
    }

    #[test]
    fn t14_partial_progress_yields_nothing() {
        let record = r#"{"dataType":"t14","data":{"type":"step_progress","step":"s2","status":"start"}}"#;
        assert!(decode(record).is_empty());
    }

    #[test]
    fn t99_is_done() {
        assert_eq!(
            decode(r#"{"data":"DONE","dataType":"t99"}"#),
            vec![DecodeSignal::Event(StreamEvent::Done)]
        );
    }

    #[test]
    fn unknown_tag_is_silently_ignored() {
        assert!(decode(r#"{"dataType":"t03","data":{"content":"trace"}}"#).is_empty());
    }

    #[test]
    fn envelope_task_id_rides_alongside_content() {
        let record = r#"{"data":{"content":"tok"},"dataType":"t02","task_id":"task-7"}"#;
        assert_eq!(
            decode(record),
            vec![
                DecodeSignal::TaskId("task-7".to_string()),
                DecodeSignal::Event(StreamEvent::content("tok")),
            ]
        );
    }

    #[test]
    fn untagged_bare_content() {
        assert_eq!(
            decode(r#"{"content":"plain"}"#),
            vec![DecodeSignal::Event(StreamEvent::content("plain"))]
        );
    }

    #[test]
    fn untagged_progress_accepts_missing_step_name() {
        let record = r#"{"type":"step_progress","step":"s3","status":"complete","progressId":"p3"}"#;
        match &decode(record)[..] {
            [DecodeSignal::Event(StreamEvent::Progress(p))] => {
                assert_eq!(p.status, ProgressStatus::Complete);
            }
            other => panic!("unexpected signals: {other:?}"),
        }
    }

    #[test]
    fn malformed_record_renders_verbatim() {
        assert_eq!(
            decode("garbled {{"),
            vec![DecodeSignal::Event(StreamEvent::content("garbled {{"))]
        );
    }
}
