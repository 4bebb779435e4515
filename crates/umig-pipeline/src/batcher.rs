//! Size-bounded batching of newline-delimited JSON records
//!
//! [`StreamBatcher`] decodes records one at a time with serde_json's
//! streaming deserializer, which accepts any whitespace (newlines included)
//! between documents. One record per line and pretty-printed concatenated
//! objects are therefore both accepted.
//!
//! Batching rule: a record's size is its compact re-serialized length after
//! the transform hook ran. If appending it would push a non-empty batch past
//! `max_batch_bytes`, the batch is closed first. The cap is soft: a record
//! larger than the cap becomes a batch of its own.

use serde_json::de::IoRead;
use serde_json::{StreamDeserializer, Value};
use std::io::Read;
use umig_common::{MigrateError, Result};

use crate::types::Record;

/// Hook applied to every record before it is sized and batched
pub trait RecordTransform: Send + Sync {
    fn apply(&self, record: &mut Record);
}

impl<F> RecordTransform for F
where
    F: Fn(&mut Record) + Send + Sync,
{
    fn apply(&self, record: &mut Record) {
        self(record)
    }
}

/// Force one field to a fixed value, inserting it when absent
#[derive(Debug, Clone)]
pub struct SetField {
    field: String,
    value: Value,
}

impl SetField {
    pub fn new(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

impl RecordTransform for SetField {
    fn apply(&self, record: &mut Record) {
        record.insert(self.field.clone(), self.value.clone());
    }
}

/// An ordered, non-empty group of records imported as one job
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    records: Vec<Record>,
    size_bytes: usize,
}

impl Batch {
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always false for batches produced by [`StreamBatcher`]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sum of the compact serialized sizes of the records
    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }
}

/// Lazily splits a record stream into [`Batch`]es
///
/// The iterator is finite and not restartable. The first malformed record
/// yields an error and ends the iteration.
pub struct StreamBatcher<R: Read> {
    records: StreamDeserializer<'static, IoRead<R>, Value>,
    max_batch_bytes: usize,
    transform: Option<Box<dyn RecordTransform>>,
    current: Vec<Record>,
    current_size: usize,
    decoded: usize,
    finished: bool,
}

impl<R: Read> StreamBatcher<R> {
    /// Create a batcher over `reader`
    ///
    /// # Errors
    /// [`MigrateError::Config`] when `max_batch_bytes` is zero.
    pub fn new(reader: R, max_batch_bytes: usize) -> Result<Self> {
        if max_batch_bytes == 0 {
            return Err(MigrateError::config("max batch size must be greater than zero"));
        }

        Ok(Self {
            records: serde_json::Deserializer::from_reader(reader).into_iter::<Value>(),
            max_batch_bytes,
            transform: None,
            current: Vec::new(),
            current_size: 0,
            decoded: 0,
            finished: false,
        })
    }

    /// Apply `transform` to every record before sizing it
    pub fn with_transform(mut self, transform: impl RecordTransform + 'static) -> Self {
        self.transform = Some(Box::new(transform));
        self
    }

    /// Number of records decoded so far
    pub fn records_decoded(&self) -> usize {
        self.decoded
    }

    fn take_batch(&mut self) -> Batch {
        let batch = Batch {
            records: std::mem::take(&mut self.current),
            size_bytes: self.current_size,
        };
        self.current_size = 0;
        batch
    }

    fn fail(&mut self, err: MigrateError) -> Option<Result<Batch>> {
        self.finished = true;
        self.current.clear();
        Some(Err(err))
    }
}

impl<R: Read> Iterator for StreamBatcher<R> {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            let value = match self.records.next() {
                Some(Ok(value)) => value,
                Some(Err(e)) if e.is_io() => return self.fail(MigrateError::Io(e.into())),
                Some(Err(e)) => {
                    let index = self.decoded + 1;
                    return self.fail(MigrateError::decode(format!(
                        "record {} is not valid JSON: {}",
                        index, e
                    )));
                },
                None => {
                    self.finished = true;
                    if self.current.is_empty() {
                        return None;
                    }
                    return Some(Ok(self.take_batch()));
                },
            };

            self.decoded += 1;
            let mut record = match value {
                Value::Object(record) => record,
                other => {
                    let index = self.decoded;
                    return self.fail(MigrateError::decode(format!(
                        "record {} is a JSON {} rather than an object",
                        index,
                        json_type_name(&other)
                    )));
                },
            };

            if let Some(ref transform) = self.transform {
                transform.apply(&mut record);
            }

            let size = match serialized_len(&record) {
                Ok(size) => size,
                Err(e) => return self.fail(e),
            };

            let closed = if !self.current.is_empty()
                && self.current_size + size > self.max_batch_bytes
            {
                Some(self.take_batch())
            } else {
                None
            };

            self.current.push(record);
            self.current_size += size;

            if let Some(batch) = closed {
                return Some(Ok(batch));
            }
        }
    }
}

/// Compact serialized length without materializing the bytes
fn serialized_len(record: &Record) -> Result<usize> {
    struct Counter(usize);

    impl std::io::Write for Counter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0 += buf.len();
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    let mut counter = Counter(0);
    serde_json::to_writer(&mut counter, record)?;
    Ok(counter.0)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn batch_all(input: &str, max: usize) -> Result<Vec<Batch>> {
        StreamBatcher::new(input.as_bytes(), max)?.collect()
    }

    fn user_ids(batch: &Batch) -> Vec<String> {
        batch
            .records()
            .iter()
            .map(|r| r["user_id"].as_str().unwrap().to_string())
            .collect()
    }

    const THREE_USERS: &str = r#"{"user_id": "1", "email": "user1@example.com", "email_verified": true}
{"user_id": "2", "email": "user2@example.com", "email_verified": true}
{"user_id": "3", "email": "user3@example.com", "email_verified": true}"#;

    #[test]
    fn test_splits_on_size() {
        let batches = batch_all(THREE_USERS, 100).unwrap();

        assert!(batches.len() > 1);
        for batch in &batches {
            assert!(!batch.is_empty());
        }
    }

    #[test]
    fn test_single_batch_when_cap_is_large() {
        let batches = batch_all(THREE_USERS, 1_000_000).unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(user_ids(&batches[0]), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_cap_is_checked_before_append() {
        // Each record serializes to exactly 15 bytes.
        let input = "{\"user_id\":\"1\"}\n{\"user_id\":\"2\"}\n{\"user_id\":\"3\"}\n";
        let batches = batch_all(input, 30).unwrap();

        assert_eq!(batches.len(), 2);
        assert_eq!(user_ids(&batches[0]), vec!["1", "2"]);
        assert_eq!(batches[0].size_bytes(), 30);
        assert_eq!(user_ids(&batches[1]), vec!["3"]);
    }

    #[test]
    fn test_records_decoded_counts_every_record() {
        let mut batcher = StreamBatcher::new(THREE_USERS.as_bytes(), 100).unwrap();
        assert_eq!(batcher.records_decoded(), 0);

        let batches = batcher.by_ref().collect::<Result<Vec<_>>>().unwrap();
        let total: usize = batches.iter().map(Batch::len).sum();
        assert_eq!(batcher.records_decoded(), 3);
        assert_eq!(total, 3);
    }

    #[test]
    fn test_oversized_record_is_singleton() {
        let big = "x".repeat(500);
        let input = format!(
            "{{\"user_id\":\"1\"}}\n{{\"user_id\":\"2\",\"blob\":\"{}\"}}\n{{\"user_id\":\"3\"}}\n",
            big
        );
        let batches = batch_all(&input, 100).unwrap();

        assert_eq!(batches.len(), 3);
        assert_eq!(user_ids(&batches[1]), vec!["2"]);
        assert!(batches[1].size_bytes() > 100);
    }

    #[test]
    fn test_empty_input_yields_no_batches() {
        assert!(batch_all("", 100).unwrap().is_empty());
        assert!(batch_all("  \n\n\t ", 100).unwrap().is_empty());
    }

    #[test]
    fn test_tolerates_multiline_documents() {
        let input = "{\n  \"user_id\": \"1\"\n}\n\n   {\"user_id\":\"2\"}{\"user_id\":\"3\"}";
        let batches = batch_all(input, 1_000).unwrap();
        assert_eq!(user_ids(&batches[0]), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_malformed_record_aborts() {
        let input = "{\"user_id\":\"1\"}\n{\"user_id\": oops}\n{\"user_id\":\"3\"}\n";
        let mut batcher = StreamBatcher::new(input.as_bytes(), 1_000).unwrap();

        let err = batcher.next().unwrap().unwrap_err();
        assert!(matches!(err, MigrateError::Decode(ref msg) if msg.contains("record 2")));
        assert!(batcher.next().is_none());
    }

    #[test]
    fn test_non_object_record_is_rejected() {
        let err = batch_all("{\"user_id\":\"1\"}\n[1,2]\n", 1_000).unwrap_err();
        assert!(matches!(err, MigrateError::Decode(ref msg) if msg.contains("array")));
    }

    #[test]
    fn test_zero_cap_is_rejected() {
        assert!(matches!(
            StreamBatcher::new(&b""[..], 0),
            Err(MigrateError::Config(_))
        ));
    }

    #[test]
    fn test_transform_runs_before_sizing() {
        let input = "{\"user_id\":\"1\"}\n{\"user_id\":\"2\"}\n";
        let batches: Vec<Batch> = StreamBatcher::new(input.as_bytes(), 1_000)
            .unwrap()
            .with_transform(SetField::new("email_verified", true))
            .collect::<Result<_>>()
            .unwrap();

        let record = &batches[0].records()[0];
        assert_eq!(record["email_verified"], json!(true));
        // {"email_verified":true,"user_id":"1"}
        assert_eq!(batches[0].size_bytes(), 2 * 37);
    }

    #[test]
    fn test_set_field_overrides_existing_value() {
        let mut record = json!({"user_id": "1", "email_verified": false})
            .as_object()
            .cloned()
            .unwrap();
        SetField::new("email_verified", true).apply(&mut record);
        assert_eq!(record["email_verified"], json!(true));
    }

    #[test]
    fn test_closure_transform() {
        let input = "{\"user_id\":\"1\",\"password\":\"secret\"}";
        let batches: Vec<Batch> = StreamBatcher::new(input.as_bytes(), 1_000)
            .unwrap()
            .with_transform(|record: &mut Record| {
                record.remove("password");
            })
            .collect::<Result<_>>()
            .unwrap();
        assert!(!batches[0].records()[0].contains_key("password"));
    }

    fn record_strategy() -> impl Strategy<Value = Record> {
        ("[a-z0-9]{1,12}", "[a-z]{0,40}").prop_map(|(id, name)| {
            json!({"user_id": id, "name": name}).as_object().cloned().unwrap()
        })
    }

    proptest! {
        #[test]
        fn prop_batches_partition_the_stream(
            records in prop::collection::vec(record_strategy(), 0..60),
            max in 1usize..400,
        ) {
            let input: String = records
                .iter()
                .map(|r| serde_json::to_string(r).unwrap() + "\n")
                .collect();

            let batches = batch_all(&input, max).unwrap();
            let rejoined: Vec<Record> =
                batches.iter().flat_map(|b| b.records().iter().cloned()).collect();

            prop_assert_eq!(&rejoined, &records);
            for batch in &batches {
                prop_assert!(!batch.is_empty());
                if batch.len() > 1 {
                    prop_assert!(batch.size_bytes() <= max);
                }
            }
        }
    }
}
