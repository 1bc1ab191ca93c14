use serde_json::{Map, Value};

/// A single structured row: field name to JSON value.
pub type Record = Map<String, Value>;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum RecordBatchError {
    #[error("expected a top-level JSON array")]
    NotAnArray,

    #[error("element {index} is not a JSON object")]
    InvalidRecord { index: usize },
}

/// Ordered, fully materialized set of records handed to a single load.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordBatch(Vec<Record>);

impl RecordBatch {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.0.iter()
    }

    /// Newline-delimited JSON, one record per line.
    pub fn to_ndjson(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut out = Vec::new();
        for record in &self.0 {
            serde_json::to_writer(&mut out, record)?;
            out.push(b'\n');
        }
        Ok(out)
    }
}

impl TryFrom<Value> for RecordBatch {
    type Error = RecordBatchError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Array(items) = value else {
            return Err(RecordBatchError::NotAnArray);
        };

        items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Object(record) => Ok(record),
                _ => Err(RecordBatchError::InvalidRecord { index }),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(RecordBatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_array() {
        let batch = RecordBatch::try_from(json!([
            {"id_evento": "E1", "tipo": "click"},
            {"id_evento": "E2", "tipo": "view"}
        ]))
        .unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.iter().next().unwrap()["id_evento"], "E1");
        assert!(RecordBatch::try_from(json!([])).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_non_arrays() {
        assert_eq!(
            RecordBatch::try_from(json!({"id": 1})),
            Err(RecordBatchError::NotAnArray)
        );
        assert_eq!(
            RecordBatch::try_from(json!([{"id": 1}, 2])),
            Err(RecordBatchError::InvalidRecord { index: 1 })
        );
    }

    #[test]
    fn test_ndjson() {
        let batch = RecordBatch::try_from(json!([{"a": 1}, {"a": "x"}])).unwrap();
        let out = String::from_utf8(batch.to_ndjson().unwrap()).unwrap();
        assert_eq!(out, "{\"a\":1}\n{\"a\":\"x\"}\n");
    }
}
