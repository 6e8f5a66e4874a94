use std::collections::BTreeMap;
use std::io::BufReader;

use serde_json::de::IoRead;
use serde_json::value::RawValue;
use serde_json::{Deserializer, Map, StreamDeserializer, Value};

use super::{Input, Record};
use crate::config::{IoConfig, JsonPolicy};
use crate::error::{Error, Result};

/// Newline-delimited JSON: one value decoded per call
pub struct JsonRecords {
    stream: StreamDeserializer<'static, IoRead<BufReader<Input>>, Box<RawValue>>,
    policy: JsonPolicy,
    done: bool,
}

impl JsonRecords {
    /// serde_json reads byte by byte, so the input gets a buffer of
    /// `input_buf_size` in front of it
    pub fn new(input: Input, config: &IoConfig) -> Self {
        let input = BufReader::with_capacity(config.input_buf_size.max(1), input);
        Self {
            stream: Deserializer::from_reader(input).into_iter::<Box<RawValue>>(),
            policy: config.json_policy,
            done: false,
        }
    }

    pub fn next_record(&mut self) -> Result<Option<Record>> {
        if self.done {
            return Ok(None);
        }
        match self.stream.next() {
            None => {
                self.done = true;
                Ok(None)
            }
            Some(Err(e)) => {
                self.done = true;
                if e.is_io() {
                    return Err(Error::read(e.into()));
                }
                match self.policy {
                    JsonPolicy::Strict => Err(Error::Json(e)),
                    JsonPolicy::Lenient => {
                        tracing::debug!(error = %e, "ending JSON source on decode error");
                        Ok(None)
                    }
                }
            }
            Some(Ok(raw)) => match serde_json::from_str::<Value>(raw.get())? {
                Value::Null => Ok(Some(Record::NoObject)),
                Value::Object(map) => Ok(Some(Record::Object {
                    text: raw.get().to_string(),
                    fields: flatten(map),
                })),
                _ => match self.policy {
                    JsonPolicy::Strict => Err(Error::NotAnObject),
                    JsonPolicy::Lenient => Ok(Some(Record::NoObject)),
                },
            },
        }
    }
}

fn flatten(map: Map<String, Value>) -> BTreeMap<String, String> {
    map.into_iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (key, text)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn reader(input: &'static str, policy: JsonPolicy) -> JsonRecords {
        let config = IoConfig::default().with_json_policy(policy);
        JsonRecords::new(Box::new(Cursor::new(input.as_bytes())), &config)
    }

    /// Counts the `read` calls made on it
    struct Counting {
        inner: Cursor<Vec<u8>>,
        calls: Arc<AtomicUsize>,
    }

    impl Read for Counting {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.read(buf)
        }
    }

    #[test]
    fn test_objects_become_field_maps() {
        let mut json = reader("{\"name\":\"ann\",\"age\":41}\n{\"name\":\"bo\"}\n", JsonPolicy::Strict);
        let Some(Record::Object { text, fields: first }) = json.next_record().unwrap() else {
            panic!("expected an object");
        };
        assert_eq!(first.get("name").map(String::as_str), Some("ann"));
        assert_eq!(first.get("age").map(String::as_str), Some("41"));
        assert_eq!(text, "{\"name\":\"ann\",\"age\":41}");
        assert!(matches!(json.next_record().unwrap(), Some(Record::Object { .. })));
        assert_eq!(json.next_record().unwrap(), None);
    }

    #[test]
    fn test_null_is_a_distinct_record() {
        let mut json = reader("null\n{\"a\":1}", JsonPolicy::Strict);
        assert_eq!(json.next_record().unwrap(), Some(Record::NoObject));
        assert!(matches!(json.next_record().unwrap(), Some(Record::Object { .. })));
    }

    #[test]
    fn test_nested_values_stay_json() {
        let mut json = reader("{\"tags\":[1,2],\"ok\":true}", JsonPolicy::Strict);
        let Some(Record::Object { fields: map, .. }) = json.next_record().unwrap() else {
            panic!("expected an object");
        };
        assert_eq!(map["tags"], "[1,2]");
        assert_eq!(map["ok"], "true");
    }

    #[test]
    fn test_strict_decode_error() {
        let mut json = reader("{\"a\":1}\n{oops", JsonPolicy::Strict);
        assert!(json.next_record().unwrap().is_some());
        assert!(matches!(json.next_record(), Err(Error::Json(_))));
        assert_eq!(json.next_record().unwrap(), None);
    }

    #[test]
    fn test_lenient_decode_error_ends_source() {
        let mut json = reader("{\"a\":1}\n{oops", JsonPolicy::Lenient);
        assert!(json.next_record().unwrap().is_some());
        assert_eq!(json.next_record().unwrap(), None);
    }

    #[test]
    fn test_non_object_values() {
        let mut strict = reader("42", JsonPolicy::Strict);
        assert!(matches!(strict.next_record(), Err(Error::NotAnObject)));
        let mut lenient = reader("42", JsonPolicy::Lenient);
        assert_eq!(lenient.next_record().unwrap(), Some(Record::NoObject));
    }

    #[test]
    fn test_input_is_buffered() {
        let data: String = (0..100).map(|i| format!("{{\"id\":{:>12}}}\n", i)).collect();
        let calls = Arc::new(AtomicUsize::new(0));
        let input = Counting {
            inner: Cursor::new(data.into_bytes()),
            calls: Arc::clone(&calls),
        };
        let config = IoConfig::default().with_input_buf_size(4096);
        let mut json = JsonRecords::new(Box::new(input), &config);
        let mut count = 0;
        while json.next_record().unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 100);
        assert!(calls.load(Ordering::SeqCst) <= 3);
    }
}
