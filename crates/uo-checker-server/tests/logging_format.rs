// SPDX-License-Identifier: Apache-2.0

mod pipeline_support;

use pipeline_support::{harness, jpeg};
use serde_json::Value;
use std::io;
use std::sync::{Arc, Mutex};
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;
use uo_checker_model::IdentificationRequest;

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

struct BufferWriter(Arc<Mutex<Vec<u8>>>);

impl<'a> MakeWriter<'a> for SharedBuffer {
    type Writer = BufferWriter;

    fn make_writer(&'a self) -> Self::Writer {
        BufferWriter(Arc::clone(&self.0))
    }
}

impl io::Write for BufferWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .0
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "lock poisoned"))?;
        guard.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn json_lines(sink: &SharedBuffer) -> Vec<Value> {
    let bytes = sink.0.lock().expect("lock output").clone();
    String::from_utf8(bytes)
        .expect("utf8 log output")
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).expect("json log line"))
        .collect()
}

fn completed(lines: &[Value]) -> Vec<&Value> {
    lines
        .iter()
        .filter(|l| l["fields"]["message"] == "pipeline completed")
        .collect()
}

#[tokio::test]
async fn pipeline_completion_is_logged_as_structured_json() {
    let sink = SharedBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(sink.clone())
        .json()
        .with_max_level(Level::INFO)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let h = harness();
    let req = IdentificationRequest::new(jpeg(), "兵庫県");
    h.orchestrator.run(req.clone()).await;
    h.orchestrator.run(req).await;

    let lines = json_lines(&sink);
    let done = completed(&lines);
    assert_eq!(done.len(), 2);

    let miss = done[0];
    assert_eq!(miss["level"], "INFO");
    assert_eq!(miss["target"], "uo_checker_server::pipeline");
    assert_eq!(miss["fields"]["stage"], "done");
    assert_eq!(miss["fields"]["species"], "サバ");
    assert_eq!(miss["fields"]["cache_key"], "兵庫-サバ");
    assert_eq!(miss["fields"]["from_cache"], false);
    assert_eq!(miss["fields"]["fallback"], false);

    assert_eq!(done[1]["fields"]["from_cache"], true);

    assert!(lines
        .iter()
        .any(|l| l["fields"]["message"] == "species matched" && l["fields"]["pass"] == "web_keyword"));
}
