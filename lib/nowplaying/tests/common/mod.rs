#![allow(dead_code)]

use async_trait::async_trait;
use nowplaying::{CodecRegistry, SnapshotProducer};
use shared::{Dataset, Record};
use std::collections::VecDeque;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

pub fn song(artist: &str, title: &str, name: &str) -> Record {
    Record::new()
        .with("artist", artist)
        .with("title", title)
        .with("name", name)
}

pub fn snapshot_xml(record: &Record) -> String {
    let mut doc = String::from("<output>\n");
    for (field, value) in record.iter() {
        doc.push_str(&format!("  <{field}>{value}</{field}>\n"));
    }
    doc.push_str("</output>\n");
    doc
}

/// Reads whatever is stored at `path` with the codec its extension selects.
pub fn load(path: &Path) -> Dataset {
    let registry = CodecRegistry::standard().unwrap();
    let resolved = registry.resolve(path);
    resolved.codec.read(&resolved.path).unwrap()
}

/// Producer that plays back a fixed list of snapshots, one per capture.
/// `None` entries produce no file, like a failed identification.
pub struct ScriptedProducer {
    script: Mutex<VecDeque<Option<String>>>,
}

impl ScriptedProducer {
    pub fn new(script: impl IntoIterator<Item = Option<Record>>) -> Self {
        Self {
            script: Mutex::new(
                script
                    .into_iter()
                    .map(|r| r.as_ref().map(snapshot_xml))
                    .collect(),
            ),
        }
    }

    /// Plays back documents verbatim, well formed or not.
    pub fn raw(script: impl IntoIterator<Item = Option<String>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
        }
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap().len()
    }
}

#[async_trait]
impl SnapshotProducer for ScriptedProducer {
    fn id(&self) -> &'static str {
        "scripted"
    }

    async fn capture(&self, target: &Path) -> nowplaying::Result<()> {
        let next = self.script.lock().unwrap().pop_front().flatten();
        if let Some(doc) = next {
            tokio::fs::write(target, doc).await.unwrap();
        }
        Ok(())
    }
}

/// Collects formatted log lines emitted on the current thread.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
