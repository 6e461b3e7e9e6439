use crate::error::{IoError, IoResult};
use crate::reader::Writer;
use tokio::sync::{mpsc, oneshot};

enum Job {
    Write(Vec<u8>, oneshot::Sender<IoResult<()>>),
}

/// Wraps a `Writer` so callers never block on the underlying transport
/// (`IO/AsyncWriter.hpp`): writes are enqueued onto a single background
/// task that drains them in submission order, so two callers racing to
/// submit never interleave their bytes on the wire.
pub struct AsyncWriter {
    sender: mpsc::UnboundedSender<Job>,
}

impl AsyncWriter {
    pub fn new<W: Writer + 'static>(mut inner: W) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();
        tokio::spawn(async move {
            while let Some(Job::Write(data, ack)) = receiver.recv().await {
                let result = inner.write(&data).await;
                let _ = ack.send(result);
            }
        });
        AsyncWriter { sender }
    }

    /// Submits `data` for writing, returning a future that resolves once
    /// this specific write has completed (not merely been accepted).
    pub async fn write(&self, data: &[u8]) -> IoResult<()> {
        let (ack, done) = oneshot::channel();
        self.sender
            .send(Job::Write(data.to_vec(), ack))
            .map_err(|_| IoError::EndOfFile)?;
        done.await.map_err(|_| IoError::EndOfFile)?
    }
}

#[async_trait::async_trait]
impl Writer for AsyncWriter {
    async fn write(&mut self, data: &[u8]) -> IoResult<()> {
        AsyncWriter::write(self, data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct RecordingWriter {
        log: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    #[async_trait::async_trait]
    impl Writer for RecordingWriter {
        async fn write(&mut self, data: &[u8]) -> IoResult<()> {
            self.log.lock().unwrap().push(data.to_vec());
            Ok(())
        }
    }

    #[tokio::test]
    async fn preserves_submission_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let writer = AsyncWriter::new(RecordingWriter { log: log.clone() });
        writer.write(b"one").await.unwrap();
        writer.write(b"two").await.unwrap();
        writer.write(b"three").await.unwrap();
        let recorded = log.lock().unwrap();
        assert_eq!(
            *recorded,
            vec![b"one".to_vec(), b"two".to_vec(), b"three".to_vec()]
        );
    }
}
