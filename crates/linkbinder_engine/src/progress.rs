use linkbinder_core::ExportProgress;

/// Receives progress snapshots during one export call.
///
/// There is no backpressure; implementations must not block inside `emit`.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, progress: ExportProgress);
}

/// Discards all progress.
#[derive(Debug, Default)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn emit(&self, _progress: ExportProgress) {}
}

/// Forwards progress into an mpsc channel; a disconnected receiver is
/// ignored so a departed listener cannot fail an export.
pub struct ChannelProgressSink {
    tx: std::sync::mpsc::Sender<ExportProgress>,
}

impl ChannelProgressSink {
    pub fn new(tx: std::sync::mpsc::Sender<ExportProgress>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, progress: ExportProgress) {
        let _ = self.tx.send(progress);
    }
}
