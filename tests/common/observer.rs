//! Observer recording every notification of the engine.

use anyhow::Result;
use async_trait::async_trait;
use shared_playlists::library::Member;
use shared_playlists::{
    AggregationSettings, LibrarySource, ProcessingStatus, RunObserver, SharedLibrary,
    SharedPlaylist,
};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub struct Completion {
    pub run_id: String,
    pub status: ProcessingStatus,
    pub playlist_count: usize,
}

#[derive(Default)]
pub struct RecordingObserver {
    started: Mutex<Vec<(String, usize)>>,
    checkpoints: Mutex<Vec<(String, ProcessingStatus)>>,
    completions: Mutex<Vec<Completion>>,
}

impl RecordingObserver {
    /// Engine with default settings wired to a fresh recording observer.
    pub fn engine(source: impl LibrarySource + 'static) -> (SharedLibrary, Arc<RecordingObserver>) {
        Self::engine_with_settings(source, AggregationSettings::default())
    }

    pub fn engine_with_settings(
        source: impl LibrarySource + 'static,
        settings: AggregationSettings,
    ) -> (SharedLibrary, Arc<RecordingObserver>) {
        let observer = Arc::new(RecordingObserver::default());
        let engine = SharedLibrary::new(Arc::new(source), observer.clone(), settings).unwrap();
        (engine, observer)
    }

    /// (run id, member count) of each started run.
    pub fn started(&self) -> Vec<(String, usize)> {
        self.started.lock().unwrap().clone()
    }

    pub fn checkpoints(&self, run_id: &str) -> Vec<ProcessingStatus> {
        self.checkpoints
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == run_id)
            .map(|(_, status)| status.clone())
            .collect()
    }

    pub fn completions(&self) -> Vec<Completion> {
        self.completions.lock().unwrap().clone()
    }
}

#[async_trait]
impl RunObserver for RecordingObserver {
    async fn on_start(&self, run_id: &str, members: &[Member]) -> Result<()> {
        self.started
            .lock()
            .unwrap()
            .push((run_id.to_string(), members.len()));
        Ok(())
    }

    async fn checkpoint(&self, run_id: &str, status: &ProcessingStatus) -> Result<()> {
        self.checkpoints
            .lock()
            .unwrap()
            .push((run_id.to_string(), status.clone()));
        Ok(())
    }

    async fn on_complete(
        &self,
        run_id: &str,
        status: &ProcessingStatus,
        playlists: &[SharedPlaylist],
    ) {
        self.completions.lock().unwrap().push(Completion {
            run_id: run_id.to_string(),
            status: status.clone(),
            playlist_count: playlists.len(),
        });
    }
}

/// Where [`PanickingObserver`] blows up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanicPoint {
    Checkpoint,
    Completion,
}

/// Observer that panics at one notification and records completions it
/// survives.
pub struct PanickingObserver {
    at: PanicPoint,
    completions: Mutex<Vec<ProcessingStatus>>,
}

impl PanickingObserver {
    pub fn engine(
        source: impl LibrarySource + 'static,
        at: PanicPoint,
    ) -> (SharedLibrary, Arc<PanickingObserver>) {
        let observer = Arc::new(PanickingObserver {
            at,
            completions: Mutex::new(vec![]),
        });
        let engine = SharedLibrary::new(
            Arc::new(source),
            observer.clone(),
            AggregationSettings::default(),
        )
        .unwrap();
        (engine, observer)
    }

    pub fn completions(&self) -> Vec<ProcessingStatus> {
        self.completions.lock().unwrap().clone()
    }
}

#[async_trait]
impl RunObserver for PanickingObserver {
    async fn on_start(&self, _run_id: &str, _members: &[Member]) -> Result<()> {
        Ok(())
    }

    async fn checkpoint(&self, run_id: &str, _status: &ProcessingStatus) -> Result<()> {
        if self.at == PanicPoint::Checkpoint {
            panic!("checkpoint storage of {} is gone", run_id);
        }
        Ok(())
    }

    async fn on_complete(
        &self,
        run_id: &str,
        status: &ProcessingStatus,
        _playlists: &[SharedPlaylist],
    ) {
        if self.at == PanicPoint::Completion {
            panic!("could not persist results of {}", run_id);
        }
        self.completions.lock().unwrap().push(status.clone());
    }
}
