//! Editing session.
//!
//! Owns the loaded project, its recorded events and the derived trajectory.
//! Every mutation runs against a scratch copy of the timeline; on success the
//! change is recorded in [`History`] and the trajectory is recompiled before
//! the call returns, on failure the timeline is left untouched.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;

use glide_common::config::AppConfig;
use glide_common::error::GlideError;
use glide_processing_core::auto_zoom::{AutoZoomSynthesizer, SynthesisOutcome};
use glide_processing_core::cursor::CursorTrack;
use glide_processing_core::source::VideoSource;
use glide_processing_core::trajectory::{compile, CompileConfig};
use glide_project_model::event::InputEvent;
use glide_project_model::pose::{Easing, Pose, START_KEYFRAME_ID};
use glide_project_model::project::{LoadedProject, ProjectError};
use glide_project_model::timeline::{EffectiveTrajectory, Timeline, TimelineError};
use glide_render_engine::export::{
    export_project, export_trajectory, ExportJob, ExportProgress, ExportReport, FrameSink,
    ProgressCallback,
};

use crate::history::{History, Transaction};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Timeline(#[from] TimelineError),

    #[error(transparent)]
    Project(#[from] ProjectError),

    #[error(transparent)]
    Glide(#[from] GlideError),

    #[error("an export is already running")]
    ExportInProgress,

    #[error("no export is running")]
    NoExport,

    #[error("export failed: {0}")]
    ExportFailed(String),
}

/// The item the user has selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Keyframe(String),
    Region(String),
}

impl Selection {
    pub fn id(&self) -> &str {
        match self {
            Selection::Keyframe(id) | Selection::Region(id) => id,
        }
    }
}

/// Messages from a running export.
#[derive(Debug, Clone)]
pub enum ExportMessage {
    Progress(ExportProgress),
    Complete(ExportReport),
    Failed(String),
}

impl ExportMessage {
    fn is_terminal(&self) -> bool {
        !matches!(self, ExportMessage::Progress(_))
    }
}

struct ExportHandle {
    stop: Arc<AtomicBool>,
    receiver: mpsc::Receiver<ExportMessage>,
    worker: Option<JoinHandle<()>>,
}

impl ExportHandle {
    fn join(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("Export worker panicked");
            }
        }
    }
}

pub struct EditorSession {
    project: LoadedProject,
    events: Vec<InputEvent>,
    compile_config: CompileConfig,
    synthesizer: AutoZoomSynthesizer,
    trajectory: EffectiveTrajectory,
    selection: Option<Selection>,
    history: History,
    export: Option<ExportHandle>,
    dirty: bool,
}

impl EditorSession {
    pub fn new(project: LoadedProject, events: Vec<InputEvent>) -> Self {
        let mut session = Self {
            project,
            events,
            compile_config: CompileConfig::default(),
            synthesizer: AutoZoomSynthesizer::default(),
            trajectory: EffectiveTrajectory::default(),
            selection: None,
            history: History::default(),
            export: None,
            dirty: false,
        };
        session.recompute();
        session
    }

    /// Load a project bundle and its event stream from disk.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, SessionError> {
        let project = LoadedProject::load(root)?;
        let events = project.load_events()?;
        tracing::info!(
            project = %project.project.name,
            keyframes = project.timeline.keyframes.len(),
            regions = project.timeline.regions.len(),
            events = events.len(),
            "Opened editing session"
        );
        Ok(Self::new(project, events))
    }

    /// Pick up auto-zoom defaults from the application config.
    pub fn with_app_config(mut self, config: &AppConfig) -> Self {
        self.synthesizer = AutoZoomSynthesizer::from_defaults(&config.auto_zoom);
        self
    }

    pub fn with_compile_config(mut self, config: CompileConfig) -> Self {
        self.compile_config = config;
        self.recompute();
        self
    }

    pub fn project(&self) -> &LoadedProject {
        &self.project
    }

    pub fn timeline(&self) -> &Timeline {
        &self.project.timeline
    }

    pub fn events(&self) -> &[InputEvent] {
        &self.events
    }

    pub fn trajectory(&self) -> &EffectiveTrajectory {
        &self.trajectory
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// Unsaved edits exist.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn save(&mut self) -> Result<(), SessionError> {
        self.project.project.touch();
        self.project.save()?;
        self.dirty = false;
        tracing::info!(root = %self.project.root.display(), "Project saved");
        Ok(())
    }

    // ── Mutations ────────────────────────────────────────────────

    pub fn add_keyframe(
        &mut self,
        time: f64,
        pose: Pose,
        easing: Option<Easing>,
    ) -> Result<String, SessionError> {
        self.apply("add keyframe", |t| t.add_keyframe(time, pose, easing))
    }

    pub fn delete_keyframe(&mut self, id: &str) -> Result<(), SessionError> {
        self.apply("delete keyframe", |t| t.remove_keyframe(id).map(|_| ()))
    }

    pub fn set_keyframe_pose(
        &mut self,
        id: &str,
        pose: Pose,
        easing: Option<Easing>,
    ) -> Result<(), SessionError> {
        self.apply("edit keyframe", |t| t.set_keyframe_pose(id, pose, easing))
    }

    /// Change the pose of the `start` keyframe. Its time stays at zero.
    pub fn update_start_pose(&mut self, pose: Pose, easing: Option<Easing>) -> Result<(), SessionError> {
        self.apply("edit start pose", |t| {
            t.set_keyframe_pose(START_KEYFRAME_ID, pose, easing)
        })
    }

    pub fn retime_keyframe(&mut self, id: &str, time: f64) -> Result<(), SessionError> {
        self.apply("move keyframe", |t| t.retime_keyframe(id, time))
    }

    pub fn add_region(
        &mut self,
        start_time: f64,
        end_time: f64,
        target_zoom: f64,
        anchor_x: f64,
        anchor_y: f64,
    ) -> Result<String, SessionError> {
        self.apply("add region", |t| {
            t.add_region(start_time, end_time, target_zoom, anchor_x, anchor_y)
        })
    }

    pub fn resize_region(&mut self, id: &str, start_time: f64, end_time: f64) -> Result<(), SessionError> {
        self.apply("resize region", |t| t.resize_region(id, start_time, end_time))
    }

    pub fn delete_region(&mut self, id: &str) -> Result<(), SessionError> {
        self.apply("delete region", |t| t.remove_region(id).map(|_| ()))
    }

    /// Select a keyframe or region by id.
    pub fn select(&mut self, id: &str) -> Result<&Selection, SessionError> {
        let timeline = &self.project.timeline;
        let selection = if timeline.keyframe(id).is_some() {
            Selection::Keyframe(id.to_string())
        } else if timeline.region(id).is_some() {
            Selection::Region(id.to_string())
        } else {
            return Err(TimelineError::UnknownId { id: id.to_string() }.into());
        };
        Ok(&*self.selection.insert(selection))
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// Delete whatever is selected.
    pub fn delete_selected(&mut self) -> Result<(), SessionError> {
        match self.selection.clone() {
            Some(Selection::Keyframe(id)) => self.delete_keyframe(&id),
            Some(Selection::Region(id)) => self.delete_region(&id),
            None => Ok(()),
        }
    }

    /// Replace generated content with a fresh auto-zoom pass.
    ///
    /// The whole replacement is one undoable transaction. A cancelled or
    /// failed analysis leaves the timeline as it was.
    pub fn run_auto_zoom(
        &mut self,
        source: Option<&mut dyn VideoSource>,
        cancel: &AtomicBool,
    ) -> Result<SynthesisOutcome, SessionError> {
        let outcome = self.synthesizer.synthesize(&self.events, source, cancel)?;
        let keyframes = outcome.keyframes.clone();
        let regions = outcome.regions.clone();
        self.apply("auto-zoom", move |t| {
            t.replace_generated(keyframes, regions);
            Ok::<_, TimelineError>(())
        })?;
        Ok(outcome)
    }

    /// Revert the last edit. Returns its label.
    pub fn undo(&mut self) -> Option<String> {
        let (label, snapshot) = self.history.undo()?;
        self.restore(snapshot);
        tracing::debug!(%label, "Undo");
        Some(label)
    }

    /// Re-apply the last undone edit. Returns its label.
    pub fn redo(&mut self) -> Option<String> {
        let (label, snapshot) = self.history.redo()?;
        self.restore(snapshot);
        tracing::debug!(%label, "Redo");
        Some(label)
    }

    fn apply<T>(
        &mut self,
        label: &str,
        edit: impl FnOnce(&mut Timeline) -> Result<T, TimelineError>,
    ) -> Result<T, SessionError> {
        let mut scratch = self.project.timeline.clone();
        let value = edit(&mut scratch)?;

        let before = std::mem::replace(&mut self.project.timeline, scratch);
        let after = self.project.timeline.clone();
        if self.history.record(Transaction::new(label, before, after)) {
            self.dirty = true;
        }
        self.prune_selection();
        self.recompute();
        tracing::debug!(label, keyframes = self.trajectory.len(), "Timeline edited");
        Ok(value)
    }

    fn restore(&mut self, snapshot: Timeline) {
        self.project.timeline = snapshot;
        self.dirty = true;
        self.prune_selection();
        self.recompute();
    }

    fn prune_selection(&mut self) {
        let timeline = &self.project.timeline;
        let still_exists = match &self.selection {
            Some(Selection::Keyframe(id)) => timeline.keyframe(id).is_some(),
            Some(Selection::Region(id)) => timeline.region(id).is_some(),
            None => true,
        };
        if !still_exists {
            self.selection = None;
        }
    }

    fn recompute(&mut self) {
        let timeline = &self.project.timeline;
        self.trajectory = compile(
            &timeline.keyframes,
            &timeline.regions,
            &self.events,
            &self.compile_config,
        );
    }

    // ── Export ───────────────────────────────────────────────────

    /// Export the project with its own settings on a worker thread.
    ///
    /// The current timeline is rendered, including unsaved edits.
    pub fn start_export(&mut self, output: PathBuf) -> Result<(), SessionError> {
        let project = self.project.clone();
        self.spawn_export(move |stop, progress| async move {
            export_project(&project, output, stop, Some(progress)).await
        })
    }

    /// Export the current trajectory from an arbitrary source into a sink.
    pub fn start_export_to(
        &mut self,
        source: Box<dyn VideoSource>,
        sink: Box<dyn FrameSink>,
    ) -> Result<(), SessionError> {
        let job = ExportJob {
            trajectory: self.trajectory.clone(),
            cursor: CursorTrack::from_events(&self.events),
            style: self.project.project.canvas.clone(),
            config: self.project.project.export.clone(),
            start_secs: None,
            end_secs: None,
        };
        self.spawn_export(move |stop, progress| async move {
            export_trajectory(source, sink, job, stop, Some(progress)).await
        })
    }

    fn spawn_export<F, Fut>(&mut self, run: F) -> Result<(), SessionError>
    where
        F: FnOnce(Arc<AtomicBool>, ProgressCallback) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<ExportReport, GlideError>>,
    {
        if self.is_exporting() {
            return Err(SessionError::ExportInProgress);
        }
        // a finished handle may still hold its worker
        if let Some(mut finished) = self.export.take() {
            finished.join();
        }

        let stop = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel::<ExportMessage>();
        let worker_stop = stop.clone();

        let worker = std::thread::spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(err) => {
                    let _ = tx.send(ExportMessage::Failed(format!(
                        "Failed to create runtime: {err}"
                    )));
                    return;
                }
            };

            let tx_progress = tx.clone();
            let progress: ProgressCallback = Box::new(move |p| {
                let _ = tx_progress.send(ExportMessage::Progress(p));
            });

            let message = match runtime.block_on(run(worker_stop, progress)) {
                Ok(report) => ExportMessage::Complete(report),
                Err(err) => ExportMessage::Failed(err.to_string()),
            };
            let _ = tx.send(message);
        });

        tracing::info!("Export started");
        self.export = Some(ExportHandle {
            stop,
            receiver: rx,
            worker: Some(worker),
        });
        Ok(())
    }

    pub fn is_exporting(&self) -> bool {
        self.export
            .as_ref()
            .and_then(|handle| handle.worker.as_ref())
            .is_some_and(|worker| !worker.is_finished())
    }

    /// Ask the running export to stop. The output is still finalized.
    pub fn stop_export(&mut self) -> Result<(), SessionError> {
        let handle = self.export.as_ref().ok_or(SessionError::NoExport)?;
        handle.stop.store(true, Ordering::Relaxed);
        tracing::info!("Export stop requested");
        Ok(())
    }

    /// Drain pending export messages without blocking.
    pub fn poll_export(&mut self) -> Vec<ExportMessage> {
        let Some(handle) = self.export.as_mut() else {
            return vec![];
        };

        let mut messages = Vec::new();
        let mut finished = false;
        loop {
            match handle.receiver.try_recv() {
                Ok(message) => {
                    finished |= message.is_terminal();
                    messages.push(message);
                }
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => {
                    if !finished {
                        messages.push(ExportMessage::Failed(
                            "Export worker disconnected".to_string(),
                        ));
                    }
                    finished = true;
                    break;
                }
            }
        }

        if finished {
            if let Some(mut handle) = self.export.take() {
                handle.join();
            }
        }
        messages
    }

    /// Block until the running export ends and return its report.
    pub fn wait_export(&mut self) -> Result<ExportReport, SessionError> {
        let mut handle = self.export.take().ok_or(SessionError::NoExport)?;
        let outcome = loop {
            match handle.receiver.recv() {
                Ok(ExportMessage::Progress(_)) => continue,
                Ok(ExportMessage::Complete(report)) => break Ok(report),
                Ok(ExportMessage::Failed(error)) => break Err(SessionError::ExportFailed(error)),
                Err(_) => {
                    break Err(SessionError::ExportFailed(
                        "Export worker disconnected".to_string(),
                    ))
                }
            }
        };
        handle.join();
        outcome
    }
}

impl Drop for EditorSession {
    fn drop(&mut self) {
        if let Some(mut handle) = self.export.take() {
            handle.stop.store(true, Ordering::Relaxed);
            handle.join();
        }
    }
}
