//! Camera wall: the data side of a multi-camera grid.
//!
//! Each slot pairs a camera with its own session actor and video sink. Two
//! slots never share a sink.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::alerts::AlertIds;
use crate::config::CamdeckConfig;
use crate::engine::{SessionError, SessionHandle, spawn_session};
use crate::playback::{SinkId, StreamingBackend, VideoSink};
use crate::session::SessionSnapshot;
use crate::settings::{CameraId, CameraSettings};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WallError {
    #[error("camera {camera} is already on the wall")]
    DuplicateCamera { camera: CameraId },

    #[error("{sink} is already used by camera {camera}")]
    SinkInUse { sink: SinkId, camera: CameraId },

    #[error("camera {camera} is not on the wall")]
    UnknownCamera { camera: CameraId },

    #[error(transparent)]
    Session(#[from] SessionError),
}

#[derive(Debug)]
struct WallSlot {
    sink: SinkId,
    title: String,
    handle: SessionHandle,
}

/// Sessions of every camera currently on the wall, ordered by camera id.
///
/// All slots draw alert ids from one source, so alerts from different
/// cameras still order by creation.
#[derive(Debug)]
pub struct CameraWall {
    config: CamdeckConfig,
    alert_ids: AlertIds,
    slots: BTreeMap<CameraId, WallSlot>,
}

impl CameraWall {
    pub fn new(config: CamdeckConfig) -> Self {
        Self {
            config,
            alert_ids: AlertIds::new(),
            slots: BTreeMap::new(),
        }
    }

    /// Adds a camera slot and spawns its session. Nothing is opened yet.
    ///
    /// # Errors
    /// - `WallError::DuplicateCamera` - Camera already has a slot
    /// - `WallError::SinkInUse` - Another slot already renders into `sink`
    pub fn add_camera(
        &mut self,
        camera: CameraId,
        settings: CameraSettings,
        backend: Box<dyn StreamingBackend>,
        sink: Box<dyn VideoSink>,
    ) -> Result<SessionHandle, WallError> {
        if self.slots.contains_key(&camera) {
            return Err(WallError::DuplicateCamera { camera });
        }

        let sink_id = sink.id();
        if let Some((&owner, _)) = self.slots.iter().find(|(_, slot)| slot.sink == sink_id) {
            return Err(WallError::SinkInUse {
                sink: sink_id,
                camera: owner,
            });
        }

        let title = settings.title.clone();
        let handle = spawn_session(
            camera,
            settings,
            &self.config,
            backend,
            sink,
            self.alert_ids.clone(),
        );
        tracing::info!(camera, %sink_id, "Added '{}' to camera wall", title);

        self.slots.insert(
            camera,
            WallSlot {
                sink: sink_id,
                title,
                handle: handle.clone(),
            },
        );
        Ok(handle)
    }

    /// Removes a slot and shuts its session down.
    ///
    /// # Errors
    /// - `WallError::UnknownCamera` - No slot for `camera`
    pub async fn remove_camera(&mut self, camera: CameraId) -> Result<(), WallError> {
        let slot = self
            .slots
            .remove(&camera)
            .ok_or(WallError::UnknownCamera { camera })?;

        if let Err(e) = slot.handle.shutdown().await {
            tracing::debug!(camera, "Session of '{}' already stopped: {}", slot.title, e);
        }
        tracing::info!(camera, "Removed '{}' from camera wall", slot.title);
        Ok(())
    }

    pub fn handle(&self, camera: CameraId) -> Option<&SessionHandle> {
        self.slots.get(&camera).map(|slot| &slot.handle)
    }

    pub fn cameras(&self) -> impl Iterator<Item = CameraId> + '_ {
        self.slots.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Opens every camera's live stream.
    ///
    /// # Errors
    /// - `WallError::Session` - A session actor has stopped
    pub async fn open_all_live(&self) -> Result<Vec<(CameraId, SessionSnapshot)>, WallError> {
        let mut snapshots = Vec::with_capacity(self.slots.len());
        for (&camera, slot) in &self.slots {
            snapshots.push((camera, slot.handle.open_live().await?));
        }
        Ok(snapshots)
    }

    /// Current snapshot of every slot.
    ///
    /// # Errors
    /// - `WallError::Session` - A session actor has stopped
    pub async fn snapshots(&self) -> Result<Vec<(CameraId, SessionSnapshot)>, WallError> {
        let mut snapshots = Vec::with_capacity(self.slots.len());
        for (&camera, slot) in &self.slots {
            snapshots.push((camera, slot.handle.snapshot().await?));
        }
        Ok(snapshots)
    }

    /// Removes every slot.
    pub async fn shutdown(&mut self) {
        let cameras: Vec<CameraId> = self.cameras().collect();
        for camera in cameras {
            // Only fails for unknown cameras, and these were just listed
            let _ = self.remove_camera(camera).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_mocks::{RecordingBackend, RecordingSink};

    fn settings(title: &str) -> CameraSettings {
        CameraSettings::with_stream(title, format!("https://cams.example.com/{title}.m3u8"))
    }

    #[tokio::test]
    async fn test_sink_cannot_be_shared() {
        let mut wall = CameraWall::new(CamdeckConfig::default());
        wall.add_camera(
            1,
            settings("lobby"),
            Box::new(RecordingBackend::new()),
            Box::new(RecordingSink::new(10)),
        )
        .unwrap();

        let err = wall
            .add_camera(
                2,
                settings("dock"),
                Box::new(RecordingBackend::new()),
                Box::new(RecordingSink::new(10)),
            )
            .unwrap_err();
        assert_eq!(
            err,
            WallError::SinkInUse {
                sink: SinkId(10),
                camera: 1
            }
        );
        assert_eq!(wall.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_camera_rejected() {
        let mut wall = CameraWall::new(CamdeckConfig::default());
        wall.add_camera(
            1,
            settings("lobby"),
            Box::new(RecordingBackend::new()),
            Box::new(RecordingSink::new(10)),
        )
        .unwrap();

        let err = wall
            .add_camera(
                1,
                settings("lobby"),
                Box::new(RecordingBackend::new()),
                Box::new(RecordingSink::new(11)),
            )
            .unwrap_err();
        assert_eq!(err, WallError::DuplicateCamera { camera: 1 });
    }

    #[tokio::test]
    async fn test_remove_shuts_session_down() {
        let mut wall = CameraWall::new(CamdeckConfig::default());
        let backend = RecordingBackend::new();
        let handle = wall
            .add_camera(
                4,
                settings("yard"),
                Box::new(backend.clone()),
                Box::new(RecordingSink::new(1)),
            )
            .unwrap();
        wall.open_all_live().await.unwrap();
        assert_eq!(backend.live_clients(), 1);

        wall.remove_camera(4).await.unwrap();

        assert_eq!(backend.live_clients(), 0);
        assert!(handle.snapshot().await.is_err());
        assert_eq!(
            wall.remove_camera(4).await,
            Err(WallError::UnknownCamera { camera: 4 })
        );
    }

    #[tokio::test]
    async fn test_sink_reusable_after_removal() {
        let mut wall = CameraWall::new(CamdeckConfig::default());
        wall.add_camera(
            1,
            settings("lobby"),
            Box::new(RecordingBackend::new()),
            Box::new(RecordingSink::new(10)),
        )
        .unwrap();
        wall.remove_camera(1).await.unwrap();

        assert!(
            wall.add_camera(
                2,
                settings("dock"),
                Box::new(RecordingBackend::new()),
                Box::new(RecordingSink::new(10)),
            )
            .is_ok()
        );
        assert_eq!(wall.cameras().collect::<Vec<_>>(), vec![2]);
    }
}
