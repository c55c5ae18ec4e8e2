//! Camera wall over the simulated playback stack.

use std::time::Duration;

use camdeck_core::playback::SinkId;
use camdeck_core::{CamdeckConfig, CameraSettings, CameraWall, ConnectionState, WallError};
use camdeck_sim::{SimulatedBackend, SimulatedSink, SimulationConfig};

fn camera(title: &str) -> CameraSettings {
    CameraSettings::with_stream(title, format!("https://cams.example.com/{title}/index.m3u8"))
}

fn add(wall: &mut CameraWall, id: u64, settings: CameraSettings, sink: u64) -> Result<(), WallError> {
    let simulation = SimulationConfig {
        seed: id,
        ..SimulationConfig::default()
    };
    wall.add_camera(
        id,
        settings,
        Box::new(SimulatedBackend::new(simulation.clone())),
        Box::new(SimulatedSink::new(sink, simulation)),
    )
    .map(|_| ())
}

#[tokio::test(start_paused = true)]
async fn test_wall_connects_every_camera() {
    let mut wall = CameraWall::new(CamdeckConfig::deterministic_testing());
    add(&mut wall, 1, camera("lobby"), 10).unwrap();
    add(&mut wall, 2, camera("dock"), 11).unwrap();
    add(&mut wall, 3, camera("yard"), 12).unwrap();

    let opened = wall.open_all_live().await.unwrap();
    assert_eq!(opened.len(), 3);

    tokio::time::sleep(Duration::from_secs(1)).await;

    let snapshots = wall.snapshots().await.unwrap();
    let cameras: Vec<u64> = snapshots.iter().map(|(camera, _)| *camera).collect();
    assert_eq!(cameras, vec![1, 2, 3]);
    assert!(
        snapshots
            .iter()
            .all(|(_, snapshot)| snapshot.connection_state == ConnectionState::Connected)
    );

    wall.shutdown().await;
    assert!(wall.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_wall_rejects_shared_sink() {
    let mut wall = CameraWall::new(CamdeckConfig::deterministic_testing());
    add(&mut wall, 1, camera("lobby"), 10).unwrap();

    let err = add(&mut wall, 2, camera("dock"), 10).unwrap_err();

    assert_eq!(
        err,
        WallError::SinkInUse {
            sink: SinkId(10),
            camera: 1
        }
    );
    assert_eq!(wall.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_alert_ids_ordered_across_cameras() {
    let mut wall = CameraWall::new(CamdeckConfig::deterministic_testing());
    add(&mut wall, 1, CameraSettings::with_stream("lobby", "not a url"), 10).unwrap();
    add(&mut wall, 2, CameraSettings::with_stream("dock", ""), 11).unwrap();

    wall.open_all_live().await.unwrap();

    let lobby = wall.handle(1).unwrap().alerts().await.unwrap();
    let dock = wall.handle(2).unwrap().alerts().await.unwrap();
    assert_eq!(lobby.len(), 1);
    assert_eq!(dock.len(), 1);
    assert_eq!(lobby[0].camera, Some(1));
    assert_eq!(dock[0].camera, Some(2));
    assert!(lobby[0].id < dock[0].id);
}

#[tokio::test(start_paused = true)]
async fn test_removed_camera_stops_its_session() {
    let mut wall = CameraWall::new(CamdeckConfig::deterministic_testing());
    add(&mut wall, 1, camera("lobby"), 10).unwrap();
    add(&mut wall, 2, camera("dock"), 11).unwrap();
    let dock = wall.handle(2).cloned().unwrap();

    wall.remove_camera(2).await.unwrap();

    assert!(dock.snapshot().await.is_err());
    assert_eq!(wall.cameras().collect::<Vec<_>>(), vec![1]);
    assert!(wall.handle(1).unwrap().snapshot().await.is_ok());
}
