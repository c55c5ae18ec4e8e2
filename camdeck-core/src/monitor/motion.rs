//! Simulated motion detection.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::settings::{CameraSettings, MAX_MOTION_SENSITIVITY};

/// Rolls for motion on every tick while detection is enabled.
///
/// The probability of a detection per tick is `sensitivity / 100`. Seeding
/// the generator makes the sequence of detections reproducible.
#[derive(Debug, Clone)]
pub struct MotionMonitor {
    enabled: bool,
    sensitivity: u8,
    title: String,
    rng: ChaCha8Rng,
}

impl MotionMonitor {
    /// Creates a monitor for a camera; `seed` of None draws from entropy.
    pub fn new(settings: &CameraSettings, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_rng(&mut rand::rng()),
        };
        Self {
            enabled: settings.motion_detection,
            sensitivity: settings.motion_sensitivity.min(MAX_MOTION_SENSITIVITY),
            title: settings.title.clone(),
            rng,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn sensitivity(&self) -> u8 {
        self.sensitivity
    }

    /// Probability of a detection on a single tick.
    pub fn probability(&self) -> f64 {
        f64::from(self.sensitivity) / f64::from(MAX_MOTION_SENSITIVITY)
    }

    /// Rolls once. Returns the alert message when motion was detected.
    ///
    /// A disabled monitor never detects anything and does not consume
    /// randomness.
    pub fn tick(&mut self) -> Option<String> {
        if !self.enabled {
            return None;
        }
        let roll: f64 = self.rng.random();
        (roll < self.probability()).then(|| format!("Motion detected on {}", self.title))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(enabled: bool, sensitivity: u8) -> CameraSettings {
        CameraSettings {
            motion_detection: enabled,
            motion_sensitivity: sensitivity,
            ..CameraSettings::with_stream("Loading Dock", "https://cams.example.com/dock.m3u8")
        }
    }

    #[test]
    fn test_disabled_monitor_never_fires() {
        let mut monitor = MotionMonitor::new(&settings(false, 100), Some(1));
        assert!((0..100).all(|_| monitor.tick().is_none()));
    }

    #[test]
    fn test_sensitivity_bounds() {
        let mut always = MotionMonitor::new(&settings(true, 100), Some(1));
        assert!((0..100).all(|_| always.tick().is_some()));

        let mut never = MotionMonitor::new(&settings(true, 0), Some(1));
        assert!((0..100).all(|_| never.tick().is_none()));
    }

    #[test]
    fn test_seeded_monitors_agree() {
        let mut first = MotionMonitor::new(&settings(true, 40), Some(42));
        let mut second = MotionMonitor::new(&settings(true, 40), Some(42));

        let a: Vec<bool> = (0..64).map(|_| first.tick().is_some()).collect();
        let b: Vec<bool> = (0..64).map(|_| second.tick().is_some()).collect();
        assert_eq!(a, b);
        assert!(a.iter().any(|hit| *hit));
        assert!(a.iter().any(|hit| !*hit));
    }

    #[test]
    fn test_message_names_camera() {
        let mut monitor = MotionMonitor::new(&settings(true, 100), Some(3));
        assert_eq!(
            monitor.tick().as_deref(),
            Some("Motion detected on Loading Dock")
        );
    }

    #[test]
    fn test_sensitivity_is_clamped() {
        let monitor = MotionMonitor::new(&settings(true, 250), None);
        assert_eq!(monitor.sensitivity(), 100);
        assert!((monitor.probability() - 1.0).abs() < f64::EPSILON);
    }
}
