//! # Frame Loop
//!
//! The per-frame animation and submission protocol, independent of any window or GPU.
//!
//! ## States
//!
//! ```text
//!  Idle ──start──▶ Running ──device lost──▶ Suspended ──begin_rebuild──▶ Rebuilding
//!                     ▲                            ▲                         │
//!                     │                            └───── abort_rebuild ─────┤
//!                     └──────────────────── finish_rebuild ──────────────────┘
//!
//!  any state ──stop signal──▶ Stopped
//! ```
//!
//! ## One Tick
//!
//! While `Running`, every call to [`FrameLoop::tick`]:
//!
//! 1. asks the target whether the device was lost, and suspends without touching the GPU if
//!    so;
//! 2. advances the orbit angle by the configured step and wraps it into `[0, 2π)`;
//! 3. moves the camera to `(sin(a) * radius, height, cos(a) * radius)`;
//! 4. packs the camera's view-projection matrix and position into [`FrameUniforms`];
//! 5. writes them to the [`FrameTarget`];
//! 6. asks the target to record, submit and present the frame.
//!
//! The host schedules the next tick (on `winit`, by requesting a redraw), so ticks follow the
//! display's refresh rate. Ticks in any other state change nothing.
//!
//! The GPU side is reached only through [`FrameTarget`], so the protocol can be tested with a
//! recording mock.

use std::f64::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use nalgebra_glm as glm;
use web_time::{Duration, Instant};

use crate::camera::Camera;
use crate::error::{FrameError, Result};
use crate::settings::OrbitSettings;
use crate::uniform_buffer::FrameUniforms;

/// What a frame loop drives every tick.
pub trait FrameTarget {
    /// Whether the GPU device was lost since the last check. Checked before any other call
    /// of the tick, so a lost device is never waited on or written to.
    fn device_lost(&mut self) -> bool;

    /// Replaces the uniform data read by the next frame.
    fn update_uniforms(&mut self, uniforms: &FrameUniforms);

    /// Records, submits and presents one frame.
    fn record_and_submit_frame(&mut self) -> std::result::Result<(), FrameError>;
}

/// Lifecycle state of a [`FrameLoop`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    /// GPU resources are not ready yet.
    Idle,
    /// Frames are being produced.
    Running,
    /// The device was lost; waiting for a rebuild.
    Suspended,
    /// GPU resources are being recreated.
    Rebuilding,
    /// The loop was stopped and will not produce frames again.
    Stopped,
}

/// Result of a single [`FrameLoop::tick`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// A frame was submitted and presented.
    Presented,
    /// The frame was dropped; the next tick may succeed.
    Skipped,
    /// The loop is not running yet, or is rebuilding.
    Idle,
    /// The device was lost; GPU resources must be rebuilt.
    Suspended,
    /// The stop signal was raised.
    Stopped,
}

/// A cloneable flag that stops a [`FrameLoop`] at its next tick.
#[derive(Clone, Debug, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests the loop to stop.
    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// The camera's position on its circular path.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Orbit {
    /// Current angle in radians, always in `[0, 2π)`.
    ///
    /// Accumulated in `f64` so thousands of small steps do not drift.
    angle: f64,
    settings: OrbitSettings,
}

impl Orbit {
    pub fn new(settings: OrbitSettings) -> Self {
        Self {
            angle: settings.start_angle.rem_euclid(TAU),
            settings,
        }
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// Adds one step to the angle.
    pub fn advance(&mut self) {
        self.angle = (self.angle + self.settings.step).rem_euclid(TAU);
    }

    /// Camera position for the current angle.
    pub fn position(&self) -> glm::Vec3 {
        let (sin, cos) = self.angle.sin_cos();
        let radius = f64::from(self.settings.radius);
        glm::vec3(
            (sin * radius) as f32,
            self.settings.height,
            (cos * radius) as f32,
        )
    }
}

/// Logs the frame rate at `debug` level roughly once per second.
#[derive(Debug)]
struct FrameStats {
    frames: u32,
    window_start: Instant,
}

impl FrameStats {
    const REPORT_INTERVAL: Duration = Duration::from_secs(1);

    fn new() -> Self {
        Self {
            frames: 0,
            window_start: Instant::now(),
        }
    }

    fn record_frame(&mut self) {
        self.frames += 1;
        let elapsed = self.window_start.elapsed();
        if elapsed >= Self::REPORT_INTERVAL {
            log::debug!(
                "{:.1} frames per second",
                f64::from(self.frames) / elapsed.as_secs_f64()
            );
            self.frames = 0;
            self.window_start = Instant::now();
        }
    }
}

/// Animation state and the per-frame protocol.
#[derive(Debug)]
pub struct FrameLoop {
    state: LoopState,
    orbit: Orbit,
    camera: Camera,
    stop: StopSignal,
    stats: FrameStats,
}

impl FrameLoop {
    /// Creates an idle loop. The camera starts on the orbit at the configured start angle.
    pub fn new(camera: Camera, orbit: OrbitSettings) -> Self {
        let orbit = Orbit::new(orbit);
        let mut camera = camera;
        camera.position = orbit.position();
        Self {
            state: LoopState::Idle,
            orbit,
            camera,
            stop: StopSignal::new(),
            stats: FrameStats::new(),
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Current orbit angle in radians.
    pub fn angle(&self) -> f64 {
        self.orbit.angle()
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Mutable access to the camera, e.g. to update its aspect ratio.
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// A handle that stops this loop when raised.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Starts producing frames. Only has an effect on an idle loop.
    pub fn start(&mut self) {
        if self.state == LoopState::Idle {
            log::info!("Frame loop running");
            self.state = LoopState::Running;
        }
    }

    /// Runs one tick against `target`.
    ///
    /// # Errors
    ///
    /// Returns the fatal error if the frame failed unrecoverably. The loop stays `Running`
    /// in that case; the caller decides whether to stop.
    pub fn tick<T: FrameTarget>(&mut self, target: &mut T) -> Result<TickOutcome> {
        if self.stop.is_stopped() {
            if self.state != LoopState::Stopped {
                log::info!("Frame loop stopped");
                self.state = LoopState::Stopped;
            }
            return Ok(TickOutcome::Stopped);
        }

        match self.state {
            LoopState::Running => {}
            LoopState::Suspended => return Ok(TickOutcome::Suspended),
            LoopState::Stopped => return Ok(TickOutcome::Stopped),
            LoopState::Idle | LoopState::Rebuilding => return Ok(TickOutcome::Idle),
        }

        if target.device_lost() {
            self.device_lost();
            return Ok(TickOutcome::Suspended);
        }

        self.orbit.advance();
        self.camera.position = self.orbit.position();
        let uniforms = FrameUniforms::pack(
            &self.camera.view_projection_matrix(),
            &self.camera.position,
        );
        target.update_uniforms(&uniforms);

        match target.record_and_submit_frame() {
            Ok(()) => {
                self.stats.record_frame();
                Ok(TickOutcome::Presented)
            }
            Err(FrameError::Skipped(reason)) => {
                log::warn!("Frame skipped: {reason}");
                Ok(TickOutcome::Skipped)
            }
            Err(FrameError::DeviceLost) => {
                self.device_lost();
                Ok(TickOutcome::Suspended)
            }
            Err(FrameError::Fatal(error)) => Err(error),
        }
    }

    /// Suspends a running loop after the device was lost.
    pub fn device_lost(&mut self) {
        if self.state == LoopState::Running {
            log::warn!("Frame loop suspended until GPU resources are rebuilt");
            self.state = LoopState::Suspended;
        }
    }

    /// Marks the start of a resource rebuild. Returns `false` unless the loop was suspended.
    pub fn begin_rebuild(&mut self) -> bool {
        if self.state == LoopState::Suspended {
            self.state = LoopState::Rebuilding;
            true
        } else {
            false
        }
    }

    /// Returns a rebuilding loop to `Suspended` after the rebuild failed, so it can be retried.
    pub fn abort_rebuild(&mut self) {
        if self.state == LoopState::Rebuilding {
            log::warn!("GPU resource rebuild failed; frame loop stays suspended");
            self.state = LoopState::Suspended;
        }
    }

    /// Resumes a rebuilding loop. The orbit continues from where it stopped.
    pub fn finish_rebuild(&mut self) {
        if self.state == LoopState::Rebuilding {
            log::info!("Frame loop resumed");
            self.state = LoopState::Running;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;
    use crate::settings::CameraSettings;

    #[derive(Debug, PartialEq)]
    enum Call {
        Update(FrameUniforms),
        Submit,
    }

    /// Records every call and replays scripted frame results.
    #[derive(Default)]
    struct RecordingTarget {
        calls: Vec<Call>,
        results: Vec<std::result::Result<(), FrameError>>,
        lost: bool,
    }

    impl FrameTarget for RecordingTarget {
        fn device_lost(&mut self) -> bool {
            std::mem::take(&mut self.lost)
        }

        fn update_uniforms(&mut self, uniforms: &FrameUniforms) {
            self.calls.push(Call::Update(*uniforms));
        }

        fn record_and_submit_frame(&mut self) -> std::result::Result<(), FrameError> {
            self.calls.push(Call::Submit);
            if self.results.is_empty() {
                Ok(())
            } else {
                self.results.remove(0)
            }
        }
    }

    fn running_loop() -> FrameLoop {
        let mut frame_loop = FrameLoop::new(
            Camera::new(1.0, &CameraSettings::default()),
            OrbitSettings::default(),
        );
        frame_loop.start();
        frame_loop
    }

    #[test]
    fn uniform_write_precedes_submit() {
        let mut frame_loop = running_loop();
        let mut target = RecordingTarget::default();

        assert_eq!(frame_loop.tick(&mut target).unwrap(), TickOutcome::Presented);
        assert_eq!(target.calls.len(), 2);
        assert!(matches!(target.calls[0], Call::Update(_)));
        assert_eq!(target.calls[1], Call::Submit);
    }

    #[test]
    fn uploaded_uniforms_describe_the_moved_camera() {
        let mut frame_loop = running_loop();
        let mut target = RecordingTarget::default();
        frame_loop.tick(&mut target).unwrap();

        let camera = frame_loop.camera();
        let expected = FrameUniforms::pack(&camera.view_projection_matrix(), &camera.position);
        assert_eq!(target.calls[0], Call::Update(expected));
        assert!((camera.position.x - (0.005_f64.sin() * 3.5) as f32).abs() < 1e-6);
    }

    #[test]
    fn idle_loop_does_nothing() {
        let mut frame_loop = FrameLoop::new(
            Camera::new(1.0, &CameraSettings::default()),
            OrbitSettings::default(),
        );
        let mut target = RecordingTarget::default();

        assert_eq!(frame_loop.tick(&mut target).unwrap(), TickOutcome::Idle);
        assert!(target.calls.is_empty());
        assert_eq!(frame_loop.angle(), 0.0);
        assert_eq!(frame_loop.camera().position, glm::vec3(0.0, 0.2, 3.5));
    }

    #[test]
    fn thousand_ticks_follow_the_orbit() {
        let mut frame_loop = running_loop();
        let mut target = RecordingTarget::default();
        for _ in 0..1000 {
            frame_loop.tick(&mut target).unwrap();
        }

        assert!((frame_loop.angle() - 5.0).abs() < 1e-9);
        let position = frame_loop.camera().position;
        let expected = glm::vec3((5.0_f64.sin() * 3.5) as f32, 0.2, (5.0_f64.cos() * 3.5) as f32);
        assert!((position - expected).norm() < 1e-6);
    }

    #[test]
    fn angle_wraps_into_one_turn() {
        let mut orbit = Orbit::new(OrbitSettings {
            step: 1.0,
            ..OrbitSettings::default()
        });
        for _ in 0..20 {
            orbit.advance();
            assert!((0.0..TAU).contains(&orbit.angle()));
        }
        assert!((orbit.angle() - 20.0_f64.rem_euclid(TAU)).abs() < 1e-9);
    }

    #[test]
    fn negative_step_orbits_backwards() {
        let mut orbit = Orbit::new(OrbitSettings {
            step: -0.5,
            ..OrbitSettings::default()
        });
        orbit.advance();
        assert!((orbit.angle() - (TAU - 0.5)).abs() < 1e-12);
        assert!(orbit.position().x < 0.0);
    }

    #[test]
    fn skipped_frames_keep_running() {
        let mut frame_loop = running_loop();
        let mut target = RecordingTarget {
            results: vec![Err(FrameError::Skipped("surface lost or outdated"))],
            ..Default::default()
        };

        assert_eq!(frame_loop.tick(&mut target).unwrap(), TickOutcome::Skipped);
        assert_eq!(frame_loop.state(), LoopState::Running);
        assert_eq!(frame_loop.tick(&mut target).unwrap(), TickOutcome::Presented);
    }

    #[test]
    fn device_loss_suspends_until_rebuilt() {
        let mut frame_loop = running_loop();
        let mut target = RecordingTarget {
            results: vec![Err(FrameError::DeviceLost)],
            ..Default::default()
        };

        assert_eq!(frame_loop.tick(&mut target).unwrap(), TickOutcome::Suspended);
        assert_eq!(frame_loop.state(), LoopState::Suspended);

        let angle = frame_loop.angle();
        let calls = target.calls.len();
        assert_eq!(frame_loop.tick(&mut target).unwrap(), TickOutcome::Suspended);
        assert_eq!(frame_loop.angle(), angle);
        assert_eq!(target.calls.len(), calls);

        assert!(frame_loop.begin_rebuild());
        assert_eq!(frame_loop.state(), LoopState::Rebuilding);
        assert_eq!(frame_loop.tick(&mut target).unwrap(), TickOutcome::Idle);

        frame_loop.finish_rebuild();
        assert_eq!(frame_loop.state(), LoopState::Running);
        assert_eq!(frame_loop.tick(&mut target).unwrap(), TickOutcome::Presented);
    }

    #[test]
    fn signalled_loss_suspends_before_any_gpu_work() {
        let mut frame_loop = running_loop();
        let mut target = RecordingTarget::default();
        frame_loop.tick(&mut target).unwrap();
        let angle = frame_loop.angle();
        let position = frame_loop.camera().position;

        target.calls.clear();
        target.lost = true;
        assert_eq!(frame_loop.tick(&mut target).unwrap(), TickOutcome::Suspended);
        assert_eq!(frame_loop.state(), LoopState::Suspended);
        assert!(target.calls.is_empty());
        assert_eq!(frame_loop.angle(), angle);
        assert_eq!(frame_loop.camera().position, position);
    }

    #[test]
    fn failed_rebuild_can_be_retried() {
        let mut frame_loop = running_loop();
        let mut target = RecordingTarget {
            lost: true,
            ..Default::default()
        };
        assert_eq!(frame_loop.tick(&mut target).unwrap(), TickOutcome::Suspended);

        assert!(frame_loop.begin_rebuild());
        frame_loop.abort_rebuild();
        assert_eq!(frame_loop.state(), LoopState::Suspended);
        assert_eq!(frame_loop.tick(&mut target).unwrap(), TickOutcome::Suspended);

        assert!(frame_loop.begin_rebuild());
        frame_loop.finish_rebuild();
        assert_eq!(frame_loop.state(), LoopState::Running);
        assert_eq!(frame_loop.tick(&mut target).unwrap(), TickOutcome::Presented);
    }

    #[test]
    fn abort_outside_rebuild_is_ignored() {
        let mut frame_loop = running_loop();
        frame_loop.abort_rebuild();
        assert_eq!(frame_loop.state(), LoopState::Running);
    }

    #[test]
    fn rebuild_requires_suspension() {
        let mut frame_loop = running_loop();
        assert!(!frame_loop.begin_rebuild());
        frame_loop.finish_rebuild();
        assert_eq!(frame_loop.state(), LoopState::Running);
    }

    #[test]
    fn stop_signal_stops_from_any_state() {
        let mut frame_loop = running_loop();
        let mut target = RecordingTarget::default();
        let stop = frame_loop.stop_signal();

        stop.stop();
        assert_eq!(frame_loop.tick(&mut target).unwrap(), TickOutcome::Stopped);
        assert_eq!(frame_loop.state(), LoopState::Stopped);
        assert!(target.calls.is_empty());

        frame_loop.start();
        assert_eq!(frame_loop.state(), LoopState::Stopped);
    }

    #[test]
    fn fatal_errors_are_returned() {
        let mut frame_loop = running_loop();
        let mut target = RecordingTarget {
            results: vec![Err(FrameError::Fatal(RenderError::OutOfMemory))],
            ..Default::default()
        };

        assert!(matches!(
            frame_loop.tick(&mut target),
            Err(RenderError::OutOfMemory)
        ));
    }
}
