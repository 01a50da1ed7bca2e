//! # Settings
//!
//! Tunable parameters of the renderer, grouped by the component that consumes them.
//!
//! Every field has a default matching the reference scene, so `Settings::default()` renders
//! the classic view: a 45° camera orbiting the box at a radius of 3.5 units and a height of
//! 0.2 units, advancing 0.005 radians per displayed frame.
//!
//! On native targets [`Settings::from_env`] lets a handful of values be overridden without a
//! rebuild:
//!
//! | Variable                   | Field                               |
//! |----------------------------|-------------------------------------|
//! | `CORNELL_ORBIT_STEP`       | [`OrbitSettings::step`] (radians)   |
//! | `CORNELL_FRAMES_IN_FLIGHT` | [`RenderSettings::frames_in_flight`] |
//!
//! Invalid values are reported through `log` and ignored.

/// Environment variable overriding [`OrbitSettings::step`].
pub const ORBIT_STEP_VAR: &str = "CORNELL_ORBIT_STEP";

/// Environment variable overriding [`RenderSettings::frames_in_flight`].
pub const FRAMES_IN_FLIGHT_VAR: &str = "CORNELL_FRAMES_IN_FLIGHT";

/// Upper bound accepted for [`RenderSettings::frames_in_flight`].
pub const MAX_FRAMES_IN_FLIGHT: usize = 3;

/// The camera's circular path around the scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrbitSettings {
    /// Distance from the vertical axis through the origin.
    pub radius: f32,

    /// Constant camera height.
    pub height: f32,

    /// Angle added on every tick, in radians.
    ///
    /// The step is applied per displayed frame rather than per unit of wall-clock time, so the
    /// orbit completes faster on high refresh-rate displays.
    pub step: f64,

    /// Angle of the camera before the first tick, in radians.
    pub start_angle: f64,
}

impl Default for OrbitSettings {
    fn default() -> Self {
        Self {
            radius: 3.5,
            height: 0.2,
            step: 0.005,
            start_angle: 0.0,
        }
    }
}

/// Fixed lens and framing parameters of the camera.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraSettings {
    /// Vertical field of view, in degrees.
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub up: [f32; 3],
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fov_y_degrees: 45.0,
            near: 0.1,
            far: 100.0,
            position: [0.0, 0.2, 3.5],
            target: [0.0, 0.0, 0.0],
            up: [0.0, 1.0, 0.0],
        }
    }
}

/// GPU-side presentation parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderSettings {
    /// Background color the render pass clears to.
    pub clear_color: wgpu::Color,

    /// Number of uniform buffers cycled between frames.
    ///
    /// A slot is only rewritten once the GPU has finished the frame that last read it.
    pub frames_in_flight: usize,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            clear_color: wgpu::Color {
                r: 0.1,
                g: 0.1,
                b: 0.15,
                a: 1.0,
            },
            frames_in_flight: 2,
        }
    }
}

/// All renderer settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Settings {
    pub orbit: OrbitSettings,
    pub camera: CameraSettings,
    pub render: RenderSettings,

    /// Title of the native window.
    pub window_title: &'static str,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            orbit: OrbitSettings::default(),
            camera: CameraSettings::default(),
            render: RenderSettings::default(),
            window_title: "Cornell Box",
        }
    }
}

impl Settings {
    /// Default settings with overrides read from the process environment.
    ///
    /// On `wasm32` there is no process environment and the defaults are returned unchanged.
    pub fn from_env() -> Self {
        #[allow(unused_mut)]
        let mut settings = Self::default();

        #[cfg(not(target_arch = "wasm32"))]
        {
            if let Ok(value) = std::env::var(ORBIT_STEP_VAR) {
                settings.apply_orbit_step(&value);
            }
            if let Ok(value) = std::env::var(FRAMES_IN_FLIGHT_VAR) {
                settings.apply_frames_in_flight(&value);
            }
        }

        settings
    }

    /// Applies a textual orbit step override. Returns whether the value was accepted.
    pub fn apply_orbit_step(&mut self, value: &str) -> bool {
        match parse_orbit_step(value) {
            Some(step) => {
                log::info!("Orbit step overridden to {step} rad/tick");
                self.orbit.step = step;
                true
            }
            None => {
                log::warn!("Ignoring invalid {ORBIT_STEP_VAR}={value:?}");
                false
            }
        }
    }

    /// Applies a textual frames-in-flight override. Returns whether the value was accepted.
    pub fn apply_frames_in_flight(&mut self, value: &str) -> bool {
        match parse_frames_in_flight(value) {
            Some(count) => {
                log::info!("Frames in flight overridden to {count}");
                self.render.frames_in_flight = count;
                true
            }
            None => {
                log::warn!(
                    "Ignoring invalid {FRAMES_IN_FLIGHT_VAR}={value:?} \
                     (expected 1..={MAX_FRAMES_IN_FLIGHT})"
                );
                false
            }
        }
    }
}

/// Parses a finite orbit step in radians per tick.
pub fn parse_orbit_step(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|step| step.is_finite())
}

/// Parses a frames-in-flight count in `1..=MAX_FRAMES_IN_FLIGHT`.
pub fn parse_frames_in_flight(value: &str) -> Option<usize> {
    value
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|count| (1..=MAX_FRAMES_IN_FLIGHT).contains(count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_reference_scene() {
        let settings = Settings::default();
        assert_eq!(settings.orbit.radius, 3.5);
        assert_eq!(settings.orbit.height, 0.2);
        assert_eq!(settings.orbit.step, 0.005);
        assert_eq!(settings.camera.fov_y_degrees, 45.0);
        assert_eq!(settings.camera.near, 0.1);
        assert_eq!(settings.camera.far, 100.0);
        assert_eq!(settings.camera.position, [0.0, 0.2, 3.5]);
        assert_eq!(settings.render.frames_in_flight, 2);
    }

    #[test]
    fn orbit_step_parsing() {
        assert_eq!(parse_orbit_step("0.01"), Some(0.01));
        assert_eq!(parse_orbit_step(" -0.002 "), Some(-0.002));
        assert_eq!(parse_orbit_step("NaN"), None);
        assert_eq!(parse_orbit_step("inf"), None);
        assert_eq!(parse_orbit_step("fast"), None);
    }

    #[test]
    fn frames_in_flight_parsing() {
        assert_eq!(parse_frames_in_flight("1"), Some(1));
        assert_eq!(parse_frames_in_flight("3"), Some(3));
        assert_eq!(parse_frames_in_flight("0"), None);
        assert_eq!(parse_frames_in_flight("4"), None);
        assert_eq!(parse_frames_in_flight("-1"), None);
    }

    #[test]
    fn invalid_overrides_leave_settings_untouched() {
        let mut settings = Settings::default();
        assert!(!settings.apply_orbit_step("slow"));
        assert!(!settings.apply_frames_in_flight("12"));
        assert_eq!(settings, Settings::default());

        assert!(settings.apply_orbit_step("0.02"));
        assert_eq!(settings.orbit.step, 0.02);
    }
}
