//! Keyboard-driven tuning panel.
//!
//! Each [`Slider`] binds a labelled, bounded, stepped range to one [`Tunable`]
//! property of the scene. Values are snapped to the step and clamped to the range
//! before they reach the scene. The panel draws nothing; every change is logged.

use winit::keyboard::KeyCode;

/// Scene properties a slider can drive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tunable {
    LightIntensity,
    LightPositionX,
    LightPositionY,
    LightPositionZ,
    ModelRotationY,
}

/// Something that exposes [`Tunable`] properties, usually the scene context.
pub trait Bindable {
    /// `None` when the property does not exist (yet).
    fn read(&self, target: Tunable) -> Option<f32>;
    /// Returns `false` when the property does not exist.
    fn write(&mut self, target: Tunable, value: f32) -> bool;
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PanelError {
    #[error("no slider labelled {0:?}")]
    UnknownSlider(String),
    #[error("{0:?} is not available in the scene")]
    Unbound(Tunable),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Slider {
    pub target: Tunable,
    pub min: f32,
    pub max: f32,
    pub step: f32,
    pub label: String,
}

/// Keys per arrow press.
const NUDGE_STEPS: f32 = 100.0;
const NUDGE_STEPS_FAST: f32 = 1000.0;

impl Slider {
    /// Snaps `value` to the nearest step above `min`, then clamps it into range.
    pub fn quantize(&self, value: f32) -> f32 {
        let (min, max) = (self.min.min(self.max), self.max.max(self.min));
        if !value.is_finite() {
            return min;
        }
        // Decimal steps like 0.001 are not exact in f32; snap on the decimal value.
        let step = (self.step as f64 * 1e9).round() / 1e9;
        let snapped = if step > 0.0 {
            let base = min as f64;
            base + ((value as f64 - base) / step).round() * step
        } else {
            value as f64
        };
        (snapped as f32).clamp(min, max)
    }
}

#[derive(Clone, Debug, Default)]
pub struct DebugPanel {
    sliders: Vec<Slider>,
    selected: usize,
}

impl DebugPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a slider. A slider with the same label is replaced.
    pub fn bind(&mut self, target: Tunable, min: f32, max: f32, step: f32, label: &str) {
        let slider = Slider {
            target,
            min,
            max,
            step,
            label: label.to_string(),
        };
        match self.sliders.iter_mut().find(|s| s.label == label) {
            Some(existing) => *existing = slider,
            None => self.sliders.push(slider),
        }
        log::debug!("slider {} bound to {:?} in [{}, {}]", label, target, min, max);
    }

    pub fn sliders(&self) -> &[Slider] {
        &self.sliders
    }

    pub fn slider(&self, label: &str) -> Option<&Slider> {
        self.sliders.iter().find(|s| s.label == label)
    }

    pub fn selected(&self) -> Option<&Slider> {
        self.sliders.get(self.selected)
    }

    pub fn get(&self, label: &str, scene: &impl Bindable) -> Result<f32, PanelError> {
        let slider = self
            .slider(label)
            .ok_or_else(|| PanelError::UnknownSlider(label.to_string()))?;
        scene
            .read(slider.target)
            .ok_or(PanelError::Unbound(slider.target))
    }

    /// Writes the quantized `value` and returns what was written.
    pub fn set(
        &mut self,
        label: &str,
        value: f32,
        scene: &mut impl Bindable,
    ) -> Result<f32, PanelError> {
        let slider = self
            .slider(label)
            .ok_or_else(|| PanelError::UnknownSlider(label.to_string()))?;
        let value = slider.quantize(value);
        if !scene.write(slider.target, value) {
            return Err(PanelError::Unbound(slider.target));
        }
        log::info!("{} = {}", slider.label, value);
        Ok(value)
    }

    /// Moves the slider labelled `label` by `steps` of its step size.
    pub fn nudge(
        &mut self,
        label: &str,
        steps: f32,
        scene: &mut impl Bindable,
    ) -> Result<f32, PanelError> {
        let current = self.get(label, scene)?;
        let step = self
            .slider(label)
            .map(|s| s.step)
            .ok_or_else(|| PanelError::UnknownSlider(label.to_string()))?;
        self.set(label, current + steps * step, scene)
    }

    /// `Tab` selects the next slider, the vertical arrows nudge the selected one.
    ///
    /// Returns whether the key was consumed.
    pub fn handle_key(&mut self, key: KeyCode, shift: bool, scene: &mut impl Bindable) -> bool {
        if self.sliders.is_empty() {
            return false;
        }
        let steps = if shift { NUDGE_STEPS_FAST } else { NUDGE_STEPS };
        let direction = match key {
            KeyCode::Tab => {
                self.selected = (self.selected + 1) % self.sliders.len();
                log::info!("selected slider {}", self.sliders[self.selected].label);
                return true;
            }
            KeyCode::ArrowUp => 1.0,
            KeyCode::ArrowDown => -1.0,
            _ => return false,
        };
        let label = self.sliders[self.selected % self.sliders.len()].label.clone();
        if let Err(e) = self.nudge(&label, direction * steps, scene) {
            log::warn!("{}", e);
        }
        true
    }
}
