use std::collections::HashMap;

use envmap_viewer::debug_panel::{Bindable, DebugPanel, PanelError, Slider, Tunable};
use winit::keyboard::KeyCode;

use crate::common::test_utils::assert_close;

mod common;

#[derive(Default)]
struct Values(HashMap<Tunable, f32>);

impl Bindable for Values {
    fn read(&self, target: Tunable) -> Option<f32> {
        self.0.get(&target).copied()
    }

    fn write(&mut self, target: Tunable, value: f32) -> bool {
        match self.0.get_mut(&target) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

fn panel_with_values() -> (DebugPanel, Values) {
    let mut panel = DebugPanel::new();
    panel.bind(Tunable::LightIntensity, 0.0, 10.0, 0.001, "lightIntensity");
    panel.bind(Tunable::LightPositionX, -5.0, 5.0, 0.001, "lightX");
    let mut values = Values::default();
    values.0.insert(Tunable::LightIntensity, 3.0);
    values.0.insert(Tunable::LightPositionX, 0.25);
    (panel, values)
}

#[test]
fn set_writes_exact_bounds() {
    let (mut panel, mut values) = panel_with_values();
    assert_eq!(panel.set("lightIntensity", 10.0, &mut values), Ok(10.0));
    assert_eq!(values.read(Tunable::LightIntensity), Some(10.0));
    assert_eq!(panel.set("lightIntensity", 0.0, &mut values), Ok(0.0));
}

#[test]
fn set_clamps_into_range() {
    let (mut panel, mut values) = panel_with_values();
    assert_eq!(panel.set("lightIntensity", 11.0, &mut values), Ok(10.0));
    assert_eq!(panel.set("lightX", -7.5, &mut values), Ok(-5.0));
    assert_eq!(panel.get("lightX", &values), Ok(-5.0));
}

#[test]
fn quantize_snaps_to_the_step() {
    let slider = Slider {
        target: Tunable::LightIntensity,
        min: 0.0,
        max: 10.0,
        step: 0.001,
        label: "lightIntensity".to_string(),
    };
    assert_eq!(slider.quantize(0.0004), 0.0);
    assert_close(slider.quantize(1.23456), 1.235);
    assert_eq!(slider.quantize(f32::NAN), 0.0);
}

#[test]
fn unknown_and_unbound_sliders_are_errors() {
    let (mut panel, mut values) = panel_with_values();
    assert_eq!(
        panel.set("nope", 1.0, &mut values),
        Err(PanelError::UnknownSlider("nope".to_string()))
    );

    panel.bind(Tunable::ModelRotationY, -3.0, 3.0, 0.001, "rotation");
    assert_eq!(
        panel.set("rotation", 1.0, &mut values),
        Err(PanelError::Unbound(Tunable::ModelRotationY))
    );
}

#[test]
fn binding_the_same_label_replaces_the_slider() {
    let (mut panel, _) = panel_with_values();
    panel.bind(Tunable::LightIntensity, 0.0, 5.0, 0.01, "lightIntensity");
    assert_eq!(panel.sliders().len(), 2);
    assert_eq!(panel.slider("lightIntensity").unwrap().max, 5.0);
}

#[test]
fn tab_cycles_and_arrows_nudge() {
    let (mut panel, mut values) = panel_with_values();
    assert_eq!(panel.selected().unwrap().label, "lightIntensity");

    assert!(panel.handle_key(KeyCode::ArrowDown, false, &mut values));
    assert_close(values.read(Tunable::LightIntensity).unwrap(), 2.9);

    assert!(panel.handle_key(KeyCode::Tab, false, &mut values));
    assert_eq!(panel.selected().unwrap().label, "lightX");
    assert!(panel.handle_key(KeyCode::ArrowUp, true, &mut values));
    assert_close(values.read(Tunable::LightPositionX).unwrap(), 1.25);

    assert!(panel.handle_key(KeyCode::Tab, false, &mut values));
    assert_eq!(panel.selected().unwrap().label, "lightIntensity");
}

#[test]
fn an_empty_panel_ignores_keys() {
    let mut panel = DebugPanel::new();
    let mut values = Values::default();
    assert!(!panel.handle_key(KeyCode::Tab, false, &mut values));
    assert!(panel.selected().is_none());
}
