//! Control Registry
//! ================
//!
//! Typed, user-adjustable simulation parameters (sliders and checkboxes).
//!
//! A simulation registers its controls once, before the first `init()`. Each
//! registration seeds a live value map with the declared initial value and
//! returns a typed handle the simulation can read from. The UI collaborator
//! gets the descriptors and writes through `on_change`; the update loop reads
//! the same map every tick. Both actors live on one thread, so the map is an
//! `Rc<RefCell<..>>` with no locking.
//!
//! Registration is permissive: re-using an id replaces the earlier control,
//! and slider bounds are not validated.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use tracing::{debug, warn};

/// Current value of one control.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ControlValue {
    /// Slider position
    Number(f64),
    /// Checkbox state
    Flag(bool),
}

impl ControlValue {
    /// Returns the numeric value, if this is a slider value.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ControlValue::Number(v) => Some(*v),
            ControlValue::Flag(_) => None,
        }
    }

    /// Returns the boolean value, if this is a checkbox value.
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            ControlValue::Flag(v) => Some(*v),
            ControlValue::Number(_) => None,
        }
    }
}

impl From<f64> for ControlValue {
    fn from(v: f64) -> Self {
        ControlValue::Number(v)
    }
}

impl From<bool> for ControlValue {
    fn from(v: bool) -> Self {
        ControlValue::Flag(v)
    }
}

/// Declaration of a slider: initial value plus bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SliderSpec {
    pub value: f64,
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl SliderSpec {
    pub fn new(value: f64, min: f64, max: f64, step: f64) -> Self {
        Self {
            value,
            min,
            max,
            step,
        }
    }
}

/// Kind of a control, with kind-specific bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ControlKind {
    Slider { min: f64, max: f64, step: f64 },
    Checkbox,
}

impl ControlKind {
    /// True if `value` is of this control's kind.
    pub fn accepts(&self, value: &ControlValue) -> bool {
        matches!(
            (self, value),
            (ControlKind::Slider { .. }, ControlValue::Number(_))
                | (ControlKind::Checkbox, ControlValue::Flag(_))
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            ControlKind::Slider { .. } => "slider",
            ControlKind::Checkbox => "checkbox",
        }
    }
}

/// The live value map shared by the UI (writer) and the update loop (reader).
///
/// Cloning is cheap and yields another view of the same map.
#[derive(Debug, Clone, Default)]
pub struct ControlValues {
    live: Rc<RefCell<BTreeMap<String, ControlValue>>>,
}

impl ControlValues {
    /// Returns the current value of a control.
    pub fn get(&self, id: &str) -> Option<ControlValue> {
        self.live.borrow().get(id).copied()
    }

    /// Returns the current value of a slider.
    pub fn number(&self, id: &str) -> Option<f64> {
        self.get(id).and_then(|v| v.as_number())
    }

    /// Returns the current value of a checkbox.
    pub fn flag(&self, id: &str) -> Option<bool> {
        self.get(id).and_then(|v| v.as_flag())
    }

    /// Copies out every current value, ordered by id.
    pub fn snapshot(&self) -> BTreeMap<String, ControlValue> {
        self.live.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.live.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.borrow().is_empty()
    }

    fn write(&self, id: &str, value: ControlValue) {
        self.live.borrow_mut().insert(id.to_string(), value);
    }
}

/// Metadata plus live value binding for one control.
#[derive(Debug, Clone)]
pub struct ControlDescriptor {
    id: String,
    label: String,
    kind: ControlKind,
    values: ControlValues,
}

impl ControlDescriptor {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> ControlKind {
        self.kind
    }

    /// Reads the control's value from the live map.
    pub fn current_value(&self) -> Option<ControlValue> {
        self.values.get(&self.id)
    }

    /// UI callback: writes a new value into the live map.
    ///
    /// Range is not checked (that is the UI's job). A value of the wrong kind
    /// (a flag for a slider, a number for a checkbox) is dropped with a warning
    /// so typed readers never see a foreign variant.
    pub fn on_change(&self, value: impl Into<ControlValue>) {
        let value = value.into();
        if !self.kind.accepts(&value) {
            warn!(
                control = %self.id,
                kind = self.kind.name(),
                ?value,
                "ignoring control change of the wrong kind"
            );
            return;
        }
        debug!(control = %self.id, ?value, "control changed");
        self.values.write(&self.id, value);
    }

    /// Serializable snapshot handed to the control UI collaborator.
    pub fn view(&self) -> ControlView {
        ControlView {
            id: self.id.clone(),
            label: self.label.clone(),
            kind: self.kind,
            value: self.current_value(),
        }
    }
}

/// What the control UI needs to render one control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlView {
    pub id: String,
    pub label: String,
    #[serde(flatten)]
    pub kind: ControlKind,
    pub value: Option<ControlValue>,
}

/// Typed read accessor for a registered slider.
#[derive(Debug, Clone)]
pub struct SliderHandle {
    id: String,
    initial: f64,
    values: ControlValues,
}

impl SliderHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current slider value (the declared initial value if the id was since
    /// taken over by a checkbox).
    pub fn get(&self) -> f64 {
        self.values.number(&self.id).unwrap_or(self.initial)
    }
}

/// Typed read accessor for a registered checkbox.
#[derive(Debug, Clone)]
pub struct CheckboxHandle {
    id: String,
    initial: bool,
    values: ControlValues,
}

impl CheckboxHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current checkbox state.
    pub fn get(&self) -> bool {
        self.values.flag(&self.id).unwrap_or(self.initial)
    }
}

/// All controls of one simulation instance, in registration order.
#[derive(Debug, Default)]
pub struct ControlRegistry {
    descriptors: Vec<ControlDescriptor>,
    values: ControlValues,
}

impl ControlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a slider and seeds its live value with `spec.value`.
    pub fn add_slider(
        &mut self,
        id: impl Into<String>,
        spec: SliderSpec,
        label: impl Into<String>,
    ) -> SliderHandle {
        let id = id.into();
        let descriptor = ControlDescriptor {
            id: id.clone(),
            label: label.into(),
            kind: ControlKind::Slider {
                min: spec.min,
                max: spec.max,
                step: spec.step,
            },
            values: self.values.clone(),
        };
        self.insert(descriptor, ControlValue::Number(spec.value));
        SliderHandle {
            id,
            initial: spec.value,
            values: self.values.clone(),
        }
    }

    /// Registers a checkbox and seeds its live value with `value`.
    pub fn add_checkbox(
        &mut self,
        id: impl Into<String>,
        value: bool,
        label: impl Into<String>,
    ) -> CheckboxHandle {
        let id = id.into();
        let descriptor = ControlDescriptor {
            id: id.clone(),
            label: label.into(),
            kind: ControlKind::Checkbox,
            values: self.values.clone(),
        };
        self.insert(descriptor, ControlValue::Flag(value));
        CheckboxHandle {
            id,
            initial: value,
            values: self.values.clone(),
        }
    }

    fn insert(&mut self, descriptor: ControlDescriptor, initial: ControlValue) {
        self.values.write(&descriptor.id, initial);

        // Duplicate id: the newer declaration wins, keeping the original slot
        if let Some(existing) = self.descriptors.iter_mut().find(|d| d.id == descriptor.id) {
            warn!(control = %descriptor.id, "control id registered twice, overwriting");
            *existing = descriptor;
        } else {
            self.descriptors.push(descriptor);
        }
    }

    /// Looks up a descriptor by id.
    pub fn descriptor(&self, id: &str) -> Option<&ControlDescriptor> {
        self.descriptors.iter().find(|d| d.id == id)
    }

    /// All descriptors in registration order.
    pub fn descriptors(&self) -> &[ControlDescriptor] {
        &self.descriptors
    }

    /// The live value map read by `update`/`render`.
    pub fn values(&self) -> &ControlValues {
        &self.values
    }

    /// Views of every control for the UI.
    pub fn views(&self) -> Vec<ControlView> {
        self.descriptors.iter().map(ControlDescriptor::view).collect()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_seeds_initial_values() {
        let mut registry = ControlRegistry::new();
        registry.add_slider("k", SliderSpec::new(0.3, 0.0, 2.0, 0.01), "Coupling");
        registry.add_checkbox("trails", true, "Show trails");

        assert_eq!(registry.values().number("k"), Some(0.3));
        assert_eq!(registry.values().flag("trails"), Some(true));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_on_change_writes_live_map() {
        let mut registry = ControlRegistry::new();
        let k = registry.add_slider("k", SliderSpec::new(0.3, 0.0, 2.0, 0.01), "Coupling");

        registry.descriptor("k").unwrap().on_change(1.1);

        assert_eq!(registry.values().number("k"), Some(1.1));
        assert_eq!(k.get(), 1.1);
    }

    #[test]
    fn test_on_change_does_not_clamp() {
        let mut registry = ControlRegistry::new();
        registry.add_slider("k", SliderSpec::new(0.3, 0.0, 2.0, 0.01), "Coupling");

        registry.descriptor("k").unwrap().on_change(5.0);

        assert_eq!(registry.values().number("k"), Some(5.0));
    }

    #[test]
    fn test_wrong_kind_change_is_ignored() {
        let mut registry = ControlRegistry::new();
        let k = registry.add_slider("k", SliderSpec::new(0.3, 0.0, 2.0, 0.01), "Coupling");
        let flag = registry.add_checkbox("on", false, "On");

        registry.descriptor("k").unwrap().on_change(true);
        registry.descriptor("on").unwrap().on_change(1.0);

        assert_eq!(k.get(), 0.3);
        assert!(!flag.get());
    }

    #[test]
    fn test_duplicate_id_overwrites() {
        let mut registry = ControlRegistry::new();
        registry.add_slider("a", SliderSpec::new(1.0, 0.0, 2.0, 0.1), "First");
        registry.add_checkbox("b", false, "Other");
        registry.add_slider("a", SliderSpec::new(0.5, 0.0, 1.0, 0.1), "Second");

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.descriptors()[0].label(), "Second");
        assert_eq!(registry.values().number("a"), Some(0.5));
    }

    #[test]
    fn test_checkbox_replacing_slider_keeps_slider_handle_readable() {
        let mut registry = ControlRegistry::new();
        let slider = registry.add_slider("x", SliderSpec::new(0.7, 0.0, 1.0, 0.1), "X");
        registry.add_checkbox("x", true, "X again");

        assert_eq!(slider.get(), 0.7);
        assert_eq!(registry.values().flag("x"), Some(true));
    }

    #[test]
    fn test_view_serializes_for_ui() {
        let mut registry = ControlRegistry::new();
        registry.add_slider("k", SliderSpec::new(0.3, 0.0, 2.0, 0.01), "Coupling");

        let json = serde_json::to_value(registry.views()).unwrap();
        assert_eq!(json[0]["id"], "k");
        assert_eq!(json[0]["kind"], "slider");
        assert_eq!(json[0]["max"], 2.0);
        assert_eq!(json[0]["value"], 0.3);
    }
}
