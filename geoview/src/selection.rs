//! Selected and inspected features.

use geojson::Feature;

use crate::pick::PickedFeature;

/// The feature chosen in select mode.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// Layer the feature belongs to.
    pub layer_id: String,
    /// Identifier of the feature, used to highlight it in attribute views.
    pub feature_id: String,
    /// The feature in the projection of its layer.
    pub feature: Feature,
}

impl From<PickedFeature> for Selection {
    fn from(picked: PickedFeature) -> Self {
        Self {
            layer_id: picked.layer_id.clone(),
            feature_id: picked.feature_id(),
            feature: picked.feature,
        }
    }
}

/// Current selection. Every pick replaces it as a whole.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionState {
    selection: Option<Selection>,
}

impl SelectionState {
    /// Selected feature, if any.
    pub fn get(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// Replaces the selection. Returns true if it changed.
    pub fn set(&mut self, selection: Option<Selection>) -> bool {
        if self.selection == selection {
            return false;
        }

        self.selection = selection;
        true
    }

    /// Clears the selection. Returns true if something was selected.
    pub fn clear(&mut self) -> bool {
        self.selection.take().is_some()
    }
}

/// Features found by the last browse pick and the one being looked at.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InspectionState {
    items: Vec<PickedFeature>,
    current: usize,
}

impl InspectionState {
    /// Replaces the inspected features and moves to the first one.
    pub fn set_items(&mut self, items: Vec<PickedFeature>) {
        self.items = items;
        self.current = 0;
    }

    /// All inspected features, topmost first.
    pub fn items(&self) -> &[PickedFeature] {
        &self.items
    }

    /// Index of the feature being looked at.
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// The feature being looked at.
    pub fn current(&self) -> Option<&PickedFeature> {
        self.items.get(self.current)
    }

    /// Moves to the next feature. Returns false at the last one.
    pub fn next(&mut self) -> bool {
        self.set_current(self.current + 1)
    }

    /// Moves to the previous feature. Returns false at the first one.
    pub fn previous(&mut self) -> bool {
        match self.current.checked_sub(1) {
            Some(index) => self.set_current(index),
            None => false,
        }
    }

    /// Moves to the feature at `index`. Returns false if there is no such feature.
    pub fn set_current(&mut self, index: usize) -> bool {
        if index >= self.items.len() {
            return false;
        }

        self.current = index;
        true
    }

    /// Removes all features.
    pub fn clear(&mut self) {
        self.items.clear();
        self.current = 0;
    }

    /// Returns true if nothing is inspected.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of inspected features.
    pub fn len(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn picked(layer: &str, index: usize) -> PickedFeature {
        PickedFeature {
            layer_id: layer.to_string(),
            layer_name: layer.to_uppercase(),
            feature: serde_json::from_str(
                r#"{"type": "Feature", "properties": {}, "geometry": null}"#,
            )
            .unwrap(),
            feature_index: index,
        }
    }

    #[test]
    fn selection_is_replaced_wholesale() {
        let mut state = SelectionState::default();
        assert!(state.set(Some(picked("a", 4).into())));
        assert_eq!(state.get().unwrap().feature_id, "4");
        assert!(!state.set(Some(picked("a", 4).into())));

        assert!(state.set(Some(picked("b", 0).into())));
        assert_eq!(state.get().unwrap().layer_id, "b");
        assert!(state.clear());
        assert!(!state.clear());
    }

    #[test]
    fn inspection_navigation() {
        let mut state = InspectionState::default();
        assert!(state.current().is_none());
        assert!(!state.next());

        state.set_items(vec![picked("a", 0), picked("b", 1), picked("c", 2)]);
        assert_eq!(state.current().unwrap().layer_id, "a");
        assert!(!state.previous());
        assert!(state.next());
        assert!(state.next());
        assert!(!state.next());
        assert_eq!(state.current_index(), 2);

        assert!(state.set_current(0));
        assert!(!state.set_current(3));
        assert_eq!(state.current().unwrap().layer_id, "a");

        state.set_items(vec![picked("z", 0)]);
        assert_eq!(state.current_index(), 0);
        assert_eq!(state.len(), 1);
    }
}
