//! Desired/prior model newtypes, the derived [`DeleteSet`], and the
//! write-only field overlay.

use std::collections::BTreeSet;

use crate::value::Value;

/// The new desired state for a resource, as handed to the reconciler by the
/// declarative framework front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredModel<R>(pub R);

/// The prior server-observed state for a resource, as returned by the most
/// recent successful Read. Absent on Create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorModel<R>(pub R);

impl<R> DesiredModel<R> {
    /// Borrow the wrapped resource-specific struct.
    pub fn inner(&self) -> &R {
        &self.0
    }
}

impl<R> PriorModel<R> {
    /// Borrow the wrapped resource-specific struct.
    pub fn inner(&self) -> &R {
        &self.0
    }
}

/// A derived set of wire-level field names to clear on Update.
///
/// Computed as the set of keys where the prior model had a value and the
/// desired model is null/absent. For nested structural fields (`notify`,
/// `tuning`, `maintenance-mode`), the entire parent key is added to the set
/// whenever the desired block is entirely absent, even if only some
/// sub-keys actually changed — PBS has no notion of partial clearing within
/// a property-string-valued field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteSet(BTreeSet<&'static str>);

impl DeleteSet {
    /// An empty delete set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Considers a single scalar field: if desired is anything but
    /// [`Value::Known`] and prior was present, the field name is added.
    pub fn consider_scalar<T>(&mut self, field: &'static str, desired: &Value<T>, prior_present: bool) {
        if prior_present && !desired.is_known() {
            self.0.insert(field);
        }
    }

    /// Considers a nested structural field (`notify`, `tuning`,
    /// `maintenance-mode`): the whole key clears when the desired block is
    /// absent, regardless of which sub-keys prior held.
    pub fn consider_block<T>(&mut self, field: &'static str, desired_block: &Value<T>, prior_block_present: bool) {
        self.consider_scalar(field, desired_block, prior_block_present);
    }

    /// Manually add a field name (used for fields whose presence logic does
    /// not fit the scalar/block shape, e.g. cross-field validation fallout).
    pub fn insert(&mut self, field: &'static str) {
        self.0.insert(field);
    }

    /// True if no fields are scheduled for deletion.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Field names in lexicographic order, matching the wire array's
    /// expected ordering for deterministic request bodies.
    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.iter().copied()
    }

    /// Renders the set as the `delete` array PBS expects in a request body.
    pub fn to_wire_array(&self) -> Vec<&'static str> {
        self.0.iter().copied().collect()
    }
}

/// Write-only / secret fields (passwords, API tokens, S3 secret keys): sent
/// on Create/Update, never returned by the server. Carried as a separate
/// overlay so the reconciler can merge a resource's sensitive fields back
/// into the final model without ever comparing them for diffing beyond
/// presence, and without a Read ever populating them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensitiveOverlay(std::collections::BTreeMap<&'static str, Value<String>>);

impl SensitiveOverlay {
    /// An empty overlay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sensitive field's desired value (never sourced from a Read).
    pub fn set(&mut self, field: &'static str, value: Value<String>) {
        self.0.insert(field, value);
    }

    /// Look up a sensitive field's carried value.
    pub fn get(&self, field: &'static str) -> Option<&Value<String>> {
        self.0.get(field)
    }

    /// True if no sensitive fields are carried.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
