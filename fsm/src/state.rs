//! State groups and state definitions.
//!
//! A [`StateDefinition`] belongs to exactly one [`StateGroup`] and is identified by the string
//! `"{group}:{member}"`, assigned when the group is built and never changed afterwards.

use std::fmt;
use std::hash::{Hash, Hasher};

/// A named state inside a group. Equality and hashing use the identity string only.
#[derive(Debug, Clone)]
pub struct StateDefinition {
    group: String,
    name: String,
    id: String,
}

impl StateDefinition {
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        let group = group.into();
        let name = name.into();
        let id = format!("{}:{}", group, name);
        Self { group, name, id }
    }

    /// Canonical identity, e.g. `Profile:waiting_name`.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for StateDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for StateDefinition {}

impl Hash for StateDefinition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for StateDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Ordered set of states sharing a group name.
///
/// ```
/// use fsm::StateGroup;
///
/// let mut profile = StateGroup::new("Profile");
/// let waiting_name = profile.add("waiting_name");
/// assert_eq!(waiting_name.id(), "Profile:waiting_name");
/// assert!(profile.contains("Profile:waiting_name"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateGroup {
    name: String,
    states: Vec<StateDefinition>,
}

impl StateGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            states: Vec::new(),
        }
    }

    /// Builder form of [`StateGroup::add`].
    pub fn state(mut self, member: impl Into<String>) -> Self {
        self.add(member);
        self
    }

    /// Adds a member and returns its definition. Adding an existing member returns the existing one.
    pub fn add(&mut self, member: impl Into<String>) -> StateDefinition {
        let definition = StateDefinition::new(self.name.clone(), member);
        if let Some(existing) = self.states.iter().find(|s| **s == definition) {
            return existing.clone();
        }
        self.states.push(definition.clone());
        definition
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks up a member by its short name.
    pub fn get(&self, member: &str) -> Option<&StateDefinition> {
        self.states.iter().find(|s| s.name() == member)
    }

    pub fn states(&self) -> &[StateDefinition] {
        &self.states
    }

    /// True when `state_id` is the identity of one of the members.
    pub fn contains(&self, state_id: &str) -> bool {
        self.states.iter().any(|s| s.id() == state_id)
    }
}

/// Values accepted wherever a state is written: definitions, raw identities, or `None` to reset.
pub trait IntoState {
    fn into_state(self) -> Option<String>;
}

impl IntoState for StateDefinition {
    fn into_state(self) -> Option<String> {
        Some(self.id)
    }
}

impl IntoState for &StateDefinition {
    fn into_state(self) -> Option<String> {
        Some(self.id.clone())
    }
}

impl IntoState for &str {
    fn into_state(self) -> Option<String> {
        Some(self.to_string())
    }
}

impl IntoState for String {
    fn into_state(self) -> Option<String> {
        Some(self)
    }
}

impl<T: IntoState> IntoState for Option<T> {
    fn into_state(self) -> Option<String> {
        self.and_then(IntoState::into_state)
    }
}
