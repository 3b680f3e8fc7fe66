// Copyright 2025 Cornell University
// released under MIT License

use cranelift_entity::{entity_impl, PrimaryMap, SecondaryMap};
use std::ops::Index;

/// A boolean signal value, encoded as `0` / `1` in the model.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Bit {
    Zero,
    One,
}

impl Bit {
    pub const ALL: [Bit; 2] = [Bit::Zero, Bit::One];

    pub fn as_int(self) -> u8 {
        match self {
            Bit::Zero => 0,
            Bit::One => 1,
        }
    }
}

/// Direction of a synchronization label: `ch!` or `ch?`
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum Polarity {
    Send,
    Receive,
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct SyncLabel {
    pub channel: String,
    pub polarity: Polarity,
}

impl SyncLabel {
    pub fn send(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            polarity: Polarity::Send,
        }
    }

    pub fn receive(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            polarity: Polarity::Receive,
        }
    }
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum Guard {
    /// `var == value`
    Equals { var: String, value: Bit },
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum Update {
    /// `var := value`
    Assign { var: String, value: Bit },
    /// `clock := 0`
    ResetClock { clock: String },
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum Invariant {
    /// `clock <= bound`, where `bound` names a global constant
    ClockAtMost { clock: String, bound: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    name: String,
    committed: bool,
    invariant: Option<Invariant>,
}

impl Location {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            committed: false,
            invariant: None,
        }
    }

    /// A location that must be left before any other automaton moves
    pub fn committed(name: impl Into<String>) -> Self {
        Self {
            committed: true,
            ..Self::new(name)
        }
    }

    pub fn with_invariant(mut self, invariant: Invariant) -> Self {
        self.invariant = Some(invariant);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    pub fn invariant(&self) -> Option<&Invariant> {
        self.invariant.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub source: LocationId,
    pub target: LocationId,
    pub guard: Option<Guard>,
    pub update: Option<Update>,
    pub sync: Option<SyncLabel>,
}

impl Transition {
    pub fn new(source: LocationId, target: LocationId) -> Self {
        Self {
            source,
            target,
            guard: None,
            update: None,
            sync: None,
        }
    }

    pub fn with_guard(mut self, guard: Guard) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn with_update(mut self, update: Update) -> Self {
        self.update = Some(update);
        self
    }

    pub fn with_sync(mut self, sync: SyncLabel) -> Self {
        self.sync = Some(sync);
        self
    }

    /// The value variable this transition writes, if any (clock resets excluded)
    pub fn assigned(&self) -> Option<(&str, Bit)> {
        match &self.update {
            Some(Update::Assign { var, value }) => Some((var.as_str(), *value)),
            _ => None,
        }
    }

    /// The value variable this transition tests, if any
    pub fn tested(&self) -> Option<(&str, Bit)> {
        match &self.guard {
            Some(Guard::Equals { var, value }) => Some((var.as_str(), *value)),
            None => None,
        }
    }
}

#[derive(Clone, Copy, Hash, PartialEq, Eq, Default)]
pub struct LocationId(u32);
entity_impl!(LocationId, "loc");

#[derive(Clone, Copy, Hash, PartialEq, Eq, Default)]
pub struct TransitionId(u32);
entity_impl!(TransitionId, "edge");

/// A timed-automaton template: a graph of locations and transitions with
/// exactly one initial location. Templates may declare local clocks and
/// take broadcast channels as reference parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub name: String,
    /// Names of `broadcast chan &name` parameters, in order
    pub parameters: Vec<String>,
    /// Names of local clocks
    pub clocks: Vec<String>,
    init: LocationId,
    locations: PrimaryMap<LocationId, Location>,
    transitions: PrimaryMap<TransitionId, Transition>,
}

impl Template {
    /// Creates a template whose only location is `init`
    pub fn new(name: impl Into<String>, init: Location) -> Self {
        let mut locations = PrimaryMap::new();
        let init = locations.push(init);
        Self {
            name: name.into(),
            parameters: vec![],
            clocks: vec![],
            init,
            locations,
            transitions: PrimaryMap::new(),
        }
    }

    pub fn init(&self) -> LocationId {
        self.init
    }

    pub fn add_location(&mut self, location: Location) -> LocationId {
        self.locations.push(location)
    }

    pub fn add_transition(&mut self, transition: Transition) -> TransitionId {
        self.transitions.push(transition)
    }

    pub fn is_valid_location(&self, id: LocationId) -> bool {
        self.locations.is_valid(id)
    }

    pub fn locations(&self) -> impl Iterator<Item = (LocationId, &Location)> {
        self.locations.iter()
    }

    pub fn transitions(&self) -> impl Iterator<Item = (TransitionId, &Transition)> {
        self.transitions.iter()
    }

    pub fn num_locations(&self) -> usize {
        self.locations.len()
    }

    pub fn num_transitions(&self) -> usize {
        self.transitions.len()
    }

    pub fn location_by_name(&self, name: &str) -> Option<LocationId> {
        self.locations
            .iter()
            .find(|(_, loc)| loc.name == name)
            .map(|(id, _)| id)
    }

    /// Number of (incoming, outgoing) transitions for every location
    pub fn degrees(&self) -> SecondaryMap<LocationId, (usize, usize)> {
        let mut degrees: SecondaryMap<LocationId, (usize, usize)> = SecondaryMap::new();
        for (_, t) in self.transitions.iter() {
            degrees[t.target].0 += 1;
            degrees[t.source].1 += 1;
        }
        degrees
    }

    /// Transitions carrying a sync label of the given polarity
    pub fn syncs(&self, polarity: Polarity) -> impl Iterator<Item = &Transition> {
        self.transitions
            .values()
            .filter(move |t| t.sync.as_ref().is_some_and(|s| s.polarity == polarity))
    }
}

impl Index<LocationId> for Template {
    type Output = Location;

    fn index(&self, index: LocationId) -> &Self::Output {
        &self.locations[index]
    }
}

impl Index<TransitionId> for Template {
    type Output = Transition;

    fn index(&self, index: TransitionId) -> &Self::Output {
        &self.transitions[index]
    }
}
