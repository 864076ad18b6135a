use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agrichain_core::{Address, Aggregate, AggregateRoot, DomainError};
use agrichain_events::Event;

/// Declared role of a registered participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorType {
    Farmer,
    Processor,
    Distributor,
    Retailer,
}

impl ActorType {
    pub const ALL: [ActorType; 4] = [
        ActorType::Farmer,
        ActorType::Processor,
        ActorType::Distributor,
        ActorType::Retailer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActorType::Farmer => "Farmer",
            ActorType::Processor => "Processor",
            ActorType::Distributor => "Distributor",
            ActorType::Retailer => "Retailer",
        }
    }
}

impl core::fmt::Display for ActorType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActorType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| DomainError::InvalidActorType(s.to_string()))
    }
}

/// Aggregate root: Actor (one per caller identity).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    address: Address,
    name: String,
    location: String,
    actor_type: ActorType,
    is_active: bool,
    registration_date: DateTime<Utc>,
    version: u64,
}

impl Actor {
    /// An identity with no registration: inactive, empty profile.
    pub fn empty(address: Address) -> Self {
        Self {
            address,
            name: String::new(),
            location: String::new(),
            actor_type: ActorType::Farmer,
            is_active: false,
            registration_date: DateTime::<Utc>::default(),
            version: 0,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn actor_type(&self) -> ActorType {
        self.actor_type
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn registration_date(&self) -> DateTime<Utc> {
        self.registration_date
    }

    pub fn is_registered(&self) -> bool {
        self.version > 0
    }

    /// Declared role; an unregistered identity has none.
    pub fn role(&self) -> Option<ActorType> {
        self.is_registered().then_some(self.actor_type)
    }
}

impl AggregateRoot for Actor {
    type Id = Address;

    fn id(&self) -> &Self::Id {
        &self.address
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RegisterActor (keyed by the caller's identity).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterActor {
    pub address: Address,
    pub name: String,
    pub location: String,
    pub actor_type: ActorType,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActorCommand {
    RegisterActor(RegisterActor),
}

/// Event: ActorRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorRegistered {
    pub address: Address,
    pub name: String,
    pub location: String,
    pub actor_type: ActorType,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActorEvent {
    ActorRegistered(ActorRegistered),
}

impl Event for ActorEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ActorEvent::ActorRegistered(_) => "actors.actor.registered",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ActorEvent::ActorRegistered(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Actor {
    type Command = ActorCommand;
    type Event = ActorEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ActorEvent::ActorRegistered(e) => {
                self.address = e.address;
                self.name = e.name.clone();
                self.location = e.location.clone();
                self.actor_type = e.actor_type;
                self.is_active = true;
                self.registration_date = e.occurred_at;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ActorCommand::RegisterActor(cmd) => self.handle_register(cmd),
        }
    }
}

impl Actor {
    fn handle_register(&self, cmd: &RegisterActor) -> Result<Vec<ActorEvent>, DomainError> {
        if self.is_registered() {
            return Err(DomainError::AlreadyRegistered);
        }

        if cmd.name.trim().is_empty() {
            return Err(DomainError::EmptyName);
        }

        if cmd.address != self.address {
            return Err(DomainError::NotAuthorized);
        }

        Ok(vec![ActorEvent::ActorRegistered(ActorRegistered {
            address: cmd.address,
            name: cmd.name.clone(),
            location: cmd.location.clone(),
            actor_type: cmd.actor_type,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn farmer_address() -> Address {
        Address::from_low_u64(1)
    }

    fn register(address: Address, name: &str, actor_type: ActorType) -> ActorCommand {
        ActorCommand::RegisterActor(RegisterActor {
            address,
            name: name.to_string(),
            location: "Green Valley, CA".to_string(),
            actor_type,
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn register_emits_actor_registered_event() {
        let actor = Actor::empty(farmer_address());
        let events = actor
            .handle(&register(farmer_address(), "John Farmer", ActorType::Farmer))
            .unwrap();

        assert_eq!(events.len(), 1);
        match &events[0] {
            ActorEvent::ActorRegistered(e) => {
                assert_eq!(e.address, farmer_address());
                assert_eq!(e.name, "John Farmer");
                assert_eq!(e.actor_type, ActorType::Farmer);
            }
        }
    }

    #[test]
    fn applying_registration_activates_the_actor() {
        let mut actor = Actor::empty(farmer_address());
        assert!(!actor.is_active());

        let events = actor
            .handle(&register(farmer_address(), "John Farmer", ActorType::Farmer))
            .unwrap();
        actor.apply(&events[0]);

        assert!(actor.is_active());
        assert!(actor.is_registered());
        assert_eq!(actor.name(), "John Farmer");
        assert_eq!(actor.location(), "Green Valley, CA");
        assert_eq!(actor.version(), 1);
    }

    #[test]
    fn unregistered_identity_has_no_role() {
        let mut actor = Actor::empty(farmer_address());
        assert_eq!(actor.role(), None);

        let events = actor
            .handle(&register(farmer_address(), "Rita Retail", ActorType::Retailer))
            .unwrap();
        actor.apply(&events[0]);
        assert_eq!(actor.role(), Some(ActorType::Retailer));
    }

    #[test]
    fn register_twice_fails_with_already_registered() {
        let mut actor = Actor::empty(farmer_address());
        let events = actor
            .handle(&register(farmer_address(), "John Farmer", ActorType::Farmer))
            .unwrap();
        actor.apply(&events[0]);

        let err = actor
            .handle(&register(farmer_address(), "Duplicate Farmer", ActorType::Farmer))
            .unwrap_err();
        assert_eq!(err, DomainError::AlreadyRegistered);
    }

    #[test]
    fn register_rejects_blank_name() {
        let actor = Actor::empty(farmer_address());
        for name in ["", "   "] {
            let err = actor
                .handle(&register(farmer_address(), name, ActorType::Farmer))
                .unwrap_err();
            assert_eq!(err, DomainError::EmptyName);
        }
    }

    #[test]
    fn register_rejects_foreign_identity() {
        let actor = Actor::empty(farmer_address());
        let err = actor
            .handle(&register(Address::from_low_u64(2), "Someone", ActorType::Retailer))
            .unwrap_err();
        assert_eq!(err, DomainError::NotAuthorized);
    }

    #[test]
    fn actor_type_parsing_is_case_insensitive_and_closed() {
        assert_eq!("farmer".parse::<ActorType>().unwrap(), ActorType::Farmer);
        assert_eq!(" Retailer ".parse::<ActorType>().unwrap(), ActorType::Retailer);
        assert_eq!("DISTRIBUTOR".parse::<ActorType>().unwrap(), ActorType::Distributor);
        assert_eq!(
            "Famer".parse::<ActorType>().unwrap_err(),
            DomainError::InvalidActorType("Famer".to_string())
        );
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: a second registration always fails, whatever the inputs.
            #[test]
            fn second_registration_always_fails(
                first in "[A-Za-z][A-Za-z ]{0,30}",
                second in "[A-Za-z ]{0,30}",
                kind in 0usize..4,
            ) {
                let mut actor = Actor::empty(farmer_address());
                let events = actor
                    .handle(&register(farmer_address(), &first, ActorType::ALL[kind]))
                    .unwrap();
                actor.apply(&events[0]);

                let err = actor
                    .handle(&register(farmer_address(), &second, ActorType::ALL[kind]))
                    .unwrap_err();
                prop_assert_eq!(err, DomainError::AlreadyRegistered);
            }

            /// Property: handle never mutates state.
            #[test]
            fn handle_does_not_mutate(name in "[A-Za-z ]{0,30}") {
                let actor = Actor::empty(farmer_address());
                let before = actor.clone();
                let _ = actor.handle(&register(farmer_address(), &name, ActorType::Processor));
                prop_assert_eq!(before, actor);
            }
        }
    }
}
