use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agrichain_actors::ActorType;
use agrichain_core::{Address, Aggregate, AggregateRoot, Amount, DomainError, ProductId};
use agrichain_events::Event;

/// Kind of produce. Codes are stable (0 = Fruits … 5 = Other).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProduceType {
    Fruits,
    Vegetables,
    Grains,
    Dairy,
    Meat,
    Other,
}

impl ProduceType {
    pub const ALL: [ProduceType; 6] = [
        ProduceType::Fruits,
        ProduceType::Vegetables,
        ProduceType::Grains,
        ProduceType::Dairy,
        ProduceType::Meat,
        ProduceType::Other,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProduceType::Fruits => "Fruits",
            ProduceType::Vegetables => "Vegetables",
            ProduceType::Grains => "Grains",
            ProduceType::Dairy => "Dairy",
            ProduceType::Meat => "Meat",
            ProduceType::Other => "Other",
        }
    }
}

/// Accepts the name (any case) or the numeric code.
impl FromStr for ProduceType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        if let Ok(code) = wanted.parse::<u8>() {
            return Self::from_code(code).ok_or_else(|| DomainError::InvalidProduceType(s.to_string()));
        }
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| DomainError::InvalidProduceType(s.to_string()))
    }
}

/// Product lifecycle: a strictly linear chain.
///
/// `Harvested → Processed → Shipped → Received` is driven by the owner one step at a
/// time; `Received → Sold` only happens through a purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProductState {
    Harvested,
    Processed,
    Shipped,
    Received,
    Sold,
}

impl ProductState {
    pub const ALL: [ProductState; 5] = [
        ProductState::Harvested,
        ProductState::Processed,
        ProductState::Shipped,
        ProductState::Received,
        ProductState::Sold,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    /// The state directly after this one, if any.
    pub fn next(self) -> Option<Self> {
        Self::from_code(self.code() + 1)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProductState::Harvested => "Harvested",
            ProductState::Processed => "Processed",
            ProductState::Shipped => "Shipped",
            ProductState::Received => "Received",
            ProductState::Sold => "Sold",
        }
    }
}

impl core::fmt::Display for ProductState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts the name (any case) or the numeric code.
impl FromStr for ProductState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        if let Ok(code) = wanted.parse::<u8>() {
            return Self::from_code(code).ok_or_else(|| DomainError::InvalidState(s.to_string()));
        }
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| DomainError::InvalidState(s.to_string()))
    }
}

/// One entry of a product's lifecycle history. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChange {
    pub new_state: ProductState,
    pub timestamp: DateTime<Utc>,
    pub actor: Address,
    pub location: String,
    pub notes: String,
}

/// Caller-supplied product details for creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub produce_type: ProduceType,
    pub quantity: u64,
    pub price: Amount,
    pub expiry_date: DateTime<Utc>,
    pub origin_farm: String,
}

/// Aggregate root: Product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    id: ProductId,
    name: String,
    description: String,
    produce_type: ProduceType,
    quantity: u64,
    price: Amount,
    harvest_date: DateTime<Utc>,
    expiry_date: DateTime<Utc>,
    origin_farm: String,
    quality_certificates: String,
    current_owner: Address,
    current_state: ProductState,
    history: Vec<StateChange>,
    ownership_history: Vec<Address>,
    version: u64,
    exists: bool,
}

impl Product {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: ProductId) -> Self {
        Self {
            id,
            name: String::new(),
            description: String::new(),
            produce_type: ProduceType::Other,
            quantity: 0,
            price: Amount::ZERO,
            harvest_date: DateTime::<Utc>::default(),
            expiry_date: DateTime::<Utc>::default(),
            origin_farm: String::new(),
            quality_certificates: String::new(),
            current_owner: Address::from_bytes([0; 20]),
            current_state: ProductState::Harvested,
            history: Vec::new(),
            ownership_history: Vec::new(),
            version: 0,
            exists: false,
        }
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn produce_type(&self) -> ProduceType {
        self.produce_type
    }

    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    pub fn price(&self) -> Amount {
        self.price
    }

    pub fn harvest_date(&self) -> DateTime<Utc> {
        self.harvest_date
    }

    pub fn expiry_date(&self) -> DateTime<Utc> {
        self.expiry_date
    }

    pub fn origin_farm(&self) -> &str {
        &self.origin_farm
    }

    pub fn quality_certificates(&self) -> &str {
        &self.quality_certificates
    }

    pub fn current_owner(&self) -> Address {
        self.current_owner
    }

    pub fn current_state(&self) -> ProductState {
        self.current_state
    }

    pub fn history(&self) -> &[StateChange] {
        &self.history
    }

    pub fn ownership_history(&self) -> &[Address] {
        &self.ownership_history
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    /// Informational only: expiry never blocks an operation.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiry_date
    }
}

impl AggregateRoot for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateProduct.
///
/// `creator_role` is the creator's role if they are a registered, active actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProduct {
    pub product_id: ProductId,
    pub creator: Address,
    pub creator_role: Option<ActorType>,
    pub product: NewProduct,
    pub occurred_at: DateTime<Utc>,
}

/// Command: TransferProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferProduct {
    pub product_id: ProductId,
    pub caller: Address,
    pub caller_active: bool,
    pub new_owner: Address,
    pub recipient_active: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ChangeProductState.
///
/// `location` is the caller's registered location, recorded in the history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeProductState {
    pub product_id: ProductId,
    pub caller: Address,
    pub caller_active: bool,
    pub location: String,
    pub new_state: ProductState,
    pub notes: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddQualityCertificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddQualityCertificate {
    pub product_id: ProductId,
    pub caller: Address,
    pub caller_active: bool,
    pub certificate: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: PurchaseProduct. The buyer need not be a registered actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseProduct {
    pub product_id: ProductId,
    pub buyer: Address,
    pub payment: Amount,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductCommand {
    CreateProduct(CreateProduct),
    TransferProduct(TransferProduct),
    ChangeProductState(ChangeProductState),
    AddQualityCertificate(AddQualityCertificate),
    PurchaseProduct(PurchaseProduct),
}

/// Event: ProductCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCreated {
    pub product_id: ProductId,
    pub creator: Address,
    pub product: NewProduct,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductTransferred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductTransferred {
    pub product_id: ProductId,
    pub from: Address,
    pub to: Address,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductStateChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductStateChanged {
    pub product_id: ProductId,
    pub new_state: ProductState,
    pub actor: Address,
    pub location: String,
    pub notes: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: QualityCertificateAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityCertificateAdded {
    pub product_id: ProductId,
    pub actor: Address,
    pub certificate: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductPurchased. `paid - price == refund`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPurchased {
    pub product_id: ProductId,
    pub seller: Address,
    pub buyer: Address,
    pub price: Amount,
    pub paid: Amount,
    pub refund: Amount,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductEvent {
    ProductCreated(ProductCreated),
    ProductTransferred(ProductTransferred),
    ProductStateChanged(ProductStateChanged),
    QualityCertificateAdded(QualityCertificateAdded),
    ProductPurchased(ProductPurchased),
}

impl Event for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::ProductCreated(_) => "products.product.created",
            ProductEvent::ProductTransferred(_) => "products.product.transferred",
            ProductEvent::ProductStateChanged(_) => "products.product.state_changed",
            ProductEvent::QualityCertificateAdded(_) => "products.product.certificate_added",
            ProductEvent::ProductPurchased(_) => "products.product.purchased",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ProductEvent::ProductCreated(e) => e.occurred_at,
            ProductEvent::ProductTransferred(e) => e.occurred_at,
            ProductEvent::ProductStateChanged(e) => e.occurred_at,
            ProductEvent::QualityCertificateAdded(e) => e.occurred_at,
            ProductEvent::ProductPurchased(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Product {
    type Command = ProductCommand;
    type Event = ProductEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ProductEvent::ProductCreated(e) => {
                self.id = e.product_id;
                self.name = e.product.name.clone();
                self.description = e.product.description.clone();
                self.produce_type = e.product.produce_type;
                self.quantity = e.product.quantity;
                self.price = e.product.price;
                self.harvest_date = e.occurred_at;
                self.expiry_date = e.product.expiry_date;
                self.origin_farm = e.product.origin_farm.clone();
                self.quality_certificates = String::new();
                self.current_owner = e.creator;
                self.current_state = ProductState::Harvested;
                self.history = vec![StateChange {
                    new_state: ProductState::Harvested,
                    timestamp: e.occurred_at,
                    actor: e.creator,
                    location: e.product.origin_farm.clone(),
                    notes: "Created".to_string(),
                }];
                self.ownership_history = vec![e.creator];
                self.exists = true;
            }
            ProductEvent::ProductTransferred(e) => {
                self.current_owner = e.to;
                self.ownership_history.push(e.to);
            }
            ProductEvent::ProductStateChanged(e) => {
                self.current_state = e.new_state;
                self.history.push(StateChange {
                    new_state: e.new_state,
                    timestamp: e.occurred_at,
                    actor: e.actor,
                    location: e.location.clone(),
                    notes: e.notes.clone(),
                });
            }
            ProductEvent::QualityCertificateAdded(e) => {
                if self.quality_certificates.is_empty() {
                    self.quality_certificates = e.certificate.clone();
                } else {
                    self.quality_certificates.push_str("; ");
                    self.quality_certificates.push_str(&e.certificate);
                }
            }
            ProductEvent::ProductPurchased(e) => {
                self.current_owner = e.buyer;
                self.current_state = ProductState::Sold;
                self.history.push(StateChange {
                    new_state: ProductState::Sold,
                    timestamp: e.occurred_at,
                    actor: e.buyer,
                    location: String::new(),
                    notes: "Purchased".to_string(),
                });
                self.ownership_history.push(e.buyer);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ProductCommand::CreateProduct(cmd) => self.handle_create(cmd),
            ProductCommand::TransferProduct(cmd) => self.handle_transfer(cmd),
            ProductCommand::ChangeProductState(cmd) => self.handle_change_state(cmd),
            ProductCommand::AddQualityCertificate(cmd) => self.handle_add_certificate(cmd),
            ProductCommand::PurchaseProduct(cmd) => self.handle_purchase(cmd),
        }
    }
}

impl Product {
    fn ensure_exists(&self, product_id: ProductId) -> Result<(), DomainError> {
        if !self.exists || self.id != product_id {
            return Err(DomainError::ProductNotFound(product_id));
        }
        Ok(())
    }

    /// Owner-gated operations: existence, then registration, then ownership.
    fn ensure_owner(
        &self,
        product_id: ProductId,
        caller: Address,
        caller_active: bool,
    ) -> Result<(), DomainError> {
        self.ensure_exists(product_id)?;
        if !caller_active {
            return Err(DomainError::NotAuthorized);
        }
        if self.current_owner != caller {
            return Err(DomainError::NotOwner);
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        if self.exists {
            return Err(DomainError::InvalidProductId(format!(
                "{} already exists",
                cmd.product_id
            )));
        }

        match cmd.creator_role {
            None => return Err(DomainError::NotAuthorized),
            Some(ActorType::Farmer) => {}
            Some(_) => return Err(DomainError::NotFarmer),
        }

        if cmd.product.quantity == 0 {
            return Err(DomainError::InvalidQuantity);
        }

        if cmd.product.expiry_date <= cmd.occurred_at {
            return Err(DomainError::ExpiredDate);
        }

        Ok(vec![ProductEvent::ProductCreated(ProductCreated {
            product_id: cmd.product_id,
            creator: cmd.creator,
            product: cmd.product.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_transfer(&self, cmd: &TransferProduct) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_owner(cmd.product_id, cmd.caller, cmd.caller_active)?;

        if !cmd.recipient_active {
            return Err(DomainError::UnregisteredRecipient);
        }

        if cmd.new_owner == cmd.caller {
            return Err(DomainError::SelfTransfer);
        }

        Ok(vec![ProductEvent::ProductTransferred(ProductTransferred {
            product_id: cmd.product_id,
            from: cmd.caller,
            to: cmd.new_owner,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_state(
        &self,
        cmd: &ChangeProductState,
    ) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_owner(cmd.product_id, cmd.caller, cmd.caller_active)?;

        // Sold is reachable only through a purchase.
        let allowed = self
            .current_state
            .next()
            .filter(|next| *next != ProductState::Sold);
        if allowed != Some(cmd.new_state) {
            return Err(DomainError::InvalidTransition {
                from: self.current_state.code(),
                to: cmd.new_state.code(),
            });
        }

        Ok(vec![ProductEvent::ProductStateChanged(ProductStateChanged {
            product_id: cmd.product_id,
            new_state: cmd.new_state,
            actor: cmd.caller,
            location: cmd.location.clone(),
            notes: cmd.notes.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_certificate(
        &self,
        cmd: &AddQualityCertificate,
    ) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_owner(cmd.product_id, cmd.caller, cmd.caller_active)?;

        Ok(vec![ProductEvent::QualityCertificateAdded(QualityCertificateAdded {
            product_id: cmd.product_id,
            actor: cmd.caller,
            certificate: cmd.certificate.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_purchase(&self, cmd: &PurchaseProduct) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_exists(cmd.product_id)?;

        if self.current_state != ProductState::Received {
            return Err(DomainError::NotReadyForSale);
        }

        let refund = cmd
            .payment
            .checked_sub(self.price)
            .ok_or(DomainError::InsufficientPayment {
                required: self.price,
                provided: cmd.payment,
            })?;

        Ok(vec![ProductEvent::ProductPurchased(ProductPurchased {
            product_id: cmd.product_id,
            seller: self.current_owner,
            buyer: cmd.buyer,
            price: self.price,
            paid: cmd.payment,
            refund,
            occurred_at: cmd.occurred_at,
        })])
    }
}
