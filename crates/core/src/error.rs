//! Domain error model.

use thiserror::Error;

use crate::amount::Amount;
use crate::id::ProductId;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Coarse classification of a [`DomainError`].
///
/// Every domain error is deterministic given the same state and inputs, so none of
/// them is ever worth retrying unchanged.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The caller is not allowed to perform the operation.
    Authorization,
    /// The inputs or the current record state do not permit the operation.
    Validation,
    /// The referenced record does not exist.
    NotFound,
}

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures. Journal and lock
/// failures belong to the infrastructure layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("only registered and active actors can perform this action")]
    NotAuthorized,

    #[error("only farmers can create products")]
    NotFarmer,

    #[error("only product owner can perform this action")]
    NotOwner,

    #[error("actor already registered")]
    AlreadyRegistered,

    #[error("name cannot be empty")]
    EmptyName,

    #[error("invalid actor type: {0}")]
    InvalidActorType(String),

    #[error("invalid produce type: {0}")]
    InvalidProduceType(String),

    #[error("unknown product state: {0}")]
    InvalidState(String),

    #[error("quantity must be greater than 0")]
    InvalidQuantity,

    #[error("expiry date must be in the future")]
    ExpiredDate,

    #[error("invalid state transition ({from} -> {to})")]
    InvalidTransition { from: u8, to: u8 },

    #[error("cannot transfer to yourself")]
    SelfTransfer,

    #[error("new owner must be a registered actor")]
    UnregisteredRecipient,

    #[error("product must be received by retailer before purchase")]
    NotReadyForSale,

    #[error("insufficient payment (price {required}, paid {provided})")]
    InsufficientPayment { required: Amount, provided: Amount },

    #[error("value transfer failed: {0}")]
    ValueTransferFailed(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid product id: {0}")]
    InvalidProductId(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid sensor reading: {0}")]
    InvalidReading(String),

    #[error("product {0} does not exist")]
    ProductNotFound(ProductId),

    #[error("device not found: {0}")]
    DeviceNotFound(String),
}

impl DomainError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            DomainError::NotAuthorized
            | DomainError::NotFarmer
            | DomainError::NotOwner
            | DomainError::AlreadyRegistered => ErrorCategory::Authorization,
            DomainError::ProductNotFound(_) | DomainError::DeviceNotFound(_) => {
                ErrorCategory::NotFound
            }
            _ => ErrorCategory::Validation,
        }
    }

    /// Stable machine-readable code (used in API error bodies).
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::NotAuthorized => "not_authorized",
            DomainError::NotFarmer => "not_farmer",
            DomainError::NotOwner => "not_owner",
            DomainError::AlreadyRegistered => "already_registered",
            DomainError::EmptyName => "empty_name",
            DomainError::InvalidActorType(_) => "invalid_actor_type",
            DomainError::InvalidProduceType(_) => "invalid_produce_type",
            DomainError::InvalidState(_) => "invalid_state",
            DomainError::InvalidQuantity => "invalid_quantity",
            DomainError::ExpiredDate => "expired_date",
            DomainError::InvalidTransition { .. } => "invalid_transition",
            DomainError::SelfTransfer => "self_transfer",
            DomainError::UnregisteredRecipient => "unregistered_recipient",
            DomainError::NotReadyForSale => "not_ready_for_sale",
            DomainError::InsufficientPayment { .. } => "insufficient_payment",
            DomainError::ValueTransferFailed(_) => "value_transfer_failed",
            DomainError::InvalidAddress(_) => "invalid_address",
            DomainError::InvalidProductId(_) => "invalid_product_id",
            DomainError::InvalidAmount(_) => "invalid_amount",
            DomainError::InvalidReading(_) => "invalid_reading",
            DomainError::ProductNotFound(_) => "product_not_found",
            DomainError::DeviceNotFound(_) => "device_not_found",
        }
    }

    pub fn value_transfer(msg: impl Into<String>) -> Self {
        Self::ValueTransferFailed(msg.into())
    }

    pub fn invalid_address(msg: impl Into<String>) -> Self {
        Self::InvalidAddress(msg.into())
    }

    pub fn invalid_amount(msg: impl Into<String>) -> Self {
        Self::InvalidAmount(msg.into())
    }

    pub fn invalid_reading(msg: impl Into<String>) -> Self {
        Self::InvalidReading(msg.into())
    }
}
