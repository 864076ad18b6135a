use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use agrichain_actors::{Actor, ActorType};
use agrichain_core::{Address, Amount, DomainError};
use agrichain_products::{Product, ProductPurchased, StateChange};

// -------------------------
// Request DTOs
// -------------------------

/// A field clients may send either as a number or as text (`3` / `"3"` / `"Received"`).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NumberOrText {
    Number(u64),
    Text(String),
}

impl NumberOrText {
    pub fn parse<T>(&self) -> Result<T, DomainError>
    where
        T: FromStr<Err = DomainError>,
    {
        match self {
            NumberOrText::Number(n) => n.to_string().parse(),
            NumberOrText::Text(s) => s.parse(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterActorRequest {
    pub name: String,
    #[serde(default)]
    pub location: String,
    pub actor_type: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub produce_type: NumberOrText,
    pub quantity: u64,
    pub price: NumberOrText,
    pub expiry_date: DateTime<Utc>,
    #[serde(default)]
    pub origin_farm: String,
}

#[derive(Debug, Deserialize)]
pub struct TransferProductRequest {
    pub new_owner: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangeStateRequest {
    pub new_state: NumberOrText,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Deserialize)]
pub struct AddCertificateRequest {
    pub certificate: String,
}

/// `value` is the payment attached to the purchase, in the smallest unit or with an
/// `eth` suffix.
#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    pub value: NumberOrText,
}

// -------------------------
// Response mapping
// -------------------------

/// Amounts go out as strings; they do not fit a JSON number.
fn amount_json(amount: Amount) -> serde_json::Value {
    serde_json::Value::String(amount.to_string())
}

pub fn actor_to_json(actor: &Actor) -> serde_json::Value {
    serde_json::json!({
        "address": actor.address(),
        "name": actor.name(),
        "location": actor.location(),
        "actor_type": actor.role().map(ActorType::as_str).unwrap_or(""),
        "is_active": actor.is_active(),
        "registration_date": actor.registration_date(),
    })
}

pub fn product_to_json(product: &Product) -> serde_json::Value {
    serde_json::json!({
        "id": product.id_typed(),
        "name": product.name(),
        "description": product.description(),
        "produce_type": product.produce_type().as_str(),
        "quantity": product.quantity(),
        "price": amount_json(product.price()),
        "harvest_date": product.harvest_date(),
        "expiry_date": product.expiry_date(),
        "origin_farm": product.origin_farm(),
        "quality_certificates": product.quality_certificates(),
        "current_owner": product.current_owner(),
        "current_state": product.current_state().as_str(),
    })
}

pub fn state_change_to_json(change: &StateChange) -> serde_json::Value {
    serde_json::json!({
        "new_state": change.new_state.as_str(),
        "timestamp": change.timestamp,
        "actor": change.actor,
        "location": change.location,
        "notes": change.notes,
    })
}

pub fn purchase_to_json(purchase: &ProductPurchased) -> serde_json::Value {
    serde_json::json!({
        "product_id": purchase.product_id,
        "seller": purchase.seller,
        "buyer": purchase.buyer,
        "price": amount_json(purchase.price),
        "paid": amount_json(purchase.paid),
        "refund": amount_json(purchase.refund),
    })
}

pub fn balance_to_json(address: Address, balance: Amount) -> serde_json::Value {
    serde_json::json!({
        "address": address,
        "balance": amount_json(balance),
        "balance_ether": balance.to_ether_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use agrichain_products::{ProduceType, ProductState};

    #[test]
    fn number_or_text_parses_codes_and_names() {
        let by_code: NumberOrText = serde_json::from_str("3").unwrap();
        let by_name: NumberOrText = serde_json::from_str("\"received\"").unwrap();
        assert_eq!(by_code.parse::<ProductState>().unwrap(), ProductState::Received);
        assert_eq!(by_name.parse::<ProductState>().unwrap(), ProductState::Received);

        let bad: NumberOrText = serde_json::from_str("9").unwrap();
        assert!(bad.parse::<ProduceType>().is_err());
    }

    #[test]
    fn amounts_accept_ether_text() {
        let value: NumberOrText = serde_json::from_str("\"0.1 eth\"").unwrap();
        assert_eq!(
            value.parse::<Amount>().unwrap(),
            Amount::new(100_000_000_000_000_000)
        );
    }

    #[test]
    fn unknown_actor_renders_inactive() {
        let json = actor_to_json(&Actor::empty(Address::from_low_u64(7)));
        assert_eq!(json["is_active"], false);
        assert_eq!(json["name"], "");
        assert_eq!(json["actor_type"], "");
    }
}
