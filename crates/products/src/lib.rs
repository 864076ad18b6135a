//! Product ledger domain module (event-sourced).
//!
//! Products are created by farmers, handed along the supply chain by ownership
//! transfers, advanced one lifecycle state at a time by their current owner, and sold
//! to a consumer once the retailer has received them. Implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod product;

pub use product::{
    AddQualityCertificate, ChangeProductState, CreateProduct, NewProduct, ProduceType, Product,
    ProductCommand, ProductCreated, ProductEvent, ProductPurchased, ProductState,
    ProductStateChanged, ProductTransferred, PurchaseProduct, QualityCertificateAdded,
    StateChange, TransferProduct,
};
