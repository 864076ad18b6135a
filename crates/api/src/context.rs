use agrichain_core::Address;

/// Caller identity for a mutating request, taken from the `X-Caller-Address` header.
///
/// Every ledger operation is attributed to exactly one caller; handlers of mutating
/// routes can rely on this being present.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CallerContext {
    address: Address,
}

impl CallerContext {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    pub fn address(&self) -> Address {
        self.address
    }
}
