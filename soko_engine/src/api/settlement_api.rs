use crate::{
    db_types::EscrowSummary,
    traits::{MarketplaceDatabase, MarketplaceError},
};

/// Read-only money views for platform operators.
#[derive(Clone)]
pub struct SettlementApi<B> {
    db: B,
}

impl<B> SettlementApi<B>
where B: MarketplaceDatabase
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// The funds currently held in escrow, recomputed from the order table on every call.
    pub async fn escrow_summary(&self) -> Result<EscrowSummary, MarketplaceError> {
        self.db.escrow_summary().await
    }
}
