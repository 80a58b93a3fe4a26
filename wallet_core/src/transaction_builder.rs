//! Turns a validated amount into an unsigned transfer.

use std::sync::Arc;

use bos_rpc::ChainClient;
use bos_transactions::Transaction;
use bos_types::{ChainAddress, Decimal, Lamports, TypesError};
use tracing::{debug, warn};

use crate::error::BuildError;
use crate::session::WalletSession;

pub struct TransactionBuilder {
    chain: Arc<dyn ChainClient>,
    session: WalletSession,
    preflight_balance: bool,
}

impl TransactionBuilder {
    pub fn new(chain: Arc<dyn ChainClient>, session: WalletSession) -> Self {
        Self {
            chain,
            session,
            preflight_balance: true,
        }
    }

    /// Enable or disable the advisory balance check before building.
    pub fn with_preflight_balance(mut self, enabled: bool) -> Self {
        self.preflight_balance = enabled;
        self
    }

    /// Build an unsigned transfer of `amount` SOL from `from` to `to`.
    ///
    /// Fetches a fresh blockhash. When the pre-flight check is enabled and the
    /// balance read succeeds, a balance below the transfer amount fails fast;
    /// a failed balance read is logged and ignored.
    pub async fn build(
        &self,
        from: &ChainAddress,
        to: &ChainAddress,
        amount: Decimal,
    ) -> Result<Transaction, BuildError> {
        let lamports = Lamports::from_sol(amount).map_err(|e| match e {
            TypesError::AmountOverflow => BuildError::AmountOverflow,
            _ => BuildError::AmountTooSmall,
        })?;
        if lamports.is_zero() {
            return Err(BuildError::AmountTooSmall);
        }
        if from == to {
            return Err(BuildError::SelfTransfer);
        }
        if !self.session.has_signing_capability(from) {
            return Err(BuildError::NoSenderKey(*from));
        }

        let freshness = self.chain.get_latest_blockhash().await?;

        if self.preflight_balance {
            match self.chain.get_balance(from).await {
                Ok(available) if available < lamports => {
                    return Err(BuildError::InsufficientFunds {
                        needed: lamports,
                        available,
                    });
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "balance pre-flight failed; continuing"),
            }
        }

        debug!(
            from = %from,
            to = %to,
            lamports = lamports.raw(),
            blockhash = %freshness.blockhash,
            "transfer built"
        );
        Transaction::new(*from, *to, lamports, amount, freshness)
            .map_err(|_| BuildError::AmountTooSmall)
    }
}
