//! 交易记录服务
//!
//! 账目记录的增查改；广播、签名与 UTXO 选择不在职责范围内

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::repository::{NewTransaction, Transaction, TransactionRepository, TxnStatus};

#[derive(Debug, Error)]
pub enum TransactionServiceError {
    #[error("Transaction not found")]
    NotFound,
    #[error("Transaction reference already exists")]
    DuplicateReference,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub struct TransactionService {
    transactions: Arc<dyn TransactionRepository>,
}

impl TransactionService {
    pub fn new(transactions: Arc<dyn TransactionRepository>) -> Self {
        Self { transactions }
    }

    /// 新建交易记录；reference（服务商交易 ID）全局唯一
    pub async fn create(
        &self,
        params: NewTransaction,
    ) -> Result<Transaction, TransactionServiceError> {
        if self
            .transactions
            .find_by_reference(&params.reference)
            .await?
            .is_some()
        {
            return Err(TransactionServiceError::DuplicateReference);
        }

        Ok(self.transactions.insert(params).await?)
    }

    pub async fn list(&self) -> Result<Vec<Transaction>, TransactionServiceError> {
        Ok(self.transactions.list().await?)
    }

    pub async fn get(&self, txn_id: Uuid) -> Result<Transaction, TransactionServiceError> {
        self.transactions
            .find_by_id(txn_id)
            .await?
            .ok_or(TransactionServiceError::NotFound)
    }

    pub async fn update_status(
        &self,
        txn_id: Uuid,
        status: TxnStatus,
        confirmed_at: Option<DateTime<Utc>>,
    ) -> Result<Transaction, TransactionServiceError> {
        self.transactions
            .update_status(txn_id, status, confirmed_at)
            .await?
            .ok_or(TransactionServiceError::NotFound)
    }
}
