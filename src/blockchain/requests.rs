// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request ledger backed by the data request registry contract.

use alloy::primitives::{Address, U256};
use alloy::providers::DynProvider;
use async_trait::async_trait;
use tracing::{debug, info};

use super::client::{classify, ChainClient};
use super::contracts::{DataRequestEntry, IDataRequestRegistry};
use crate::ledger::{DataRequest, LedgerError, LedgerResult, RequestLedger, RequestStatus, TxReceipt};
use crate::wallet::Session;

type Registry = IDataRequestRegistry::IDataRequestRegistryInstance<DynProvider>;

pub struct EvmRequestLedger {
    client: ChainClient,
    address: Address,
}

impl EvmRequestLedger {
    pub fn new(client: ChainClient, address: Address) -> Self {
        Self { client, address }
    }

    fn reader(&self) -> Registry {
        IDataRequestRegistry::new(self.address, self.client.provider().clone())
    }

    fn writer(&self, session: &Session) -> Registry {
        IDataRequestRegistry::new(self.address, self.client.signing_provider(session))
    }
}

fn request_from(entry: DataRequestEntry) -> LedgerResult<DataRequest> {
    let id: u64 = entry
        .id
        .try_into()
        .map_err(|_| LedgerError::InvalidResponse(format!("request id {} overflows", entry.id)))?;
    let status = RequestStatus::try_from(entry.status).map_err(|raw| {
        LedgerError::InvalidResponse(format!("request {id} has unknown status {raw}"))
    })?;

    Ok(DataRequest {
        id,
        requester: entry.requester,
        subject: entry.subject,
        fields: entry.fields,
        status,
    })
}

#[async_trait]
impl RequestLedger for EvmRequestLedger {
    async fn create_request(
        &self,
        session: &Session,
        subject: Address,
        fields: &[String],
    ) -> LedgerResult<DataRequest> {
        debug!(requester = %session.address(), %subject, ?fields, "Sending createRequest");

        let pending = self
            .writer(session)
            .createRequest(subject, fields.to_vec())
            .send()
            .await
            .map_err(|e| classify(e, "createRequest"))?;

        let (summary, receipt) = self.client.await_finality(pending, "createRequest").await?;

        let id = receipt
            .inner
            .logs()
            .iter()
            .find_map(|log| {
                log.log_decode::<IDataRequestRegistry::RequestCreated>()
                    .ok()
                    .map(|decoded| decoded.inner.data.id)
            })
            .ok_or_else(|| {
                LedgerError::InvalidResponse(format!(
                    "createRequest {} emitted no RequestCreated event",
                    summary.tx_hash
                ))
            })?;

        let id: u64 = id
            .try_into()
            .map_err(|_| LedgerError::InvalidResponse(format!("request id {id} overflows")))?;

        info!(request_id = id, requester = %session.address(), %subject, "Data request created");

        Ok(DataRequest {
            id,
            requester: session.address(),
            subject,
            fields: fields.to_vec(),
            status: RequestStatus::Pending,
        })
    }

    async fn get_request(&self, id: u64) -> LedgerResult<Option<DataRequest>> {
        match self.reader().getRequest(U256::from(id)).call().await {
            Ok(entry) if entry.requester == Address::ZERO => Ok(None),
            Ok(entry) => request_from(entry).map(Some),
            Err(e) => match classify(e, "getRequest") {
                LedgerError::Reverted { .. } => Ok(None),
                other => Err(other),
            },
        }
    }

    async fn requests_for_subject(&self, subject: Address) -> LedgerResult<Vec<DataRequest>> {
        let entries = self
            .reader()
            .getDetailedUserRequests(subject)
            .call()
            .await
            .map_err(|e| classify(e, "getDetailedUserRequests"))?;

        entries.into_iter().map(request_from).collect()
    }

    async fn approve_request(&self, session: &Session, id: u64) -> LedgerResult<TxReceipt> {
        let pending = self
            .writer(session)
            .approveRequest(U256::from(id))
            .send()
            .await
            .map_err(|e| classify(e, "approveRequest"))?;

        let (receipt, _) = self.client.await_finality(pending, "approveRequest").await?;
        Ok(receipt)
    }

    async fn reject_request(&self, session: &Session, id: u64) -> LedgerResult<TxReceipt> {
        let pending = self
            .writer(session)
            .rejectRequest(U256::from(id))
            .send()
            .await
            .map_err(|e| classify(e, "rejectRequest"))?;

        let (receipt, _) = self.client.await_finality(pending, "rejectRequest").await?;
        Ok(receipt)
    }

    async fn health_check(&self) -> LedgerResult<()> {
        self.client.block_number().await.map(|_| ())
    }
}
