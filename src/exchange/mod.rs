// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Consent-Gated Exchange
//!
//! Orchestrates the four external services (wallet key provider, content
//! store, identity ledger, request ledger) into the subject and requester
//! workflows:
//!
//! - **register**: hash the profile, claim the hash, self-encrypt, upload,
//!   record on the identity ledger.
//! - **list_requests**: read the subject's requests.
//! - **approve**: decrypt own profile, project onto the requested fields,
//!   re-encrypt to the requester, upload, point the (subject, requester)
//!   delivery slot at it, mark the request Approved.
//! - **reject**: mark the request Rejected. No data moves.
//! - **create_request** / **read_delivery**: the requester's side.
//!
//! Each operation is one linear sequence of awaited calls. A failure at any
//! step returns immediately and nothing later runs. The only durable writes
//! are ledger writes, and the status transition is always the last one, so a
//! failed approval leaves the request Pending and can be retried.

pub mod error;
pub mod profile;

use std::sync::Arc;

use alloy::primitives::{Address, B256};
use tracing::{info, warn};

use crate::content::{ContentId, ContentStore};
use crate::ledger::{
    DataRequest, IdentityLedger, IdentityRecord, LedgerError, RequestLedger, RequestStatus,
    TxReceipt,
};
use crate::wallet::{EncryptedEnvelope, Session, WalletKeyProvider};

pub use error::{ExchangeError, ExchangeResult};
pub use profile::{validate_requested_fields, Profile, ProfileError, ProfileField};

/// Outcome of a successful registration.
#[derive(Debug, Clone)]
pub struct Registration {
    pub subject: Address,
    pub data_hash: B256,
    pub content_id: ContentId,
    pub receipt: TxReceipt,
}

/// Outcome of an approval or rejection.
#[derive(Debug, Clone)]
pub struct Decision {
    /// The request as it stands after the decision.
    pub request: DataRequest,
    /// Payload delivered to the requester. `None` for rejections.
    pub delivery: Option<ContentId>,
    pub receipt: TxReceipt,
}

/// A payload a subject delivered to the calling requester, decrypted.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub subject: Address,
    pub content_id: ContentId,
    pub profile: Profile,
}

/// The consent workflow over its four collaborators.
#[derive(Clone)]
pub struct ConsentExchange {
    wallet: Arc<dyn WalletKeyProvider>,
    content: Arc<dyn ContentStore>,
    identity: Arc<dyn IdentityLedger>,
    requests: Arc<dyn RequestLedger>,
}

impl ConsentExchange {
    pub fn new(
        wallet: Arc<dyn WalletKeyProvider>,
        content: Arc<dyn ContentStore>,
        identity: Arc<dyn IdentityLedger>,
        requests: Arc<dyn RequestLedger>,
    ) -> Self {
        Self {
            wallet,
            content,
            identity,
            requests,
        }
    }

    /// Register `profile` as the session account's identity.
    pub async fn register(
        &self,
        session: &Session,
        profile: &Profile,
    ) -> ExchangeResult<Registration> {
        let subject = session.address();
        if profile.is_empty() {
            return Err(ProfileError::EmptyProfile.into());
        }

        let plaintext = profile.to_canonical_json();
        let data_hash = profile.data_hash();

        let owner = self
            .identity
            .check_hash_owner(data_hash)
            .await
            .map_err(ExchangeError::from_ledger_read)?;
        if owner != Address::ZERO {
            info!(%subject, %data_hash, %owner, "Profile hash already claimed");
            return Err(ExchangeError::AlreadyRegistered { hash: data_hash });
        }

        let public_key = self
            .wallet
            .public_key(subject)
            .await
            .map_err(|e| ExchangeError::KeyUnavailable(e.to_string()))?;

        let envelope = EncryptedEnvelope::seal(&public_key, &plaintext)
            .map_err(|e| ExchangeError::EncryptionFailed(e.to_string()))?;
        let sealed = envelope
            .to_bytes()
            .map_err(|e| ExchangeError::EncryptionFailed(e.to_string()))?;

        let content_id = self
            .content
            .put(sealed)
            .await
            .map_err(|e| ExchangeError::RegistrationFailed(format!("upload failed: {e}")))?;

        let receipt = self
            .identity
            .register_user(session, data_hash, &content_id, &public_key)
            .await
            .map_err(|e| match e {
                LedgerError::Reverted { ref reason, .. }
                    if reason.to_ascii_lowercase().contains("already registered") =>
                {
                    ExchangeError::AlreadyRegistered { hash: data_hash }
                }
                other => ExchangeError::RegistrationFailed(other.to_string()),
            })?;

        info!(
            %subject,
            %data_hash,
            %content_id,
            tx_hash = %receipt.tx_hash,
            "Identity registered"
        );

        Ok(Registration {
            subject,
            data_hash,
            content_id,
            receipt,
        })
    }

    /// Requests addressed to `subject`, oldest first. Empty is not an error.
    pub async fn list_requests(&self, subject: Address) -> ExchangeResult<Vec<DataRequest>> {
        self.requests
            .requests_for_subject(subject)
            .await
            .map_err(|e| ExchangeError::LedgerUnavailable(e.to_string()))
    }

    /// Approve a Pending request addressed to the session account.
    pub async fn approve(&self, session: &Session, id: u64) -> ExchangeResult<Decision> {
        let subject = session.address();
        let request = self.pending_request_for(session, id).await?;

        // Own profile, self-encrypted at registration.
        let own = self
            .registered(subject)
            .await?
            .ok_or(ExchangeError::SubjectNotRegistered(subject))?;
        let sealed = self
            .content
            .get(&own.content_id)
            .await
            .map_err(ExchangeError::from_content)?;
        let envelope = EncryptedEnvelope::from_bytes(&sealed)
            .map_err(|e| ExchangeError::CorruptPayload(e.to_string()))?;
        let plaintext = self
            .wallet
            .decrypt(&envelope, subject)
            .await
            .map_err(ExchangeError::from_decrypt)?;
        let profile = Profile::from_json(&plaintext)
            .map_err(|e| ExchangeError::CorruptPayload(e.to_string()))?;

        let projected = profile.project(&request.fields);

        let requester = self
            .registered(request.requester)
            .await?
            .ok_or(ExchangeError::RequesterNotRegistered(request.requester))?;
        let delivery = EncryptedEnvelope::seal(&requester.public_key, &projected.to_canonical_json())
            .and_then(|envelope| envelope.to_bytes())
            .map_err(|e| ExchangeError::EncryptionFailed(e.to_string()))?;
        let delivery_id = self
            .content
            .put(delivery)
            .await
            .map_err(ExchangeError::from_content)?;

        self.identity
            .set_requester_ipfs_hash(session, request.requester, &delivery_id)
            .await
            .map_err(ExchangeError::from_ledger_write)?;

        let receipt = match self.requests.approve_request(session, id).await {
            Ok(receipt) => receipt,
            Err(e) => return Err(self.transition_failure(id, e).await),
        };

        info!(
            request_id = id,
            %subject,
            requester = %request.requester,
            fields = projected.len(),
            %delivery_id,
            "Request approved"
        );

        Ok(Decision {
            request: DataRequest {
                status: RequestStatus::Approved,
                ..request
            },
            delivery: Some(delivery_id),
            receipt,
        })
    }

    /// Reject a Pending request addressed to the session account.
    pub async fn reject(&self, session: &Session, id: u64) -> ExchangeResult<Decision> {
        let request = self.pending_request_for(session, id).await?;

        let receipt = match self.requests.reject_request(session, id).await {
            Ok(receipt) => receipt,
            Err(e) => return Err(self.transition_failure(id, e).await),
        };

        info!(
            request_id = id,
            subject = %session.address(),
            requester = %request.requester,
            "Request rejected"
        );

        Ok(Decision {
            request: DataRequest {
                status: RequestStatus::Rejected,
                ..request
            },
            delivery: None,
            receipt,
        })
    }

    /// File a request for `fields` of `subject`'s profile as the session account.
    pub async fn create_request(
        &self,
        session: &Session,
        subject: Address,
        fields: &[String],
    ) -> ExchangeResult<DataRequest> {
        let requester = session.address();
        let fields: Vec<String> = validate_requested_fields(fields)?
            .into_iter()
            .map(|field| field.as_str().to_string())
            .collect();

        if self.registered(subject).await?.is_none() {
            return Err(ExchangeError::SubjectNotRegistered(subject));
        }
        if self.registered(requester).await?.is_none() {
            return Err(ExchangeError::RequesterNotRegistered(requester));
        }

        let request = self
            .requests
            .create_request(session, subject, &fields)
            .await
            .map_err(ExchangeError::from_ledger_write)?;

        info!(request_id = request.id, %requester, %subject, ?fields, "Data request created");
        Ok(request)
    }

    /// Decrypt what `subject` last delivered to the session account.
    pub async fn read_delivery(
        &self,
        session: &Session,
        subject: Address,
    ) -> ExchangeResult<Delivery> {
        let requester = session.address();
        let content_id = self
            .identity
            .requester_ipfs_hash(subject, requester)
            .await
            .map_err(ExchangeError::from_ledger_read)?
            .ok_or(ExchangeError::NoDelivery { subject, requester })?;

        let sealed = self
            .content
            .get(&content_id)
            .await
            .map_err(ExchangeError::from_content)?;
        let envelope = EncryptedEnvelope::from_bytes(&sealed)
            .map_err(|e| ExchangeError::CorruptPayload(e.to_string()))?;
        let plaintext = self
            .wallet
            .decrypt(&envelope, requester)
            .await
            .map_err(ExchangeError::from_decrypt)?;
        let profile = Profile::from_json(&plaintext)
            .map_err(|e| ExchangeError::CorruptPayload(e.to_string()))?;

        Ok(Delivery {
            subject,
            content_id,
            profile,
        })
    }

    /// Identity record for `address`, if registered.
    pub async fn identity(&self, address: Address) -> ExchangeResult<Option<IdentityRecord>> {
        self.registered(address).await
    }

    /// Account that claimed `data_hash`, if any.
    pub async fn hash_owner(&self, data_hash: B256) -> ExchangeResult<Option<Address>> {
        let owner = self
            .identity
            .check_hash_owner(data_hash)
            .await
            .map_err(ExchangeError::from_ledger_read)?;
        Ok((owner != Address::ZERO).then_some(owner))
    }

    /// Ledger and content store reachability.
    pub async fn health_check(&self) -> ExchangeResult<()> {
        self.identity
            .health_check()
            .await
            .map_err(|e| ExchangeError::LedgerUnavailable(e.to_string()))?;
        self.requests
            .health_check()
            .await
            .map_err(|e| ExchangeError::LedgerUnavailable(e.to_string()))?;
        self.content
            .health_check()
            .await
            .map_err(|e| ExchangeError::ContentStoreUnavailable(e.to_string()))
    }

    async fn registered(&self, address: Address) -> ExchangeResult<Option<IdentityRecord>> {
        self.identity
            .get_user(address)
            .await
            .map_err(ExchangeError::from_ledger_read)
    }

    /// Load request `id` and require that the session is its subject and it is Pending.
    async fn pending_request_for(&self, session: &Session, id: u64) -> ExchangeResult<DataRequest> {
        let request = self
            .requests
            .get_request(id)
            .await
            .map_err(ExchangeError::from_ledger_read)?
            .ok_or(ExchangeError::RequestNotFound(id))?;

        if request.subject != session.address() {
            warn!(request_id = id, caller = %session.address(), "Decision attempted by non-subject");
            return Err(ExchangeError::NotAuthorized {
                id,
                caller: session.address(),
            });
        }
        if request.status != RequestStatus::Pending {
            return Err(ExchangeError::InvalidState {
                id,
                status: request.status,
            });
        }
        Ok(request)
    }

    /// A status write failed. If the request meanwhile left Pending, report
    /// that instead of the raw revert.
    async fn transition_failure(&self, id: u64, error: LedgerError) -> ExchangeError {
        if matches!(error, LedgerError::Reverted { .. }) {
            if let Ok(Some(current)) = self.requests.get_request(id).await {
                if current.status.is_terminal() {
                    return ExchangeError::InvalidState {
                        id,
                        status: current.status,
                    };
                }
            }
        }
        warn!(request_id = id, error = %error, "Status transition failed; request left Pending");
        ExchangeError::from_ledger_write(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use alloy::primitives::keccak256;
    use tempfile::TempDir;

    use crate::content::InMemoryContentStore;
    use crate::ledger::{InMemoryIdentityLedger, InMemoryRequestLedger};
    use crate::storage::{SecureStorage, StoragePaths, WalletStatus};
    use crate::wallet::LocalKeyring;

    struct Harness {
        _temp: TempDir,
        keyring: LocalKeyring,
        content: Arc<InMemoryContentStore>,
        identity: Arc<InMemoryIdentityLedger>,
        requests: Arc<InMemoryRequestLedger>,
        exchange: ConsentExchange,
    }

    impl Harness {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let mut storage = SecureStorage::new(StoragePaths::new(temp.path()));
            storage.initialize().unwrap();

            let keyring = LocalKeyring::new(Arc::new(storage));
            let content = Arc::new(InMemoryContentStore::new());
            let identity = Arc::new(InMemoryIdentityLedger::new());
            let requests = Arc::new(InMemoryRequestLedger::new());

            let exchange = ConsentExchange::new(
                Arc::new(keyring.clone()),
                content.clone(),
                identity.clone(),
                requests.clone(),
            );

            Self {
                _temp: temp,
                keyring,
                content,
                identity,
                requests,
                exchange,
            }
        }

        fn account(&self) -> Session {
            let meta = self.keyring.create_wallet(OWNER, None).unwrap();
            self.keyring.session(meta.address.parse().unwrap()).unwrap()
        }

        async fn registered_account(&self, entries: &[(&str, &str)]) -> Session {
            let session = self.account();
            self.exchange
                .register(&session, &profile(entries))
                .await
                .unwrap();
            session
        }

        async fn request(&self, requester: &Session, subject: &Session, fields: &[&str]) -> DataRequest {
            self.exchange
                .create_request(requester, subject.address(), &names(fields))
                .await
                .unwrap()
        }

        async fn status_of(&self, id: u64) -> RequestStatus {
            self.requests.get_request(id).await.unwrap().unwrap().status
        }
    }

    fn profile(entries: &[(&str, &str)]) -> Profile {
        let raw: BTreeMap<String, String> = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Profile::from_map(raw).unwrap()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    const OWNER: &str = "user_operator";
    const ALICE: &[(&str, &str)] = &[("name", "A"), ("dob", "2004-03-14")];
    const BANK: &[(&str, &str)] = &[("name", "Bank")];

    // ========== Registration ==========

    #[tokio::test]
    async fn registration_claims_profile_hash() {
        let h = Harness::new();
        let subject = h.account();
        let p = profile(ALICE);

        assert_eq!(h.exchange.hash_owner(p.data_hash()).await.unwrap(), None);

        let registration = h.exchange.register(&subject, &p).await.unwrap();
        assert_eq!(registration.data_hash, p.data_hash());
        assert_eq!(
            h.exchange.hash_owner(p.data_hash()).await.unwrap(),
            Some(subject.address())
        );

        let record = h.exchange.identity(subject.address()).await.unwrap().unwrap();
        assert_eq!(record.content_id, registration.content_id);
        assert_eq!(record.data_hash, p.data_hash());
    }

    #[tokio::test]
    async fn stored_profile_is_ciphertext_for_the_subject() {
        let h = Harness::new();
        let subject = h.account();
        let p = profile(ALICE);
        let registration = h.exchange.register(&subject, &p).await.unwrap();

        let stored = h.content.get(&registration.content_id).await.unwrap();
        assert!(!stored
            .windows(b"2004-03-14".len())
            .any(|w| w == b"2004-03-14"));

        let envelope = EncryptedEnvelope::from_bytes(&stored).unwrap();
        let plaintext = h.keyring.decrypt(&envelope, subject.address()).await.unwrap();
        assert_eq!(Profile::from_json(&plaintext).unwrap(), p);
    }

    #[tokio::test]
    async fn registering_same_profile_twice_fails() {
        let h = Harness::new();
        let subject = h.account();
        let p = profile(ALICE);

        h.exchange.register(&subject, &p).await.unwrap();
        let err = h.exchange.register(&subject, &p).await.unwrap_err();

        assert!(matches!(err, ExchangeError::AlreadyRegistered { hash } if hash == p.data_hash()));
        assert_eq!(h.content.put_count(), 1);
    }

    #[tokio::test]
    async fn same_profile_cannot_be_claimed_by_another_account() {
        let h = Harness::new();
        h.registered_account(ALICE).await;

        let err = h
            .exchange
            .register(&h.account(), &profile(ALICE))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "ALREADY_REGISTERED");
    }

    #[tokio::test]
    async fn reregistering_with_different_data_succeeds() {
        let h = Harness::new();
        let subject = h.registered_account(ALICE).await;
        let updated = profile(&[("name", "A"), ("dob", "2004-03-15")]);

        let second = h.exchange.register(&subject, &updated).await.unwrap();

        let record = h.exchange.identity(subject.address()).await.unwrap().unwrap();
        assert_eq!(record.content_id, second.content_id);
        assert_eq!(
            h.exchange.hash_owner(updated.data_hash()).await.unwrap(),
            Some(subject.address())
        );
        assert_eq!(h.exchange.hash_owner(profile(ALICE).data_hash()).await.unwrap(), None);

        // The superseded profile is free for another account.
        let other = h.account();
        h.exchange.register(&other, &profile(ALICE)).await.unwrap();
        assert_eq!(
            h.exchange.hash_owner(profile(ALICE).data_hash()).await.unwrap(),
            Some(other.address())
        );
    }

    #[tokio::test]
    async fn failed_ledger_write_is_registration_failed() {
        let h = Harness::new();
        let subject = h.account();
        let p = profile(ALICE);

        h.identity.revert_next_write("out of gas").await;
        let err = h.exchange.register(&subject, &p).await.unwrap_err();

        assert!(matches!(err, ExchangeError::RegistrationFailed(_)));
        assert_eq!(h.exchange.hash_owner(p.data_hash()).await.unwrap(), None);
        assert!(h.exchange.identity(subject.address()).await.unwrap().is_none());

        h.exchange.register(&subject, &p).await.unwrap();
    }

    #[tokio::test]
    async fn locked_wallet_cannot_register() {
        let h = Harness::new();
        let subject = h.account();
        h.keyring
            .set_status(subject.address(), WalletStatus::Locked)
            .unwrap();

        let err = h
            .exchange
            .register(&subject, &profile(ALICE))
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::KeyUnavailable(_)));
        assert_eq!(h.content.put_count(), 0);
    }

    #[tokio::test]
    async fn empty_profile_is_rejected() {
        let h = Harness::new();
        let err = h
            .exchange
            .register(&h.account(), &Profile::new())
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "EMPTY_PROFILE");
    }

    // ========== Listing ==========

    #[tokio::test]
    async fn subject_without_requests_lists_nothing() {
        let h = Harness::new();
        let subject = h.registered_account(ALICE).await;
        assert!(h
            .exchange
            .list_requests(subject.address())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn listing_returns_subjects_requests_only() {
        let h = Harness::new();
        let subject = h.registered_account(ALICE).await;
        let other = h.registered_account(&[("name", "Other")]).await;
        let requester = h.registered_account(BANK).await;

        h.request(&requester, &subject, &["name"]).await;
        h.request(&requester, &subject, &["dob"]).await;
        h.request(&requester, &other, &["name"]).await;

        let listed = h.exchange.list_requests(subject.address()).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|r| r.subject == subject.address()));
        assert!(listed.iter().all(|r| r.status == RequestStatus::Pending));
    }

    #[tokio::test]
    async fn unreachable_ledger_is_reported() {
        let h = Harness::new();
        h.requests.set_unavailable(true);
        let err = h
            .exchange
            .list_requests(Address::repeat_byte(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::LedgerUnavailable(_)));
    }

    // ========== Approval ==========

    #[tokio::test]
    async fn approval_delivers_only_requested_fields() {
        let h = Harness::new();
        let subject = h.registered_account(ALICE).await;
        let requester = h.registered_account(BANK).await;
        let request = h.request(&requester, &subject, &["name"]).await;

        let decision = h.exchange.approve(&subject, request.id).await.unwrap();
        assert_eq!(decision.request.status, RequestStatus::Approved);
        assert_eq!(h.status_of(request.id).await, RequestStatus::Approved);

        let delivery = h
            .exchange
            .read_delivery(&requester, subject.address())
            .await
            .unwrap();
        assert_eq!(Some(delivery.content_id), decision.delivery);
        assert_eq!(delivery.profile, profile(&[("name", "A")]));
    }

    #[tokio::test]
    async fn projection_keeps_exactly_requested_subset() {
        let h = Harness::new();
        let subject = h
            .registered_account(&[("name", "A"), ("dob", "2004-03-14"), ("phone", "555-0100")])
            .await;
        let requester = h.registered_account(BANK).await;
        let request = h.request(&requester, &subject, &["name", "dob"]).await;

        h.exchange.approve(&subject, request.id).await.unwrap();

        let delivered = h
            .exchange
            .read_delivery(&requester, subject.address())
            .await
            .unwrap()
            .profile;
        assert_eq!(
            delivered.fields().collect::<Vec<_>>(),
            vec![ProfileField::Dob, ProfileField::Name]
        );
        assert_eq!(delivered.get(ProfileField::Phone), None);
    }

    #[tokio::test]
    async fn fields_the_subject_never_set_are_omitted() {
        let h = Harness::new();
        let subject = h.registered_account(ALICE).await;
        let requester = h.registered_account(BANK).await;
        let request = h.request(&requester, &subject, &["name", "gender"]).await;

        h.exchange.approve(&subject, request.id).await.unwrap();

        let delivered = h
            .exchange
            .read_delivery(&requester, subject.address())
            .await
            .unwrap()
            .profile;
        assert_eq!(delivered, profile(&[("name", "A")]));
    }

    #[tokio::test]
    async fn delivered_payload_is_not_readable_by_subject() {
        let h = Harness::new();
        let subject = h.registered_account(ALICE).await;
        let requester = h.registered_account(BANK).await;
        let request = h.request(&requester, &subject, &["name"]).await;

        let delivery_id = h
            .exchange
            .approve(&subject, request.id)
            .await
            .unwrap()
            .delivery
            .unwrap();

        let sealed = h.content.get(&delivery_id).await.unwrap();
        let envelope = EncryptedEnvelope::from_bytes(&sealed).unwrap();
        assert!(h.keyring.decrypt(&envelope, subject.address()).await.is_err());
    }

    #[tokio::test]
    async fn approvals_to_different_requesters_do_not_clobber() {
        let h = Harness::new();
        let subject = h.registered_account(ALICE).await;
        let bank = h.registered_account(BANK).await;
        let clinic = h.registered_account(&[("name", "Clinic")]).await;

        let for_bank = h.request(&bank, &subject, &["name"]).await;
        let for_clinic = h.request(&clinic, &subject, &["dob"]).await;

        let (a, b) = tokio::join!(
            h.exchange.approve(&subject, for_bank.id),
            h.exchange.approve(&subject, for_clinic.id)
        );
        a.unwrap();
        b.unwrap();

        let to_bank = h
            .exchange
            .read_delivery(&bank, subject.address())
            .await
            .unwrap();
        let to_clinic = h
            .exchange
            .read_delivery(&clinic, subject.address())
            .await
            .unwrap();
        assert_eq!(to_bank.profile, profile(&[("name", "A")]));
        assert_eq!(to_clinic.profile, profile(&[("dob", "2004-03-14")]));

        let own = h.exchange.identity(subject.address()).await.unwrap().unwrap();
        assert_ne!(own.content_id, to_bank.content_id);
    }

    #[tokio::test]
    async fn approve_then_reject_is_invalid_state() {
        let h = Harness::new();
        let subject = h.registered_account(ALICE).await;
        let requester = h.registered_account(BANK).await;
        let request = h.request(&requester, &subject, &["name"]).await;

        h.exchange.approve(&subject, request.id).await.unwrap();
        let err = h.exchange.reject(&subject, request.id).await.unwrap_err();

        assert!(matches!(
            err,
            ExchangeError::InvalidState { status: RequestStatus::Approved, .. }
        ));
        assert_eq!(h.status_of(request.id).await, RequestStatus::Approved);
    }

    #[tokio::test]
    async fn reject_then_approve_is_invalid_state() {
        let h = Harness::new();
        let subject = h.registered_account(ALICE).await;
        let requester = h.registered_account(BANK).await;
        let request = h.request(&requester, &subject, &["name"]).await;

        h.exchange.reject(&subject, request.id).await.unwrap();
        let err = h.exchange.approve(&subject, request.id).await.unwrap_err();

        assert!(matches!(
            err,
            ExchangeError::InvalidState { status: RequestStatus::Rejected, .. }
        ));
    }

    #[tokio::test]
    async fn failed_status_write_leaves_request_pending() {
        let h = Harness::new();
        let subject = h.registered_account(ALICE).await;
        let requester = h.registered_account(BANK).await;
        let request = h.request(&requester, &subject, &["name"]).await;

        h.requests.revert_next_write("nonce too low").await;
        let err = h.exchange.approve(&subject, request.id).await.unwrap_err();
        assert!(matches!(err, ExchangeError::TransactionReverted(_)));
        assert_eq!(h.status_of(request.id).await, RequestStatus::Pending);

        let retried = h.exchange.approve(&subject, request.id).await.unwrap();
        assert_eq!(retried.request.status, RequestStatus::Approved);
    }

    #[tokio::test]
    async fn failed_delivery_write_leaves_request_pending() {
        let h = Harness::new();
        let subject = h.registered_account(ALICE).await;
        let requester = h.registered_account(BANK).await;
        let request = h.request(&requester, &subject, &["name"]).await;

        h.identity.revert_next_write("out of gas").await;
        let err = h.exchange.approve(&subject, request.id).await.unwrap_err();

        assert_eq!(err.error_code(), "TRANSACTION_REVERTED");
        assert_eq!(h.status_of(request.id).await, RequestStatus::Pending);
        assert_eq!(h.identity.delivery_count().await, 0);
    }

    #[tokio::test]
    async fn only_the_subject_may_decide() {
        let h = Harness::new();
        let subject = h.registered_account(ALICE).await;
        let requester = h.registered_account(BANK).await;
        let request = h.request(&requester, &subject, &["name"]).await;

        let err = h.exchange.approve(&requester, request.id).await.unwrap_err();
        assert!(matches!(err, ExchangeError::NotAuthorized { caller, .. } if caller == requester.address()));

        let err = h.exchange.reject(&requester, request.id).await.unwrap_err();
        assert_eq!(err.error_code(), "NOT_AUTHORIZED");
        assert_eq!(h.status_of(request.id).await, RequestStatus::Pending);
    }

    #[tokio::test]
    async fn locked_wallet_denies_decryption() {
        let h = Harness::new();
        let subject = h.registered_account(ALICE).await;
        let requester = h.registered_account(BANK).await;
        let request = h.request(&requester, &subject, &["name"]).await;

        h.keyring
            .set_status(subject.address(), WalletStatus::Locked)
            .unwrap();
        let err = h.exchange.approve(&subject, request.id).await.unwrap_err();

        assert!(matches!(err, ExchangeError::DecryptionDenied(_)));
        assert_eq!(h.status_of(request.id).await, RequestStatus::Pending);
        assert_eq!(h.content.put_count(), 2);
    }

    #[tokio::test]
    async fn unknown_request_is_not_found() {
        let h = Harness::new();
        let subject = h.registered_account(ALICE).await;
        let err = h.exchange.approve(&subject, 404).await.unwrap_err();
        assert!(matches!(err, ExchangeError::RequestNotFound(404)));
    }

    #[tokio::test]
    async fn unregistered_requester_cannot_receive() {
        let h = Harness::new();
        let subject = h.registered_account(ALICE).await;
        let stranger = h.account();

        // Filed straight on the ledger, bypassing the exchange's checks.
        let request = h
            .requests
            .create_request(&stranger, subject.address(), &names(&["name"]))
            .await
            .unwrap();

        let err = h.exchange.approve(&subject, request.id).await.unwrap_err();
        assert!(matches!(err, ExchangeError::RequesterNotRegistered(a) if a == stranger.address()));
        assert_eq!(h.status_of(request.id).await, RequestStatus::Pending);
    }

    #[tokio::test]
    async fn missing_profile_content_is_reported() {
        let h = Harness::new();
        let subject = h.account();
        let requester = h.registered_account(BANK).await;
        let key = h.keyring.public_key(subject.address()).await.unwrap();

        h.identity
            .register_user(&subject, keccak256(b"gone"), &ContentId::new("QmGone"), &key)
            .await
            .unwrap();
        let request = h.request(&requester, &subject, &["name"]).await;

        let err = h.exchange.approve(&subject, request.id).await.unwrap_err();
        assert!(matches!(err, ExchangeError::ContentNotFound(id) if id.as_str() == "QmGone"));
    }

    #[tokio::test]
    async fn garbled_profile_is_corrupt_payload() {
        let h = Harness::new();
        let subject = h.account();
        let requester = h.registered_account(BANK).await;
        let key = h.keyring.public_key(subject.address()).await.unwrap();

        let garbage = h.content.put(b"definitely not an envelope".to_vec()).await.unwrap();
        h.identity
            .register_user(&subject, keccak256(b"garbage"), &garbage, &key)
            .await
            .unwrap();
        let request = h.request(&requester, &subject, &["name"]).await;

        let err = h.exchange.approve(&subject, request.id).await.unwrap_err();
        assert!(matches!(err, ExchangeError::CorruptPayload(_)));
    }

    #[tokio::test]
    async fn profile_with_unknown_keys_is_corrupt_payload() {
        let h = Harness::new();
        let subject = h.account();
        let requester = h.registered_account(BANK).await;
        let key = h.keyring.public_key(subject.address()).await.unwrap();

        let sealed = EncryptedEnvelope::seal(&key, br#"{"name":"A","salary":"1"}"#)
            .unwrap()
            .to_bytes()
            .unwrap();
        let id = h.content.put(sealed).await.unwrap();
        h.identity
            .register_user(&subject, keccak256(b"extra"), &id, &key)
            .await
            .unwrap();
        let request = h.request(&requester, &subject, &["name"]).await;

        let err = h.exchange.approve(&subject, request.id).await.unwrap_err();
        assert_eq!(err.error_code(), "CORRUPT_PAYLOAD");
    }

    // ========== Rejection ==========

    #[tokio::test]
    async fn rejection_moves_no_data() {
        let h = Harness::new();
        let subject = h.registered_account(ALICE).await;
        let requester = h.registered_account(BANK).await;
        let request = h.request(&requester, &subject, &["name"]).await;
        let uploads_before = h.content.put_count();

        let decision = h.exchange.reject(&subject, request.id).await.unwrap();

        assert_eq!(decision.request.status, RequestStatus::Rejected);
        assert!(decision.delivery.is_none());
        assert_eq!(h.status_of(request.id).await, RequestStatus::Rejected);
        assert_eq!(h.content.put_count(), uploads_before);
        assert!(matches!(
            h.exchange
                .read_delivery(&requester, subject.address())
                .await,
            Err(ExchangeError::NoDelivery { .. })
        ));
    }

    #[tokio::test]
    async fn rejection_works_with_locked_wallet() {
        let h = Harness::new();
        let subject = h.registered_account(ALICE).await;
        let requester = h.registered_account(BANK).await;
        let request = h.request(&requester, &subject, &["name"]).await;

        // Signing session opened before the lock; rejection needs no decryption.
        h.keyring
            .set_status(subject.address(), WalletStatus::Locked)
            .unwrap();
        h.exchange.reject(&subject, request.id).await.unwrap();
    }

    // ========== Requester side ==========

    #[tokio::test]
    async fn request_fields_are_validated() {
        let h = Harness::new();
        let subject = h.registered_account(ALICE).await;
        let requester = h.registered_account(BANK).await;

        let err = h
            .exchange
            .create_request(&requester, subject.address(), &[])
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "EMPTY_FIELD_SET");

        let err = h
            .exchange
            .create_request(&requester, subject.address(), &names(&["name", "salary"]))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_FIELD");

        let request = h
            .exchange
            .create_request(&requester, subject.address(), &names(&[" dob", "name", "dob"]))
            .await
            .unwrap();
        assert_eq!(request.fields, names(&["dob", "name"]));
    }

    #[tokio::test]
    async fn requests_need_registered_parties() {
        let h = Harness::new();
        let subject = h.registered_account(ALICE).await;
        let requester = h.registered_account(BANK).await;
        let stranger = h.account();

        let err = h
            .exchange
            .create_request(&requester, stranger.address(), &names(&["name"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::SubjectNotRegistered(_)));

        let err = h
            .exchange
            .create_request(&stranger, subject.address(), &names(&["name"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::RequesterNotRegistered(_)));
    }

    #[tokio::test]
    async fn nothing_delivered_yet() {
        let h = Harness::new();
        let subject = h.registered_account(ALICE).await;
        let requester = h.registered_account(BANK).await;

        let err = h
            .exchange
            .read_delivery(&requester, subject.address())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ExchangeError::NoDelivery { subject: s, requester: r }
                if s == subject.address() && r == requester.address()
        ));
    }

    #[tokio::test]
    async fn unregistered_address_has_no_identity() {
        let h = Harness::new();
        assert!(h
            .exchange
            .identity(Address::repeat_byte(0x33))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn health_reflects_ledger_reachability() {
        let h = Harness::new();
        h.exchange.health_check().await.unwrap();

        h.identity.set_unavailable(true);
        assert!(matches!(
            h.exchange.health_check().await,
            Err(ExchangeError::LedgerUnavailable(_))
        ));
    }
}
