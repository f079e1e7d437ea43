//! Testing support for code built on the SDK
//!
//! - [`MemoryBinding`]: an in-memory [`PartnerBinding`](crate::partner::PartnerBinding)
//!   with scripted query pages, call counters and failure injection
//! - [`fixtures`]: sample `Account`/`Contact` entities and record helpers
//!
//! ```rust,ignore
//! use sforce_sdk::testing::{MemoryBinding, Account};
//! use sforce_sdk::{SalesforceService, ServiceConfig, SessionHandle};
//!
//! #[tokio::test]
//! async fn reads_accounts() {
//!     let binding = MemoryBinding::new().with_object_type("Account", Some("001"));
//!     let session = SessionHandle::new("https://memory.example.com", "session");
//!     let service = SalesforceService::connect(binding, session, ServiceConfig::default())
//!         .await
//!         .unwrap();
//!     let accounts: Vec<Account> = service.get_entities(None, None).await.unwrap();
//!     assert!(accounts.is_empty());
//! }
//! ```

pub mod fixtures;
pub mod memory_binding;

pub use fixtures::*;
pub use memory_binding::*;
