//! # Collateral Ledger Testkit
//!
//! Testing utilities for the collateral ledger.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Derived deposit ids pinned to exact bytes
//! - **Generators**: Proptest strategies for ids, policies and operation sequences
//! - **Fixtures**: A ready ledger over in-memory storage and token
//! - **Handler**: A model that drives random operations and checks the
//!   ledger's invariants after every step
//!
//! ## Golden Vectors
//!
//! ```rust
//! use collateral_ledger_testkit::vectors::verify_all_vectors;
//!
//! for (name, ok, hex) in verify_all_vectors() {
//!     assert!(ok, "{} derived {}", name, hex);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use collateral_ledger_testkit::{generators::op_sequence, InvariantHandler};
//!
//! proptest! {
//!     #[test]
//!     fn conservation_holds(ops in op_sequence(64)) {
//!         let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
//!         rt.block_on(async {
//!             let mut handler = InvariantHandler::new(Default::default());
//!             for op in &ops {
//!                 handler.step(op).await.unwrap();
//!             }
//!         });
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,ignore
//! use collateral_ledger_testkit::fixtures::TestFixture;
//!
//! let mut fixture = TestFixture::new();
//! let id = fixture.open_locked(100, 10).await;
//! ```

pub mod fixtures;
pub mod generators;
pub mod handler;
pub mod vectors;

pub use fixtures::{multi_party_accounts, TestFixture, INITIAL_BALANCE};
pub use generators::{op_sequence, Op};
pub use handler::InvariantHandler;
pub use vectors::{all_vectors, verify_all_vectors, GoldenVector};
