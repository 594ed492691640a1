//! Random operation sequences never break the ledger's invariants.

use collateral_ledger::LedgerConfig;
use collateral_ledger_testkit::generators::{ledger_config, op_sequence};
use collateral_ledger_testkit::InvariantHandler;
use proptest::prelude::*;

fn run_session(config: LedgerConfig, ops: &[collateral_ledger_testkit::Op]) -> Result<(), String> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .map_err(|e| e.to_string())?;
    rt.block_on(async {
        let mut handler = InvariantHandler::new(config);
        for (i, op) in ops.iter().enumerate() {
            handler
                .step(op)
                .await
                .map_err(|e| format!("step {} ({:?}): {}", i, op, e))?;
        }
        Ok(())
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn invariants_hold_under_default_config(ops in op_sequence(80)) {
        let outcome = run_session(LedgerConfig::default(), &ops);
        prop_assert!(outcome.is_ok(), "{:?}", outcome);
    }

    #[test]
    fn invariants_hold_under_any_config(config in ledger_config(), ops in op_sequence(60)) {
        let outcome = run_session(config, &ops);
        prop_assert!(outcome.is_ok(), "{:?}", outcome);
    }
}
