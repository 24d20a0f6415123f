//! End-to-end checks against the public API.

use std::sync::Arc;
use std::time::Duration;

use flood_control::{CheckContext, FloodControl, FloodControlConfig, FloodControlError, RateGate};

fn gate_from_yaml(yaml: &str) -> RateGate {
    let config = FloodControlConfig::from_yaml(yaml).unwrap();
    RateGate::new(config.gate).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_burst_expiry_cycle_from_config() {
    let gate = gate_from_yaml(
        r#"
gate:
  window_ms: 10000
  max_checks: 5
"#,
    );
    let ctx = CheckContext::background();

    let mut results = Vec::new();
    for _ in 0..6 {
        results.push(gate.check(&ctx, 123).await.unwrap());
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
    assert_eq!(results, vec![true, true, true, true, true, false]);

    tokio::time::sleep(Duration::from_secs(11)).await;
    assert!(gate.check(&ctx, 123).await.unwrap());
}

#[tokio::test]
async fn test_injected_gate_shared_by_handlers() {
    let gate: Arc<dyn FloodControl> = Arc::new(gate_from_yaml(
        r#"
gate:
  window_ms: 60000
  max_checks: 3
"#,
    ));

    let handlers: Vec<_> = (0..4)
        .map(|user_id| {
            let gate = gate.clone();
            tokio::spawn(async move {
                let ctx = CheckContext::background();
                let mut admitted = 0;
                for _ in 0..5 {
                    if gate.check(&ctx, user_id).await.unwrap() {
                        admitted += 1;
                    }
                }
                admitted
            })
        })
        .collect();

    for handler in handlers {
        assert_eq!(handler.await.unwrap(), 3);
    }
}

#[tokio::test]
async fn test_rejection_is_distinct_from_error() {
    let gate = gate_from_yaml("gate:\n  max_checks: 0\n");
    let ctx = CheckContext::background();

    // Over the limit: a decision, not an error.
    assert!(matches!(gate.check(&ctx, 1).await, Ok(false)));

    // Cancelled: no decision at all.
    let cancelled = CheckContext::background();
    cancelled.cancel();
    match gate.check(&cancelled, 1).await {
        Err(err) => assert!(err.is_cancellation()),
        Ok(admitted) => panic!("cancelled check returned a decision: {}", admitted),
    }
    assert_eq!(gate.history_len(1), Some(1));
}

#[test]
fn test_invalid_config_is_reported() {
    let err = tokio_test::assert_err!(FloodControlConfig::from_yaml("gate:\n  window_ms: 0\n"));
    assert!(matches!(err, FloodControlError::Config(_)));
}

#[test]
fn test_check_from_blocking_caller() {
    let gate = gate_from_yaml("gate:\n  max_checks: 1\n");
    let ctx = CheckContext::background();

    assert!(tokio_test::assert_ok!(tokio_test::block_on(gate.check(&ctx, 8))));
    assert!(!tokio_test::assert_ok!(tokio_test::block_on(gate.check(&ctx, 8))));
}
