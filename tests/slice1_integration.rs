//! Integration tests for Slice 1 - hashing and the phase lattice
//!
//! Tests the canonical hasher contract and the phase algebra the engine steps through

use cell28::core::hasher::{canonicalize, hash_str, hash_value, low32, render, round_to};
use cell28::core::Barrier;
use cell28::types::{EngineError, Phase};
use cell28::SENTINEL_HASH;
use pretty_assertions::assert_eq;
use serde_json::json;

/// Same value, any key order: same hash
#[test]
fn test_hash_ignores_key_order() {
    let a = json!({"inputsHash": "h:1", "outputsHash": "h:2", "policyHash": "p"});
    let b = json!({"policyHash": "p", "inputsHash": "h:1", "outputsHash": "h:2"});
    assert_eq!(canonicalize(&a), canonicalize(&b));
    assert_eq!(hash_value(&a), hash_value(&b));
}

/// Nested objects are sorted at every level
#[test]
fn test_nested_canonical_form() {
    let value = json!({"b": [1, {"z": true, "a": null}], "a": "x"});
    assert_eq!(canonicalize(&value), r#"{"a":"x","b":[1,{"a":null,"z":true}]}"#);
}

/// Floats render in their shortest form; integers without a fraction
#[test]
fn test_number_rendering() {
    assert_eq!(canonicalize(&json!([1.0, 0.5, 0.32, 100])), "[1,0.5,0.32,100]");
    assert_eq!(canonicalize(&json!(1e-7)), "1e-7");
    assert_eq!(canonicalize(&json!(-0.0)), "0");
}

/// Hash format is h: + 8 lowercase hex
#[test]
fn test_hash_format() {
    let h = hash_str("⟁Pop⟁");
    assert!(h.starts_with("h:"));
    assert_eq!(h.len(), 10);
    assert!(h[2..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    assert_eq!(render(low32(&h)), h);
}

/// Sentinel is never produced by ordinary subjects in practice, and low32 of it is 0
#[test]
fn test_sentinel() {
    assert_eq!(low32(SENTINEL_HASH), 0);
    assert_ne!(hash_str(""), SENTINEL_HASH);
}

/// Canonical hash is a pure function
#[test]
fn test_hash_deterministic() {
    let value = json!({"reward": 0.3, "creditsHash": "h:abc", "policyHash": "p"});
    let first = hash_value(&value);
    for _ in 0..10 {
        assert_eq!(hash_value(&value), first);
    }
}

/// Rounding keeps six decimals and normalises non-finite values
#[test]
fn test_round_to_six() {
    assert_eq!(round_to(0.123_456_789, 6), 0.123_457);
    assert_eq!(round_to(f64::NAN, 6), 0.0);
    assert_eq!(round_to(f64::INFINITY, 6), 0.0);
}

/// Twelve ticks from perceive: two full cycles
#[test]
fn test_phase_cycle() {
    let observed: Vec<Phase> = (0..12).map(Phase::at_tick).collect();
    let mut expected = Phase::ALL.to_vec();
    expected.extend(Phase::ALL);
    assert_eq!(observed, expected);
}

/// The lattice never skips a phase
#[test]
fn test_advance_clamped() {
    for phase in Phase::ALL {
        assert_eq!(phase.advance(5), phase.successor());
        assert_eq!(phase.advance(0), phase);
        assert_eq!(phase.distance_to(phase.advance(3)), 1);
    }
}

/// Join and meet follow the total order
#[test]
fn test_join_meet() {
    assert_eq!(Phase::Reason.join(Phase::Act), Phase::Act);
    assert_eq!(Phase::Reason.meet(Phase::Act), Phase::Reason);
    assert_eq!(Phase::Reflect.join(Phase::Perceive), Phase::Reflect);
    for a in Phase::ALL {
        for b in Phase::ALL {
            assert_eq!(a.join(b), b.join(a));
            assert_eq!(a.meet(b), b.meet(a));
        }
    }
}

/// Offset and distance are inverse around the cycle
#[test]
fn test_offset_distance() {
    for a in Phase::ALL {
        for b in Phase::ALL {
            assert_eq!(a.offset(a.distance_to(b)), b);
        }
    }
    assert_eq!(Phase::Reflect.distance_to(Phase::Perceive), 1);
}

/// Barrier is strictly open/release alternating
#[test]
fn test_barrier_protocol() {
    let mut barrier = Barrier::new();
    assert!(matches!(barrier.release(), Err(EngineError::Protocol(_))));

    barrier.open(hash_str("transition")).unwrap();
    assert!(barrier.is_open());
    assert!(matches!(
        barrier.open(hash_str("again")),
        Err(EngineError::Protocol(_))
    ));

    assert_eq!(barrier.release().unwrap(), hash_str("transition"));
    assert!(!barrier.is_open());
}
