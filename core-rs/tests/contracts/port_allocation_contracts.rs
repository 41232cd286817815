// Port Allocation Contract Tests
//
// These tests verify INVARIANTS that MUST NEVER BREAK regardless of implementation.
// They defend against regression by documenting WHY decisions were made.
//
// **Problem**: a refactor "simplifies" the allocation state machine without
// understanding the reservation guarantees
// **Solution**: contract tests that fail with clear explanation of what's being
// sacrificed

use portclaim_core::{PortAllocator, PortClaimConfig, PortClaimError, SharedPortState};

/// Config with every OS-dependent source off, so contract state is deterministic
fn quiet_config() -> PortClaimConfig {
    PortClaimConfig {
        exclude_well_known: false,
        scan_in_use: false,
        exclude_ephemeral: false,
        scan_os_excluded: false,
        ..Default::default()
    }
}

fn quiet_allocator() -> PortAllocator {
    PortAllocator::with_state(SharedPortState::new(), quiet_config())
}

/// WHY: An allocated port is reserved exactly once
/// REASON: Callers bind to the returned port; a port freed twice or never
///         reserved means two harnesses can collide
/// BREAKS: Single-reservation guarantee if changed
#[test]
fn allocated_port_is_in_range_and_released_exactly_once() {
    let allocator = quiet_allocator();

    let port = allocator.get_random_free_port_in_range(60000, 60100).unwrap();
    assert!((60000..=60100).contains(&port));

    // First release succeeds, second reports already-free
    assert!(allocator.mark_free(port as u32).unwrap());
    assert!(!allocator.mark_free(port as u32).unwrap());

    // If this test fails:
    // - Allocation no longer marks the port, or release no longer clears it
    // - Two callers can end up bound to the same port
}

/// WHY: mark_used must fail loudly on conflict; try_mark_used must not
/// REASON: The "must succeed" variant is used where a collision is a bug;
///         the "try" variant is used for opportunistic claims
/// BREAKS: Error taxonomy - conflict stops being distinguishable from success
#[test]
fn conflict_semantics_differ_between_strict_and_try_variants() {
    let allocator = quiet_allocator();

    allocator.mark_used(58080).unwrap();

    let err = allocator.mark_used(58080).unwrap_err();
    assert!(matches!(err, PortClaimError::PortConflict(58080)));

    // Same scenario through the try variant: a normal boolean, never an error
    assert!(!allocator.try_mark_used(58080).unwrap());
}

/// WHY: The free-port count moves by exactly 1 per allocation/release
/// REASON: Counts are the only cheap observability surface for exhaustion
/// BREAKS: Capacity accounting; exhaustion pre-checks become unreliable
#[test]
fn free_count_moves_by_exactly_one() {
    let allocator = quiet_allocator();

    let before = allocator.get_free_port_count_in_range(59000, 59099).unwrap();
    assert_eq!(before, 100);

    let port = allocator.get_random_free_port_in_range(59000, 59099).unwrap();
    assert_eq!(
        allocator.get_free_port_count_in_range(59000, 59099).unwrap(),
        before - 1
    );

    allocator.mark_free(port as u32).unwrap();
    assert_eq!(
        allocator.get_free_port_count_in_range(59000, 59099).unwrap(),
        before
    );
}

/// WHY: get_free_ports is the range minus unavailable ports, ascending
/// REASON: Callers iterate the list to build fixtures; order is part of the API
/// BREAKS: Deterministic fixture construction
#[test]
fn free_ports_listing_is_ascending_set_difference() {
    let allocator = quiet_allocator();

    assert_eq!(
        allocator.get_free_ports(63000, 63002).unwrap(),
        vec![63000, 63001, 63002]
    );

    allocator.mark_used(63001).unwrap();

    assert_eq!(
        allocator.get_free_ports(63000, 63002).unwrap(),
        vec![63000, 63002]
    );
}

/// WHY: A fixed seed reproduces the allocation sequence
/// REASON: Test harnesses replay failures; the port sequence must be stable
///         for a fixed seed and fixed call sequence
/// BREAKS: Reproducible test runs
#[test]
fn fixed_seed_reproduces_allocation_sequence() {
    let seeded = PortClaimConfig {
        seed: Some(20240817),
        ..quiet_config()
    };

    let a = PortAllocator::with_state(SharedPortState::new(), seeded.clone());
    let b = PortAllocator::with_state(SharedPortState::new(), seeded);

    let sequence_a: Vec<u16> = (0..32).map(|_| a.get_random_free_port().unwrap()).collect();
    let sequence_b: Vec<u16> = (0..32).map(|_| b.get_random_free_port().unwrap()).collect();

    assert_eq!(sequence_a, sequence_b);

    // If this test fails:
    // - The random source is shared, reseeded mid-run, or ignores the seed
    // - Failure replay by seed is broken
}

/// WHY: Exhaustion is an error for the strict variant, a value for the try one
/// REASON: Rejection sampling needs the pre-check to terminate; the try
///         variant enumerates so "none left" is a normal outcome
/// BREAKS: Termination guarantee of the retry loop
#[test]
fn exhausted_range_error_vs_try_none() {
    let allocator = quiet_allocator();

    for port in 61000..=61004u32 {
        allocator.mark_used(port).unwrap();
    }

    let err = allocator
        .get_random_free_port_in_range(61000, 61004)
        .unwrap_err();
    assert!(matches!(
        err,
        PortClaimError::RangeExhausted {
            min: 61000,
            max: 61004
        }
    ));

    assert_eq!(
        allocator.try_get_random_free_port(61000, 61004).unwrap(),
        None
    );
}

/// WHY: Well-known ports start pre-marked on a fresh allocator
/// REASON: Browser/OS policy ports (SIP, IRC) must never be handed to a
///         harness, regardless of caller behavior
/// BREAKS: The static exclusion guarantee
#[test]
fn well_known_ports_start_unavailable() {
    let config = PortClaimConfig {
        exclude_well_known: true,
        ..quiet_config()
    };
    let allocator = PortAllocator::with_state(SharedPortState::new(), config);

    for port in [5060u32, 6667, 6697] {
        let err = allocator.mark_used(port).unwrap_err();
        assert!(
            matches!(err, PortClaimError::PortConflict(_)),
            "well-known port {} must start reserved",
            port
        );
    }
}

/// WHY: 0 and 65536 are invalid arguments, rejected before any state change
/// REASON: Port 0 is reserved and 65536 is outside the 16-bit space; both are
///         caller errors, not conflicts
/// BREAKS: Argument validation boundary
#[test]
fn boundary_ports_rejected_as_invalid_argument() {
    let allocator = quiet_allocator();

    assert!(matches!(
        allocator.mark_used(0),
        Err(PortClaimError::InvalidPort(_))
    ));
    assert!(matches!(
        allocator.mark_used(65536),
        Err(PortClaimError::InvalidPort(_))
    ));
}

/// WHY: Handles over the same state observe each other immediately
/// REASON: Allocation state is process-global by design; a port freed by one
///         handle is immediately allocatable by another
/// BREAKS: The single-process consistency guarantee
#[test]
fn handles_over_same_state_are_linearizable() {
    let state = SharedPortState::new();
    let a = PortAllocator::with_state(state.clone(), quiet_config());
    let b = PortAllocator::with_state(state, quiet_config());

    a.mark_used(57000).unwrap();
    assert!(!b.try_mark_used(57000).unwrap());

    assert!(b.mark_free(57000).unwrap());
    assert!(a.try_mark_used(57000).unwrap());
}
