//! Property-based invariant tests for the null backend object lifecycle.
//!
//! Validates:
//! 1. Live object count always equals the model's.
//! 2. Creation beyond the handle capacity fails with OutOfMemory.
//! 3. Destroyed handles never resolve again, even after slot reuse.
//! 4. Handles of one object type are rejected by calls for another.
//! 5. Destroy is BUSY exactly while objects remain, and succeeds once empty.

use m3_backend::{Backend, WindowConfig};
use m3_backend_null::NullBackend;
use m3_core::{Error, Handle};
use proptest::prelude::*;

// ============================================================================
// Operations
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Window,
    Texture,
    Font,
}

#[derive(Debug, Clone)]
enum Op {
    Create(Kind),
    Destroy(usize),
    DestroyStale(usize),
    CrossType(usize),
    TryTeardown,
}

fn kind_strategy() -> impl Strategy<Value = Kind> {
    prop_oneof![Just(Kind::Window), Just(Kind::Texture), Just(Kind::Font)]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => kind_strategy().prop_map(Op::Create),
        3 => any::<usize>().prop_map(Op::Destroy),
        1 => any::<usize>().prop_map(Op::DestroyStale),
        1 => any::<usize>().prop_map(Op::CrossType),
        1 => Just(Op::TryTeardown),
    ]
}

// ============================================================================
// Helpers
// ============================================================================

fn create(backend: &mut NullBackend, kind: Kind) -> Result<Handle, Error> {
    match kind {
        Kind::Window => backend
            .ws()?
            .create_window(&WindowConfig::new(16, 16, "prop")),
        Kind::Texture => backend.gfx()?.create_texture(4, 4, 3, &[0; 16]),
        Kind::Font => backend.gfx()?.text().create_font("Sans", 14, 400, false),
    }
}

fn destroy(backend: &mut NullBackend, kind: Kind, handle: Handle) -> Result<(), Error> {
    match kind {
        Kind::Window => backend.ws()?.destroy_window(handle),
        Kind::Texture => backend.gfx()?.destroy_texture(handle),
        Kind::Font => backend.gfx()?.text().destroy_font(handle),
    }
}

fn other(kind: Kind) -> Kind {
    match kind {
        Kind::Window => Kind::Texture,
        Kind::Texture => Kind::Font,
        Kind::Font => Kind::Window,
    }
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn lifecycle_matches_model(
        capacity in 1usize..8,
        ops in prop::collection::vec(op_strategy(), 1..64),
    ) {
        let mut backend = NullBackend::create(
            NullBackend::config_init()
                .with_logging(false)
                .with_handle_capacity(capacity),
        )
        .unwrap();
        let mut live: Vec<(Kind, Handle)> = Vec::new();
        let mut dead: Vec<(Kind, Handle)> = Vec::new();

        for op in ops {
            match op {
                Op::Create(kind) => {
                    let result = create(&mut backend, kind);
                    if live.len() < capacity {
                        let handle = result.unwrap();
                        prop_assert!(handle.is_valid());
                        prop_assert!(live.iter().all(|(_, h)| *h != handle));
                        live.push((kind, handle));
                    } else {
                        prop_assert_eq!(result, Err(Error::OutOfMemory));
                    }
                }
                Op::Destroy(pick) => {
                    if !live.is_empty() {
                        let (kind, handle) = live.swap_remove(pick % live.len());
                        prop_assert_eq!(destroy(&mut backend, kind, handle), Ok(()));
                        dead.push((kind, handle));
                    }
                }
                Op::DestroyStale(pick) => {
                    if !dead.is_empty() {
                        let (kind, handle) = dead[pick % dead.len()];
                        prop_assert_eq!(
                            destroy(&mut backend, kind, handle),
                            Err(Error::InvalidArgument)
                        );
                    }
                }
                Op::CrossType(pick) => {
                    if !live.is_empty() {
                        let (kind, handle) = live[pick % live.len()];
                        prop_assert_eq!(
                            destroy(&mut backend, other(kind), handle),
                            Err(Error::InvalidArgument)
                        );
                    }
                }
                Op::TryTeardown => {
                    if !live.is_empty() {
                        prop_assert_eq!(backend.destroy(), Err(Error::Busy));
                    }
                }
            }
            prop_assert_eq!(backend.live_objects(), Ok(live.len()));
        }

        for (kind, handle) in live.drain(..) {
            prop_assert_eq!(destroy(&mut backend, kind, handle), Ok(()));
        }
        prop_assert_eq!(backend.destroy(), Ok(()));
        prop_assert_eq!(backend.live_objects(), Err(Error::State));
    }
}
