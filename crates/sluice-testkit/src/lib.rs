//! sluice-testkit: conformance test suite for transfer adapters.
//!
//! Provides the [`AdapterFactory`] trait and shared scenarios every
//! adapter must pass.
//!
//! # Usage
//!
//! Each adapter crate implements `AdapterFactory` and runs the shared
//! scenarios from its own tests:
//!
//! ```ignore
//! use sluice_testkit::{AdapterFactory, Fixture};
//!
//! struct MyAdapterFactory;
//!
//! impl AdapterFactory for MyAdapterFactory {
//!     type Adapter = MyAdapter;
//!
//!     fn fixture(bytes: usize) -> impl Future<Output = Fixture<Self::Adapter>> + Send {
//!         async move { /* build adapter + linked window pair */ }
//!     }
//!
//!     fn observe(fixture: &Fixture<Self::Adapter>, offset: usize, len: usize) -> Vec<u8> {
//!         /* read destination bytes back */
//!     }
//! }
//!
//! #[tokio::test]
//! async fn my_adapter_copies_min_prefix() {
//!     sluice_testkit::run_transfer_copies_min_prefix::<MyAdapterFactory>().await;
//! }
//! ```

#![forbid(unsafe_op_in_unsafe_fn)]

use std::future::Future;

use sluice_pipeline::{Adapter, BackwardLink, ForwardLink, LocalWindow, MetaCell, RemoteWindow};

/// A source/destination pair wired through one adapter.
pub struct Fixture<A: Adapter> {
    pub adapter: A,
    /// Local window of `bytes` length, caller-writable through `data()`.
    pub src: A::Local,
    /// Remote window of `bytes` length designating the observable
    /// destination.
    pub dst: A::Remote,
}

/// A metadata cell arrangement wired through one adapter: a cell staged
/// in `staging` and shipped to `out` must become observable through
/// `landed`. For a shared-memory transport all three alias the same
/// cell; for a copying transport `landed` reads the destination back.
pub struct MetaWindows<A: Adapter> {
    /// Staging cell the shipping side writes.
    pub staging: A::Local,
    /// Remote cell the ship targets.
    pub out: A::Remote,
    /// Local view of the cell where the ship lands.
    pub landed: A::Local,
}

/// Factory the adapter under test provides.
pub trait AdapterFactory {
    type Adapter: Adapter;

    /// Build an adapter with a linked pair of `bytes`-sized windows.
    fn fixture(bytes: usize) -> impl Future<Output = Fixture<Self::Adapter>> + Send;

    /// Read bytes back from the destination the fixture's remote window
    /// designates.
    fn observe(fixture: &Fixture<Self::Adapter>, offset: usize, len: usize) -> Vec<u8>;

    /// Build a metadata cell arrangement for this transport (all windows
    /// at least 8 bytes, naturally aligned).
    fn meta_windows(fixture: &Fixture<Self::Adapter>) -> MetaWindows<Self::Adapter>;
}

fn fill_local<L: LocalWindow>(window: &L, pattern: impl Iterator<Item = u8>) {
    let bytes: Vec<u8> = pattern.take(window.size_bytes()).collect();
    // SAFETY: the window's `data()` descriptor covers `size_bytes()`
    // writable bytes by the LocalWindow contract.
    unsafe { std::ptr::copy_nonoverlapping(bytes.as_ptr(), window.data(), bytes.len()) };
}

fn read_local<L: LocalWindow>(window: &L) -> Vec<u8> {
    let mut out = vec![0u8; window.size_bytes()];
    // SAFETY: the window's `data()` descriptor covers `size_bytes()`
    // readable bytes by the LocalWindow contract.
    unsafe { std::ptr::copy_nonoverlapping(window.data(), out.as_mut_ptr(), out.len()) };
    out
}

/// Transferring equal-sized windows moves every byte, exactly.
pub async fn run_transfer_copies_min_prefix<F: AdapterFactory>() {
    let fixture = F::fixture(64).await;
    fill_local(&fixture.src, (0..).map(|i| (i * 7 + 3) as u8));

    fixture
        .adapter
        .transfer(fixture.src.clone(), fixture.dst.clone())
        .await
        .expect("transfer should succeed");

    let expected: Vec<u8> = (0..64).map(|i| (i * 7 + 3) as u8).collect();
    assert_eq!(F::observe(&fixture, 0, 64), expected);

    // A shorter destination bounds the transfer.
    let fixture = F::fixture(64).await;
    fill_local(&fixture.src, std::iter::repeat(0xAB));
    fixture
        .adapter
        .transfer(fixture.src.clone(), fixture.dst.slice(0, 16))
        .await
        .expect("bounded transfer should succeed");
    assert_eq!(F::observe(&fixture, 0, 16), vec![0xAB; 16]);
}

/// Sliced windows transfer into the right sub-ranges.
pub async fn run_transfer_respects_slicing<F: AdapterFactory>() {
    let fixture = F::fixture(32).await;
    fill_local(&fixture.src, 1..);

    // Move bytes 8..16 of the source into bytes 24..32 of the destination.
    fixture
        .adapter
        .transfer(fixture.src.slice(8, 8), fixture.dst.slice(24, 8))
        .await
        .expect("sliced transfer should succeed");

    let expected: Vec<u8> = (9..17).collect();
    assert_eq!(F::observe(&fixture, 24, 8), expected);
}

/// Metadata cells round-trip through the planes: a tail stored through a
/// [`ForwardLink`] is readable by the peer's [`BackwardLink`], a head
/// travels the opposite plane the same way, and the reserved word lands
/// zeroed.
///
/// Each link owns its adapter, as a stage's links do, so the factory's
/// adapter must be `Clone`.
pub async fn run_metadata_cell_roundtrip<F>()
where
    F: AdapterFactory,
    F::Adapter: Clone,
{
    // The cell layout itself round-trips before any shipping.
    let cell = MetaCell::new();
    assert_eq!(cell.load(), 0);
    cell.store(0x1234_5678);
    assert_eq!(cell.load(), 0x1234_5678);

    let fixture = F::fixture(32).await;
    let windows = F::meta_windows(&fixture);

    let forward = ForwardLink::new(
        fixture.adapter.clone(),
        windows.staging.clone(),
        windows.landed.clone(),
        windows.out.clone(),
    );
    let backward = BackwardLink::new(
        fixture.adapter.clone(),
        windows.staging.clone(),
        windows.landed.clone(),
        windows.out.clone(),
    );

    // Forward plane: a shipped tail is readable at the peer's cell.
    forward
        .store_tail(0x00C0_FFEE)
        .await
        .expect("tail ship should succeed");
    assert_eq!(backward.fetch_tail(), 0x00C0_FFEE);

    // Backward plane: a shipped head travels the same way.
    backward
        .store_head(0x0BAD_CAFE)
        .await
        .expect("head ship should succeed");
    assert_eq!(forward.fetch_head(), 0x0BAD_CAFE);

    // First 4 bytes hold the counter host-natively; the reserved word
    // lands zeroed.
    let landed = read_local(&windows.landed);
    assert_eq!(&landed[..4], &0x0BAD_CAFEu32.to_ne_bytes());
    assert_eq!(&landed[4..8], &[0, 0, 0, 0]);
}

/// Back-to-back transfers land in issue order on the same range.
pub async fn run_transfer_overwrites_in_order<F: AdapterFactory>() {
    let fixture = F::fixture(16).await;

    fill_local(&fixture.src, std::iter::repeat(0x11));
    fixture
        .adapter
        .transfer(fixture.src.clone(), fixture.dst.clone())
        .await
        .expect("first transfer should succeed");

    fill_local(&fixture.src, std::iter::repeat(0x22));
    fixture
        .adapter
        .transfer(fixture.src.clone(), fixture.dst.clone())
        .await
        .expect("second transfer should succeed");

    assert_eq!(F::observe(&fixture, 0, 16), vec![0x22; 16]);
}
