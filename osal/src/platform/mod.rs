//! Backends
//!
//! Each backend implements [`Backend`](crate::hal::Backend) for one family
//! of host environments. Exactly one is exported as `CurrentBackend`,
//! selected by Cargo feature.
//!
//! - `hosted`: std threads and condition variables; simulated GPIO
//! - `bare-metal`: interrupt-masking locks, a tick source, a pin driver and
//!   a cooperative run list
//!
//! The bare-metal backend needs only `alloc`, so it is always built and can
//! be exercised on a host with fake hardware.

pub mod bare_metal;
pub(crate) mod objects;

#[cfg(feature = "hosted")]
pub mod hosted;

// Backend selection based on Cargo features
cfg_if::cfg_if! {
    if #[cfg(feature = "hosted")] {
        pub use hosted::HostedBackend as CurrentBackend;
    } else if #[cfg(feature = "bare-metal")] {
        pub use bare_metal::BareMetalBackend as CurrentBackend;
    } else {
        compile_error!(
            "No backend selected!\n\
            Use: cargo build --features hosted\n\
            Or:  cargo build --no-default-features --features bare-metal,transport-spi"
        );
    }
}

// Ensure only one backend is selected
#[cfg(all(feature = "hosted", feature = "bare-metal"))]
compile_error!("Multiple backends selected! Choose only one: hosted OR bare-metal");
