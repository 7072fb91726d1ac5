//! Transport buffer budget.
//!
//! The framer and the DMA allocation tier must agree on how large one wire
//! buffer is and how much of it is left for payload once the frame header is
//! reserved. Both numbers are compile-time constants; the payload size is
//! always derived so the two can never drift apart.

use crate::status::{OsError, OsResult};

/// Bytes reserved at the start of every transport buffer for the payload
/// header.
pub const PAYLOAD_HEADER_SIZE: usize = 12;

/// Size relationship between a wire buffer and the payload it can carry.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BufferBudget {
    total: usize,
    header: usize,
}

impl BufferBudget {
    /// Create a budget.
    ///
    /// # Panics
    ///
    /// Panics (at compile time when used in a `const`) if the header leaves
    /// no room for payload.
    pub const fn new(total: usize, header: usize) -> Self {
        assert!(header < total, "header reservation must leave room for payload");
        Self { total, header }
    }

    /// Total wire buffer size in bytes.
    pub const fn total(&self) -> usize {
        self.total
    }

    /// Bytes reserved for the payload header.
    pub const fn header(&self) -> usize {
        self.header
    }

    /// Largest payload one buffer can carry.
    pub const fn payload(&self) -> usize {
        self.total - self.header
    }

    /// Reject payloads that do not fit behind the header.
    pub fn check_payload(&self, len: usize) -> OsResult<()> {
        if len > self.payload() {
            log::warn!("payload of {} bytes exceeds budget of {}", len, self.payload());
            return Err(OsError::Invalid);
        }
        Ok(())
    }

    /// Reject whole frames larger than the wire buffer.
    pub fn check_frame(&self, len: usize) -> OsResult<()> {
        if len > self.total {
            return Err(OsError::Invalid);
        }
        Ok(())
    }
}

/// SPI transport: largest frame the co-processor's SPI slave accepts.
pub const SPI_BUDGET: BufferBudget = BufferBudget::new(1600, PAYLOAD_HEADER_SIZE);

/// SDIO transport: one SDIO block-aligned receive buffer.
pub const SDIO_BUDGET: BufferBudget = BufferBudget::new(1536, PAYLOAD_HEADER_SIZE);

/// Every transport budget this crate knows about.
pub const ALL_BUDGETS: [(&str, BufferBudget); 2] = [("spi", SPI_BUDGET), ("sdio", SDIO_BUDGET)];

// Transport selection based on Cargo features
cfg_if::cfg_if! {
    if #[cfg(feature = "transport-spi")] {
        /// Budget of the transport this build is configured for.
        pub const TRANSPORT: BufferBudget = SPI_BUDGET;
    } else if #[cfg(feature = "transport-sdio")] {
        /// Budget of the transport this build is configured for.
        pub const TRANSPORT: BufferBudget = SDIO_BUDGET;
    } else {
        compile_error!(
            "No transport selected!\n\
            Use: cargo build --features transport-spi\n\
            Or:  cargo build --features transport-sdio"
        );
    }
}

#[cfg(all(feature = "transport-spi", feature = "transport-sdio"))]
compile_error!("Multiple transports selected! Choose only one: transport-spi OR transport-sdio");

/// Maximum size of one transport buffer.
pub const MAX_TRANSPORT_BUFFER_SIZE: usize = TRANSPORT.total();

/// Maximum payload one transport buffer can carry.
pub const MAX_PAYLOAD_SIZE: usize = TRANSPORT.payload();

const _: () = assert!(MAX_PAYLOAD_SIZE + PAYLOAD_HEADER_SIZE == MAX_TRANSPORT_BUFFER_SIZE);
