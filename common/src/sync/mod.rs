pub mod irq;
pub mod irq_spinlock;
pub mod rwlock;
pub mod spinlock;

pub use irq::{IrqControl, NoIrq};
pub use irq_spinlock::IrqSpinLock;
pub use rwlock::RwLock;
pub use spinlock::{RawSpinLock, SpinLock};
