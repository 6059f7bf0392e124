use super::{Event, MemoryModel};
use crate::config::MemoryModelKind;

/// Total store order. Each thread has a FIFO store buffer: a later read may
/// execute before a buffered write becomes visible. A read of the buffered
/// address is served from the buffer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tso;

impl MemoryModel for Tso {
    fn kind(&self) -> MemoryModelKind {
        MemoryModelKind::Tso
    }

    fn relaxes(&self, earlier: &Event, later: &Event) -> bool {
        earlier.is_write && !later.is_write
    }

    fn orders_own_reads_from(&self) -> bool {
        false
    }
}
