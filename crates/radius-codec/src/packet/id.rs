use std::sync::atomic::{AtomicU8, Ordering};

/// Hands out packet identifiers 0..=255 in a repeating sequence
///
/// Safe to share between threads; the counter wraps after 255.
#[derive(Debug, Default)]
pub struct PacketIdAllocator {
    next: AtomicU8,
}

impl PacketIdAllocator {
    pub const fn new() -> Self {
        Self::starting_at(0)
    }

    pub const fn starting_at(id: u8) -> Self {
        PacketIdAllocator {
            next: AtomicU8::new(id),
        }
    }

    pub fn next_id(&self) -> u8 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

static PACKET_IDS: PacketIdAllocator = PacketIdAllocator::new();

/// Next identifier from the process-wide allocator
pub fn next_packet_id() -> u8 {
    PACKET_IDS.next_id()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_sequence_wraps_after_256() {
        let ids = PacketIdAllocator::starting_at(250);
        let first: Vec<u8> = (0..8).map(|_| ids.next_id()).collect();
        assert_eq!(first, vec![250, 251, 252, 253, 254, 255, 0, 1]);
    }

    #[test]
    fn test_period_is_256() {
        let ids = PacketIdAllocator::new();
        let seen: HashSet<u8> = (0..256).map(|_| ids.next_id()).collect();
        assert_eq!(seen.len(), 256);
        assert_eq!(ids.next_id(), 0);
    }

    #[test]
    fn test_concurrent_allocation_covers_every_id() {
        let ids = Arc::new(PacketIdAllocator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ids = Arc::clone(&ids);
                std::thread::spawn(move || (0..64).map(|_| ids.next_id()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            seen.extend(handle.join().unwrap());
        }
        assert_eq!(seen.len(), 256);
    }
}
