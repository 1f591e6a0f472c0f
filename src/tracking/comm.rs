//! Collective transport for the ownership protocol.
//!
//! Execution is single-program-multiple-data: every rank runs the same
//! marker logic and meets the others at broadcast points. `Communicator`
//! is the narrow interface the protocol needs; `SerialComm` degenerates
//! to no-ops for single-process runs, and `ThreadComm` is an in-process
//! SPMD transport (one rank per thread) used to exercise the protocol in
//! tests. Collectives are blocking: every rank must reach them in the
//! same order, and a rank that never arrives stalls the others.

use std::sync::{Arc, Barrier, Mutex};

pub trait Communicator: Sync {
    fn rank(&self) -> usize;
    fn size(&self) -> usize;

    /// Replicate `buf` from `root` to every rank. On return all ranks
    /// hold root's data.
    fn broadcast_f64s(&self, root: usize, buf: &mut [f64]);

    /// Broadcast a single integer, carried bitwise through the f64
    /// transport.
    fn broadcast_u64(&self, root: usize, value: &mut u64) {
        let mut carrier = [f64::from_bits(*value)];
        self.broadcast_f64s(root, &mut carrier);
        *value = carrier[0].to_bits();
    }
}

/// Single-process communicator: rank 0 of 1, broadcasts are no-ops.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialComm;

impl Communicator for SerialComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn broadcast_f64s(&self, _root: usize, _buf: &mut [f64]) {}
}

struct ThreadCommShared {
    size: usize,
    slot: Mutex<Vec<f64>>,
    barrier: Barrier,
}

/// One rank of an in-process SPMD group. Create the group with
/// [`ThreadComm::group`] and move each handle into its own thread.
pub struct ThreadComm {
    rank: usize,
    shared: Arc<ThreadCommShared>,
}

impl ThreadComm {
    /// Allocate a group of `size` rank handles sharing one barrier.
    pub fn group(size: usize) -> Vec<ThreadComm> {
        assert!(size > 0);
        let shared = Arc::new(ThreadCommShared {
            size,
            slot: Mutex::new(Vec::new()),
            barrier: Barrier::new(size),
        });
        (0..size)
            .map(|rank| ThreadComm {
                rank,
                shared: Arc::clone(&shared),
            })
            .collect()
    }
}

impl Communicator for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.shared.size
    }

    fn broadcast_f64s(&self, root: usize, buf: &mut [f64]) {
        debug_assert!(root < self.shared.size);
        // Three phases: publish, read, release. The trailing barrier
        // keeps a fast rank from starting the next broadcast while a
        // slow one is still reading the slot.
        self.shared.barrier.wait();
        if self.rank == root {
            let mut slot = self.shared.slot.lock().expect("comm slot poisoned");
            slot.clear();
            slot.extend_from_slice(buf);
        }
        self.shared.barrier.wait();
        if self.rank != root {
            let slot = self.shared.slot.lock().expect("comm slot poisoned");
            buf.copy_from_slice(&slot);
        }
        self.shared.barrier.wait();
    }
}
