//! Lock-free circular sample store between the audio callback and the
//! analysis thread.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

/// Fixed-capacity ring of mono samples, written by the real-time audio path
/// and snapshotted by the analysis thread.
///
/// Single writer, any number of readers. The write path stores each sample as
/// a relaxed atomic bit pattern and publishes the cursor with release
/// ordering, so it never blocks, locks, or allocates.
///
/// Consistency guarantee is deliberately relaxed: a snapshot taken while a
/// write is in flight may mix samples from before and after that write. Each
/// individual sample is stored atomically, so the mix is always of whole
/// samples, never torn bytes. Pitch analysis tolerates a handful of
/// mixed-age samples at the window boundary, which is why this is acceptable
/// here; it would not be for sample-exact capture.
#[derive(Debug)]
pub struct CaptureBuffer {
    samples: Box<[AtomicU32]>,
    write_pos: AtomicUsize,
}

impl CaptureBuffer {
    /// Creates a zero-filled buffer. `capacity` must be non-zero; it is fixed
    /// for the lifetime of the buffer.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capture buffer capacity must be non-zero");
        let samples = (0..capacity)
            .map(|_| AtomicU32::new(0.0f32.to_bits()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            samples,
            write_pos: AtomicUsize::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    /// Appends a block of samples, wrapping the cursor.
    ///
    /// Must only be called from one thread at a time (the audio callback).
    pub fn write(&self, block: &[f32]) {
        self.write_from_iter(block.iter().copied());
    }

    /// Iterator form of [`write`](Self::write), used when samples are derived
    /// on the fly (e.g. channel averaging) without a staging buffer.
    pub fn write_from_iter(&self, samples: impl Iterator<Item = f32>) {
        let capacity = self.samples.len();
        // Single writer, so a relaxed read of our own cursor is enough.
        let mut pos = self.write_pos.load(Ordering::Relaxed);
        for sample in samples {
            self.samples[pos].store(sample.to_bits(), Ordering::Relaxed);
            pos = (pos + 1) % capacity;
        }
        self.write_pos.store(pos, Ordering::Release);
    }

    /// Copies the most recent `dest.len()` samples, oldest first, ending at a
    /// recently observed cursor position.
    ///
    /// `dest.len()` must not exceed the capacity; callers fix their window
    /// length against the capacity once at startup.
    pub fn snapshot_into(&self, dest: &mut [f32]) {
        let capacity = self.samples.len();
        debug_assert!(dest.len() <= capacity);
        let end = self.write_pos.load(Ordering::Acquire);
        let start = (end + capacity - dest.len()) % capacity;
        for (i, slot) in dest.iter_mut().enumerate() {
            let idx = (start + i) % capacity;
            *slot = f32::from_bits(self.samples[idx].load(Ordering::Relaxed));
        }
    }
}
