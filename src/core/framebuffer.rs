use nalgebra::Vector3;
use rayon::prelude::*;
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};

const LOCK_STRIPES: usize = 1024;

/// Colour + depth target shared by the colour pass and the depth-only shadow pass.
///
/// Rows of a triangle are shaded in parallel, so depth lives in atomics (f32 bits)
/// and each colour sample is its own cell, written under a striped lock.
pub struct FrameBuffer {
    pub width: usize,
    pub height: usize,
    /// Supersampling factor per axis (1 = no SSAA).
    pub sample_count: usize,
    pub buffer_width: usize,
    pub buffer_height: usize,
    /// False for depth-only targets, which never store colour.
    pub has_color: bool,

    color_buffer: Vec<UnsafeCell<Vector3<f32>>>,
    depth_buffer: Vec<AtomicU32>,
    locks: Vec<Mutex<()>>,
}

// Writes to one colour cell are serialized by its stripe lock, depth by atomics.
unsafe impl Sync for FrameBuffer {}

impl FrameBuffer {
    pub fn new(width: usize, height: usize, sample_count: usize) -> Self {
        Self::allocate(width, height, sample_count, true)
    }

    /// A target with a depth plane only; colour writes are ignored.
    pub fn depth_only(width: usize, height: usize) -> Self {
        Self::allocate(width, height, 1, false)
    }

    fn allocate(width: usize, height: usize, sample_count: usize, has_color: bool) -> Self {
        let sample_count = sample_count.max(1);
        let buffer_width = width * sample_count;
        let buffer_height = height * sample_count;
        let size = buffer_width * buffer_height;
        let color_len = if has_color { size } else { 0 };

        let far_bits = f32::INFINITY.to_bits();
        Self {
            width,
            height,
            sample_count,
            buffer_width,
            buffer_height,
            has_color,
            color_buffer: (0..color_len)
                .map(|_| UnsafeCell::new(Vector3::zeros()))
                .collect(),
            depth_buffer: (0..size).map(|_| AtomicU32::new(far_bits)).collect(),
            locks: (0..LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
        }
    }

    /// Resets both targets. Needs `&mut self`, so no draw can be in flight.
    pub fn clear(&mut self, color: Vector3<f32>, depth: f32) {
        self.color_buffer
            .par_iter_mut()
            .for_each(|c| *c.get_mut() = color);
        self.clear_depth(depth);
    }

    pub fn clear_depth(&mut self, depth: f32) {
        let bits = depth.to_bits();
        self.depth_buffer
            .par_iter()
            .for_each(|d| d.store(bits, Ordering::Relaxed));
    }

    #[inline(always)]
    pub fn in_bounds(&self, x: usize, y: usize) -> bool {
        x < self.buffer_width && y < self.buffer_height
    }

    #[inline(always)]
    fn index(&self, x: usize, y: usize) -> usize {
        y * self.buffer_width + x
    }

    /// Atomically keeps the nearer of the stored and incoming depth.
    /// Returns true when the incoming fragment won.
    #[inline]
    pub fn depth_test_and_update(&self, x: usize, y: usize, new_depth: f32) -> bool {
        if !self.in_bounds(x, y) {
            return false;
        }
        let slot = &self.depth_buffer[self.index(x, y)];
        let new_bits = new_depth.to_bits();

        let mut current_bits = slot.load(Ordering::Relaxed);
        loop {
            if new_depth >= f32::from_bits(current_bits) {
                return false;
            }
            match slot.compare_exchange_weak(
                current_bits,
                new_bits,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(actual) => current_bits = actual,
            }
        }
    }

    /// Writes a shaded sample. Call only after `depth_test_and_update` succeeded.
    #[inline]
    pub fn set_pixel_safe(&self, x: usize, y: usize, color: Vector3<f32>) {
        if !self.has_color || !self.in_bounds(x, y) {
            return;
        }
        let idx = self.index(x, y);
        let _guard = self.locks[idx % self.locks.len()]
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // SAFETY: the stripe lock for `idx` is held, and only this cell is touched.
        unsafe {
            *self.color_buffer[idx].get() = color;
        }
    }

    #[inline]
    fn sample_color(&self, idx: usize) -> Vector3<f32> {
        let _guard = self.locks[idx % self.locks.len()]
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // SAFETY: the stripe lock for `idx` is held; the copy leaves no reference behind.
        unsafe { *self.color_buffer[idx].get() }
    }

    /// Raw depth of one buffer sample.
    pub fn depth_at(&self, x: usize, y: usize) -> Option<f32> {
        self.in_bounds(x, y)
            .then(|| f32::from_bits(self.depth_buffer[self.index(x, y)].load(Ordering::Relaxed)))
    }

    /// Copies the depth plane out, row-major, `buffer_width * buffer_height` values.
    pub fn depth_snapshot(&self) -> Vec<f32> {
        self.depth_buffer
            .par_iter()
            .map(|d| f32::from_bits(d.load(Ordering::Relaxed)))
            .collect()
    }

    /// Resolved (box-filtered) colour of an output pixel.
    /// Meant for use after rendering has finished.
    pub fn get_pixel(&self, x: usize, y: usize) -> Option<Vector3<f32>> {
        if !self.has_color || x >= self.width || y >= self.height {
            return None;
        }
        let n = self.sample_count;
        let mut sum = Vector3::zeros();
        for dy in 0..n {
            for dx in 0..n {
                sum += self.sample_color(self.index(x * n + dx, y * n + dy));
            }
        }
        Some(sum / (n * n) as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearer_fragment_wins() {
        let mut fb = FrameBuffer::new(4, 4, 1);
        fb.clear_depth(1.0);
        assert!(fb.depth_test_and_update(1, 1, 0.5));
        assert!(!fb.depth_test_and_update(1, 1, 0.7));
        assert!(fb.depth_test_and_update(1, 1, 0.2));
        assert_eq!(fb.depth_at(1, 1), Some(0.2));
        assert!(!fb.depth_test_and_update(9, 9, 0.0));
    }

    #[test]
    fn supersampled_pixels_are_averaged() {
        let mut fb = FrameBuffer::new(1, 1, 2);
        fb.clear(Vector3::zeros(), f32::INFINITY);
        fb.set_pixel_safe(0, 0, Vector3::new(4.0, 0.0, 0.0));
        let resolved = fb.get_pixel(0, 0).unwrap();
        assert_eq!(resolved.x, 1.0);
        assert_eq!(fb.depth_snapshot().len(), 4);
    }

    #[test]
    fn parallel_row_writes_land_in_their_own_samples() {
        let mut fb = FrameBuffer::new(64, 64, 1);
        fb.clear(Vector3::zeros(), f32::INFINITY);
        (0..64usize).into_par_iter().for_each(|y| {
            for x in 0..64 {
                fb.set_pixel_safe(x, y, Vector3::new(x as f32, y as f32, 1.0));
            }
        });
        for (x, y) in [(0, 0), (63, 0), (17, 42), (63, 63)] {
            assert_eq!(fb.get_pixel(x, y), Some(Vector3::new(x as f32, y as f32, 1.0)));
        }
    }

    #[test]
    fn depth_only_target_ignores_colour() {
        let fb = FrameBuffer::depth_only(2, 2);
        assert!(fb.depth_test_and_update(0, 0, 0.25));
        fb.set_pixel_safe(0, 0, Vector3::new(1.0, 1.0, 1.0));
        assert!(fb.get_pixel(0, 0).is_none());
        assert_eq!(fb.depth_at(0, 0), Some(0.25));
    }
}
