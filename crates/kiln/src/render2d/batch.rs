//! CPU-side quad batching.
//!
//! Quads are appended to a scratch vertex buffer allocated once for
//! `max_quads`. When the buffer is full the batch is flushed (one upload, one
//! indexed draw) and refilled; whatever is left is flushed at frame end. A
//! frame with `K` quads therefore costs `ceil(K / max_quads)` draw calls.
//!
//! The GPU side is behind [`RenderBackend`], so the whole flow can run
//! without a device.

use crate::error::Result;

use super::Quad;
use super::vertex::{QUAD_UVS, QuadVertex};

/// Indices emitted per quad.
pub const INDICES_PER_QUAD: u32 = 6;
/// Vertices emitted per quad.
pub const VERTICES_PER_QUAD: usize = 4;

/// What the renderer needs from the GPU.
pub trait RenderBackend: 'static {
    /// Acquire the frame and clear it to `clear_color` (linear RGBA).
    fn begin_frame(&mut self, clear_color: [f64; 4]) -> Result<()>;

    /// Upload `vertices` and draw `index_count` indices of the static quad
    /// index buffer.
    fn draw_batch(&mut self, vertices: &[QuadVertex], index_count: u32) -> Result<()>;

    /// Present the frame.
    fn end_frame(&mut self) -> Result<()>;
}

/// Fixed-capacity scratch buffer of quad vertices.
pub struct QuadBatch {
    vertices: Vec<QuadVertex>,
    index_count: u32,
    max_quads: usize,
}

impl QuadBatch {
    /// # Panics
    ///
    /// Panics if `max_quads` is zero.
    pub fn new(max_quads: usize) -> Self {
        assert!(max_quads > 0, "a quad batch needs room for at least one quad");
        Self {
            vertices: Vec::with_capacity(max_quads * VERTICES_PER_QUAD),
            index_count: 0,
            max_quads,
        }
    }

    pub fn max_quads(&self) -> usize {
        self.max_quads
    }

    pub fn vertices(&self) -> &[QuadVertex] {
        &self.vertices
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn quad_count(&self) -> usize {
        self.vertices.len() / VERTICES_PER_QUAD
    }

    pub fn is_empty(&self) -> bool {
        self.index_count == 0
    }

    pub fn is_full(&self) -> bool {
        self.index_count as usize >= self.max_quads * INDICES_PER_QUAD as usize
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.index_count = 0;
    }

    /// # Panics
    ///
    /// Panics if the batch is full; flush first.
    pub fn push(&mut self, quad: &Quad) {
        assert!(!self.is_full(), "quad batch overflow, flush before pushing");
        for (corner, uv) in quad.corners().into_iter().zip(QUAD_UVS) {
            self.vertices.push(QuadVertex::new(corner, uv));
        }
        self.index_count += INDICES_PER_QUAD;
    }
}

/// Per-frame counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub draw_calls: u32,
    pub quads: u32,
}

/// The 2D renderer resource: batch state plus the backend that owns the GPU
/// objects.
pub struct Renderer2d<B> {
    batch: QuadBatch,
    backend: B,
    clear_color: [f64; 4],
    stats: RenderStats,
}

impl<B: RenderBackend> Renderer2d<B> {
    pub fn new(backend: B, max_quads: usize) -> Self {
        Self {
            batch: QuadBatch::new(max_quads),
            backend,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            stats: RenderStats::default(),
        }
    }

    pub fn with_clear_color(mut self, clear_color: [f64; 4]) -> Self {
        self.clear_color = clear_color;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn batch(&self) -> &QuadBatch {
        &self.batch
    }

    /// Counters of the current (or last finished) frame.
    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    pub fn begin_frame(&mut self) -> Result<()> {
        self.stats = RenderStats::default();
        self.batch.clear();
        self.backend.begin_frame(self.clear_color)
    }

    /// Append one quad, flushing first if the batch is full.
    pub fn draw_quad(&mut self, quad: &Quad) -> Result<()> {
        if self.batch.is_full() {
            self.flush()?;
        }
        self.batch.push(quad);
        self.stats.quads += 1;
        Ok(())
    }

    /// Draw whatever is batched. Empty batches issue no draw call.
    pub fn flush(&mut self) -> Result<()> {
        if self.batch.is_empty() {
            return Ok(());
        }
        self.backend
            .draw_batch(self.batch.vertices(), self.batch.index_count())?;
        self.stats.draw_calls += 1;
        self.batch.clear();
        Ok(())
    }

    pub fn end_frame(&mut self) -> Result<()> {
        self.flush()?;
        self.backend.end_frame()?;
        log::trace!(
            "frame: {} quads in {} draw calls",
            self.stats.quads,
            self.stats.draw_calls
        );
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use glam::Vec2;

    use super::*;
    use crate::error::Error;

    #[derive(Clone, Debug, PartialEq)]
    pub(crate) enum Call {
        Begin([f64; 4]),
        Draw { vertices: usize, index_count: u32 },
        End,
    }

    /// Backend that records calls into a log shared with the test.
    #[derive(Clone, Default)]
    pub(crate) struct RecordingBackend {
        pub calls: Rc<RefCell<Vec<Call>>>,
        pub first_batch: Rc<RefCell<Vec<QuadVertex>>>,
        pub fail_draws: bool,
    }

    impl RecordingBackend {
        pub fn draws(&self) -> Vec<u32> {
            self.calls
                .borrow()
                .iter()
                .filter_map(|call| match call {
                    Call::Draw { index_count, .. } => Some(*index_count),
                    _ => None,
                })
                .collect()
        }
    }

    impl RenderBackend for RecordingBackend {
        fn begin_frame(&mut self, clear_color: [f64; 4]) -> Result<()> {
            self.calls.borrow_mut().push(Call::Begin(clear_color));
            Ok(())
        }

        fn draw_batch(&mut self, vertices: &[QuadVertex], index_count: u32) -> Result<()> {
            if self.fail_draws {
                return Err(Error::Gpu("device lost".to_string()));
            }
            let mut first = self.first_batch.borrow_mut();
            if first.is_empty() {
                first.extend_from_slice(vertices);
            }
            self.calls.borrow_mut().push(Call::Draw {
                vertices: vertices.len(),
                index_count,
            });
            Ok(())
        }

        fn end_frame(&mut self) -> Result<()> {
            self.calls.borrow_mut().push(Call::End);
            Ok(())
        }
    }

    fn quad(i: usize) -> Quad {
        Quad::new(Vec2::new(i as f32, 0.0), Vec2::splat(1.0))
    }

    fn draw_frame(renderer: &mut Renderer2d<RecordingBackend>, quads: usize) {
        renderer.begin_frame().unwrap();
        for i in 0..quads {
            renderer.draw_quad(&quad(i)).unwrap();
        }
        renderer.end_frame().unwrap();
    }

    #[test]
    fn batch_push_writes_four_corners() {
        let mut batch = QuadBatch::new(2);
        batch.push(&Quad::new(Vec2::new(20.0, 10.0), Vec2::splat(20.0)));
        assert_eq!(batch.index_count(), 6);
        assert_eq!(batch.quad_count(), 1);
        let positions: Vec<[f32; 2]> = batch.vertices().iter().map(|v| v.position).collect();
        assert_eq!(
            positions,
            vec![[20.0, 10.0], [20.0, 30.0], [40.0, 30.0], [40.0, 10.0]]
        );
        let uvs: Vec<[f32; 2]> = batch.vertices().iter().map(|v| v.uv).collect();
        assert_eq!(uvs, QUAD_UVS.to_vec());
    }

    #[test]
    fn batch_capacity_is_fixed() {
        let mut batch = QuadBatch::new(3);
        let capacity = batch.vertices.capacity();
        for i in 0..3 {
            batch.push(&quad(i));
        }
        assert!(batch.is_full());
        assert_eq!(batch.vertices.capacity(), capacity);
        batch.clear();
        assert!(batch.is_empty());
        assert_eq!(batch.vertices.capacity(), capacity);
    }

    #[test]
    #[should_panic(expected = "overflow")]
    fn pushing_into_full_batch_panics() {
        let mut batch = QuadBatch::new(1);
        batch.push(&quad(0));
        batch.push(&quad(1));
    }

    #[test]
    fn frame_under_capacity_is_one_draw() {
        let backend = RecordingBackend::default();
        let mut renderer = Renderer2d::new(backend.clone(), 4);
        draw_frame(&mut renderer, 3);

        assert_eq!(backend.draws(), vec![18]);
        assert_eq!(
            renderer.stats(),
            RenderStats {
                draw_calls: 1,
                quads: 3
            }
        );
    }

    #[test]
    fn frame_over_capacity_flushes_full_batch_first() {
        let backend = RecordingBackend::default();
        let mut renderer = Renderer2d::new(backend.clone(), 4);
        draw_frame(&mut renderer, 5);
        assert_eq!(backend.draws(), vec![24, 6]);

        let calls = backend.calls.borrow();
        assert_eq!(calls.first(), Some(&Call::Begin([0.0, 0.0, 0.0, 1.0])));
        assert_eq!(
            calls[1],
            Call::Draw {
                vertices: 16,
                index_count: 24
            }
        );
        assert_eq!(calls.last(), Some(&Call::End));
    }

    #[test]
    fn exactly_full_batch_is_flushed_once() {
        let backend = RecordingBackend::default();
        let mut renderer = Renderer2d::new(backend.clone(), 4);
        draw_frame(&mut renderer, 8);
        assert_eq!(backend.draws(), vec![24, 24]);
    }

    #[test]
    fn empty_frame_clears_and_presents_without_drawing() {
        let backend = RecordingBackend::default();
        let mut renderer =
            Renderer2d::new(backend.clone(), 4).with_clear_color([0.1, 0.2, 0.3, 1.0]);
        draw_frame(&mut renderer, 0);
        assert_eq!(
            *backend.calls.borrow(),
            vec![Call::Begin([0.1, 0.2, 0.3, 1.0]), Call::End]
        );
    }

    #[test]
    fn backend_errors_propagate() {
        let backend = RecordingBackend {
            fail_draws: true,
            ..Default::default()
        };
        let mut renderer = Renderer2d::new(backend, 1);
        renderer.begin_frame().unwrap();
        renderer.draw_quad(&quad(0)).unwrap();
        assert!(matches!(renderer.draw_quad(&quad(1)), Err(Error::Gpu(_))));
    }
}
