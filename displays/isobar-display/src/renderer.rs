//! Screen renderer
//!
//! Bridges the core `DisplayRenderer` trait to a character backend: lays
//! out the reading into a [`Screen`] and pushes changed frames to the
//! panel.

use isobar_core::reading::CorrectedReading;
use isobar_core::traits::{DisplayError, DisplayRenderer, RenderContext};

use crate::backend::DisplayBackend;
use crate::layout::compose;
use crate::screen::Screen;

/// Renders the reading screen on a `DisplayBackend`
pub struct ScreenRenderer<B> {
    backend: B,
    screen: Screen,
}

impl<B: DisplayBackend> ScreenRenderer<B> {
    /// Create a renderer; the first frame is always drawn
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            screen: Screen::new(),
        }
    }

    /// The frame most recently laid out
    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    /// Access the backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Push the current frame to the backend
    fn draw(&mut self) -> Result<(), DisplayError> {
        let (_, rows) = self.backend.dimensions();

        self.backend.clear()?;
        for (row, line) in self.screen.lines().enumerate().take(rows as usize) {
            if !line.is_empty() {
                self.backend.draw_text(row as u8, 0, line)?;
            }
            if let Some((start, end)) = self.screen.get_highlight(row) {
                self.backend.invert_region(row as u8, start, end)?;
            }
        }
        self.backend.flush()
    }
}

impl<B: DisplayBackend> DisplayRenderer for ScreenRenderer<B> {
    fn render(
        &mut self,
        reading: &CorrectedReading,
        ctx: &RenderContext,
    ) -> Result<(), DisplayError> {
        if !self.backend.is_ready() {
            return Err(DisplayError::NotInitialized);
        }

        compose(&mut self.screen, reading, ctx)?;
        if !self.screen.is_dirty() {
            return Ok(());
        }

        match self.draw() {
            Ok(()) => {
                self.screen.mark_clean();
                Ok(())
            }
            Err(e) => {
                // Retry the whole frame next tick
                self.screen.mark_dirty();
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screen::{SCREEN_COLS, SCREEN_ROWS};
    use heapless::Vec;
    use isobar_core::throttle::LinkStatus;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Op {
        Clear,
        Text(u8),
        Invert(u8, u8, u8),
        Flush,
    }

    struct RecordingBackend {
        ready: bool,
        fail_flush: bool,
        ops: Vec<Op, 64>,
    }

    impl RecordingBackend {
        fn new() -> Self {
            Self {
                ready: true,
                fail_flush: false,
                ops: Vec::new(),
            }
        }

        fn flushes(&self) -> usize {
            self.ops.iter().filter(|op| **op == Op::Flush).count()
        }
    }

    impl DisplayBackend for RecordingBackend {
        fn clear(&mut self) -> Result<(), DisplayError> {
            let _ = self.ops.push(Op::Clear);
            Ok(())
        }

        fn draw_text(&mut self, row: u8, _col: u8, _text: &str) -> Result<(), DisplayError> {
            let _ = self.ops.push(Op::Text(row));
            Ok(())
        }

        fn invert_region(&mut self, row: u8, start: u8, end: u8) -> Result<(), DisplayError> {
            let _ = self.ops.push(Op::Invert(row, start, end));
            Ok(())
        }

        fn flush(&mut self) -> Result<(), DisplayError> {
            let _ = self.ops.push(Op::Flush);
            if self.fail_flush {
                Err(DisplayError::Communication)
            } else {
                Ok(())
            }
        }

        fn dimensions(&self) -> (u8, u8) {
            (SCREEN_COLS as u8, SCREEN_ROWS as u8)
        }

        fn is_ready(&self) -> bool {
            self.ready
        }
    }

    fn ctx(uptime_ms: u64) -> RenderContext {
        RenderContext {
            uptime_ms,
            wall_time: None,
            link: LinkStatus::Published,
            has_reading: true,
        }
    }

    fn hot() -> CorrectedReading {
        CorrectedReading {
            temperature: 35.0,
            pressure: 1000.0,
            humidity: 50.0,
            lux: 10.0,
        }
    }

    #[test]
    fn test_first_frame_draws_every_row() {
        let mut renderer = ScreenRenderer::new(RecordingBackend::new());
        renderer.render(&hot(), &ctx(0)).unwrap();

        let ops = &renderer.backend().ops;
        assert_eq!(ops.first(), Some(&Op::Clear));
        assert_eq!(ops.iter().filter(|op| matches!(op, Op::Text(_))).count(), SCREEN_ROWS);
        assert!(ops.contains(&Op::Invert(1, 0, 17)));
        assert_eq!(ops.last(), Some(&Op::Flush));
    }

    #[test]
    fn test_unchanged_frame_is_not_redrawn() {
        let mut renderer = ScreenRenderer::new(RecordingBackend::new());
        renderer.render(&hot(), &ctx(0)).unwrap();
        renderer.render(&hot(), &ctx(500)).unwrap();
        assert_eq!(renderer.backend().flushes(), 1);

        renderer.render(&hot(), &ctx(1000)).unwrap();
        assert_eq!(renderer.backend().flushes(), 2);
    }

    #[test]
    fn test_failed_flush_retries_next_tick() {
        let mut backend = RecordingBackend::new();
        backend.fail_flush = true;
        let mut renderer = ScreenRenderer::new(backend);

        assert_eq!(
            renderer.render(&hot(), &ctx(0)),
            Err(DisplayError::Communication)
        );
        assert!(renderer.screen().is_dirty());

        let _ = renderer.render(&hot(), &ctx(0));
        assert_eq!(renderer.backend().flushes(), 2);
    }

    #[test]
    fn test_not_ready() {
        let mut backend = RecordingBackend::new();
        backend.ready = false;
        let mut renderer = ScreenRenderer::new(backend);

        assert_eq!(
            renderer.render(&hot(), &ctx(0)),
            Err(DisplayError::NotInitialized)
        );
        assert!(renderer.backend().ops.is_empty());
    }
}
