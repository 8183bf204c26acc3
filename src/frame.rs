use std::time::Instant;

use anyhow::Result;

use crate::material::SceneMaterials;

/// Monotonic clock started once at scene initialization.
#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    started: Instant,
}

impl FrameClock {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    /// Seconds since the clock started; non-negative and non-decreasing.
    pub fn elapsed(&self) -> f32 {
        self.started.elapsed().as_secs_f32()
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::start()
    }
}

/// The per-frame control flow: sample the clock, push the elapsed time into
/// both shader materials, issue exactly one draw, count the frame.
///
/// Scheduling of the next invocation belongs to the host (the window's
/// redraw request), and teardown is the event loop's exit path, so the loop
/// has an explicit stop condition instead of rescheduling itself forever.
#[derive(Debug)]
pub struct FrameLoop {
    clock: FrameClock,
    frames: u64,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self {
            clock: FrameClock::start(),
            frames: 0,
        }
    }

    /// Number of completed frame invocations.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Runs one frame against the live clock.
    pub fn run_frame<F>(&mut self, materials: &mut SceneMaterials, draw: F) -> Result<()>
    where
        F: FnOnce(&SceneMaterials) -> Result<()>,
    {
        let elapsed = self.clock.elapsed();
        self.run_frame_at(elapsed, materials, draw)
    }

    /// Runs one frame at an explicit elapsed time.
    ///
    /// The uniform write happens after the time is fixed and before the
    /// draw callback runs; the callback is invoked exactly once.
    pub fn run_frame_at<F>(
        &mut self,
        elapsed: f32,
        materials: &mut SceneMaterials,
        draw: F,
    ) -> Result<()>
    where
        F: FnOnce(&SceneMaterials) -> Result<()>,
    {
        materials.advance(elapsed);
        draw(materials)?;
        self.frames += 1;
        Ok(())
    }
}

impl Default for FrameLoop {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_is_monotonic() {
        let clock = FrameClock::start();
        let a = clock.elapsed();
        let b = clock.elapsed();
        assert!(a >= 0.0);
        assert!(b >= a);
    }

    #[test]
    fn uniforms_track_the_invocation_time() {
        let mut frame_loop = FrameLoop::new();
        let mut materials = SceneMaterials::default();
        let times = [0.0, 0.016, 0.033, 0.05, 0.05, 1.5];

        for (n, t) in times.iter().enumerate() {
            frame_loop
                .run_frame_at(*t, &mut materials, |m| {
                    assert_eq!(m.portal.time, *t);
                    assert_eq!(m.fireflies.time, *t);
                    Ok(())
                })
                .unwrap();
            assert_eq!(frame_loop.frames(), n as u64 + 1);
            assert_eq!(materials.portal.time, *t);
            assert_eq!(materials.fireflies.time, *t);
        }
    }

    #[test]
    fn each_frame_draws_exactly_once() {
        let mut frame_loop = FrameLoop::new();
        let mut materials = SceneMaterials::default();
        let mut draws = 0u32;

        frame_loop
            .run_frame_at(0.0, &mut materials, |m| {
                draws += 1;
                assert_eq!(m.portal.time, 0.0);
                Ok(())
            })
            .unwrap();
        assert_eq!(draws, 1);

        frame_loop
            .run_frame_at(0.016, &mut materials, |m| {
                draws += 1;
                assert_eq!(m.portal.time, 0.016);
                assert_eq!(m.fireflies.time, 0.016);
                Ok(())
            })
            .unwrap();
        assert_eq!(draws, 2);
        assert_eq!(frame_loop.frames(), 2);
    }

    #[test]
    fn failed_draw_does_not_count_the_frame() {
        let mut frame_loop = FrameLoop::new();
        let mut materials = SceneMaterials::default();
        let result = frame_loop.run_frame_at(0.5, &mut materials, |_| {
            Err(anyhow::anyhow!("surface lost"))
        });
        assert!(result.is_err());
        assert_eq!(frame_loop.frames(), 0);
        // The uniform write already happened; the next frame overwrites it.
        assert_eq!(materials.portal.time, 0.5);
    }
}
