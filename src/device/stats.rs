/// Shader stages counted per registered program: one vertex, one fragment.
///
/// Built-in full-screen programs of a backend are not counted.
pub const SHADERS_PER_PROGRAM: u32 = 2;

/// Runtime statistics reported by a device.
///
/// Resource counts are live; draw counters describe the last flushed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceStats {
    pub programs: u32,
    pub shaders: u32,
    pub attributes: u32,
    pub framebuffers: u32,
    pub textures: u32,
    pub vertex_arrays: u32,

    pub draw_count: u32,
    pub instance_count: u32,
    pub instanced_draw_count: u32,
}

impl DeviceStats {
    /// Resource counts of a device with `programs` registered programs.
    pub(crate) fn resources(programs: usize) -> Self {
        Self {
            programs: programs as u32,
            shaders: programs as u32 * SHADERS_PER_PROGRAM,
            ..Self::default()
        }
    }

    /// Accounts one draw of `instances` instances.
    pub(crate) fn record_draw(&mut self, instances: u32) {
        self.draw_count += 1;
        self.instance_count += instances;
        if instances > 1 {
            self.instanced_draw_count += 1;
        }
    }

    /// Copies the frame counters of `frame` over these stats.
    pub(crate) fn with_frame(mut self, frame: &DeviceStats) -> Self {
        self.draw_count = frame.draw_count;
        self.instance_count = frame.instance_count;
        self.instanced_draw_count = frame.instanced_draw_count;
        self
    }
}

/// Draw counters of the frame in progress and of the last published frame.
///
/// Outside a `begin_frame`/`end_frame` scope every flush is a frame of its
/// own. Inside one, flushes publish the running total so a frame submitted in
/// several flushes (one per stereo eye) is counted whole.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct FrameCounters {
    current: DeviceStats,
    published: DeviceStats,
    in_frame: bool,
}

impl FrameCounters {
    pub(crate) fn begin_frame(&mut self) {
        self.current = DeviceStats::default();
        self.in_frame = true;
    }

    pub(crate) fn end_frame(&mut self) {
        self.published = self.current;
        self.current = DeviceStats::default();
        self.in_frame = false;
    }

    pub(crate) fn record_draw(&mut self, instances: u32) {
        self.current.record_draw(instances);
    }

    pub(crate) fn flush(&mut self) {
        self.published = self.current;
        if !self.in_frame {
            self.current = DeviceStats::default();
        }
    }

    pub(crate) fn published(&self) -> &DeviceStats {
        &self.published
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flushes_inside_a_frame_accumulate() {
        let mut counters = FrameCounters::default();
        counters.begin_frame();
        counters.record_draw(1);
        counters.flush();
        assert_eq!(counters.published().draw_count, 1);

        counters.record_draw(3);
        counters.flush();
        counters.end_frame();
        let published = counters.published();
        assert_eq!(published.draw_count, 2);
        assert_eq!(published.instance_count, 4);
        assert_eq!(published.instanced_draw_count, 1);

        counters.record_draw(1);
        counters.flush();
        counters.record_draw(1);
        counters.flush();
        assert_eq!(counters.published().draw_count, 1);
    }
}
