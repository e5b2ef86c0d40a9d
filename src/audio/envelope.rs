// Declick envelope for playback units
//
// Raw PCM chunk boundaries produce audible clicks. Each playback unit gets
// an independent gain envelope: ramp 0 -> 1 at onset, hold, ramp 1 -> 0 at
// the tail. The ramp window is derived from the actual segment duration so
// the two ramps never overlap mid-chunk.

/// Per-unit gain envelope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeEnvelope {
    /// Ramp window in seconds at the unit's onset and tail
    pub fade_secs: f32,
    /// Total unit duration in seconds
    pub duration_secs: f32,
}

impl FadeEnvelope {
    /// Default ramp window, ~20ms
    pub const DEFAULT_FADE_SECS: f32 = 0.02;
    /// Lower bound on the ramp window, 5ms
    pub const MIN_FADE_SECS: f32 = 0.005;

    /// Envelope for a unit of `samples` mono samples at `sample_rate`.
    ///
    /// The ramp window is `min(base, max(5ms, duration / 8))`.
    pub fn for_samples(samples: usize, sample_rate: u32, base_fade_secs: f32) -> Self {
        let duration_secs = samples as f32 / sample_rate as f32;
        let fade_secs = base_fade_secs.min((duration_secs / 8.0).max(Self::MIN_FADE_SECS));
        Self {
            fade_secs,
            duration_secs,
        }
    }

    /// Gain at `t_secs` into the unit, in [0, 1].
    pub fn gain_at(&self, t_secs: f32) -> f32 {
        if self.duration_secs <= 0.0 {
            return 0.0;
        }
        let t = t_secs.clamp(0.0, self.duration_secs);

        let ramp_in = if self.fade_secs > 0.0 {
            (t / self.fade_secs).min(1.0)
        } else {
            1.0
        };

        // The hold plateau ends at duration - fade, but never before the
        // ramp-in completes (short chunks collapse the plateau).
        let hold_end = self.fade_secs.max(self.duration_secs - self.fade_secs);
        let ramp_out = if t <= hold_end {
            1.0
        } else {
            let tail = self.duration_secs - hold_end;
            if tail > 0.0 {
                1.0 - (t - hold_end) / tail
            } else {
                1.0
            }
        };

        ramp_in.min(ramp_out).max(0.0)
    }

    /// Scale `samples` in place by the envelope's gain curve.
    pub fn apply(&self, samples: &mut [f32], sample_rate: u32) {
        for (i, sample) in samples.iter_mut().enumerate() {
            *sample *= self.gain_at(i as f32 / sample_rate as f32);
        }
    }
}
