//! Speech-rate selection.

/// Phoneme count up to which the fastest rate is used.
pub const FAST_UNTIL: usize = 83;

/// Phoneme count from which the slowest rate is used.
pub const SLOW_FROM: usize = 183;

/// Rate used for short inputs.
pub const FAST_SPEED: f32 = 1.1;

/// Rate used for long inputs.
pub const SLOW_SPEED: f32 = 0.88;

/// How the speed multiplier passed to the model is chosen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpeedPolicy {
    /// Always use the given multiplier.
    Fixed(f32),
    /// Derive the multiplier from the phoneme count with [`dynamic_speed`].
    Dynamic,
}

impl Default for SpeedPolicy {
    fn default() -> Self {
        SpeedPolicy::Fixed(1.0)
    }
}

impl From<f32> for SpeedPolicy {
    fn from(speed: f32) -> Self {
        SpeedPolicy::Fixed(speed)
    }
}

impl SpeedPolicy {
    /// Resolve the multiplier for a phoneme sequence of `phoneme_len` tokens.
    pub fn resolve(&self, phoneme_len: usize) -> f32 {
        match *self {
            SpeedPolicy::Fixed(speed) => speed,
            SpeedPolicy::Dynamic => dynamic_speed(phoneme_len),
        }
    }
}

/// Speech rate for a phoneme sequence of length `len`.
///
/// Short sequences are spoken at 1.1x. Between 83 and 183 phonemes the rate
/// decays linearly, reaching 0.88x at 183 and staying there.
pub fn dynamic_speed(len: usize) -> f32 {
    if len <= FAST_UNTIL {
        return FAST_SPEED;
    }
    if len < SLOW_FROM {
        let decay = (len - FAST_UNTIL) as f32 / 500.0;
        return (1.0 - decay) * FAST_SPEED;
    }
    SLOW_SPEED
}
