use crate::error::LoadError;
use crate::protocol::TimingInfo;
use tracing::debug;

/// Resolution of the external MIDI clock, and of every stored duration.
pub const INTERNAL_PPQN: u32 = 24;

pub const MAX_TICKS: u64 = u16::MAX as u64;

/// Rescales caller durations onto the 24-tick clock grid using integer math
/// only.
#[derive(Debug, Clone, Copy)]
pub struct TickScaler {
    auto_scale: bool,
}

impl Default for TickScaler {
    fn default() -> Self {
        Self { auto_scale: true }
    }
}

impl TickScaler {
    /// With `auto_scale` off, undeclared durations are always taken as
    /// 24-tick values and no resolution is inferred.
    pub fn new(auto_scale: bool) -> Self {
        Self { auto_scale }
    }

    /// Rewrites `durations` in place. On error the slice may be partially
    /// rewritten; callers own a scratch copy.
    ///
    /// A declared resolution of 0 counts as undeclared.
    pub fn scale(&self, durations: &mut [u64], declared: Option<u32>) -> Result<TimingInfo, LoadError> {
        match declared.filter(|&ppqn| ppqn > 0) {
            Some(ppqn) => scale_explicit(durations, ppqn),
            None => self.scale_implicit(durations),
        }
    }

    fn scale_implicit(&self, durations: &mut [u64]) -> Result<TimingInfo, LoadError> {
        let common = durations.iter().copied().fold(0, gcd);
        let divisor = if self.auto_scale && common > 0 && common % INTERNAL_PPQN as u64 == 0 {
            common / INTERNAL_PPQN as u64
        } else {
            1
        };

        for (index, d) in durations.iter_mut().enumerate() {
            let ticks = (*d / divisor).max(1);
            if ticks > MAX_TICKS {
                return Err(LoadError::TicksTooLarge { index, ticks });
            }
            *d = ticks;
        }

        let source_resolution = u32::try_from(divisor * INTERNAL_PPQN as u64).unwrap_or(u32::MAX);
        if divisor > 1 {
            debug!(gcd = common, source_resolution, "inferred caller resolution");
        }

        Ok(TimingInfo {
            source_resolution,
            applied_resolution: INTERNAL_PPQN,
            resolution_was_explicit: false,
            auto_scaled: divisor > 1,
        })
    }
}

fn scale_explicit(durations: &mut [u64], ppqn: u32) -> Result<TimingInfo, LoadError> {
    let declared = ppqn as u64;
    for (index, d) in durations.iter_mut().enumerate() {
        let raw = *d;
        let ticks = raw
            .checked_mul(INTERNAL_PPQN as u64)
            .and_then(|n| n.checked_add(declared / 2))
            .map(|n| (n / declared).max(1))
            .filter(|&t| t <= MAX_TICKS)
            .ok_or(LoadError::TicksAfterScalingOutOfRange { index, raw, ppqn })?;
        *d = ticks;
    }

    Ok(TimingInfo {
        source_resolution: ppqn,
        applied_resolution: INTERNAL_PPQN,
        resolution_was_explicit: true,
        auto_scaled: ppqn != INTERNAL_PPQN,
    })
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 { a } else { gcd(b, a % b) }
}
