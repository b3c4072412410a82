//! Linearly interpolated gain changes for a single channel
//!
//! Stateless helper: the caller tracks how many blocks a transition has
//! been running and passes that as `block_index`. The precomputed ramp
//! rises from 0 to 1 over `interpolation_samples` and stays at 1, so any
//! block at or past `interpolation_periods` applies the constant end
//! gain.

use aura_core::AlignedVector;
use aura_vector::{ops, KernelSample};

use crate::{ConvolverError, ConvolverResult};

pub struct GainFader<S: KernelSample> {
    block_size: usize,
    interpolation_samples: usize,
    interpolation_periods: usize,
    ramp: AlignedVector<S>,
}

impl<S: KernelSample> GainFader<S> {
    pub fn new(
        block_size: usize,
        interpolation_samples: usize,
        alignment: usize,
    ) -> ConvolverResult<Self> {
        if block_size == 0 {
            return Err(ConvolverError::InvalidArgument(
                "gain fader requires a nonzero block size".into(),
            ));
        }
        let interpolation_periods = interpolation_samples.div_ceil(block_size);
        let mut ramp = AlignedVector::new((interpolation_periods + 1) * block_size, alignment)?;
        match interpolation_samples {
            0 => {}
            1 => ramp.as_mut_slice()[0] = S::one(),
            _ => ops::ramp(
                &mut ramp.as_mut_slice()[..interpolation_samples],
                S::zero(),
                S::one(),
                false,
                true,
                0,
            )?,
        }
        ops::fill(
            S::one(),
            &mut ramp.as_mut_slice()[interpolation_samples..],
            0,
        )?;
        Ok(Self {
            block_size,
            interpolation_samples,
            interpolation_periods,
            ramp,
        })
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Samples a transition takes to reach the end gain.
    pub fn interpolation_samples(&self) -> usize {
        self.interpolation_samples
    }

    /// Whole blocks a transition spans (ceiling).
    pub fn interpolation_periods(&self) -> usize {
        self.interpolation_periods
    }

    /// `output[k] = (start + (end - start) * ramp[block, k]) * input[k]`
    pub fn scale(
        &self,
        input: &[S],
        output: &mut [S],
        start_gain: S,
        end_gain: S,
        block_index: usize,
    ) -> ConvolverResult<()> {
        self.apply(input, output, start_gain, end_gain, block_index, false)
    }

    /// As [`scale`], accumulating into `output`.
    ///
    /// [`scale`]: GainFader::scale
    pub fn scale_and_accumulate(
        &self,
        input: &[S],
        output: &mut [S],
        start_gain: S,
        end_gain: S,
        block_index: usize,
    ) -> ConvolverResult<()> {
        self.apply(input, output, start_gain, end_gain, block_index, true)
    }

    fn apply(
        &self,
        input: &[S],
        output: &mut [S],
        start_gain: S,
        end_gain: S,
        block_index: usize,
        accumulate: bool,
    ) -> ConvolverResult<()> {
        if input.len() != self.block_size || output.len() != self.block_size {
            return Err(ConvolverError::InvalidArgument(format!(
                "gain fader processes blocks of {} samples",
                self.block_size
            )));
        }
        let block = block_index.min(self.interpolation_periods);
        let segment = &self.ramp[block * self.block_size..(block + 1) * self.block_size];
        ops::ramp_scale(
            input,
            segment,
            output,
            start_gain,
            end_gain - start_gain,
            accumulate,
            0,
        )?;
        Ok(())
    }
}
