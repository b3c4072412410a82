//! Block-length adaptation
//!
//! The convolvers consume and produce exactly `block_length` frames per
//! call; `BlockAdapter` lets a host process any frame count. Input frames
//! are staged in a ring until a full block is available, the inner
//! processor runs on contiguous ring windows, and the host drains the
//! output ring as it goes. The output ring is primed with one block of
//! zeros, so the adapter surface carries a fixed `block_length`-sample
//! latency.

use std::marker::PhantomData;

use aura_core::CircularBuffer;
use aura_vector::KernelSample;

use crate::{ConvolverError, ConvolverResult};

/// A fixed-block processor the adapter can wrap.
pub trait BlockProcessor<S: KernelSample> {
    fn num_inputs(&self) -> usize;

    fn num_outputs(&self) -> usize;

    /// Frames consumed and produced per `process_block` call.
    fn block_length(&self) -> usize;

    /// Element alignment of the processor's internal buffers.
    fn alignment(&self) -> usize {
        1
    }

    /// Process exactly one block from/to strided channel buffers.
    fn process_block(
        &mut self,
        input: &[S],
        input_stride: usize,
        output: &mut [S],
        output_stride: usize,
        alignment: usize,
    ) -> ConvolverResult<()>;
}

pub struct BlockAdapter<S: KernelSample, P: BlockProcessor<S>> {
    inner: P,
    input_ring: CircularBuffer<S>,
    output_ring: CircularBuffer<S>,
    input_level: usize,
    output_level: usize,
    _marker: PhantomData<S>,
}

impl<S: KernelSample, P: BlockProcessor<S>> BlockAdapter<S, P> {
    pub fn new(inner: P) -> ConvolverResult<Self> {
        let block = inner.block_length();
        let alignment = inner.alignment();
        let input_ring = CircularBuffer::new(inner.num_inputs(), 2 * block, alignment)?;
        let mut output_ring = CircularBuffer::new(inner.num_outputs(), 2 * block, alignment)?;
        // Prime the output ring with one silent block; the ring starts
        // zeroed, so committing is enough.
        output_ring.write_region(block)?;
        output_ring.commit(block)?;
        Ok(Self {
            inner,
            input_ring,
            output_ring,
            input_level: 0,
            output_level: block,
            _marker: PhantomData,
        })
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut P {
        &mut self.inner
    }

    /// Latency added by the adapter, in frames.
    pub fn latency(&self) -> usize {
        self.inner.block_length()
    }

    /// Process `frames` samples per channel, slice-of-channels form.
    pub fn process(
        &mut self,
        input: &[&[S]],
        output: &mut [&mut [S]],
        frames: usize,
    ) -> ConvolverResult<()> {
        self.check_channels(input.len(), output.len())?;
        if input.iter().any(|c| c.len() < frames) || output.iter().any(|c| c.len() < frames) {
            return Err(ConvolverError::InvalidArgument(
                "channel buffers are shorter than the frame count".into(),
            ));
        }
        let block = self.inner.block_length();
        let mut processed = 0;
        let mut remaining = frames;
        while remaining > 0 {
            let chunk = remaining.min(block - self.input_level);
            {
                let (region, stride) = self.input_ring.write_region(chunk)?;
                for (channel, src) in input.iter().enumerate() {
                    region[channel * stride..channel * stride + chunk]
                        .copy_from_slice(&src[processed..processed + chunk]);
                }
            }
            self.input_ring.commit(chunk)?;
            self.input_level += chunk;

            if self.input_level == block {
                self.run_inner_block()?;
            }

            {
                let (region, stride) = self.output_ring.read_region(self.output_level)?;
                for (channel, dst) in output.iter_mut().enumerate() {
                    dst[processed..processed + chunk]
                        .copy_from_slice(&region[channel * stride..channel * stride + chunk]);
                }
            }
            self.output_level -= chunk;
            processed += chunk;
            remaining -= chunk;
        }
        Ok(())
    }

    /// Process `frames` samples per channel from/to strided buffers.
    pub fn process_strided(
        &mut self,
        input: &[S],
        input_stride: usize,
        output: &mut [S],
        output_stride: usize,
        frames: usize,
    ) -> ConvolverResult<()> {
        let inputs = self.inner.num_inputs();
        let outputs = self.inner.num_outputs();
        if frames > 0
            && (input.len() < (inputs - 1) * input_stride + frames
                || output.len() < (outputs - 1) * output_stride + frames)
        {
            return Err(ConvolverError::InvalidArgument(
                "strided buffers are shorter than the frame count".into(),
            ));
        }
        let block = self.inner.block_length();
        let mut processed = 0;
        let mut remaining = frames;
        while remaining > 0 {
            let chunk = remaining.min(block - self.input_level);
            {
                let (region, stride) = self.input_ring.write_region(chunk)?;
                for channel in 0..inputs {
                    let start = channel * input_stride + processed;
                    region[channel * stride..channel * stride + chunk]
                        .copy_from_slice(&input[start..start + chunk]);
                }
            }
            self.input_ring.commit(chunk)?;
            self.input_level += chunk;

            if self.input_level == block {
                self.run_inner_block()?;
            }

            {
                let (region, stride) = self.output_ring.read_region(self.output_level)?;
                for channel in 0..outputs {
                    let start = channel * output_stride + processed;
                    output[start..start + chunk]
                        .copy_from_slice(&region[channel * stride..channel * stride + chunk]);
                }
            }
            self.output_level -= chunk;
            processed += chunk;
            remaining -= chunk;
        }
        Ok(())
    }

    fn run_inner_block(&mut self) -> ConvolverResult<()> {
        let block = self.inner.block_length();
        let (in_region, in_stride) = self.input_ring.read_region(block)?;
        let (out_region, out_stride) = self.output_ring.write_region(block)?;
        self.inner
            .process_block(in_region, in_stride, out_region, out_stride, 0)?;
        self.output_ring.commit(block)?;
        self.input_level -= block;
        self.output_level += block;
        Ok(())
    }

    fn check_channels(&self, inputs: usize, outputs: usize) -> ConvolverResult<()> {
        if inputs != self.inner.num_inputs() {
            return Err(ConvolverError::InvalidArgument(format!(
                "expected {} input channels, got {}",
                self.inner.num_inputs(),
                inputs
            )));
        }
        if outputs != self.inner.num_outputs() {
            return Err(ConvolverError::InvalidArgument(format!(
                "expected {} output channels, got {}",
                self.inner.num_outputs(),
                outputs
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Inner processor that doubles its mono input.
    struct Doubler {
        block: usize,
    }

    impl BlockProcessor<f32> for Doubler {
        fn num_inputs(&self) -> usize {
            1
        }

        fn num_outputs(&self) -> usize {
            1
        }

        fn block_length(&self) -> usize {
            self.block
        }

        fn process_block(
            &mut self,
            input: &[f32],
            _input_stride: usize,
            output: &mut [f32],
            _output_stride: usize,
            _alignment: usize,
        ) -> ConvolverResult<()> {
            for (o, &i) in output.iter_mut().zip(input) {
                *o = 2.0 * i;
            }
            Ok(())
        }
    }

    #[test]
    fn test_one_block_latency_with_matching_sizes() {
        let mut adapter = BlockAdapter::new(Doubler { block: 4 }).unwrap();
        assert_eq!(adapter.latency(), 4);
        let first = [1.0f32, 2.0, 3.0, 4.0];
        let mut out = [9.0f32; 4];
        adapter
            .process(&[&first], &mut [&mut out[..]], 4)
            .unwrap();
        assert_eq!(out, [0.0; 4]);
        let second = [5.0f32, 6.0, 7.0, 8.0];
        adapter
            .process(&[&second], &mut [&mut out[..]], 4)
            .unwrap();
        assert_eq!(out, [2.0, 4.0, 6.0, 8.0]);
    }

    #[test]
    fn test_odd_chunk_sizes_match_block_processing() {
        // Drive the same samples through frame counts of 3 and compare
        // against whole-block processing shifted by the primed block.
        let samples: Vec<f32> = (0..18).map(|i| i as f32 * 0.5 - 3.0).collect();
        let mut adapter = BlockAdapter::new(Doubler { block: 8 }).unwrap();
        let mut collected = Vec::new();
        let mut out = [0.0f32; 3];
        for chunk in samples.chunks(3) {
            adapter.process(&[chunk], &mut [&mut out[..]], 3).unwrap();
            collected.extend_from_slice(&out);
        }
        let mut expected = vec![0.0f32; 8];
        expected.extend(samples.iter().map(|x| 2.0 * x));
        for (c, e) in collected.iter().zip(&expected) {
            assert!((c - e).abs() < 1e-6, "{c} vs {e}");
        }
    }

    #[test]
    fn test_strided_variant_matches() {
        let samples: Vec<f32> = (0..12).map(|i| (i as f32).cos()).collect();
        let mut split = BlockAdapter::new(Doubler { block: 4 }).unwrap();
        let mut strided = BlockAdapter::new(Doubler { block: 4 }).unwrap();
        let mut out_a = vec![0.0f32; 12];
        let mut out_b = vec![0.0f32; 12];
        split
            .process(&[&samples], &mut [&mut out_a[..]], 12)
            .unwrap();
        strided
            .process_strided(&samples, 12, &mut out_b, 12, 12)
            .unwrap();
        assert_eq!(out_a, out_b);
    }

    #[test]
    fn test_channel_count_mismatch_rejected() {
        let mut adapter = BlockAdapter::new(Doubler { block: 4 }).unwrap();
        let input = [0.0f32; 4];
        let mut out = [0.0f32; 4];
        assert!(adapter
            .process(&[&input, &input], &mut [&mut out[..]], 4)
            .is_err());
    }
}
