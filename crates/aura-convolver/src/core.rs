//! Uniformly partitioned convolution core
//!
//! Maintains, per instance:
//! - a circular input buffer holding the last `dft_size` samples per input
//! - the frequency-domain delay line (FDL): one ring of partition-sized
//!   complex blocks per input, rotated by a cursor instead of moving data
//! - the frequency-domain filter bank, `max_filters` rows of partitions
//!
//! The core knows nothing about routing; callers drive it with
//! `process_inputs` / `process_filter` / `transform_output` once per
//! block. All stored filters are pre-scaled by `filter_scale` so the
//! overall pipeline has unit gain for any FFT scaling convention.

use aura_core::{
    is_aligned_to, next_aligned_size, AlignedMatrix, AlignedVector, CircularBuffer, Gain,
};
use aura_vector::{ops, KernelSample};
use num_complex::Complex;

use crate::fft::{create_fft_backend, filter_scaling_factor, FftBackend};
use crate::{ConvolverError, ConvolverResult};

/// Number of partitions needed to cover `filter_length` taps.
pub fn partition_count(filter_length: usize, block_length: usize) -> usize {
    filter_length.div_ceil(block_length)
}

/// DFT size for one partition: two blocks (overlap-save).
pub fn dft_size(block_length: usize) -> usize {
    2 * block_length
}

/// Complex bins produced by the forward real FFT.
pub fn dft_bins(block_length: usize) -> usize {
    block_length + 1
}

/// Bin count padded to the complex alignment for vectorised loops.
pub fn dft_bins_padded(block_length: usize, complex_alignment: usize) -> usize {
    next_aligned_size(dft_bins(block_length), complex_alignment)
}

pub struct CoreConvolver<S: KernelSample> {
    alignment: usize,
    complex_alignment: usize,
    num_inputs: usize,
    num_outputs: usize,
    block_length: usize,
    max_filter_length: usize,
    num_partitions: usize,
    dft_size: usize,
    dft_bins: usize,
    dft_bins_padded: usize,
    input_ring: CircularBuffer<S>,
    fdl: AlignedMatrix<Complex<S>>,
    /// Cyclic offset of the newest FDL block within each row.
    fdl_cursor: usize,
    td_scratch: AlignedVector<S>,
    filters: AlignedMatrix<Complex<S>>,
    accumulator: AlignedVector<Complex<S>>,
    fft: Box<dyn FftBackend<S>>,
    filter_scale: S,
}

impl<S: KernelSample> CoreConvolver<S> {
    pub fn new(
        num_inputs: usize,
        num_outputs: usize,
        block_length: usize,
        max_filter_length: usize,
        max_filters: usize,
        initial_filters: Option<&AlignedMatrix<S>>,
        alignment: usize,
        fft_backend: &str,
    ) -> ConvolverResult<Self> {
        if num_inputs == 0 || num_outputs == 0 {
            return Err(ConvolverError::InvalidArgument(
                "convolver requires at least one input and one output".into(),
            ));
        }
        if block_length == 0 || max_filter_length == 0 || max_filters == 0 {
            return Err(ConvolverError::InvalidArgument(
                "block length, filter length and filter count must be nonzero".into(),
            ));
        }
        let alignment = alignment.max(1);
        let complex_alignment = (alignment / 2).max(1);
        let num_partitions = partition_count(max_filter_length, block_length);
        let size = dft_size(block_length);
        let bins = dft_bins(block_length);
        let bins_padded = dft_bins_padded(block_length, complex_alignment);
        let row_len = num_partitions * bins_padded;

        let fft = create_fft_backend::<S>(fft_backend, size, complex_alignment)?;
        let filter_scale = filter_scaling_factor(fft.as_ref());

        let mut core = Self {
            alignment,
            complex_alignment,
            num_inputs,
            num_outputs,
            block_length,
            max_filter_length,
            num_partitions,
            dft_size: size,
            dft_bins: bins,
            dft_bins_padded: bins_padded,
            input_ring: CircularBuffer::new(num_inputs, size, alignment)?,
            fdl: AlignedMatrix::new(num_inputs, row_len, complex_alignment)?,
            fdl_cursor: 0,
            td_scratch: AlignedVector::new(size, alignment)?,
            filters: AlignedMatrix::new(max_filters, row_len, complex_alignment)?,
            accumulator: AlignedVector::new(bins_padded, complex_alignment)?,
            fft,
            filter_scale,
        };
        if let Some(filters) = initial_filters {
            core.init_filters(filters)?;
        }
        Ok(core)
    }

    // ============ Accessors ============

    pub fn num_inputs(&self) -> usize {
        self.num_inputs
    }

    pub fn num_outputs(&self) -> usize {
        self.num_outputs
    }

    pub fn block_length(&self) -> usize {
        self.block_length
    }

    pub fn max_filter_length(&self) -> usize {
        self.max_filter_length
    }

    pub fn max_filters(&self) -> usize {
        self.filters.rows()
    }

    pub fn num_partitions(&self) -> usize {
        self.num_partitions
    }

    pub fn dft_size(&self) -> usize {
        self.dft_size
    }

    pub fn dft_bins(&self) -> usize {
        self.dft_bins
    }

    pub fn dft_bins_padded(&self) -> usize {
        self.dft_bins_padded
    }

    /// Length of one frequency-domain filter row (all partitions).
    pub fn filter_row_len(&self) -> usize {
        self.num_partitions * self.dft_bins_padded
    }

    pub fn alignment(&self) -> usize {
        self.alignment
    }

    pub fn complex_alignment(&self) -> usize {
        self.complex_alignment
    }

    pub fn filter_scale(&self) -> S {
        self.filter_scale
    }

    /// FDL block `block_idx` for one input; block 0 is the newest.
    pub fn fdl_block(&self, input_idx: usize, block_idx: usize) -> ConvolverResult<&[Complex<S>]> {
        self.check_input(input_idx)?;
        self.check_block(block_idx)?;
        let col = ((self.fdl_cursor + block_idx) % self.num_partitions) * self.dft_bins_padded;
        Ok(&self.fdl.row(input_idx)[col..col + self.dft_bins_padded])
    }

    /// Partition `block_idx` of a stored frequency-domain filter.
    pub fn filter_partition(
        &self,
        filter_idx: usize,
        block_idx: usize,
    ) -> ConvolverResult<&[Complex<S>]> {
        self.check_filter(filter_idx)?;
        self.check_block(block_idx)?;
        let col = block_idx * self.dft_bins_padded;
        Ok(&self.filters.row(filter_idx)[col..col + self.dft_bins_padded])
    }

    // ============ Block Processing ============

    /// Ingest one block per input from a strided buffer (channel `c`
    /// starts at `input[c * channel_stride]`) and rotate the FDL.
    pub fn process_inputs(
        &mut self,
        input: &[S],
        channel_stride: usize,
        alignment: usize,
    ) -> ConvolverResult<()> {
        #[cfg(debug_assertions)]
        if !is_aligned_to(input.as_ptr(), alignment.min(self.alignment)) {
            return Err(ConvolverError::Kernel(aura_vector::KernelError::Alignment));
        }
        #[cfg(not(debug_assertions))]
        let _ = alignment;
        self.input_ring
            .write_strided(input, channel_stride, self.block_length)?;
        self.transform_new_block()
    }

    /// Ingest one slice per input and rotate the FDL.
    pub fn process_inputs_split(&mut self, input: &[&[S]]) -> ConvolverResult<()> {
        if input.len() != self.num_inputs {
            return Err(ConvolverError::InvalidArgument(format!(
                "expected {} input channels, got {}",
                self.num_inputs,
                input.len()
            )));
        }
        if input.iter().any(|c| c.len() != self.block_length) {
            return Err(ConvolverError::InvalidArgument(
                "input channel slices must hold one block".into(),
            ));
        }
        self.input_ring.write(input)?;
        self.transform_new_block()
    }

    fn transform_new_block(&mut self) -> ConvolverResult<()> {
        self.advance_fdl();
        let col = (self.fdl_cursor % self.num_partitions) * self.dft_bins_padded;
        for ch in 0..self.num_inputs {
            let window = self.input_ring.read(ch, self.dft_size)?;
            let dest = &mut self.fdl.row_mut(ch)[col..col + self.dft_bins];
            self.fft.forward(window, dest)?;
        }
        Ok(())
    }

    /// Rotate the FDL so that block 0 becomes the slot to overwrite.
    fn advance_fdl(&mut self) {
        self.fdl_cursor = (self.fdl_cursor + self.num_partitions - 1) % self.num_partitions;
    }

    /// Frequency-domain convolution of one input with one filter:
    /// `acc[b] = sum_p fdl[input, p][b] * filters[filter, p][b]`, then
    /// `output = gain * acc` (or `output += gain * acc` when
    /// `accumulate`). `output` must span `dft_bins_padded` bins at the
    /// core's complex alignment.
    pub fn process_filter(
        &mut self,
        input_idx: usize,
        filter_idx: usize,
        gain: Gain,
        output: &mut [Complex<S>],
        accumulate: bool,
    ) -> ConvolverResult<()> {
        self.check_input(input_idx)?;
        self.check_filter(filter_idx)?;
        if output.len() != self.dft_bins_padded {
            return Err(ConvolverError::InvalidArgument(format!(
                "process_filter output must hold {} bins, got {}",
                self.dft_bins_padded,
                output.len()
            )));
        }
        let partitions = self.num_partitions;
        let padded = self.dft_bins_padded;
        let align = self.complex_alignment;
        let cursor = self.fdl_cursor;
        let acc = self.accumulator.as_mut_slice();
        let fdl_row = self.fdl.row(input_idx);
        let filter_row = self.filters.row(filter_idx);

        let col0 = (cursor % partitions) * padded;
        ops::complex_multiply(
            &fdl_row[col0..col0 + padded],
            &filter_row[..padded],
            acc,
            align,
        )?;
        for block in 1..partitions {
            let fdl_col = ((cursor + block) % partitions) * padded;
            let filter_col = block * padded;
            ops::complex_multiply_add_inplace(
                &fdl_row[fdl_col..fdl_col + padded],
                &filter_row[filter_col..filter_col + padded],
                acc,
                align,
            )?;
        }

        // Fold the routing gain in as a complex constant with zero
        // imaginary part; the padded bins are zero on both sides.
        let scale = Complex::new(<S as From<f32>>::from(gain), S::zero());
        if accumulate {
            ops::complex_multiply_const_add_inplace(scale, acc, output, align)?;
        } else {
            ops::complex_multiply_const(scale, acc, output, align)?;
        }
        Ok(())
    }

    /// Inverse-transform accumulated bins and emit the non-aliased half:
    /// the leading `block_length` samples of the IFFT carry time-domain
    /// aliasing and are discarded.
    pub fn transform_output(
        &mut self,
        bins: &[Complex<S>],
        output: &mut [S],
    ) -> ConvolverResult<()> {
        if bins.len() < self.dft_bins {
            return Err(ConvolverError::InvalidArgument(format!(
                "transform_output needs {} bins, got {}",
                self.dft_bins,
                bins.len()
            )));
        }
        if output.len() != self.block_length {
            return Err(ConvolverError::InvalidArgument(format!(
                "transform_output emits {} samples, got buffer of {}",
                self.block_length,
                output.len()
            )));
        }
        self.fft
            .inverse(&bins[..self.dft_bins], self.td_scratch.as_mut_slice())?;
        ops::copy(&self.td_scratch[self.block_length..], output, 0)?;
        Ok(())
    }

    /// Clear the input history without touching the filter bank.
    pub fn reset(&mut self) {
        self.input_ring.reset();
        self.fdl.zero_fill();
        self.fdl_cursor = 0;
    }

    // ============ Filter Mutators ============

    /// Reset all filters to zero.
    pub fn clear_filters(&mut self) {
        self.filters.zero_fill();
    }

    /// Load a new set of impulse responses, one matrix row per filter;
    /// missing rows and taps stay zero.
    pub fn init_filters(&mut self, new_filters: &AlignedMatrix<S>) -> ConvolverResult<()> {
        if new_filters.rows() > self.max_filters() {
            return Err(ConvolverError::InvalidArgument(format!(
                "{} filters exceed the {} filter slots",
                new_filters.rows(),
                self.max_filters()
            )));
        }
        if new_filters.cols() > self.max_filter_length {
            return Err(ConvolverError::InvalidArgument(format!(
                "filter length {} exceeds maximum {}",
                new_filters.cols(),
                self.max_filter_length
            )));
        }
        self.clear_filters();
        for idx in 0..new_filters.rows() {
            self.set_impulse_response(new_filters.row(idx), idx, new_filters.alignment_elements())?;
        }
        Ok(())
    }

    /// Transform a time-domain impulse response into one filter slot.
    pub fn set_impulse_response(
        &mut self,
        ir: &[S],
        filter_idx: usize,
        alignment: usize,
    ) -> ConvolverResult<()> {
        self.check_filter(filter_idx)?;
        if ir.len() > self.max_filter_length {
            return Err(ConvolverError::InvalidArgument(format!(
                "impulse response length {} exceeds maximum {}",
                ir.len(),
                self.max_filter_length
            )));
        }
        transform_ir_into(
            self.fft.as_mut(),
            &mut self.td_scratch,
            self.block_length,
            self.num_partitions,
            self.dft_bins,
            self.dft_bins_padded,
            self.filter_scale,
            self.alignment,
            ir,
            alignment,
            self.filters.row_mut(filter_idx),
        )
    }

    /// Transform an impulse response into a caller-provided
    /// frequency-domain buffer of `filter_row_len()` bins.
    pub fn transform_impulse_response(
        &mut self,
        ir: &[S],
        alignment: usize,
        dest: &mut [Complex<S>],
    ) -> ConvolverResult<()> {
        if ir.len() > self.max_filter_length {
            return Err(ConvolverError::InvalidArgument(format!(
                "impulse response length {} exceeds maximum {}",
                ir.len(),
                self.max_filter_length
            )));
        }
        if dest.len() != self.filter_row_len() {
            return Err(ConvolverError::InvalidArgument(format!(
                "transform destination must hold {} bins, got {}",
                self.filter_row_len(),
                dest.len()
            )));
        }
        transform_ir_into(
            self.fft.as_mut(),
            &mut self.td_scratch,
            self.block_length,
            self.num_partitions,
            self.dft_bins,
            self.dft_bins_padded,
            self.filter_scale,
            self.alignment,
            ir,
            alignment,
            dest,
        )
    }

    /// Bulk-assign an already transformed filter (all partitions, padded).
    pub fn set_filter(
        &mut self,
        bins: &[Complex<S>],
        filter_idx: usize,
        alignment: usize,
    ) -> ConvolverResult<()> {
        self.check_filter(filter_idx)?;
        if bins.len() != self.filter_row_len() {
            return Err(ConvolverError::InvalidArgument(format!(
                "transformed filter must hold {} bins, got {}",
                self.filter_row_len(),
                bins.len()
            )));
        }
        ops::copy(
            bins,
            self.filters.row_mut(filter_idx),
            alignment.min(self.complex_alignment),
        )?;
        Ok(())
    }

    // ============ Checks ============

    fn check_input(&self, input_idx: usize) -> ConvolverResult<()> {
        if input_idx >= self.num_inputs {
            return Err(ConvolverError::InvalidArgument(format!(
                "input index {} exceeds {} inputs",
                input_idx, self.num_inputs
            )));
        }
        Ok(())
    }

    fn check_filter(&self, filter_idx: usize) -> ConvolverResult<()> {
        if filter_idx >= self.max_filters() {
            return Err(ConvolverError::InvalidArgument(format!(
                "filter index {} exceeds {} filter slots",
                filter_idx,
                self.max_filters()
            )));
        }
        Ok(())
    }

    fn check_block(&self, block_idx: usize) -> ConvolverResult<()> {
        if block_idx >= self.num_partitions {
            return Err(ConvolverError::InvalidArgument(format!(
                "block index {} exceeds {} partitions",
                block_idx, self.num_partitions
            )));
        }
        Ok(())
    }
}

/// Partition, pre-scale and forward-transform an impulse response into a
/// frequency-domain filter row. Zero-pads short responses and keeps the
/// alignment padding between partitions zero.
fn transform_ir_into<S: KernelSample>(
    fft: &mut dyn FftBackend<S>,
    scratch: &mut AlignedVector<S>,
    block_length: usize,
    num_partitions: usize,
    bins: usize,
    bins_padded: usize,
    filter_scale: S,
    internal_alignment: usize,
    ir: &[S],
    ir_alignment: usize,
    dest: &mut [Complex<S>],
) -> ConvolverResult<()> {
    for partition in 0..num_partitions {
        scratch.zero();
        let start = partition * block_length;
        let end = ((partition + 1) * block_length).min(ir.len());
        if end > start {
            // Valid only while the block length is a multiple of the
            // alignment, which construction guarantees for the scratch;
            // partition offsets into the caller's response may not be.
            let seg_alignment = if start == 0 {
                internal_alignment.min(ir_alignment)
            } else {
                0
            };
            ops::multiply_const(
                filter_scale,
                &ir[start..end],
                &mut scratch.as_mut_slice()[..end - start],
                seg_alignment,
            )?;
        }
        let col = partition * bins_padded;
        fft.forward(scratch.as_slice(), &mut dest[col..col + bins])?;
        ops::zero(&mut dest[col + bins..col + bins_padded], 0)?;
    }
    Ok(())
}
