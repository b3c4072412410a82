//! Cross-fading convolver
//!
//! Every logical filter slot owns a twin pair of physical slots in the
//! core's filter bank. Uploading a new response lands in the inactive
//! slot, which then becomes the fade-in target; for the next
//! `transition_blocks` process calls each route is convolved with both
//! slots and the two block outputs are mixed with a shared equal-gain
//! ramp pair. Once the ramp counter saturates only the active slot is
//! convolved.
//!
//! The fade-in ramp starts at exactly 0 and reaches 1 at sample
//! `transition_samples`; it applies to the incoming filter.

use aura_core::{AlignedMatrix, AlignedVector, Gain};
use aura_vector::{ops, KernelSample};
use num_complex::Complex;

use crate::adapter::BlockProcessor;
use crate::core::CoreConvolver;
use crate::routing::{FilterRouting, RoutingList, RoutingTable};
use crate::{ConvolverError, ConvolverResult};

#[derive(Debug, Clone, Copy)]
struct BankState {
    /// Which twin (0 or 1) is the fade-in target.
    active: usize,
    /// Blocks into the current transition, saturating at
    /// `transition_blocks`.
    ramp_block: usize,
}

pub struct CrossfadingConvolver<S: KernelSample> {
    core: CoreConvolver<S>,
    routing: RoutingTable,
    max_routings: usize,
    /// Logical filter slots; the core holds twice as many.
    max_filters: usize,
    transition_samples: usize,
    transition_blocks: usize,
    banks: Vec<BankState>,
    fade_in: AlignedVector<S>,
    fade_out: AlignedVector<S>,
    sum_bins: AlignedVector<Complex<S>>,
    td_new: AlignedVector<S>,
    td_old: AlignedVector<S>,
}

impl<S: KernelSample> CrossfadingConvolver<S> {
    pub fn new(
        num_inputs: usize,
        num_outputs: usize,
        block_length: usize,
        max_filter_length: usize,
        max_routings: usize,
        max_filters: usize,
        transition_samples: usize,
        initial_routings: &RoutingList,
        initial_filters: Option<&AlignedMatrix<S>>,
        alignment: usize,
        fft_backend: &str,
    ) -> ConvolverResult<Self> {
        if max_filters == 0 {
            return Err(ConvolverError::InvalidArgument(
                "cross-fading convolver requires at least one filter slot".into(),
            ));
        }
        let core = CoreConvolver::new(
            num_inputs,
            num_outputs,
            block_length,
            max_filter_length,
            2 * max_filters,
            None,
            alignment,
            fft_backend,
        )?;
        let transition_blocks = transition_samples.div_ceil(block_length);
        let ramp_len = (transition_blocks + 1) * block_length;

        let mut fade_in = AlignedVector::new(ramp_len, alignment)?;
        let mut fade_out = AlignedVector::new(ramp_len, alignment)?;
        if transition_samples >= 2 {
            ops::ramp(
                &mut fade_in.as_mut_slice()[..transition_samples],
                S::zero(),
                S::one(),
                true,
                false,
                0,
            )?;
        }
        // transition_samples == 1 keeps the single leading zero; the
        // remainder of the ramp is the settled region.
        ops::fill(S::one(), &mut fade_in.as_mut_slice()[transition_samples..], 0)?;
        fade_out.fill(S::one());
        ops::subtract_inplace(fade_in.as_slice(), fade_out.as_mut_slice(), 0)?;

        let sum_bins = AlignedVector::new(core.dft_bins_padded(), core.complex_alignment())?;
        let td_new = AlignedVector::new(block_length, alignment)?;
        let td_old = AlignedVector::new(block_length, alignment)?;

        let mut convolver = Self {
            core,
            routing: RoutingTable::new(),
            max_routings,
            max_filters,
            transition_samples,
            transition_blocks,
            banks: vec![
                BankState {
                    active: 0,
                    ramp_block: transition_blocks,
                };
                max_filters
            ],
            fade_in,
            fade_out,
            sum_bins,
            td_new,
            td_old,
        };
        if let Some(filters) = initial_filters {
            convolver.init_filters(filters)?;
        }
        convolver.init_routings(initial_routings)?;
        Ok(convolver)
    }

    // ============ Accessors ============

    pub fn num_inputs(&self) -> usize {
        self.core.num_inputs()
    }

    pub fn num_outputs(&self) -> usize {
        self.core.num_outputs()
    }

    pub fn block_length(&self) -> usize {
        self.core.block_length()
    }

    pub fn max_filter_length(&self) -> usize {
        self.core.max_filter_length()
    }

    /// Logical filter slots (half the core's bank).
    pub fn max_filters(&self) -> usize {
        self.max_filters
    }

    pub fn max_routings(&self) -> usize {
        self.max_routings
    }

    pub fn routing_count(&self) -> usize {
        self.routing.len()
    }

    pub fn transition_samples(&self) -> usize {
        self.transition_samples
    }

    /// Process calls needed to complete a transition.
    pub fn transition_blocks(&self) -> usize {
        self.transition_blocks
    }

    pub fn filter_row_len(&self) -> usize {
        self.core.filter_row_len()
    }

    pub fn alignment(&self) -> usize {
        self.core.alignment()
    }

    pub fn complex_alignment(&self) -> usize {
        self.core.complex_alignment()
    }

    fn active_slot(&self, filter_idx: usize) -> usize {
        filter_idx + self.banks[filter_idx].active * self.max_filters
    }

    fn inactive_slot(&self, filter_idx: usize) -> usize {
        filter_idx + (1 - self.banks[filter_idx].active) * self.max_filters
    }

    // ============ Processing ============

    /// Process one block from/to strided channel buffers.
    pub fn process(
        &mut self,
        input: &[S],
        input_stride: usize,
        output: &mut [S],
        output_stride: usize,
        alignment: usize,
    ) -> ConvolverResult<()> {
        let block = self.core.block_length();
        let outputs = self.core.num_outputs();
        if output.len() < (outputs - 1) * output_stride + block {
            return Err(ConvolverError::InvalidArgument(
                "output buffer too short for the declared stride".into(),
            ));
        }
        self.core.process_inputs(input, input_stride, alignment)?;

        for out_idx in 0..outputs {
            ops::zero(
                &mut output[out_idx * output_stride..out_idx * output_stride + block],
                0,
            )?;
        }

        for routing in self.routing.iter() {
            let state = self.banks[routing.filter];
            let fade_block = state.ramp_block.min(self.transition_blocks);
            let incoming = routing.filter + state.active * self.max_filters;

            self.core.process_filter(
                routing.input,
                incoming,
                routing.gain,
                self.sum_bins.as_mut_slice(),
                false,
            )?;
            self.core
                .transform_output(self.sum_bins.as_slice(), self.td_new.as_mut_slice())?;

            if fade_block < self.transition_blocks {
                let outgoing = routing.filter + (1 - state.active) * self.max_filters;
                self.core.process_filter(
                    routing.input,
                    outgoing,
                    routing.gain,
                    self.sum_bins.as_mut_slice(),
                    false,
                )?;
                self.core
                    .transform_output(self.sum_bins.as_slice(), self.td_old.as_mut_slice())?;

                let seg = fade_block * block..(fade_block + 1) * block;
                ops::multiply_inplace(
                    &self.fade_in[seg.clone()],
                    self.td_new.as_mut_slice(),
                    0,
                )?;
                ops::multiply_add_inplace(
                    &self.fade_out[seg],
                    self.td_old.as_slice(),
                    self.td_new.as_mut_slice(),
                    0,
                )?;
            }

            let dest =
                &mut output[routing.output * output_stride..routing.output * output_stride + block];
            ops::add_inplace(self.td_new.as_slice(), dest, 0)?;
        }

        for state in &mut self.banks {
            state.ramp_block = (state.ramp_block + 1).min(self.transition_blocks);
        }
        Ok(())
    }

    // ============ Filter Mutators ============

    /// Upload a time-domain response as the new target for `filter_idx`
    /// and start a transition on the next `process()`.
    pub fn set_impulse_response(
        &mut self,
        ir: &[S],
        filter_idx: usize,
        alignment: usize,
    ) -> ConvolverResult<()> {
        self.check_filter(filter_idx)?;
        let slot = self.inactive_slot(filter_idx);
        self.core.set_impulse_response(ir, slot, alignment)?;
        let state = &mut self.banks[filter_idx];
        state.active = 1 - state.active;
        state.ramp_block = 0;
        Ok(())
    }

    /// Upload an already transformed (frequency-domain) filter.
    ///
    /// With `start_transition` the upload lands in the secondary bank and
    /// the ramp counter restarts, so the next `process()` fades into it.
    /// Without it both banks are replaced and the change is immediate.
    pub fn set_transformed_filter(
        &mut self,
        bins: &[Complex<S>],
        filter_idx: usize,
        alignment: usize,
        start_transition: bool,
    ) -> ConvolverResult<()> {
        self.check_filter(filter_idx)?;
        if start_transition {
            let slot = self.inactive_slot(filter_idx);
            self.core.set_filter(bins, slot, alignment)?;
            let state = &mut self.banks[filter_idx];
            state.active = 1 - state.active;
            state.ramp_block = 0;
        } else {
            let first = self.active_slot(filter_idx);
            let second = self.inactive_slot(filter_idx);
            self.core.set_filter(bins, first, alignment)?;
            self.core.set_filter(bins, second, alignment)?;
            self.banks[filter_idx].ramp_block = self.transition_blocks;
        }
        Ok(())
    }

    /// Load a set of responses into both banks, with no transition.
    pub fn init_filters(&mut self, new_filters: &AlignedMatrix<S>) -> ConvolverResult<()> {
        if new_filters.rows() > self.max_filters {
            return Err(ConvolverError::InvalidArgument(format!(
                "{} filters exceed the {} logical filter slots",
                new_filters.rows(),
                self.max_filters
            )));
        }
        if new_filters.cols() > self.core.max_filter_length() {
            return Err(ConvolverError::InvalidArgument(format!(
                "filter length {} exceeds maximum {}",
                new_filters.cols(),
                self.core.max_filter_length()
            )));
        }
        self.core.clear_filters();
        for idx in 0..new_filters.rows() {
            let row = new_filters.row(idx);
            let alignment = new_filters.alignment_elements();
            self.core.set_impulse_response(row, idx, alignment)?;
            self.core
                .set_impulse_response(row, idx + self.max_filters, alignment)?;
        }
        self.settle_banks();
        Ok(())
    }

    /// Zero both banks; no cross-fade is applied.
    pub fn clear_filters(&mut self) {
        self.core.clear_filters();
        self.settle_banks();
    }

    /// Transform a response into a caller-provided frequency-domain
    /// buffer (used by the interpolating wrapper).
    pub fn transform_impulse_response(
        &mut self,
        ir: &[S],
        alignment: usize,
        dest: &mut [Complex<S>],
    ) -> ConvolverResult<()> {
        self.core.transform_impulse_response(ir, alignment, dest)
    }

    fn settle_banks(&mut self) {
        for state in &mut self.banks {
            *state = BankState {
                active: 0,
                ramp_block: self.transition_blocks,
            };
        }
    }

    fn check_filter(&self, filter_idx: usize) -> ConvolverResult<()> {
        if filter_idx >= self.max_filters {
            return Err(ConvolverError::InvalidArgument(format!(
                "filter index {} exceeds {} logical filter slots",
                filter_idx, self.max_filters
            )));
        }
        Ok(())
    }

    // ============ Routing Mutators ============

    pub fn clear_routings(&mut self) {
        self.routing.clear();
    }

    pub fn init_routings(&mut self, routings: &RoutingList) -> ConvolverResult<()> {
        if routings.len() > self.max_routings {
            return Err(ConvolverError::InvalidArgument(format!(
                "{} routings exceed the maximum of {}",
                routings.len(),
                self.max_routings
            )));
        }
        for entry in routings.iter() {
            self.check_routing(entry)?;
        }
        self.routing.clear();
        for entry in routings.iter() {
            self.routing.set(*entry);
        }
        Ok(())
    }

    pub fn set_routing(
        &mut self,
        input: usize,
        output: usize,
        filter: usize,
        gain: Gain,
    ) -> ConvolverResult<()> {
        self.set_routing_entry(FilterRouting::new(input, output, filter, gain))
    }

    pub fn set_routing_entry(&mut self, routing: FilterRouting) -> ConvolverResult<()> {
        self.check_routing(&routing)?;
        if self.routing.get(routing.input, routing.output).is_none()
            && self.routing.len() >= self.max_routings
        {
            return Err(ConvolverError::InvalidArgument(format!(
                "routing table is full ({} entries)",
                self.max_routings
            )));
        }
        self.routing.set(routing);
        Ok(())
    }

    pub fn remove_routing(&mut self, input: usize, output: usize) -> bool {
        self.routing.remove(input, output)
    }

    fn check_routing(&self, routing: &FilterRouting) -> ConvolverResult<()> {
        if routing.input >= self.core.num_inputs() {
            return Err(ConvolverError::InvalidArgument(format!(
                "routing input {} exceeds {} inputs",
                routing.input,
                self.core.num_inputs()
            )));
        }
        if routing.output >= self.core.num_outputs() {
            return Err(ConvolverError::InvalidArgument(format!(
                "routing output {} exceeds {} outputs",
                routing.output,
                self.core.num_outputs()
            )));
        }
        if routing.filter >= self.max_filters {
            return Err(ConvolverError::InvalidArgument(format!(
                "routing filter {} exceeds {} logical filter slots",
                routing.filter, self.max_filters
            )));
        }
        Ok(())
    }
}

impl<S: KernelSample> BlockProcessor<S> for CrossfadingConvolver<S> {
    fn num_inputs(&self) -> usize {
        self.core.num_inputs()
    }

    fn num_outputs(&self) -> usize {
        self.core.num_outputs()
    }

    fn block_length(&self) -> usize {
        self.core.block_length()
    }

    fn alignment(&self) -> usize {
        self.core.alignment()
    }

    fn process_block(
        &mut self,
        input: &[S],
        input_stride: usize,
        output: &mut [S],
        output_stride: usize,
        alignment: usize,
    ) -> ConvolverResult<()> {
        self.process(input, input_stride, output, output_stride, alignment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crossfader(transition_samples: usize) -> CrossfadingConvolver<f32> {
        let taps = [1.0f32, 0.0, 0.0, 0.0];
        let filters = AlignedMatrix::from_rows(&[&taps], 1).unwrap();
        let routings = RoutingList::new(vec![FilterRouting::new(0, 0, 0, 1.0)]);
        CrossfadingConvolver::new(
            1,
            1,
            4,
            4,
            1,
            1,
            transition_samples,
            &routings,
            Some(&filters),
            2,
            "default",
        )
        .unwrap()
    }

    #[test]
    fn test_settled_filter_passes_through() {
        let mut conv = crossfader(4);
        let input = [1.0f32, -2.0, 0.5, 0.25];
        let mut output = [0.0f32; 4];
        conv.process(&input, 4, &mut output, 4, 0).unwrap();
        for (o, i) in output.iter().zip(&input) {
            assert!((o - i).abs() < 1e-5);
        }
    }

    #[test]
    fn test_fade_ramp_shape() {
        let conv = crossfader(4);
        assert_eq!(conv.transition_blocks(), 1);
        let fade_in: Vec<f32> = conv.fade_in.as_slice().to_vec();
        assert_eq!(fade_in, vec![0.0, 0.25, 0.5, 0.75, 1.0, 1.0, 1.0, 1.0]);
        let fade_out: Vec<f32> = conv.fade_out.as_slice().to_vec();
        assert_eq!(fade_out, vec![1.0, 0.75, 0.5, 0.25, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_crossfade_blends_then_settles() {
        let mut conv = crossfader(4);
        let input = [1.0f32, 1.0, 1.0, 1.0];
        let mut output = [0.0f32; 4];

        // Warm-up block with the initial identity filter.
        conv.process(&input, 4, &mut output, 4, 0).unwrap();

        // Switch to a doubled impulse; the first block blends per-sample.
        conv.set_impulse_response(&[2.0, 0.0, 0.0, 0.0], 0, 0).unwrap();
        conv.process(&input, 4, &mut output, 4, 0).unwrap();
        let expected = [1.0f32, 1.25, 1.5, 1.75];
        for (o, e) in output.iter().zip(&expected) {
            assert!((o - e).abs() < 1e-5, "{o} vs {e}");
        }

        // From the next block on only the new filter is heard.
        conv.process(&input, 4, &mut output, 4, 0).unwrap();
        for o in output {
            assert!((o - 2.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_zero_transition_switches_immediately() {
        let mut conv = crossfader(0);
        let input = [1.0f32, 1.0, 1.0, 1.0];
        let mut output = [0.0f32; 4];
        conv.process(&input, 4, &mut output, 4, 0).unwrap();
        conv.set_impulse_response(&[3.0, 0.0, 0.0, 0.0], 0, 0).unwrap();
        conv.process(&input, 4, &mut output, 4, 0).unwrap();
        for o in output {
            assert!((o - 3.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_repeated_upload_is_a_no_op() {
        let mut a = crossfader(8);
        let mut b = crossfader(8);
        let input = [0.5f32, -0.5, 1.0, -1.0];
        let mut out_a = [0.0f32; 4];
        let mut out_b = [0.0f32; 4];
        let ir = [0.75f32, 0.25, 0.0, 0.0];
        a.set_impulse_response(&ir, 0, 0).unwrap();
        b.set_impulse_response(&ir, 0, 0).unwrap();
        b.set_impulse_response(&ir, 0, 0).unwrap();
        for _ in 0..4 {
            a.process(&input, 4, &mut out_a, 4, 0).unwrap();
            b.process(&input, 4, &mut out_b, 4, 0).unwrap();
            for (x, y) in out_a.iter().zip(&out_b) {
                assert!((x - y).abs() < 1e-6);
            }
        }
    }
}
