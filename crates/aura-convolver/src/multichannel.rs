//! Multichannel routing convolver
//!
//! A `CoreConvolver` plus a sparse routing table. Each `process()` call
//! ingests one block per input, accumulates the frequency-domain products
//! of every routing entry into a per-output spectrum, and emits one
//! time-domain block per output. Outputs without routing entries are
//! exactly zero.

use aura_core::{AlignedMatrix, AlignedVector, Gain};
use aura_vector::{ops, KernelSample};
use num_complex::Complex;

use crate::adapter::BlockProcessor;
use crate::core::CoreConvolver;
use crate::routing::{FilterRouting, RoutingList, RoutingTable};
use crate::{ConvolverError, ConvolverResult};

pub struct MultichannelConvolver<S: KernelSample> {
    core: CoreConvolver<S>,
    routing: RoutingTable,
    max_routings: usize,
    sum_bins: AlignedVector<Complex<S>>,
}

impl<S: KernelSample> MultichannelConvolver<S> {
    pub fn new(
        num_inputs: usize,
        num_outputs: usize,
        block_length: usize,
        max_filter_length: usize,
        max_routings: usize,
        max_filters: usize,
        initial_routings: &RoutingList,
        initial_filters: Option<&AlignedMatrix<S>>,
        alignment: usize,
        fft_backend: &str,
    ) -> ConvolverResult<Self> {
        let core = CoreConvolver::new(
            num_inputs,
            num_outputs,
            block_length,
            max_filter_length,
            max_filters,
            initial_filters,
            alignment,
            fft_backend,
        )?;
        let sum_bins = AlignedVector::new(core.dft_bins_padded(), core.complex_alignment())?;
        let mut convolver = Self {
            core,
            routing: RoutingTable::new(),
            max_routings,
            sum_bins,
        };
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

    pub fn max_filters(&self) -> usize {
        self.core.max_filters()
    }

    pub fn max_routings(&self) -> usize {
        self.max_routings
    }

    pub fn routing_count(&self) -> usize {
        self.routing.len()
    }

    pub fn core(&self) -> &CoreConvolver<S> {
        &self.core
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
            let dest = &mut output[out_idx * output_stride..out_idx * output_stride + block];
            Self::render_output(
                &mut self.core,
                &self.routing,
                &mut self.sum_bins,
                out_idx,
                dest,
            )?;
        }
        Ok(())
    }

    /// Process one block given a slice per channel.
    pub fn process_split(
        &mut self,
        input: &[&[S]],
        output: &mut [&mut [S]],
    ) -> ConvolverResult<()> {
        let block = self.core.block_length();
        if output.len() != self.core.num_outputs() {
            return Err(ConvolverError::InvalidArgument(format!(
                "expected {} output channels, got {}",
                self.core.num_outputs(),
                output.len()
            )));
        }
        if output.iter().any(|c| c.len() != block) {
            return Err(ConvolverError::InvalidArgument(
                "output channel slices must hold one block".into(),
            ));
        }
        self.core.process_inputs_split(input)?;
        for (out_idx, dest) in output.iter_mut().enumerate() {
            Self::render_output(
                &mut self.core,
                &self.routing,
                &mut self.sum_bins,
                out_idx,
                dest,
            )?;
        }
        Ok(())
    }

    fn render_output(
        core: &mut CoreConvolver<S>,
        routing: &RoutingTable,
        sum_bins: &mut AlignedVector<Complex<S>>,
        out_idx: usize,
        dest: &mut [S],
    ) -> ConvolverResult<()> {
        ops::zero(sum_bins.as_mut_slice(), core.complex_alignment())?;
        for (input_idx, params) in routing.entries_for_output(out_idx) {
            core.process_filter(
                input_idx,
                params.filter,
                params.gain,
                sum_bins.as_mut_slice(),
                true,
            )?;
        }
        core.transform_output(sum_bins.as_slice(), dest)
    }

    // ============ Routing Mutators ============

    pub fn clear_routings(&mut self) {
        self.routing.clear();
    }

    /// Replace the routing table; on failure the previous table is kept.
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
        if routing.filter >= self.core.max_filters() {
            return Err(ConvolverError::InvalidArgument(format!(
                "routing filter {} exceeds {} filter slots",
                routing.filter,
                self.core.max_filters()
            )));
        }
        Ok(())
    }

    // ============ Filter Mutators ============

    pub fn clear_filters(&mut self) {
        self.core.clear_filters();
    }

    pub fn init_filters(&mut self, new_filters: &AlignedMatrix<S>) -> ConvolverResult<()> {
        self.core.init_filters(new_filters)
    }

    pub fn set_impulse_response(
        &mut self,
        ir: &[S],
        filter_idx: usize,
        alignment: usize,
    ) -> ConvolverResult<()> {
        self.core.set_impulse_response(ir, filter_idx, alignment)
    }

    pub fn set_filter(
        &mut self,
        bins: &[Complex<S>],
        filter_idx: usize,
        alignment: usize,
    ) -> ConvolverResult<()> {
        self.core.set_filter(bins, filter_idx, alignment)
    }
}

impl<S: KernelSample> BlockProcessor<S> for MultichannelConvolver<S> {
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

    fn mono_identity(block: usize) -> MultichannelConvolver<f32> {
        let mut taps = vec![0.0f32; block];
        taps[0] = 1.0;
        let filters = AlignedMatrix::from_rows(&[&taps], 1).unwrap();
        let routings = RoutingList::new(vec![FilterRouting::new(0, 0, 0, 1.0)]);
        MultichannelConvolver::new(1, 1, block, block, 4, 1, &routings, Some(&filters), 2, "default")
            .unwrap()
    }

    #[test]
    fn test_identity_route() {
        let mut conv = mono_identity(4);
        let input = [0.5f32, -1.0, 0.25, 0.75];
        let mut output = [0.0f32; 4];
        conv.process(&input, 4, &mut output, 4, 0).unwrap();
        for (o, i) in output.iter().zip(&input) {
            assert!((o - i).abs() < 1e-5);
        }
    }

    #[test]
    fn test_unrouted_output_is_exact_zero() {
        let taps = [1.0f32, 0.0];
        let filters = AlignedMatrix::from_rows(&[&taps], 1).unwrap();
        let routings = RoutingList::new(vec![FilterRouting::new(0, 0, 0, 1.0)]);
        let mut conv = MultichannelConvolver::<f32>::new(
            1, 2, 2, 2, 4, 1, &routings, Some(&filters), 2, "default",
        )
        .unwrap();
        let input = [1.0f32, 1.0];
        let mut output = [9.0f32; 4];
        conv.process(&input, 2, &mut output, 2, 0).unwrap();
        assert_eq!(&output[2..], &[0.0, 0.0]);
    }

    #[test]
    fn test_init_routings_strong_safety() {
        let mut conv = mono_identity(4);
        assert_eq!(conv.routing_count(), 1);
        // An invalid bulk init must leave the old table in place.
        let bad = RoutingList::new(vec![FilterRouting::new(7, 0, 0, 1.0)]);
        assert!(conv.init_routings(&bad).is_err());
        assert_eq!(conv.routing_count(), 1);
        let too_many = RoutingList::new(vec![
            FilterRouting::new(0, 0, 0, 1.0),
            FilterRouting::new(0, 0, 0, 1.0),
            FilterRouting::new(0, 0, 0, 1.0),
            FilterRouting::new(0, 0, 0, 1.0),
            FilterRouting::new(0, 0, 0, 1.0),
        ]);
        assert!(conv.init_routings(&too_many).is_err());
        assert_eq!(conv.routing_count(), 1);
    }

    #[test]
    fn test_routing_capacity_enforced() {
        let taps = [1.0f32, 0.0, 0.0, 0.0];
        let filters = AlignedMatrix::from_rows(&[&taps], 1).unwrap();
        let mut conv = MultichannelConvolver::<f32>::new(
            2,
            2,
            4,
            4,
            2,
            1,
            &RoutingList::default(),
            Some(&filters),
            2,
            "default",
        )
        .unwrap();
        conv.set_routing(0, 0, 0, 1.0).unwrap();
        conv.set_routing(1, 1, 0, 1.0).unwrap();
        // Replacing an existing identity is fine at capacity.
        conv.set_routing(0, 0, 0, 0.5).unwrap();
        // A new identity is not.
        assert!(conv.set_routing(0, 1, 0, 1.0).is_err());
        assert!(conv.remove_routing(1, 1));
        conv.set_routing(0, 1, 0, 1.0).unwrap();
    }
}
