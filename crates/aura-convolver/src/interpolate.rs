//! Interpolating convolver
//!
//! Keeps a bank of frequency-domain prototype filters and renders, per
//! route, a transformed filter as a sparse linear combination of them
//! (head-tracked HRTF rendering interpolates between measured
//! directions this way). The combination runs on the real-valued view of
//! the complex bins; the result is handed to the cross-fading convolver
//! as the route's new target filter.

use aura_core::{AlignedMatrix, AlignedVector, Gain};
use aura_vector::{complex_as_real, complex_as_real_mut, ops, KernelSample};
use num_complex::Complex;
use serde::{Deserialize, Serialize};

use crate::adapter::BlockProcessor;
use crate::crossfade::CrossfadingConvolver;
use crate::routing::{FilterRouting, RoutingList};
use crate::{ConvolverError, ConvolverResult};

/// Marker for an unset filter index.
pub const INVALID_INDEX: usize = usize::MAX;

/// A sparse interpolation weight set: the transformed filter for route
/// `id` is `sum_i weights[i] * filters[indices[i]]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpolationParameter {
    id: usize,
    indices: Vec<usize>,
    weights: Vec<Gain>,
}

impl InterpolationParameter {
    /// An all-invalid parameter of the given order.
    pub fn new(id: usize, order: usize) -> Self {
        Self {
            id,
            indices: vec![INVALID_INDEX; order],
            weights: vec![0.0; order],
        }
    }

    pub fn from_parts(id: usize, indices: Vec<usize>, weights: Vec<Gain>) -> ConvolverResult<Self> {
        if indices.is_empty() || indices.len() != weights.len() {
            return Err(ConvolverError::InvalidArgument(
                "interpolation parameter requires equally many indices and weights".into(),
            ));
        }
        Ok(Self {
            id,
            indices,
            weights,
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Number of interpolants (K).
    pub fn order(&self) -> usize {
        self.indices.len()
    }

    pub fn index(&self, position: usize) -> usize {
        self.indices[position]
    }

    pub fn weight(&self, position: usize) -> Gain {
        self.weights[position]
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn weights(&self) -> &[Gain] {
        &self.weights
    }

    pub fn set_index(&mut self, position: usize, index: usize) {
        self.indices[position] = index;
    }

    pub fn set_weight(&mut self, position: usize, weight: Gain) {
        self.weights[position] = weight;
    }

    pub fn set_indices(&mut self, indices: &[usize]) -> ConvolverResult<()> {
        if indices.len() != self.indices.len() {
            return Err(ConvolverError::InvalidArgument(
                "index count does not match the parameter order".into(),
            ));
        }
        self.indices.copy_from_slice(indices);
        Ok(())
    }

    pub fn set_weights(&mut self, weights: &[Gain]) -> ConvolverResult<()> {
        if weights.len() != self.weights.len() {
            return Err(ConvolverError::InvalidArgument(
                "weight count does not match the parameter order".into(),
            ));
        }
        self.weights.copy_from_slice(weights);
        Ok(())
    }
}

/// A bulk update of interpolation parameters.
pub type InterpolationParameterSet = Vec<InterpolationParameter>;

pub struct InterpolatingConvolver<S: KernelSample> {
    convolver: CrossfadingConvolver<S>,
    num_interpolants: usize,
    /// Prototype filters in frequency-domain form.
    filters: AlignedMatrix<Complex<S>>,
    /// Staging buffer for one transformed filter.
    staging: AlignedVector<Complex<S>>,
}

impl<S: KernelSample> InterpolatingConvolver<S> {
    pub fn new(
        num_inputs: usize,
        num_outputs: usize,
        block_length: usize,
        max_filter_length: usize,
        max_routings: usize,
        max_filters: usize,
        num_interpolants: usize,
        transition_samples: usize,
        initial_routings: &RoutingList,
        initial_interpolants: &[InterpolationParameter],
        initial_filters: Option<&AlignedMatrix<S>>,
        alignment: usize,
        fft_backend: &str,
    ) -> ConvolverResult<Self> {
        if num_interpolants == 0 {
            return Err(ConvolverError::InvalidArgument(
                "interpolating convolver requires at least one interpolant".into(),
            ));
        }
        let convolver = CrossfadingConvolver::new(
            num_inputs,
            num_outputs,
            block_length,
            max_filter_length,
            max_routings,
            max_filters,
            transition_samples,
            initial_routings,
            // The playing filters are produced by the interpolants.
            None,
            alignment,
            fft_backend,
        )?;
        let row_len = convolver.filter_row_len();
        let complex_alignment = convolver.complex_alignment();
        let mut interpolating = Self {
            convolver,
            num_interpolants,
            filters: AlignedMatrix::new(max_filters, row_len, complex_alignment)?,
            staging: AlignedVector::new(row_len, complex_alignment)?,
        };
        if let Some(filters) = initial_filters {
            interpolating.init_filters(filters)?;
        }
        interpolating.set_interpolants(initial_interpolants, false)?;
        Ok(interpolating)
    }

    // ============ Accessors ============

    pub fn num_inputs(&self) -> usize {
        self.convolver.num_inputs()
    }

    pub fn num_outputs(&self) -> usize {
        self.convolver.num_outputs()
    }

    pub fn block_length(&self) -> usize {
        self.convolver.block_length()
    }

    pub fn max_filter_length(&self) -> usize {
        self.convolver.max_filter_length()
    }

    pub fn max_filters(&self) -> usize {
        self.filters.rows()
    }

    pub fn max_routings(&self) -> usize {
        self.convolver.max_routings()
    }

    /// Number of interpolants (K) every parameter must carry.
    pub fn num_interpolants(&self) -> usize {
        self.num_interpolants
    }

    pub fn transition_samples(&self) -> usize {
        self.convolver.transition_samples()
    }

    // ============ Prototype Filter Store ============

    /// Load prototype responses; unoccupied slots become zero.
    pub fn init_filters(&mut self, new_filters: &AlignedMatrix<S>) -> ConvolverResult<()> {
        if new_filters.rows() > self.filters.rows() {
            return Err(ConvolverError::InvalidArgument(format!(
                "{} filters exceed the {} prototype slots",
                new_filters.rows(),
                self.filters.rows()
            )));
        }
        if new_filters.cols() > self.convolver.max_filter_length() {
            return Err(ConvolverError::InvalidArgument(format!(
                "filter length {} exceeds maximum {}",
                new_filters.cols(),
                self.convolver.max_filter_length()
            )));
        }
        self.filters.zero_fill();
        for idx in 0..new_filters.rows() {
            self.convolver.transform_impulse_response(
                new_filters.row(idx),
                new_filters.alignment_elements(),
                self.filters.row_mut(idx),
            )?;
        }
        Ok(())
    }

    /// Replace one prototype response.
    pub fn set_impulse_response(
        &mut self,
        ir: &[S],
        filter_idx: usize,
        alignment: usize,
    ) -> ConvolverResult<()> {
        if filter_idx >= self.filters.rows() {
            return Err(ConvolverError::InvalidArgument(format!(
                "filter index {} exceeds {} prototype slots",
                filter_idx,
                self.filters.rows()
            )));
        }
        self.convolver
            .transform_impulse_response(ir, alignment, self.filters.row_mut(filter_idx))
    }

    /// Zero the prototype store and the playing filters.
    pub fn clear_filters(&mut self) {
        self.filters.zero_fill();
        self.convolver.clear_filters();
    }

    // ============ Interpolants ============

    /// Compute the transformed filter for a route and hand it to the
    /// cross-fader; with `start_transition` the route fades into it.
    pub fn set_interpolant(
        &mut self,
        param: &InterpolationParameter,
        start_transition: bool,
    ) -> ConvolverResult<()> {
        if param.id() >= self.convolver.max_routings() {
            return Err(ConvolverError::InvalidArgument(format!(
                "interpolant id {} exceeds {} routing points",
                param.id(),
                self.convolver.max_routings()
            )));
        }
        if param.order() != self.num_interpolants {
            return Err(ConvolverError::InvalidArgument(format!(
                "interpolant order {} does not match the configured {}",
                param.order(),
                self.num_interpolants
            )));
        }
        for &index in param.indices() {
            if index >= self.filters.rows() {
                return Err(ConvolverError::InvalidArgument(format!(
                    "interpolant filter index {} exceeds {} prototype slots",
                    index,
                    self.filters.rows()
                )));
            }
        }

        // Weighted sum on the real-valued view of the complex bins.
        let real_alignment = self.convolver.complex_alignment() * 2;
        ops::multiply_const(
            <S as From<f32>>::from(param.weight(0)),
            complex_as_real(self.filters.row(param.index(0))),
            complex_as_real_mut(self.staging.as_mut_slice()),
            real_alignment,
        )?;
        for position in 1..param.order() {
            ops::multiply_const_add_inplace(
                <S as From<f32>>::from(param.weight(position)),
                complex_as_real(self.filters.row(param.index(position))),
                complex_as_real_mut(self.staging.as_mut_slice()),
                real_alignment,
            )?;
        }

        self.convolver.set_transformed_filter(
            self.staging.as_slice(),
            param.id(),
            self.convolver.complex_alignment(),
            start_transition,
        )
    }

    /// Apply a set of interpolants; previously set routes keep their
    /// filters.
    pub fn set_interpolants(
        &mut self,
        params: &[InterpolationParameter],
        start_transition: bool,
    ) -> ConvolverResult<()> {
        for param in params {
            self.set_interpolant(param, start_transition)?;
        }
        Ok(())
    }

    /// Clear the cross-fader's playing filters.
    pub fn clear_interpolants(&mut self) {
        self.convolver.clear_filters();
    }

    // ============ Processing and Routing ============

    pub fn process(
        &mut self,
        input: &[S],
        input_stride: usize,
        output: &mut [S],
        output_stride: usize,
        alignment: usize,
    ) -> ConvolverResult<()> {
        self.convolver
            .process(input, input_stride, output, output_stride, alignment)
    }

    pub fn clear_routings(&mut self) {
        self.convolver.clear_routings();
    }

    pub fn init_routings(&mut self, routings: &RoutingList) -> ConvolverResult<()> {
        self.convolver.init_routings(routings)
    }

    pub fn set_routing(
        &mut self,
        input: usize,
        output: usize,
        filter: usize,
        gain: Gain,
    ) -> ConvolverResult<()> {
        self.convolver.set_routing(input, output, filter, gain)
    }

    pub fn set_routing_entry(&mut self, routing: FilterRouting) -> ConvolverResult<()> {
        self.convolver.set_routing_entry(routing)
    }

    pub fn remove_routing(&mut self, input: usize, output: usize) -> bool {
        self.convolver.remove_routing(input, output)
    }
}

impl<S: KernelSample> BlockProcessor<S> for InterpolatingConvolver<S> {
    fn num_inputs(&self) -> usize {
        self.convolver.num_inputs()
    }

    fn num_outputs(&self) -> usize {
        self.convolver.num_outputs()
    }

    fn block_length(&self) -> usize {
        self.convolver.block_length()
    }

    fn alignment(&self) -> usize {
        self.convolver.alignment()
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

    #[test]
    fn test_parameter_validation() {
        assert!(InterpolationParameter::from_parts(0, vec![0, 1], vec![0.5]).is_err());
        assert!(InterpolationParameter::from_parts(0, vec![], vec![]).is_err());
        let mut param = InterpolationParameter::from_parts(0, vec![0, 1], vec![0.5, 0.5]).unwrap();
        assert_eq!(param.order(), 2);
        assert!(param.set_weights(&[1.0]).is_err());
        param.set_weights(&[0.25, 0.75]).unwrap();
        assert_eq!(param.weight(1), 0.75);
    }

    #[test]
    fn test_new_parameter_is_invalid() {
        let param = InterpolationParameter::new(3, 2);
        assert_eq!(param.id(), 3);
        assert_eq!(param.index(0), INVALID_INDEX);
        assert_eq!(param.weight(0), 0.0);
    }

    fn two_prototype_convolver() -> InterpolatingConvolver<f32> {
        let f0 = [1.0f32, 0.0, 0.0, 0.0];
        let f1 = [0.0f32, 1.0, 0.0, 0.0];
        let filters = AlignedMatrix::from_rows(&[&f0, &f1], 1).unwrap();
        let routings = RoutingList::new(vec![FilterRouting::new(0, 0, 0, 1.0)]);
        InterpolatingConvolver::new(
            1,
            1,
            4,
            4,
            1,
            2,
            2,
            0,
            &routings,
            &[],
            Some(&filters),
            2,
            "default",
        )
        .unwrap()
    }

    #[test]
    fn test_wrong_order_rejected() {
        let mut conv = two_prototype_convolver();
        let param = InterpolationParameter::from_parts(0, vec![0], vec![1.0]).unwrap();
        assert!(conv.set_interpolant(&param, false).is_err());
    }

    #[test]
    fn test_single_index_weights_recover_prototype() {
        // Weights summing to one over a single prototype reproduce it.
        let mut conv = two_prototype_convolver();
        let param =
            InterpolationParameter::from_parts(0, vec![0, 0], vec![0.25, 0.75]).unwrap();
        conv.set_interpolant(&param, false).unwrap();
        let input = [1.0f32, 0.0, 0.0, 0.0];
        let mut output = [0.0f32; 4];
        conv.process(&input, 4, &mut output, 4, 0).unwrap();
        let expected = [1.0f32, 0.0, 0.0, 0.0];
        for (o, e) in output.iter().zip(&expected) {
            assert!((o - e).abs() < 1e-5, "{o} vs {e}");
        }
    }

    #[test]
    fn test_weighted_mix_of_prototypes() {
        let mut conv = two_prototype_convolver();
        let param =
            InterpolationParameter::from_parts(0, vec![0, 1], vec![0.25, 0.75]).unwrap();
        conv.set_interpolant(&param, false).unwrap();
        let input = [1.0f32, 0.0, 0.0, 0.0];
        let mut output = [0.0f32; 4];
        conv.process(&input, 4, &mut output, 4, 0).unwrap();
        let expected = [0.25f32, 0.75, 0.0, 0.0];
        for (o, e) in output.iter().zip(&expected) {
            assert!((o - e).abs() < 1e-5, "{o} vs {e}");
        }
    }
}
