//! Multichannel circular sample buffer
//!
//! Each channel stores `2 * capacity` samples: every write lands in the
//! ring and in a duplicated tail, so any window of up to `capacity`
//! samples ending at the write cursor is contiguous in memory. This is
//! what lets the convolution core hand a full DFT input window to the FFT
//! without gathering, and what the block-length adapter uses for its
//! staging buffers.

use crate::{AlignedMatrix, CoreError, CoreResult};

pub struct CircularBuffer<T> {
    data: AlignedMatrix<T>,
    capacity: usize,
    cursor: usize,
}

impl<T: Copy + Default> CircularBuffer<T> {
    /// Create a buffer holding `capacity` samples per channel.
    pub fn new(channels: usize, capacity: usize, alignment: usize) -> CoreResult<Self> {
        if channels == 0 || capacity == 0 {
            return Err(CoreError::InvalidArgument(
                "circular buffer requires at least one channel and one sample".into(),
            ));
        }
        Ok(Self {
            data: AlignedMatrix::new(channels, 2 * capacity, alignment)?,
            capacity,
            cursor: 0,
        })
    }

    pub fn channels(&self) -> usize {
        self.data.rows()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Distance between channel rows in the backing storage.
    pub fn stride(&self) -> usize {
        self.data.stride()
    }

    /// Append one slice per channel; all slices must be equally long and
    /// no longer than the capacity.
    pub fn write(&mut self, channels: &[&[T]]) -> CoreResult<()> {
        if channels.len() != self.channels() {
            return Err(CoreError::InvalidArgument(format!(
                "write expects {} channels, got {}",
                self.channels(),
                channels.len()
            )));
        }
        let frames = channels.first().map_or(0, |c| c.len());
        if channels.iter().any(|c| c.len() != frames) {
            return Err(CoreError::InvalidArgument(
                "write requires equally long channel slices".into(),
            ));
        }
        self.check_frames(frames)?;
        for (idx, src) in channels.iter().enumerate() {
            self.write_channel(idx, src);
        }
        self.cursor = (self.cursor + frames) % self.capacity;
        Ok(())
    }

    /// Append `frames` samples per channel from a strided buffer
    /// (channel `c` starts at `data[c * channel_stride]`).
    pub fn write_strided(
        &mut self,
        data: &[T],
        channel_stride: usize,
        frames: usize,
    ) -> CoreResult<()> {
        self.check_frames(frames)?;
        let needed = (self.channels() - 1) * channel_stride + frames;
        if data.len() < needed {
            return Err(CoreError::InvalidArgument(format!(
                "strided write needs {} samples, got {}",
                needed,
                data.len()
            )));
        }
        for idx in 0..self.channels() {
            let start = idx * channel_stride;
            self.write_channel_from(idx, data, start, frames);
        }
        self.cursor = (self.cursor + frames) % self.capacity;
        Ok(())
    }

    /// Contiguous view of the most recent `samples_back` samples of one
    /// channel, the last sample being the most recently written.
    pub fn read(&self, channel: usize, samples_back: usize) -> CoreResult<&[T]> {
        if channel >= self.channels() {
            return Err(CoreError::InvalidArgument(format!(
                "channel {channel} out of range"
            )));
        }
        if samples_back > self.capacity {
            return Err(CoreError::InvalidArgument(format!(
                "read of {} samples exceeds capacity {}",
                samples_back, self.capacity
            )));
        }
        let start = self.cursor + self.capacity - samples_back;
        Ok(&self.data.row(channel)[start..start + samples_back])
    }

    /// Strided view over all channels of the most recent `samples_back`
    /// samples; returns the base slice and the channel stride.
    pub fn read_region(&self, samples_back: usize) -> CoreResult<(&[T], usize)> {
        if samples_back > self.capacity {
            return Err(CoreError::InvalidArgument(format!(
                "read of {} samples exceeds capacity {}",
                samples_back, self.capacity
            )));
        }
        let start = self.cursor + self.capacity - samples_back;
        Ok((&self.data.as_slice()[start..], self.data.stride()))
    }

    /// Writable strided region for the next `frames` samples of every
    /// channel. The write becomes visible only after [`commit`].
    ///
    /// [`commit`]: CircularBuffer::commit
    pub fn write_region(&mut self, frames: usize) -> CoreResult<(&mut [T], usize)> {
        self.check_frames(frames)?;
        let start = self.cursor;
        let stride = self.data.stride();
        Ok((&mut self.data.as_mut_slice()[start..], stride))
    }

    /// Mirror a region written through [`write_region`] into the
    /// duplicated tail and advance the cursor.
    ///
    /// [`write_region`]: CircularBuffer::write_region
    pub fn commit(&mut self, frames: usize) -> CoreResult<()> {
        self.check_frames(frames)?;
        let cursor = self.cursor;
        let capacity = self.capacity;
        let first = frames.min(capacity - cursor);
        let rest = frames - first;
        for idx in 0..self.channels() {
            let row = self.data.row_mut(idx);
            // Written below the mirror boundary: duplicate upwards.
            row.copy_within(cursor..cursor + first, cursor + capacity);
            // Wrapped past the boundary: duplicate back into the ring half.
            row.copy_within(capacity..capacity + rest, 0);
        }
        self.cursor = (self.cursor + frames) % self.capacity;
        Ok(())
    }

    /// Clear all contents and rewind the cursor.
    pub fn reset(&mut self) {
        self.data.zero_fill();
        self.cursor = 0;
    }

    fn check_frames(&self, frames: usize) -> CoreResult<()> {
        if frames > self.capacity {
            return Err(CoreError::InvalidArgument(format!(
                "write of {} frames exceeds capacity {}",
                frames, self.capacity
            )));
        }
        Ok(())
    }

    fn write_channel(&mut self, channel: usize, src: &[T]) {
        let cursor = self.cursor;
        let capacity = self.capacity;
        let frames = src.len();
        let first = frames.min(capacity - cursor);
        let rest = frames - first;
        let row = self.data.row_mut(channel);
        row[cursor..cursor + first].copy_from_slice(&src[..first]);
        row[cursor + capacity..cursor + capacity + first].copy_from_slice(&src[..first]);
        row[..rest].copy_from_slice(&src[first..]);
        row[capacity..capacity + rest].copy_from_slice(&src[first..]);
    }

    fn write_channel_from(&mut self, channel: usize, data: &[T], offset: usize, frames: usize) {
        let cursor = self.cursor;
        let capacity = self.capacity;
        let first = frames.min(capacity - cursor);
        let rest = frames - first;
        let row = self.data.row_mut(channel);
        for i in 0..first {
            let v = data[offset + i];
            row[cursor + i] = v;
            row[cursor + capacity + i] = v;
        }
        for i in 0..rest {
            let v = data[offset + first + i];
            row[i] = v;
            row[capacity + i] = v;
        }
    }
}
