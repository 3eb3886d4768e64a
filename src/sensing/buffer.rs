//! Fixed-capacity sliding window over helmet samples.
//!
//! The buffer has two states. While FILLING it only accumulates samples; once
//! it reaches capacity it is FULL and every further insertion evicts the
//! oldest sample and emits a fresh snapshot of the whole window.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

/// Number of samples the realtime classifier consumes per inference.
pub const WINDOW_CAPACITY: usize = 100;

/// Number of measurements carried by one sample: heart rate, body temperature.
pub const SAMPLE_WIDTH: usize = 2;

/// One sensor measurement pair in model column order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub heart_rate: f32,
    pub body_temp: f32,
}

impl Sample {
    pub fn new(heart_rate: f32, body_temp: f32) -> Self {
        Self {
            heart_rate,
            body_temp,
        }
    }

    pub fn as_row(&self) -> [f32; SAMPLE_WIDTH] {
        [self.heart_rate, self.body_temp]
    }
}

impl TryFrom<&[f32]> for Sample {
    type Error = PipelineError;

    fn try_from(values: &[f32]) -> PipelineResult<Self> {
        match values {
            [heart_rate, body_temp] => Ok(Self::new(*heart_rate, *body_temp)),
            _ => Err(PipelineError::InvalidSampleShape {
                expected: SAMPLE_WIDTH,
                actual: values.len(),
            }),
        }
    }
}

/// Materialized copy of the buffer contents, oldest row first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Window {
    rows: Vec<[f32; SAMPLE_WIDTH]>,
}

impl Window {
    pub fn from_rows(rows: Vec<[f32; SAMPLE_WIDTH]>) -> Self {
        Self { rows }
    }

    /// Builds a window from a loosely-shaped matrix, rejecting ragged rows.
    pub fn from_matrix(matrix: &[Vec<f32>]) -> PipelineResult<Self> {
        let mut rows = Vec::with_capacity(matrix.len());
        for row in matrix {
            match row.as_slice() {
                [a, b] => rows.push([*a, *b]),
                other => {
                    return Err(PipelineError::ShapeMismatch {
                        expected_rows: WINDOW_CAPACITY,
                        expected_cols: SAMPLE_WIDTH,
                        rows: matrix.len(),
                        cols: other.len(),
                    })
                }
            }
        }
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[[f32; SAMPLE_WIDTH]] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `(rows, columns)` of the window matrix.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), SAMPLE_WIDTH)
    }

    /// Values of one column (0 = heart rate, 1 = body temperature).
    pub fn column(&self, index: usize) -> impl Iterator<Item = f32> + Clone + '_ {
        self.rows.iter().map(move |row| row[index])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BufferState {
    Filling,
    Full,
}

#[derive(Debug, Clone)]
pub struct WindowBuffer {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl Default for WindowBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowBuffer {
    pub fn new() -> Self {
        Self::with_capacity(WINDOW_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Validates a raw reading and inserts it.
    pub fn insert(&mut self, reading: &[f32]) -> PipelineResult<Option<Window>> {
        let sample = Sample::try_from(reading)?;
        Ok(self.push(sample))
    }

    /// Appends a sample, evicting the oldest once over capacity. Returns a
    /// snapshot iff the buffer is full after the append.
    pub fn push(&mut self, sample: Sample) -> Option<Window> {
        self.samples.push_back(sample);
        if self.samples.len() > self.capacity {
            self.samples.pop_front();
        }

        if self.samples.len() == self.capacity {
            Some(self.snapshot())
        } else {
            None
        }
    }

    pub fn progress(&self) -> usize {
        self.samples.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn state(&self) -> BufferState {
        if self.samples.len() == self.capacity {
            BufferState::Full
        } else {
            BufferState::Filling
        }
    }

    pub fn reset(&mut self) {
        self.samples.clear();
    }

    fn snapshot(&self) -> Window {
        Window::from_rows(self.samples.iter().map(Sample::as_row).collect())
    }
}
