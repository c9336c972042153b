//! The emitted geometry buffer and its stride configuration (§6).

use crate::error::RuntimeError;
use crate::token::Pos;

/// Bit-packed per-attribute float counts. Each field saturates at its
/// declared width (position/normal/color: 0–7, three bits; uv: 0–3, two
/// bits); the effective vertex stride is their sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VertexStride {
    position: u8,
    uv: u8,
    normal: u8,
    color: u8,
}

impl VertexStride {
    pub fn new(position: u8, uv: u8, normal: u8, color: u8) -> Self {
        VertexStride {
            position: position.min(7),
            uv: uv.min(3),
            normal: normal.min(7),
            color: color.min(7),
        }
    }

    pub fn position(&self) -> u8 {
        self.position
    }

    pub fn uv(&self) -> u8 {
        self.uv
    }

    pub fn normal(&self) -> u8 {
        self.normal
    }

    pub fn color(&self) -> u8 {
        self.color
    }

    /// Effective stride: the total floats per emitted vertex.
    pub fn stride(&self) -> usize {
        self.position as usize + self.uv as usize + self.normal as usize + self.color as usize
    }
}

/// The flat buffer an instance accumulates via `emit`; one `stride()`-
/// wide slice per vertex.
#[derive(Debug, Default)]
pub struct VertexBuffer {
    stride: VertexStride,
    data: Vec<f32>,
}

impl VertexBuffer {
    pub fn new(stride: VertexStride) -> Self {
        VertexBuffer {
            stride,
            data: Vec::new(),
        }
    }

    pub fn stride(&self) -> VertexStride {
        self.stride
    }

    pub fn set_stride(&mut self, stride: VertexStride) {
        self.stride = stride;
    }

    pub fn vertex_count(&self) -> usize {
        if self.stride.stride() == 0 {
            0
        } else {
            self.data.len() / self.stride.stride()
        }
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Appends one vertex's worth of floats, validating arity against
    /// the configured stride (§4.4 "emit").
    pub fn push_vertex(&mut self, values: &[f32], pos: Pos) -> Result<(), RuntimeError> {
        let expected = self.stride.stride();
        if values.len() != expected {
            return Err(RuntimeError::arity(
                pos,
                format!(
                    "emit expects {expected} floats for the configured vertex stride, got {}",
                    values.len()
                ),
            ));
        }
        self.data.extend_from_slice(values);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn stride_is_the_sum_of_its_fields() {
        let stride = VertexStride::new(3, 2, 3, 3);
        assert_eq!(stride.stride(), 11);
    }

    #[test]
    fn fields_saturate_at_their_declared_width() {
        let stride = VertexStride::new(100, 100, 100, 100);
        assert_eq!(stride.position(), 7);
        assert_eq!(stride.uv(), 3);
        assert_eq!(stride.normal(), 7);
        assert_eq!(stride.color(), 7);
    }

    #[test]
    fn push_vertex_validates_arity() {
        let mut buf = VertexBuffer::new(VertexStride::new(3, 0, 0, 0));
        assert!(buf.push_vertex(&[1.0, 2.0, 3.0], Pos::START).is_ok());
        assert!(buf.push_vertex(&[1.0, 2.0], Pos::START).is_err());
        assert_eq!(buf.vertex_count(), 1);
    }
}
