//! Per-vertex attribute types.
//!
//! Attributes travel in arrays parallel to the vertex positions. During
//! simplification two attribute records may be combined when their vertices
//! collapse into one; the combination rules live here so the engine can stay
//! agnostic of the element types.

use nalgebra::{Vector2, Vector3, Vector4};

/// Number of UV channels a mesh may carry.
pub const MAX_UV_CHANNELS: usize = 4;

/// Bone influences for one skinned vertex.
///
/// Up to four bones may influence a vertex. By convention the weights are
/// stored in descending order and sum to 1, although this is not enforced on
/// input. Unused slots carry a weight of 0.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoneWeight {
    /// Indices of the influencing bones.
    pub bone_indices: [u32; 4],
    /// Influence weights, descending.
    pub weights: [f64; 4],
}

impl BoneWeight {
    /// Create a bone weight record.
    pub fn new(bone_indices: [u32; 4], weights: [f64; 4]) -> Self {
        Self {
            bone_indices,
            weights,
        }
    }

    /// Combine two bone weight records into one.
    ///
    /// Weights for the same bone are summed, the four strongest influences
    /// are kept, and the result is renormalised so the weights sum to 1.
    pub fn merge(a: &BoneWeight, b: &BoneWeight) -> BoneWeight {
        let mut bones: Vec<(u32, f64)> = Vec::with_capacity(8);
        for record in [a, b] {
            for slot in 0..4 {
                let weight = record.weights[slot];
                if weight <= 0.0 {
                    continue;
                }
                let id = record.bone_indices[slot];
                match bones.iter_mut().find(|(bone, _)| *bone == id) {
                    Some((_, total)) => *total += weight,
                    None => bones.push((id, weight)),
                }
            }
        }

        // Strongest influences first; stable so equal weights keep input order.
        bones.sort_by(|(_, wa), (_, wb)| wb.partial_cmp(wa).unwrap_or(std::cmp::Ordering::Equal));
        bones.truncate(4);

        let total: f64 = bones.iter().map(|(_, w)| w).sum();
        let mut merged = BoneWeight::default();
        for (slot, (id, weight)) in bones.iter().enumerate() {
            merged.bone_indices[slot] = *id;
            merged.weights[slot] = if total > 0.0 { weight / total } else { 0.0 };
        }
        merged
    }
}

/// One UV channel: a parallel array of 2-, 3-, or 4-component coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum UvChannel {
    /// Classic 2D texture coordinates.
    Uv2(Vec<Vector2<f64>>),
    /// 3D coordinates (e.g. cube-map or volume lookups).
    Uv3(Vec<Vector3<f64>>),
    /// 4D coordinates.
    Uv4(Vec<Vector4<f64>>),
}

impl UvChannel {
    /// Number of coordinate records in the channel.
    pub fn len(&self) -> usize {
        match self {
            UvChannel::Uv2(data) => data.len(),
            UvChannel::Uv3(data) => data.len(),
            UvChannel::Uv4(data) => data.len(),
        }
    }

    /// Whether the channel holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of components per coordinate (2, 3, or 4).
    pub fn components(&self) -> usize {
        match self {
            UvChannel::Uv2(_) => 2,
            UvChannel::Uv3(_) => 3,
            UvChannel::Uv4(_) => 4,
        }
    }

    /// Replace the record at `dst` with the mean of the records at `dst` and `src`.
    pub(crate) fn merge(&mut self, dst: usize, src: usize) {
        match self {
            UvChannel::Uv2(data) => data[dst] = (data[dst] + data[src]) * 0.5,
            UvChannel::Uv3(data) => data[dst] = (data[dst] + data[src]) * 0.5,
            UvChannel::Uv4(data) => data[dst] = (data[dst] + data[src]) * 0.5,
        }
    }

    /// Copy the record at `src` over the record at `dst`.
    pub(crate) fn copy(&mut self, dst: usize, src: usize) {
        match self {
            UvChannel::Uv2(data) => data[dst] = data[src],
            UvChannel::Uv3(data) => data[dst] = data[src],
            UvChannel::Uv4(data) => data[dst] = data[src],
        }
    }

    /// Build a compacted channel holding the records at `order`, in order.
    pub(crate) fn gather(&self, order: &[usize]) -> UvChannel {
        match self {
            UvChannel::Uv2(data) => UvChannel::Uv2(order.iter().map(|&i| data[i]).collect()),
            UvChannel::Uv3(data) => UvChannel::Uv3(order.iter().map(|&i| data[i]).collect()),
            UvChannel::Uv4(data) => UvChannel::Uv4(order.iter().map(|&i| data[i]).collect()),
        }
    }
}
