//! Per-layer command storage and the software sorts applied to it.

use std::cmp::Ordering;
use std::sync::Arc;

use glam::Mat4;

use crate::color::Color;
use crate::material::Material;
use crate::producer::GeometryProducer;

/// One submitted draw request.
#[derive(Clone)]
pub struct DrawCommand {
    pub producer: Arc<dyn GeometryProducer>,
    /// Already carries the layer depth bias when depth testing is on.
    pub transform: Mat4,
    pub mask: Color,
    pub material: Material,
    pub translucent: bool,
    /// Ordering key for [`SoftwareSortMode::Command`]; higher draws first.
    pub sort_key: u32,
}

impl std::fmt::Debug for DrawCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrawCommand")
            .field("translation", &self.transform.w_axis.truncate())
            .field("mask", &self.mask)
            .field("shader", &self.material.shader().label())
            .field("translucent", &self.translucent)
            .field("sort_key", &self.sort_key)
            .finish_non_exhaustive()
    }
}

/// Order applied to a bucket's command lists before emission.
///
/// Every mode is a stable sort, so equal keys keep submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SoftwareSortMode {
    /// Submission order.
    #[default]
    None,
    /// Descending x translation.
    AxisX,
    /// Descending y translation.
    AxisY,
    /// Ascending z translation.
    AxisZ,
    /// Descending [`DrawCommand::sort_key`].
    Command,
}

// -0.0 + 0.0 is +0.0, so signed zeros tie under total_cmp
fn axis(v: f32) -> f32 {
    v + 0.0
}

fn descending(a: f32, b: f32) -> Ordering {
    axis(b).total_cmp(&axis(a))
}

pub fn sort_commands(commands: &mut [DrawCommand], mode: SoftwareSortMode) {
    match mode {
        SoftwareSortMode::None => {}
        SoftwareSortMode::AxisX => {
            commands.sort_by(|a, b| descending(a.transform.w_axis.x, b.transform.w_axis.x))
        }
        SoftwareSortMode::AxisY => {
            commands.sort_by(|a, b| descending(a.transform.w_axis.y, b.transform.w_axis.y))
        }
        SoftwareSortMode::AxisZ => commands
            .sort_by(|a, b| axis(a.transform.w_axis.z).total_cmp(&axis(b.transform.w_axis.z))),
        SoftwareSortMode::Command => commands.sort_by(|a, b| b.sort_key.cmp(&a.sort_key)),
    }
}

/// Opaque and translucent command lists for one layer.
///
/// Both lists keep their allocation across [`CommandBucket::clear`].
#[derive(Debug, Default)]
pub struct CommandBucket {
    opaque: Vec<DrawCommand>,
    translucent: Vec<DrawCommand>,
}

impl CommandBucket {
    /// Append to the list picked by `translucent` and hand back the stored
    /// command for in-place edits.
    pub fn add(&mut self, translucent: bool, command: DrawCommand) -> &mut DrawCommand {
        let list = if translucent {
            &mut self.translucent
        } else {
            &mut self.opaque
        };
        list.push(command);
        let last = list.len() - 1;
        &mut list[last]
    }

    pub fn sort_opaque(&mut self, mode: SoftwareSortMode) {
        sort_commands(&mut self.opaque, mode);
    }

    pub fn sort_translucent(&mut self, mode: SoftwareSortMode) {
        sort_commands(&mut self.translucent, mode);
    }

    pub fn clear(&mut self) {
        self.opaque.clear();
        self.translucent.clear();
    }

    pub fn opaque(&self) -> &[DrawCommand] {
        &self.opaque
    }

    pub fn translucent(&self) -> &[DrawCommand] {
        &self.translucent
    }

    pub fn len(&self) -> usize {
        self.opaque.len() + self.translucent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.opaque.is_empty() && self.translucent.is_empty()
    }
}
