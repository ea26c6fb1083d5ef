use std::fmt::{Display, Formatter};

/// How a user-defined inter-stage value is interpolated.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum InterpolationType {
    Perspective,
    Linear,
    Flat,
}

/// Where within a pixel an interpolated value is sampled.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum InterpolationSampling {
    Center,
    Centroid,
    Sample,
    First,
    Either,
}

/// Builtin shader values a decorated field can be bound to.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Builtin {
    VertexIndex,
    InstanceIndex,
    Position,
    ClipDistances,
    FrontFacing,
    FragDepth,
    SampleIndex,
    SampleMask,
    LocalInvocationId,
    LocalInvocationIndex,
    GlobalInvocationId,
    WorkgroupId,
    NumWorkgroups,
    SubgroupInvocationId,
    SubgroupSize,
}

impl Builtin {
    pub const fn name(self) -> &'static str {
        match self {
            Builtin::VertexIndex => "vertex_index",
            Builtin::InstanceIndex => "instance_index",
            Builtin::Position => "position",
            Builtin::ClipDistances => "clip_distances",
            Builtin::FrontFacing => "front_facing",
            Builtin::FragDepth => "frag_depth",
            Builtin::SampleIndex => "sample_index",
            Builtin::SampleMask => "sample_mask",
            Builtin::LocalInvocationId => "local_invocation_id",
            Builtin::LocalInvocationIndex => "local_invocation_index",
            Builtin::GlobalInvocationId => "global_invocation_id",
            Builtin::WorkgroupId => "workgroup_id",
            Builtin::NumWorkgroups => "num_workgroups",
            Builtin::SubgroupInvocationId => "subgroup_invocation_id",
            Builtin::SubgroupSize => "subgroup_size",
        }
    }
}

impl Display for Builtin {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The address space a pointer refers into.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum AddressSpace {
    Function,
    Private,
    Workgroup,
    Uniform,
    Storage,
    Handle,
}

impl AddressSpace {
    pub const fn name(self) -> &'static str {
        match self {
            AddressSpace::Function => "function",
            AddressSpace::Private => "private",
            AddressSpace::Workgroup => "workgroup",
            AddressSpace::Uniform => "uniform",
            AddressSpace::Storage => "storage",
            AddressSpace::Handle => "handle",
        }
    }
}
