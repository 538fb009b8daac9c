//! Backend plugin selection.

use std::fmt;

/// The inference backend a graph is being built for.
///
/// Read-only after construction and threaded explicitly through the
/// assembler to every builder; a few operators lower differently per
/// backend via `create_node_for_plugin`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum PluginTarget {
    /// The CPU plugin.
    #[default]
    Cpu,
    /// The VPU (vision accelerator) plugin.
    Vpu,
}

impl PluginTarget {
    /// Parses the configuration string handed in per translation session.
    /// Unknown names fall back to [`PluginTarget::Cpu`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "VPU" | "vpu" | "MYRIAD" => Self::Vpu,
            "CPU" | "cpu" => Self::Cpu,
            other => {
                log::warn!("unknown plugin '{other}', defaulting to CPU");
                Self::Cpu
            }
        }
    }
}

impl fmt::Display for PluginTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cpu => "CPU",
            Self::Vpu => "VPU",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_name_known() {
        assert_eq!(PluginTarget::from_name("VPU"), PluginTarget::Vpu);
        assert_eq!(PluginTarget::from_name("MYRIAD"), PluginTarget::Vpu);
        assert_eq!(PluginTarget::from_name("CPU"), PluginTarget::Cpu);
    }

    #[test]
    fn from_name_unknown_defaults_to_cpu() {
        assert_eq!(PluginTarget::from_name("TPU"), PluginTarget::Cpu);
    }
}
