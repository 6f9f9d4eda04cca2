//! WGSL front end: per-stage compilation and cross-stage interface checks.
//!
//! Compilation is naga parsing plus validation, which gives per-stage
//! diagnostics before wgpu ever sees the source. Linking reflects the
//! uniforms both stages declare into one name-keyed table.

use std::collections::BTreeMap;

use naga::valid::{Capabilities, ModuleInfo, ValidationFlags, Validator};

use crate::context::ShaderStage;
use crate::uniform::{UniformKind, UniformType};

/// Bind group every uniform lives in.
pub const UNIFORM_GROUP: u32 = 0;

/// A parsed and validated stage.
#[derive(Debug)]
pub struct CompiledStage {
    pub stage: ShaderStage,
    pub module: naga::Module,
    pub info: ModuleInfo,
}

/// A uniform reflected from the linked stages.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct UniformSlot {
    pub binding: u32,
    pub ty: UniformType,
}

/// Interface of a linked vertex/fragment pair.
#[derive(Debug, Clone, Default)]
pub struct LinkedInterface {
    pub vertex_entry: String,
    pub fragment_entry: String,
    /// Vertex inputs by argument name → shader location.
    pub attributes: BTreeMap<String, u32>,
    pub uniforms: BTreeMap<String, UniformSlot>,
}

/// Parses and validates `source`. `Err` carries the rendered diagnostics.
pub fn compile(stage: ShaderStage, source: &str) -> Result<CompiledStage, String> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| e.emit_to_string(source))?;

    let info = Validator::new(ValidationFlags::all(), Capabilities::default())
        .validate(&module)
        .map_err(|e| e.emit_to_string(source))?;

    Ok(CompiledStage {
        stage,
        module,
        info,
    })
}

/// Checks that the stages fit together and reflects their uniforms.
pub fn link(vertex: &CompiledStage, fragment: &CompiledStage) -> Result<LinkedInterface, String> {
    let vertex_ep = entry_point(&vertex.module, naga::ShaderStage::Vertex)
        .ok_or("vertex stage has no @vertex entry point")?;
    let fragment_ep = entry_point(&fragment.module, naga::ShaderStage::Fragment)
        .ok_or("fragment stage has no @fragment entry point")?;

    let mut attributes = BTreeMap::new();
    for arg in &vertex_ep.function.arguments {
        if let (Some(name), Some(naga::Binding::Location { location, .. })) = (&arg.name, &arg.binding) {
            attributes.insert(name.clone(), *location);
        }
    }

    let mut uniforms = BTreeMap::new();
    let mut bindings: BTreeMap<u32, String> = BTreeMap::new();
    for stage in [vertex, fragment] {
        for (name, slot) in reflect_uniforms(stage)? {
            match uniforms.get(&name) {
                Some(existing) if *existing != slot => {
                    return Err(format!(
                        "uniform `{name}` is declared differently in the vertex and fragment stages"
                    ));
                }
                Some(_) => continue,
                None => {}
            }
            if let Some(other) = bindings.get(&slot.binding) {
                return Err(format!(
                    "uniforms `{other}` and `{name}` share @binding({})",
                    slot.binding
                ));
            }
            bindings.insert(slot.binding, name.clone());
            uniforms.insert(name, slot);
        }
    }

    Ok(LinkedInterface {
        vertex_entry: vertex_ep.name.clone(),
        fragment_entry: fragment_ep.name.clone(),
        attributes,
        uniforms,
    })
}

fn entry_point(module: &naga::Module, stage: naga::ShaderStage) -> Option<&naga::EntryPoint> {
    module.entry_points.iter().find(|ep| ep.stage == stage)
}

fn reflect_uniforms(stage: &CompiledStage) -> Result<Vec<(String, UniformSlot)>, String> {
    let module = &stage.module;
    let mut out = Vec::new();

    for (_, var) in module.global_variables.iter() {
        let name = var.name.clone().unwrap_or_else(|| "<unnamed>".to_string());
        match var.space {
            naga::AddressSpace::Uniform => {
                let Some(binding) = &var.binding else {
                    return Err(format!("{} uniform `{name}` has no @binding", stage.stage));
                };
                if binding.group != UNIFORM_GROUP {
                    return Err(format!(
                        "{} uniform `{name}` must be in @group({UNIFORM_GROUP})",
                        stage.stage
                    ));
                }
                let ty = uniform_type(&module.types[var.ty].inner).ok_or_else(|| {
                    format!(
                        "{} uniform `{name}` must be a scalar or vector of f32/i32",
                        stage.stage
                    )
                })?;
                out.push((
                    name,
                    UniformSlot {
                        binding: binding.binding,
                        ty,
                    },
                ));
            }
            naga::AddressSpace::Handle | naga::AddressSpace::Storage { .. } => {
                return Err(format!(
                    "{} stage binds `{name}`; only uniforms are supported",
                    stage.stage
                ));
            }
            _ => {}
        }
    }

    Ok(out)
}

fn uniform_type(inner: &naga::TypeInner) -> Option<UniformType> {
    let (scalar, arity) = match *inner {
        naga::TypeInner::Scalar(scalar) => (scalar, 1),
        naga::TypeInner::Vector { size, scalar } => {
            let arity = match size {
                naga::VectorSize::Bi => 2,
                naga::VectorSize::Tri => 3,
                naga::VectorSize::Quad => 4,
            };
            (scalar, arity)
        }
        _ => return None,
    };

    let kind = match (scalar.kind, scalar.width) {
        (naga::ScalarKind::Float, 4) => UniformKind::Float,
        (naga::ScalarKind::Sint, 4) => UniformKind::Int,
        _ => return None,
    };

    Some(UniformType::new(kind, arity))
}
